// Test case for RAW_CREDENTIAL_IN_LOG lint

struct Secret<T>(T);

impl<T> Secret<T> {
    fn new(value: T) -> Self {
        Secret(value)
    }
}

impl<T> std::fmt::Display for Secret<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("[REDACTED]")
    }
}

fn bad_raw_token(token: &str) {
    tracing::debug!("located {}", token);
}

fn bad_raw_code(code: &str) {
    let _ = format!("{}", format_args!("swapping {}", code));
}

fn bad_field_shorthand(api_key: &str) {
    tracing::warn!(%api_key, "invalid X-Api-Key");
}

fn good_redacted(token: &str, code: &str) {
    tracing::debug!("located {}", Secret::new(token));
    let _ = format!("{}", format_args!("swapping {}", Secret::new(&code)));
}

fn good_unrelated(scope: &str, located: &(String, u8)) {
    tracing::info!("no token for scope {} ({})", scope, located.1);
}

fn main() {
    bad_raw_token("T");
    bad_raw_code("C");
    bad_field_shorthand("K");
    good_redacted("T", "C");
    good_unrelated("orders", &("x".to_string(), 1));
}
