// Test case for NO_PRINTLN lint

fn bad_println() {
    println!("swapped code for token {}", "T");
}

fn bad_eprintln() {
    eprintln!("Failed to authorize");
}

fn bad_dbg() {
    let api_key = "K";
    dbg!(api_key);
}

// Good: using tracing
fn good_tracing() {
    tracing::info!(request_id = "req-1", "Structured logging");
}

fn main() {
    bad_println();
    bad_eprintln();
    bad_dbg();
    good_tracing();
}
