//! Credential lookup across carriage channels.
//!
//! A session token may arrive in several places. They are searched in a
//! fixed order, so a service-to-service bearer header is never shadowed by a
//! stale browser cookie:
//!
//! 1. `Authorization: Bearer <token>`
//! 2. request-scoped field `token_name` (set by upstream middleware)
//! 3. body field `token_name`
//! 4. query parameter `token_name`
//! 5. cookie `token_name`
//!
//! Empty values count as absent on every channel.

use std::fmt;

use serde_json::Value;

use crate::web::GuardRequest;

/// Name of the header carrying bearer credentials.
pub const AUTHORIZATION_HEADER: &str = "Authorization";

/// Where a token was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenSource {
    /// `Authorization` header
    AuthorizationHeader,
    /// Request-scoped field
    RequestField,
    /// Body field
    Body,
    /// Query parameter
    Query,
    /// Cookie
    Cookie,
}

impl fmt::Display for TokenSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenSource::AuthorizationHeader => write!(f, "authorization header"),
            TokenSource::RequestField => write!(f, "request field"),
            TokenSource::Body => write!(f, "body"),
            TokenSource::Query => write!(f, "query"),
            TokenSource::Cookie => write!(f, "cookie"),
        }
    }
}

/// A token together with the channel it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocatedToken {
    /// Token value
    pub value: String,
    /// Channel the value was read from
    pub source: TokenSource,
}

fn present(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

fn field_str<'r, R: GuardRequest + ?Sized>(req: &'r R, name: &str) -> Option<&'r str> {
    present(req.field(name).and_then(Value::as_str))
}

/// Second whitespace-separated word of the `Authorization` header.
///
/// The scheme word is not checked, only its presence.
pub fn bearer_token<R: GuardRequest + ?Sized>(req: &R) -> Option<&str> {
    present(req.header(AUTHORIZATION_HEADER))?
        .split_whitespace()
        .nth(1)
}

/// Cookie value, treating an empty cookie as absent.
pub fn cookie<'r, R: GuardRequest + ?Sized>(req: &'r R, name: &str) -> Option<&'r str> {
    present(req.cookie(name))
}

/// Header value, treating an empty header as absent.
pub fn header<'r, R: GuardRequest + ?Sized>(req: &'r R, name: &str) -> Option<&'r str> {
    present(req.header(name))
}

/// Finds the session token in priority order.
///
/// # Examples
///
/// ```
/// use auth_gate::token::{locate_token, TokenSource};
/// use auth_gate::web::RequestAdapter;
///
/// let mut req = RequestAdapter::new("req-1");
/// req.add_cookie("access_token", "stale");
/// req.add_header("Authorization", "Bearer fresh");
///
/// let token = locate_token(&req, "access_token").unwrap();
/// assert_eq!(token.value, "fresh");
/// assert_eq!(token.source, TokenSource::AuthorizationHeader);
/// ```
pub fn locate_token<R: GuardRequest + ?Sized>(req: &R, token_name: &str) -> Option<LocatedToken> {
    let candidates = [
        (bearer_token(req), TokenSource::AuthorizationHeader),
        (field_str(req, token_name), TokenSource::RequestField),
        (present(req.body_field(token_name)), TokenSource::Body),
        (present(req.query_param(token_name)), TokenSource::Query),
        (present(req.cookie(token_name)), TokenSource::Cookie),
    ];

    candidates
        .into_iter()
        .find_map(|(value, source)| {
            value.map(|v| LocatedToken {
                value: v.to_string(),
                source,
            })
        })
}

/// Finds the session token for keep-alive and logout.
///
/// Only the request field and the cookie are consulted: these are session
/// maintenance actions, not authorization gates.
pub fn locate_session_token<R: GuardRequest + ?Sized>(req: &R, token_name: &str) -> Option<String> {
    field_str(req, token_name)
        .or_else(|| cookie(req, token_name))
        .map(str::to_string)
}

/// Finds the one-time authorization code: route parameter, then body, then query.
pub fn locate_auth_code<R: GuardRequest + ?Sized>(req: &R, param: &str) -> Option<String> {
    present(req.path_param(param))
        .or_else(|| present(req.body_field(param)))
        .or_else(|| present(req.query_param(param)))
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::web::RequestAdapter;
    use serde_json::json;

    const NAME: &str = "access_token";

    #[test]
    fn no_carrier_yields_none() {
        let req = RequestAdapter::new("req-1");
        assert!(locate_token(&req, NAME).is_none());
    }

    #[test]
    fn each_channel_is_found_alone() {
        let mut header = RequestAdapter::new("req-h");
        header.add_header("Authorization", "Bearer TEST_TOKEN");

        let mut field = RequestAdapter::new("req-f");
        field.set_field(NAME, json!("TEST_TOKEN"));

        let mut body = RequestAdapter::new("req-b");
        body.add_body_field(NAME, "TEST_TOKEN");

        let mut query = RequestAdapter::new("req-q");
        query.add_query_param(NAME, "TEST_TOKEN");

        let mut cookie = RequestAdapter::new("req-c");
        cookie.add_cookie(NAME, "TEST_TOKEN");

        for (req, source) in [
            (header, TokenSource::AuthorizationHeader),
            (field, TokenSource::RequestField),
            (body, TokenSource::Body),
            (query, TokenSource::Query),
            (cookie, TokenSource::Cookie),
        ] {
            let token = locate_token(&req, NAME).expect("token present");
            assert_eq!(token.value, "TEST_TOKEN");
            assert_eq!(token.source, source);
        }
    }

    #[test]
    fn header_wins_over_everything() {
        let mut req = RequestAdapter::new("req-1");
        req.add_cookie(NAME, "cookie");
        req.add_query_param(NAME, "query");
        req.add_body_field(NAME, "body");
        req.set_field(NAME, json!("field"));
        req.add_header("Authorization", "Bearer header");

        assert_eq!(locate_token(&req, NAME).unwrap().value, "header");
    }

    #[test]
    fn body_wins_over_query_and_cookie() {
        let mut req = RequestAdapter::new("req-1");
        req.add_cookie(NAME, "cookie");
        req.add_query_param(NAME, "query");
        req.add_body_field(NAME, "body");

        assert_eq!(locate_token(&req, NAME).unwrap().source, TokenSource::Body);
    }

    #[test]
    fn empty_values_are_skipped() {
        let mut req = RequestAdapter::new("req-1");
        req.add_header("Authorization", "Bearer");
        req.set_field(NAME, json!(""));
        req.add_query_param(NAME, "");
        req.add_cookie(NAME, "from-cookie");

        let token = locate_token(&req, NAME).unwrap();
        assert_eq!(token.value, "from-cookie");
        assert_eq!(token.source, TokenSource::Cookie);
    }

    #[test]
    fn bearer_takes_second_word_after_trimming() {
        let mut req = RequestAdapter::new("req-1");
        req.add_header("Authorization", "  Bearer   abc  ");
        assert_eq!(bearer_token(&req), Some("abc"));
    }

    #[test]
    fn non_string_field_is_ignored() {
        let mut req = RequestAdapter::new("req-1");
        req.set_field(NAME, json!({"nested": true}));
        assert!(locate_token(&req, NAME).is_none());
    }

    #[test]
    fn session_token_ignores_header_body_and_query() {
        let mut req = RequestAdapter::new("req-1");
        req.add_header("Authorization", "Bearer header");
        req.add_body_field(NAME, "body");
        req.add_query_param(NAME, "query");
        assert!(locate_session_token(&req, NAME).is_none());

        req.add_cookie(NAME, "cookie");
        assert_eq!(locate_session_token(&req, NAME).as_deref(), Some("cookie"));

        req.set_field(NAME, json!("field"));
        assert_eq!(locate_session_token(&req, NAME).as_deref(), Some("field"));
    }

    #[test]
    fn auth_code_prefers_path_then_body_then_query() {
        let mut req = RequestAdapter::new("req-1");
        req.add_query_param("code", "q");
        assert_eq!(locate_auth_code(&req, "code").as_deref(), Some("q"));

        req.add_body_field("code", "b");
        assert_eq!(locate_auth_code(&req, "code").as_deref(), Some("b"));

        req.add_path_param("code", "p");
        assert_eq!(locate_auth_code(&req, "code").as_deref(), Some("p"));
    }

    #[test]
    fn auth_code_ignores_cookies() {
        let mut req = RequestAdapter::new("req-1");
        req.add_cookie("code", "c");
        assert!(locate_auth_code(&req, "code").is_none());
    }
}
