//! Client side of the authorization service.
//!
//! All four calls are JSON `POST`s:
//!
//! | Call                | Body                                             | Reply                          |
//! |---------------------|--------------------------------------------------|--------------------------------|
//! | swap code           | `{requestToken: {name, value}}`                  | `{session: {token}}`           |
//! | authorization check | `{token, resource, operation, clientRequest}`    | `{authorised, authDetails?}`   |
//! | keep-alive          | `{access_token}`                                 | ignored                        |
//! | logout              | `{access_token}`                                 | ignored                        |

#[cfg(feature = "reqwest")]
mod http;
mod memory;

use async_trait::async_trait;
use serde_json::{json, Map, Value};

use crate::error::TransportError;

#[cfg(feature = "reqwest")]
pub use http::HttpAuthServerClient;
pub use memory::{InMemoryAuthServer, RecordedCall};

/// Transport used to reach the authorization service.
///
/// Implementations return `Err` for network failures, non-2xx replies and
/// undecodable bodies alike; callers treat every `Err` as the service being
/// unavailable.
#[async_trait]
pub trait AuthServerClient: Send + Sync + 'static {
    /// `POST`s `body` as JSON to `url` and decodes the JSON reply.
    async fn post_json(&self, url: &str, body: Value) -> Result<Value, TransportError>;
}

/// Body of the code-swap call.
pub(crate) fn swap_code_request(scope: &str, code: &str) -> Value {
    json!({ "requestToken": { "name": scope, "value": code } })
}

/// Body of the authorization-check call. `operation` is omitted when unset.
pub(crate) fn authorization_request(
    token: &str,
    resource: &str,
    operation: Option<&str>,
    client_request: Value,
) -> Value {
    let mut body = Map::new();
    body.insert("token".to_string(), json!(token));
    body.insert("resource".to_string(), json!(resource));
    if let Some(operation) = operation {
        body.insert("operation".to_string(), json!(operation));
    }
    body.insert("clientRequest".to_string(), client_request);
    Value::Object(body)
}

/// Body of the keep-alive and logout notifications.
pub(crate) fn session_notice(token: &str) -> Value {
    json!({ "access_token": token })
}

/// Rejects a `null` reply body: there is nothing to interpret, so it counts
/// as the service failing rather than as a verdict.
pub(crate) fn usable_reply(reply: Value) -> Result<Value, TransportError> {
    match reply {
        Value::Null => Err(TransportError::Decode("null reply body".to_string())),
        reply => Ok(reply),
    }
}

/// JSON truthiness: `null`, `false`, `0`, `""` are falsy.
fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Session token from a code-swap reply (`session.token`).
pub(crate) fn swapped_token(reply: &Value) -> Option<&str> {
    reply
        .get("session")
        .and_then(|session| session.get("token"))
        .and_then(Value::as_str)
        .filter(|token| !token.is_empty())
}

/// Interpretation of an authorization-check reply.
#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    /// `authorised` absent or falsy: no session for the token
    NoSession,
    /// `authorised` present but not `"Y"`
    Insufficient,
    /// `authorised == "Y"`, with `authDetails` (defaults to `{}`)
    Granted(Value),
}

impl Verdict {
    /// Reads a decoded reply.
    ///
    /// # Examples
    ///
    /// ```
    /// use auth_gate::remote::Verdict;
    /// use serde_json::json;
    ///
    /// assert_eq!(Verdict::from_reply(&json!({})), Verdict::NoSession);
    /// assert_eq!(Verdict::from_reply(&json!({"authorised": "N"})), Verdict::Insufficient);
    /// assert_eq!(
    ///     Verdict::from_reply(&json!({"authorised": "Y"})),
    ///     Verdict::Granted(json!({}))
    /// );
    /// ```
    pub fn from_reply(reply: &Value) -> Self {
        match reply.get("authorised") {
            Some(flag) if truthy(flag) => {
                if flag.as_str() == Some("Y") {
                    let details = reply
                        .get("authDetails")
                        .filter(|d| truthy(d))
                        .cloned()
                        .unwrap_or_else(|| Value::Object(Map::new()));
                    Verdict::Granted(details)
                } else {
                    Verdict::Insufficient
                }
            }
            _ => Verdict::NoSession,
        }
    }
}
