//! Capability traits for the request and response sides of the guard.
//!
//! The guard never sees a framework's own request or response types. It
//! depends only on the narrow lookups below, so an integration needs to
//! implement two small traits rather than hand over a whole framework object.

use serde_json::Value;

/// Read access to an inbound request plus the request-scoped field map.
///
/// Request-scoped fields are values attached to the request by earlier
/// middleware (a token resolved upstream, a client payload, ...). The guard
/// reads them and writes resolved state back into them.
///
/// # Examples
///
/// ```
/// use auth_gate::web::{GuardRequest, RequestAdapter};
///
/// let mut req = RequestAdapter::new("req-1");
/// req.add_header("authorization", "Bearer abc");
///
/// // Header lookup is case-insensitive
/// assert_eq!(req.header("Authorization"), Some("Bearer abc"));
/// ```
pub trait GuardRequest {
    /// Identifier used to correlate log events.
    fn request_id(&self) -> &str;

    /// Header value by case-insensitive name.
    fn header(&self, name: &str) -> Option<&str>;

    /// Cookie value by name.
    fn cookie(&self, name: &str) -> Option<&str>;

    /// Route parameter by name.
    fn path_param(&self, name: &str) -> Option<&str>;

    /// Parsed body field by name.
    fn body_field(&self, name: &str) -> Option<&str>;

    /// Query-string parameter by name.
    fn query_param(&self, name: &str) -> Option<&str>;

    /// Request-scoped field by name.
    fn field(&self, name: &str) -> Option<&Value>;

    /// Mutable request-scoped field by name.
    fn field_mut(&mut self, name: &str) -> Option<&mut Value>;

    /// Sets (or replaces) a request-scoped field.
    fn set_field(&mut self, name: &str, value: Value);

    /// `protocol://host/original-url` of the current request.
    fn absolute_url(&self) -> String;
}

/// Body written by a guard reply.
#[derive(Debug, Clone, PartialEq)]
pub enum ReplyBody {
    /// No body (redirects)
    Empty,
    /// Plain text body
    Text(String),
    /// Structured JSON body
    Json(Value),
}

impl ReplyBody {
    /// Text content, if this is a text body.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            ReplyBody::Text(s) => Some(s),
            _ => None,
        }
    }

    /// JSON content, if this is a JSON body.
    pub fn as_json(&self) -> Option<&Value> {
        match self {
            ReplyBody::Json(v) => Some(v),
            _ => None,
        }
    }
}

/// Write access to the outbound response.
pub trait GuardResponse {
    /// Sets a cookie on the response.
    fn set_cookie(&mut self, name: &str, value: &str);

    /// Expires a cookie on the client.
    fn clear_cookie(&mut self, name: &str);

    /// Terminates the response with a status and body.
    fn send(&mut self, status: u16, body: ReplyBody);

    /// Terminates the response with a `302 Found` redirect.
    fn redirect(&mut self, location: &str);
}
