//! Owned, framework-free request and response types.

use std::collections::HashMap;

use serde_json::{Map, Value};

use super::{GuardRequest, GuardResponse, ReplyBody};

/// Owned request data implementing [`GuardRequest`].
///
/// Framework integrations copy the pieces the guard needs out of their own
/// request type (or implement `GuardRequest` directly). Tests use it to
/// build requests without any HTTP stack.
///
/// # Examples
///
/// ```
/// use auth_gate::web::{GuardRequest, RequestAdapter};
///
/// let mut req = RequestAdapter::new("req-12345");
/// req.add_cookie("access_token", "T");
/// req.add_query_param("code", "one-time");
/// req.set_url("https", "app.example.com", "/secure?x=1");
///
/// assert_eq!(req.cookie("access_token"), Some("T"));
/// assert_eq!(req.absolute_url(), "https://app.example.com/secure?x=1");
/// ```
#[derive(Debug, Clone)]
pub struct RequestAdapter {
    request_id: String,
    /// Keys are stored lowercased
    headers: HashMap<String, String>,
    cookies: HashMap<String, String>,
    path_params: HashMap<String, String>,
    body: HashMap<String, String>,
    query_params: HashMap<String, String>,
    fields: Map<String, Value>,
    protocol: String,
    host: String,
    original_url: String,
}

impl RequestAdapter {
    /// Creates an empty request with the given request ID.
    pub fn new(request_id: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
            headers: HashMap::new(),
            cookies: HashMap::new(),
            path_params: HashMap::new(),
            body: HashMap::new(),
            query_params: HashMap::new(),
            fields: Map::new(),
            protocol: "http".to_string(),
            host: "localhost".to_string(),
            original_url: "/".to_string(),
        }
    }

    /// Adds a header. Names are matched case-insensitively.
    pub fn add_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.headers
            .insert(name.into().to_ascii_lowercase(), value.into());
    }

    /// Adds a request cookie.
    pub fn add_cookie(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.cookies.insert(name.into(), value.into());
    }

    /// Adds a route parameter.
    pub fn add_path_param(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.path_params.insert(name.into(), value.into());
    }

    /// Adds a parsed body field.
    pub fn add_body_field(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.body.insert(name.into(), value.into());
    }

    /// Adds a query-string parameter.
    pub fn add_query_param(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.query_params.insert(name.into(), value.into());
    }

    /// Sets the pieces [`GuardRequest::absolute_url`] is built from.
    pub fn set_url(
        &mut self,
        protocol: impl Into<String>,
        host: impl Into<String>,
        original_url: impl Into<String>,
    ) {
        self.protocol = protocol.into();
        self.host = host.into();
        self.original_url = original_url.into();
    }

    /// All request-scoped fields.
    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }
}

impl GuardRequest for RequestAdapter {
    fn request_id(&self) -> &str {
        &self.request_id
    }

    fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    fn cookie(&self, name: &str) -> Option<&str> {
        self.cookies.get(name).map(String::as_str)
    }

    fn path_param(&self, name: &str) -> Option<&str> {
        self.path_params.get(name).map(String::as_str)
    }

    fn body_field(&self, name: &str) -> Option<&str> {
        self.body.get(name).map(String::as_str)
    }

    fn query_param(&self, name: &str) -> Option<&str> {
        self.query_params.get(name).map(String::as_str)
    }

    fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    fn field_mut(&mut self, name: &str) -> Option<&mut Value> {
        self.fields.get_mut(name)
    }

    fn set_field(&mut self, name: &str, value: Value) {
        self.fields.insert(name.to_string(), value);
    }

    fn absolute_url(&self) -> String {
        format!("{}://{}{}", self.protocol, self.host, self.original_url)
    }
}

/// A reply terminating the response.
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    /// HTTP status code
    pub status: u16,
    /// Response body
    pub body: ReplyBody,
    /// `Location` header for redirects
    pub location: Option<String>,
}

impl Reply {
    /// Whether this reply is a redirect.
    pub fn is_redirect(&self) -> bool {
        (300..400).contains(&self.status) && self.location.is_some()
    }
}

/// A cookie mutation made on the response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CookieChange {
    /// `Set-Cookie: name=value`
    Set {
        /// Cookie name
        name: String,
        /// Cookie value
        value: String,
    },
    /// Cookie expired on the client
    Cleared {
        /// Cookie name
        name: String,
    },
}

/// Recording implementation of [`GuardResponse`].
///
/// Every reply and cookie change is kept in order, so callers can replay
/// them onto a real response and tests can assert exactly what was emitted.
#[derive(Debug, Clone, Default)]
pub struct ResponseAdapter {
    replies: Vec<Reply>,
    cookies: Vec<CookieChange>,
}

impl ResponseAdapter {
    /// Creates an empty response.
    pub fn new() -> Self {
        Self::default()
    }

    /// The first reply written, if any.
    pub fn reply(&self) -> Option<&Reply> {
        self.replies.first()
    }

    /// Every reply written, in order.
    pub fn replies(&self) -> &[Reply] {
        &self.replies
    }

    /// Every cookie change, in order.
    pub fn cookie_changes(&self) -> &[CookieChange] {
        &self.cookies
    }

    /// Value of the most recent `Set` for `name`.
    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.cookies.iter().rev().find_map(|change| match change {
            CookieChange::Set { name: n, value } if n == name => Some(value.as_str()),
            _ => None,
        })
    }

    /// Whether `name` was cleared.
    pub fn was_cleared(&self, name: &str) -> bool {
        self.cookies
            .iter()
            .any(|change| matches!(change, CookieChange::Cleared { name: n } if n == name))
    }
}

impl GuardResponse for ResponseAdapter {
    fn set_cookie(&mut self, name: &str, value: &str) {
        self.cookies.push(CookieChange::Set {
            name: name.to_string(),
            value: value.to_string(),
        });
    }

    fn clear_cookie(&mut self, name: &str) {
        self.cookies.push(CookieChange::Cleared {
            name: name.to_string(),
        });
    }

    fn send(&mut self, status: u16, body: ReplyBody) {
        self.replies.push(Reply {
            status,
            body,
            location: None,
        });
    }

    fn redirect(&mut self, location: &str) {
        self.replies.push(Reply {
            status: 302,
            body: ReplyBody::Empty,
            location: Some(location.to_string()),
        });
    }
}
