//! Scripted in-process authorization service.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;
use serde_json::Value;

use crate::error::TransportError;

use super::AuthServerClient;

/// One call received by an [`InMemoryAuthServer`].
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    /// Target URL
    pub url: String,
    /// JSON body posted
    pub body: Value,
}

/// In-memory authorization service for tests and local development.
///
/// Replies are scripted per URL; every call is recorded whether or not a
/// reply was scripted. A URL without a script fails with a network error.
///
/// # Examples
///
/// ```
/// use auth_gate::remote::{AuthServerClient, InMemoryAuthServer};
/// use serde_json::json;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let server = InMemoryAuthServer::new();
/// server.reply_json("http://auth/check", json!({"authorised": "Y"}));
///
/// let reply = server.post_json("http://auth/check", json!({"token": "T"})).await.unwrap();
/// assert_eq!(reply["authorised"], "Y");
/// assert_eq!(server.calls_to("http://auth/check"), vec![json!({"token": "T"})]);
/// # }
/// ```
#[derive(Clone, Default)]
pub struct InMemoryAuthServer {
    replies: Arc<DashMap<String, Result<Value, TransportError>>>,
    calls: Arc<Mutex<Vec<RecordedCall>>>,
}

impl InMemoryAuthServer {
    /// Creates a server with no scripted replies.
    pub fn new() -> Self {
        Self::default()
    }

    /// Scripts a JSON reply for `url`.
    pub fn reply_json(&self, url: impl Into<String>, reply: Value) {
        self.replies.insert(url.into(), Ok(reply));
    }

    /// Scripts a failure for `url`.
    pub fn reply_error(&self, url: impl Into<String>, error: TransportError) {
        self.replies.insert(url.into(), Err(error));
    }

    /// Every call received so far, in order.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().clone()
    }

    /// Bodies posted to `url`, in order.
    pub fn calls_to(&self, url: &str) -> Vec<Value> {
        self.calls
            .lock()
            .iter()
            .filter(|call| call.url == url)
            .map(|call| call.body.clone())
            .collect()
    }

    /// Forgets recorded calls, keeping the scripts.
    pub fn clear_calls(&self) {
        self.calls.lock().clear();
    }
}

#[async_trait]
impl AuthServerClient for InMemoryAuthServer {
    async fn post_json(&self, url: &str, body: Value) -> Result<Value, TransportError> {
        self.calls.lock().push(RecordedCall {
            url: url.to_string(),
            body,
        });

        match self.replies.get(url) {
            Some(entry) => entry.value().clone(),
            None => Err(TransportError::Network(format!(
                "no scripted reply for {}",
                url
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn unscripted_url_fails_but_is_recorded() {
        let server = InMemoryAuthServer::new();

        let result = server.post_json("http://nowhere", json!({})).await;

        assert!(matches!(result, Err(TransportError::Network(_))));
        assert_eq!(server.calls().len(), 1);
    }

    #[tokio::test]
    async fn scripted_error_is_returned() {
        let server = InMemoryAuthServer::new();
        server.reply_error(
            "http://auth",
            TransportError::Status {
                status: 500,
                body: "boom".to_string(),
            },
        );

        let result = server.post_json("http://auth", json!({})).await;
        assert!(matches!(result, Err(TransportError::Status { status: 500, .. })));
    }

    #[tokio::test]
    async fn clones_share_state() {
        let server = InMemoryAuthServer::new();
        let clone = server.clone();
        clone.reply_json("http://auth", json!({"ok": true}));

        server.post_json("http://auth", json!({"n": 1})).await.unwrap();

        assert_eq!(clone.calls_to("http://auth"), vec![json!({"n": 1})]);
        clone.clear_calls();
        assert!(server.calls().is_empty());
    }
}
