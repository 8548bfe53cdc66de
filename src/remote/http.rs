//! `reqwest`-backed transport.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::TransportError;

use super::AuthServerClient;

/// Authorization service client over HTTP.
///
/// No timeout is set by default; configure one on the `reqwest::Client`
/// passed to [`with_client`](Self::with_client) if the service needs it.
#[derive(Debug, Clone, Default)]
pub struct HttpAuthServerClient {
    http: reqwest::Client,
}

impl HttpAuthServerClient {
    /// Client with `reqwest` defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Client reusing a configured `reqwest::Client` (timeouts, proxies, TLS).
    pub fn with_client(http: reqwest::Client) -> Self {
        Self { http }
    }
}

#[async_trait]
impl AuthServerClient for HttpAuthServerClient {
    async fn post_json(&self, url: &str, body: Value) -> Result<Value, TransportError> {
        let response = self
            .http
            .post(url)
            .json(&body)
            .send()
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TransportError::Status {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| TransportError::Decode(e.to_string()))
    }
}
