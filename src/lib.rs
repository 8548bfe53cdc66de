//! Remote-authorization middleware for HTTP services.
//!
//! An application delegates its authorization decisions to a separate
//! authorization service. This crate sits in front of the application's
//! route handlers and provides:
//! - **Token location**: finding the caller's session token in the
//!   `Authorization` header, a request field, the body, the query or a cookie
//! - **API keys**: recognizing trusted machine callers by `X-Api-Key`
//! - **XSRF protection**: the double-submit cookie check, skipped for API-key callers
//! - **Code swap**: exchanging a one-time login code for a session token
//! - **Authorization checks**: asking the service whether the caller may use a resource
//! - **Keep-alive and logout**: fire-and-forget session notifications
//!
//! # Core Types
//!
//! - [`GuardConfig`]: immutable configuration, loaded from JSON or built in code
//! - [`AuthGuard`]: validates the configuration and builds the handlers
//! - [`AuthServerClient`](remote::AuthServerClient): transport to the authorization service
//! - [`Flow`](web::Flow): each handler's verdict for the middleware chain
//! - [`Secret<T>`]: wrapper that redacts credentials in logs
//!
//! # Examples
//!
//! ```
//! use auth_gate::web::{Chain, Flow, RequestAdapter, ResponseAdapter};
//! use auth_gate::{AuthGuard, CheckOptions, ClientCredentials, GuardConfig,
//!     InMemoryAuthServer, ServerUrls};
//! use serde_json::json;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), auth_gate::Error> {
//! let server = InMemoryAuthServer::new();
//! server.reply_json("http://auth/check", json!({"authorised": "Y"}));
//!
//! let config = GuardConfig::builder(
//!     ServerUrls::new("http://auth/login", "http://auth/swap", "http://auth/check"),
//!     ClientCredentials::new("my-app"),
//! )
//! .build();
//! let guard = AuthGuard::new(config, server)?;
//!
//! let chain: Chain<RequestAdapter, ResponseAdapter> =
//!     Chain::new().stage(guard.check(CheckOptions::new("orders").redirect_login(true))?);
//!
//! let mut req = RequestAdapter::new("req-1");
//! req.add_header("Authorization", "Bearer T");
//! let mut res = ResponseAdapter::new();
//!
//! assert_eq!(chain.run(&mut req, &mut res).await, Flow::Next);
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod api_key;
mod check;
mod config;
mod csrf;
mod error;
mod guard;
mod logging;
mod notify;
pub mod remote;
mod secret;
mod swap;
pub mod token;
pub mod web;

pub use api_key::{validate_api_key, ApiKeys, ThirdPartyKey, API_KEY_HEADER, LEGACY_LABEL};
pub use check::{AuthorizationCheck, CheckOptions, AUTH_DETAILS_KEY, REDIRECT_URL_FIELD};
pub use config::{
    ClientCredentials, GuardConfig, GuardConfigBuilder, ServerUrls, DEFAULT_AUTH_CODE_PARAM,
    DEFAULT_TOKEN_NAME,
};
pub use csrf::{XsrfGuard, XsrfPass, XSRF_COOKIE, XSRF_HEADER};
pub use error::{ConfigError, Error, TransportError, Violation, ViolationKind};
pub use guard::AuthGuard;
pub use logging::GuardLog;
pub use notify::{KeepAlive, Logout};
#[cfg(feature = "reqwest")]
pub use remote::HttpAuthServerClient;
pub use remote::InMemoryAuthServer;
pub use secret::Secret;
pub use swap::{CodeSwap, SwapOptions, AUTH_CODE_FIELD};
