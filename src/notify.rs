//! Keep-alive and logout notifications.
//!
//! Both handlers read the session token from the request field or cookie and
//! tell the authorization service about it in a detached task. The request
//! never waits on that call; its failures are only logged.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::runtime::Handle;
use tracing::Instrument;

use crate::config::GuardConfig;
use crate::logging::GuardLog;
use crate::remote::{self, AuthServerClient};
use crate::token::locate_session_token;
use crate::web::{Flow, GuardRequest, GuardResponse, Middleware, ReplyBody};

fn notify_detached(
    client: &Arc<dyn AuthServerClient>,
    url: &str,
    token: String,
    log: GuardLog,
    what: &'static str,
) {
    let Ok(runtime) = Handle::try_current() else {
        log.warn(format_args!("no tokio runtime, {} notification dropped", what));
        return;
    };

    let client = Arc::clone(client);
    let url = url.to_string();
    let span = log.span();
    runtime.spawn(
        async move {
            match client.post_json(&url, remote::session_notice(&token)).await {
                Ok(_) => log.debug(format_args!("{} notification delivered", what)),
                Err(e) => log.warn(format_args!("{} notification failed: {}", what, e)),
            }
        }
        .instrument(span),
    );
}

/// Session keep-alive built by [`AuthGuard::keep_alive`](crate::AuthGuard::keep_alive).
///
/// Always continues the chain.
pub struct KeepAlive {
    config: Arc<GuardConfig>,
    client: Arc<dyn AuthServerClient>,
    url: String,
}

impl KeepAlive {
    pub(crate) fn new(config: Arc<GuardConfig>, client: Arc<dyn AuthServerClient>, url: String) -> Self {
        Self { config, client, url }
    }

    /// Sends the keep-alive for the request's session, if it has one.
    pub fn refresh<R: GuardRequest + ?Sized>(&self, req: &R) -> Flow {
        let log = GuardLog::new(req.request_id(), "keep_alive");
        match locate_session_token(req, &self.config.token_name) {
            Some(token) => notify_detached(&self.client, &self.url, token, log, "keep-alive"),
            None => log.debug(format_args!("no session token, keep-alive skipped")),
        }
        Flow::Next
    }
}

#[async_trait]
impl<Req, Res> Middleware<Req, Res> for KeepAlive
where
    Req: GuardRequest + Send + Sync,
    Res: GuardResponse + Send + Sync,
{
    async fn handle(&self, req: &mut Req, _res: &mut Res) -> Flow {
        self.refresh(&*req)
    }
}

/// Session teardown built by [`AuthGuard::logout`](crate::AuthGuard::logout).
pub struct Logout {
    config: Arc<GuardConfig>,
    client: Arc<dyn AuthServerClient>,
    url: String,
    silent: bool,
}

impl Logout {
    pub(crate) fn new(
        config: Arc<GuardConfig>,
        client: Arc<dyn AuthServerClient>,
        url: String,
        silent: bool,
    ) -> Self {
        Self {
            config,
            client,
            url,
            silent,
        }
    }

    /// Announces the logout and answers `200 logout successful` unless silent.
    pub fn end_session<R, S>(&self, req: &R, res: &mut S) -> Flow
    where
        R: GuardRequest + ?Sized,
        S: GuardResponse + ?Sized,
    {
        let log = GuardLog::new(req.request_id(), "logout");
        match locate_session_token(req, &self.config.token_name) {
            Some(token) => notify_detached(&self.client, &self.url, token, log, "logout"),
            None => log.debug(format_args!("no session token, logout notification skipped")),
        }

        if self.silent {
            return Flow::Next;
        }
        res.send(200, ReplyBody::Text("logout successful".to_string()));
        Flow::Halt
    }
}

#[async_trait]
impl<Req, Res> Middleware<Req, Res> for Logout
where
    Req: GuardRequest + Send + Sync,
    Res: GuardResponse + Send + Sync,
{
    async fn handle(&self, req: &mut Req, res: &mut Res) -> Flow {
        self.end_session(&*req, res)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ClientCredentials, ServerUrls};
    use crate::error::TransportError;
    use crate::remote::InMemoryAuthServer;
    use crate::web::{RequestAdapter, ResponseAdapter};
    use serde_json::json;

    const KEEP_ALIVE_URL: &str = "http://localhost/keepAlive";
    const LOGOUT_URL: &str = "http://localhost/logout";

    fn config() -> Arc<GuardConfig> {
        Arc::new(
            GuardConfig::builder(
                ServerUrls::new("http://localhost/auth", "http://localhost/swap", "http://localhost/check"),
                ClientCredentials::new("test_client_id"),
            )
            .build(),
        )
    }

    fn keep_alive(server: &InMemoryAuthServer) -> KeepAlive {
        KeepAlive::new(config(), Arc::new(server.clone()), KEEP_ALIVE_URL.to_string())
    }

    fn logout(server: &InMemoryAuthServer, silent: bool) -> Logout {
        Logout::new(config(), Arc::new(server.clone()), LOGOUT_URL.to_string(), silent)
    }

    async fn settle(server: &InMemoryAuthServer, expected: usize) {
        for _ in 0..100 {
            if server.calls().len() >= expected {
                return;
            }
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn keep_alive_posts_cookie_token_and_continues() {
        let server = InMemoryAuthServer::new();
        server.reply_json(KEEP_ALIVE_URL, json!({}));
        let mut req = RequestAdapter::new("req-1");
        req.add_cookie("access_token", "T");

        assert_eq!(keep_alive(&server).refresh(&req), Flow::Next);
        settle(&server, 1).await;

        assert_eq!(server.calls_to(KEEP_ALIVE_URL), vec![json!({"access_token": "T"})]);
    }

    #[tokio::test]
    async fn keep_alive_prefers_request_field_over_cookie() {
        let server = InMemoryAuthServer::new();
        let mut req = RequestAdapter::new("req-1");
        req.add_cookie("access_token", "OLD");
        req.set_field("access_token", json!("NEW"));

        keep_alive(&server).refresh(&req);
        settle(&server, 1).await;

        assert_eq!(server.calls_to(KEEP_ALIVE_URL), vec![json!({"access_token": "NEW"})]);
    }

    #[tokio::test]
    async fn keep_alive_ignores_header_tokens() {
        let server = InMemoryAuthServer::new();
        let mut req = RequestAdapter::new("req-1");
        req.add_header("Authorization", "Bearer T");
        req.add_query_param("access_token", "T");

        assert_eq!(keep_alive(&server).refresh(&req), Flow::Next);
        settle(&server, 1).await;

        assert!(server.calls().is_empty());
    }

    #[tokio::test]
    async fn failed_notification_does_not_change_the_outcome() {
        let server = InMemoryAuthServer::new();
        server.reply_error(LOGOUT_URL, TransportError::Network("refused".to_string()));
        let mut req = RequestAdapter::new("req-1");
        req.add_cookie("access_token", "T");
        let mut res = ResponseAdapter::new();

        let flow = logout(&server, false).end_session(&req, &mut res);
        settle(&server, 1).await;

        assert_eq!(flow, Flow::Halt);
        assert_eq!(server.calls().len(), 1);
        let reply = res.reply().unwrap();
        assert_eq!(reply.status, 200);
        assert_eq!(reply.body.as_text(), Some("logout successful"));
    }

    #[tokio::test]
    async fn silent_logout_continues() {
        let server = InMemoryAuthServer::new();
        let mut req = RequestAdapter::new("req-1");
        req.add_cookie("access_token", "T");
        let mut res = ResponseAdapter::new();

        let flow = logout(&server, true).end_session(&req, &mut res);
        settle(&server, 1).await;

        assert_eq!(flow, Flow::Next);
        assert!(res.reply().is_none());
        assert_eq!(server.calls_to(LOGOUT_URL), vec![json!({"access_token": "T"})]);
    }

    #[tokio::test]
    async fn repeated_calls_without_token_never_reach_the_service() {
        let server = InMemoryAuthServer::new();
        let req = RequestAdapter::new("req-1");
        let keep_alive = keep_alive(&server);
        let logout = logout(&server, false);

        for _ in 0..3 {
            let mut res = ResponseAdapter::new();
            assert_eq!(keep_alive.refresh(&req), Flow::Next);
            assert_eq!(logout.end_session(&req, &mut res), Flow::Halt);
        }
        settle(&server, 1).await;

        assert!(server.calls().is_empty());
    }
}
