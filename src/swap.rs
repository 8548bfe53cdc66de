//! One-time code exchange.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::Instrument;

use crate::config::GuardConfig;
use crate::csrf::XSRF_COOKIE;
use crate::error::{Violation, ViolationKind};
use crate::logging::GuardLog;
use crate::remote::{self, AuthServerClient};
use crate::secret::Secret;
use crate::token::locate_auth_code;
use crate::web::{Flow, GuardRequest, GuardResponse, Middleware, ReplyBody};

/// Request field the resolved one-time code is recorded under.
pub const AUTH_CODE_FIELD: &str = "authCode";

/// Options for [`AuthGuard::swap_code`](crate::AuthGuard::swap_code).
#[derive(Debug, Clone, Default)]
pub struct SwapOptions {
    pub(crate) scope: Option<String>,
    pub(crate) silent: bool,
}

impl SwapOptions {
    /// Options with no scope set yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Resource name the code was issued for (required).
    pub fn scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = Some(scope.into());
        self
    }

    /// Continue the chain after a successful swap instead of answering
    /// `200 swapped the code`.
    pub fn silent(mut self, silent: bool) -> Self {
        self.silent = silent;
        self
    }
}

/// Exchanges a one-time authorization code for a session token.
///
/// With no code on the request the stage does nothing. With a code it
/// always terminates the response on failure (503) and never forwards an
/// error.
pub struct CodeSwap {
    config: Arc<GuardConfig>,
    client: Arc<dyn AuthServerClient>,
    scope: String,
    silent: bool,
}

impl CodeSwap {
    pub(crate) fn new(
        config: Arc<GuardConfig>,
        client: Arc<dyn AuthServerClient>,
        scope: String,
        silent: bool,
    ) -> Self {
        Self {
            config,
            client,
            scope,
            silent,
        }
    }

    /// Scope sent with every exchange.
    pub fn scope(&self) -> &str {
        &self.scope
    }

    /// Runs the exchange for one request.
    pub async fn swap<R, S>(&self, req: &mut R, res: &mut S) -> Flow
    where
        R: GuardRequest + ?Sized,
        S: GuardResponse + ?Sized,
    {
        let log = GuardLog::new(req.request_id(), "swap_code");
        let param = self.config.auth_code_param.as_str();

        let Some(code) = locate_auth_code(&*req, param) else {
            log.debug(format_args!("no {} on request, nothing to swap", param));
            return Flow::Next;
        };

        log.debug(format_args!(
            "swapping {} {} for scope {}",
            param,
            Secret::new(&code),
            self.scope
        ));
        req.set_field(AUTH_CODE_FIELD, Value::String(code.clone()));

        let url = self.config.server().swap_code_url.as_str();
        let reply = self
            .client
            .post_json(url, remote::swap_code_request(&self.scope, &code))
            .instrument(log.span())
            .await
            .and_then(remote::usable_reply);

        let reply = match reply {
            Ok(reply) => reply,
            Err(e) => {
                log.error(format_args!("error swapping code: {}", e));
                let violation =
                    Violation::new(ViolationKind::UpstreamUnavailable, "Failed to exchange code");
                res.send(violation.status(), ReplyBody::Text(violation.message));
                return Flow::Halt;
            }
        };

        let Some(token) = remote::swapped_token(&reply).map(str::to_string) else {
            log.warn(format_args!("session has expired or other error: no session token"));
            res.send(503, ReplyBody::Text("No user session for code".to_string()));
            return Flow::Halt;
        };

        let token_name = self.config.token_name.as_str();
        res.set_cookie(token_name, &token);
        res.set_cookie(XSRF_COOKIE, &token);
        req.set_field(token_name, Value::String(token));
        log.info(format_args!("code swapped for a session token"));

        if self.silent {
            return Flow::Next;
        }
        res.send(200, ReplyBody::Text("swapped the code".to_string()));
        Flow::Halt
    }
}

#[async_trait]
impl<Req, Res> Middleware<Req, Res> for CodeSwap
where
    Req: GuardRequest + Send + Sync,
    Res: GuardResponse + Send + Sync,
{
    async fn handle(&self, req: &mut Req, res: &mut Res) -> Flow {
        self.swap(req, res).await
    }
}
