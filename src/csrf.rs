//! Double-submit cookie protection.
//!
//! The browser holds the session token in an `XSRF-TOKEN` cookie and the
//! page's own script copies it into an `X-XSRF-TOKEN` header. A cross-site
//! page can make the browser send the cookie but cannot read it, so it
//! cannot produce a matching header.
//!
//! Machine callers presenting a valid `X-Api-Key` together with an
//! `Authorization: <scheme> <token>` header skip the check.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;

use crate::api_key::validate_api_key;
use crate::config::GuardConfig;
use crate::error::{Violation, ViolationKind};
use crate::logging::GuardLog;
use crate::token;
use crate::web::{Flow, GuardRequest, GuardResponse, Middleware, ReplyBody};

/// Cookie holding the XSRF token.
pub const XSRF_COOKIE: &str = "XSRF-TOKEN";

/// Header echoing the XSRF token.
pub const XSRF_HEADER: &str = "X-XSRF-TOKEN";

/// Why a request passed the XSRF check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum XsrfPass {
    /// Trusted machine caller identified by API key
    ApiKey(String),
    /// Cookie and header matched
    DoubleSubmit,
}

/// XSRF guard built by [`AuthGuard::xsrf`](crate::AuthGuard::xsrf).
#[derive(Debug, Clone)]
pub struct XsrfGuard {
    config: Arc<GuardConfig>,
    silent: bool,
}

impl XsrfGuard {
    pub(crate) fn new(config: Arc<GuardConfig>, silent: bool) -> Self {
        Self { config, silent }
    }

    /// Decides whether the request passes, without touching any response.
    pub fn verify<R: GuardRequest + ?Sized>(&self, req: &R) -> Result<XsrfPass, Violation> {
        if let Some(label) = validate_api_key(req, self.config.api_key.as_ref()) {
            if token::bearer_token(req).is_some() {
                return Ok(XsrfPass::ApiKey(label.to_string()));
            }
        }

        match (
            token::cookie(req, XSRF_COOKIE),
            token::header(req, XSRF_HEADER),
        ) {
            (Some(cookie), Some(header)) if cookie == header => Ok(XsrfPass::DoubleSubmit),
            _ => Err(Violation::new(ViolationKind::CsrfMismatch, "XSRF Error")),
        }
    }

    /// Runs the check, answering 401 or forwarding the failure when silent.
    pub fn guard<R, S>(&self, req: &R, res: &mut S) -> Flow
    where
        R: GuardRequest + ?Sized,
        S: GuardResponse + ?Sized,
    {
        let log = GuardLog::new(req.request_id(), "xsrf");

        match self.verify(req) {
            Ok(XsrfPass::ApiKey(label)) => {
                log.debug(format_args!("api key caller {} bypasses XSRF", label));
                Flow::Next
            }
            Ok(XsrfPass::DoubleSubmit) => Flow::Next,
            Err(violation) => {
                log.debug(format_args!(
                    "XSRF error: cookie present: {}, header present: {}",
                    req.cookie(XSRF_COOKIE).is_some(),
                    req.header(XSRF_HEADER).is_some()
                ));
                if self.silent {
                    return Flow::Error(violation);
                }
                res.send(
                    violation.status(),
                    ReplyBody::Json(json!({
                        "status": "ERROR",
                        "message": "XSRF error",
                        "location": self.config.server().auth_url,
                    })),
                );
                Flow::Halt
            }
        }
    }
}

#[async_trait]
impl<Req, Res> Middleware<Req, Res> for XsrfGuard
where
    Req: GuardRequest + Send + Sync,
    Res: GuardResponse + Send + Sync,
{
    async fn handle(&self, req: &mut Req, res: &mut Res) -> Flow {
        self.guard(&*req, res)
    }
}
