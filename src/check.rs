//! Per-request authorization against the remote service.
//!
//! Each request walks a small state machine:
//!
//! ```text
//! build redirect URL -> locate token --none--> redirect or 401 "No token"
//!                            |
//!                          found -> POST userAuthURL --err--> 503 "Failed to authorize"
//!                                        |
//!                     +------------------+-------------------+
//!                 no session        not "Y"                "Y"
//!          redirect or 401      redirect or 403     attach authDetails, next
//! ```
//!
//! When `redirect_login` is set every user-facing failure becomes a 302 to
//! the login page. Without it, "No token" is 401, an expired session is 401
//! and insufficient privilege is 403.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use tracing::Instrument;

use crate::config::GuardConfig;
use crate::error::{Violation, ViolationKind};
use crate::logging::GuardLog;
use crate::remote::{self, AuthServerClient, Verdict};
use crate::secret::Secret;
use crate::token::{self, locate_token};
use crate::web::{Flow, GuardRequest, GuardResponse, Middleware, ReplyBody};

/// Request field the login redirect URL is stored under.
pub const REDIRECT_URL_FIELD: &str = "redirectURL";

/// Key the remote `authDetails` are written under in the destination field.
pub const AUTH_DETAILS_KEY: &str = "authDetails";

const INSUFFICIENT_PRIVILEGE: &str = "Error: User does not have the required role or permision";

/// Options for [`AuthGuard::check`](crate::AuthGuard::check).
///
/// `scope` is mandatory, and so is one of `redirect_login(true)` or
/// `redirect_uri`.
#[derive(Debug, Clone, Default)]
pub struct CheckOptions {
    pub(crate) scope: Option<String>,
    pub(crate) operation: Option<String>,
    pub(crate) redirect_login: bool,
    pub(crate) redirect_uri: Option<String>,
    pub(crate) client_request_field: Option<String>,
    pub(crate) client_response_field: Option<String>,
}

impl CheckOptions {
    /// Options for the protected resource `scope`.
    pub fn new(scope: impl Into<String>) -> Self {
        Self {
            scope: Some(scope.into()),
            ..Self::default()
        }
    }

    /// Operation on the resource, sent along with the scope.
    pub fn operation(mut self, operation: impl Into<String>) -> Self {
        self.operation = Some(operation.into());
        self
    }

    /// Redirect to the login page on every failure instead of answering
    /// 401/403.
    pub fn redirect_login(mut self, redirect: bool) -> Self {
        self.redirect_login = redirect;
        self
    }

    /// Where the login page should send the user back to. Defaults to the
    /// current request URL.
    pub fn redirect_uri(mut self, uri: impl Into<String>) -> Self {
        self.redirect_uri = Some(uri.into());
        self
    }

    /// Request field forwarded to the service as `clientRequest`.
    pub fn client_request_field(mut self, field: impl Into<String>) -> Self {
        self.client_request_field = Some(field.into());
        self
    }

    /// Request field receiving `authDetails`. Falls back to
    /// the client request field.
    pub fn client_response_field(mut self, field: impl Into<String>) -> Self {
        self.client_response_field = Some(field.into());
        self
    }
}

/// Authorization checker built by [`AuthGuard::check`](crate::AuthGuard::check).
pub struct AuthorizationCheck {
    config: Arc<GuardConfig>,
    client: Arc<dyn AuthServerClient>,
    scope: String,
    options: CheckOptions,
}

impl AuthorizationCheck {
    /// `options` must already have passed the scope and redirect checks.
    pub(crate) fn new(
        config: Arc<GuardConfig>,
        client: Arc<dyn AuthServerClient>,
        scope: String,
        options: CheckOptions,
    ) -> Self {
        Self {
            config,
            client,
            scope,
            options,
        }
    }

    /// Resource name sent with every check.
    pub fn scope(&self) -> &str {
        &self.scope
    }

    /// Login URL for a request, carrying the return address unencoded.
    pub fn redirect_url<R: GuardRequest + ?Sized>(&self, req: &R) -> String {
        let back = match self
            .options
            .redirect_uri
            .as_deref()
            .filter(|uri| !uri.is_empty())
        {
            Some(uri) => uri.to_string(),
            None => req.absolute_url(),
        };
        format!(
            "{}?response_type=code&scope={}&client_id={}&redirect_uri={}",
            self.config.server().auth_url,
            self.scope,
            self.config.client_id(),
            back
        )
    }

    /// Runs the check for one request.
    pub async fn authorize<R, S>(&self, req: &mut R, res: &mut S) -> Flow
    where
        R: GuardRequest + ?Sized,
        S: GuardResponse + ?Sized,
    {
        let log = GuardLog::new(req.request_id(), "check");

        if self.config.bypass_authorization {
            log.warn(format_args!(
                "authorization bypassed for scope {}",
                self.scope
            ));
            return Flow::Next;
        }

        let redirect_url = self.redirect_url(&*req);
        req.set_field(REDIRECT_URL_FIELD, Value::String(redirect_url.clone()));

        let token_name = self.config.token_name.as_str();
        let cookie_sourced = token::cookie(&*req, token_name).is_some();

        let Some(located) = locate_token(&*req, token_name) else {
            log.info(format_args!("no token for scope {}", self.scope));
            let violation = Violation::new(ViolationKind::NoToken, "No token");
            return self.redirect_or_unauthorized(res, &redirect_url, cookie_sourced, violation);
        };

        log.debug(format_args!(
            "token {} from {}",
            Secret::new(&located.value),
            located.source
        ));
        req.set_field(token_name, Value::String(located.value.clone()));

        let client_request = self
            .options
            .client_request_field
            .as_deref()
            .and_then(|field| req.field(field))
            .cloned()
            .unwrap_or_else(|| json!({}));
        let body = remote::authorization_request(
            &located.value,
            &self.scope,
            self.options.operation.as_deref(),
            client_request,
        );

        let reply = self
            .client
            .post_json(&self.config.server().user_auth_url, body)
            .instrument(log.span())
            .await
            .and_then(remote::usable_reply);

        let reply = match reply {
            Ok(reply) => reply,
            Err(e) => {
                log.error(format_args!("error authorizing {}: {}", self.scope, e));
                let violation =
                    Violation::new(ViolationKind::UpstreamUnavailable, "Failed to authorize");
                res.send(violation.status(), ReplyBody::Text(violation.message));
                return Flow::Halt;
            }
        };

        match Verdict::from_reply(&reply) {
            Verdict::NoSession => {
                log.info(format_args!("no user session for token"));
                let violation =
                    Violation::new(ViolationKind::ExpiredSession, "No user session for user token");
                self.redirect_or_unauthorized(res, &redirect_url, cookie_sourced, violation)
            }
            Verdict::Insufficient => {
                log.info(format_args!("insufficient privilege for scope {}", self.scope));
                if self.options.redirect_login {
                    res.redirect(&redirect_url);
                } else {
                    let violation =
                        Violation::new(ViolationKind::InsufficientPrivilege, INSUFFICIENT_PRIVILEGE);
                    res.send(
                        violation.status(),
                        ReplyBody::Json(json!({
                            "status": "Error",
                            "message": violation.message,
                            "location": redirect_url,
                        })),
                    );
                }
                Flow::Halt
            }
            Verdict::Granted(details) => {
                self.attach_details(req, details);
                log.debug(format_args!("authorized for scope {}", self.scope));
                Flow::Next
            }
        }
    }

    fn redirect_or_unauthorized<S: GuardResponse + ?Sized>(
        &self,
        res: &mut S,
        redirect_url: &str,
        clear_cookie: bool,
        violation: Violation,
    ) -> Flow {
        if clear_cookie {
            res.clear_cookie(&self.config.token_name);
        }
        if self.options.redirect_login {
            res.redirect(redirect_url);
        } else {
            res.send(
                violation.status(),
                ReplyBody::Json(json!({
                    "location": redirect_url,
                    "message": violation.message,
                })),
            );
        }
        Flow::Halt
    }

    // A destination that is missing or not an object is replaced.
    fn attach_details<R: GuardRequest + ?Sized>(&self, req: &mut R, details: Value) {
        let destination = self
            .options
            .client_response_field
            .as_deref()
            .or(self.options.client_request_field.as_deref());
        let Some(destination) = destination else {
            return;
        };

        if let Some(Value::Object(map)) = req.field_mut(destination) {
            map.insert(AUTH_DETAILS_KEY.to_string(), details);
            return;
        }
        let mut map = Map::new();
        map.insert(AUTH_DETAILS_KEY.to_string(), details);
        req.set_field(destination, Value::Object(map));
    }
}

#[async_trait]
impl<Req, Res> Middleware<Req, Res> for AuthorizationCheck
where
    Req: GuardRequest + Send + Sync,
    Res: GuardResponse + Send + Sync,
{
    async fn handle(&self, req: &mut Req, res: &mut Res) -> Flow {
        self.authorize(req, res).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ClientCredentials, ServerUrls};
    use crate::error::TransportError;
    use crate::remote::InMemoryAuthServer;
    use crate::web::{RequestAdapter, ResponseAdapter};

    const AUTH_URL: &str = "http://localhost/authorize";
    const CHECK_URL: &str = "http://localhost/userAuth";
    const REDIRECT: &str = "http://localhost/authorize?response_type=code&scope=SCOPE\
                            &client_id=test_client_id&redirect_uri=http://localhost/redirect";

    fn config(bypass: bool) -> Arc<GuardConfig> {
        Arc::new(
            GuardConfig::builder(
                ServerUrls::new(AUTH_URL, "http://localhost/swap", CHECK_URL),
                ClientCredentials::new("test_client_id"),
            )
            .bypass_authorization(bypass)
            .build(),
        )
    }

    fn checker(server: &InMemoryAuthServer, options: CheckOptions) -> AuthorizationCheck {
        AuthorizationCheck::new(config(false), Arc::new(server.clone()), "SCOPE".to_string(), options)
    }

    fn api_options() -> CheckOptions {
        CheckOptions::new("SCOPE").redirect_uri("http://localhost/redirect")
    }

    fn granting_server() -> InMemoryAuthServer {
        let server = InMemoryAuthServer::new();
        server.reply_json(CHECK_URL, json!({"authorised": "Y"}));
        server
    }

    async fn run(checker: &AuthorizationCheck, req: &mut RequestAdapter) -> (Flow, ResponseAdapter) {
        let mut res = ResponseAdapter::new();
        let flow = checker.authorize(req, &mut res).await;
        (flow, res)
    }

    #[tokio::test]
    async fn no_token_answers_401() {
        let server = granting_server();
        let mut req = RequestAdapter::new("req-1");

        let (flow, res) = run(&checker(&server, api_options()), &mut req).await;

        assert_eq!(flow, Flow::Halt);
        assert!(server.calls().is_empty());
        assert_eq!(res.replies().len(), 1);
        let reply = res.reply().unwrap();
        assert_eq!(reply.status, 401);
        assert_eq!(
            reply.body.as_json().unwrap(),
            &json!({"location": REDIRECT, "message": "No token"})
        );
        assert_eq!(req.field(REDIRECT_URL_FIELD), Some(&json!(REDIRECT)));
    }

    #[tokio::test]
    async fn no_token_redirects_when_asked() {
        let server = granting_server();
        let mut req = RequestAdapter::new("req-1");
        let options = api_options().redirect_login(true);

        let (flow, res) = run(&checker(&server, options), &mut req).await;

        assert_eq!(flow, Flow::Halt);
        let reply = res.reply().unwrap();
        assert!(reply.is_redirect());
        assert_eq!(reply.location.as_deref(), Some(REDIRECT));
    }

    #[tokio::test]
    async fn redirect_back_defaults_to_current_url() {
        let server = granting_server();
        let mut req = RequestAdapter::new("req-1");
        req.set_url("http", "TEST_HOST", "/test_url");
        let options = CheckOptions::new("SCOPE").redirect_login(true);

        let (_, res) = run(&checker(&server, options), &mut req).await;

        assert_eq!(
            res.reply().unwrap().location.as_deref(),
            Some(
                "http://localhost/authorize?response_type=code&scope=SCOPE\
                 &client_id=test_client_id&redirect_uri=http://TEST_HOST/test_url"
            )
        );
    }

    #[tokio::test]
    async fn empty_redirect_back_falls_back_to_current_url() {
        let server = granting_server();
        let mut req = RequestAdapter::new("req-1");
        req.set_url("https", "app", "/secure");
        let options = CheckOptions::new("SCOPE").redirect_login(true).redirect_uri("");

        let (_, res) = run(&checker(&server, options), &mut req).await;

        assert_eq!(
            res.reply().unwrap().location.as_deref(),
            Some(
                "http://localhost/authorize?response_type=code&scope=SCOPE\
                 &client_id=test_client_id&redirect_uri=https://app/secure"
            )
        );
    }

    #[tokio::test]
    async fn every_token_carrier_reaches_the_service() {
        let server = granting_server();
        let check = checker(&server, api_options());

        let mut header = RequestAdapter::new("h");
        header.add_header("Authorization", "Bearer TEST_TOKEN");
        let mut field = RequestAdapter::new("f");
        field.set_field("access_token", json!("TEST_TOKEN"));
        let mut body = RequestAdapter::new("b");
        body.add_body_field("access_token", "TEST_TOKEN");
        let mut query = RequestAdapter::new("q");
        query.add_query_param("access_token", "TEST_TOKEN");
        let mut cookie = RequestAdapter::new("c");
        cookie.add_cookie("access_token", "TEST_TOKEN");

        for mut req in [header, field, body, query, cookie] {
            let (flow, res) = run(&check, &mut req).await;
            assert_eq!(flow, Flow::Next);
            assert!(res.reply().is_none());
            assert_eq!(req.field("access_token"), Some(&json!("TEST_TOKEN")));
        }

        let calls = server.calls_to(CHECK_URL);
        assert_eq!(calls.len(), 5);
        for body in calls {
            assert_eq!(
                body,
                json!({"token": "TEST_TOKEN", "resource": "SCOPE", "clientRequest": {}})
            );
        }
    }

    #[tokio::test]
    async fn operation_and_client_request_are_forwarded() {
        let server = granting_server();
        let options = api_options()
            .operation("READ")
            .client_request_field("clientReq");
        let mut req = RequestAdapter::new("req-1");
        req.add_cookie("access_token", "T");
        req.set_field("clientReq", json!({"path": "/orders"}));

        run(&checker(&server, options), &mut req).await;

        assert_eq!(
            server.calls_to(CHECK_URL),
            vec![json!({
                "token": "T",
                "resource": "SCOPE",
                "operation": "READ",
                "clientRequest": {"path": "/orders"},
            })]
        );
    }

    #[tokio::test]
    async fn granted_details_land_on_client_request_field() {
        let server = InMemoryAuthServer::new();
        server.reply_json(
            CHECK_URL,
            json!({"authorised": "Y", "authDetails": {"testProperty": "testValue"}}),
        );
        let options = api_options().client_request_field("X");
        let mut req = RequestAdapter::new("req-1");
        req.add_cookie("access_token", "T");

        let (flow, _) = run(&checker(&server, options), &mut req).await;

        assert_eq!(flow, Flow::Next);
        assert_eq!(
            req.field("X"),
            Some(&json!({"authDetails": {"testProperty": "testValue"}}))
        );
    }

    #[tokio::test]
    async fn response_field_wins_and_existing_object_is_kept() {
        let server = InMemoryAuthServer::new();
        server.reply_json(CHECK_URL, json!({"authorised": "Y", "authDetails": {"k": "v"}}));
        let options = api_options()
            .client_request_field("clientReq")
            .client_response_field("clientRes");
        let mut req = RequestAdapter::new("req-1");
        req.add_cookie("access_token", "T");
        req.set_field("clientRes", json!({"existing": 1}));

        run(&checker(&server, options), &mut req).await;

        assert_eq!(
            req.field("clientRes"),
            Some(&json!({"existing": 1, "authDetails": {"k": "v"}}))
        );
        assert_eq!(req.field("clientReq"), None);
    }

    #[tokio::test]
    async fn granted_without_details_writes_empty_object() {
        let server = granting_server();
        let options = api_options().client_response_field("clientRes");
        let mut req = RequestAdapter::new("req-1");
        req.add_cookie("access_token", "T");

        run(&checker(&server, options), &mut req).await;

        assert_eq!(req.field("clientRes"), Some(&json!({"authDetails": {}})));
    }

    #[tokio::test]
    async fn insufficient_privilege_answers_403() {
        let server = InMemoryAuthServer::new();
        server.reply_json(CHECK_URL, json!({"authorised": "N"}));
        let mut req = RequestAdapter::new("req-1");
        req.add_cookie("access_token", "T");

        let (flow, res) = run(&checker(&server, api_options()), &mut req).await;

        assert_eq!(flow, Flow::Halt);
        assert!(!res.was_cleared("access_token"));
        let reply = res.reply().unwrap();
        assert_eq!(reply.status, 403);
        let body = reply.body.as_json().unwrap();
        assert_eq!(body["status"], "Error");
        assert_eq!(body["location"], REDIRECT);
        assert!(body["message"]
            .as_str()
            .unwrap()
            .contains("does not have the required role"));
    }

    #[tokio::test]
    async fn insufficient_privilege_redirects_when_asked() {
        let server = InMemoryAuthServer::new();
        server.reply_json(CHECK_URL, json!({"authorised": "N"}));
        let mut req = RequestAdapter::new("req-1");
        req.add_header("Authorization", "Bearer T");

        let (_, res) = run(&checker(&server, api_options().redirect_login(true)), &mut req).await;

        assert_eq!(res.reply().unwrap().location.as_deref(), Some(REDIRECT));
    }

    #[tokio::test]
    async fn missing_verdict_is_expired_session_and_clears_cookie() {
        let server = InMemoryAuthServer::new();
        server.reply_json(CHECK_URL, json!({}));
        let mut req = RequestAdapter::new("req-1");
        req.add_cookie("access_token", "T");

        let (flow, res) = run(&checker(&server, api_options()), &mut req).await;

        assert_eq!(flow, Flow::Halt);
        assert!(res.was_cleared("access_token"));
        let reply = res.reply().unwrap();
        assert_eq!(reply.status, 401);
        assert_eq!(
            reply.body.as_json().unwrap(),
            &json!({"location": REDIRECT, "message": "No user session for user token"})
        );
    }

    #[tokio::test]
    async fn expired_session_without_cookie_clears_nothing() {
        let server = InMemoryAuthServer::new();
        server.reply_json(CHECK_URL, json!({"authorised": null}));
        let mut req = RequestAdapter::new("req-1");
        req.add_header("Authorization", "Bearer T");

        let (_, res) = run(&checker(&server, api_options().redirect_login(true)), &mut req).await;

        assert!(res.cookie_changes().is_empty());
        assert!(res.reply().unwrap().is_redirect());
    }

    #[tokio::test]
    async fn transport_failure_answers_503() {
        let server = InMemoryAuthServer::new();
        server.reply_error(CHECK_URL, TransportError::Decode("not json".to_string()));
        let mut req = RequestAdapter::new("req-1");
        req.add_cookie("access_token", "T");

        let (flow, res) = run(&checker(&server, api_options().redirect_login(true)), &mut req).await;

        assert_eq!(flow, Flow::Halt);
        let reply = res.reply().unwrap();
        assert_eq!(reply.status, 503);
        assert_eq!(reply.body.as_text(), Some("Failed to authorize"));
    }

    #[tokio::test]
    async fn null_reply_answers_503() {
        let server = InMemoryAuthServer::new();
        server.reply_json(CHECK_URL, Value::Null);
        let mut req = RequestAdapter::new("req-1");
        req.add_header("Authorization", "Bearer T");

        let (flow, res) = run(&checker(&server, api_options()), &mut req).await;

        assert_eq!(flow, Flow::Halt);
        assert!(res.cookie_changes().is_empty());
        let reply = res.reply().unwrap();
        assert_eq!(reply.status, 503);
        assert_eq!(reply.body.as_text(), Some("Failed to authorize"));
    }

    #[tokio::test]
    async fn bypass_skips_token_and_service() {
        let server = InMemoryAuthServer::new();
        let check = AuthorizationCheck::new(
            config(true),
            Arc::new(server.clone()),
            "SCOPE".to_string(),
            api_options(),
        );
        let mut req = RequestAdapter::new("req-1");

        let (flow, res) = run(&check, &mut req).await;

        assert_eq!(flow, Flow::Next);
        assert!(res.reply().is_none());
        assert!(server.calls().is_empty());
    }
}
