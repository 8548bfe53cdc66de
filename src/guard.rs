use std::sync::Arc;

use crate::{
    api_key::validate_api_key,
    check::{AuthorizationCheck, CheckOptions},
    config::GuardConfig,
    csrf::XsrfGuard,
    error::ConfigError,
    notify::{KeepAlive, Logout},
    remote::AuthServerClient,
    swap::{CodeSwap, SwapOptions},
    web::GuardRequest,
};

/// Entry point: a validated configuration plus the transport to the
/// authorization service.
///
/// The configuration is checked once here. Each factory method checks its
/// own options and returns a handler holding a shared, immutable copy of the
/// configuration, so handlers can be built once at startup and reused for
/// every request.
///
/// # Examples
///
/// ```
/// use auth_gate::{AuthGuard, CheckOptions, ClientCredentials, ConfigError, GuardConfig,
///     InMemoryAuthServer, ServerUrls, SwapOptions};
///
/// let config = GuardConfig::builder(
///     ServerUrls::new("http://auth/login", "http://auth/swap", "http://auth/check"),
///     ClientCredentials::new("my-app"),
/// )
/// .build();
/// let guard = AuthGuard::new(config, InMemoryAuthServer::new()).unwrap();
///
/// assert!(guard.swap_code(SwapOptions::new().scope("orders")).is_ok());
/// assert_eq!(
///     guard.check(CheckOptions::new("orders")).err(),
///     Some(ConfigError::MissingRedirectTarget)
/// );
/// ```
#[derive(Clone)]
pub struct AuthGuard {
    config: Arc<GuardConfig>,
    client: Arc<dyn AuthServerClient>,
}

impl AuthGuard {
    /// Validates `config` and pairs it with `client`.
    pub fn new(config: GuardConfig, client: impl AuthServerClient) -> Result<Self, ConfigError> {
        Self::with_shared_client(config, Arc::new(client))
    }

    /// Like [`new`](Self::new), for a client already shared elsewhere.
    pub fn with_shared_client(
        config: GuardConfig,
        client: Arc<dyn AuthServerClient>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config: Arc::new(config),
            client,
        })
    }

    /// Validates `config` and talks to the service over HTTP.
    #[cfg(feature = "reqwest")]
    pub fn over_http(config: GuardConfig) -> Result<Self, ConfigError> {
        Self::new(config, crate::remote::HttpAuthServerClient::new())
    }

    /// The validated configuration.
    pub fn config(&self) -> &GuardConfig {
        &self.config
    }

    /// Third-party label of the request's `X-Api-Key`, if it is one of ours.
    pub fn valid_api_key<'g, R: GuardRequest + ?Sized>(&'g self, req: &R) -> Option<&'g str> {
        validate_api_key(req, self.config.api_key.as_ref())
    }

    /// Double-submit XSRF check. A `silent` guard forwards failures instead
    /// of answering 401.
    pub fn xsrf(&self, silent: bool) -> XsrfGuard {
        XsrfGuard::new(Arc::clone(&self.config), silent)
    }

    /// Keep-alive notifier. Needs `server.keepAliveURL`.
    pub fn keep_alive(&self) -> Result<KeepAlive, ConfigError> {
        let url = non_empty(self.config.server().keep_alive_url.as_deref())
            .ok_or(ConfigError::MissingKeepAliveUrl)?;
        Ok(KeepAlive::new(
            Arc::clone(&self.config),
            Arc::clone(&self.client),
            url.to_string(),
        ))
    }

    /// Logout notifier. Needs `server.logoutURL`.
    pub fn logout(&self, silent: bool) -> Result<Logout, ConfigError> {
        let url = non_empty(self.config.server().logout_url.as_deref())
            .ok_or(ConfigError::MissingLogoutUrl)?;
        Ok(Logout::new(
            Arc::clone(&self.config),
            Arc::clone(&self.client),
            url.to_string(),
            silent,
        ))
    }

    /// Code-swap exchanger.
    pub fn swap_code(&self, options: SwapOptions) -> Result<CodeSwap, ConfigError> {
        let scope = non_empty(options.scope.as_deref()).ok_or(ConfigError::MissingScope)?;
        Ok(CodeSwap::new(
            Arc::clone(&self.config),
            Arc::clone(&self.client),
            scope.to_string(),
            options.silent,
        ))
    }

    /// Authorization checker.
    pub fn check(&self, options: CheckOptions) -> Result<AuthorizationCheck, ConfigError> {
        let scope = non_empty(options.scope.as_deref())
            .ok_or(ConfigError::MissingScope)?
            .to_string();
        if !options.redirect_login && non_empty(options.redirect_uri.as_deref()).is_none() {
            return Err(ConfigError::MissingRedirectTarget);
        }
        Ok(AuthorizationCheck::new(
            Arc::clone(&self.config),
            Arc::clone(&self.client),
            scope,
            options,
        ))
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api_key::ApiKeys;
    use crate::config::{ClientCredentials, ServerUrls};
    use crate::remote::InMemoryAuthServer;
    use crate::web::RequestAdapter;

    fn urls() -> ServerUrls {
        ServerUrls::new("http://auth/login", "http://auth/swap", "http://auth/check")
    }

    fn guard_with(server: ServerUrls) -> AuthGuard {
        let config = GuardConfig::builder(server, ClientCredentials::new("my-app"))
            .api_key(ApiKeys::single("K"))
            .build();
        AuthGuard::new(config, InMemoryAuthServer::new()).unwrap()
    }

    #[test]
    fn invalid_config_is_rejected_up_front() {
        let config = GuardConfig::from_json_str("{}").unwrap();
        let result = AuthGuard::new(config, InMemoryAuthServer::new());
        assert_eq!(result.err(), Some(ConfigError::MissingServerOrClient));
    }

    #[test]
    fn swap_requires_scope() {
        let guard = guard_with(urls());
        assert_eq!(guard.swap_code(SwapOptions::new()).err(), Some(ConfigError::MissingScope));
        assert_eq!(
            guard.swap_code(SwapOptions::new().scope("")).err(),
            Some(ConfigError::MissingScope)
        );
    }

    #[test]
    fn check_requires_scope_before_redirect_target() {
        let guard = guard_with(urls());
        assert_eq!(
            guard.check(CheckOptions::default()).err(),
            Some(ConfigError::MissingScope)
        );
        assert_eq!(
            guard.check(CheckOptions::new("orders")).err(),
            Some(ConfigError::MissingRedirectTarget)
        );
        assert!(guard.check(CheckOptions::new("orders").redirect_login(true)).is_ok());
        assert!(guard
            .check(CheckOptions::new("orders").redirect_uri("http://app/back"))
            .is_ok());
    }

    #[test]
    fn notifiers_need_their_urls() {
        let guard = guard_with(urls());
        assert_eq!(guard.keep_alive().err(), Some(ConfigError::MissingKeepAliveUrl));
        assert_eq!(guard.logout(false).err(), Some(ConfigError::MissingLogoutUrl));

        let guard = guard_with(
            urls()
                .with_keep_alive_url("http://auth/keepAlive")
                .with_logout_url("http://auth/logout"),
        );
        assert!(guard.keep_alive().is_ok());
        assert!(guard.logout(true).is_ok());
    }

    #[test]
    fn valid_api_key_reports_label() {
        let guard = guard_with(urls());
        let mut req = RequestAdapter::new("req-1");
        assert_eq!(guard.valid_api_key(&req), None);

        req.add_header("X-Api-Key", " K ");
        assert_eq!(guard.valid_api_key(&req), Some("legacy"));
    }
}
