//! Guard configuration.
//!
//! A [`GuardConfig`] is built once, validated when the `AuthGuard` is
//! constructed and never mutated afterwards. It can be deserialized from the
//! same JSON document layout the authorization service's clients already use:
//!
//! ```json
//! {
//!   "server": {
//!     "authURL": "http://localhost/auth",
//!     "swapCodeURL": "http://localhost/swapCode",
//!     "userAuthURL": "http://localhost/userAuth",
//!     "keepAliveURL": "http://localhost/keepalive",
//!     "logoutURL": "http://localhost/logout"
//!   },
//!   "client": { "client_id": "test_client_id" },
//!   "apiKey": [{ "thirdParty": "partner", "key": "K" }]
//! }
//! ```

use serde::Deserialize;

use crate::api_key::ApiKeys;
use crate::error::ConfigError;
use crate::secret::Secret;

/// Default name of the one-time authorization code field.
pub const DEFAULT_AUTH_CODE_PARAM: &str = "code";

/// Default name of the session token field and cookie.
pub const DEFAULT_TOKEN_NAME: &str = "access_token";

/// Remote endpoints of the authorization service.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServerUrls {
    /// Login page the browser is redirected to
    #[serde(rename = "authURL", default)]
    pub auth_url: String,
    /// Exchanges a one-time code for a session token
    #[serde(rename = "swapCodeURL", default)]
    pub swap_code_url: String,
    /// Answers authorization checks for a token
    #[serde(rename = "userAuthURL", default)]
    pub user_auth_url: String,
    /// Session keep-alive notification
    #[serde(rename = "keepAliveURL", default)]
    pub keep_alive_url: Option<String>,
    /// Session termination notification
    #[serde(rename = "logoutURL", default)]
    pub logout_url: Option<String>,
}

impl ServerUrls {
    /// Creates the mandatory part of the server section.
    pub fn new(
        auth_url: impl Into<String>,
        swap_code_url: impl Into<String>,
        user_auth_url: impl Into<String>,
    ) -> Self {
        Self {
            auth_url: auth_url.into(),
            swap_code_url: swap_code_url.into(),
            user_auth_url: user_auth_url.into(),
            keep_alive_url: None,
            logout_url: None,
        }
    }

    /// Sets the keep-alive URL.
    pub fn with_keep_alive_url(mut self, url: impl Into<String>) -> Self {
        self.keep_alive_url = Some(url.into());
        self
    }

    /// Sets the logout URL.
    pub fn with_logout_url(mut self, url: impl Into<String>) -> Self {
        self.logout_url = Some(url.into());
        self
    }
}

/// Identity of this application towards the authorization service.
#[derive(Debug, Deserialize)]
pub struct ClientCredentials {
    /// Client identifier sent on the login redirect
    pub client_id: String,
    /// Only used by legacy single-endpoint deployments
    #[serde(default)]
    pub client_secret: Option<Secret<String>>,
}

impl ClientCredentials {
    /// Credentials with only a client id.
    pub fn new(client_id: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: None,
        }
    }
}

/// Immutable configuration shared by every handler of one guard.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuardConfig {
    /// Remote endpoints (required)
    #[serde(default)]
    pub server: Option<ServerUrls>,
    /// Client identity (required)
    #[serde(default)]
    pub client: Option<ClientCredentials>,
    /// Field name carrying the one-time code
    #[serde(rename = "authCode", default = "default_auth_code_param")]
    pub auth_code_param: String,
    /// Field and cookie name carrying the session token
    #[serde(default = "default_token_name")]
    pub token_name: String,
    /// Shared secrets accepted in `X-Api-Key`
    #[serde(default)]
    pub api_key: Option<ApiKeys>,
    /// Skip remote authorization checks entirely (development only)
    #[serde(default)]
    pub bypass_authorization: bool,
}

fn default_auth_code_param() -> String {
    DEFAULT_AUTH_CODE_PARAM.to_string()
}

fn default_token_name() -> String {
    DEFAULT_TOKEN_NAME.to_string()
}

impl GuardConfig {
    /// Starts a builder with the two mandatory sections.
    ///
    /// # Examples
    ///
    /// ```
    /// use auth_gate::{ClientCredentials, GuardConfig, ServerUrls};
    ///
    /// let config = GuardConfig::builder(
    ///     ServerUrls::new("http://auth/login", "http://auth/swap", "http://auth/check"),
    ///     ClientCredentials::new("my-app"),
    /// )
    /// .token_name("session")
    /// .build();
    ///
    /// assert_eq!(config.token_name, "session");
    /// assert_eq!(config.auth_code_param, "code");
    /// ```
    pub fn builder(server: ServerUrls, client: ClientCredentials) -> GuardConfigBuilder {
        GuardConfigBuilder {
            config: GuardConfig {
                server: Some(server),
                client: Some(client),
                auth_code_param: default_auth_code_param(),
                token_name: default_token_name(),
                api_key: None,
                bypass_authorization: false,
            },
        }
    }

    /// Parses a JSON configuration document.
    ///
    /// Only the syntax is checked here; semantic validation happens in
    /// [`validate`](Self::validate) when the guard is built.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Checks the mandatory sections and URLs.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let (server, _client) = match (&self.server, &self.client) {
            (Some(server), Some(client)) => (server, client),
            _ => return Err(ConfigError::MissingServerOrClient),
        };

        if server.auth_url.is_empty()
            || server.swap_code_url.is_empty()
            || server.user_auth_url.is_empty()
        {
            return Err(ConfigError::MissingServerUrls);
        }

        Ok(())
    }

    /// Server section. Only valid after [`validate`](Self::validate) succeeded.
    pub(crate) fn server(&self) -> &ServerUrls {
        // validate() rejects configs without a server section
        self.server.as_ref().unwrap_or(&EMPTY_SERVER)
    }

    /// Client id. Only valid after [`validate`](Self::validate) succeeded.
    pub(crate) fn client_id(&self) -> &str {
        self.client.as_ref().map_or("", |c| c.client_id.as_str())
    }
}

static EMPTY_SERVER: ServerUrls = ServerUrls {
    auth_url: String::new(),
    swap_code_url: String::new(),
    user_auth_url: String::new(),
    keep_alive_url: None,
    logout_url: None,
};

/// Builder for [`GuardConfig`].
#[derive(Debug)]
pub struct GuardConfigBuilder {
    config: GuardConfig,
}

impl GuardConfigBuilder {
    /// Overrides the one-time code field name (default `code`).
    pub fn auth_code_param(mut self, name: impl Into<String>) -> Self {
        self.config.auth_code_param = name.into();
        self
    }

    /// Overrides the token field/cookie name (default `access_token`).
    pub fn token_name(mut self, name: impl Into<String>) -> Self {
        self.config.token_name = name.into();
        self
    }

    /// Sets the accepted API keys.
    pub fn api_key(mut self, keys: ApiKeys) -> Self {
        self.config.api_key = Some(keys);
        self
    }

    /// Disables remote authorization checks.
    pub fn bypass_authorization(mut self, bypass: bool) -> Self {
        self.config.bypass_authorization = bypass;
        self
    }

    /// Finishes the configuration.
    pub fn build(self) -> GuardConfig {
        self.config
    }
}
