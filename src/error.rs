use std::fmt;

/// Errors that can occur in the authorization guard.
#[derive(Debug)]
pub enum Error {
    /// The guard or one of its handlers could not be constructed
    Config(ConfigError),
    /// A request was refused
    Violation(Violation),
    /// The authorization service could not be reached or answered badly
    Transport(TransportError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Config(e) => write!(f, "Configuration error: {}", e),
            Error::Violation(v) => write!(f, "Request refused: {}", v),
            Error::Transport(e) => write!(f, "Authorization service error: {}", e),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Config(e) => Some(e),
            Error::Violation(v) => Some(v),
            Error::Transport(e) => Some(e),
        }
    }
}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Error::Config(e)
    }
}

impl From<Violation> for Error {
    fn from(v: Violation) -> Self {
        Error::Violation(v)
    }
}

impl From<TransportError> for Error {
    fn from(e: TransportError) -> Self {
        Error::Transport(e)
    }
}

/// Construction-time configuration failure.
///
/// These are returned from `AuthGuard::new` and the handler factories.
/// A guard that fails validation is never built, so no request ever sees
/// a half-configured handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// `server` or `client` section missing
    MissingServerOrClient,
    /// One of the mandatory server URLs is missing or empty
    MissingServerUrls,
    /// Keep-alive handler requested without `server.keepAliveURL`
    MissingKeepAliveUrl,
    /// Logout handler requested without `server.logoutURL`
    MissingLogoutUrl,
    /// Swap or check handler requested without a scope
    MissingScope,
    /// Check handler requested with neither `redirect_login` nor `redirect_uri`
    MissingRedirectTarget,
    /// The configuration document could not be parsed
    Parse(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::MissingServerOrClient => write!(f, "server and client are required"),
            ConfigError::MissingServerUrls => write!(
                f,
                "server.swapCodeURL and server.authURL and server.userAuthURL are required"
            ),
            ConfigError::MissingKeepAliveUrl => {
                write!(f, "server.keepAliveURL is required for keep-alive")
            }
            ConfigError::MissingLogoutUrl => write!(f, "server.logoutURL is required for logout"),
            ConfigError::MissingScope => write!(f, "scope resource name must be specified"),
            ConfigError::MissingRedirectTarget => {
                write!(f, "redirectLogin OR redirectURI must be specified")
            }
            ConfigError::Parse(msg) => write!(f, "invalid configuration: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

/// A refused request with details about why.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// The kind of violation that occurred
    pub kind: ViolationKind,
    /// Human-readable message, as written to the response
    pub message: String,
}

impl Violation {
    /// Creates a new violation.
    pub fn new(kind: ViolationKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// HTTP status the violation is surfaced with when not redirected.
    pub fn status(&self) -> u16 {
        self.kind.status()
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl std::error::Error for Violation {}

/// The kind of refusal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViolationKind {
    /// No token in any carriage channel
    NoToken,
    /// A token was presented but the authorization service knows no session for it
    ExpiredSession,
    /// A session exists but lacks the requested scope/operation
    InsufficientPrivilege,
    /// The authorization service failed or returned an unusable body
    UpstreamUnavailable,
    /// The double-submit XSRF check failed
    CsrfMismatch,
}

impl ViolationKind {
    /// Status code used when the violation is answered directly.
    pub fn status(self) -> u16 {
        match self {
            ViolationKind::NoToken | ViolationKind::ExpiredSession | ViolationKind::CsrfMismatch => {
                401
            }
            ViolationKind::InsufficientPrivilege => 403,
            ViolationKind::UpstreamUnavailable => 503,
        }
    }
}

impl fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ViolationKind::NoToken => write!(f, "No token"),
            ViolationKind::ExpiredSession => write!(f, "Expired session"),
            ViolationKind::InsufficientPrivilege => write!(f, "Insufficient privilege"),
            ViolationKind::UpstreamUnavailable => write!(f, "Upstream unavailable"),
            ViolationKind::CsrfMismatch => write!(f, "XSRF mismatch"),
        }
    }
}

/// Failure of a call to the authorization service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The request never produced a response (connect, DNS, timeout, ...)
    Network(String),
    /// The service answered with a non-2xx status
    Status {
        /// HTTP status returned
        status: u16,
        /// Raw response body, for logging
        body: String,
    },
    /// The response body was not valid JSON
    Decode(String),
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportError::Network(msg) => write!(f, "network error: {}", msg),
            TransportError::Status { status, body } => write!(f, "status {}: {}", status, body),
            TransportError::Decode(msg) => write!(f, "undecodable response: {}", msg),
        }
    }
}

impl std::error::Error for TransportError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_messages_match_documented_text() {
        assert_eq!(
            ConfigError::MissingServerOrClient.to_string(),
            "server and client are required"
        );
        assert_eq!(
            ConfigError::MissingScope.to_string(),
            "scope resource name must be specified"
        );
        assert_eq!(
            ConfigError::MissingRedirectTarget.to_string(),
            "redirectLogin OR redirectURI must be specified"
        );
    }

    #[test]
    fn violation_kinds_map_to_statuses() {
        assert_eq!(ViolationKind::NoToken.status(), 401);
        assert_eq!(ViolationKind::ExpiredSession.status(), 401);
        assert_eq!(ViolationKind::CsrfMismatch.status(), 401);
        assert_eq!(ViolationKind::InsufficientPrivilege.status(), 403);
        assert_eq!(ViolationKind::UpstreamUnavailable.status(), 503);
    }

    #[test]
    fn error_wraps_sources() {
        let err: Error = Violation::new(ViolationKind::CsrfMismatch, "XSRF Error").into();
        assert!(err.to_string().contains("XSRF Error"));
        assert!(std::error::Error::source(&err).is_some());
    }
}
