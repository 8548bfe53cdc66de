use std::fmt;

/// Request-scoped logger for guard components.
///
/// Every event carries the request ID and the name of the component that
/// emitted it, so a single request can be followed through a whole chain.
///
/// Credentials must be wrapped in [`Secret`](crate::Secret) before being
/// formatted into a message:
///
/// ```no_run
/// # use auth_gate::{GuardLog, Secret};
/// let log = GuardLog::new("req-1", "check");
/// let token = "TEST_TOKEN";
/// log.debug(format_args!("resolved token {}", Secret::new(token)));
/// ```
#[derive(Debug, Clone)]
pub struct GuardLog {
    request_id: String,
    component: &'static str,
}

impl GuardLog {
    /// Creates a logger for one request in one component.
    pub fn new(request_id: impl Into<String>, component: &'static str) -> Self {
        Self {
            request_id: request_id.into(),
            component,
        }
    }

    /// Returns the request ID associated with this logger.
    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    /// Span covering outbound calls made for this request.
    pub fn span(&self) -> tracing::Span {
        tracing::debug_span!(
            "auth_gate",
            request_id = %self.request_id,
            component = self.component
        )
    }

    /// Logs an info-level message.
    pub fn info(&self, args: fmt::Arguments<'_>) {
        tracing::info!(request_id = %self.request_id, component = self.component, "{}", args);
    }

    /// Logs a warning-level message.
    pub fn warn(&self, args: fmt::Arguments<'_>) {
        tracing::warn!(request_id = %self.request_id, component = self.component, "{}", args);
    }

    /// Logs an error-level message.
    pub fn error(&self, args: fmt::Arguments<'_>) {
        tracing::error!(request_id = %self.request_id, component = self.component, "{}", args);
    }

    /// Logs a debug-level message.
    pub fn debug(&self, args: fmt::Arguments<'_>) {
        tracing::debug!(request_id = %self.request_id, component = self.component, "{}", args);
    }
}
