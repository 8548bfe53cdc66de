use std::fmt;

use serde::{Deserialize, Deserializer};

/// A wrapper that keeps credentials out of logs.
///
/// Client secrets, API keys and session tokens all pass through `Secret<T>`
/// whenever they are stored in configuration or handed to a `tracing` macro.
/// `Debug` and `Display` always print `[REDACTED]`; the value is only reachable
/// through [`expose_secret`](Self::expose_secret).
///
/// # Examples
///
/// ```
/// use auth_gate::Secret;
///
/// let key = Secret::new("sk-1234567890".to_string());
/// assert_eq!(format!("{:?}", key), "[REDACTED]");
/// assert_eq!(key.expose_secret(), "sk-1234567890");
/// ```
// Do NOT derive Clone, Copy or Default: duplicated secrets end up in places nobody audits.
pub struct Secret<T> {
    inner: T,
}

impl<T> Secret<T> {
    /// Wraps a sensitive value.
    pub fn new(value: T) -> Self {
        Self { inner: value }
    }

    /// Explicitly exposes the wrapped value.
    ///
    /// Never pass the result to a logging macro.
    pub fn expose_secret(&self) -> &T {
        &self.inner
    }
}

impl<T> From<T> for Secret<T> {
    fn from(value: T) -> Self {
        Self::new(value)
    }
}

impl<T> fmt::Debug for Secret<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

impl<T> fmt::Display for Secret<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Secret<T> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        T::deserialize(deserializer).map(Secret::new)
    }
}
