//! Static shared-secret validation for machine callers.
//!
//! The comparison is a plain trimmed, case-sensitive string equality over a
//! small list. It is not constant-time and keys are not hashed.

use serde::Deserialize;

use crate::secret::Secret;
use crate::token;
use crate::web::GuardRequest;

/// Header carrying the caller's API key.
pub const API_KEY_HEADER: &str = "X-Api-Key";

/// Label reported for a key configured as a bare string.
pub const LEGACY_LABEL: &str = "legacy";

/// One accepted key and the third party it identifies.
#[derive(Debug, Deserialize)]
pub struct ThirdPartyKey {
    /// Identity label returned on match
    #[serde(rename = "thirdParty")]
    pub third_party: String,
    /// Shared secret
    pub key: Secret<String>,
}

impl ThirdPartyKey {
    /// Creates a labelled key.
    pub fn new(third_party: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            third_party: third_party.into(),
            key: Secret::new(key.into()),
        }
    }
}

/// Configured API keys: a single legacy secret or a labelled list.
///
/// Deserializes from either a JSON string or an array of
/// `{"thirdParty": ..., "key": ...}` objects.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ApiKeys {
    /// One key, reported as [`LEGACY_LABEL`]
    Single(Secret<String>),
    /// Ordered list of labelled keys; the first match wins
    List(Vec<ThirdPartyKey>),
}

impl ApiKeys {
    /// A single legacy key.
    pub fn single(key: impl Into<String>) -> Self {
        ApiKeys::Single(Secret::new(key.into()))
    }

    /// A labelled list of keys.
    pub fn list(keys: impl IntoIterator<Item = ThirdPartyKey>) -> Self {
        ApiKeys::List(keys.into_iter().collect())
    }

    /// Whether no usable key is configured.
    pub fn is_empty(&self) -> bool {
        match self {
            ApiKeys::Single(key) => key.expose_secret().is_empty(),
            ApiKeys::List(keys) => keys.is_empty(),
        }
    }

    /// Label of the first key equal to `presented` after trimming both sides.
    ///
    /// # Examples
    ///
    /// ```
    /// use auth_gate::{ApiKeys, ThirdPartyKey};
    ///
    /// let keys = ApiKeys::list([
    ///     ThirdPartyKey::new("billing", "K1"),
    ///     ThirdPartyKey::new("reports", "K2"),
    /// ]);
    /// assert_eq!(keys.find(" K2 "), Some("reports"));
    /// assert_eq!(keys.find("k2"), None);
    ///
    /// assert_eq!(ApiKeys::single("K").find("K"), Some("legacy"));
    /// ```
    pub fn find(&self, presented: &str) -> Option<&str> {
        let presented = presented.trim();
        match self {
            ApiKeys::Single(key) => {
                (key.expose_secret().trim() == presented).then_some(LEGACY_LABEL)
            }
            ApiKeys::List(keys) => keys
                .iter()
                .find(|k| k.key.expose_secret().trim() == presented)
                .map(|k| k.third_party.as_str()),
        }
    }
}

/// Checks the request's `X-Api-Key` header against the configured keys.
///
/// Returns the matching third-party label, or `None` when keys are not
/// configured, the header is missing, or nothing matches.
pub fn validate_api_key<'k, R: GuardRequest + ?Sized>(
    req: &R,
    keys: Option<&'k ApiKeys>,
) -> Option<&'k str> {
    let keys = match keys {
        Some(keys) if !keys.is_empty() => keys,
        _ => {
            tracing::trace!(request_id = %req.request_id(), "apiKey not configured");
            return None;
        }
    };

    let presented = token::header(req, API_KEY_HEADER)?;

    let label = keys.find(presented);
    if label.is_none() {
        tracing::debug!(
            request_id = %req.request_id(),
            key = %Secret::new(presented),
            "invalid X-Api-Key"
        );
    }
    label
}
