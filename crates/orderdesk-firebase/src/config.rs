//! Database connection settings

use crate::error::FirebaseError;
use orderdesk_storage::DEFAULT_RESERVED_PREFIX;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Connection settings for one realtime database
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FirebaseConfig {
    /// Database base URL, e.g. `https://example.firebaseio.com`
    pub database_url: String,
    /// Credential sent as the `auth` query parameter
    pub auth: Option<String>,
    /// Timeout for plain REST calls; streams are not limited
    pub timeout_secs: u64,
    /// Delay before a dropped change stream reconnects
    pub reconnect_delay_ms: u64,
    /// Prefix the client library uses for its own local keys
    pub reserved_prefix: String,
}

impl Default for FirebaseConfig {
    fn default() -> Self {
        Self {
            database_url: String::new(),
            auth: None,
            timeout_secs: 30,
            reconnect_delay_ms: 1_000,
            reserved_prefix: DEFAULT_RESERVED_PREFIX.to_string(),
        }
    }
}

impl FirebaseConfig {
    /// Create new config for a database URL
    #[must_use]
    pub fn new(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            ..Self::default()
        }
    }

    /// Set the credential
    #[must_use]
    pub fn with_auth(mut self, auth: impl Into<String>) -> Self {
        self.auth = Some(auth.into());
        self
    }

    /// Set the reconnect delay
    #[must_use]
    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// REST call timeout
    #[inline]
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Stream reconnect delay
    #[inline]
    #[must_use]
    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }

    /// Parsed database URL
    ///
    /// # Errors
    /// Returns error if the URL is missing, malformed or not http(s)
    pub fn base_url(&self) -> Result<Url, FirebaseError> {
        if self.database_url.trim().is_empty() {
            return Err(FirebaseError::InvalidConfig(
                "database_url is required".to_string(),
            ));
        }
        let url = Url::parse(self.database_url.trim())
            .map_err(|e| FirebaseError::InvalidConfig(format!("database_url: {e}")))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(FirebaseError::InvalidConfig(format!(
                "database_url must be http or https, got {}",
                url.scheme()
            )));
        }
        if url.cannot_be_a_base() {
            return Err(FirebaseError::InvalidConfig(
                "database_url cannot be a base URL".to_string(),
            ));
        }
        Ok(url)
    }
}
