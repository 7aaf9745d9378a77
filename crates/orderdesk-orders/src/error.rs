//! Error types for order aggregation
//!
//! Covers:
//! - store back end failures (transport and non-2xx answers)
//! - local and remote persistence failures
//! - invalid input from the caller

use orderdesk_storage::{RemoteError, StorageError};

/// Order aggregation errors
#[derive(Debug, thiserror::Error)]
pub enum OrdersError {
    /// Store back end answered with a non-success status
    #[error("{message}")]
    Http {
        /// HTTP status code
        status: u16,
        /// Message from the response body, or a generic description
        message: String,
    },

    /// Request could not be sent or its response not read
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Store URL cannot be turned into an endpoint
    #[error("invalid store url {url:?}: {reason}")]
    InvalidUrl {
        /// Offending URL
        url: String,
        /// Parser message
        reason: String,
    },

    /// Persisted collection under a local key cannot be decoded
    #[error("corrupt data under local key {key}: {source}")]
    Corrupt {
        /// Local key holding the data
        key: &'static str,
        /// Decode error
        #[source]
        source: serde_json::Error,
    },

    /// Value could not be encoded or decoded
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Local store rejected a write
    #[error("local storage error: {0}")]
    Storage(#[from] StorageError),

    /// Remote data store failed
    #[error("remote storage error: {0}")]
    Remote(#[from] RemoteError),

    /// Store definition is incomplete
    #[error("invalid store: {0}")]
    InvalidStore(String),

    /// No store with the given id
    #[error("store not found: {0}")]
    StoreNotFound(String),

    /// Sync requested with no stores configured
    #[error("no stores configured, add a store first")]
    NoStores,

    /// Export requested for an empty order set
    #[error("no orders to export")]
    NothingToExport,

    /// Display preference out of range
    #[error("invalid option: {0}")]
    InvalidOption(String),

    /// CSV output failed
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    /// Output could not be written
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

impl OrdersError {
    /// Create HTTP error from a status and optional body message
    #[must_use]
    pub fn http(status: u16, message: Option<String>) -> Self {
        Self::Http {
            status,
            message: message.unwrap_or_else(|| format!("Request failed with status {status}")),
        }
    }

    /// Check if retrying the same call may succeed
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Http { status, .. } => *status >= 500 || *status == 429,
            Self::Request(e) => e.is_timeout() || e.is_connect(),
            Self::Remote(e) => e.is_retryable(),
            _ => false,
        }
    }

    /// Check if the error means the addressed thing does not exist
    #[inline]
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::StoreNotFound(_) | Self::Http { status: 404, .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_error_prefers_body_message() {
        let err = OrdersError::http(401, Some("Consumer key is invalid.".to_string()));
        assert_eq!(err.to_string(), "Consumer key is invalid.");

        let err = OrdersError::http(502, None);
        assert_eq!(err.to_string(), "Request failed with status 502");
    }

    #[test]
    fn classification() {
        assert!(OrdersError::http(503, None).is_retryable());
        assert!(OrdersError::http(429, None).is_retryable());
        assert!(!OrdersError::http(401, None).is_retryable());
        assert!(OrdersError::http(404, None).is_not_found());
        assert!(OrdersError::StoreNotFound("1".into()).is_not_found());
        assert!(!OrdersError::NoStores.is_not_found());
    }
}
