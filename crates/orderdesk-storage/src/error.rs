//! Error types for the storage layer

use std::path::PathBuf;

/// Local store errors
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Backing file could not be read or written
    #[error("i/o error on {}: {source}", path.display())]
    Io {
        /// File that failed
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Backing file exists but is not a JSON object of strings
    #[error("corrupt store file {}: {source}", path.display())]
    Corrupt {
        /// File that failed to parse
        path: PathBuf,
        /// Parse error
        #[source]
        source: serde_json::Error,
    },

    /// Serializing the store contents failed
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Remote data store errors
#[derive(Debug, thiserror::Error)]
pub enum RemoteError {
    /// Store could not be reached
    #[error("remote store unavailable: {0}")]
    Unavailable(String),

    /// Path or key cannot be addressed in the remote tree
    #[error("invalid remote path {path:?}: {reason}")]
    InvalidPath {
        /// Offending path or segment
        path: String,
        /// Why it was rejected
        reason: &'static str,
    },

    /// Store answered but refused the operation
    #[error("remote store rejected request ({status}): {message}")]
    Rejected {
        /// Status code reported by the store
        status: u16,
        /// Message reported by the store
        message: String,
    },

    /// Value could not be encoded or decoded
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Change stream ended
    #[error("subscription closed: {0}")]
    SubscriptionClosed(String),
}

impl RemoteError {
    /// Create invalid path error
    #[inline]
    pub fn invalid_path(path: impl Into<String>, reason: &'static str) -> Self {
        Self::InvalidPath {
            path: path.into(),
            reason,
        }
    }

    /// Check if the failure is transient
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Unavailable(_) | Self::SubscriptionClosed(_) => true,
            Self::Rejected { status, .. } => *status >= 500,
            Self::InvalidPath { .. } | Self::Serialization(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remote_error_display() {
        let err = RemoteError::invalid_path("a.b", "forbidden character");
        assert!(err.to_string().contains("a.b"));
        assert!(err.to_string().contains("forbidden character"));
    }

    #[test]
    fn remote_error_is_retryable() {
        assert!(RemoteError::Unavailable("offline".into()).is_retryable());
        assert!(RemoteError::Rejected {
            status: 503,
            message: "busy".into()
        }
        .is_retryable());
        assert!(!RemoteError::Rejected {
            status: 401,
            message: "Permission denied".into()
        }
        .is_retryable());
        assert!(!RemoteError::invalid_path("", "empty segment").is_retryable());
    }

    #[test]
    fn storage_error_mentions_path() {
        let err = StorageError::Io {
            path: PathBuf::from("/tmp/store.json"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "nope"),
        };
        assert!(err.to_string().contains("/tmp/store.json"));
    }
}
