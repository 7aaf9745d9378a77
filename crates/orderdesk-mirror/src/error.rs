//! Error types for the storage mirror
//!
//! Remote failures while the mirror runs are logged and swallowed; these
//! errors only surface from setup and from talking to a stopped mirror.

use orderdesk_storage::RemoteError;

/// Storage mirror errors
#[derive(Debug, thiserror::Error)]
pub enum MirrorError {
    /// Mirror settings cannot be used
    #[error("invalid mirror configuration: {0}")]
    InvalidConfig(String),

    /// Remote path could not be built
    #[error("remote error: {0}")]
    Remote(#[from] RemoteError),

    /// Event loop is no longer running
    #[error("mirror stopped")]
    Stopped,
}

impl MirrorError {
    /// Create configuration error
    #[inline]
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = MirrorError::invalid_config("prefix contains '/'");
        assert_eq!(
            err.to_string(),
            "invalid mirror configuration: prefix contains '/'"
        );
        assert_eq!(MirrorError::Stopped.to_string(), "mirror stopped");
    }

    #[test]
    fn remote_errors_convert() {
        let err: MirrorError = RemoteError::invalid_path("a.b", "contains one of . # $ [ ] /").into();
        assert!(matches!(err, MirrorError::Remote(_)));
    }
}
