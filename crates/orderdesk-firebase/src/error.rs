//! Error types for the realtime database client

use orderdesk_storage::RemoteError;

/// Realtime database client errors
#[derive(Debug, thiserror::Error)]
pub enum FirebaseError {
    /// Settings are unusable
    #[error("invalid firebase config: {0}")]
    InvalidConfig(String),

    /// Request could not be sent or its response not read
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Database answered with a non-success status
    #[error("database returned {status}: {message}")]
    Status {
        /// HTTP status code
        status: u16,
        /// `error` field of the response body, or the status text
        message: String,
    },

    /// Body or event payload is not the expected JSON
    #[error("malformed payload: {0}")]
    Decode(#[from] serde_json::Error),

    /// Path cannot be addressed in the database
    #[error(transparent)]
    Path(#[from] RemoteError),

    /// Server ended a change stream
    #[error("stream closed by server: {0}")]
    StreamClosed(String),

    /// Streaming needs a tokio runtime on the calling thread
    #[error("no tokio runtime available to drive the change stream")]
    NoRuntime,
}

impl FirebaseError {
    /// Check if retrying may succeed
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Request(e) => e.is_timeout() || e.is_connect() || e.is_body(),
            Self::Status { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }
}

impl From<FirebaseError> for RemoteError {
    fn from(e: FirebaseError) -> Self {
        match e {
            FirebaseError::Request(e) => RemoteError::Unavailable(e.to_string()),
            FirebaseError::Status { status, message } => RemoteError::Rejected { status, message },
            FirebaseError::Decode(e) => RemoteError::Serialization(e),
            FirebaseError::Path(e) => e,
            FirebaseError::StreamClosed(reason) => RemoteError::SubscriptionClosed(reason),
            other @ (FirebaseError::InvalidConfig(_) | FirebaseError::NoRuntime) => {
                RemoteError::Unavailable(other.to_string())
            }
        }
    }
}
