//! Change stream events and the node cache they maintain
//!
//! The database sends `put` and `patch` events relative to the subscribed
//! node. [`NodeCache`] folds them into a full copy of that node so every
//! listener notification carries the whole value.

use crate::error::FirebaseError;
use crate::sse::SseEvent;
use orderdesk_storage::tree::{merge_at, set_at, value_at};
use orderdesk_storage::RemotePath;
use serde::Deserialize;
use serde_json::{Map, Value};

/// Decoded change stream event
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// Replace the node at `path`
    Put {
        /// Path relative to the subscribed node
        path: RemotePath,
        /// New value; `null` removes
        data: Value,
    },
    /// Write several children below `path`
    Patch {
        /// Path relative to the subscribed node
        path: RemotePath,
        /// Children keyed by relative path
        data: Map<String, Value>,
    },
    /// Connection heartbeat
    KeepAlive,
    /// Server revoked read access
    Cancel(String),
    /// Credential expired
    AuthRevoked(String),
    /// Event type this client does not handle
    Other(String),
}

#[derive(Deserialize)]
struct Payload {
    path: String,
    #[serde(default)]
    data: Value,
}

impl StreamEvent {
    /// Decode a server-sent event
    ///
    /// # Errors
    /// Returns error if a `put` or `patch` payload is malformed
    pub fn from_sse(event: &SseEvent) -> Result<Self, FirebaseError> {
        match event.event.as_str() {
            "put" => {
                let payload: Payload = serde_json::from_str(&event.data)?;
                Ok(Self::Put {
                    path: relative_path(&payload.path)?,
                    data: payload.data,
                })
            }
            "patch" => {
                let payload: Payload = serde_json::from_str(&event.data)?;
                let data: Map<String, Value> = serde_json::from_value(payload.data)?;
                Ok(Self::Patch {
                    path: relative_path(&payload.path)?,
                    data,
                })
            }
            "keep-alive" => Ok(Self::KeepAlive),
            "cancel" => Ok(Self::Cancel(event.data.clone())),
            "auth_revoked" => Ok(Self::AuthRevoked(event.data.clone())),
            other => Ok(Self::Other(other.to_string())),
        }
    }

    /// Check if the server will send nothing more on this stream
    #[inline]
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Cancel(_) | Self::AuthRevoked(_))
    }
}

fn relative_path(path: &str) -> Result<RemotePath, FirebaseError> {
    Ok(RemotePath::parse(path)?)
}

/// Full copy of a subscribed node
#[derive(Debug, Default)]
pub struct NodeCache {
    root: Value,
    primed: bool,
}

impl NodeCache {
    /// Create new empty cache
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current node value, `None` when empty
    #[must_use]
    pub fn value(&self) -> Option<Value> {
        value_at(&self.root, &RemotePath::root())
    }

    /// Apply an event; returns the node when listeners should hear about it
    ///
    /// The first `put` always notifies, later events only when they change
    /// the node.
    pub fn apply(&mut self, event: StreamEvent) -> Option<Option<Value>> {
        let before = self.value();
        match event {
            StreamEvent::Put { path, data } => set_at(&mut self.root, &path, Some(data)),
            StreamEvent::Patch { path, data } => merge_at(&mut self.root, &path, data),
            _ => return None,
        }

        let after = self.value();
        if !self.primed || after != before {
            self.primed = true;
            Some(after)
        } else {
            None
        }
    }

    /// Forget the node; the next `put` notifies again
    pub fn reset(&mut self) {
        self.root = Value::Null;
        self.primed = false;
    }
}
