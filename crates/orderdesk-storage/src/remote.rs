//! Remote data store abstraction
//!
//! A shared realtime tree of JSON values addressed by [`RemotePath`]. Writes
//! are last-writer-wins per path; subscribers get the full current value of
//! the subscribed node on every change beneath it.

use crate::error::RemoteError;
use crate::path::RemotePath;
use crate::subscription::Subscription;
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::sync::Arc;

/// Key prefix the realtime client keeps for its own bookkeeping
pub const DEFAULT_RESERVED_PREFIX: &str = "firebase:";

/// Callback receiving the current value of a subscribed node
///
/// `None` means the node does not exist.
pub type SnapshotListener = Arc<dyn Fn(Option<Value>) + Send + Sync>;

/// Shared path-addressed JSON store
#[async_trait]
pub trait RemoteStore: Send + Sync + 'static {
    /// Read the value at `path`
    ///
    /// # Errors
    /// Returns error if the store cannot be reached
    async fn read(&self, path: &RemotePath) -> Result<Option<Value>, RemoteError>;

    /// Overwrite exactly `path`; `None` or `null` deletes the node
    ///
    /// # Errors
    /// Returns error if the store cannot be reached or refuses the write
    async fn write(&self, path: &RemotePath, value: Option<Value>) -> Result<(), RemoteError>;

    /// Write several children of `path` at once, leaving others untouched
    ///
    /// Keys of `children` may be relative multi-segment paths.
    ///
    /// # Errors
    /// Returns error if the store cannot be reached or refuses the write
    async fn update(&self, path: &RemotePath, children: Map<String, Value>)
        -> Result<(), RemoteError>;

    /// Remove the node at `path`
    ///
    /// # Errors
    /// Returns error if the store cannot be reached or refuses the write
    async fn delete(&self, path: &RemotePath) -> Result<(), RemoteError> {
        self.write(path, None).await
    }

    /// Listen to the node at `path`
    ///
    /// The listener fires with the current value right away, then after
    /// every change that affects the node.
    ///
    /// # Errors
    /// Returns error if the subscription cannot be established
    fn subscribe(
        &self,
        path: &RemotePath,
        listener: SnapshotListener,
    ) -> Result<Subscription, RemoteError>;

    /// Prefix of local keys the client library reserves for itself
    fn reserved_prefix(&self) -> &str {
        DEFAULT_RESERVED_PREFIX
    }
}

#[async_trait]
impl<T: RemoteStore + ?Sized> RemoteStore for Arc<T> {
    async fn read(&self, path: &RemotePath) -> Result<Option<Value>, RemoteError> {
        (**self).read(path).await
    }

    async fn write(&self, path: &RemotePath, value: Option<Value>) -> Result<(), RemoteError> {
        (**self).write(path, value).await
    }

    async fn update(
        &self,
        path: &RemotePath,
        children: Map<String, Value>,
    ) -> Result<(), RemoteError> {
        (**self).update(path, children).await
    }

    async fn delete(&self, path: &RemotePath) -> Result<(), RemoteError> {
        (**self).delete(path).await
    }

    fn subscribe(
        &self,
        path: &RemotePath,
        listener: SnapshotListener,
    ) -> Result<Subscription, RemoteError> {
        (**self).subscribe(path, listener)
    }

    fn reserved_prefix(&self) -> &str {
        (**self).reserved_prefix()
    }
}
