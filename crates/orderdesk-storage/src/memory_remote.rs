//! In-process remote data store
//!
//! Holds the whole tree as one JSON value. Listeners are notified after each
//! mutation, in registration order, only when the value at their own path
//! actually changed. Mutations and their notifications are serialized so
//! every listener sees changes in commit order.

use crate::error::RemoteError;
use crate::path::RemotePath;
use crate::remote::{RemoteStore, SnapshotListener};
use crate::subscription::{ListenerSet, Subscription};
use crate::tree;
use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use serde_json::{Map, Value};
use std::sync::atomic::{AtomicBool, Ordering};

type PathListener = (RemotePath, SnapshotListener);

/// Remote store backed by an in-memory JSON tree
#[derive(Debug)]
pub struct MemoryRemoteStore {
    tree: RwLock<Value>,
    listeners: ListenerSet<PathListener>,
    dispatch: Mutex<()>,
    available: AtomicBool,
    reserved_prefix: String,
}

impl Default for MemoryRemoteStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryRemoteStore {
    /// Create empty store
    #[must_use]
    pub fn new() -> Self {
        Self::with_value(Value::Null)
    }

    /// Create store holding an initial tree
    #[must_use]
    pub fn with_value(root: Value) -> Self {
        Self {
            tree: RwLock::new(tree::prune(root)),
            listeners: ListenerSet::new(),
            dispatch: Mutex::new(()),
            available: AtomicBool::new(true),
            reserved_prefix: crate::remote::DEFAULT_RESERVED_PREFIX.to_string(),
        }
    }

    /// Override the reserved local key prefix reported to clients
    #[must_use]
    pub fn with_reserved_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.reserved_prefix = prefix.into();
        self
    }

    /// Simulate losing or regaining connectivity
    ///
    /// While unavailable every operation fails with
    /// [`RemoteError::Unavailable`] and no listener fires.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Current value at `path` without going through the async API
    #[must_use]
    pub fn value(&self, path: &RemotePath) -> Option<Value> {
        tree::value_at(&self.tree.read(), path)
    }

    /// Whole tree
    #[must_use]
    pub fn root(&self) -> Value {
        self.tree.read().clone()
    }

    /// Number of active subscriptions
    #[inline]
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.listeners.len()
    }

    fn ensure_available(&self) -> Result<(), RemoteError> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(RemoteError::Unavailable("memory store offline".to_string()))
        }
    }

    /// Apply a mutation, then notify every listener whose node changed
    fn commit(&self, changed: &RemotePath, mutate: impl FnOnce(&mut Value)) {
        let _dispatch = self.dispatch.lock();

        let listeners: Vec<PathListener> = self
            .listeners
            .snapshot()
            .into_iter()
            .filter(|(path, _)| path.overlaps(changed))
            .collect();

        let pending: Vec<(SnapshotListener, Option<Value>)> = {
            let mut root = self.tree.write();
            let before: Vec<Option<Value>> = listeners
                .iter()
                .map(|(path, _)| tree::value_at(&root, path))
                .collect();

            mutate(&mut root);

            listeners
                .into_iter()
                .zip(before)
                .filter_map(|((path, listener), old)| {
                    let new = tree::value_at(&root, &path);
                    (new != old).then_some((listener, new))
                })
                .collect()
        };

        for (listener, value) in pending {
            listener(value);
        }
    }
}

#[async_trait]
impl RemoteStore for MemoryRemoteStore {
    async fn read(&self, path: &RemotePath) -> Result<Option<Value>, RemoteError> {
        self.ensure_available()?;
        Ok(self.value(path))
    }

    async fn write(&self, path: &RemotePath, value: Option<Value>) -> Result<(), RemoteError> {
        self.ensure_available()?;
        tracing::trace!(path = %path, delete = value.is_none(), "memory remote write");
        self.commit(path, |root| tree::set_at(root, path, value));
        Ok(())
    }

    async fn update(
        &self,
        path: &RemotePath,
        children: Map<String, Value>,
    ) -> Result<(), RemoteError> {
        self.ensure_available()?;
        for key in children.keys() {
            RemotePath::parse(key)?;
        }
        self.commit(path, |root| tree::merge_at(root, path, children));
        Ok(())
    }

    fn subscribe(
        &self,
        path: &RemotePath,
        listener: SnapshotListener,
    ) -> Result<Subscription, RemoteError> {
        self.ensure_available()?;
        let subscription = self.listeners.insert((path.clone(), listener.clone()));
        listener(self.value(path));
        Ok(subscription)
    }

    fn reserved_prefix(&self) -> &str {
        &self.reserved_prefix
    }
}
