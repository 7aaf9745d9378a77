//! Root-scoped access to the remote store
//!
//! Application data lives under one root node. [`RemoteData`] resolves
//! sub-paths against that root and adds typed load/save through serde.

use crate::error::RemoteError;
use crate::path::RemotePath;
use crate::remote::{RemoteStore, SnapshotListener};
use crate::subscription::Subscription;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::Arc;

/// Remote store view rooted at an optional base path
#[derive(Clone)]
pub struct RemoteData {
    store: Arc<dyn RemoteStore>,
    root: Option<RemotePath>,
}

impl std::fmt::Debug for RemoteData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteData").field("root", &self.root).finish()
    }
}

impl RemoteData {
    /// Create view over `store`; an empty or `/` root means the tree root
    ///
    /// # Errors
    /// Returns error if `root` is not a valid path
    pub fn new(store: Arc<dyn RemoteStore>, root: Option<&str>) -> Result<Self, RemoteError> {
        let root = root
            .map(RemotePath::parse)
            .transpose()?
            .filter(|path| !path.is_root());
        Ok(Self { store, root })
    }

    /// Underlying store
    #[inline]
    #[must_use]
    pub fn store(&self) -> &Arc<dyn RemoteStore> {
        &self.store
    }

    /// Resolve a sub-path against the root
    ///
    /// Root and sub are joined when both are set; otherwise whichever is
    /// set is used, and the tree root when neither is.
    ///
    /// # Errors
    /// Returns error if `sub` is not a valid path
    pub fn resolve(&self, sub: Option<&str>) -> Result<RemotePath, RemoteError> {
        let sub = sub.map(RemotePath::parse).transpose()?;
        Ok(match (&self.root, sub) {
            (Some(root), Some(sub)) => root.join(&sub),
            (Some(root), None) => root.clone(),
            (None, Some(sub)) => sub,
            (None, None) => RemotePath::root(),
        })
    }

    /// Overwrite the node at `sub`
    ///
    /// # Errors
    /// Returns error if the path is invalid or the write fails
    pub async fn save(&self, sub: Option<&str>, value: Value) -> Result<(), RemoteError> {
        let path = self.resolve(sub)?;
        self.store.write(&path, Some(value)).await
    }

    /// Serialize and overwrite the node at `sub`
    ///
    /// # Errors
    /// Returns error if serialization, the path or the write fails
    pub async fn save_as<T: Serialize + Sync>(
        &self,
        sub: Option<&str>,
        value: &T,
    ) -> Result<(), RemoteError> {
        let value = serde_json::to_value(value)?;
        self.save(sub, value).await
    }

    /// Write several children of `sub`
    ///
    /// # Errors
    /// Returns error if the path is invalid or the write fails
    pub async fn update(
        &self,
        sub: Option<&str>,
        children: Map<String, Value>,
    ) -> Result<(), RemoteError> {
        let path = self.resolve(sub)?;
        self.store.update(&path, children).await
    }

    /// Remove the node at `sub`
    ///
    /// # Errors
    /// Returns error if the path is invalid or the delete fails
    pub async fn delete(&self, sub: Option<&str>) -> Result<(), RemoteError> {
        let path = self.resolve(sub)?;
        self.store.delete(&path).await
    }

    /// Read the node at `sub`
    ///
    /// # Errors
    /// Returns error if the path is invalid or the read fails
    pub async fn load(&self, sub: Option<&str>) -> Result<Option<Value>, RemoteError> {
        let path = self.resolve(sub)?;
        self.store.read(&path).await
    }

    /// Read and deserialize the node at `sub`
    ///
    /// # Errors
    /// Returns error if the path, the read or deserialization fails
    pub async fn load_as<T: DeserializeOwned>(
        &self,
        sub: Option<&str>,
    ) -> Result<Option<T>, RemoteError> {
        self.load(sub)
            .await?
            .map(serde_json::from_value)
            .transpose()
            .map_err(RemoteError::from)
    }

    /// Listen to the node at `sub`
    ///
    /// # Errors
    /// Returns error if the path is invalid or the subscription fails
    pub fn watch(
        &self,
        sub: Option<&str>,
        listener: SnapshotListener,
    ) -> Result<Subscription, RemoteError> {
        let path = self.resolve(sub)?;
        self.store.subscribe(&path, listener)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory_remote::MemoryRemoteStore;
    use parking_lot::Mutex;
    use serde::Deserialize;
    use serde_json::json;

    fn data(root: Option<&str>) -> (Arc<MemoryRemoteStore>, RemoteData) {
        let store = Arc::new(MemoryRemoteStore::new());
        let data = RemoteData::new(store.clone(), root).unwrap();
        (store, data)
    }

    #[test]
    fn resolve_combinations() {
        let (_, rooted) = data(Some("gbox-admin"));
        let (_, bare) = data(None);

        assert_eq!(
            rooted.resolve(Some("screenOptions")).unwrap().to_string(),
            "gbox-admin/screenOptions"
        );
        assert_eq!(rooted.resolve(None).unwrap().to_string(), "gbox-admin");
        assert_eq!(bare.resolve(Some("a/b")).unwrap().to_string(), "a/b");
        assert_eq!(bare.resolve(None).unwrap().to_string(), "/");
    }

    #[test]
    fn slash_root_is_tree_root() {
        let (_, data) = data(Some("/"));
        assert!(data.resolve(None).unwrap().is_root());
    }

    #[tokio::test]
    async fn typed_round_trip() {
        #[derive(Debug, PartialEq, Serialize, Deserialize)]
        struct Prefs {
            per_page: u32,
        }

        let (store, data) = data(Some("gbox-admin"));
        data.save_as(Some("prefs"), &Prefs { per_page: 50 }).await.unwrap();

        assert_eq!(
            store.value(&RemotePath::parse("gbox-admin/prefs").unwrap()),
            Some(json!({"per_page": 50}))
        );
        let loaded: Option<Prefs> = data.load_as(Some("prefs")).await.unwrap();
        assert_eq!(loaded, Some(Prefs { per_page: 50 }));
    }

    #[tokio::test]
    async fn load_missing_is_none() {
        let (_, data) = data(Some("gbox-admin"));
        let loaded: Option<Value> = data.load_as(Some("missing")).await.unwrap();
        assert_eq!(loaded, None);
    }

    #[tokio::test]
    async fn update_and_delete_are_scoped_to_root() {
        let (store, data) = data(Some("gbox-admin"));
        data.update(None, json!({"a": 1, "b": 2}).as_object().cloned().unwrap())
            .await
            .unwrap();
        data.delete(Some("a")).await.unwrap();

        assert_eq!(store.root(), json!({"gbox-admin": {"b": 2}}));
    }

    #[tokio::test]
    async fn watch_sees_saves() {
        let (_, data) = data(Some("gbox-admin"));
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = seen.clone();
        let _sub = data
            .watch(
                Some("screenOptions"),
                Arc::new(move |value| seen_clone.lock().push(value)),
            )
            .unwrap();

        data.save(Some("screenOptions"), json!({"itemsPerPage": 10}))
            .await
            .unwrap();

        let seen = seen.lock();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0], None);
        assert_eq!(seen[1], Some(json!({"itemsPerPage": 10})));
    }
}
