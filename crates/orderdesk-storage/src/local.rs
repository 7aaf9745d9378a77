//! Local persistent store
//!
//! A per-session string key-value store. Every `set`/`remove` that changes a
//! value is announced to every in-process listener as a [`StorageChange`],
//! including changes made by the storage mirror itself, so any component
//! watching a key sees remote-originated updates too.

use crate::error::StorageError;
use crate::subscription::{ListenerSet, Subscription};
use parking_lot::{ReentrantMutex, RwLock};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Change notification for one key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageChange {
    /// Key that changed
    pub key: String,
    /// Value before the change
    pub old_value: Option<String>,
    /// Value after the change; `None` when the key was removed
    pub new_value: Option<String>,
}

impl StorageChange {
    /// Check if this change removed the key
    #[inline]
    #[must_use]
    pub fn is_removal(&self) -> bool {
        self.new_value.is_none()
    }
}

/// Callback invoked for every local change
pub type ChangeListener = Arc<dyn Fn(&StorageChange) + Send + Sync>;

/// Per-session key-value store of strings
pub trait LocalStore: Send + Sync {
    /// Read a key
    fn get(&self, key: &str) -> Option<String>;

    /// Write a key, notifying listeners when the value changed
    ///
    /// # Errors
    /// Returns error if the backing medium rejects the write
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Remove a key, notifying listeners when it existed
    ///
    /// # Errors
    /// Returns error if the backing medium rejects the write
    fn remove(&self, key: &str) -> Result<(), StorageError>;

    /// All keys currently present, in sorted order
    fn keys(&self) -> Vec<String>;

    /// Listen for changes made anywhere in this process
    fn subscribe(&self, listener: ChangeListener) -> Subscription;

    /// Number of keys
    fn len(&self) -> usize {
        self.keys().len()
    }

    /// Check if the store holds no keys
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Deliver a change to every registered listener
pub(crate) fn notify(listeners: &ListenerSet<ChangeListener>, change: &StorageChange) {
    for listener in listeners.snapshot() {
        listener(change);
    }
}

/// In-memory local store
#[derive(Debug, Default)]
pub struct MemoryLocalStore {
    entries: RwLock<BTreeMap<String, String>>,
    listeners: ListenerSet<ChangeListener>,
    /// Held across a write and its notification so listeners see writes in order
    dispatch: ReentrantMutex<()>,
}

impl MemoryLocalStore {
    /// Create empty store
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create store pre-populated with entries, without notifications
    #[must_use]
    pub fn with_entries<K, V>(entries: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        let store = Self::new();
        {
            let mut guard = store.entries.write();
            for (key, value) in entries {
                guard.insert(key.into(), value.into());
            }
        }
        store
    }

    /// Number of registered listeners
    #[inline]
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }
}

impl LocalStore for MemoryLocalStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.read().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let _dispatch = self.dispatch.lock();
        let old_value = self.entries.write().insert(key.to_string(), value.to_string());
        if old_value.as_deref() == Some(value) {
            return Ok(());
        }

        notify(
            &self.listeners,
            &StorageChange {
                key: key.to_string(),
                old_value,
                new_value: Some(value.to_string()),
            },
        );
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let _dispatch = self.dispatch.lock();
        let Some(old_value) = self.entries.write().remove(key) else {
            return Ok(());
        };

        notify(
            &self.listeners,
            &StorageChange {
                key: key.to_string(),
                old_value: Some(old_value),
                new_value: None,
            },
        );
        Ok(())
    }

    fn keys(&self) -> Vec<String> {
        self.entries.read().keys().cloned().collect()
    }

    fn subscribe(&self, listener: ChangeListener) -> Subscription {
        self.listeners.insert(listener)
    }

    fn len(&self) -> usize {
        self.entries.read().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    fn recording(store: &MemoryLocalStore) -> (Arc<Mutex<Vec<StorageChange>>>, Subscription) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = seen.clone();
        let sub = store.subscribe(Arc::new(move |change: &StorageChange| {
            seen_clone.lock().push(change.clone());
        }));
        (seen, sub)
    }

    #[test]
    fn set_and_get() {
        let store = MemoryLocalStore::new();
        store.set("settings", "a").unwrap();

        assert_eq!(store.get("settings").as_deref(), Some("a"));
        assert_eq!(store.get("missing"), None);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn set_notifies_with_old_and_new_value() {
        let store = MemoryLocalStore::new();
        let (seen, _sub) = recording(&store);

        store.set("k", "1").unwrap();
        store.set("k", "2").unwrap();

        let seen = seen.lock();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[1].old_value.as_deref(), Some("1"));
        assert_eq!(seen[1].new_value.as_deref(), Some("2"));
    }

    #[test]
    fn unchanged_write_is_silent() {
        let store = MemoryLocalStore::new();
        store.set("k", "same").unwrap();
        let (seen, _sub) = recording(&store);

        store.set("k", "same").unwrap();
        assert!(seen.lock().is_empty());
    }

    #[test]
    fn remove_notifies_once() {
        let store = MemoryLocalStore::with_entries([("k", "v")]);
        let (seen, _sub) = recording(&store);

        store.remove("k").unwrap();
        store.remove("k").unwrap();

        let seen = seen.lock();
        assert_eq!(seen.len(), 1);
        assert!(seen[0].is_removal());
        assert_eq!(seen[0].old_value.as_deref(), Some("v"));
    }

    #[test]
    fn dropped_subscription_stops_delivery() {
        let store = MemoryLocalStore::new();
        let (seen, sub) = recording(&store);
        drop(sub);

        store.set("k", "v").unwrap();
        assert!(seen.lock().is_empty());
        assert_eq!(store.listener_count(), 0);
    }

    #[test]
    fn keys_are_sorted() {
        let store = MemoryLocalStore::with_entries([("b", "2"), ("a", "1"), ("c", "3")]);
        assert_eq!(store.keys(), vec!["a", "b", "c"]);
    }

    #[test]
    fn listener_may_read_store_during_notification() {
        let store = Arc::new(MemoryLocalStore::new());
        let observed = Arc::new(Mutex::new(None));

        let store_clone = store.clone();
        let observed_clone = observed.clone();
        let _sub = store.subscribe(Arc::new(move |change: &StorageChange| {
            *observed_clone.lock() = store_clone.get(&change.key);
        }));

        store.set("k", "v").unwrap();
        assert_eq!(observed.lock().as_deref(), Some("v"));
    }

    #[test]
    fn listener_may_write_store_during_notification() {
        let store = Arc::new(MemoryLocalStore::new());
        let store_clone = store.clone();
        let _sub = store.subscribe(Arc::new(move |change: &StorageChange| {
            if change.key == "source" {
                store_clone.set("copy", "seen").unwrap();
            }
        }));

        store.set("source", "v").unwrap();
        assert_eq!(store.get("copy").as_deref(), Some("seen"));
    }

    #[test]
    fn concurrent_writes_are_announced_in_write_order() {
        let store = Arc::new(MemoryLocalStore::new());
        let (seen, _sub) = recording(&store);

        let writers: Vec<_> = (0..4)
            .map(|writer| {
                let store = store.clone();
                std::thread::spawn(move || {
                    for i in 0..200 {
                        store.set("k", &format!("{writer}-{i}")).unwrap();
                    }
                })
            })
            .collect();
        for writer in writers {
            writer.join().unwrap();
        }

        let seen = seen.lock();
        for pair in seen.windows(2) {
            assert_eq!(pair[1].old_value, pair[0].new_value);
        }
        assert_eq!(seen.last().unwrap().new_value, store.get("k"));
    }
}
