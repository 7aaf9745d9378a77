//! Store registry persisted in the local store
//!
//! The registry keeps no copy of its own: every call reads the JSON array
//! under `woocommerce_stores`, so changes pulled in by the storage mirror are
//! seen immediately.

use crate::error::OrdersError;
use crate::model::{NewStore, Store, StoreUpdate};
use chrono::Utc;
use orderdesk_storage::LocalStore;
use std::sync::Arc;

/// Local key holding the store list
pub const STORES_KEY: &str = "woocommerce_stores";

/// Registered store back ends
#[derive(Clone)]
pub struct StoreRegistry {
    local: Arc<dyn LocalStore>,
}

impl std::fmt::Debug for StoreRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreRegistry")
            .field("key", &STORES_KEY)
            .finish_non_exhaustive()
    }
}

impl StoreRegistry {
    /// Create new registry over a local store
    #[inline]
    #[must_use]
    pub fn new(local: Arc<dyn LocalStore>) -> Self {
        Self { local }
    }

    /// Every registered store, in insertion order
    ///
    /// # Errors
    /// Returns [`OrdersError::Corrupt`] if the stored list cannot be decoded
    pub fn list(&self) -> Result<Vec<Store>, OrdersError> {
        match self.local.get(STORES_KEY) {
            None => Ok(Vec::new()),
            Some(raw) => serde_json::from_str(&raw).map_err(|source| OrdersError::Corrupt {
                key: STORES_KEY,
                source,
            }),
        }
    }

    /// Store by id
    ///
    /// # Errors
    /// Returns error if the stored list cannot be decoded
    pub fn get(&self, id: &str) -> Result<Option<Store>, OrdersError> {
        Ok(self.list()?.into_iter().find(|store| store.id == id))
    }

    /// Store by id, failing when unknown
    ///
    /// # Errors
    /// Returns [`OrdersError::StoreNotFound`] for an unknown id
    pub fn require(&self, id: &str) -> Result<Store, OrdersError> {
        self.get(id)?
            .ok_or_else(|| OrdersError::StoreNotFound(id.to_string()))
    }

    /// Register a store; it starts out connected and never synced
    ///
    /// # Errors
    /// Returns [`OrdersError::InvalidStore`] if a field is blank, or error if
    /// the list cannot be read or written
    pub fn add(&self, definition: NewStore) -> Result<Store, OrdersError> {
        if let Some(field) = definition.missing_field() {
            return Err(OrdersError::InvalidStore(format!("{field} is required")));
        }

        let mut stores = self.list()?;
        let mut id = Utc::now().timestamp_millis();
        while stores.iter().any(|store| store.id == id.to_string()) {
            id += 1;
        }

        let store = Store {
            id: id.to_string(),
            name: definition.name,
            url: definition.url,
            consumer_key: definition.consumer_key,
            consumer_secret: definition.consumer_secret,
            connected: true,
            last_sync: None,
        };
        stores.push(store.clone());
        self.persist(&stores)?;

        tracing::info!(store_id = %store.id, name = %store.name, "store added");
        Ok(store)
    }

    /// Change a store; returns `false` when the id is unknown
    ///
    /// # Errors
    /// Returns error if the list cannot be read or written
    pub fn update(&self, id: &str, update: StoreUpdate) -> Result<bool, OrdersError> {
        let mut stores = self.list()?;
        let Some(store) = stores.iter_mut().find(|store| store.id == id) else {
            return Ok(false);
        };
        update.apply(store);
        self.persist(&stores)?;
        Ok(true)
    }

    /// Remove a store; returns it when it existed
    ///
    /// # Errors
    /// Returns error if the list cannot be read or written
    pub fn delete(&self, id: &str) -> Result<Option<Store>, OrdersError> {
        let mut stores = self.list()?;
        let Some(index) = stores.iter().position(|store| store.id == id) else {
            return Ok(None);
        };
        let removed = stores.remove(index);
        self.persist(&stores)?;

        tracing::info!(store_id = %removed.id, name = %removed.name, "store removed");
        Ok(Some(removed))
    }

    fn persist(&self, stores: &[Store]) -> Result<(), OrdersError> {
        let raw = serde_json::to_string(stores)?;
        self.local.set(STORES_KEY, &raw)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use orderdesk_storage::MemoryLocalStore;
    use pretty_assertions::assert_eq;

    fn registry() -> (Arc<MemoryLocalStore>, StoreRegistry) {
        let local = Arc::new(MemoryLocalStore::new());
        (local.clone(), StoreRegistry::new(local))
    }

    fn definition(name: &str) -> NewStore {
        NewStore::new(name, "https://shop.example", "ck_1", "cs_1")
    }

    #[test]
    fn empty_registry_lists_nothing() {
        let (_, registry) = registry();
        assert!(registry.list().unwrap().is_empty());
        assert_eq!(registry.get("1").unwrap(), None);
    }

    #[test]
    fn add_assigns_unique_ids_and_connects() {
        let (_, registry) = registry();
        let first = registry.add(definition("A")).unwrap();
        let second = registry.add(definition("B")).unwrap();

        assert_ne!(first.id, second.id);
        assert!(first.connected);
        assert_eq!(first.last_sync, None);
        assert_eq!(
            registry
                .list()
                .unwrap()
                .iter()
                .map(|s| s.name.as_str())
                .collect::<Vec<_>>(),
            vec!["A", "B"]
        );
    }

    #[test]
    fn add_rejects_blank_fields() {
        let (local, registry) = registry();
        let err = registry
            .add(NewStore::new("A", "https://a", "", "cs"))
            .unwrap_err();
        assert!(matches!(err, OrdersError::InvalidStore(_)));
        assert_eq!(local.get(STORES_KEY), None);
    }

    #[test]
    fn update_unknown_id_is_a_no_op() {
        let (local, registry) = registry();
        registry.add(definition("A")).unwrap();
        let before = local.get(STORES_KEY);

        assert!(!registry.update("missing", StoreUpdate::disconnected()).unwrap());
        assert_eq!(local.get(STORES_KEY), before);
    }

    #[test]
    fn update_and_delete() {
        let (_, registry) = registry();
        let store = registry.add(definition("A")).unwrap();

        assert!(registry.update(&store.id, StoreUpdate::disconnected()).unwrap());
        assert!(!registry.require(&store.id).unwrap().connected);

        let removed = registry.delete(&store.id).unwrap().unwrap();
        assert_eq!(removed.id, store.id);
        assert_eq!(registry.delete(&store.id).unwrap(), None);
        assert!(matches!(
            registry.require(&store.id),
            Err(OrdersError::StoreNotFound(_))
        ));
    }

    #[test]
    fn reads_lists_written_by_other_sessions() {
        let (local, registry) = registry();
        local
            .set(
                STORES_KEY,
                r#"[{"id":"7","name":"Pulled","url":"https://p","consumerKey":"k","consumerSecret":"s","connected":false,"lastSync":null}]"#,
            )
            .unwrap();
        assert_eq!(registry.require("7").unwrap().name, "Pulled");
    }

    #[test]
    fn corrupt_list_is_reported() {
        let (local, registry) = registry();
        local.set(STORES_KEY, "{not json").unwrap();
        assert!(matches!(
            registry.list(),
            Err(OrdersError::Corrupt {
                key: STORES_KEY,
                ..
            })
        ));
    }
}
