//! Dashboard operations combining a store back end, the registry and the book

use crate::book::OrderBook;
use crate::client::{OrderPatch, OrderSource, StatusUpdate};
use crate::error::OrdersError;
use crate::model::{Order, OrderKey, OrderStatus, StoreUpdate};
use crate::registry::StoreRegistry;
use chrono::Utc;
use std::collections::BTreeMap;

/// Outcome of a sync for one store
#[derive(Debug, Clone, PartialEq)]
pub struct StoreSync {
    /// Store id
    pub store_id: String,
    /// Store name
    pub store_name: String,
    /// Orders stored, or the failure message
    pub outcome: Result<usize, String>,
}

/// Outcome of a sync run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SyncReport {
    /// Per-store outcomes in registry order
    pub stores: Vec<StoreSync>,
}

impl SyncReport {
    /// Stores that synced
    #[must_use]
    pub fn succeeded(&self) -> usize {
        self.stores.iter().filter(|s| s.outcome.is_ok()).count()
    }

    /// Stores that failed
    #[must_use]
    pub fn failed(&self) -> usize {
        self.stores.len() - self.succeeded()
    }

    /// Orders stored across all stores
    #[must_use]
    pub fn orders(&self) -> usize {
        self.stores
            .iter()
            .filter_map(|s| s.outcome.as_ref().ok())
            .sum()
    }
}

/// Outcome of a batch status change
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    /// Orders whose status changed
    pub succeeded: usize,
    /// Orders that could not be changed
    pub failed: usize,
}

/// Fetch orders of one store or of every store
///
/// Stores are fetched one after the other. A failing store is marked
/// disconnected and reported; the remaining stores are still synced.
///
/// # Errors
/// Returns [`OrdersError::NoStores`] when nothing is registered,
/// [`OrdersError::StoreNotFound`] for an unknown `store_id`, or error if
/// local persistence fails
pub async fn sync_stores(
    source: &dyn OrderSource,
    registry: &StoreRegistry,
    book: &OrderBook,
    store_id: Option<&str>,
) -> Result<SyncReport, OrdersError> {
    let stores = match store_id {
        Some(id) => vec![registry.require(id)?],
        None => registry.list()?,
    };
    if stores.is_empty() {
        return Err(OrdersError::NoStores);
    }

    let mut report = SyncReport::default();
    for store in stores {
        let outcome = match source.fetch_orders(&store).await {
            Ok(orders) => {
                let count = book.replace_for_store(&store, orders)?;
                registry.update(&store.id, StoreUpdate::synced(Utc::now()))?;
                tracing::info!(store = %store.name, orders = count, "store synced");
                Ok(count)
            }
            Err(e) => {
                registry.update(&store.id, StoreUpdate::disconnected())?;
                tracing::error!(store = %store.name, error = %e, "store sync failed");
                Err(e.to_string())
            }
        };
        report.stores.push(StoreSync {
            store_id: store.id,
            store_name: store.name,
            outcome,
        });
    }
    Ok(report)
}

/// Set the status of orders across stores
///
/// Orders are grouped by store and sent as one batch per store. Orders of
/// unknown stores, of failed requests, and those the store rejects count as
/// failures; the rest get the new status in the book.
///
/// # Errors
/// Returns error if the registry or the book cannot be read or written
pub async fn update_status_batch(
    source: &dyn OrderSource,
    registry: &StoreRegistry,
    book: &OrderBook,
    orders: &[OrderKey],
    status: OrderStatus,
) -> Result<BatchReport, OrdersError> {
    let mut by_store: BTreeMap<&str, Vec<u64>> = BTreeMap::new();
    for key in orders {
        by_store
            .entry(key.store_id.as_str())
            .or_default()
            .push(key.order_id);
    }

    let mut report = BatchReport::default();
    let mut updated = Vec::new();
    for (store_id, ids) in by_store {
        let Some(store) = registry.get(store_id)? else {
            tracing::warn!(store_id, orders = ids.len(), "batch for unknown store");
            report.failed += ids.len();
            continue;
        };

        let updates: Vec<StatusUpdate> = ids
            .iter()
            .map(|&id| StatusUpdate { id, status })
            .collect();
        match source.batch_update_status(&store, &updates).await {
            Ok(outcome) => {
                for id in ids {
                    if outcome.is_rejected(id) {
                        report.failed += 1;
                    } else {
                        report.succeeded += 1;
                        updated.push(OrderKey::new(store_id, id));
                    }
                }
            }
            Err(e) => {
                tracing::error!(store = %store.name, error = %e, "batch status update failed");
                report.failed += ids.len();
            }
        }
    }

    book.set_status(&updated, status)?;
    tracing::info!(
        %status,
        succeeded = report.succeeded,
        failed = report.failed,
        "batch status update finished"
    );
    Ok(report)
}

/// Change fields of one order and fold the result into the book
///
/// # Errors
/// Returns [`OrdersError::StoreNotFound`] for an unknown store, the store's
/// error if the request fails, or error if the book cannot be written
pub async fn update_order_details(
    source: &dyn OrderSource,
    registry: &StoreRegistry,
    book: &OrderBook,
    store_id: &str,
    order_id: u64,
    patch: &OrderPatch,
) -> Result<Order, OrdersError> {
    let store = registry.require(store_id)?;
    let updated = source
        .update_order(&store, order_id, patch)
        .await?
        .tagged(&store);
    let merged = book.merge(updated)?;

    tracing::info!(store = %store.name, order_id, "order updated");
    Ok(merged)
}
