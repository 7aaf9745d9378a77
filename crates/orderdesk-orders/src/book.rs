//! Aggregated order list persisted in the local store
//!
//! Orders of every store live in one JSON array under `woocommerce_orders`,
//! each tagged with its store; [`OrderKey`] tells them apart.

use crate::error::OrdersError;
use crate::model::{Order, OrderKey, OrderStatus, Store};
use orderdesk_storage::LocalStore;
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;

/// Local key holding the order list
pub const ORDERS_KEY: &str = "woocommerce_orders";

/// Orders of all stores
#[derive(Clone)]
pub struct OrderBook {
    local: Arc<dyn LocalStore>,
}

impl std::fmt::Debug for OrderBook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrderBook")
            .field("key", &ORDERS_KEY)
            .finish_non_exhaustive()
    }
}

impl OrderBook {
    /// Create new book over a local store
    #[inline]
    #[must_use]
    pub fn new(local: Arc<dyn LocalStore>) -> Self {
        Self { local }
    }

    /// Every stored order
    ///
    /// # Errors
    /// Returns [`OrdersError::Corrupt`] if the stored list cannot be decoded
    pub fn load(&self) -> Result<Vec<Order>, OrdersError> {
        match self.local.get(ORDERS_KEY) {
            None => Ok(Vec::new()),
            Some(raw) => serde_json::from_str(&raw).map_err(|source| OrdersError::Corrupt {
                key: ORDERS_KEY,
                source,
            }),
        }
    }

    /// Replace the stored list
    ///
    /// # Errors
    /// Returns error if the list cannot be encoded or written
    pub fn save(&self, orders: &[Order]) -> Result<(), OrdersError> {
        let raw = serde_json::to_string(orders)?;
        self.local.set(ORDERS_KEY, &raw)?;
        Ok(())
    }

    /// Swap a store's orders for a fresh fetch; returns how many were stored
    ///
    /// # Errors
    /// Returns error if the list cannot be read or written
    pub fn replace_for_store(
        &self,
        store: &Store,
        fresh: Vec<Order>,
    ) -> Result<usize, OrdersError> {
        let mut orders = self.load()?;
        orders.retain(|order| order.store_id != store.id);

        let count = fresh.len();
        orders.extend(fresh.into_iter().map(|order| order.tagged(store)));
        self.save(&orders)?;
        Ok(count)
    }

    /// Set the status of the given orders; returns how many changed
    ///
    /// # Errors
    /// Returns error if the list cannot be read or written
    pub fn set_status(&self, keys: &[OrderKey], status: OrderStatus) -> Result<usize, OrdersError> {
        if keys.is_empty() {
            return Ok(0);
        }
        let wanted: HashSet<&OrderKey> = keys.iter().collect();
        let mut orders = self.load()?;

        let mut changed = 0;
        for order in &mut orders {
            if wanted.contains(&order.key()) && order.status != status.as_str() {
                order.status = status.as_str().to_string();
                changed += 1;
            }
        }
        if changed > 0 {
            self.save(&orders)?;
        }
        Ok(changed)
    }

    /// Fold an updated order into the list
    ///
    /// Top-level fields of `order` replace those of the stored order with the
    /// same key; unknown orders are appended.
    ///
    /// # Errors
    /// Returns error if the list cannot be read, merged or written
    pub fn merge(&self, order: Order) -> Result<Order, OrdersError> {
        let mut orders = self.load()?;
        let key = order.key();

        let merged = match orders.iter().position(|existing| existing.key() == key) {
            Some(index) => {
                let existing = &mut orders[index];
                let mut base = serde_json::to_value(&*existing)?;
                if let (Value::Object(base), Value::Object(patch)) =
                    (&mut base, serde_json::to_value(&order)?)
                {
                    base.extend(patch);
                }
                *existing = serde_json::from_value(base)?;
                existing.clone()
            }
            None => {
                orders.push(order.clone());
                order
            }
        };

        self.save(&orders)?;
        Ok(merged)
    }

    /// Stored orders, newest first; undated orders last
    ///
    /// # Errors
    /// Returns error if the stored list cannot be decoded
    pub fn sorted_newest_first(&self) -> Result<Vec<Order>, OrdersError> {
        let mut orders = self.load()?;
        sort_newest_first(&mut orders);
        Ok(orders)
    }
}

/// Sort by creation time, newest first; undated orders last
pub fn sort_newest_first(orders: &mut [Order]) {
    orders.sort_by(|a, b| b.created_at().cmp(&a.created_at()));
}
