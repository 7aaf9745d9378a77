//! Order summary figures and duplicate phone detection

use crate::model::{Order, OrderStatus};
use std::collections::{BTreeSet, HashMap};

/// Summary of a set of orders
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OrderStats {
    /// Orders counted
    pub total_orders: usize,
    /// Orders on hold
    pub on_hold: usize,
    /// Orders processing
    pub processing: usize,
    /// Orders completed
    pub completed: usize,
    /// Orders cancelled, failed or refunded
    pub cancelled: usize,
    /// Sum of order totals
    pub revenue: f64,
    /// Currency, when every order uses the same non-empty one
    ///
    /// An order without a currency counts as a currency of its own, so a
    /// mix of blank and `USD` has none.
    pub currency: Option<String>,
}

impl OrderStats {
    /// Compute figures over `orders`
    #[must_use]
    pub fn compute<'a>(orders: impl IntoIterator<Item = &'a Order>) -> Self {
        let mut stats = Self::default();
        let mut currencies = BTreeSet::new();

        for order in orders {
            stats.total_orders += 1;
            stats.revenue += order.total_amount();
            currencies.insert(order.currency.as_str());
            match order.status_kind() {
                Some(OrderStatus::OnHold) => stats.on_hold += 1,
                Some(OrderStatus::Processing) => stats.processing += 1,
                Some(OrderStatus::Completed) => stats.completed += 1,
                Some(status) if status.is_unsuccessful() => stats.cancelled += 1,
                _ => {}
            }
        }

        if currencies.len() == 1 {
            stats.currency = currencies
                .pop_first()
                .filter(|currency| !currency.is_empty())
                .map(str::to_string);
        }
        stats
    }
}

/// How often each billing phone occurs, compared by digits only
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PhoneCounts {
    counts: HashMap<String, usize>,
}

impl PhoneCounts {
    /// Count billing phones of `orders`
    #[must_use]
    pub fn compute<'a>(orders: impl IntoIterator<Item = &'a Order>) -> Self {
        let mut counts = HashMap::new();
        for order in orders {
            let phone = order.billing.phone_digits();
            if !phone.is_empty() {
                *counts.entry(phone).or_insert(0) += 1;
            }
        }
        Self { counts }
    }

    /// Check if another order shares this order's billing phone
    #[must_use]
    pub fn is_duplicate(&self, order: &Order) -> bool {
        self.counts
            .get(&order.billing.phone_digits())
            .is_some_and(|count| *count > 1)
    }
}
