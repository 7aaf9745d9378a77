//! Dashboard display preferences
//!
//! Stored in the remote data store under `screenOptions`, below the
//! configured data root, so every session shares them.

use crate::error::OrdersError;
use orderdesk_storage::{RemoteData, SnapshotListener, Subscription};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Remote path of the preferences, relative to the data root
pub const SCREEN_OPTIONS_PATH: &str = "screenOptions";

/// Default page size
pub const DEFAULT_ITEMS_PER_PAGE: u32 = 20;

/// Largest accepted page size
pub const MAX_ITEMS_PER_PAGE: u32 = 100;

/// Order table column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Column {
    /// Order number and store
    Order,
    /// Creation date
    Date,
    /// Status
    Status,
    /// Billing address
    Billing,
    /// Shipping address
    Shipping,
    /// Line items and customer note
    Items,
    /// Payment method
    Payment,
    /// Total and currency
    Total,
    /// Row actions
    Actions,
}

impl Column {
    /// Every column in table order
    pub const ALL: [Column; 9] = [
        Self::Order,
        Self::Date,
        Self::Status,
        Self::Billing,
        Self::Shipping,
        Self::Items,
        Self::Payment,
        Self::Total,
        Self::Actions,
    ];

    /// Stored name
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Order => "order",
            Self::Date => "date",
            Self::Status => "status",
            Self::Billing => "billing",
            Self::Shipping => "shipping",
            Self::Items => "items",
            Self::Payment => "payment",
            Self::Total => "total",
            Self::Actions => "actions",
        }
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Column {
    type Err = OrdersError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|column| column.as_str() == s)
            .ok_or_else(|| OrdersError::InvalidOption(format!("unknown column {s:?}")))
    }
}

fn shown() -> bool {
    true
}

/// Column visibility flags; all shown by default
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[allow(clippy::struct_excessive_bools)]
#[allow(missing_docs)]
pub struct VisibleColumns {
    #[serde(default = "shown")]
    pub order: bool,
    #[serde(default = "shown")]
    pub date: bool,
    #[serde(default = "shown")]
    pub status: bool,
    #[serde(default = "shown")]
    pub billing: bool,
    #[serde(default = "shown")]
    pub shipping: bool,
    #[serde(default = "shown")]
    pub items: bool,
    #[serde(default = "shown")]
    pub payment: bool,
    #[serde(default = "shown")]
    pub total: bool,
    #[serde(default = "shown")]
    pub actions: bool,
}

impl Default for VisibleColumns {
    fn default() -> Self {
        Self {
            order: true,
            date: true,
            status: true,
            billing: true,
            shipping: true,
            items: true,
            payment: true,
            total: true,
            actions: true,
        }
    }
}

impl VisibleColumns {
    /// Check if a column is shown
    #[must_use]
    pub fn is_visible(&self, column: Column) -> bool {
        *self.flag(column)
    }

    /// Show or hide a column
    pub fn set(&mut self, column: Column, visible: bool) {
        *self.flag_mut(column) = visible;
    }

    /// Shown columns in table order
    #[must_use]
    pub fn visible(&self) -> Vec<Column> {
        Column::ALL
            .into_iter()
            .filter(|column| self.is_visible(*column))
            .collect()
    }

    fn flag(&self, column: Column) -> &bool {
        match column {
            Column::Order => &self.order,
            Column::Date => &self.date,
            Column::Status => &self.status,
            Column::Billing => &self.billing,
            Column::Shipping => &self.shipping,
            Column::Items => &self.items,
            Column::Payment => &self.payment,
            Column::Total => &self.total,
            Column::Actions => &self.actions,
        }
    }

    fn flag_mut(&mut self, column: Column) -> &mut bool {
        match column {
            Column::Order => &mut self.order,
            Column::Date => &mut self.date,
            Column::Status => &mut self.status,
            Column::Billing => &mut self.billing,
            Column::Shipping => &mut self.shipping,
            Column::Items => &mut self.items,
            Column::Payment => &mut self.payment,
            Column::Total => &mut self.total,
            Column::Actions => &mut self.actions,
        }
    }
}

/// Shared display preferences
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScreenOptions {
    /// Orders per table page
    #[serde(default = "default_items_per_page")]
    pub items_per_page: u32,
    /// Column visibility
    #[serde(default)]
    pub visible_columns: VisibleColumns,
}

fn default_items_per_page() -> u32 {
    DEFAULT_ITEMS_PER_PAGE
}

impl Default for ScreenOptions {
    fn default() -> Self {
        Self {
            items_per_page: DEFAULT_ITEMS_PER_PAGE,
            visible_columns: VisibleColumns::default(),
        }
    }
}

impl ScreenOptions {
    /// Bring the page size into `1..=100`
    #[must_use]
    pub fn clamped(mut self) -> Self {
        self.items_per_page = self.items_per_page.clamp(1, MAX_ITEMS_PER_PAGE);
        self
    }
}

/// Reads and writes [`ScreenOptions`] through [`RemoteData`]
#[derive(Debug, Clone)]
pub struct ScreenOptionsRepo {
    data: RemoteData,
}

impl ScreenOptionsRepo {
    /// Create new repository
    #[inline]
    #[must_use]
    pub fn new(data: RemoteData) -> Self {
        Self { data }
    }

    /// Stored preferences, defaults when absent or unreadable
    ///
    /// # Errors
    /// Returns error if the remote store cannot be read
    pub async fn load(&self) -> Result<ScreenOptions, OrdersError> {
        let raw = self.data.load(Some(SCREEN_OPTIONS_PATH)).await?;
        Ok(decode(raw))
    }

    /// Replace the stored preferences
    ///
    /// # Errors
    /// Returns error if the remote write fails
    pub async fn save(&self, options: &ScreenOptions) -> Result<(), OrdersError> {
        self.data
            .save_as(Some(SCREEN_OPTIONS_PATH), &options.clamped())
            .await?;
        Ok(())
    }

    /// Show or hide one column
    ///
    /// # Errors
    /// Returns error if the remote store fails
    pub async fn set_column(
        &self,
        column: Column,
        visible: bool,
    ) -> Result<ScreenOptions, OrdersError> {
        let mut options = self.load().await?;
        options.visible_columns.set(column, visible);
        self.save(&options).await?;
        Ok(options)
    }

    /// Change the page size
    ///
    /// # Errors
    /// Returns [`OrdersError::InvalidOption`] outside `1..=100`, or error if
    /// the remote store fails
    pub async fn set_items_per_page(&self, items: u32) -> Result<ScreenOptions, OrdersError> {
        if !(1..=MAX_ITEMS_PER_PAGE).contains(&items) {
            return Err(OrdersError::InvalidOption(format!(
                "items per page must be between 1 and {MAX_ITEMS_PER_PAGE}, got {items}"
            )));
        }
        let mut options = self.load().await?;
        options.items_per_page = items;
        self.save(&options).await?;
        Ok(options)
    }

    /// Follow changes made by any session
    ///
    /// # Errors
    /// Returns error if the subscription cannot be set up
    pub fn watch(
        &self,
        listener: impl Fn(ScreenOptions) + Send + Sync + 'static,
    ) -> Result<Subscription, OrdersError> {
        let forward: SnapshotListener = Arc::new(move |raw| listener(decode(raw)));
        Ok(self.data.watch(Some(SCREEN_OPTIONS_PATH), forward)?)
    }
}

fn decode(raw: Option<serde_json::Value>) -> ScreenOptions {
    match raw.map(serde_json::from_value::<ScreenOptions>) {
        None => ScreenOptions::default(),
        Some(Ok(options)) => options.clamped(),
        Some(Err(e)) => {
            tracing::warn!(error = %e, "unreadable screen options, using defaults");
            ScreenOptions::default()
        }
    }
}
