//! orderdesk order aggregation
//!
//! Multi-store WooCommerce order handling on top of the local store:
//! - [`StoreRegistry`]: registered store back ends (`woocommerce_stores`)
//! - [`OrderBook`]: aggregated orders of every store (`woocommerce_orders`)
//! - [`OrderSource`] / [`WooClient`]: the REST back end seam
//! - [`sync_stores`], [`update_status_batch`], [`update_order_details`]
//! - [`OrderFilter`], [`OrderStats`], [`PhoneCounts`], [`Page`] for listing
//! - [`ScreenOptionsRepo`]: display preferences shared through the remote store
//! - [`export_csv`]: spreadsheet export
//!
//! Both persisted collections live in the local store, so a running storage
//! mirror shares them between sessions without this crate knowing.
//!
//! # Example
//!
//! ```rust,no_run
//! use orderdesk_orders::{sync_stores, ClientConfig, OrderBook, StoreRegistry, WooClient};
//! use orderdesk_storage::MemoryLocalStore;
//! use std::sync::Arc;
//!
//! # async fn run() -> Result<(), orderdesk_orders::OrdersError> {
//! let local = Arc::new(MemoryLocalStore::new());
//! let registry = StoreRegistry::new(local.clone());
//! let book = OrderBook::new(local);
//! let client = WooClient::new(ClientConfig::default())?;
//!
//! let report = sync_stores(&client, &registry, &book, None).await?;
//! println!("{} orders from {} stores", report.orders(), report.succeeded());
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]

pub mod book;
pub mod client;
pub mod error;
pub mod export;
pub mod filter;
pub mod model;
pub mod ops;
pub mod page;
pub mod registry;
pub mod screen;
pub mod stats;

pub use book::{sort_newest_first, OrderBook, ORDERS_KEY};
pub use client::{
    BatchOutcome, ClientConfig, OrderPatch, OrderSource, StatusUpdate, WooClient,
    DEFAULT_PER_PAGE,
};
pub use error::OrdersError;
pub use export::{export_csv, export_file_name};
pub use filter::{DateRange, OrderFilter};
pub use model::{
    Address, LineItem, MetaData, NewStore, Order, OrderKey, OrderStatus, Store, StoreUpdate,
};
pub use ops::{
    sync_stores, update_order_details, update_status_batch, BatchReport, StoreSync, SyncReport,
};
pub use page::Page;
pub use registry::{StoreRegistry, STORES_KEY};
pub use screen::{Column, ScreenOptions, ScreenOptionsRepo, VisibleColumns, SCREEN_OPTIONS_PATH};
pub use stats::{OrderStats, PhoneCounts};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
