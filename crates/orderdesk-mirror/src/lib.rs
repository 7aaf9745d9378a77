//! orderdesk storage mirror
//!
//! Two-way mirror between a per-session [`LocalStore`] and one container
//! node of a shared [`RemoteStore`]:
//! - role-gated write direction: only admin sessions push
//! - every session pulls container snapshots into local keys
//! - reserved-prefix keys are excluded both ways
//! - no echo: writes the mirror applies locally are never pushed back
//!
//! # Example
//!
//! ```rust,no_run
//! use orderdesk_mirror::{MirrorConfig, StorageMirror};
//! use orderdesk_storage::{MemoryLocalStore, MemoryRemoteStore};
//! use std::sync::Arc;
//!
//! # async fn run() -> Result<(), orderdesk_mirror::MirrorError> {
//! let local = Arc::new(MemoryLocalStore::new());
//! let remote = Arc::new(MemoryRemoteStore::new());
//!
//! let handle = StorageMirror::new(local, remote, MirrorConfig::default())
//!     .for_host("localhost:5173")
//!     .start()
//!     .await?;
//! let stats = handle.stop().await;
//! println!("pushed {} changes", stats.pushed);
//! # Ok(())
//! # }
//! ```
//!
//! [`LocalStore`]: orderdesk_storage::LocalStore
//! [`RemoteStore`]: orderdesk_storage::RemoteStore

#![warn(unreachable_pub)]

pub mod config;
pub mod entry;
pub mod error;
pub mod mirror;
pub mod role;

pub use config::{MirrorConfig, DEFAULT_CONTAINER, DEFAULT_PREFIX};
pub use error::MirrorError;
pub use mirror::{MirrorHandle, MirrorStats, StorageMirror};
pub use role::MirrorRole;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
