//! orderdesk storage layer
//!
//! Two key-value collaborators the rest of the workspace is built on:
//! - [`LocalStore`]: a per-session durable string store that notifies
//!   in-process listeners of every change
//! - [`RemoteStore`]: a shared, path-addressed JSON tree with read, overwrite,
//!   partial update, delete and change subscriptions
//!
//! Both hand out a [`Subscription`] guard; dropping it unsubscribes.
//!
//! # Example
//!
//! ```rust
//! use orderdesk_storage::{LocalStore, MemoryLocalStore, StorageChange};
//! use std::sync::Arc;
//!
//! let store = MemoryLocalStore::new();
//! let _sub = store.subscribe(Arc::new(|change: &StorageChange| {
//!     println!("{} -> {:?}", change.key, change.new_value);
//! }));
//! store.set("settings", "a").unwrap();
//! assert_eq!(store.get("settings").as_deref(), Some("a"));
//! ```

#![warn(unreachable_pub)]

pub mod error;
pub mod file;
pub mod local;
pub mod memory_remote;
pub mod path;
pub mod remote;
pub mod remote_data;
pub mod subscription;
pub mod tree;

pub use error::{RemoteError, StorageError};
pub use file::FileLocalStore;
pub use local::{ChangeListener, LocalStore, MemoryLocalStore, StorageChange};
pub use memory_remote::MemoryRemoteStore;
pub use path::RemotePath;
pub use remote::{RemoteStore, SnapshotListener, DEFAULT_RESERVED_PREFIX};
pub use remote_data::RemoteData;
pub use subscription::{ListenerSet, Subscription};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
