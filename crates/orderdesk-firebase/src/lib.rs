//! orderdesk realtime database client
//!
//! [`FirebaseRemoteStore`] implements [`RemoteStore`] over the realtime
//! database REST API:
//! - `GET/PUT/PATCH/DELETE {db}/{path}.json`, credential in the `auth` query
//! - change subscriptions over server-sent events, with a node cache so each
//!   notification carries the full value
//!
//! # Example
//!
//! ```rust,no_run
//! use orderdesk_firebase::{FirebaseConfig, FirebaseRemoteStore};
//! use orderdesk_storage::{RemotePath, RemoteStore};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let store = FirebaseRemoteStore::new(
//!     FirebaseConfig::new("https://demo.firebaseio.com").with_auth("token"),
//! )?;
//! let options = store.read(&RemotePath::parse("gbox-admin/screenOptions")?).await?;
//! println!("{options:?}");
//! # Ok(())
//! # }
//! ```
//!
//! [`RemoteStore`]: orderdesk_storage::RemoteStore

#![warn(unreachable_pub)]

pub mod config;
pub mod error;
pub mod sse;
pub mod store;
pub mod stream;

pub use config::FirebaseConfig;
pub use error::FirebaseError;
pub use store::FirebaseRemoteStore;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
