//! orderdesk command line
//!
//! Thin shell over the workspace crates:
//! - [`config`]: `orderdesk.toml` plus environment overrides
//! - [`cli`]: the command tree
//! - [`commands`]: store, sync, orders, export and options handlers
//! - [`session`]: the long-running storage mirror
//! - [`logging`]: subscriber setup

#![warn(unreachable_pub)]

pub mod cli;
pub mod commands;
pub mod config;
pub mod logging;
pub mod session;

pub use commands::App;
pub use config::AppConfig;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
