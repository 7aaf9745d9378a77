//! Testing utilities for the orderdesk workspace
//!
//! Shared remote store doubles, order fixtures and polling helpers.

#![allow(missing_docs)]

mod fixtures;
mod recording;
mod wait;

pub use fixtures::{order_json, sample_order, sample_store, store_at};
pub use recording::{RecordedCall, RecordingRemoteStore};
pub use wait::{wait_until, wait_until_async, yield_turns, WAIT_TIMEOUT};
