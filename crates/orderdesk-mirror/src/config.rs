//! Mirror configuration
//!
//! Deserialized from the `[mirror]` table of the application config; every
//! field has a default so an empty table is valid.

use crate::error::MirrorError;
use orderdesk_storage::path::is_valid_segment;
use orderdesk_storage::RemotePath;
use serde::{Deserialize, Serialize};

/// Default container node holding mirrored entries
pub const DEFAULT_CONTAINER: &str = "syncedStorage";

/// Default prefix prepended to local keys inside the container
pub const DEFAULT_PREFIX: &str = "app-";

/// Storage mirror settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MirrorConfig {
    /// Remote node holding one entry per mirrored key
    pub container: String,
    /// Prefix turning a local key into an entry name
    pub prefix: String,
    /// Local keys with this prefix are never mirrored; `None` uses the
    /// remote client's own reserved prefix
    pub reserved_prefix: Option<String>,
    /// Hostnames granted the admin role
    pub admin_hostnames: Vec<String>,
    /// `host:port` pairs granted the admin role
    pub admin_hosts: Vec<String>,
}

impl Default for MirrorConfig {
    fn default() -> Self {
        Self {
            container: DEFAULT_CONTAINER.to_string(),
            prefix: DEFAULT_PREFIX.to_string(),
            reserved_prefix: None,
            admin_hostnames: vec!["localhost".to_string()],
            admin_hosts: vec!["localhost:5173".to_string()],
        }
    }
}

impl MirrorConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the container node
    #[must_use]
    pub fn with_container(mut self, container: impl Into<String>) -> Self {
        self.container = container.into();
        self
    }

    /// Set the entry prefix
    #[must_use]
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Set the reserved local key prefix
    #[must_use]
    pub fn with_reserved_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.reserved_prefix = Some(prefix.into());
        self
    }

    /// Container as a remote path
    ///
    /// # Errors
    /// Returns error if the container is the root or not a valid path
    pub fn container_path(&self) -> Result<RemotePath, MirrorError> {
        let path = RemotePath::parse(&self.container)?;
        if path.is_root() {
            return Err(MirrorError::invalid_config(
                "container must not be the database root",
            ));
        }
        Ok(path)
    }

    /// Check the settings before starting a mirror
    ///
    /// # Errors
    /// Returns error if the container or prefix cannot address remote entries
    pub fn validate(&self) -> Result<(), MirrorError> {
        self.container_path()?;
        if !self.prefix.is_empty() && !is_valid_segment(&self.prefix) {
            return Err(MirrorError::invalid_config(format!(
                "prefix {:?} cannot be part of an entry name",
                self.prefix
            )));
        }
        if self.reserved_prefix.as_deref() == Some("") {
            return Err(MirrorError::invalid_config(
                "reserved prefix must not be empty",
            ));
        }
        Ok(())
    }
}
