//! Application configuration
//!
//! Read from `orderdesk.toml`; a missing file means defaults. Selected
//! settings can be overridden from the environment:
//! - `ORDERDESK_DATABASE_URL`: `[remote] database_url`
//! - `ORDERDESK_AUTH`: `[remote] auth`
//! - `ORDERDESK_HOST`: `session_host`

use anyhow::{bail, Context};
use orderdesk_firebase::FirebaseConfig;
use orderdesk_mirror::MirrorConfig;
use orderdesk_orders::{ClientConfig, DEFAULT_PER_PAGE};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Config file looked up when `--config` is not given
pub const DEFAULT_CONFIG_FILE: &str = "orderdesk.toml";

/// Environment variable overriding the database URL
pub const ENV_DATABASE_URL: &str = "ORDERDESK_DATABASE_URL";
/// Environment variable overriding the database credential
pub const ENV_AUTH: &str = "ORDERDESK_AUTH";
/// Environment variable overriding the session host
pub const ENV_HOST: &str = "ORDERDESK_HOST";

/// Top-level settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// JSON file backing the local store
    pub data_file: PathBuf,
    /// `host[:port]` this session runs as; decides the mirror role
    pub session_host: String,
    /// How often the mirror re-reads the data file, in milliseconds
    pub poll_interval_ms: u64,
    /// Storage mirror settings
    pub mirror: MirrorConfig,
    /// Realtime database connection
    pub remote: RemoteSettings,
    /// Store back end requests
    pub orders: OrdersSettings,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_file: PathBuf::from("orderdesk-local.json"),
            session_host: "localhost:5173".to_string(),
            poll_interval_ms: 1000,
            mirror: MirrorConfig::default(),
            remote: RemoteSettings::default(),
            orders: OrdersSettings::default(),
        }
    }
}

/// `[remote]` table
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteSettings {
    /// Database base URL; remote features are off when unset
    pub database_url: Option<String>,
    /// Credential appended to every request
    pub auth: Option<String>,
    /// Node shared display preferences live under
    pub root: Option<String>,
}

/// `[orders]` table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrdersSettings {
    /// Forwarding proxy for store requests
    pub proxy_url: Option<String>,
    /// Orders fetched per store on sync
    pub per_page: u32,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for OrdersSettings {
    fn default() -> Self {
        Self {
            proxy_url: None,
            per_page: DEFAULT_PER_PAGE,
            timeout_secs: 30,
        }
    }
}

impl AppConfig {
    /// Parse a config document
    ///
    /// # Errors
    /// Returns error if the document is not valid TOML for these settings
    pub fn from_toml_str(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    /// Read a config file; a missing file yields defaults
    ///
    /// # Errors
    /// Returns error if the file exists but cannot be read or parsed
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        Self::from_toml_str(&text)
            .with_context(|| format!("invalid config file {}", path.display()))
    }

    /// Apply overrides from the process environment
    #[must_use]
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(|name| std::env::var(name).ok())
    }

    /// Apply overrides from a variable lookup
    #[must_use]
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let set = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());
        if let Some(url) = set(ENV_DATABASE_URL) {
            self.remote.database_url = Some(url);
        }
        if let Some(auth) = set(ENV_AUTH) {
            self.remote.auth = Some(auth);
        }
        if let Some(host) = set(ENV_HOST) {
            self.session_host = host;
        }
        self
    }

    /// Mirror poll interval
    #[inline]
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(50))
    }

    /// Settings for the store back end client
    #[must_use]
    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            proxy_url: self.orders.proxy_url.clone(),
            per_page: self.orders.per_page,
            timeout: Duration::from_secs(self.orders.timeout_secs),
        }
    }

    /// Settings for the realtime database client
    ///
    /// # Errors
    /// Returns error if no database URL is configured
    pub fn firebase_config(&self) -> anyhow::Result<FirebaseConfig> {
        let Some(url) = &self.remote.database_url else {
            bail!("no remote database configured: set [remote] database_url or {ENV_DATABASE_URL}");
        };
        let mut config = FirebaseConfig::new(url.clone());
        if let Some(auth) = &self.remote.auth {
            config = config.with_auth(auth.clone());
        }
        Ok(config)
    }
}
