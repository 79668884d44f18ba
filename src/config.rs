//! Client configuration.
//!
//! Loaded from `<config dir>/storefront/config.toml` (or `--config <path>`).
//! Every section is optional; a missing file yields the defaults.
//!
//! # Example Configuration
//!
//! ```toml
//! [backend]
//! base_url = "https://shop.example.com/api"
//! timeout_secs = 20
//!
//! [storage]
//! backend = "redb"
//! path = "/var/lib/storefront/local.redb"
//!
//! [cache]
//! default_ttl_secs = 300
//!
//! [cart]
//! expiration_hours = 72
//! sync_debounce_ms = 500
//!
//! [logging]
//! format = "json"
//! level = "info"
//! ```

use crate::constants::{
    API_URL_ENV, CACHE_PREFIX, CART_STORAGE_KEY, CART_SYNC_DEBOUNCE, DEFAULT_API_BASE_URL,
    DEFAULT_CACHE_TTL, DEFAULT_CART_EXPIRATION, DEFAULT_PROBE_INTERVAL_SECS, DEFAULT_PROBE_PATH,
    DEFAULT_REQUEST_TIMEOUT_SECS, SESSION_STORAGE_KEY,
};
use crate::logging::{LogConfig, LogFormat, parse_level};
use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub backend: BackendSettings,
    pub storage: StorageSettings,
    pub cache: CacheSettings,
    pub cart: CartSettings,
    pub session: SessionSettings,
    pub network: NetworkSettings,
    pub logging: LoggingSettings,
}

/// REST backend connection.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BackendSettings {
    /// Base URL every endpoint path is appended to.
    pub base_url: String,
    /// Per-request timeout.
    pub timeout_secs: u64,
}

/// Where the persistent key-value store lives.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageKind {
    /// File-backed redb database.
    #[default]
    Redb,
    /// Process-local map, lost on exit.
    Memory,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    pub backend: StorageKind,
    /// Database file. Defaults to `<data dir>/storefront/local.redb`.
    pub path: Option<PathBuf>,
    /// Byte quota for the memory backend.
    pub quota_bytes: Option<usize>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    /// Namespace prefix for cached reads.
    pub prefix: String,
    /// Ttl for cached reads and for the startup sweep.
    pub default_ttl_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CartSettings {
    pub storage_key: String,
    /// Persisted carts older than this are discarded on load.
    pub expiration_hours: u64,
    /// Quiet window before a cart change is pushed to the server.
    pub sync_debounce_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    pub storage_key: String,
}

/// Connectivity probing.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NetworkSettings {
    /// Poll the backend to detect offline mode. When off, the client
    /// always assumes it is online.
    pub probe_enabled: bool,
    /// Path probed relative to the backend base URL.
    pub probe_path: String,
    pub probe_interval_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub format: LogFormat,
    pub level: String,
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_BASE_URL.to_string(),
            timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            prefix: CACHE_PREFIX.to_string(),
            default_ttl_secs: DEFAULT_CACHE_TTL.as_secs(),
        }
    }
}

impl Default for CartSettings {
    fn default() -> Self {
        Self {
            storage_key: CART_STORAGE_KEY.to_string(),
            expiration_hours: DEFAULT_CART_EXPIRATION.as_secs() / 3600,
            sync_debounce_ms: u64::try_from(CART_SYNC_DEBOUNCE.as_millis()).unwrap_or(500),
        }
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            storage_key: SESSION_STORAGE_KEY.to_string(),
        }
    }
}

impl Default for NetworkSettings {
    fn default() -> Self {
        Self {
            probe_enabled: true,
            probe_path: DEFAULT_PROBE_PATH.to_string(),
            probe_interval_secs: DEFAULT_PROBE_INTERVAL_SECS,
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            format: LogFormat::Compact,
            level: "warn".to_string(),
        }
    }
}

impl Config {
    /// Loads configuration from `path`, or from the default location.
    ///
    /// A missing file yields defaults; an unreadable or invalid file is an
    /// error. `STOREFRONT_API_URL` overrides `backend.base_url` either way.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::config_path()?,
        };

        let config = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path).with_context(|| {
                format!("Failed to read config from {}", config_path.display())
            })?;
            let config: Self = toml::from_str(&content).with_context(|| {
                format!("Failed to parse config from {}", config_path.display())
            })?;
            tracing::debug!(path = %config_path.display(), "Loaded configuration");
            config
        } else {
            tracing::debug!(
                path = %config_path.display(),
                "Config not found, using defaults"
            );
            Self::default()
        };

        let config = config.with_api_url_override(std::env::var(API_URL_ENV).ok());
        config.validate()?;
        Ok(config)
    }

    /// Default configuration file location.
    pub fn config_path() -> Result<PathBuf> {
        let dir = dirs::config_dir().context("Failed to get config directory")?;
        Ok(dir.join("storefront").join("config.toml"))
    }

    /// Replaces the backend URL when `url` is set and non-blank.
    #[must_use]
    pub fn with_api_url_override(mut self, url: Option<String>) -> Self {
        if let Some(url) = url.filter(|u| !u.trim().is_empty()) {
            self.backend.base_url = url;
        }
        self
    }

    /// Rejects settings the client cannot run with.
    pub fn validate(&self) -> crate::Result<()> {
        if self.backend.base_url.trim().is_empty() {
            return Err(crate::Error::config("backend.base_url must not be empty"));
        }
        if self.cache.default_ttl_secs == 0 {
            return Err(crate::Error::config("cache.default_ttl_secs must be positive"));
        }
        if self.cart.sync_debounce_ms == 0 {
            return Err(crate::Error::config("cart.sync_debounce_ms must be positive"));
        }
        if self.cache.prefix.is_empty() {
            return Err(crate::Error::config("cache.prefix must not be empty"));
        }
        if self.cart.storage_key == self.session.storage_key {
            return Err(crate::Error::config(
                "cart.storage_key and session.storage_key must differ",
            ));
        }
        if self.cart.storage_key.starts_with(&self.cache.prefix)
            || self.session.storage_key.starts_with(&self.cache.prefix)
        {
            return Err(crate::Error::config(
                "storage keys must not live under the cache prefix",
            ));
        }
        parse_level(&self.logging.level).map_err(crate::Error::config)?;
        Ok(())
    }

    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.backend.timeout_secs)
    }

    pub const fn default_ttl(&self) -> Duration {
        Duration::from_secs(self.cache.default_ttl_secs)
    }

    pub const fn cart_expiration(&self) -> Duration {
        Duration::from_secs(self.cart.expiration_hours * 3600)
    }

    pub const fn sync_debounce(&self) -> Duration {
        Duration::from_millis(self.cart.sync_debounce_ms)
    }

    pub const fn probe_interval(&self) -> Duration {
        Duration::from_secs(self.network.probe_interval_secs)
    }

    /// Full URL of the connectivity probe.
    pub fn probe_url(&self) -> String {
        format!(
            "{}/{}",
            self.backend.base_url.trim_end_matches('/'),
            self.network.probe_path.trim_start_matches('/')
        )
    }

    /// Database file, resolving the default under the data directory.
    pub fn storage_path(&self) -> crate::Result<PathBuf> {
        if let Some(path) = &self.storage.path {
            return Ok(path.clone());
        }
        dirs::data_dir()
            .map(|dir| dir.join("storefront").join("local.redb"))
            .ok_or_else(|| crate::Error::config("no data directory; set storage.path"))
    }

    /// Subscriber settings for the binary. Invalid levels fall back to `warn`.
    pub fn log_config(&self) -> LogConfig {
        let level = parse_level(&self.logging.level).unwrap_or(tracing::Level::WARN);
        LogConfig::default()
            .format(self.logging.format)
            .level(level)
    }
}
