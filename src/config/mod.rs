//! Engine configuration.
//!
//! Loaded from a JSON file (default `<config_dir>/appconfig-sync/config.json`)
//! with a handful of environment overrides, then validated into immutable
//! [`Store`] values.
//!
//! # Example
//!
//! ```ignore
//! use appconfig_sync::config::EngineConfig;
//!
//! let config = EngineConfig::load_from_path(&path)?
//!     .with_env_overrides()?
//!     .with_fail_fast(false);
//! let stores = config.validate()?;
//! ```

mod store;

pub use store::{parse_labels, ManagedIdentityConfig, MonitoringConfig, StoreConfig};

use std::collections::HashSet;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::client::RetryPolicy;
use crate::error::ConfigError;
use crate::models::Store;
use crate::watcher::generate_contexts;

/// Config directory name under the platform config dir.
const CONFIG_DIR: &str = "appconfig-sync";

/// Config file name.
const CONFIG_FILE: &str = "config.json";

pub const ENV_FAIL_FAST: &str = "APPCONFIG_SYNC_FAIL_FAST";
pub const ENV_WATCH_DELAY_SECS: &str = "APPCONFIG_SYNC_WATCH_DELAY_SECS";
pub const ENV_WEBHOOK_BIND: &str = "APPCONFIG_SYNC_WEBHOOK_BIND";
pub const ENV_API_VERSION: &str = "APPCONFIG_SYNC_API_VERSION";

fn default_context() -> String {
    "application".to_string()
}

fn default_profile_separator() -> String {
    "_".to_string()
}

fn default_true() -> bool {
    true
}

fn default_api_version() -> String {
    "1.0".to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct WatchConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "WatchConfig::default_delay_secs")]
    pub delay_secs: u64,
}

impl WatchConfig {
    fn default_delay_secs() -> u64 {
        30
    }

    pub fn delay(&self) -> Duration {
        Duration::from_secs(self.delay_secs)
    }
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            delay_secs: Self::default_delay_secs(),
        }
    }
}

/// Retry budget shared by every store.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub max_retry_time_secs: u64,
    pub prekill_time_secs: u64,
    pub connection_backoff_base_ms: u64,
    pub connection_backoff_max_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 12,
            max_retry_time_secs: 60,
            prekill_time_secs: 5,
            connection_backoff_base_ms: 800,
            connection_backoff_max_ms: 8000,
        }
    }
}

impl RetryConfig {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            max_retry_time: Duration::from_secs(self.max_retry_time_secs),
            prekill_time: Duration::from_secs(self.prekill_time_secs),
            connection_backoff_base: Duration::from_millis(self.connection_backoff_base_ms),
            connection_backoff_max: Duration::from_millis(self.connection_backoff_max_ms),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct WebhookConfig {
    pub enabled: bool,
    pub bind: String,
    /// Domain used to derive store endpoints from notification topics.
    pub domain: String,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            bind: "127.0.0.1:8080".to_string(),
            domain: "azconfig.io".to_string(),
        }
    }
}

impl WebhookConfig {
    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.bind
            .parse()
            .map_err(|_| ConfigError::invalid("webhook.bind", "expected host:port"))
    }
}

/// Whole-engine configuration document.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub stores: Vec<StoreConfig>,
    #[serde(default = "default_context")]
    pub default_context: String,
    /// Application name, adding `/<name>/` contexts after the default ones.
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub profiles: Vec<String>,
    #[serde(default = "default_profile_separator")]
    pub profile_separator: String,
    /// Used by stores that do not set `fail_fast` themselves.
    #[serde(default = "default_true")]
    pub fail_fast: bool,
    #[serde(default)]
    pub watch: WatchConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default = "default_api_version")]
    pub api_version: String,
    #[serde(default)]
    pub webhook: WebhookConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            stores: Vec::new(),
            default_context: default_context(),
            name: None,
            profiles: Vec::new(),
            profile_separator: default_profile_separator(),
            fail_fast: true,
            watch: WatchConfig::default(),
            retry: RetryConfig::default(),
            api_version: default_api_version(),
            webhook: WebhookConfig::default(),
        }
    }
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// `<config_dir>/appconfig-sync/config.json`
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        let dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(dir.join(CONFIG_DIR).join(CONFIG_FILE))
    }

    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Self::from_json(&contents)
    }

    pub fn from_json(contents: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(contents).map_err(|e| ConfigError::Parse {
            message: e.to_string(),
        })
    }

    /// Apply `APPCONFIG_SYNC_*` environment overrides.
    pub fn with_env_overrides(self) -> Result<Self, ConfigError> {
        self.with_overrides_from(|name| std::env::var(name).ok())
    }

    /// Apply overrides from an arbitrary variable lookup.
    pub fn with_overrides_from<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup(ENV_FAIL_FAST) {
            self.fail_fast = parse_bool(&raw)
                .ok_or_else(|| ConfigError::invalid(ENV_FAIL_FAST, "expected true or false"))?;
        }
        if let Some(raw) = lookup(ENV_WATCH_DELAY_SECS) {
            self.watch.delay_secs = raw
                .trim()
                .parse()
                .map_err(|_| ConfigError::invalid(ENV_WATCH_DELAY_SECS, "expected whole seconds"))?;
        }
        if let Some(bind) = lookup(ENV_WEBHOOK_BIND) {
            self.webhook.bind = bind.trim().to_string();
        }
        if let Some(version) = lookup(ENV_API_VERSION) {
            self.api_version = version.trim().to_string();
        }
        Ok(self)
    }

    pub fn with_store(mut self, store: StoreConfig) -> Self {
        self.stores.push(store);
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_profiles(mut self, profiles: Vec<String>) -> Self {
        self.profiles = profiles;
        self
    }

    pub fn with_fail_fast(mut self, fail_fast: bool) -> Self {
        self.fail_fast = fail_fast;
        self
    }

    pub fn with_watch(mut self, enabled: bool, delay: Duration) -> Self {
        self.watch = WatchConfig {
            enabled,
            delay_secs: delay.as_secs(),
        };
        self
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_webhook(mut self, webhook: WebhookConfig) -> Self {
        self.webhook = webhook;
        self
    }

    /// Unprefixed key contexts in search order.
    pub fn contexts(&self) -> Vec<String> {
        generate_contexts(
            &self.default_context,
            self.name.as_deref(),
            &self.profiles,
            &self.profile_separator,
        )
    }

    /// Validate the document and produce the immutable store list.
    pub fn validate(&self) -> Result<Vec<Store>, ConfigError> {
        if self.stores.is_empty() {
            return Err(ConfigError::invalid("stores", "at least one store is required"));
        }
        if self.default_context.trim_matches('/').is_empty() {
            return Err(ConfigError::invalid("default_context", "must not be empty"));
        }
        if self.watch.delay_secs < 1 {
            return Err(ConfigError::invalid("watch.delay_secs", "must be at least 1 second"));
        }
        if self.api_version.trim().is_empty() {
            return Err(ConfigError::invalid("api_version", "must not be empty"));
        }
        if self.webhook.enabled {
            self.webhook.bind_addr()?;
        }

        let contexts = self.contexts();
        let mut seen = HashSet::new();
        let mut stores = Vec::with_capacity(self.stores.len());

        for config in &self.stores {
            let store = config.build(&contexts, self.fail_fast)?;
            if !seen.insert(store.name.clone()) {
                return Err(ConfigError::invalid(
                    "stores",
                    format!("duplicate store name '{}'", store.name),
                ));
            }
            stores.push(store);
        }

        Ok(stores)
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" => Some(false),
        _ => None,
    }
}
