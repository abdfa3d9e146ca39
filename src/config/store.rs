//! Per-store configuration and its validation into [`Store`].

use std::time::Duration;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::auth::{store_name_from_endpoint, ConnectionString};
use crate::error::ConfigError;
use crate::models::{Monitoring, PushTokens, Store, StoreCredential, Trigger};

static PREFIX_REGEX: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"^(/[A-Za-z0-9.\-_]+)*$").ok());

/// Label value standing for "no label".
pub const NULL_LABEL_MARKER: &str = "\0";

fn default_watched_key() -> String {
    "*".to_string()
}

fn default_cache_ttl_secs() -> u64 {
    30
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct ManagedIdentityConfig {
    #[serde(default)]
    pub client_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct MonitoringConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub triggers: Vec<Trigger>,
    #[serde(default)]
    pub push_notification: PushTokens,
}

/// One store as written in the config file.
#[derive(Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct StoreConfig {
    /// Derived from the endpoint host when absent.
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub connection_string: Option<String>,
    #[serde(default)]
    pub managed_identity: Option<ManagedIdentityConfig>,
    /// Comma separated, highest priority first. Empty entries are the null label.
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub prefix: String,
    #[serde(default = "default_watched_key")]
    pub watched_key: String,
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
    /// Falls back to the engine-wide setting.
    #[serde(default)]
    pub fail_fast: Option<bool>,
    #[serde(default)]
    pub monitoring: MonitoringConfig,
}

impl std::fmt::Debug for StoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreConfig")
            .field("name", &self.name)
            .field("endpoint", &self.endpoint)
            .field(
                "connection_string",
                &self.connection_string.as_ref().map(|_| "<redacted>"),
            )
            .field("managed_identity", &self.managed_identity)
            .field("label", &self.label)
            .field("prefix", &self.prefix)
            .field("watched_key", &self.watched_key)
            .field("cache_ttl_secs", &self.cache_ttl_secs)
            .field("fail_fast", &self.fail_fast)
            .field("monitoring", &self.monitoring)
            .finish()
    }
}

impl StoreConfig {
    /// Store authenticated by a connection string.
    pub fn with_connection_string(connection_string: impl Into<String>) -> Self {
        Self {
            connection_string: Some(connection_string.into()),
            ..Self::blank()
        }
    }

    /// Store authenticated by managed identity.
    pub fn with_managed_identity(endpoint: impl Into<String>, client_id: Option<String>) -> Self {
        Self {
            endpoint: Some(endpoint.into()),
            managed_identity: Some(ManagedIdentityConfig { client_id }),
            ..Self::blank()
        }
    }

    fn blank() -> Self {
        Self {
            name: None,
            endpoint: None,
            connection_string: None,
            managed_identity: None,
            label: None,
            prefix: String::new(),
            watched_key: default_watched_key(),
            cache_ttl_secs: default_cache_ttl_secs(),
            fail_fast: None,
            monitoring: MonitoringConfig::default(),
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_monitoring(mut self, monitoring: MonitoringConfig) -> Self {
        self.monitoring = monitoring;
        self
    }

    /// Validate into an immutable [`Store`].
    ///
    /// `contexts` are the unprefixed key contexts shared by every store.
    pub fn build(&self, contexts: &[String], default_fail_fast: bool) -> Result<Store, ConfigError> {
        let label_for_errors = self
            .name
            .clone()
            .or_else(|| self.endpoint.clone())
            .unwrap_or_else(|| "<unnamed>".to_string());

        let (endpoint, credential) = match (&self.connection_string, &self.managed_identity) {
            (Some(_), Some(_)) => {
                return Err(ConfigError::ConflictingCredentials {
                    store: label_for_errors,
                })
            }
            (None, None) => {
                return Err(ConfigError::MissingCredential {
                    store: label_for_errors,
                })
            }
            (Some(raw), None) => {
                let conn = ConnectionString::parse(raw)?;
                if let Some(endpoint) = &self.endpoint {
                    if endpoint.trim_end_matches('/') != conn.endpoint {
                        return Err(ConfigError::invalid(
                            "endpoint",
                            "does not match the connection string endpoint",
                        ));
                    }
                }
                let credential = StoreCredential::ConnectionSecret {
                    id: conn.id.clone(),
                    secret: conn.secret.clone(),
                };
                (conn.endpoint, credential)
            }
            (None, Some(identity)) => {
                let endpoint = self
                    .endpoint
                    .as_deref()
                    .map(|e| e.trim_end_matches('/'))
                    .filter(|e| !e.is_empty())
                    .ok_or_else(|| {
                        ConfigError::invalid("endpoint", "required for managed identity stores")
                    })?;
                if !endpoint.starts_with("https://") {
                    return Err(ConfigError::invalid("endpoint", "must start with https://"));
                }
                let credential = StoreCredential::ManagedIdentity {
                    client_id: identity.client_id.clone(),
                };
                (endpoint.to_string(), credential)
            }
        };

        let name = match &self.name {
            Some(name) if !name.trim().is_empty() => name.trim().to_string(),
            _ => store_name_from_endpoint(&endpoint).to_string(),
        };

        let labels = parse_labels(self.label.as_deref())?;
        let prefix = normalize_prefix(&self.prefix)?;

        if self.watched_key.len() > 1 && self.watched_key.contains('*') {
            return Err(ConfigError::invalid(
                "watched_key",
                "must be '*' or a single key without wildcards",
            ));
        }
        if self.cache_ttl_secs < 1 {
            return Err(ConfigError::invalid("cache_ttl_secs", "must be at least 1 second"));
        }
        if self.monitoring.enabled && self.monitoring.triggers.is_empty() {
            return Err(ConfigError::invalid(
                "monitoring.triggers",
                "at least one trigger is required when monitoring is enabled",
            ));
        }

        Ok(Store::new(name, endpoint, credential)
            .with_labels(labels)
            .with_prefix(prefix)
            .with_contexts(contexts.to_vec())
            .with_watched_key(self.watched_key.clone())
            .with_monitoring(Monitoring {
                enabled: self.monitoring.enabled,
                triggers: self.monitoring.triggers.clone(),
                push: self.monitoring.push_notification.clone(),
            })
            .with_cache_ttl(Duration::from_secs(self.cache_ttl_secs))
            .with_fail_fast(self.fail_fast.unwrap_or(default_fail_fast)))
    }
}

/// Parse a comma separated label list.
///
/// Empty entries (and an empty or missing list) are the null label. The
/// list is de-duplicated and reversed so the highest priority label comes
/// last and wins when settings are applied in order.
pub fn parse_labels(raw: Option<&str>) -> Result<Vec<Option<String>>, ConfigError> {
    let raw = raw.unwrap_or("");
    let mut labels: Vec<Option<String>> = Vec::new();

    for part in raw.split(',') {
        let part = part.trim();
        if part.contains('*') {
            return Err(ConfigError::invalid("label", "wildcards are not allowed"));
        }
        let label = if part.is_empty() || part == NULL_LABEL_MARKER {
            None
        } else {
            Some(part.to_string())
        };
        if !labels.contains(&label) {
            labels.push(label);
        }
    }

    labels.reverse();
    Ok(labels)
}

/// Trim a trailing `/` and check the prefix shape.
fn normalize_prefix(raw: &str) -> Result<String, ConfigError> {
    let prefix = raw.trim().trim_end_matches('/');
    let regex = PREFIX_REGEX
        .as_ref()
        .ok_or_else(|| ConfigError::invalid("prefix", "pattern failed to compile"))?;
    if !regex.is_match(prefix) {
        return Err(ConfigError::invalid(
            "prefix",
            "must look like /segment[/segment...] using letters, digits, '.', '-' or '_'",
        ));
    }
    Ok(prefix.to_string())
}
