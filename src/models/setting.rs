//! Key-value settings as returned by the store's `/kv` and `/revisions` endpoints.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Content type marking a feature flag document.
pub const FEATURE_FLAG_CONTENT_TYPE: &str =
    "application/vnd.microsoft.appconfig.ff+json;charset=utf-8";

/// Content type marking a secret (key vault) reference document.
pub const SECRET_REFERENCE_CONTENT_TYPE: &str =
    "application/vnd.microsoft.appconfig.keyvaultref+json;charset=utf-8";

/// Key prefix under which feature flags live.
pub const FEATURE_FLAG_PREFIX: &str = ".appconfig.featureflag/";

/// How a setting's value should be interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingKind {
    Plain,
    FeatureFlag,
    SecretReference,
}

/// A single key-value revision fetched from a store.
///
/// Uniquely identified by `(store, key, label)`. `store` is not part of the
/// wire format; it is stamped by the client after decoding.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Setting {
    #[serde(skip)]
    pub store: String,

    pub key: String,

    /// `None` is the null label.
    #[serde(default)]
    pub label: Option<String>,

    #[serde(default)]
    pub value: Option<String>,

    #[serde(default)]
    pub content_type: Option<String>,

    #[serde(default)]
    pub etag: Option<String>,

    #[serde(default)]
    pub last_modified: Option<DateTime<Utc>>,

    #[serde(default)]
    pub tags: Option<HashMap<String, String>>,
}

impl Setting {
    /// Create an unlabeled plain setting.
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            store: String::new(),
            key: key.into(),
            label: None,
            value: Some(value.into()),
            content_type: None,
            etag: None,
            last_modified: None,
            tags: None,
        }
    }

    pub fn with_store(mut self, store: impl Into<String>) -> Self {
        self.store = store.into();
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_etag(mut self, etag: impl Into<String>) -> Self {
        self.etag = Some(etag.into());
        self
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Classify by key prefix and content type.
    ///
    /// Anything under the feature flag prefix is a flag, whatever its declared
    /// content type; validating that type is the loader's job.
    pub fn kind(&self) -> SettingKind {
        if self.key.starts_with(FEATURE_FLAG_PREFIX) {
            return SettingKind::FeatureFlag;
        }
        match self.content_type.as_deref() {
            Some(FEATURE_FLAG_CONTENT_TYPE) => SettingKind::FeatureFlag,
            Some(SECRET_REFERENCE_CONTENT_TYPE) => SettingKind::SecretReference,
            _ => SettingKind::Plain,
        }
    }

    /// Value, or the empty string when the store returned `null`.
    pub fn value_or_empty(&self) -> &str {
        self.value.as_deref().unwrap_or("")
    }
}

/// JSON envelope of a single result page.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SettingsPage {
    #[serde(default)]
    pub items: Vec<Setting>,
}
