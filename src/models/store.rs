//! Immutable store descriptions produced by config validation.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// How requests to a store are authenticated. Exactly one per store.
#[derive(Clone, PartialEq, Eq)]
pub enum StoreCredential {
    /// HMAC signing with a credential id and a base64 shared secret.
    ConnectionSecret { id: String, secret: String },
    /// Bearer tokens from an injected token credential.
    ManagedIdentity { client_id: Option<String> },
}

impl fmt::Debug for StoreCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreCredential::ConnectionSecret { id, .. } => f
                .debug_struct("ConnectionSecret")
                .field("id", id)
                .field("secret", &"<redacted>")
                .finish(),
            StoreCredential::ManagedIdentity { client_id } => f
                .debug_struct("ManagedIdentity")
                .field("client_id", client_id)
                .finish(),
        }
    }
}

/// A (key, label) pair whose change alone must cause a refresh.
///
/// A `None` label matches only unlabeled settings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub struct Trigger {
    pub key: String,
    #[serde(default)]
    pub label: Option<String>,
}

impl Trigger {
    pub fn new(key: impl Into<String>, label: Option<&str>) -> Self {
        Self {
            key: key.into(),
            label: label.map(str::to_string),
        }
    }

    /// Match a reported (key, label) against this trigger.
    pub fn matches(&self, key: &str, label: Option<&str>) -> bool {
        if self.key != key {
            return false;
        }
        match (&self.label, label) {
            (None, None) => true,
            (Some(expected), Some(actual)) => expected == actual,
            _ => false,
        }
    }
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.label {
            Some(label) => write!(f, "{} ({})", self.key, label),
            None => write!(f, "{}", self.key),
        }
    }
}

/// A shared-secret query parameter used to authenticate push notifications.
#[derive(Clone, PartialEq, Eq, Default, Deserialize, Serialize)]
pub struct TokenPair {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub secret: String,
}

impl TokenPair {
    pub fn new(name: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            secret: secret.into(),
        }
    }

    /// Both name and secret are non-empty.
    pub fn is_configured(&self) -> bool {
        !self.name.is_empty() && !self.secret.is_empty()
    }
}

impl fmt::Debug for TokenPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenPair")
            .field("name", &self.name)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// Primary/secondary token pair, allowing rotation without downtime.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct PushTokens {
    #[serde(default)]
    pub primary_token: Option<TokenPair>,
    #[serde(default)]
    pub secondary_token: Option<TokenPair>,
}

/// Push-refresh settings of a store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Monitoring {
    pub enabled: bool,
    pub triggers: Vec<Trigger>,
    pub push: PushTokens,
}

/// A remote configuration store, validated and immutable after startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Store {
    pub name: String,
    /// `https://<name>.<domain>`, no trailing slash.
    pub endpoint: String,
    pub credential: StoreCredential,
    /// Priority ordered, most specific last. `None` is the null label.
    pub labels: Vec<Option<String>>,
    /// Normalised key prefix: empty, or starting with `/`.
    pub prefix: String,
    /// Key contexts in search order, e.g. `/application/`, `/application_dev/`.
    pub contexts: Vec<String>,
    /// `*` or a single literal key.
    pub watched_key: String,
    pub monitoring: Monitoring,
    pub cache_ttl: Duration,
    pub fail_fast: bool,
}

impl Store {
    /// Minimal store authenticated by a connection secret, unlabeled, with
    /// the single `/application/` context.
    pub fn new(
        name: impl Into<String>,
        endpoint: impl Into<String>,
        credential: StoreCredential,
    ) -> Self {
        Self {
            name: name.into(),
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            credential,
            labels: vec![None],
            prefix: String::new(),
            contexts: vec!["/application/".to_string()],
            watched_key: "*".to_string(),
            monitoring: Monitoring::default(),
            cache_ttl: Duration::from_secs(30),
            fail_fast: true,
        }
    }

    pub fn with_labels(mut self, labels: Vec<Option<String>>) -> Self {
        self.labels = labels;
        self
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn with_contexts(mut self, contexts: Vec<String>) -> Self {
        self.contexts = contexts;
        self
    }

    pub fn with_watched_key(mut self, watched_key: impl Into<String>) -> Self {
        self.watched_key = watched_key.into();
        self
    }

    pub fn with_monitoring(mut self, monitoring: Monitoring) -> Self {
        self.monitoring = monitoring;
        self
    }

    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    pub fn with_fail_fast(mut self, fail_fast: bool) -> Self {
        self.fail_fast = fail_fast;
        self
    }

    /// Key paths searched for this store: prefix followed by each context.
    pub fn key_paths(&self) -> Vec<String> {
        self.contexts
            .iter()
            .map(|context| format!("{}{}", self.prefix, context))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secret() -> StoreCredential {
        StoreCredential::ConnectionSecret {
            id: "id-1".to_string(),
            secret: "c2VjcmV0".to_string(),
        }
    }

    #[test]
    fn test_trigger_null_label_matches_only_unlabeled() {
        let trigger = Trigger::new("sentinel", None);
        assert!(trigger.matches("sentinel", None));
        assert!(!trigger.matches("sentinel", Some("dev")));
        assert!(!trigger.matches("other", None));
    }

    #[test]
    fn test_trigger_labeled_requires_exact_match() {
        let trigger = Trigger::new("sentinel", Some("prod"));
        assert!(trigger.matches("sentinel", Some("prod")));
        assert!(!trigger.matches("sentinel", Some("dev")));
        assert!(!trigger.matches("sentinel", None));
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let debug = format!("{:?}", secret());
        assert!(debug.contains("id-1"));
        assert!(!debug.contains("c2VjcmV0"));

        let token = TokenPair::new("token", "hunter2");
        assert!(!format!("{:?}", token).contains("hunter2"));
    }

    #[test]
    fn test_token_pair_configured() {
        assert!(TokenPair::new("a", "b").is_configured());
        assert!(!TokenPair::new("a", "").is_configured());
        assert!(!TokenPair::new("", "b").is_configured());
    }

    #[test]
    fn test_key_paths() {
        let store = Store::new("demo", "https://demo.azconfig.io/", secret())
            .with_prefix("/team")
            .with_contexts(vec!["/application/".into(), "/shop/".into()]);
        assert_eq!(store.endpoint, "https://demo.azconfig.io");
        assert_eq!(
            store.key_paths(),
            vec!["/team/application/".to_string(), "/team/shop/".to_string()]
        );
    }
}
