//! Settings loader: turns cached settings into application properties.
//!
//! A full load fetches every context of a store plus its feature flags and
//! writes them to the shared [`SettingsCache`]. A refresh re-fetches only the
//! keys the cache reports as stale. Both return a [`StoreSnapshot`] built
//! from the cache, so a non-fail-fast store keeps serving its last values
//! when the remote is unavailable.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::cache::{CacheEntry, SettingsCache};
use crate::client::FetchOutcome;
use crate::error::{ErrorContext, SyncError, SyncResult};
use crate::models::{
    ApiPath, FeatureFlagDocument, FeatureSet, QuerySelector, SecretReference, Setting, Store,
    FEATURE_FLAG_CONTENT_TYPE, FEATURE_FLAG_PREFIX, SECRET_REFERENCE_CONTENT_TYPE,
};
use crate::traits::{ConfigClient, SecretResolver};

/// Materialised view of one store.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StoreSnapshot {
    pub store: String,
    /// Property name (context stripped, `/` replaced by `.`) to value.
    pub properties: BTreeMap<String, String>,
    pub features: FeatureSet,
}

impl StoreSnapshot {
    pub fn len(&self) -> usize {
        self.properties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty() && self.features.is_empty()
    }
}

/// Property name for `key` under `context`: prefix stripped, `/` to `.`.
pub fn property_name(key: &str, context: &str) -> Option<String> {
    key.trim()
        .strip_prefix(context)
        .filter(|rest| !rest.is_empty())
        .map(|rest| rest.replace('/', "."))
}

pub struct SettingsLoader {
    client: Arc<dyn ConfigClient>,
    cache: Arc<SettingsCache>,
    secrets: Option<Arc<dyn SecretResolver>>,
}

impl std::fmt::Debug for SettingsLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SettingsLoader")
            .field("cached_entries", &self.cache.len())
            .field("has_secret_resolver", &self.secrets.is_some())
            .finish()
    }
}

impl SettingsLoader {
    pub fn new(client: Arc<dyn ConfigClient>, cache: Arc<SettingsCache>) -> Self {
        Self {
            client,
            cache,
            secrets: None,
        }
    }

    pub fn with_secret_resolver(mut self, resolver: Arc<dyn SecretResolver>) -> Self {
        self.secrets = Some(resolver);
        self
    }

    pub fn cache(&self) -> &Arc<SettingsCache> {
        &self.cache
    }

    /// Fetch every context and the feature flags of `store`.
    pub async fn load_store(&self, store: &Store, now: DateTime<Utc>) -> SyncResult<StoreSnapshot> {
        let mut filters: Vec<String> = store
            .key_paths()
            .into_iter()
            .map(|path| format!("{}*", path))
            .collect();
        filters.push(format!("{}*", FEATURE_FLAG_PREFIX));

        for filter in filters {
            let selector = QuerySelector::for_key(filter.as_str()).with_labels(store.labels.clone());
            let outcome = self.client.fetch(ApiPath::Kv, &selector, store).await;
            match outcome {
                FetchOutcome::Items(items) => {
                    debug!(store = %store.name, filter = %filter, count = items.len(), "Loaded settings");
                    self.drop_missing(store, &filter, &items);
                    for item in &items {
                        self.cache.put(&store.name, item, now);
                    }
                }
                FetchOutcome::Empty => {
                    warn!(store = %store.name, filter = %filter, "No settings found");
                    self.drop_missing(store, &filter, &[]);
                }
                FetchOutcome::Retryable(err) | FetchOutcome::Fatal(err) => {
                    if store.fail_fast {
                        return Err(SyncError::from(err).with_context(
                            ErrorContext::new("load_store").with_store(&store.name),
                        ));
                    }
                    warn!(
                        store = %store.name,
                        filter = %filter,
                        "Load failed, serving cached settings: {}",
                        err
                    );
                }
            }
        }

        let snapshot = self.snapshot(store).await?;
        info!(
            store = %store.name,
            properties = snapshot.properties.len(),
            features = snapshot.features.len(),
            "Store loaded"
        );
        Ok(snapshot)
    }

    /// Re-fetch the stale keys of `store` and rebuild its snapshot.
    pub async fn refresh_store(
        &self,
        store: &Store,
        now: DateTime<Utc>,
    ) -> SyncResult<StoreSnapshot> {
        let stale = self.cache.stale_keys(&store.name, store.cache_ttl, now);
        debug!(store = %store.name, count = stale.len(), "Refreshing stale keys");

        for key in &stale {
            let selector = QuerySelector::for_key(key.as_str()).with_labels(store.labels.clone());
            match self.client.fetch(ApiPath::Kv, &selector, store).await {
                FetchOutcome::Items(items) if !items.is_empty() => {
                    for item in &items {
                        self.cache.put(&store.name, item, now);
                    }
                }
                FetchOutcome::Items(_) | FetchOutcome::Empty => {
                    debug!(store = %store.name, key = %key, "Key no longer present");
                    self.cache.remove(&store.name, key);
                }
                FetchOutcome::Retryable(err) | FetchOutcome::Fatal(err) => {
                    if store.fail_fast {
                        return Err(SyncError::from(err).with_context(
                            ErrorContext::new("refresh_store").with_store(&store.name),
                        ));
                    }
                    warn!(
                        store = %store.name,
                        key = %key,
                        "Refresh failed, keeping cached value: {}",
                        err
                    );
                }
            }
        }

        self.snapshot(store).await
    }

    /// Build the snapshot of `store` from the cache alone.
    pub async fn snapshot(&self, store: &Store) -> SyncResult<StoreSnapshot> {
        let entries = self.cache.entries_for_store(&store.name);
        let mut snapshot = StoreSnapshot {
            store: store.name.clone(),
            ..Default::default()
        };

        // Contexts are applied in search order so later ones override.
        for context in store.key_paths() {
            for entry in entries.iter().filter(|e| e.key.starts_with(&context)) {
                let Some(name) = property_name(&entry.key, &context) else {
                    continue;
                };
                if let Some(value) = self.property_value(store, entry).await? {
                    snapshot.properties.insert(name, value);
                }
            }
        }

        for entry in entries
            .iter()
            .filter(|e| e.key.starts_with(FEATURE_FLAG_PREFIX))
        {
            match parse_feature_flag(entry) {
                Ok(doc) => snapshot.features.add(doc),
                Err(err) if store.fail_fast => {
                    return Err(err.with_context(
                        ErrorContext::new("load_features").with_store(&store.name),
                    ))
                }
                Err(err) => warn!(store = %store.name, "Skipping feature flag: {}", err),
            }
        }

        Ok(snapshot)
    }

    async fn property_value(&self, store: &Store, entry: &CacheEntry) -> SyncResult<Option<String>> {
        let raw = entry.value.clone().unwrap_or_default();
        if entry.content_type.as_deref() != Some(SECRET_REFERENCE_CONTENT_TYPE) {
            return Ok(Some(raw));
        }

        match self.resolve_secret(&raw).await {
            Ok(value) => Ok(Some(value)),
            Err(err) if store.fail_fast => Err(err.with_context(
                ErrorContext::new("resolve_secret").with_store(&store.name),
            )),
            Err(err) => {
                warn!(store = %store.name, key = %entry.key, "Skipping secret reference: {}", err);
                Ok(None)
            }
        }
    }

    async fn resolve_secret(&self, body: &str) -> SyncResult<String> {
        let reference: SecretReference =
            serde_json::from_str(body).map_err(|e| SyncError::SecretResolution {
                uri: String::new(),
                message: format!("invalid secret reference: {}", e),
            })?;

        let resolver = self
            .secrets
            .as_ref()
            .ok_or_else(|| SyncError::SecretResolution {
                uri: reference.uri.clone(),
                message: "no secret resolver configured".to_string(),
            })?;

        resolver
            .resolve(&reference.uri)
            .await
            .map_err(|message| SyncError::SecretResolution {
                uri: reference.uri.clone(),
                message,
            })
    }

    /// Forget cached keys under `filter` that the latest full fetch no
    /// longer returned.
    fn drop_missing(&self, store: &Store, filter: &str, items: &[Setting]) {
        let path = filter.trim_end_matches('*');
        for key in self.cache.keys_for_store(&store.name) {
            if key.starts_with(path) && !items.iter().any(|item| item.key == key) {
                debug!(store = %store.name, key = %key, "Dropping deleted key");
                self.cache.remove(&store.name, &key);
            }
        }
    }
}

fn parse_feature_flag(entry: &CacheEntry) -> SyncResult<FeatureFlagDocument> {
    if entry.content_type.as_deref() != Some(FEATURE_FLAG_CONTENT_TYPE) {
        return Err(SyncError::InvalidFeatureFlag {
            key: entry.key.clone(),
            message: format!(
                "invalid content type {}",
                entry.content_type.as_deref().unwrap_or("<none>")
            ),
        });
    }
    serde_json::from_str(entry.value.as_deref().unwrap_or_default()).map_err(|e| {
        SyncError::InvalidFeatureFlag {
            key: entry.key.clone(),
            message: e.to_string(),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::mock::{ScriptedConfigClient, StaticSecretResolver};
    use crate::error::FetchError;
    use crate::models::{FeatureState, StoreCredential};
    use chrono::TimeZone;
    use serde_json::json;
    use std::time::Duration;

    fn t(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    fn store() -> Store {
        Store::new(
            "demo",
            "https://demo.azconfig.io",
            StoreCredential::ManagedIdentity { client_id: None },
        )
        .with_contexts(vec!["/application/".into(), "/application_dev/".into()])
        .with_cache_ttl(Duration::from_secs(30))
    }

    fn kv(key: &str, value: &str, etag: &str) -> Setting {
        Setting::new(key, value).with_etag(etag)
    }

    fn flag(id: &str, body: serde_json::Value) -> Setting {
        Setting::new(format!("{}{}", FEATURE_FLAG_PREFIX, id), body.to_string())
            .with_etag("f1")
            .with_content_type(FEATURE_FLAG_CONTENT_TYPE)
    }

    fn loader(client: &Arc<ScriptedConfigClient>) -> SettingsLoader {
        SettingsLoader::new(client.clone(), Arc::new(SettingsCache::new()))
    }

    fn script_defaults(client: &ScriptedConfigClient) {
        client.set_outcome(
            "demo",
            ApiPath::Kv,
            "/application/*",
            FetchOutcome::Items(vec![
                kv("/application/db/url", "jdbc:base", "e1"),
                kv("/application/name", "shop", "e2"),
            ]),
        );
        client.set_outcome(
            "demo",
            ApiPath::Kv,
            "/application_dev/*",
            FetchOutcome::Items(vec![kv("/application_dev/db/url", "jdbc:dev", "e3")]),
        );
        client.set_outcome(
            "demo",
            ApiPath::Kv,
            ".appconfig.featureflag/*",
            FetchOutcome::Items(vec![
                flag("Beta", json!({"id": "Beta", "enabled": true})),
                flag("Off", json!({"id": "Off", "enabled": false})),
            ]),
        );
    }

    #[test]
    fn test_property_name() {
        assert_eq!(
            property_name("/application/db/url", "/application/").as_deref(),
            Some("db.url")
        );
        assert_eq!(property_name("/application/", "/application/"), None);
        assert_eq!(property_name("/other/x", "/application/"), None);
    }

    #[tokio::test]
    async fn test_load_store_applies_contexts_in_order() {
        let client = Arc::new(ScriptedConfigClient::new());
        script_defaults(&client);
        let loader = loader(&client);

        let snapshot = loader.load_store(&store(), t(0)).await.unwrap();

        assert_eq!(snapshot.properties.get("db.url").map(String::as_str), Some("jdbc:dev"));
        assert_eq!(snapshot.properties.get("name").map(String::as_str), Some("shop"));
        assert_eq!(snapshot.features.get("Beta"), Some(&FeatureState::Toggle(true)));
        assert_eq!(snapshot.features.get("Off"), Some(&FeatureState::Toggle(false)));
        assert_eq!(loader.cache().len(), 5);
    }

    #[tokio::test]
    async fn test_load_uses_store_labels() {
        let client = Arc::new(ScriptedConfigClient::new());
        let loader = loader(&client);
        let s = store().with_labels(vec![None, Some("prod".into())]);

        loader.load_store(&s, t(0)).await.unwrap();
        let calls = client.calls();
        assert_eq!(calls.len(), 3);
        assert!(calls.iter().all(|c| c.selector.labels == s.labels));
        assert!(calls.iter().all(|c| c.api == ApiPath::Kv));
    }

    #[tokio::test]
    async fn test_fail_fast_load_propagates() {
        let client = Arc::new(ScriptedConfigClient::new());
        client.set_default(FetchOutcome::Fatal(FetchError::HttpStatus {
            endpoint: "https://demo.azconfig.io".into(),
            status: 500,
        }));
        let loader = loader(&client);

        let err = loader.load_store(&store(), t(0)).await.unwrap_err();
        assert_eq!(err.context().unwrap().operation, "load_store");
        assert_eq!(err.error_code(), "FETCH_STATUS");
    }

    #[tokio::test]
    async fn test_non_fail_fast_failure_keeps_cached_entries() {
        let client = Arc::new(ScriptedConfigClient::new());
        script_defaults(&client);
        let loader = loader(&client);
        let s = store().with_fail_fast(false);
        let first = loader.load_store(&s, t(0)).await.unwrap();

        client.set_outcome(
            "demo",
            ApiPath::Kv,
            "/application/*",
            FetchOutcome::Retryable(FetchError::Throttled {
                endpoint: "https://demo.azconfig.io".into(),
                retries: 12,
            }),
        );
        client.set_store_outcome(
            "demo",
            FetchOutcome::Fatal(FetchError::HttpStatus {
                endpoint: "https://demo.azconfig.io".into(),
                status: 503,
            }),
        );

        let second = loader.load_store(&s, t(60)).await.unwrap();
        assert_eq!(second.properties, first.properties);

        let refreshed = loader.refresh_store(&s, t(120)).await.unwrap();
        assert_eq!(refreshed.properties, first.properties);
    }

    #[tokio::test]
    async fn test_refresh_fetches_only_stale_keys() {
        let client = Arc::new(ScriptedConfigClient::new());
        script_defaults(&client);
        let loader = loader(&client);
        let s = store();
        loader.load_store(&s, t(0)).await.unwrap();

        loader
            .cache()
            .put("demo", &kv("/application/name", "shop", "e2"), t(20));
        for (key, item) in [
            ("/application/db/url", kv("/application/db/url", "jdbc:new", "e9")),
            ("/application_dev/db/url", kv("/application_dev/db/url", "jdbc:dev", "e3")),
            (".appconfig.featureflag/Beta", flag("Beta", json!({"id": "Beta", "enabled": true}))),
            (".appconfig.featureflag/Off", flag("Off", json!({"id": "Off", "enabled": false}))),
        ] {
            client.set_outcome("demo", ApiPath::Kv, key, FetchOutcome::Items(vec![item]));
        }
        let before = client.call_count();

        let snapshot = loader.refresh_store(&s, t(31)).await.unwrap();

        let refreshed: Vec<String> = client.calls()[before..]
            .iter()
            .map(|c| c.selector.keys[0].clone())
            .collect();
        assert!(refreshed.contains(&"/application/db/url".to_string()));
        assert!(!refreshed.contains(&"/application/name".to_string()));
        assert_eq!(
            loader.cache().get("demo", "/application/db/url").unwrap().etag,
            "e9"
        );
        // The dev context still overrides.
        assert_eq!(snapshot.properties.get("db.url").map(String::as_str), Some("jdbc:dev"));
    }

    #[tokio::test]
    async fn test_refresh_removes_deleted_keys() {
        let client = Arc::new(ScriptedConfigClient::new());
        script_defaults(&client);
        let loader = loader(&client);
        let s = store();
        loader.load_store(&s, t(0)).await.unwrap();

        client.set_store_outcome("demo", FetchOutcome::Items(vec![kv("/application/db/url", "x", "e5")]));
        client.set_outcome("demo", ApiPath::Kv, "/application/name", FetchOutcome::Empty);
        let snapshot = loader.refresh_store(&s, t(31)).await.unwrap();

        assert!(!snapshot.properties.contains_key("name"));
        assert!(loader.cache().get("demo", "/application/name").is_none());
    }

    #[tokio::test]
    async fn test_secret_reference_resolved() {
        let client = Arc::new(ScriptedConfigClient::new());
        client.set_outcome(
            "demo",
            ApiPath::Kv,
            "/application/*",
            FetchOutcome::Items(vec![kv(
                "/application/db/password",
                r#"{"uri":"https://vault.example/secrets/db"}"#,
                "e1",
            )
            .with_content_type(SECRET_REFERENCE_CONTENT_TYPE)]),
        );
        let resolver = Arc::new(
            StaticSecretResolver::new().with_secret("https://vault.example/secrets/db", "s3cret"),
        );
        let loader = loader(&client).with_secret_resolver(resolver.clone());

        let snapshot = loader.load_store(&store(), t(0)).await.unwrap();
        assert_eq!(
            snapshot.properties.get("db.password").map(String::as_str),
            Some("s3cret")
        );
        assert_eq!(resolver.lookups(), vec!["https://vault.example/secrets/db".to_string()]);
    }

    #[tokio::test]
    async fn test_unresolvable_secret_follows_fail_fast() {
        let client = Arc::new(ScriptedConfigClient::new());
        client.set_outcome(
            "demo",
            ApiPath::Kv,
            "/application/*",
            FetchOutcome::Items(vec![
                kv("/application/token", r#"{"uri":"https://vault.example/x"}"#, "e1")
                    .with_content_type(SECRET_REFERENCE_CONTENT_TYPE),
                kv("/application/plain", "v", "e2"),
            ]),
        );
        let loader = loader(&client).with_secret_resolver(Arc::new(StaticSecretResolver::new()));

        let err = loader.load_store(&store(), t(0)).await.unwrap_err();
        assert_eq!(err.error_code(), "SECRET_RESOLUTION");

        let snapshot = loader
            .load_store(&store().with_fail_fast(false), t(0))
            .await
            .unwrap();
        assert!(!snapshot.properties.contains_key("token"));
        assert_eq!(snapshot.properties.get("plain").map(String::as_str), Some("v"));
    }

    #[tokio::test]
    async fn test_feature_flag_with_wrong_content_type() {
        let client = Arc::new(ScriptedConfigClient::new());
        client.set_outcome(
            "demo",
            ApiPath::Kv,
            ".appconfig.featureflag/*",
            FetchOutcome::Items(vec![
                Setting::new(".appconfig.featureflag/Bad", "{}")
                    .with_etag("f1")
                    .with_content_type("text/plain"),
                flag(
                    "Rollout",
                    json!({
                        "id": "Rollout",
                        "enabled": true,
                        "conditions": {"client_filters": [{"name": "Percentage", "parameters": {"Value": 50}}]}
                    }),
                ),
            ]),
        );
        let loader = loader(&client);

        let err = loader.load_store(&store(), t(0)).await.unwrap_err();
        assert_eq!(err.error_code(), "FEATURE_FLAG");

        let snapshot = loader
            .load_store(&store().with_fail_fast(false), t(0))
            .await
            .unwrap();
        assert!(snapshot.features.get("Bad").is_none());
        assert!(matches!(
            snapshot.features.get("Rollout"),
            Some(FeatureState::Filtered { enabled_for }) if enabled_for[0].name == "Percentage"
        ));
    }
}
