//! Synchronization engine wiring.
//!
//! Owns the shared cache, the client, the loader and the detector for one
//! process. Store configuration is validated once and immutable afterwards.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::cache::SettingsCache;
use crate::client::ResilientHttpClient;
use crate::config::EngineConfig;
use crate::error::{ConfigError, SyncResult};
use crate::loader::{SettingsLoader, StoreSnapshot};
use crate::models::Store;
use crate::traits::{ConfigClient, HttpClient, RefreshSink, SecretResolver, TokenCredential};
use crate::watcher::{spawn_poller, ChangeDetector, CycleOutcome};
use crate::webhook::WebhookServerState;

pub struct SyncEngine {
    config: EngineConfig,
    stores: Arc<Vec<Store>>,
    cache: Arc<SettingsCache>,
    sink: Arc<dyn RefreshSink>,
    loader: SettingsLoader,
    detector: Arc<ChangeDetector>,
    shutdown_tx: watch::Sender<bool>,
    poller: Option<JoinHandle<()>>,
}

impl std::fmt::Debug for SyncEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncEngine")
            .field("stores", &self.stores.len())
            .field("polling", &self.poller.is_some())
            .finish()
    }
}

impl SyncEngine {
    /// Validate `config` and wire the engine around `client`.
    pub fn new(
        config: EngineConfig,
        client: Arc<dyn ConfigClient>,
        sink: Arc<dyn RefreshSink>,
    ) -> Result<Self, ConfigError> {
        let stores = Arc::new(config.validate()?);
        let cache = Arc::new(SettingsCache::new());
        let loader = SettingsLoader::new(Arc::clone(&client), Arc::clone(&cache));
        let detector = Arc::new(ChangeDetector::new(
            client,
            Arc::clone(&cache),
            Arc::clone(&sink),
            Arc::clone(&stores),
            config.watch.delay(),
        ));
        let (shutdown_tx, _) = watch::channel(false);

        Ok(Self {
            config,
            stores,
            cache,
            sink,
            loader,
            detector,
            shutdown_tx,
            poller: None,
        })
    }

    /// Wire the engine over a raw transport, building the resilient client
    /// from the configured retry policy and API version.
    pub fn with_http(
        config: EngineConfig,
        http: Arc<dyn HttpClient>,
        token_credential: Option<Arc<dyn TokenCredential>>,
        sink: Arc<dyn RefreshSink>,
    ) -> Result<Self, ConfigError> {
        let mut client =
            ResilientHttpClient::new(http, config.retry.policy(), config.api_version.clone());
        if let Some(credential) = token_credential {
            client = client.with_token_credential(credential);
        }
        Self::new(config, Arc::new(client), sink)
    }

    pub fn with_secret_resolver(mut self, resolver: Arc<dyn SecretResolver>) -> Self {
        self.loader = self.loader.with_secret_resolver(resolver);
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn stores(&self) -> &[Store] {
        &self.stores
    }

    pub fn cache(&self) -> &Arc<SettingsCache> {
        &self.cache
    }

    pub fn loader(&self) -> &SettingsLoader {
        &self.loader
    }

    pub fn detector(&self) -> &Arc<ChangeDetector> {
        &self.detector
    }

    /// Full load of every store, in configuration order.
    pub async fn initial_load(&self) -> SyncResult<Vec<StoreSnapshot>> {
        let now = Utc::now();
        let mut snapshots = Vec::with_capacity(self.stores.len());
        for store in self.stores.iter() {
            snapshots.push(self.loader.load_store(store, now).await?);
        }
        Ok(snapshots)
    }

    /// Re-fetch stale keys of every store.
    pub async fn refresh_all(&self) -> SyncResult<Vec<StoreSnapshot>> {
        let now = Utc::now();
        let mut snapshots = Vec::with_capacity(self.stores.len());
        for store in self.stores.iter() {
            snapshots.push(self.loader.refresh_store(store, now).await?);
        }
        Ok(snapshots)
    }

    /// Run one detection cycle now.
    pub async fn detect_changes(&self) -> SyncResult<CycleOutcome> {
        self.detector.run_cycle().await
    }

    /// Start the fixed-delay poller when watching is enabled. Returns whether
    /// a poller is running afterwards.
    pub fn start_polling(&mut self) -> bool {
        if !self.config.watch.enabled {
            tracing::debug!("Watching disabled, poller not started");
            return false;
        }
        if self.poller.is_none() {
            let handle = spawn_poller(
                Arc::clone(&self.detector),
                self.config.watch.delay(),
                self.shutdown_tx.subscribe(),
            );
            self.poller = Some(handle);
        }
        true
    }

    /// State for the webhook server, sharing this engine's cache and sink.
    pub fn webhook_state(&self) -> WebhookServerState {
        WebhookServerState {
            stores: Arc::clone(&self.stores),
            cache: Arc::clone(&self.cache),
            sink: Arc::clone(&self.sink),
            domain: self.config.webhook.domain.clone(),
        }
    }

    /// Stop scheduling new cycles and wait for the poller to finish its
    /// in-flight cycle.
    pub async fn shutdown(&mut self) {
        let _ = self.shutdown_tx.send(true);
        if let Some(handle) = self.poller.take() {
            if let Err(e) = handle.await {
                tracing::warn!("Poller task ended abnormally: {}", e);
            }
        }
        tracing::info!("Sync engine stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::mock::{RecordingSink, ScriptedConfigClient};
    use crate::client::FetchOutcome;
    use crate::config::StoreConfig;
    use crate::models::{ApiPath, Setting};
    use std::time::Duration;

    const CONN: &str = "Endpoint=https://demo.azconfig.io;Id=id-1;Secret=c2VjcmV0";

    fn config() -> EngineConfig {
        EngineConfig::new().with_store(StoreConfig::with_connection_string(CONN))
    }

    #[test]
    fn test_invalid_config_rejected() {
        let result = SyncEngine::new(
            EngineConfig::new(),
            Arc::new(ScriptedConfigClient::new()),
            Arc::new(RecordingSink::new()),
        );
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_initial_load_and_detect() {
        let client = Arc::new(ScriptedConfigClient::new());
        client.set_outcome(
            "demo",
            ApiPath::Kv,
            "/application/*",
            FetchOutcome::Items(vec![Setting::new("/application/greeting", "hi").with_etag("e1")]),
        );
        let engine = SyncEngine::new(config(), client, Arc::new(RecordingSink::new())).unwrap();

        let snapshots = engine.initial_load().await.unwrap();
        assert_eq!(snapshots.len(), 1);
        assert_eq!(
            snapshots[0].properties.get("greeting").map(String::as_str),
            Some("hi")
        );
        assert_eq!(engine.detect_changes().await.unwrap(), CycleOutcome::Unchanged);
    }

    #[tokio::test]
    async fn test_polling_disabled_by_default() {
        let mut engine = SyncEngine::new(
            config(),
            Arc::new(ScriptedConfigClient::new()),
            Arc::new(RecordingSink::new()),
        )
        .unwrap();
        assert!(!engine.start_polling());
        engine.shutdown().await;
    }

    #[tokio::test]
    async fn test_start_and_shutdown_poller() {
        let client = Arc::new(ScriptedConfigClient::new());
        let mut engine = SyncEngine::new(
            config().with_watch(true, Duration::from_secs(1)),
            client.clone(),
            Arc::new(RecordingSink::new()),
        )
        .unwrap();

        assert!(engine.start_polling());
        tokio::time::sleep(Duration::from_millis(50)).await;
        tokio::time::timeout(Duration::from_secs(2), engine.shutdown())
            .await
            .unwrap();
        assert!(client.call_count() >= 2);
    }

    #[test]
    fn test_webhook_state_shares_stores() {
        let engine = SyncEngine::new(
            config(),
            Arc::new(ScriptedConfigClient::new()),
            Arc::new(RecordingSink::new()),
        )
        .unwrap();
        let state = engine.webhook_state();
        assert_eq!(state.stores.len(), 1);
        assert_eq!(state.domain, "azconfig.io");
    }
}
