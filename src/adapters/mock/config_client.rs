//! Scripted config client for testing.
//!
//! Returns canned [`FetchOutcome`]s without any HTTP. Lookup goes from most
//! to least specific: `(store, api, key filter)`, then `store`, then the
//! default. With nothing scripted, every fetch is `Empty`.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::client::FetchOutcome;
use crate::models::{ApiPath, QuerySelector, Store};
use crate::traits::ConfigClient;

/// A recorded fetch.
#[derive(Debug, Clone)]
pub struct ScriptedCall {
    pub store: String,
    pub api: ApiPath,
    pub selector: QuerySelector,
}

type ScriptKey = (String, ApiPath, String);

/// Config client returning scripted outcomes.
///
/// # Example
///
/// ```ignore
/// use appconfig_sync::adapters::mock::ScriptedConfigClient;
/// use appconfig_sync::client::FetchOutcome;
/// use appconfig_sync::models::{ApiPath, Setting};
///
/// let client = ScriptedConfigClient::new();
/// client.set_outcome(
///     "demo",
///     ApiPath::Kv,
///     "/application/*",
///     FetchOutcome::Items(vec![Setting::new("/application/a", "1").with_etag("e1")]),
/// );
/// ```
#[derive(Debug, Clone, Default)]
pub struct ScriptedConfigClient {
    by_query: Arc<Mutex<HashMap<ScriptKey, FetchOutcome>>>,
    by_store: Arc<Mutex<HashMap<String, FetchOutcome>>>,
    default_outcome: Arc<Mutex<Option<FetchOutcome>>>,
    calls: Arc<Mutex<Vec<ScriptedCall>>>,
    delay: Arc<Mutex<Option<Duration>>>,
}

impl ScriptedConfigClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Outcome for one store, API path and (first) key filter.
    pub fn set_outcome(&self, store: &str, api: ApiPath, key: &str, outcome: FetchOutcome) {
        self.by_query
            .lock()
            .unwrap()
            .insert((store.to_string(), api, key.to_string()), outcome);
    }

    /// Outcome for every fetch against a store without a more specific script.
    pub fn set_store_outcome(&self, store: &str, outcome: FetchOutcome) {
        self.by_store
            .lock()
            .unwrap()
            .insert(store.to_string(), outcome);
    }

    pub fn set_default(&self, outcome: FetchOutcome) {
        *self.default_outcome.lock().unwrap() = Some(outcome);
    }

    /// Sleep this long inside every fetch, to hold a cycle open.
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }

    pub fn calls(&self) -> Vec<ScriptedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn calls_for_store(&self, store: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|call| call.store == store)
            .count()
    }

    fn outcome_for(&self, store: &str, api: ApiPath, selector: &QuerySelector) -> FetchOutcome {
        let key = selector.keys.first().cloned().unwrap_or_default();
        if let Some(outcome) = self
            .by_query
            .lock()
            .unwrap()
            .get(&(store.to_string(), api, key))
        {
            return outcome.clone();
        }
        if let Some(outcome) = self.by_store.lock().unwrap().get(store) {
            return outcome.clone();
        }
        self.default_outcome
            .lock()
            .unwrap()
            .clone()
            .unwrap_or(FetchOutcome::Empty)
    }
}

#[async_trait]
impl ConfigClient for ScriptedConfigClient {
    async fn fetch(&self, api: ApiPath, selector: &QuerySelector, store: &Store) -> FetchOutcome {
        self.calls.lock().unwrap().push(ScriptedCall {
            store: store.name.clone(),
            api,
            selector: selector.clone(),
        });

        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        self.outcome_for(&store.name, api, selector)
    }
}
