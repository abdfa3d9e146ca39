//! Change detection across stores and namespaces.
//!
//! One cycle probes the newest revision of every watch target, compares its
//! etag with the one recorded last time and emits at most one aggregated
//! [`RefreshEvent`]. Cycles never overlap; a cycle that finds another one
//! running returns [`CycleOutcome::Skipped`] without touching the network.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, info, trace, warn};

use super::keys::{watched_key_filter, FEATURE_FLAG_WATCH_KEY};
use super::state::PollState;
use super::types::{CycleOutcome, Namespace, RefreshEvent, SkipReason};
use crate::cache::{Observation, SettingsCache};
use crate::error::{ErrorContext, SyncError, SyncResult};
use crate::models::{ApiPath, QuerySelector, Store};
use crate::traits::{ConfigClient, RefreshSink};

/// One thing whose latest etag is compared between cycles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchTarget {
    pub namespace: Namespace,
    /// Shown in the refresh summary.
    pub pattern: String,
    pub selector: QuerySelector,
    /// Key under which the etag is recorded in the cache.
    pub watch_key: String,
}

/// Watch targets of a store: its settings namespace (one target per trigger
/// when push monitoring is enabled) followed by its feature flags.
pub fn watch_targets(store: &Store) -> Vec<WatchTarget> {
    let mut targets = Vec::new();

    if store.monitoring.enabled && !store.monitoring.triggers.is_empty() {
        for trigger in &store.monitoring.triggers {
            targets.push(WatchTarget {
                namespace: Namespace::Settings,
                pattern: trigger.to_string(),
                selector: QuerySelector::latest_revision(
                    trigger.key.clone(),
                    vec![trigger.label.clone()],
                ),
                watch_key: format!(
                    "{}|trigger|{}|{}",
                    store.name,
                    trigger.key,
                    trigger.label.as_deref().unwrap_or("\0")
                ),
            });
        }
    } else {
        let filter = watched_key_filter(store);
        targets.push(WatchTarget {
            namespace: Namespace::Settings,
            pattern: filter.clone(),
            selector: QuerySelector::latest_revision(filter, store.labels.clone()),
            watch_key: format!("{}|{}", store.name, Namespace::Settings.as_str()),
        });
    }

    targets.push(WatchTarget {
        namespace: Namespace::FeatureFlags,
        pattern: FEATURE_FLAG_WATCH_KEY.to_string(),
        selector: QuerySelector::latest_revision(FEATURE_FLAG_WATCH_KEY, store.labels.clone()),
        watch_key: format!("{}|{}", store.name, Namespace::FeatureFlags.as_str()),
    });

    targets
}

pub struct ChangeDetector {
    client: Arc<dyn ConfigClient>,
    cache: Arc<SettingsCache>,
    sink: Arc<dyn RefreshSink>,
    stores: Arc<Vec<Store>>,
    delay: Duration,
    state: PollState,
}

impl std::fmt::Debug for ChangeDetector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChangeDetector")
            .field("stores", &self.stores.len())
            .field("delay", &self.delay)
            .field("state", &self.state)
            .finish()
    }
}

impl ChangeDetector {
    pub fn new(
        client: Arc<dyn ConfigClient>,
        cache: Arc<SettingsCache>,
        sink: Arc<dyn RefreshSink>,
        stores: Arc<Vec<Store>>,
        delay: Duration,
    ) -> Self {
        Self {
            client,
            cache,
            sink,
            stores,
            delay,
            state: PollState::new(),
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn state(&self) -> &PollState {
        &self.state
    }

    pub async fn run_cycle(&self) -> SyncResult<CycleOutcome> {
        self.run_cycle_at(Utc::now()).await
    }

    /// Run one detection cycle as of `now`.
    ///
    /// Errors only for a failed probe on a fail-fast store; the running flag
    /// is released either way.
    pub async fn run_cycle_at(&self, now: DateTime<Utc>) -> SyncResult<CycleOutcome> {
        let Some(_guard) = self.state.try_start() else {
            debug!("Detection cycle already running, skipping");
            return Ok(CycleOutcome::Skipped(SkipReason::AlreadyRunning));
        };

        if !self.state.is_due(now, self.delay) {
            trace!("Detection cycle not due yet");
            return Ok(CycleOutcome::Skipped(SkipReason::NotDue));
        }

        let mut changed: Vec<String> = Vec::new();
        let mut observed: Vec<(String, String)> = Vec::new();

        // Etags are recorded only after every probe succeeded, so a change
        // seen in a cycle aborted by a fail-fast store is reported next time.
        for store in self.stores.iter() {
            for target in watch_targets(store) {
                let Some((etag, is_change)) = self.probe(store, &target).await? else {
                    continue;
                };
                if is_change && !changed.contains(&target.pattern) {
                    changed.push(target.pattern.clone());
                }
                observed.push((target.watch_key, etag));
            }
        }

        self.cache.record_etags(observed);
        self.state.mark_checked(now);

        if changed.is_empty() {
            return Ok(CycleOutcome::Unchanged);
        }

        let event = RefreshEvent::from_poll(changed, now);
        info!("{}", event.message);
        self.sink.notify(event.clone()).await;
        Ok(CycleOutcome::Refreshed(event))
    }

    /// Fetch the latest revision of one target and compare its etag with
    /// the recorded one. Returns the etag and whether it changed, or `None`
    /// when a non-fail-fast probe failed.
    async fn probe(
        &self,
        store: &Store,
        target: &WatchTarget,
    ) -> SyncResult<Option<(String, bool)>> {
        let outcome = self
            .client
            .fetch(ApiPath::Revisions, &target.selector, store)
            .await;

        let etag = match outcome.first_etag() {
            Some(etag) => etag,
            None => {
                let err = match outcome.into_result() {
                    Err(err) => err,
                    Ok(_) => return Ok(None),
                };
                if store.fail_fast {
                    return Err(SyncError::from(err).with_context(
                        ErrorContext::new("detect_changes")
                            .with_store(&store.name)
                            .with_namespace(target.namespace.as_str()),
                    ));
                }
                warn!(
                    store = %store.name,
                    namespace = target.namespace.as_str(),
                    "Change probe failed, keeping previous state: {}",
                    err
                );
                return Ok(None);
            }
        };

        let is_change = match self.cache.compare_etag(&target.watch_key, &etag) {
            Observation::First => {
                debug!(
                    store = %store.name,
                    namespace = target.namespace.as_str(),
                    etag = %etag,
                    "First observation of {}",
                    target.pattern
                );
                false
            }
            Observation::Unchanged => {
                trace!(store = %store.name, pattern = %target.pattern, "Etag unchanged");
                false
            }
            Observation::Changed { previous } => {
                info!(
                    store = %store.name,
                    namespace = target.namespace.as_str(),
                    "Etag for {} changed from {:?} to {:?}",
                    target.pattern,
                    previous,
                    etag
                );
                true
            }
        };

        Ok(Some((etag, is_change)))
    }
}
