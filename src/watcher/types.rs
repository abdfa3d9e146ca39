//! Shared types for change detection.

use chrono::{DateTime, Utc};

/// Logical namespace probed per store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Namespace {
    Settings,
    FeatureFlags,
}

impl Namespace {
    pub fn as_str(&self) -> &'static str {
        match self {
            Namespace::Settings => "settings",
            Namespace::FeatureFlags => "feature_flags",
        }
    }
}

/// Where a refresh request came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshSource {
    /// The fixed-delay poller
    Poll,
    /// An authenticated push notification for one store
    Webhook { store: String },
}

impl RefreshSource {
    /// Human-readable description for logging
    pub fn description(&self) -> String {
        match self {
            Self::Poll => "poll".to_string(),
            Self::Webhook { store } => format!("webhook: {}", store),
        }
    }
}

/// A single aggregated refresh notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshEvent {
    /// Summary of what changed.
    pub message: String,
    /// Watch patterns (or triggers) whose etag changed.
    pub changed: Vec<String>,
    pub source: RefreshSource,
    pub at: DateTime<Utc>,
}

impl RefreshEvent {
    /// Event for one poll cycle covering every changed watch pattern.
    pub fn from_poll(changed: Vec<String>, at: DateTime<Utc>) -> Self {
        Self {
            message: format!(
                "Some keys matching {{{}}} have been updated since last check.",
                changed.join(", ")
            ),
            changed,
            source: RefreshSource::Poll,
            at,
        }
    }

    /// Event for a push notification that matched `trigger` on `store`.
    pub fn from_webhook(store: impl Into<String>, trigger: String, at: DateTime<Utc>) -> Self {
        let store = store.into();
        Self {
            message: format!("Trigger {} fired on store {}.", trigger, store),
            changed: vec![trigger],
            source: RefreshSource::Webhook { store },
            at,
        }
    }
}

/// Why a cycle did not run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Another cycle holds the running flag.
    AlreadyRunning,
    /// The previous cycle finished less than one delay ago.
    NotDue,
}

/// Result of one `run_cycle` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    Skipped(SkipReason),
    Unchanged,
    Refreshed(RefreshEvent),
}

impl CycleOutcome {
    pub fn is_refreshed(&self) -> bool {
        matches!(self, CycleOutcome::Refreshed(_))
    }
}
