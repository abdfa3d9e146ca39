//! Change detection for remote stores.
//!
//! ```text
//!   Poller (fixed delay)
//!         │
//!         ▼
//!   ChangeDetector ──► ConfigClient (/revisions, newest only)
//!         │
//!         ├──► SettingsCache::compare_etag / record_etags
//!         ▼
//!   RefreshSink (one aggregated event per cycle)
//! ```

mod detector;
mod keys;
mod poller;
mod state;
mod types;

pub use detector::{watch_targets, ChangeDetector, WatchTarget};
pub use keys::{generate_contexts, watched_key_filter, FEATURE_FLAG_WATCH_KEY};
pub use poller::spawn_poller;
pub use state::{PollState, RunGuard};
pub use types::{CycleOutcome, Namespace, RefreshEvent, RefreshSource, SkipReason};
