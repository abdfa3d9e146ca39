//! Per-process poll state: the running flag and the last check time.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, Utc};

/// Guards detection cycles so that at most one runs at a time.
///
/// Not persisted; a restart begins with a first run.
#[derive(Debug, Default)]
pub struct PollState {
    running: AtomicBool,
    last_checked_at: Mutex<Option<DateTime<Utc>>>,
}

/// Holds the running flag; clears it when dropped, including on early
/// return or panic.
#[derive(Debug)]
pub struct RunGuard<'a> {
    state: &'a PollState,
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        let _ = self
            .state
            .running
            .compare_exchange(true, false, Ordering::AcqRel, Ordering::Acquire);
    }
}

impl PollState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Try to move `Idle -> Running`. `None` if a cycle is already running.
    pub fn try_start(&self) -> Option<RunGuard<'_>> {
        self.running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| RunGuard { state: self })
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub fn last_checked_at(&self) -> Option<DateTime<Utc>> {
        *self
            .last_checked_at
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn mark_checked(&self, now: DateTime<Utc>) {
        let mut last = self
            .last_checked_at
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *last = Some(now);
    }

    /// True on the first run, or once `now` is past `last_checked_at + delay`.
    pub fn is_due(&self, now: DateTime<Utc>, delay: Duration) -> bool {
        let Some(last) = self.last_checked_at() else {
            return true;
        };
        match chrono::Duration::from_std(delay)
            .ok()
            .and_then(|delay| last.checked_add_signed(delay))
        {
            Some(next) => now > next,
            None => false,
        }
    }
}
