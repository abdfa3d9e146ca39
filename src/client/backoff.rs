//! Retry budget and backoff computation.

use std::time::{Duration, Instant};

use rand::Rng;

/// Retry limits shared by every fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts after the first one.
    pub max_retries: u32,
    /// Retry window, measured from the start of a fetch.
    pub max_retry_time: Duration,
    /// Terminal failures of fail-fast stores are held back until this long
    /// after process start, to avoid crash-looping inside an orchestrator's
    /// grace period.
    pub prekill_time: Duration,
    /// First delay after a connection failure.
    pub connection_backoff_base: Duration,
    /// Cap on the connection-failure delay.
    pub connection_backoff_max: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 12,
            max_retry_time: Duration::from_secs(60),
            prekill_time: Duration::from_secs(5),
            connection_backoff_base: Duration::from_millis(800),
            connection_backoff_max: Duration::from_millis(8000),
        }
    }
}

impl RetryPolicy {
    /// True once `retry_count` retries were made or the window since
    /// `fetch_started` has passed.
    pub fn exhausted(&self, retry_count: u32, fetch_started: Instant) -> bool {
        retry_count >= self.max_retries || fetch_started.elapsed() >= self.max_retry_time
    }

    /// Exponential delay for connection failures: `min(base * 2^retry, max)`.
    pub fn connection_delay(&self, retry_count: u32) -> Duration {
        let factor = 1u32.checked_shl(retry_count).unwrap_or(u32::MAX);
        self.connection_backoff_base
            .checked_mul(factor)
            .unwrap_or(self.connection_backoff_max)
            .min(self.connection_backoff_max)
    }

    /// Remaining time until `process_started + prekill_time`, if any.
    pub fn prekill_remaining(&self, process_started: Instant) -> Option<Duration> {
        self.prekill_time
            .checked_sub(process_started.elapsed())
            .filter(|d| !d.is_zero())
    }
}

/// Number of jitter slots for a retry: `2^retry_count - 1`.
pub fn backoff_slots(retry_count: u32) -> u64 {
    1u64.checked_shl(retry_count)
        .map(|v| v - 1)
        .unwrap_or(u64::MAX)
}

/// Throttling delay: `max(retry_after, retry_after * random(0..=slots))`.
///
/// Always within `[retry_after, retry_after * max(1, 2^retry_count - 1)]`.
pub fn throttle_delay<R: Rng + ?Sized>(retry_after_ms: u64, retry_count: u32, rng: &mut R) -> Duration {
    let slots = backoff_slots(retry_count);
    let jitter = if slots == 0 {
        0
    } else {
        retry_after_ms.saturating_mul(rng.gen_range(0..=slots))
    };
    Duration::from_millis(retry_after_ms.max(jitter))
}
