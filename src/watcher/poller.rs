//! Fixed-delay polling task.
//!
//! The next cycle is scheduled only after the current one completes, so a
//! slow cycle (long backoff sleeps) pushes the schedule back instead of
//! piling up runs. Shutdown stops scheduling; an in-flight cycle finishes.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use super::detector::ChangeDetector;
use super::types::CycleOutcome;

/// Spawn the polling task.
///
/// # Arguments
///
/// * `detector` - Detector shared with any other caller of `run_cycle`
/// * `delay` - Pause between the end of one cycle and the start of the next
/// * `shutdown` - Set to `true` to stop scheduling new cycles
///
/// # Returns
///
/// A JoinHandle that completes once the poller has stopped.
pub fn spawn_poller(
    detector: Arc<ChangeDetector>,
    delay: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        tracing::info!("Change poller started (delay: {:?})", delay);

        loop {
            if *shutdown.borrow() {
                break;
            }

            match detector.run_cycle().await {
                Ok(CycleOutcome::Refreshed(event)) => {
                    tracing::debug!("Cycle emitted refresh for {:?}", event.changed);
                }
                Ok(CycleOutcome::Skipped(reason)) => {
                    tracing::trace!("Cycle skipped: {:?}", reason);
                }
                Ok(CycleOutcome::Unchanged) => {
                    tracing::trace!("No changes detected");
                }
                Err(err) => {
                    // Fail-fast probe failures; keep polling.
                    tracing::error!(code = err.error_code(), "Change detection failed: {}", err);
                }
            }

            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }

        tracing::info!("Change poller stopped");
    })
}
