//! Refresh notification sink.

use async_trait::async_trait;

use crate::watcher::RefreshEvent;

/// Receives aggregated refresh notifications from the detector and the
/// webhook surface. Delivery is fire-and-forget.
#[async_trait]
pub trait RefreshSink: Send + Sync {
    async fn notify(&self, event: RefreshEvent);
}
