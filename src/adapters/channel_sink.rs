//! Channel-backed refresh sink.

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::traits::RefreshSink;
use crate::watcher::RefreshEvent;

/// Forwards refresh events to an unbounded channel.
///
/// A closed receiver is not an error; events are dropped with a debug log.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<RefreshEvent>,
}

impl ChannelSink {
    pub fn new(tx: mpsc::UnboundedSender<RefreshEvent>) -> Self {
        Self { tx }
    }

    /// Sink plus the receiving end.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<RefreshEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx), rx)
    }
}

#[async_trait]
impl RefreshSink for ChannelSink {
    async fn notify(&self, event: RefreshEvent) {
        if self.tx.send(event).is_err() {
            tracing::debug!("Refresh channel closed, dropping event");
        }
    }
}
