//! Recording refresh sink for testing.

use async_trait::async_trait;
use std::sync::{Arc, Mutex};

use crate::traits::RefreshSink;
use crate::watcher::RefreshEvent;

/// Sink that keeps every event it receives.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    events: Arc<Mutex<Vec<RefreshEvent>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// All events received so far, oldest first.
    pub fn events(&self) -> Vec<RefreshEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.events.lock().unwrap().clear();
    }
}

#[async_trait]
impl RefreshSink for RecordingSink {
    async fn notify(&self, event: RefreshEvent) {
        self.events.lock().unwrap().push(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[tokio::test]
    async fn test_records_in_order() {
        let sink = RecordingSink::new();
        sink.notify(RefreshEvent::from_poll(vec!["a".into()], Utc::now()))
            .await;
        sink.notify(RefreshEvent::from_poll(vec!["b".into()], Utc::now()))
            .await;

        let events = sink.events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[1].changed, vec!["b".to_string()]);

        sink.clear();
        assert!(sink.events().is_empty());
    }
}
