//! Broadcast event bus for scan progress

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::broadcast;

use super::streaming::FilteredReceiver;
use super::types::ScanEvent;

/// Counters for published and undelivered events
#[derive(Debug, Clone, Default)]
pub struct EventBusMetrics {
    pub events_published: Arc<AtomicU64>,
    /// Published while nobody was subscribed
    pub events_dropped: Arc<AtomicU64>,
}

impl EventBusMetrics {
    #[must_use]
    pub fn published(&self) -> u64 {
        self.events_published.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn dropped(&self) -> u64 {
        self.events_dropped.load(Ordering::SeqCst)
    }
}

#[derive(Debug)]
pub struct ScanEventBus {
    sender: broadcast::Sender<ScanEvent>,
    metrics: EventBusMetrics,
}

impl ScanEventBus {
    /// # Panics
    ///
    /// When `capacity` is zero; `ScannerConfig::validate` rejects that.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            metrics: EventBusMetrics::default(),
        }
    }

    /// Publish to every current subscriber. Returns how many received it;
    /// publishing with no subscribers is not an error.
    pub fn publish(&self, event: ScanEvent) -> usize {
        self.metrics.events_published.fetch_add(1, Ordering::SeqCst);
        match self.sender.send(event) {
            Ok(count) => count,
            Err(_) => {
                self.metrics.events_dropped.fetch_add(1, Ordering::SeqCst);
                log::trace!("Published scan event with no active subscribers");
                0
            }
        }
    }

    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<ScanEvent> {
        self.sender.subscribe()
    }

    /// Subscribe to the events `filter` accepts
    pub fn subscribe_filtered<F>(&self, filter: F) -> FilteredReceiver<F>
    where
        F: Fn(&ScanEvent) -> bool + Send + Sync + 'static,
    {
        FilteredReceiver::new(self.sender.subscribe(), filter)
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    #[must_use]
    pub fn metrics(&self) -> &EventBusMetrics {
        &self.metrics
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventBusError;
    use crate::scan::{ScanOutcome, SkipReason};

    #[tokio::test]
    async fn test_filtered_subscription() {
        let bus = ScanEventBus::new(16);
        let mut only_source_7 = bus.subscribe_filtered(|e| e.source_id() == Some(7));

        bus.publish(ScanEvent::source_started(3, "https://a.example"));
        bus.publish(ScanEvent::source_finished(
            7,
            ScanOutcome::Skipped {
                reason: SkipReason::Disabled,
            },
        ));

        let event = only_source_7.recv().await.unwrap();
        assert_eq!(event.source_id(), Some(7));
        assert!(only_source_7.try_recv().unwrap().is_none());
    }

    #[tokio::test]
    async fn test_filtered_receiver_keeps_going_after_lag() {
        let bus = ScanEventBus::new(2);
        let mut started = bus.subscribe_filtered(|e| matches!(e, ScanEvent::SourceStarted { .. }));

        for id in 1..=4 {
            bus.publish(ScanEvent::source_started(id, "https://a.example"));
        }

        assert_eq!(started.recv().await, Err(EventBusError::ReceiverLagged(2)));
        assert_eq!(started.recv().await.unwrap().source_id(), Some(3));
        assert_eq!(started.recv().await.unwrap().source_id(), Some(4));

        drop(bus);
        assert_eq!(started.recv().await, Err(EventBusError::Shutdown));
    }

    #[test]
    fn test_publish_without_subscribers_counts_drop() {
        let bus = ScanEventBus::new(4);
        assert_eq!(bus.publish(ScanEvent::interactive_finished()), 0);
        assert_eq!(bus.metrics().published(), 1);
        assert_eq!(bus.metrics().dropped(), 1);
    }
}
