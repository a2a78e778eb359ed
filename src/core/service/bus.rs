//! Observability event bus.
//!
//! One-way fan-out to best-effort observers. Publishing never blocks the
//! trading loop; a subscriber that falls more than the queue depth behind
//! loses the oldest events and the drop counter increments.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::trace;

use crate::core::service::Event;

/// Fan-out publisher for structured events.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<Event>,
    dropped: Arc<AtomicU64>,
}

impl EventBus {
    /// Create a bus with the given per-subscriber queue depth.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity);
        Self {
            tx,
            dropped: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Publish an event. Never blocks; having no subscribers is fine.
    pub fn publish(&self, event: Event) {
        trace!(kind = event.kind(), "Event published");
        let _ = self.tx.send(event);
    }

    /// Subscribe to the stream from this point on.
    #[must_use]
    pub fn subscribe(&self) -> EventStream {
        EventStream {
            rx: self.tx.subscribe(),
            dropped: Arc::clone(&self.dropped),
        }
    }

    /// Events dropped across all slow subscribers since startup.
    #[must_use]
    pub fn dropped_total(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Current subscriber count.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

/// A best-effort subscription to the event bus.
pub struct EventStream {
    rx: broadcast::Receiver<Event>,
    dropped: Arc<AtomicU64>,
}

impl EventStream {
    /// Receive the next event.
    ///
    /// When this subscriber lagged, the skipped count is added to the bus
    /// drop counter and the stream resumes at the oldest retained event.
    /// Returns `None` once the bus is gone.
    pub async fn recv(&mut self) -> Option<Event> {
        loop {
            match self.rx.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    self.dropped.fetch_add(skipped, Ordering::Relaxed);
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Non-blocking receive; `None` when no event is ready.
    pub fn try_recv(&mut self) -> Option<Event> {
        loop {
            match self.rx.try_recv() {
                Ok(event) => return Some(event),
                Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                    self.dropped.fetch_add(skipped, Ordering::Relaxed);
                }
                Err(_) => return None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::domain::VenueId;

    fn event(n: u32) -> Event {
        Event::VenueDown {
            venue: VenueId::from("alpha"),
            reason: format!("r{n}"),
        }
    }

    #[tokio::test]
    async fn test_publish_subscribe() {
        let bus = EventBus::new(16);
        let mut stream = bus.subscribe();
        bus.publish(event(1));
        let received = stream.recv().await.unwrap();
        assert_eq!(received.kind(), "venue_down");
    }

    #[tokio::test]
    async fn test_publish_without_subscribers_does_not_block() {
        let bus = EventBus::new(4);
        for n in 0..100 {
            bus.publish(event(n));
        }
        assert_eq!(bus.dropped_total(), 0);
    }

    #[tokio::test]
    async fn test_slow_subscriber_drops_oldest_and_counts() {
        let bus = EventBus::new(4);
        let mut stream = bus.subscribe();
        for n in 0..10 {
            bus.publish(event(n));
        }
        // First recv observes the lag, counts the six skipped events, and
        // resumes at the oldest retained one.
        let received = stream.recv().await.unwrap();
        match received {
            Event::VenueDown { reason, .. } => assert_eq!(reason, "r6"),
            _ => panic!("unexpected event"),
        }
        assert_eq!(bus.dropped_total(), 6);
    }
}
