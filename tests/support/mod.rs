//! Shared helpers for integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use pairtaker::core::domain::TradeRecord;
use pairtaker::core::service::{Event, EventStream, MemoryTradeStore};

/// Poll the memory store until a trade record lands or the timeout expires.
pub async fn wait_for_record(store: &Arc<MemoryTradeStore>, timeout: Duration) -> TradeRecord {
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if let Some(record) = store.records().into_iter().next() {
            return record;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "no trade record within {timeout:?}"
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

/// Drain everything currently buffered on an event stream.
pub fn drain_events(stream: &mut EventStream) -> Vec<Event> {
    let mut events = Vec::new();
    while let Some(event) = stream.try_recv() {
        events.push(event);
    }
    events
}

/// Kinds of the drained events, in order.
pub fn event_kinds(events: &[Event]) -> Vec<&'static str> {
    events.iter().map(Event::kind).collect()
}
