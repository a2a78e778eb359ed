//! Venue port traits for market data and order placement.
//!
//! These are the primary integration points for venue plug-ins. The engine
//! depends only on these capabilities; wire encodings live behind them.

use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::core::domain::{
    BookSnapshot, CancelOutcome, Fill, MarketId, OrderAck, OrderId, OrderIntent, VenueId,
};
use crate::error::VenueError;

/// Events emitted by a venue book stream.
#[derive(Debug, Clone)]
pub enum VenueEvent {
    /// A normalised book snapshot.
    Snapshot(BookSnapshot),
    /// Connection established (or re-established).
    Connected,
    /// Connection lost; the reconnect layer will retry.
    Disconnected {
        /// The disconnection reason.
        reason: String,
    },
}

impl VenueEvent {
    /// Get the snapshot if this event carries one.
    #[must_use]
    pub const fn snapshot(&self) -> Option<&BookSnapshot> {
        match self {
            Self::Snapshot(snapshot) => Some(snapshot),
            _ => None,
        }
    }
}

/// Streaming order book feed from one venue.
///
/// Implementations handle connection management, subscriptions, and message
/// normalisation for their venue's protocol. The stream is the sole writer
/// of snapshots for its venue.
#[async_trait]
pub trait BookStream: Send {
    /// Connect to the venue's real-time feed.
    async fn connect(&mut self) -> Result<(), VenueError>;

    /// Begin streaming books for the given markets.
    async fn subscribe(&mut self, markets: &[MarketId]) -> Result<(), VenueError>;

    /// Stop streaming books for the given markets.
    async fn unsubscribe(&mut self, markets: &[MarketId]) -> Result<(), VenueError>;

    /// Receive the next event. Blocks until one is available; returns
    /// `None` when the stream is closed for good.
    async fn next_event(&mut self) -> Option<VenueEvent>;

    /// The venue this stream serves.
    fn venue(&self) -> &VenueId;
}

/// Implement `BookStream` for boxed trait objects so generic wrappers work.
#[async_trait]
impl BookStream for Box<dyn BookStream> {
    async fn connect(&mut self) -> Result<(), VenueError> {
        (**self).connect().await
    }

    async fn subscribe(&mut self, markets: &[MarketId]) -> Result<(), VenueError> {
        (**self).subscribe(markets).await
    }

    async fn unsubscribe(&mut self, markets: &[MarketId]) -> Result<(), VenueError> {
        (**self).unsubscribe(markets).await
    }

    async fn next_event(&mut self) -> Option<VenueEvent> {
        (**self).next_event().await
    }

    fn venue(&self) -> &VenueId {
        (**self).venue()
    }
}

/// Request/reply order surface of one venue.
///
/// Order rejections are reported synchronously and never retried here;
/// a fresh admission must re-trigger the trade through the normal path.
#[async_trait]
pub trait OrderGateway: Send + Sync {
    /// Place a taker order. The deadline travels with the intent; the venue
    /// may not fill after it.
    async fn place_taker(&self, intent: &OrderIntent) -> Result<OrderAck, VenueError>;

    /// Cancel an order previously acked.
    async fn cancel(&self, order_id: &OrderId) -> Result<CancelOutcome, VenueError>;

    /// Subscribe to the venue's fill stream.
    fn fills(&self) -> broadcast::Receiver<Fill>;

    /// The venue this gateway serves.
    fn venue(&self) -> &VenueId;
}
