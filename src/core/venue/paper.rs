//! Paper order gateway.
//!
//! Simulates taker execution against the live book cache: orders fill
//! immediately at walked-depth prices up to the limit, and fills arrive on
//! the same broadcast surface a real gateway would use. Paper mode runs the
//! whole loop end-to-end without touching venue order APIs.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use tokio::sync::broadcast;
use tracing::debug;

use crate::core::cache::BookCache;
use crate::core::domain::{
    CancelOutcome, Cents, Fill, OrderAck, OrderId, OrderIntent, OrderRejection, Side,
    VenueId, CONTRACT_PAYOUT_CENTS,
};
use crate::core::venue::{OrderGateway, VenueHealthBoard};
use crate::error::VenueError;

/// Simulated taker gateway over the live book cache.
pub struct PaperGateway {
    venue: VenueId,
    books: Arc<BookCache>,
    health: Arc<VenueHealthBoard>,
    taker_bps: Cents,
    fills_tx: broadcast::Sender<Fill>,
    next_order: AtomicU64,
}

impl PaperGateway {
    /// Create a paper gateway for a venue.
    #[must_use]
    pub fn new(
        venue: impl Into<VenueId>,
        books: Arc<BookCache>,
        health: Arc<VenueHealthBoard>,
        taker_bps: Cents,
    ) -> Self {
        let (fills_tx, _rx) = broadcast::channel(256);
        Self {
            venue: venue.into(),
            books,
            health,
            taker_bps,
            fills_tx,
            next_order: AtomicU64::new(1),
        }
    }

    fn next_order_id(&self) -> OrderId {
        let n = self.next_order.fetch_add(1, Ordering::Relaxed);
        OrderId::from(format!("paper-{}-{n}", self.venue))
    }
}

#[async_trait]
impl OrderGateway for PaperGateway {
    async fn place_taker(&self, intent: &OrderIntent) -> Result<OrderAck, VenueError> {
        if self.health.is_down(&self.venue) {
            return Err(VenueError::Rejected(OrderRejection::Unavailable));
        }

        let Some(book) = self.books.get(intent.market()) else {
            return Err(VenueError::Rejected(OrderRejection::MarketHalted));
        };

        // Walk the opposite side up to the limit price.
        let levels: Vec<(Cents, u64)> = match intent.side() {
            Side::BuyYes => book
                .asks()
                .iter()
                .map(|l| (l.price(), l.size()))
                .collect(),
            Side::BuyNo => book
                .bids()
                .iter()
                .map(|l| (CONTRACT_PAYOUT_CENTS - l.price(), l.size()))
                .collect(),
        };

        let mut remaining = intent.qty();
        let mut fills = Vec::new();
        for (px, size) in levels {
            if px > intent.limit_px() || remaining == 0 {
                break;
            }
            let take = remaining.min(size);
            fills.push((px, take));
            remaining -= take;
        }

        if fills.is_empty() {
            return Err(VenueError::Rejected(OrderRejection::PriceOutsideBand));
        }

        let order_id = self.next_order_id();
        let ack = OrderAck::new(intent.intent_id().clone(), order_id.clone(), Utc::now());
        debug!(
            venue = %self.venue,
            order_id = %order_id,
            qty = intent.qty(),
            "Paper order filled"
        );
        for (px, qty) in fills {
            let fee = px * self.taker_bps / Decimal::from(10_000);
            let _ = self.fills_tx.send(Fill::new(
                order_id.clone(),
                px,
                qty,
                Utc::now(),
                fee,
            ));
        }
        Ok(ack)
    }

    async fn cancel(&self, _order_id: &OrderId) -> Result<CancelOutcome, VenueError> {
        // Paper takers fill instantly; there is never anything to cancel.
        Ok(CancelOutcome::TooLate)
    }

    fn fills(&self) -> broadcast::Receiver<Fill> {
        self.fills_tx.subscribe()
    }

    fn venue(&self) -> &VenueId {
        &self.venue
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::domain::{BookSnapshot, MarketRef, PriceLevel};
    use rust_decimal_macros::dec;

    fn setup() -> (Arc<BookCache>, Arc<VenueHealthBoard>, PaperGateway) {
        let books = Arc::new(BookCache::new());
        let health = Arc::new(VenueHealthBoard::new());
        let gateway = PaperGateway::new(
            "alpha",
            Arc::clone(&books),
            Arc::clone(&health),
            dec!(0),
        );
        (books, health, gateway)
    }

    fn seed_book(books: &BookCache) {
        let now = Utc::now();
        books.update(BookSnapshot::new(
            MarketRef::new("alpha", "mkt-1"),
            now,
            now,
            vec![PriceLevel::new(dec!(47), 100)],
            vec![PriceLevel::new(dec!(49), 100)],
            1,
        ));
    }

    fn intent(side: Side, limit: Cents, qty: u64) -> OrderIntent {
        let now = Utc::now();
        OrderIntent::new(
            MarketRef::new("alpha", "mkt-1"),
            side,
            limit,
            qty,
            now,
            now + chrono::Duration::milliseconds(250),
        )
    }

    #[tokio::test]
    async fn test_fills_against_asks() {
        let (books, _health, gateway) = setup();
        seed_book(&books);
        let mut fills = gateway.fills();

        let ack = gateway
            .place_taker(&intent(Side::BuyYes, dec!(49), 50))
            .await
            .unwrap();
        let fill = fills.recv().await.unwrap();
        assert_eq!(fill.order_id(), ack.venue_order_id());
        assert_eq!(fill.px(), dec!(49));
        assert_eq!(fill.qty(), 50);
    }

    #[tokio::test]
    async fn test_no_side_fills_against_bids() {
        let (books, _health, gateway) = setup();
        seed_book(&books);
        let mut fills = gateway.fills();

        gateway
            .place_taker(&intent(Side::BuyNo, dec!(53), 50))
            .await
            .unwrap();
        let fill = fills.recv().await.unwrap();
        assert_eq!(fill.px(), dec!(53));
    }

    #[tokio::test]
    async fn test_limit_below_market_rejects() {
        let (books, _health, gateway) = setup();
        seed_book(&books);
        let err = gateway
            .place_taker(&intent(Side::BuyYes, dec!(40), 50))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            VenueError::Rejected(OrderRejection::PriceOutsideBand)
        ));
    }

    #[tokio::test]
    async fn test_down_venue_refuses_orders() {
        let (books, health, gateway) = setup();
        seed_book(&books);
        health.mark_down(&VenueId::from("alpha"), "test");
        let err = gateway
            .place_taker(&intent(Side::BuyYes, dec!(49), 50))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            VenueError::Rejected(OrderRejection::Unavailable)
        ));
    }
}
