//! Order lifecycle types: intents, acks, and fills.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::id::{IntentId, OrderId};
use super::market::{MarketRef, Side};
use super::money::Cents;

/// A taker order the engine intends to place on a venue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderIntent {
    intent_id: IntentId,
    market: MarketRef,
    side: Side,
    limit_px: Cents,
    qty: u64,
    created_at: DateTime<Utc>,
    deadline: DateTime<Utc>,
}

impl OrderIntent {
    /// Create a new order intent with a generated ID.
    #[must_use]
    pub fn new(
        market: MarketRef,
        side: Side,
        limit_px: Cents,
        qty: u64,
        created_at: DateTime<Utc>,
        deadline: DateTime<Utc>,
    ) -> Self {
        Self {
            intent_id: IntentId::from(Uuid::new_v4().to_string()),
            market,
            side,
            limit_px,
            qty,
            created_at,
            deadline,
        }
    }

    /// Get the intent ID.
    #[must_use]
    pub const fn intent_id(&self) -> &IntentId {
        &self.intent_id
    }

    /// Get the target market.
    #[must_use]
    pub const fn market(&self) -> &MarketRef {
        &self.market
    }

    /// Get the order side.
    #[must_use]
    pub const fn side(&self) -> Side {
        self.side
    }

    /// Worst acceptable price in cents.
    #[must_use]
    pub const fn limit_px(&self) -> Cents {
        self.limit_px
    }

    /// Size in contracts.
    #[must_use]
    pub const fn qty(&self) -> u64 {
        self.qty
    }

    /// Creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Hard deadline; the venue may not fill after this instant.
    #[must_use]
    pub const fn deadline(&self) -> DateTime<Utc> {
        self.deadline
    }
}

/// Venue acceptance of a taker order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderAck {
    intent_id: IntentId,
    venue_order_id: OrderId,
    accepted_at: DateTime<Utc>,
}

impl OrderAck {
    /// Create a new ack.
    #[must_use]
    pub fn new(
        intent_id: IntentId,
        venue_order_id: impl Into<OrderId>,
        accepted_at: DateTime<Utc>,
    ) -> Self {
        Self {
            intent_id,
            venue_order_id: venue_order_id.into(),
            accepted_at,
        }
    }

    /// The intent this ack answers.
    #[must_use]
    pub const fn intent_id(&self) -> &IntentId {
        &self.intent_id
    }

    /// The venue-assigned order ID.
    #[must_use]
    pub const fn venue_order_id(&self) -> &OrderId {
        &self.venue_order_id
    }

    /// Acceptance timestamp.
    #[must_use]
    pub const fn accepted_at(&self) -> DateTime<Utc> {
        self.accepted_at
    }
}

/// A (possibly partial) execution reported by a venue.
///
/// Fills carry no venue-side fill ID, so idempotence keys on the full
/// record: applying an identical fill twice is a no-op.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Fill {
    order_id: OrderId,
    px: Cents,
    qty: u64,
    ts: DateTime<Utc>,
    fee_paid: Cents,
}

impl Fill {
    /// Create a new fill record.
    #[must_use]
    pub fn new(
        order_id: impl Into<OrderId>,
        px: Cents,
        qty: u64,
        ts: DateTime<Utc>,
        fee_paid: Cents,
    ) -> Self {
        Self {
            order_id: order_id.into(),
            px,
            qty,
            ts,
            fee_paid,
        }
    }

    /// The order this fill belongs to.
    #[must_use]
    pub const fn order_id(&self) -> &OrderId {
        &self.order_id
    }

    /// Execution price in cents.
    #[must_use]
    pub const fn px(&self) -> Cents {
        self.px
    }

    /// Filled quantity in contracts.
    #[must_use]
    pub const fn qty(&self) -> u64 {
        self.qty
    }

    /// Venue timestamp of the fill.
    #[must_use]
    pub const fn ts(&self) -> DateTime<Utc> {
        self.ts
    }

    /// Fee charged for this fill, cents per contract.
    #[must_use]
    pub const fn fee_paid(&self) -> Cents {
        self.fee_paid
    }
}

/// Why a venue refused an order, reported synchronously and never retried.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderRejection {
    /// Account balance cannot cover the order.
    InsufficientBalance,
    /// Limit price outside the venue's allowed band.
    PriceOutsideBand,
    /// The market is halted on the venue.
    MarketHalted,
    /// The venue connection is down; no orders are accepted.
    Unavailable,
}

impl std::fmt::Display for OrderRejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InsufficientBalance => write!(f, "insufficient balance"),
            Self::PriceOutsideBand => write!(f, "price outside band"),
            Self::MarketHalted => write!(f, "market halted"),
            Self::Unavailable => write!(f, "venue unavailable"),
        }
    }
}

/// Result of a cancel request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelOutcome {
    /// The order was cancelled before (further) execution.
    Cancelled,
    /// The order already reached a terminal state.
    TooLate,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_intent_ids_are_unique() {
        let market = MarketRef::new("alpha", "mkt-1");
        let now = Utc::now();
        let a = OrderIntent::new(market.clone(), Side::BuyYes, dec!(48), 50, now, now);
        let b = OrderIntent::new(market, Side::BuyYes, dec!(48), 50, now, now);
        assert_ne!(a.intent_id(), b.intent_id());
    }

    #[test]
    fn test_identical_fills_compare_equal() {
        let ts = Utc::now();
        let a = Fill::new("ord-1", dec!(48), 50, ts, dec!(0.5));
        let b = Fill::new("ord-1", dec!(48), 50, ts, dec!(0.5));
        assert_eq!(a, b);
    }
}
