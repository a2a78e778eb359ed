//! Normalised order book snapshot types.
//!
//! Books are quoted in YES terms: asks are offers to sell YES, bids are
//! offers to buy YES. Buying NO executes against the bids at `100 - bid`.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::market::MarketRef;
use super::money::{Cents, CONTRACT_PAYOUT_CENTS};

/// A single price level: price in cents, size in contracts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceLevel {
    price: Cents,
    size: u64,
}

impl PriceLevel {
    /// Create a new price level.
    #[must_use]
    pub const fn new(price: Cents, size: u64) -> Self {
        Self { price, size }
    }

    /// Get the price in cents.
    #[must_use]
    pub const fn price(&self) -> Cents {
        self.price
    }

    /// Get the size in contracts.
    #[must_use]
    pub const fn size(&self) -> u64 {
        self.size
    }
}

/// Most-recent normalised book state for one market.
///
/// Bids and asks are ordered best-first. `sequence_no` is monotonic per
/// market; the book cache drops snapshots that would move it backwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookSnapshot {
    market: MarketRef,
    received_at: DateTime<Utc>,
    venue_ts: DateTime<Utc>,
    bids: Vec<PriceLevel>,
    asks: Vec<PriceLevel>,
    sequence_no: u64,
}

impl BookSnapshot {
    /// Create a new snapshot. Levels must already be ordered best-first.
    #[must_use]
    pub const fn new(
        market: MarketRef,
        received_at: DateTime<Utc>,
        venue_ts: DateTime<Utc>,
        bids: Vec<PriceLevel>,
        asks: Vec<PriceLevel>,
        sequence_no: u64,
    ) -> Self {
        Self {
            market,
            received_at,
            venue_ts,
            bids,
            asks,
            sequence_no,
        }
    }

    /// Get the market reference.
    #[must_use]
    pub const fn market(&self) -> &MarketRef {
        &self.market
    }

    /// Local arrival timestamp.
    #[must_use]
    pub const fn received_at(&self) -> DateTime<Utc> {
        self.received_at
    }

    /// Venue-reported timestamp.
    #[must_use]
    pub const fn venue_ts(&self) -> DateTime<Utc> {
        self.venue_ts
    }

    /// All bid levels, best (highest) first.
    #[must_use]
    pub fn bids(&self) -> &[PriceLevel] {
        &self.bids
    }

    /// All ask levels, best (lowest) first.
    #[must_use]
    pub fn asks(&self) -> &[PriceLevel] {
        &self.asks
    }

    /// Monotonic sequence number.
    #[must_use]
    pub const fn sequence_no(&self) -> u64 {
        self.sequence_no
    }

    /// Best bid (highest buy price).
    #[must_use]
    pub fn best_bid(&self) -> Option<&PriceLevel> {
        self.bids.first()
    }

    /// Best ask (lowest sell price).
    #[must_use]
    pub fn best_ask(&self) -> Option<&PriceLevel> {
        self.asks.first()
    }

    /// Mid price in cents, when both sides are present.
    #[must_use]
    pub fn mid(&self) -> Option<Cents> {
        match (self.best_bid(), self.best_ask()) {
            (Some(bid), Some(ask)) => Some((bid.price() + ask.price()) / Cents::TWO),
            _ => None,
        }
    }

    /// Invariant check: `best_bid < best_ask` when both sides are present.
    #[must_use]
    pub fn is_coherent(&self) -> bool {
        match (self.best_bid(), self.best_ask()) {
            (Some(bid), Some(ask)) => bid.price() < ask.price(),
            _ => true,
        }
    }

    /// True when the snapshot arrived within `budget_ms` of `now`.
    #[must_use]
    pub fn is_fresh(&self, now: DateTime<Utc>, budget_ms: u64) -> bool {
        now - self.received_at <= Duration::milliseconds(budget_ms as i64)
    }

    /// Best executable NO price in cents (`100 - best_bid`), when bids exist.
    #[must_use]
    pub fn best_no_ask(&self) -> Option<Cents> {
        self.best_bid()
            .map(|bid| CONTRACT_PAYOUT_CENTS - bid.price())
    }
}
