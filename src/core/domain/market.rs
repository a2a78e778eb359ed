//! Market domain types with proper encapsulation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::id::{MarketId, VenueId};
use super::money::Cents;

/// A `(venue, market)` reference, the market key used throughout the engine.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MarketRef {
    venue: VenueId,
    market_id: MarketId,
}

impl MarketRef {
    /// Create a new market reference.
    pub fn new(venue: impl Into<VenueId>, market_id: impl Into<MarketId>) -> Self {
        Self {
            venue: venue.into(),
            market_id: market_id.into(),
        }
    }

    /// Get the venue.
    #[must_use]
    pub const fn venue(&self) -> &VenueId {
        &self.venue
    }

    /// Get the market ID.
    #[must_use]
    pub const fn market_id(&self) -> &MarketId {
        &self.market_id
    }
}

impl std::fmt::Display for MarketRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.venue, self.market_id)
    }
}

/// A tradable market on one venue.
#[derive(Debug, Clone)]
pub struct Market {
    market: MarketRef,
    symbol: String,
    close_time: DateTime<Utc>,
    resolution_source: String,
    binary: bool,
    tick_cents: Cents,
    lot_size: u64,
}

impl Market {
    /// Create a new market.
    pub fn new(
        market: MarketRef,
        symbol: impl Into<String>,
        close_time: DateTime<Utc>,
        resolution_source: impl Into<String>,
        binary: bool,
        tick_cents: Cents,
        lot_size: u64,
    ) -> Self {
        Self {
            market,
            symbol: symbol.into(),
            close_time,
            resolution_source: resolution_source.into(),
            binary,
            tick_cents,
            lot_size,
        }
    }

    /// Get the market reference.
    #[must_use]
    pub const fn market_ref(&self) -> &MarketRef {
        &self.market
    }

    /// Get the venue symbol.
    #[must_use]
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// Get the scheduled close time.
    #[must_use]
    pub const fn close_time(&self) -> DateTime<Utc> {
        self.close_time
    }

    /// Get the resolution source description.
    #[must_use]
    pub fn resolution_source(&self) -> &str {
        &self.resolution_source
    }

    /// Check if this is a binary (YES/NO) market.
    #[must_use]
    pub const fn is_binary(&self) -> bool {
        self.binary
    }

    /// Get the minimum tick in cents.
    #[must_use]
    pub const fn tick_cents(&self) -> Cents {
        self.tick_cents
    }

    /// Get the lot size in contracts.
    #[must_use]
    pub const fn lot_size(&self) -> u64 {
        self.lot_size
    }

    /// True when the market has not yet closed at `now`.
    #[must_use]
    pub fn is_open(&self, now: DateTime<Utc>) -> bool {
        now < self.close_time
    }
}

/// Order side for a binary market taker order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    /// Buy the YES outcome.
    BuyYes,
    /// Buy the NO outcome.
    BuyNo,
}

impl Side {
    /// The side that offsets a position taken on this side.
    #[must_use]
    pub const fn offsetting(self) -> Self {
        match self {
            Self::BuyYes => Self::BuyNo,
            Self::BuyNo => Self::BuyYes,
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BuyYes => write!(f, "buy_yes"),
            Self::BuyNo => write!(f, "buy_no"),
        }
    }
}
