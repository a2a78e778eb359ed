//! Builders for domain primitives used across tests.

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::core::domain::{
    BookSnapshot, Cents, FeePack, Frictions, Market, MarketRef, Pair, PriceLevel, RoundingRule,
};

/// The canonical test pair: `alpha/mkt-a` vs `beta/mkt-b`.
#[must_use]
pub fn test_pair() -> Pair {
    Pair::new(
        "p-1",
        MarketRef::new("alpha", "mkt-a"),
        MarketRef::new("beta", "mkt-b"),
        dec!(0.95),
        true,
        dec!(0.92),
    )
    .unwrap()
}

/// A binary market record for ingestion tests.
#[must_use]
pub fn test_market(venue: &str, market_id: &str) -> Market {
    Market::new(
        MarketRef::new(venue, market_id),
        market_id.to_uppercase(),
        Utc::now() + Duration::hours(6),
        "test",
        true,
        dec!(1),
        1,
    )
}

/// Build a snapshot with the given levels, received `age_ms` in the past.
#[must_use]
pub fn snapshot_at(
    market: MarketRef,
    bids: &[(Cents, u64)],
    asks: &[(Cents, u64)],
    seq: u64,
    received_at: DateTime<Utc>,
) -> BookSnapshot {
    BookSnapshot::new(
        market,
        received_at,
        received_at,
        bids.iter()
            .map(|(px, size)| PriceLevel::new(*px, *size))
            .collect(),
        asks.iter()
            .map(|(px, size)| PriceLevel::new(*px, *size))
            .collect(),
        seq,
    )
}

/// Build a fresh snapshot (received now).
#[must_use]
pub fn snapshot(
    market: MarketRef,
    bids: &[(Cents, u64)],
    asks: &[(Cents, u64)],
    seq: u64,
) -> BookSnapshot {
    snapshot_at(market, bids, asks, seq, Utc::now())
}

/// A fee pack with only a taker fee, half-up rounding, no frictions.
#[must_use]
pub fn taker_only_pack(venue: &str, taker_bps: Decimal) -> FeePack {
    FeePack::new(
        venue,
        taker_bps,
        dec!(0),
        dec!(0),
        RoundingRule::HalfUp,
        Frictions::default(),
    )
}

/// The S1 book shapes: YES on alpha at 48, NO on beta at 49 cents
/// (quoted as a YES bid of 51), 100 contracts deep on each.
#[must_use]
pub fn s1_books(seq: u64) -> (BookSnapshot, BookSnapshot) {
    let book_a = snapshot(
        MarketRef::new("alpha", "mkt-a"),
        &[(dec!(46), 100)],
        &[(dec!(48), 100)],
        seq,
    );
    let book_b = snapshot(
        MarketRef::new("beta", "mkt-b"),
        &[(dec!(51), 100)],
        &[(dec!(53), 100)],
        seq,
    );
    (book_a, book_b)
}
