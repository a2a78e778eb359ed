//! Time-weighted mid-price bars for lead-lag estimation.
//!
//! Each market keeps a bounded ring of closed bars plus one in-progress
//! accumulator. Ticks weight the previous mid by the time it was standing;
//! crossing a bar boundary closes the bar and opens a new one. Quiet bars
//! between ticks carry the last mid forward so both series stay aligned on
//! the fixed bar grid.

use std::collections::VecDeque;

use dashmap::DashMap;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use crate::core::domain::{Cents, MarketRef};

/// A closed bar: fixed-grid start timestamp and time-weighted mid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bar {
    /// Bar start, UTC milliseconds, a multiple of the bar duration.
    pub start_ms: i64,
    /// Time-weighted mid price in cents.
    pub mid: Cents,
}

#[derive(Debug, Clone)]
struct BarAccum {
    start_ms: i64,
    first_ts_ms: i64,
    last_ts_ms: i64,
    last_mid: Cents,
    weighted_sum: Decimal,
}

impl BarAccum {
    fn open(start_ms: i64, ts_ms: i64, mid: Cents) -> Self {
        Self {
            start_ms,
            first_ts_ms: ts_ms,
            last_ts_ms: ts_ms,
            last_mid: mid,
            weighted_sum: Decimal::ZERO,
        }
    }

    fn absorb(&mut self, ts_ms: i64, mid: Cents) {
        let dt = ts_ms - self.last_ts_ms;
        if dt > 0 {
            self.weighted_sum += self.last_mid * Decimal::from(dt);
            self.last_ts_ms = ts_ms;
        }
        self.last_mid = mid;
    }

    fn close(&self, end_ms: i64) -> Bar {
        let tail = end_ms - self.last_ts_ms;
        let covered = end_ms - self.first_ts_ms;
        let mid = if covered > 0 {
            (self.weighted_sum + self.last_mid * Decimal::from(tail)) / Decimal::from(covered)
        } else {
            self.last_mid
        };
        Bar {
            start_ms: self.start_ms,
            mid,
        }
    }
}

/// Ring of closed bars for one market.
#[derive(Debug)]
pub struct BarSeries {
    duration_ms: i64,
    capacity: usize,
    closed: VecDeque<Bar>,
    current: Option<BarAccum>,
}

impl BarSeries {
    /// Create a series with the given bar duration and retention.
    #[must_use]
    pub fn new(duration_ms: u64, capacity: usize) -> Self {
        Self {
            duration_ms: duration_ms as i64,
            capacity,
            closed: VecDeque::with_capacity(capacity + 1),
            current: None,
        }
    }

    fn bar_start(&self, ts_ms: i64) -> i64 {
        ts_ms - ts_ms.rem_euclid(self.duration_ms)
    }

    /// Feed one mid observation. Returns bars closed by this tick (possibly
    /// several when the feed was quiet across bar boundaries).
    pub fn tick(&mut self, ts_ms: i64, mid: Cents) -> Vec<Bar> {
        let start = self.bar_start(ts_ms);
        let mut newly_closed = Vec::new();

        match self.current.take() {
            None => {
                self.current = Some(BarAccum::open(start, ts_ms, mid));
            }
            Some(mut accum) => {
                if start == accum.start_ms {
                    accum.absorb(ts_ms, mid);
                    self.current = Some(accum);
                } else if start > accum.start_ms {
                    // Close the standing bar at its boundary.
                    let end = accum.start_ms + self.duration_ms;
                    let bar = accum.close(end);
                    let carry = bar.mid;
                    newly_closed.push(bar);

                    // Quiet bars between: carry the last mid forward.
                    let mut cursor = end;
                    while cursor < start {
                        newly_closed.push(Bar {
                            start_ms: cursor,
                            mid: carry,
                        });
                        cursor += self.duration_ms;
                    }

                    self.current = Some(BarAccum::open(start, ts_ms, mid));
                } else {
                    // Out-of-order tick behind the open bar; ignore it.
                    self.current = Some(accum);
                }
            }
        }

        for bar in &newly_closed {
            self.closed.push_back(*bar);
        }
        while self.closed.len() > self.capacity {
            self.closed.pop_front();
        }
        newly_closed
    }

    /// The most recent closed bars, oldest first, capped at `n`.
    #[must_use]
    pub fn recent(&self, n: usize) -> Vec<Bar> {
        let skip = self.closed.len().saturating_sub(n);
        self.closed.iter().skip(skip).copied().collect()
    }

    /// Closed bar count.
    #[must_use]
    pub fn len(&self) -> usize {
        self.closed.len()
    }

    /// Returns true when no bar has closed yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.closed.is_empty()
    }
}

/// Aligned `(start_ms, mid)` observations for cross-correlation.
#[must_use]
pub fn to_f64_series(bars: &[Bar]) -> Vec<(i64, f64)> {
    bars.iter()
        .map(|bar| (bar.start_ms, bar.mid.to_f64().unwrap_or(f64::NAN)))
        .collect()
}

/// Per-market bar series store.
///
/// Writes come from the orchestrator's event task only (single writer);
/// the lead-lag worker reads closed bars.
pub struct BarStore {
    series: DashMap<MarketRef, BarSeries>,
    duration_ms: u64,
    capacity: usize,
}

impl BarStore {
    /// Create a store producing bars of `duration_ms`, retaining `capacity`
    /// closed bars per market.
    #[must_use]
    pub fn new(duration_ms: u64, capacity: usize) -> Self {
        Self {
            series: DashMap::new(),
            duration_ms,
            capacity,
        }
    }

    /// Feed a mid observation for a market; returns bars this tick closed.
    pub fn on_tick(&self, market: &MarketRef, ts_ms: i64, mid: Cents) -> Vec<Bar> {
        self.series
            .entry(market.clone())
            .or_insert_with(|| BarSeries::new(self.duration_ms, self.capacity))
            .tick(ts_ms, mid)
    }

    /// The most recent closed bars for a market, oldest first.
    #[must_use]
    pub fn recent(&self, market: &MarketRef, n: usize) -> Vec<Bar> {
        self.series
            .get(market)
            .map(|series| series.recent(n))
            .unwrap_or_default()
    }

    /// Bar duration in milliseconds.
    #[must_use]
    pub const fn duration_ms(&self) -> u64 {
        self.duration_ms
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_single_bar_time_weighted_mid() {
        let mut series = BarSeries::new(5_000, 10);
        // Mid 40 stands for 2.5s, mid 60 for the rest of the bar.
        assert!(series.tick(0, dec!(40)).is_empty());
        assert!(series.tick(2_500, dec!(60)).is_empty());
        let closed = series.tick(5_000, dec!(60));
        assert_eq!(closed.len(), 1);
        assert_eq!(closed[0].start_ms, 0);
        assert_eq!(closed[0].mid, dec!(50));
    }

    #[test]
    fn test_quiet_bars_carry_last_mid() {
        let mut series = BarSeries::new(5_000, 10);
        series.tick(0, dec!(42));
        // Next tick lands three bars later.
        let closed = series.tick(15_000, dec!(44));
        assert_eq!(closed.len(), 3);
        assert!(closed.iter().all(|bar| bar.mid == dec!(42)));
        assert_eq!(closed[2].start_ms, 10_000);
    }

    #[test]
    fn test_ring_retention() {
        let mut series = BarSeries::new(1_000, 3);
        for i in 0..10 {
            series.tick(i * 1_000, dec!(50));
        }
        assert_eq!(series.len(), 3);
        let recent = series.recent(3);
        assert_eq!(recent[0].start_ms, 6_000);
    }

    #[test]
    fn test_out_of_order_tick_ignored() {
        let mut series = BarSeries::new(5_000, 10);
        series.tick(6_000, dec!(50));
        let closed = series.tick(1_000, dec!(99));
        assert!(closed.is_empty());
        let closed = series.tick(10_000, dec!(50));
        assert_eq!(closed.len(), 1);
        assert_eq!(closed[0].mid, dec!(50));
    }

    #[test]
    fn test_store_per_market_isolation() {
        let store = BarStore::new(5_000, 10);
        let a = MarketRef::new("alpha", "mkt-a");
        let b = MarketRef::new("beta", "mkt-b");
        store.on_tick(&a, 0, dec!(40));
        store.on_tick(&a, 5_000, dec!(40));
        store.on_tick(&b, 0, dec!(60));
        assert_eq!(store.recent(&a, 10).len(), 1);
        assert!(store.recent(&b, 10).is_empty());
    }
}
