//! Thread-safe book snapshot cache with monotonic sequence enforcement.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use tracing::debug;

use crate::core::domain::{BookSnapshot, MarketRef};

/// Result of offering a snapshot to the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// The snapshot is newer than the stored one and was stored.
    Stored,
    /// The snapshot's sequence number is not newer; it was dropped.
    StaleDropped,
}

/// Per-market most-recent snapshot cache.
///
/// Each market cell has exactly one writer (its adapter's reader task); all
/// other code reads a consistent `Arc<BookSnapshot>`.
pub struct BookCache {
    books: RwLock<HashMap<MarketRef, Arc<BookSnapshot>>>,
    stale_drops: AtomicU64,
}

impl BookCache {
    /// Create an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self {
            books: RwLock::new(HashMap::new()),
            stale_drops: AtomicU64::new(0),
        }
    }

    /// Offer a snapshot. Snapshots whose sequence number does not advance
    /// the stored one are dropped and counted.
    pub fn update(&self, snapshot: BookSnapshot) -> UpdateOutcome {
        let market = snapshot.market().clone();
        let mut books = self.books.write();
        if let Some(existing) = books.get(&market) {
            if snapshot.sequence_no() <= existing.sequence_no() {
                let stored_seq = existing.sequence_no();
                drop(books);
                self.stale_drops.fetch_add(1, Ordering::Relaxed);
                debug!(
                    market = %market,
                    seq = snapshot.sequence_no(),
                    stored_seq = stored_seq,
                    "Dropped stale snapshot"
                );
                return UpdateOutcome::StaleDropped;
            }
        }
        books.insert(market, Arc::new(snapshot));
        UpdateOutcome::Stored
    }

    /// Get the latest snapshot for a market.
    #[must_use]
    pub fn get(&self, market: &MarketRef) -> Option<Arc<BookSnapshot>> {
        self.books.read().get(market).cloned()
    }

    /// Get snapshots of both legs of a pair atomically.
    #[must_use]
    pub fn get_pair(
        &self,
        market_a: &MarketRef,
        market_b: &MarketRef,
    ) -> (Option<Arc<BookSnapshot>>, Option<Arc<BookSnapshot>>) {
        let books = self.books.read();
        (books.get(market_a).cloned(), books.get(market_b).cloned())
    }

    /// Latest mid price for a market, when both sides are quoted.
    #[must_use]
    pub fn mid(&self, market: &MarketRef) -> Option<crate::core::domain::Cents> {
        self.get(market).and_then(|book| book.mid())
    }

    /// True when the market's latest snapshot arrived within `budget_ms`
    /// of `now`.
    #[must_use]
    pub fn is_fresh(&self, market: &MarketRef, now: DateTime<Utc>, budget_ms: u64) -> bool {
        self.get(market)
            .is_some_and(|book| book.is_fresh(now, budget_ms))
    }

    /// Snapshots dropped for stale sequence numbers since startup.
    #[must_use]
    pub fn stale_drops(&self) -> u64 {
        self.stale_drops.load(Ordering::Relaxed)
    }

    /// Number of markets with a cached snapshot.
    #[must_use]
    pub fn len(&self) -> usize {
        self.books.read().len()
    }

    /// Returns true if the cache is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for BookCache {
    fn default() -> Self {
        Self::new()
    }
}
