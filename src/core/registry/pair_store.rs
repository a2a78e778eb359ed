//! Active pair catalogue with copy-on-write snapshots.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use rust_decimal::Decimal;
use tracing::{info, warn};

use crate::core::domain::{DomainError, Market, MarketRef, Pair, PairId};

/// An immutable view of the active pair catalogue.
#[derive(Debug, Default, Clone)]
pub struct PairSet {
    pairs: HashMap<PairId, Arc<Pair>>,
    by_market: HashMap<MarketRef, Vec<PairId>>,
}

impl PairSet {
    /// All pairs, active or not.
    pub fn pairs(&self) -> impl Iterator<Item = &Arc<Pair>> {
        self.pairs.values()
    }

    /// Active pairs only.
    pub fn active_pairs(&self) -> impl Iterator<Item = &Arc<Pair>> {
        self.pairs.values().filter(|p| p.is_active())
    }

    /// Look up a pair by ID.
    #[must_use]
    pub fn get(&self, pair_id: &PairId) -> Option<&Arc<Pair>> {
        self.pairs.get(pair_id)
    }

    /// Active pairs with a leg on the given market.
    pub fn pairs_for_market<'a>(
        &'a self,
        market: &'a MarketRef,
    ) -> impl Iterator<Item = &'a Arc<Pair>> + 'a {
        self.by_market
            .get(market)
            .into_iter()
            .flatten()
            .filter_map(|id| self.pairs.get(id))
            .filter(|p| p.is_active())
    }

    /// Every market referenced by any pair.
    #[must_use]
    pub fn markets(&self) -> Vec<MarketRef> {
        self.by_market.keys().cloned().collect()
    }

    /// Number of pairs held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// Returns true when no pairs are held.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

/// Owner of the pair catalogue.
///
/// Written only by the control plane (matcher ingestion, operator
/// deactivation); readers clone an `Arc<PairSet>` snapshot.
pub struct PairStore {
    inner: RwLock<Arc<PairSet>>,
    accept_score: Decimal,
}

impl PairStore {
    /// Create an empty store with the configured acceptance score.
    #[must_use]
    pub fn new(accept_score: Decimal) -> Self {
        Self {
            inner: RwLock::new(Arc::new(PairSet::default())),
            accept_score,
        }
    }

    /// Get a consistent snapshot for the duration of one computation.
    #[must_use]
    pub fn snapshot(&self) -> Arc<PairSet> {
        Arc::clone(&self.inner.read())
    }

    /// Ingest a pair published by the external matcher.
    ///
    /// Validates the pair invariants against the given market records: both
    /// markets binary, similarity at or above the acceptance score, hard
    /// rules passed.
    pub fn ingest(
        &self,
        pair_id: impl Into<PairId>,
        market_a: &Market,
        market_b: &Market,
        similarity: Decimal,
        rules_passed: bool,
    ) -> Result<(), DomainError> {
        for market in [market_a, market_b] {
            if !market.is_binary() {
                return Err(DomainError::NotBinary {
                    market: market.market_ref().to_string(),
                });
            }
        }
        let pair = Pair::new(
            pair_id,
            market_a.market_ref().clone(),
            market_b.market_ref().clone(),
            similarity,
            rules_passed,
            self.accept_score,
        )?;
        info!(pair_id = %pair.pair_id(), similarity = %similarity, "Pair ingested");
        self.mutate(|set| {
            for market in [pair.market_a().clone(), pair.market_b().clone()] {
                let ids = set.by_market.entry(market).or_default();
                if !ids.contains(pair.pair_id()) {
                    ids.push(pair.pair_id().clone());
                }
            }
            set.pairs
                .insert(pair.pair_id().clone(), Arc::new(pair.clone()));
        });
        Ok(())
    }

    /// Flip a pair's activation flag. Deactivation never cancels an
    /// in-flight hedge; it only stops new admissions.
    pub fn set_pair_active(&self, pair_id: &PairId, active: bool) -> bool {
        let mut found = false;
        self.mutate(|set| {
            if let Some(existing) = set.pairs.get(pair_id) {
                let mut pair = Pair::clone(existing);
                pair.set_active(active);
                set.pairs.insert(pair_id.clone(), Arc::new(pair));
                found = true;
            }
        });
        if found {
            info!(pair_id = %pair_id, active, "Pair activation changed");
        } else {
            warn!(pair_id = %pair_id, "Activation change for unknown pair");
        }
        found
    }

    fn mutate(&self, f: impl FnOnce(&mut PairSet)) {
        let mut guard = self.inner.write();
        let mut next = PairSet::clone(&guard);
        f(&mut next);
        *guard = Arc::new(next);
    }
}
