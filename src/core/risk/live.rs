//! Live hedge registry: at-most-one hedge per pair, bounded globally.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use tracing::debug;

use crate::core::domain::{IntentId, PairId};

/// Why a hedge slot could not be reserved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReserveError {
    /// The pair already has a live hedge.
    PairBusy,
    /// The global concurrent-hedge cap is reached.
    AtCapacity,
}

/// Registry of in-flight hedges.
///
/// Admission reserves a slot atomically; the execution engine releases it
/// at the terminal state. The reservation enforces risk predicates 3 and 4.
pub struct LiveHedges {
    by_pair: DashMap<PairId, IntentId>,
    count: AtomicUsize,
    max: usize,
}

impl LiveHedges {
    /// Create a registry with the global cap.
    #[must_use]
    pub fn new(max: usize) -> Self {
        Self {
            by_pair: DashMap::new(),
            count: AtomicUsize::new(0),
            max,
        }
    }

    /// Reserve the pair's slot. Fails when the pair is busy or the global
    /// cap is reached.
    pub fn reserve(&self, pair_id: &PairId, intent_id: &IntentId) -> Result<(), ReserveError> {
        // Optimistic global check first so a full book of hedges fails fast.
        if self.count.load(Ordering::SeqCst) >= self.max {
            return Err(ReserveError::AtCapacity);
        }
        match self.by_pair.entry(pair_id.clone()) {
            dashmap::mapref::entry::Entry::Occupied(_) => Err(ReserveError::PairBusy),
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                let reserved = self.count.fetch_add(1, Ordering::SeqCst);
                if reserved >= self.max {
                    self.count.fetch_sub(1, Ordering::SeqCst);
                    return Err(ReserveError::AtCapacity);
                }
                slot.insert(intent_id.clone());
                debug!(pair_id = %pair_id, intent_id = %intent_id, "Hedge slot reserved");
                Ok(())
            }
        }
    }

    /// Release the pair's slot at a terminal state.
    pub fn release(&self, pair_id: &PairId) {
        if self.by_pair.remove(pair_id).is_some() {
            self.count.fetch_sub(1, Ordering::SeqCst);
            debug!(pair_id = %pair_id, "Hedge slot released");
        }
    }

    /// Live hedge count.
    #[must_use]
    pub fn live(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }

    /// The configured global cap.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.max
    }

    /// True when the pair currently holds a live hedge.
    #[must_use]
    pub fn is_pair_live(&self, pair_id: &PairId) -> bool {
        self.by_pair.contains_key(pair_id)
    }

    /// Shared constructor convenience.
    #[must_use]
    pub fn shared(max: usize) -> Arc<Self> {
        Arc::new(Self::new(max))
    }
}
