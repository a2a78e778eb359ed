//! Position ledger: the single writer of positions.
//!
//! Only the execution engine mutates positions, and only on confirmed
//! fills. Every applied fill yields a [`PositionDelta`] for the bus; risk
//! builds its exposure view from those, never from the ledger itself.

use std::collections::{HashMap, HashSet};

use parking_lot::RwLock;
use tracing::debug;

use crate::core::domain::{Fill, MarketRef, Position, PositionDelta, Side};

/// Owner of all per-market positions.
pub struct PositionLedger {
    positions: RwLock<HashMap<MarketRef, Position>>,
    seen: RwLock<HashSet<Fill>>,
}

impl PositionLedger {
    /// Create an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self {
            positions: RwLock::new(HashMap::new()),
            seen: RwLock::new(HashSet::new()),
        }
    }

    /// Apply a confirmed fill.
    ///
    /// Fills are idempotent: re-applying an identical fill record returns
    /// `None` and changes nothing.
    pub fn apply_fill(&self, market: &MarketRef, side: Side, fill: &Fill) -> Option<PositionDelta> {
        {
            let mut seen = self.seen.write();
            if !seen.insert(fill.clone()) {
                debug!(order_id = %fill.order_id(), "Duplicate fill ignored");
                return None;
            }
        }

        let mut positions = self.positions.write();
        positions
            .entry(market.clone())
            .or_default()
            .apply(side, fill.px(), fill.qty());

        Some(PositionDelta::new(
            market.clone(),
            side,
            fill.px(),
            fill.qty(),
        ))
    }

    /// Current position for a market.
    #[must_use]
    pub fn position(&self, market: &MarketRef) -> Position {
        self.positions
            .read()
            .get(market)
            .cloned()
            .unwrap_or_default()
    }

    /// Point-in-time snapshot of all positions, for persistence.
    #[must_use]
    pub fn snapshot(&self) -> Vec<(MarketRef, Position)> {
        self.positions
            .read()
            .iter()
            .map(|(market, position)| (market.clone(), position.clone()))
            .collect()
    }
}

impl Default for PositionLedger {
    fn default() -> Self {
        Self::new()
    }
}
