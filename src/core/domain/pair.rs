//! Cross-venue pair types.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::error::DomainError;
use super::id::PairId;
use super::market::MarketRef;

/// Two markets on different venues proven equivalent by the external matcher.
///
/// The pair is the unit of trading: YES on one market plus NO on the other
/// forms a fully hedged package.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pair {
    pair_id: PairId,
    market_a: MarketRef,
    market_b: MarketRef,
    similarity: Decimal,
    rules_passed: bool,
    active: bool,
}

impl Pair {
    /// Create a pair, validating the matcher's invariants.
    ///
    /// Both markets must sit on different venues, the similarity score must
    /// meet `accept_score`, and the hard-rule predicates must all have
    /// passed.
    pub fn new(
        pair_id: impl Into<PairId>,
        market_a: MarketRef,
        market_b: MarketRef,
        similarity: Decimal,
        rules_passed: bool,
        accept_score: Decimal,
    ) -> Result<Self, DomainError> {
        if market_a.venue() == market_b.venue() {
            return Err(DomainError::SameVenuePair {
                venue: market_a.venue().to_string(),
            });
        }
        if similarity < accept_score {
            return Err(DomainError::SimilarityBelowAcceptance {
                similarity,
                accept_score,
            });
        }
        if !rules_passed {
            return Err(DomainError::HardRulesFailed);
        }
        Ok(Self {
            pair_id: pair_id.into(),
            market_a,
            market_b,
            similarity,
            rules_passed,
            active: true,
        })
    }

    /// Get the pair ID.
    #[must_use]
    pub const fn pair_id(&self) -> &PairId {
        &self.pair_id
    }

    /// Get the venue-A market.
    #[must_use]
    pub const fn market_a(&self) -> &MarketRef {
        &self.market_a
    }

    /// Get the venue-B market.
    #[must_use]
    pub const fn market_b(&self) -> &MarketRef {
        &self.market_b
    }

    /// Get the matcher's similarity score.
    #[must_use]
    pub const fn similarity(&self) -> Decimal {
        self.similarity
    }

    /// True when the hard-rule predicates all passed at ingestion.
    #[must_use]
    pub const fn rules_passed(&self) -> bool {
        self.rules_passed
    }

    /// True when the pair is admissible for trading.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.active
    }

    /// Set the activation flag (control plane only).
    pub fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    /// True when the given market is one of the pair's legs.
    #[must_use]
    pub fn touches(&self, market: &MarketRef) -> bool {
        &self.market_a == market || &self.market_b == market
    }

    /// Given one leg of the pair, return the opposite leg.
    #[must_use]
    pub fn other_market(&self, market: &MarketRef) -> Option<&MarketRef> {
        if &self.market_a == market {
            Some(&self.market_b)
        } else if &self.market_b == market {
            Some(&self.market_a)
        } else {
            None
        }
    }
}
