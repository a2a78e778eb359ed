//! Trade records: the terminal account of one hedge attempt.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::edge::Package;
use super::id::{IntentId, PairId};
use super::money::Cents;
use super::order::OrderIntent;

/// How a hedge attempt ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TradeOutcome {
    /// Both legs filled fully; the edge is banked.
    Committed,
    /// Residual exposure was liquidated back to flat.
    Unwound,
    /// The attempt failed; a non-zero residual means leg risk.
    Failed,
}

impl std::fmt::Display for TradeOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Committed => write!(f, "committed"),
            Self::Unwound => write!(f, "unwound"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Why an unwind was entered, recorded for the trade record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnwindReason {
    /// The hedge deadline elapsed before both legs filled.
    Timeout,
    /// The hedge leg was rejected after the primary was placed.
    HedgeRejected,
    /// The unfilled leg's mid moved against us past the threshold.
    AdverseMove,
    /// An operator halted the venue mid-flight.
    OperatorHalt,
}

impl std::fmt::Display for UnwindReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Timeout => write!(f, "timeout"),
            Self::HedgeRejected => write!(f, "hedge_rejected"),
            Self::AdverseMove => write!(f, "adverse_move"),
            Self::OperatorHalt => write!(f, "operator_halt"),
        }
    }
}

/// Terminal status of one leg.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LegStatus {
    /// Fully filled at or better than the limit.
    Filled,
    /// Filled for fewer contracts than intended.
    PartiallyFilled { filled: u64 },
    /// Refused by the venue.
    Rejected,
    /// Cancelled before any fill.
    Cancelled,
    /// Never placed.
    NotPlaced,
}

/// The durable account of one hedge attempt, appended to the trade store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeRecord {
    /// Record schema version for downstream consumers.
    pub schema_version: u32,
    pub intent_id: IntentId,
    pub pair_id: PairId,
    pub package: Package,
    pub primary: OrderIntent,
    pub hedge: OrderIntent,
    pub primary_status: LegStatus,
    pub hedge_status: LegStatus,
    pub realised_edge_cents: Cents,
    pub slippage_cents: Cents,
    pub fee_version_hash: String,
    pub outcome: TradeOutcome,
    pub unwind_reason: Option<UnwindReason>,
    /// Contracts of unhedged exposure remaining at the terminal state.
    pub residual_contracts: i64,
    pub opened_at: DateTime<Utc>,
    pub closed_at: DateTime<Utc>,
}

impl TradeRecord {
    /// Current schema version written by this build.
    pub const SCHEMA_VERSION: u32 = 1;

    /// True when the record left no directional exposure behind.
    #[must_use]
    pub fn is_flat(&self) -> bool {
        self.residual_contracts.abs() <= 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::domain::{MarketRef, Side};
    use rust_decimal_macros::dec;

    fn record(outcome: TradeOutcome, residual: i64) -> TradeRecord {
        let now = Utc::now();
        let market = MarketRef::new("alpha", "mkt-1");
        let intent = OrderIntent::new(market, Side::BuyYes, dec!(48), 50, now, now);
        TradeRecord {
            schema_version: TradeRecord::SCHEMA_VERSION,
            intent_id: intent.intent_id().clone(),
            pair_id: PairId::from("p-1"),
            package: Package::AYesBNo,
            primary: intent.clone(),
            hedge: intent,
            primary_status: LegStatus::Filled,
            hedge_status: LegStatus::Filled,
            realised_edge_cents: dec!(2),
            slippage_cents: dec!(0),
            fee_version_hash: "abc".into(),
            outcome,
            unwind_reason: None,
            residual_contracts: residual,
            opened_at: now,
            closed_at: now,
        }
    }

    #[test]
    fn test_flatness_tolerates_one_lot() {
        assert!(record(TradeOutcome::Committed, 0).is_flat());
        assert!(record(TradeOutcome::Unwound, 1).is_flat());
        assert!(!record(TradeOutcome::Failed, 5).is_flat());
    }
}
