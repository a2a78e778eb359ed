//! Admitted execution intents.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::domain::{Cents, IntentId, MarketRef, Package, PairId, Side};

/// One leg of an admitted hedge, in execution order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LegOrder {
    market: MarketRef,
    side: Side,
    limit_px: Cents,
    expected_px: Cents,
}

impl LegOrder {
    /// Create a leg order. `expected_px` is the depth-walk vwap the edge
    /// was priced at; realised slippage is measured against it.
    #[must_use]
    pub const fn new(market: MarketRef, side: Side, limit_px: Cents, expected_px: Cents) -> Self {
        Self {
            market,
            side,
            limit_px,
            expected_px,
        }
    }

    /// The market this leg trades.
    #[must_use]
    pub const fn market(&self) -> &MarketRef {
        &self.market
    }

    /// The side this leg takes.
    #[must_use]
    pub const fn side(&self) -> Side {
        self.side
    }

    /// Worst acceptable price, cents.
    #[must_use]
    pub const fn limit_px(&self) -> Cents {
        self.limit_px
    }

    /// Expected size-weighted fill price at admission, cents.
    #[must_use]
    pub const fn expected_px(&self) -> Cents {
        self.expected_px
    }
}

/// A risk-admitted hedge: the winning package with per-leg limit prices and
/// the leader-derived leg order, bounded by a hard deadline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionIntent {
    intent_id: IntentId,
    pair_id: PairId,
    package: Package,
    qty: u64,
    /// Primary (leader) leg first, hedge leg second.
    legs: [LegOrder; 2],
    net_edge_cents: Cents,
    fee_version_hash: String,
    created_at: DateTime<Utc>,
    deadline: DateTime<Utc>,
}

impl ExecutionIntent {
    /// Create an intent with a generated ID.
    #[must_use]
    pub fn new(
        pair_id: PairId,
        package: Package,
        qty: u64,
        primary: LegOrder,
        hedge: LegOrder,
        net_edge_cents: Cents,
        fee_version_hash: impl Into<String>,
        created_at: DateTime<Utc>,
        deadline: DateTime<Utc>,
    ) -> Self {
        Self {
            intent_id: IntentId::from(Uuid::new_v4().to_string()),
            pair_id,
            package,
            qty,
            legs: [primary, hedge],
            net_edge_cents,
            fee_version_hash: fee_version_hash.into(),
            created_at,
            deadline,
        }
    }

    /// Get the intent ID.
    #[must_use]
    pub const fn intent_id(&self) -> &IntentId {
        &self.intent_id
    }

    /// Get the pair this intent trades.
    #[must_use]
    pub const fn pair_id(&self) -> &PairId {
        &self.pair_id
    }

    /// The admitted package direction.
    #[must_use]
    pub const fn package(&self) -> Package {
        self.package
    }

    /// Size in contracts, identical on both legs.
    #[must_use]
    pub const fn qty(&self) -> u64 {
        self.qty
    }

    /// The leg to place first.
    #[must_use]
    pub const fn primary(&self) -> &LegOrder {
        &self.legs[0]
    }

    /// The leg to place immediately after the primary acks.
    #[must_use]
    pub const fn hedge(&self) -> &LegOrder {
        &self.legs[1]
    }

    /// Net edge at admission, cents per contract.
    #[must_use]
    pub const fn net_edge_cents(&self) -> Cents {
        self.net_edge_cents
    }

    /// Fee schedule version the edge was computed under.
    #[must_use]
    pub fn fee_version_hash(&self) -> &str {
        &self.fee_version_hash
    }

    /// Admission timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Hard hedge deadline.
    #[must_use]
    pub const fn deadline(&self) -> DateTime<Utc> {
        self.deadline
    }

    /// True when the given venue carries one of the intent's legs.
    #[must_use]
    pub fn touches_venue(&self, venue: &crate::core::domain::VenueId) -> bool {
        self.legs.iter().any(|leg| leg.market().venue() == venue)
    }
}
