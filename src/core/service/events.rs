//! Structured events published on the observability bus.
//!
//! Events are self-describing serde records with stable field names; the
//! envelope carries a schema version for downstream consumers.

use serde::{Deserialize, Serialize};

use crate::core::domain::{
    Cents, EdgeQuote, IntentId, MarketRef, PairId, PositionDelta, Side, TradeRecord, VenueId,
};
use crate::core::execution::{ExecutionIntent, HedgeState};

/// Current event schema version.
pub const EVENT_SCHEMA_VERSION: u32 = 1;

/// Everything observable about the trading loop.
///
/// Every state transition in the system publishes exactly one of these;
/// no error is silent.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// The signal engine produced an edge quote.
    EdgeComputed { quote: EdgeQuote },
    /// The signal engine refused to quote a pair.
    EdgeRejected { pair_id: PairId, reason: String },
    /// Risk admitted an intent.
    IntentAdmitted { intent: ExecutionIntent },
    /// Risk rejected a quote.
    IntentRejected { pair_id: PairId, reason: String },
    /// The hedge state machine moved.
    HedgeStateChanged {
        intent_id: IntentId,
        pair_id: PairId,
        state: HedgeState,
    },
    /// A leg received a fill.
    LegFilled {
        intent_id: IntentId,
        market: MarketRef,
        side: Side,
        px: Cents,
        qty: u64,
    },
    /// A hedge committed both legs.
    TradeSettled { record: TradeRecord },
    /// A hedge unwound back to flat.
    TradeUnwound { record: TradeRecord },
    /// A hedge failed; non-zero residual means leg risk.
    TradeFailed { record: TradeRecord },
    /// A venue's feed went down.
    VenueDown { venue: VenueId, reason: String },
    /// A venue's feed recovered.
    VenueUp { venue: VenueId },
    /// An operator requested a halt.
    HaltRequested { venue: VenueId, who: String },
    /// An operator requested a resume.
    ResumeRequested { venue: VenueId, who: String },
    /// A pair was deactivated by the control plane.
    PairDeactivated { pair_id: PairId, who: String },
    /// Execution applied a fill to the position ledger.
    PositionChanged { delta: PositionDelta },
}

impl Event {
    /// Short label for logging and metrics.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::EdgeComputed { .. } => "edge_computed",
            Self::EdgeRejected { .. } => "edge_rejected",
            Self::IntentAdmitted { .. } => "intent_admitted",
            Self::IntentRejected { .. } => "intent_rejected",
            Self::HedgeStateChanged { .. } => "hedge_state_changed",
            Self::LegFilled { .. } => "leg_filled",
            Self::TradeSettled { .. } => "trade_settled",
            Self::TradeUnwound { .. } => "trade_unwound",
            Self::TradeFailed { .. } => "trade_failed",
            Self::VenueDown { .. } => "venue_down",
            Self::VenueUp { .. } => "venue_up",
            Self::HaltRequested { .. } => "halt_requested",
            Self::ResumeRequested { .. } => "resume_requested",
            Self::PairDeactivated { .. } => "pair_deactivated",
            Self::PositionChanged { .. } => "position_changed",
        }
    }
}
