//! Hedged execution: admitted intents, the position ledger, and the
//! two-leg state machine.

mod engine;
mod intent;
mod ledger;

pub use engine::{ExecutionEngine, ExecutionParams, HedgeState};
pub use intent::{ExecutionIntent, LegOrder};
pub use ledger::PositionLedger;
