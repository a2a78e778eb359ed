//! Signal engine: edge pricing and lead-lag routing hints.

mod depth;
mod engine;
mod leadlag;

pub use depth::{walk_no, walk_yes, DepthQuote};
pub use engine::{EdgeComputation, EdgeRejection, LegPlan, SignalEngine, SignalParams};
pub use leadlag::{
    pearson, spawn_worker, BarClose, LeadLagParams, LeadLagTracker, LeaderHint,
};
