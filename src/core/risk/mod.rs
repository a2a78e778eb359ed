//! Risk/admission control.
//!
//! The controller gates every edge quote against live state: venue health,
//! feed freshness, hedge concurrency, exposure caps, drawdown stops, and
//! hedge completion probability. Execution publishes position deltas; risk
//! maintains its own [`ExposureView`] from them so the data flow between
//! the two stays unidirectional.

mod controller;
mod exposure;
mod hedge_stats;
mod live;
mod pnl;

pub use controller::{RejectReason, RiskController, RiskParams};
pub use exposure::{spawn_exposure_task, ExposureView};
pub use hedge_stats::HedgeStats;
pub use live::{LiveHedges, ReserveError};
pub use pnl::{PnlTracker, StopLimits, StopWindow};
