//! Operator control surface.
//!
//! Chat bots, dashboards, and shells are external; they all speak to the
//! engine through this command channel.

use tokio::sync::mpsc;

use crate::core::domain::{PairId, VenueId};

/// Commands an operator may issue.
#[derive(Debug, Clone)]
pub enum OperatorCommand {
    /// Refuse new admissions for the venue and unwind its live hedges.
    Halt { venue: VenueId, who: String },
    /// Clear the halt iff the venue is healthy.
    Resume { venue: VenueId, who: String },
    /// Deactivate a pair. In-flight hedges complete or unwind on their own;
    /// only new admissions stop.
    DeactivatePair { pair_id: PairId, who: String },
}

/// Sender half handed to operator frontends.
#[derive(Clone)]
pub struct ControlHandle {
    tx: mpsc::Sender<OperatorCommand>,
}

impl ControlHandle {
    /// Request a venue halt.
    pub async fn halt(&self, venue: VenueId, who: impl Into<String>) {
        let _ = self
            .tx
            .send(OperatorCommand::Halt {
                venue,
                who: who.into(),
            })
            .await;
    }

    /// Request a venue resume.
    pub async fn resume(&self, venue: VenueId, who: impl Into<String>) {
        let _ = self
            .tx
            .send(OperatorCommand::Resume {
                venue,
                who: who.into(),
            })
            .await;
    }

    /// Request a pair deactivation.
    pub async fn deactivate_pair(&self, pair_id: PairId, who: impl Into<String>) {
        let _ = self
            .tx
            .send(OperatorCommand::DeactivatePair {
                pair_id,
                who: who.into(),
            })
            .await;
    }
}

/// Create the control channel: a handle for frontends and a receiver for
/// the orchestrator.
#[must_use]
pub fn control_channel(capacity: usize) -> (ControlHandle, mpsc::Receiver<OperatorCommand>) {
    let (tx, rx) = mpsc::channel(capacity);
    (ControlHandle { tx }, rx)
}
