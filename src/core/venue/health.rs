//! Venue health board: down flags, operator halts, freshness-gated recovery.

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use tracing::{info, warn};

use crate::core::domain::VenueId;

/// Health state of one venue.
#[derive(Debug, Clone, Default)]
pub struct VenueStatus {
    /// The feed is down or too stale to trust.
    pub down: bool,
    /// An operator halted the venue.
    pub halted: bool,
    /// Why the venue was last marked down.
    pub down_reason: Option<String>,
    /// Venue timestamp of the last accepted snapshot.
    pub last_venue_ts: Option<DateTime<Utc>>,
}

impl VenueStatus {
    /// True when the venue may receive new admissions.
    #[must_use]
    pub const fn is_tradable(&self) -> bool {
        !self.down && !self.halted
    }
}

/// Transition produced by observing a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthTransition {
    /// No flag changed.
    Unchanged,
    /// The down flag cleared.
    CameUp,
}

/// Single-writer health cells per venue, read by risk and the gateways.
///
/// The down flag clears only when a snapshot arrives whose venue timestamp
/// is within the freshness budget; a reconnect alone proves nothing.
#[derive(Default)]
pub struct VenueHealthBoard {
    cells: DashMap<VenueId, VenueStatus>,
}

impl VenueHealthBoard {
    /// Create an empty board.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current status for a venue (default healthy when never seen).
    #[must_use]
    pub fn status(&self, venue: &VenueId) -> VenueStatus {
        self.cells
            .get(venue)
            .map(|cell| cell.clone())
            .unwrap_or_default()
    }

    /// True when the venue is neither down nor halted.
    #[must_use]
    pub fn is_tradable(&self, venue: &VenueId) -> bool {
        self.status(venue).is_tradable()
    }

    /// True when the venue's feed is flagged down.
    #[must_use]
    pub fn is_down(&self, venue: &VenueId) -> bool {
        self.status(venue).down
    }

    /// True when an operator halted the venue.
    #[must_use]
    pub fn is_halted(&self, venue: &VenueId) -> bool {
        self.status(venue).halted
    }

    /// Flag the venue's feed down.
    pub fn mark_down(&self, venue: &VenueId, reason: impl Into<String>) {
        let reason = reason.into();
        warn!(venue = %venue, reason = %reason, "Venue marked down");
        let mut cell = self.cells.entry(venue.clone()).or_default();
        cell.down = true;
        cell.down_reason = Some(reason);
    }

    /// Observe an accepted snapshot. Clears the down flag only when the
    /// venue timestamp is within `freshness_budget_ms` of `now`.
    pub fn observe_snapshot(
        &self,
        venue: &VenueId,
        venue_ts: DateTime<Utc>,
        now: DateTime<Utc>,
        freshness_budget_ms: u64,
    ) -> HealthTransition {
        let mut cell = self.cells.entry(venue.clone()).or_default();
        cell.last_venue_ts = Some(venue_ts);
        let fresh = now - venue_ts <= Duration::milliseconds(freshness_budget_ms as i64);
        if cell.down && fresh {
            cell.down = false;
            cell.down_reason = None;
            info!(venue = %venue, "Venue back up");
            return HealthTransition::CameUp;
        }
        HealthTransition::Unchanged
    }

    /// Operator halt: refuse new admissions immediately.
    pub fn halt(&self, venue: &VenueId) {
        warn!(venue = %venue, "Venue halted by operator");
        self.cells.entry(venue.clone()).or_default().halted = true;
    }

    /// Operator resume. Clears the halt iff the venue's feed is healthy;
    /// returns whether the halt was lifted.
    pub fn resume(&self, venue: &VenueId) -> bool {
        let mut cell = self.cells.entry(venue.clone()).or_default();
        if cell.down {
            warn!(venue = %venue, "Resume refused, venue feed is down");
            return false;
        }
        cell.halted = false;
        info!(venue = %venue, "Venue resumed");
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn venue() -> VenueId {
        VenueId::from("alpha")
    }

    #[test]
    fn test_unknown_venue_defaults_healthy() {
        let board = VenueHealthBoard::new();
        assert!(board.is_tradable(&venue()));
    }

    #[test]
    fn test_down_flag_requires_fresh_snapshot_to_clear() {
        let board = VenueHealthBoard::new();
        board.mark_down(&venue(), "disconnect");
        assert!(board.is_down(&venue()));

        let now = Utc::now();
        // Stale snapshot after reconnection does not clear the flag.
        let stale_ts = now - Duration::milliseconds(3_000);
        assert_eq!(
            board.observe_snapshot(&venue(), stale_ts, now, 2_000),
            HealthTransition::Unchanged
        );
        assert!(board.is_down(&venue()));

        // Fresh snapshot clears it.
        assert_eq!(
            board.observe_snapshot(&venue(), now, now, 2_000),
            HealthTransition::CameUp
        );
        assert!(board.is_tradable(&venue()));
    }

    #[test]
    fn test_resume_refused_while_down() {
        let board = VenueHealthBoard::new();
        board.halt(&venue());
        board.mark_down(&venue(), "disconnect");
        assert!(!board.resume(&venue()));
        assert!(board.is_halted(&venue()));

        let now = Utc::now();
        board.observe_snapshot(&venue(), now, now, 2_000);
        assert!(board.resume(&venue()));
        assert!(board.is_tradable(&venue()));
    }

    #[test]
    fn test_halt_blocks_trading_independently_of_feed() {
        let board = VenueHealthBoard::new();
        board.halt(&venue());
        assert!(!board.is_tradable(&venue()));
        assert!(!board.is_down(&venue()));
    }
}
