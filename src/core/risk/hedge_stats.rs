//! Per-venue hedge completion statistics.
//!
//! Feeds the admission controller's completion-probability predicate: the
//! chance that, once the primary fills, the hedge leg completes inside its
//! budget on this venue.

use std::collections::VecDeque;

use dashmap::DashMap;

use crate::core::domain::VenueId;

const DEFAULT_RETENTION: usize = 100;

/// Rolling per-venue record of hedge outcomes.
///
/// The estimate is Laplace-smoothed: with no history a venue starts at 1.0
/// and earns distrust from observed failures.
pub struct HedgeStats {
    outcomes: DashMap<VenueId, VecDeque<bool>>,
    retention: usize,
}

impl HedgeStats {
    /// Create a tracker retaining the default window of outcomes per venue.
    #[must_use]
    pub fn new() -> Self {
        Self::with_retention(DEFAULT_RETENTION)
    }

    /// Create a tracker retaining `retention` outcomes per venue.
    #[must_use]
    pub fn with_retention(retention: usize) -> Self {
        Self {
            outcomes: DashMap::new(),
            retention,
        }
    }

    /// Record a hedge outcome on the hedge leg's venue.
    pub fn record(&self, venue: &VenueId, success: bool) {
        let mut ring = self.outcomes.entry(venue.clone()).or_default();
        ring.push_back(success);
        while ring.len() > self.retention {
            ring.pop_front();
        }
    }

    /// Completion probability estimate for a venue.
    #[must_use]
    pub fn probability(&self, venue: &VenueId) -> f64 {
        match self.outcomes.get(venue) {
            None => 1.0,
            Some(ring) => {
                let n = ring.len() as f64;
                let successes = ring.iter().filter(|s| **s).count() as f64;
                (successes + 1.0) / (n + 1.0)
            }
        }
    }
}

impl Default for HedgeStats {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_venue_starts_trusted() {
        let stats = HedgeStats::new();
        assert_eq!(stats.probability(&VenueId::from("alpha")), 1.0);
    }

    #[test]
    fn test_failures_lower_the_estimate() {
        let stats = HedgeStats::new();
        let venue = VenueId::from("alpha");
        for _ in 0..9 {
            stats.record(&venue, true);
        }
        stats.record(&venue, false);
        // (9 + 1) / (10 + 1)
        assert!((stats.probability(&venue) - 10.0 / 11.0).abs() < 1e-12);
    }

    #[test]
    fn test_retention_window_forgets_old_failures() {
        let stats = HedgeStats::with_retention(5);
        let venue = VenueId::from("alpha");
        stats.record(&venue, false);
        for _ in 0..5 {
            stats.record(&venue, true);
        }
        // The failure aged out of the ring.
        assert_eq!(stats.probability(&venue), 1.0);
    }
}
