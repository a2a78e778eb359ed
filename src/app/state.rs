//! Shared application state and counters.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::core::venue::VenueHealthBoard;

/// Process-wide state shared across the orchestrator's tasks.
///
/// Heavyweight owned state lives with its single writer (book cache with
/// the event task, positions with the execution ledger); this struct holds
/// the health board and cheap counters.
pub struct AppState {
    health: Arc<VenueHealthBoard>,
    started_at: DateTime<Utc>,
    dry_run: bool,
    edges_computed: AtomicU64,
    intents_admitted: AtomicU64,
    intents_rejected: AtomicU64,
}

impl AppState {
    /// Create app state.
    #[must_use]
    pub fn new(health: Arc<VenueHealthBoard>, dry_run: bool) -> Self {
        Self {
            health,
            started_at: Utc::now(),
            dry_run,
            edges_computed: AtomicU64::new(0),
            intents_admitted: AtomicU64::new(0),
            intents_rejected: AtomicU64::new(0),
        }
    }

    /// The shared venue health board.
    #[must_use]
    pub fn health(&self) -> &Arc<VenueHealthBoard> {
        &self.health
    }

    /// Process start time.
    #[must_use]
    pub const fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Whether execution is disabled.
    #[must_use]
    pub const fn dry_run(&self) -> bool {
        self.dry_run
    }

    /// Count an edge computation.
    pub fn count_edge(&self) {
        self.edges_computed.fetch_add(1, Ordering::Relaxed);
    }

    /// Count an admitted intent.
    pub fn count_admitted(&self) {
        self.intents_admitted.fetch_add(1, Ordering::Relaxed);
    }

    /// Count a rejected intent.
    pub fn count_rejected(&self) {
        self.intents_rejected.fetch_add(1, Ordering::Relaxed);
    }

    /// Snapshot of the counters: (edges, admitted, rejected).
    #[must_use]
    pub fn counters(&self) -> (u64, u64, u64) {
        (
            self.edges_computed.load(Ordering::Relaxed),
            self.intents_admitted.load(Ordering::Relaxed),
            self.intents_rejected.load(Ordering::Relaxed),
        )
    }
}
