//! Versioned fee schedule registry.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use sha2::{Digest, Sha256};
use tracing::info;

use crate::core::domain::{FeePack, VenueId};

/// An immutable fee schedule covering both venues.
///
/// The composite `version_hash` folds the per-venue pack hashes together;
/// it is stamped onto every edge quote computed from this schedule.
#[derive(Debug, Default, Clone)]
pub struct FeeSchedule {
    packs: HashMap<VenueId, Arc<FeePack>>,
    version_hash: String,
}

impl FeeSchedule {
    /// Look up the pack for a venue.
    #[must_use]
    pub fn pack(&self, venue: &VenueId) -> Option<&Arc<FeePack>> {
        self.packs.get(venue)
    }

    /// The composite schedule version hash.
    #[must_use]
    pub fn version_hash(&self) -> &str {
        &self.version_hash
    }

    /// Number of venues with a published pack.
    #[must_use]
    pub fn len(&self) -> usize {
        self.packs.len()
    }

    /// Returns true when no packs are published.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.packs.is_empty()
    }

    fn recompute_hash(&mut self) {
        let mut hashes: Vec<_> = self
            .packs
            .iter()
            .map(|(venue, pack)| format!("{venue}:{}", pack.version_hash()))
            .collect();
        hashes.sort();
        let mut hasher = Sha256::new();
        for entry in &hashes {
            hasher.update(entry.as_bytes());
        }
        let digest = hasher.finalize();
        self.version_hash = hex::encode(&digest[..8]);
    }
}

/// Owner of the fee schedule.
///
/// Written only by configuration (the fee provider); readers clone an
/// `Arc<FeeSchedule>` snapshot per computation.
#[derive(Default)]
pub struct FeeRegistry {
    inner: RwLock<Arc<FeeSchedule>>,
}

impl FeeRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a consistent snapshot for the duration of one computation.
    #[must_use]
    pub fn snapshot(&self) -> Arc<FeeSchedule> {
        Arc::clone(&self.inner.read())
    }

    /// Publish a new pack for a venue, replacing any previous version and
    /// producing a new composite hash.
    pub fn publish(&self, pack: FeePack) {
        let venue = pack.venue().clone();
        let pack_hash = pack.version_hash().to_string();
        let mut guard = self.inner.write();
        let mut next = FeeSchedule::clone(&guard);
        next.packs.insert(venue.clone(), Arc::new(pack));
        next.recompute_hash();
        info!(
            venue = %venue,
            pack_hash = %pack_hash,
            schedule_hash = %next.version_hash,
            "Fee pack published"
        );
        *guard = Arc::new(next);
    }
}
