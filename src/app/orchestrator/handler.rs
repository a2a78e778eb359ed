//! The trading-loop event handler.
//!
//! This is the critical path: cache update, bar aggregation, signal, risk,
//! and execution dispatch for one venue event. It is purely computational
//! (no awaits) so per-pair ordering follows snapshot arrival order.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::app::state::AppState;
use crate::core::cache::{BarStore, BookCache, UpdateOutcome};
use crate::core::domain::{BookSnapshot, VenueId};
use crate::core::execution::ExecutionEngine;
use crate::core::registry::{FeeRegistry, PairStore};
use crate::core::risk::RiskController;
use crate::core::service::{Event, EventBus, OperatorCommand};
use crate::core::signal::{BarClose, EdgeRejection, LeadLagTracker, SignalEngine};
use crate::core::venue::{HealthTransition, VenueEvent, VenueHealthBoard};

/// Everything the handler needs, shared across the orchestrator's tasks.
pub struct Pipeline {
    pub cache: Arc<BookCache>,
    pub bars: Arc<BarStore>,
    pub pairs: Arc<PairStore>,
    pub fees: Arc<FeeRegistry>,
    pub signal: Arc<SignalEngine>,
    pub risk: Arc<RiskController>,
    pub leadlag: Arc<LeadLagTracker>,
    pub bar_close_tx: mpsc::Sender<BarClose>,
    pub engine: Arc<ExecutionEngine>,
    pub bus: EventBus,
    pub health: Arc<VenueHealthBoard>,
    pub state: Arc<AppState>,
    pub freshness_budget_ms: u64,
}

impl Pipeline {
    /// Process one venue event through the trading loop.
    pub fn handle_venue_event(&self, venue: &VenueId, event: VenueEvent) {
        match event {
            VenueEvent::Connected => {
                info!(venue = %venue, "Venue stream connected");
            }
            VenueEvent::Disconnected { reason } => {
                self.health.mark_down(venue, reason.clone());
                self.bus.publish(Event::VenueDown {
                    venue: venue.clone(),
                    reason,
                });
            }
            VenueEvent::Snapshot(snapshot) => self.handle_snapshot(snapshot),
        }
    }

    fn handle_snapshot(&self, snapshot: BookSnapshot) {
        if !snapshot.is_coherent() {
            warn!(market = %snapshot.market(), "Dropped crossed book snapshot");
            return;
        }

        let market = snapshot.market().clone();
        let venue = market.venue().clone();
        let venue_ts = snapshot.venue_ts();
        let mid = snapshot.mid();

        if self.cache.update(snapshot) == UpdateOutcome::StaleDropped {
            return;
        }

        let now = Utc::now();
        if self
            .health
            .observe_snapshot(&venue, venue_ts, now, self.freshness_budget_ms)
            == HealthTransition::CameUp
        {
            self.bus.publish(Event::VenueUp {
                venue: venue.clone(),
            });
        }

        // Bar aggregation; closed bars go to the lead-lag worker.
        if let Some(mid) = mid {
            let closed = self
                .bars
                .on_tick(&market, venue_ts.timestamp_millis(), mid);
            if !closed.is_empty()
                && self
                    .bar_close_tx
                    .try_send(BarClose {
                        market: market.clone(),
                    })
                    .is_err()
            {
                debug!(market = %market, "Lead-lag worker busy, bar close dropped");
            }
        }

        // Recompute every active pair touching this market.
        let pairs = self.pairs.snapshot();
        let fees = self.fees.snapshot();
        for pair in pairs.pairs_for_market(&market) {
            let (book_a, book_b) = self.cache.get_pair(pair.market_a(), pair.market_b());
            let hint = self.leadlag.hint(pair.pair_id());

            let computation = match self.signal.compute(
                pair,
                book_a.as_deref(),
                book_b.as_deref(),
                &fees,
                &hint,
                now,
            ) {
                Ok(computation) => computation,
                Err(EdgeRejection::Stale { market: stale_market }) => {
                    // Staleness is a risk rejection; repeated occurrences
                    // flag the venue down.
                    let stale_venue = stale_market.venue().clone();
                    if self.risk.note_stale(&stale_venue) {
                        self.bus.publish(Event::VenueDown {
                            venue: stale_venue.clone(),
                            reason: "repeated stale feed".into(),
                        });
                    }
                    self.state.count_rejected();
                    self.bus.publish(Event::IntentRejected {
                        pair_id: pair.pair_id().clone(),
                        reason: format!("stale_feed: {stale_venue}"),
                    });
                    continue;
                }
                Err(rejection) => {
                    self.bus.publish(Event::EdgeRejected {
                        pair_id: pair.pair_id().clone(),
                        reason: rejection.to_string(),
                    });
                    continue;
                }
            };

            self.state.count_edge();
            self.bus.publish(Event::EdgeComputed {
                quote: computation.quote().clone(),
            });

            let (book_a, book_b) = match (book_a.as_deref(), book_b.as_deref()) {
                (Some(a), Some(b)) => (a, b),
                _ => continue,
            };
            match self
                .risk
                .admit(&computation, pair, &fees, book_a, book_b, now)
            {
                Ok(intent) => {
                    self.state.count_admitted();
                    self.bus.publish(Event::IntentAdmitted {
                        intent: intent.clone(),
                    });
                    if self.state.dry_run() {
                        // Detection only: give the slot straight back.
                        self.risk.live_hedges().release(intent.pair_id());
                    } else {
                        self.engine.spawn(intent);
                    }
                }
                Err(reason) => {
                    self.state.count_rejected();
                    self.bus.publish(Event::IntentRejected {
                        pair_id: pair.pair_id().clone(),
                        reason: reason.to_string(),
                    });
                }
            }
        }
    }

    /// Process one operator command.
    pub fn handle_control(&self, command: OperatorCommand) {
        match command {
            OperatorCommand::Halt { venue, who } => {
                info!(venue = %venue, who = %who, "Operator halt");
                self.health.halt(&venue);
                self.bus.publish(Event::HaltRequested { venue, who });
                // Live hedges notice the halt flag and unwind themselves.
            }
            OperatorCommand::Resume { venue, who } => {
                let cleared = self.health.resume(&venue);
                info!(venue = %venue, who = %who, cleared, "Operator resume");
                self.bus.publish(Event::ResumeRequested { venue, who });
            }
            OperatorCommand::DeactivatePair { pair_id, who } => {
                info!(pair_id = %pair_id, who = %who, "Operator pair deactivation");
                // Non-cancelling: in-flight hedges run to a terminal state.
                self.pairs.set_pair_active(&pair_id, false);
                self.bus.publish(Event::PairDeactivated { pair_id, who });
            }
        }
    }
}
