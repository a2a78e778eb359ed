//! Risk/admission controller.
//!
//! Every edge quote passes through [`RiskController::admit`]. The hard
//! predicates run in a fixed order and the first failure rejects with a
//! named reason; an admitted quote leaves with the pair's hedge slot
//! reserved and a fully-formed execution intent.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use tracing::{debug, warn};

use crate::core::domain::{
    BookSnapshot, Cents, MarketRef, Notional, Pair, VenueId,
};
use crate::core::execution::{ExecutionIntent, LegOrder};
use crate::core::registry::FeeSchedule;
use crate::core::risk::exposure::ExposureView;
use crate::core::risk::hedge_stats::HedgeStats;
use crate::core::risk::live::{LiveHedges, ReserveError};
use crate::core::risk::pnl::{PnlTracker, StopWindow};
use crate::core::signal::EdgeComputation;
use crate::core::venue::VenueHealthBoard;

/// Named rejection reasons, in predicate order.
#[derive(Debug, Clone, PartialEq)]
pub enum RejectReason {
    PairInactive,
    EdgeBelowMinimum { net: Cents, min: Cents },
    StaleFeed { venue: VenueId },
    VenueDown { venue: VenueId },
    VenueHalted { venue: VenueId },
    MissingFeePack { venue: VenueId },
    PairBusy,
    PairsAtCap { max: usize },
    VenueCapExceeded { venue: VenueId, would_be: Notional, cap: Notional },
    ContractCapExceeded { market: MarketRef, would_be: Notional, cap: Notional },
    DrawdownStop { window: StopWindow },
    HedgeProbabilityLow { venue: VenueId, estimate: f64, min: f64 },
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PairInactive => write!(f, "pair_inactive"),
            Self::EdgeBelowMinimum { net, min } => {
                write!(f, "edge_below_minimum: {net} < {min}")
            }
            Self::StaleFeed { venue } => write!(f, "stale_feed: {venue}"),
            Self::VenueDown { venue } => write!(f, "venue_down: {venue}"),
            Self::VenueHalted { venue } => write!(f, "venue_halted: {venue}"),
            Self::MissingFeePack { venue } => write!(f, "missing_fee_pack: {venue}"),
            Self::PairBusy => write!(f, "pair_busy"),
            Self::PairsAtCap { max } => write!(f, "pairs_at_cap: {max}"),
            Self::VenueCapExceeded { venue, would_be, cap } => {
                write!(f, "venue_cap_exceeded: {venue} {would_be} > {cap}")
            }
            Self::ContractCapExceeded { market, would_be, cap } => {
                write!(f, "contract_cap_exceeded: {market} {would_be} > {cap}")
            }
            Self::DrawdownStop { window } => write!(f, "drawdown_stop: {window}"),
            Self::HedgeProbabilityLow { venue, estimate, min } => {
                write!(f, "hedge_probability_low: {venue} {estimate:.4} < {min}")
            }
        }
    }
}

/// Admission parameters.
#[derive(Debug, Clone)]
pub struct RiskParams {
    pub min_net_edge_cents: Cents,
    pub freshness_budget_ms: u64,
    pub venue_cap_usd: Notional,
    pub per_contract_exposure_usd: Notional,
    pub min_hedge_probability: f64,
    /// Slack added to the walked worst price when setting leg limits.
    pub limit_slack_cents: Cents,
    pub hedge_timeout_ms: u64,
    /// Consecutive stale rejections before a venue is flagged down.
    pub stale_streak_limit: u32,
}

/// The admission controller.
pub struct RiskController {
    params: RiskParams,
    health: Arc<VenueHealthBoard>,
    live: Arc<LiveHedges>,
    exposure: Arc<ExposureView>,
    pnl: Arc<PnlTracker>,
    hedge_stats: Arc<HedgeStats>,
    stale_streaks: DashMap<VenueId, u32>,
}

impl RiskController {
    /// Create a controller over the shared state it gates against.
    #[must_use]
    pub fn new(
        params: RiskParams,
        health: Arc<VenueHealthBoard>,
        live: Arc<LiveHedges>,
        exposure: Arc<ExposureView>,
        pnl: Arc<PnlTracker>,
        hedge_stats: Arc<HedgeStats>,
    ) -> Self {
        Self {
            params,
            health,
            live,
            exposure,
            pnl,
            hedge_stats,
            stale_streaks: DashMap::new(),
        }
    }

    /// The live hedge registry (shared with the execution engine).
    #[must_use]
    pub fn live_hedges(&self) -> &Arc<LiveHedges> {
        &self.live
    }

    /// Record a stale observation for a venue. Returns `true` when the
    /// streak just crossed the limit and the venue was flagged down.
    pub fn note_stale(&self, venue: &VenueId) -> bool {
        let mut streak = self.stale_streaks.entry(venue.clone()).or_insert(0);
        *streak += 1;
        if *streak == self.params.stale_streak_limit {
            drop(streak);
            self.health.mark_down(venue, "repeated stale feed");
            return true;
        }
        false
    }

    fn note_fresh(&self, venue: &VenueId) {
        self.stale_streaks.insert(venue.clone(), 0);
    }

    /// Apply all hard predicates to an edge computation.
    ///
    /// On success the pair's hedge slot is reserved and the returned intent
    /// carries the leader-derived leg order and per-leg limit prices.
    pub fn admit(
        &self,
        computation: &EdgeComputation,
        pair: &Pair,
        fees: &FeeSchedule,
        book_a: &BookSnapshot,
        book_b: &BookSnapshot,
        now: DateTime<Utc>,
    ) -> Result<ExecutionIntent, RejectReason> {
        let quote = computation.quote();

        if !pair.is_active() {
            return Err(RejectReason::PairInactive);
        }

        // 1. Minimum net edge.
        if quote.net_edge_cents() < self.params.min_net_edge_cents {
            return Err(RejectReason::EdgeBelowMinimum {
                net: quote.net_edge_cents(),
                min: self.params.min_net_edge_cents,
            });
        }

        // 2. Feed freshness and venue health.
        let budget = Duration::milliseconds(self.params.freshness_budget_ms as i64);
        for book in [book_a, book_b] {
            let venue = book.market().venue();
            if now - book.received_at() > budget {
                let flagged = self.note_stale(venue);
                if flagged {
                    warn!(venue = %venue, "Stale streak flagged venue down");
                }
                return Err(RejectReason::StaleFeed {
                    venue: venue.clone(),
                });
            }
            self.note_fresh(venue);
            let status = self.health.status(venue);
            if status.down {
                return Err(RejectReason::VenueDown {
                    venue: venue.clone(),
                });
            }
            if status.halted {
                return Err(RejectReason::VenueHalted {
                    venue: venue.clone(),
                });
            }
            if fees.pack(venue).is_none() {
                return Err(RejectReason::MissingFeePack {
                    venue: venue.clone(),
                });
            }
        }

        // 3. At most one live hedge per pair.
        if self.live.is_pair_live(pair.pair_id()) {
            return Err(RejectReason::PairBusy);
        }

        // 4. Global concurrent-hedge cap (peek; the reservation re-checks).
        if self.live.live() >= self.live_cap() {
            return Err(RejectReason::PairsAtCap {
                max: self.live_cap(),
            });
        }

        // 5/6. Post-trade notional caps.
        for leg in computation.legs() {
            let notional =
                crate::core::domain::notional_usd(leg.vwap_px(), quote.qty());
            let venue = leg.market().venue();
            let venue_would_be = self.exposure.venue_notional(venue) + notional;
            if venue_would_be > self.params.venue_cap_usd {
                return Err(RejectReason::VenueCapExceeded {
                    venue: venue.clone(),
                    would_be: venue_would_be,
                    cap: self.params.venue_cap_usd,
                });
            }
            let contract_would_be = self.exposure.contract_notional(leg.market()) + notional;
            if contract_would_be > self.params.per_contract_exposure_usd {
                return Err(RejectReason::ContractCapExceeded {
                    market: leg.market().clone(),
                    would_be: contract_would_be,
                    cap: self.params.per_contract_exposure_usd,
                });
            }
        }

        // 7. Drawdown stops.
        if let Some(window) = self.pnl.tripped_stop(now) {
            return Err(RejectReason::DrawdownStop { window });
        }

        // Leg ordering: hit the leader first; the hint never gates.
        let (primary_plan, hedge_plan) = match quote
            .leader()
            .and_then(|leader| computation.leg_on_venue(leader))
        {
            Some(leader_leg) => {
                let other = computation
                    .legs()
                    .into_iter()
                    .find(|leg| leg.market() != leader_leg.market())
                    .unwrap_or(computation.no_leg());
                (leader_leg, other)
            }
            None => (computation.yes_leg(), computation.no_leg()),
        };

        // 8. Hedge completion probability on the hedge leg's venue.
        let hedge_venue = hedge_plan.market().venue();
        let estimate = self.hedge_stats.probability(hedge_venue);
        if estimate < self.params.min_hedge_probability {
            return Err(RejectReason::HedgeProbabilityLow {
                venue: hedge_venue.clone(),
                estimate,
                min: self.params.min_hedge_probability,
            });
        }

        let deadline = now + Duration::milliseconds(self.params.hedge_timeout_ms as i64);
        let slack = self.params.limit_slack_cents;
        let intent = ExecutionIntent::new(
            pair.pair_id().clone(),
            quote.package(),
            quote.qty(),
            LegOrder::new(
                primary_plan.market().clone(),
                primary_plan.side(),
                primary_plan.worst_px() + slack,
                primary_plan.vwap_px(),
            ),
            LegOrder::new(
                hedge_plan.market().clone(),
                hedge_plan.side(),
                hedge_plan.worst_px() + slack,
                hedge_plan.vwap_px(),
            ),
            quote.net_edge_cents(),
            quote.fee_version_hash(),
            now,
            deadline,
        );

        // Reserve the slot; a concurrent admission may have won the race.
        match self.live.reserve(pair.pair_id(), intent.intent_id()) {
            Ok(()) => {
                debug!(
                    intent_id = %intent.intent_id(),
                    pair_id = %pair.pair_id(),
                    net_edge = %quote.net_edge_cents(),
                    "Intent admitted"
                );
                Ok(intent)
            }
            Err(ReserveError::PairBusy) => Err(RejectReason::PairBusy),
            Err(ReserveError::AtCapacity) => Err(RejectReason::PairsAtCap {
                max: self.live_cap(),
            }),
        }
    }

    fn live_cap(&self) -> usize {
        self.live.capacity()
    }
}
