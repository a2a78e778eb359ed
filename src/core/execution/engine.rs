//! Hedged-execution engine.
//!
//! One task per admitted intent drives the two-leg state machine:
//!
//! ```text
//! Ready -> PlacingPrimary -> PlacingHedge -> AwaitingFills -> Settled
//!                |                |               |
//!                v                v               v
//!             Failed          Unwinding ------ Unwinding -> Unwound | Failed
//! ```
//!
//! Outside `AwaitingFills` and `Unwinding` a pair never holds directional
//! exposure. Every await is clamped to the intent's deadline or the unwind
//! budget, so the wall-clock from `Ready` to a terminal state is bounded by
//! construction.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout, Instant};
use tracing::{debug, error, info, warn};

use crate::core::cache::BookCache;
use crate::core::domain::{
    Cents, Fill, LegStatus, OrderAck, OrderIntent, Side, TradeOutcome, TradeRecord, UnwindReason,
    VenueId, CONTRACT_PAYOUT_CENTS,
};
use crate::core::execution::intent::{ExecutionIntent, LegOrder};
use crate::core::execution::ledger::PositionLedger;
use crate::core::risk::{HedgeStats, LiveHedges, PnlTracker};
use crate::core::service::{Event, EventBus, TradeStore};
use crate::core::venue::{OrderGateway, VenueHealthBoard};

/// Hedge state machine states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HedgeState {
    Ready,
    PlacingPrimary,
    PlacingHedge,
    AwaitingFills,
    Unwinding,
    Settled,
    Unwound,
    Failed,
}

impl std::fmt::Display for HedgeState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Ready => "ready",
            Self::PlacingPrimary => "placing_primary",
            Self::PlacingHedge => "placing_hedge",
            Self::AwaitingFills => "awaiting_fills",
            Self::Unwinding => "unwinding",
            Self::Settled => "settled",
            Self::Unwound => "unwound",
            Self::Failed => "failed",
        };
        write!(f, "{label}")
    }
}

/// Execution engine parameters.
#[derive(Debug, Clone)]
pub struct ExecutionParams {
    pub hedge_timeout_ms: u64,
    pub unwind_budget_ms: u64,
    pub backoff_max_ms: u64,
    pub unwind_max_retries: u32,
    pub adverse_move_cents: Cents,
    pub adverse_move_duration_ms: u64,
}

/// Runtime state of one leg.
struct LegRuntime {
    order: LegOrder,
    ack: Option<OrderAck>,
    filled: u64,
    cost: Decimal,
    fees: Decimal,
    rejected: bool,
    cancelled: bool,
}

impl LegRuntime {
    fn new(order: LegOrder) -> Self {
        Self {
            order,
            ack: None,
            filled: 0,
            cost: Decimal::ZERO,
            fees: Decimal::ZERO,
            rejected: false,
            cancelled: false,
        }
    }

    fn absorb(&mut self, fill: &Fill) {
        self.filled += fill.qty();
        self.cost += fill.px() * Decimal::from(fill.qty());
        self.fees += fill.fee_paid() * Decimal::from(fill.qty());
    }

    fn avg_px(&self) -> Cents {
        if self.filled == 0 {
            Decimal::ZERO
        } else {
            self.cost / Decimal::from(self.filled)
        }
    }

    fn matches(&self, fill: &Fill) -> bool {
        self.ack
            .as_ref()
            .is_some_and(|ack| ack.venue_order_id() == fill.order_id())
    }

    fn is_complete(&self, qty: u64) -> bool {
        self.filled >= qty
    }

    fn status(&self, qty: u64) -> LegStatus {
        if self.rejected {
            LegStatus::Rejected
        } else if self.is_complete(qty) {
            LegStatus::Filled
        } else if self.filled > 0 {
            LegStatus::PartiallyFilled {
                filled: self.filled,
            }
        } else if self.cancelled {
            LegStatus::Cancelled
        } else if self.ack.is_some() {
            LegStatus::PartiallyFilled { filled: 0 }
        } else {
            LegStatus::NotPlaced
        }
    }
}

/// The hedged-execution engine. One instance serves the whole process;
/// each admitted intent runs on its own task.
pub struct ExecutionEngine {
    gateways: HashMap<VenueId, Arc<dyn OrderGateway>>,
    books: Arc<BookCache>,
    ledger: Arc<PositionLedger>,
    bus: EventBus,
    store: Arc<dyn TradeStore>,
    live: Arc<LiveHedges>,
    hedge_stats: Arc<HedgeStats>,
    pnl: Arc<PnlTracker>,
    health: Arc<VenueHealthBoard>,
    params: ExecutionParams,
}

impl ExecutionEngine {
    /// Create the engine over its collaborators.
    #[allow(clippy::too_many_arguments)]
    #[must_use]
    pub fn new(
        gateways: HashMap<VenueId, Arc<dyn OrderGateway>>,
        books: Arc<BookCache>,
        ledger: Arc<PositionLedger>,
        bus: EventBus,
        store: Arc<dyn TradeStore>,
        live: Arc<LiveHedges>,
        hedge_stats: Arc<HedgeStats>,
        pnl: Arc<PnlTracker>,
        health: Arc<VenueHealthBoard>,
        params: ExecutionParams,
    ) -> Self {
        Self {
            gateways,
            books,
            ledger,
            bus,
            store,
            live,
            hedge_stats,
            pnl,
            health,
            params,
        }
    }

    /// The position ledger (read-side: snapshots for persistence).
    #[must_use]
    pub fn ledger(&self) -> &Arc<PositionLedger> {
        &self.ledger
    }

    /// Spawn a hedge run on its own task.
    pub fn spawn(self: &Arc<Self>, intent: ExecutionIntent) -> JoinHandle<TradeRecord> {
        let engine = Arc::clone(self);
        tokio::spawn(async move { engine.run_hedge(intent).await })
    }

    fn gateway(&self, venue: &VenueId) -> Option<Arc<dyn OrderGateway>> {
        self.gateways.get(venue).cloned()
    }

    fn set_state(&self, intent: &ExecutionIntent, state: HedgeState) {
        debug!(intent_id = %intent.intent_id(), state = %state, "Hedge state");
        self.bus.publish(Event::HedgeStateChanged {
            intent_id: intent.intent_id().clone(),
            pair_id: intent.pair_id().clone(),
            state,
        });
    }

    /// Drive one admitted intent to a terminal state.
    pub async fn run_hedge(self: Arc<Self>, intent: ExecutionIntent) -> TradeRecord {
        let run = HedgeRun::new(&self, &intent);
        let record = run.drive().await;

        // Terminal bookkeeping: persist, release, account.
        if let Err(e) = self.store.append(&record) {
            error!(intent_id = %intent.intent_id(), error = %e, "Trade record append failed");
        }
        self.live.release(intent.pair_id());

        let event = match record.outcome {
            TradeOutcome::Committed => Event::TradeSettled {
                record: record.clone(),
            },
            TradeOutcome::Unwound => Event::TradeUnwound {
                record: record.clone(),
            },
            TradeOutcome::Failed => Event::TradeFailed {
                record: record.clone(),
            },
        };
        self.bus.publish(event);
        record
    }
}

/// Per-intent run state.
struct HedgeRun<'a> {
    engine: &'a ExecutionEngine,
    intent: &'a ExecutionIntent,
    primary: LegRuntime,
    hedge: LegRuntime,
    /// Signed directional exposure of this run: YES fills minus NO fills.
    exposure: i64,
    unwind_reason: Option<UnwindReason>,
    opened_at: chrono::DateTime<Utc>,
    deadline: Instant,
}

enum AwaitOutcome {
    Settled,
    Unwind(UnwindReason),
}

impl<'a> HedgeRun<'a> {
    fn new(engine: &'a ExecutionEngine, intent: &'a ExecutionIntent) -> Self {
        Self {
            engine,
            intent,
            primary: LegRuntime::new(intent.primary().clone()),
            hedge: LegRuntime::new(intent.hedge().clone()),
            exposure: 0,
            unwind_reason: None,
            opened_at: Utc::now(),
            deadline: Instant::now()
                + Duration::from_millis(engine.params.hedge_timeout_ms),
        }
    }

    fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }

    fn qty(&self) -> u64 {
        self.intent.qty()
    }

    /// Apply a matched fill to the ledger and run counters.
    fn apply_fill(&mut self, leg: Leg, fill: &Fill) {
        let (market, side) = {
            let runtime = self.leg(leg);
            (runtime.order.market().clone(), runtime.order.side())
        };
        let Some(delta) = self.engine.ledger.apply_fill(&market, side, fill) else {
            return;
        };
        self.leg_mut(leg).absorb(fill);
        self.exposure += match side {
            Side::BuyYes => fill.qty() as i64,
            Side::BuyNo => -(fill.qty() as i64),
        };
        self.engine.bus.publish(Event::LegFilled {
            intent_id: self.intent.intent_id().clone(),
            market: market.clone(),
            side,
            px: fill.px(),
            qty: fill.qty(),
        });
        self.engine
            .bus
            .publish(Event::PositionChanged { delta });
    }

    fn leg(&self, leg: Leg) -> &LegRuntime {
        match leg {
            Leg::Primary => &self.primary,
            Leg::Hedge => &self.hedge,
        }
    }

    fn leg_mut(&mut self, leg: Leg) -> &mut LegRuntime {
        match leg {
            Leg::Primary => &mut self.primary,
            Leg::Hedge => &mut self.hedge,
        }
    }

    async fn drive(mut self) -> TradeRecord {
        let engine = self.engine;
        let intent = self.intent;
        engine.set_state(intent, HedgeState::Ready);

        let Some(primary_gw) = engine.gateway(intent.primary().market().venue()) else {
            error!(venue = %intent.primary().market().venue(), "No gateway for primary venue");
            engine.set_state(intent, HedgeState::Failed);
            return self.finish(TradeOutcome::Failed);
        };
        let Some(hedge_gw) = engine.gateway(intent.hedge().market().venue()) else {
            error!(venue = %intent.hedge().market().venue(), "No gateway for hedge venue");
            engine.set_state(intent, HedgeState::Failed);
            return self.finish(TradeOutcome::Failed);
        };

        // Subscribe before placing so no fill can slip past.
        let mut primary_fills = primary_gw.fills();
        let mut hedge_fills = hedge_gw.fills();

        // -- PlacingPrimary ---------------------------------------------
        engine.set_state(intent, HedgeState::PlacingPrimary);
        let order = self.order_for(intent.primary());
        match timeout(self.remaining(), primary_gw.place_taker(&order)).await {
            Ok(Ok(ack)) => self.primary.ack = Some(ack),
            Ok(Err(e)) => {
                // Primary rejection is terminal here; a fresh quote must
                // re-trigger through the normal path.
                warn!(intent_id = %intent.intent_id(), error = %e, "Primary leg rejected");
                self.primary.rejected = true;
                engine.set_state(intent, HedgeState::Failed);
                return self.finish(TradeOutcome::Failed);
            }
            Err(_) => {
                warn!(intent_id = %intent.intent_id(), "Primary placement timed out");
                engine.set_state(intent, HedgeState::Failed);
                return self.finish(TradeOutcome::Failed);
            }
        }

        // -- PlacingHedge -----------------------------------------------
        engine.set_state(intent, HedgeState::PlacingHedge);
        let order = self.order_for(intent.hedge());
        match timeout(self.remaining(), hedge_gw.place_taker(&order)).await {
            Ok(Ok(ack)) => self.hedge.ack = Some(ack),
            Ok(Err(e)) => {
                warn!(intent_id = %intent.intent_id(), error = %e, "Hedge leg rejected");
                self.hedge.rejected = true;
                return self
                    .unwind(UnwindReason::HedgeRejected, &primary_gw, &hedge_gw, primary_fills, hedge_fills)
                    .await;
            }
            Err(_) => {
                warn!(intent_id = %intent.intent_id(), "Hedge placement timed out");
                return self
                    .unwind(UnwindReason::Timeout, &primary_gw, &hedge_gw, primary_fills, hedge_fills)
                    .await;
            }
        }

        // -- AwaitingFills ----------------------------------------------
        engine.set_state(intent, HedgeState::AwaitingFills);
        match self
            .await_fills(&mut primary_fills, &mut hedge_fills)
            .await
        {
            AwaitOutcome::Settled => {
                engine.set_state(intent, HedgeState::Settled);
                info!(
                    intent_id = %intent.intent_id(),
                    pair_id = %intent.pair_id(),
                    "Hedge settled"
                );
                self.finish(TradeOutcome::Committed)
            }
            AwaitOutcome::Unwind(reason) => {
                self.unwind(reason, &primary_gw, &hedge_gw, primary_fills, hedge_fills)
                    .await
            }
        }
    }

    fn order_for(&self, leg: &LegOrder) -> OrderIntent {
        let now = Utc::now();
        OrderIntent::new(
            leg.market().clone(),
            leg.side(),
            leg.limit_px(),
            self.qty(),
            now,
            self.intent.deadline(),
        )
    }

    async fn await_fills(
        &mut self,
        primary_fills: &mut broadcast::Receiver<Fill>,
        hedge_fills: &mut broadcast::Receiver<Fill>,
    ) -> AwaitOutcome {
        // Reference mids for adverse-move detection, captured at entry.
        let ref_mid_primary = self.engine.books.mid(self.primary.order.market());
        let ref_mid_hedge = self.engine.books.mid(self.hedge.order.market());
        let mut adverse_since: Option<Instant> = None;
        let adverse_duration =
            Duration::from_millis(self.engine.params.adverse_move_duration_ms);
        let mut ticker = tokio::time::interval(Duration::from_millis(50));
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            if self.primary.is_complete(self.qty()) && self.hedge.is_complete(self.qty()) {
                return AwaitOutcome::Settled;
            }

            tokio::select! {
                fill = next_fill(primary_fills) => {
                    if self.primary.matches(&fill) {
                        self.apply_fill(Leg::Primary, &fill);
                    }
                }
                fill = next_fill(hedge_fills) => {
                    if self.hedge.matches(&fill) {
                        self.apply_fill(Leg::Hedge, &fill);
                    }
                }
                () = tokio::time::sleep_until(self.deadline) => {
                    return AwaitOutcome::Unwind(UnwindReason::Timeout);
                }
                _ = ticker.tick() => {
                    for venue in [
                        self.primary.order.market().venue(),
                        self.hedge.order.market().venue(),
                    ] {
                        if self.engine.health.is_halted(venue) {
                            return AwaitOutcome::Unwind(UnwindReason::OperatorHalt);
                        }
                    }

                    if let Some(delta) = self.adverse_delta(ref_mid_primary, ref_mid_hedge) {
                        if delta >= self.engine.params.adverse_move_cents {
                            let since = *adverse_since.get_or_insert_with(Instant::now);
                            if since.elapsed() >= adverse_duration {
                                return AwaitOutcome::Unwind(UnwindReason::AdverseMove);
                            }
                        } else {
                            adverse_since = None;
                        }
                    }
                }
            }
        }
    }

    /// Adverse mid move on the unfilled leg, in cents against us.
    fn adverse_delta(
        &self,
        ref_mid_primary: Option<Cents>,
        ref_mid_hedge: Option<Cents>,
    ) -> Option<Cents> {
        let candidates = [
            (&self.hedge, ref_mid_hedge),
            (&self.primary, ref_mid_primary),
        ];
        for (leg, reference) in candidates {
            if leg.is_complete(self.qty()) {
                continue;
            }
            let reference = reference?;
            let mid = self.engine.books.mid(leg.order.market())?;
            // Buying YES hurts when the mid rises; buying NO when it falls.
            let delta = match leg.order.side() {
                Side::BuyYes => mid - reference,
                Side::BuyNo => reference - mid,
            };
            return Some(delta);
        }
        None
    }

    async fn unwind(
        mut self,
        reason: UnwindReason,
        primary_gw: &Arc<dyn OrderGateway>,
        hedge_gw: &Arc<dyn OrderGateway>,
        mut primary_fills: broadcast::Receiver<Fill>,
        mut hedge_fills: broadcast::Receiver<Fill>,
    ) -> TradeRecord {
        let engine = self.engine;
        let intent = self.intent;
        self.unwind_reason = Some(reason);
        engine.set_state(intent, HedgeState::Unwinding);
        warn!(
            intent_id = %intent.intent_id(),
            pair_id = %intent.pair_id(),
            reason = %reason,
            "Unwinding"
        );

        let unwind_deadline =
            Instant::now() + Duration::from_millis(engine.params.unwind_budget_ms);

        // Cancel open residuals on both legs.
        for (leg, gateway) in [(Leg::Primary, primary_gw), (Leg::Hedge, hedge_gw)] {
            let runtime = self.leg(leg);
            if runtime.is_complete(self.qty()) {
                continue;
            }
            if let Some(order_id) = runtime.ack.as_ref().map(|a| a.venue_order_id().clone()) {
                match gateway.cancel(&order_id).await {
                    Ok(outcome) => {
                        debug!(order_id = %order_id, ?outcome, "Residual cancelled");
                        self.leg_mut(leg).cancelled = true;
                    }
                    Err(e) => warn!(order_id = %order_id, error = %e, "Cancel failed"),
                }
            }
        }

        // Drain fills that raced the cancels.
        sleep(Duration::from_millis(10).min(remaining_of(unwind_deadline))).await;
        while let Ok(fill) = primary_fills.try_recv() {
            if self.primary.matches(&fill) {
                self.apply_fill(Leg::Primary, &fill);
            }
        }
        while let Ok(fill) = hedge_fills.try_recv() {
            if self.hedge.matches(&fill) {
                self.apply_fill(Leg::Hedge, &fill);
            }
        }

        // Offset any filled-but-unhedged quantity with fresh takers.
        let mut attempts: u32 = 0;
        let mut backoff_ms: u64 = 100;
        while self.exposure != 0 {
            if attempts >= engine.params.unwind_max_retries
                || remaining_of(unwind_deadline).is_zero()
            {
                // A single stray contract counts as flat; anything more is
                // leg risk.
                if self.exposure.abs() <= 1 {
                    break;
                }
                return self.fail_leg_risk(attempts);
            }
            attempts += 1;

            let over_leg = if self.exposure > 0 {
                // Excess YES sits on whichever leg bought YES.
                if self.primary.order.side() == Side::BuyYes {
                    Leg::Primary
                } else {
                    Leg::Hedge
                }
            } else if self.primary.order.side() == Side::BuyNo {
                Leg::Primary
            } else {
                Leg::Hedge
            };
            let market = self.leg(over_leg).order.market().clone();
            let offset_side = self.leg(over_leg).order.side().offsetting();
            let offset_qty = self.exposure.unsigned_abs();

            // Price the offset off the live book: buying NO against the
            // bids, buying YES against the asks.
            let Some(book) = engine.books.get(&market) else {
                warn!(market = %market, "No book to price unwind offset");
                let pause = Duration::from_millis(backoff_ms.min(engine.params.backoff_max_ms))
                    .min(remaining_of(unwind_deadline));
                sleep(pause).await;
                backoff_ms = (backoff_ms * 2).min(engine.params.backoff_max_ms);
                continue;
            };
            let limit_px = match offset_side {
                Side::BuyNo => book.best_no_ask(),
                Side::BuyYes => book.best_ask().map(|l| l.price()),
            };
            let Some(limit_px) = limit_px else {
                warn!(market = %market, "Empty book side for unwind offset");
                let pause = Duration::from_millis(backoff_ms.min(engine.params.backoff_max_ms))
                    .min(remaining_of(unwind_deadline));
                sleep(pause).await;
                backoff_ms = (backoff_ms * 2).min(engine.params.backoff_max_ms);
                continue;
            };

            let now = Utc::now();
            let attempt_budget = remaining_of(unwind_deadline)
                .min(Duration::from_millis(engine.params.backoff_max_ms));
            let offset = OrderIntent::new(
                market.clone(),
                offset_side,
                limit_px,
                offset_qty,
                now,
                now + chrono::Duration::milliseconds(attempt_budget.as_millis() as i64),
            );
            let gateway = if market == *self.primary.order.market() {
                primary_gw
            } else {
                hedge_gw
            };

            info!(
                intent_id = %intent.intent_id(),
                market = %market,
                side = %offset_side,
                qty = offset_qty,
                limit_px = %limit_px,
                attempt = attempts,
                "Placing unwind offset"
            );
            // Subscribe before placing so an instant fill cannot slip past.
            let mut offset_fills = gateway.fills();
            match timeout(attempt_budget, gateway.place_taker(&offset)).await {
                Ok(Ok(ack)) => {
                    let done = self
                        .collect_offset_fills(
                            &ack,
                            &market,
                            offset_side,
                            offset_qty,
                            gateway,
                            &mut offset_fills,
                            attempt_budget,
                        )
                        .await;
                    if done {
                        continue;
                    }
                }
                Ok(Err(e)) => {
                    warn!(error = %e, attempt = attempts, "Unwind offset rejected");
                }
                Err(_) => {
                    warn!(attempt = attempts, "Unwind offset placement timed out");
                }
            }

            let pause = Duration::from_millis(backoff_ms.min(engine.params.backoff_max_ms))
                .min(remaining_of(unwind_deadline));
            sleep(pause).await;
            backoff_ms = (backoff_ms * 2).min(engine.params.backoff_max_ms);
        }

        engine.set_state(intent, HedgeState::Unwound);
        info!(
            intent_id = %intent.intent_id(),
            pair_id = %intent.pair_id(),
            reason = %reason,
            "Unwound to flat"
        );
        self.finish(TradeOutcome::Unwound)
    }

    /// Await fills for one offset order. Returns true when the residual it
    /// targeted is gone.
    #[allow(clippy::too_many_arguments)]
    async fn collect_offset_fills(
        &mut self,
        ack: &OrderAck,
        market: &crate::core::domain::MarketRef,
        side: Side,
        qty: u64,
        gateway: &Arc<dyn OrderGateway>,
        fills: &mut broadcast::Receiver<Fill>,
        budget: Duration,
    ) -> bool {
        let deadline = Instant::now() + budget;
        let mut collected = 0_u64;
        while collected < qty {
            let wait = deadline.saturating_duration_since(Instant::now());
            if wait.is_zero() {
                break;
            }
            match timeout(wait, fills.recv()).await {
                Ok(Ok(fill)) if fill.order_id() == ack.venue_order_id() => {
                    collected += fill.qty();
                    if let Some(delta) = self.engine.ledger.apply_fill(market, side, &fill) {
                        self.exposure += match side {
                            Side::BuyYes => fill.qty() as i64,
                            Side::BuyNo => -(fill.qty() as i64),
                        };
                        self.engine.bus.publish(Event::LegFilled {
                            intent_id: self.intent.intent_id().clone(),
                            market: market.clone(),
                            side,
                            px: fill.px(),
                            qty: fill.qty(),
                        });
                        self.engine.bus.publish(Event::PositionChanged { delta });
                    }
                }
                Ok(Ok(_)) => {}
                Ok(Err(broadcast::error::RecvError::Lagged(_))) => {}
                Ok(Err(broadcast::error::RecvError::Closed)) | Err(_) => break,
            }
        }
        if collected < qty {
            let _ = gateway.cancel(ack.venue_order_id()).await;
        }
        self.exposure == 0
    }

    fn fail_leg_risk(mut self, attempts: u32) -> TradeRecord {
        let engine = self.engine;
        let intent = self.intent;
        engine.set_state(intent, HedgeState::Failed);

        // Leg risk: halt the venue carrying the residual and page.
        let residual_venue = if self.exposure > 0 {
            if self.primary.order.side() == Side::BuyYes {
                self.primary.order.market().venue().clone()
            } else {
                self.hedge.order.market().venue().clone()
            }
        } else if self.primary.order.side() == Side::BuyNo {
            self.primary.order.market().venue().clone()
        } else {
            self.hedge.order.market().venue().clone()
        };
        error!(
            intent_id = %intent.intent_id(),
            pair_id = %intent.pair_id(),
            residual = self.exposure,
            attempts,
            venue = %residual_venue,
            "LEG RISK: unwind exhausted, halting venue"
        );
        engine.health.halt(&residual_venue);
        self.unwind_reason = self.unwind_reason.or(Some(UnwindReason::Timeout));
        self.finish(TradeOutcome::Failed)
    }

    fn finish(self, outcome: TradeOutcome) -> TradeRecord {
        let engine = self.engine;
        let intent = self.intent;
        let qty = self.qty();

        // Matched YES+NO pairs lock the payout; realised edge is measured
        // on the matched quantity net of fees paid.
        let yes_leg;
        let no_leg;
        if self.primary.order.side() == Side::BuyYes {
            yes_leg = &self.primary;
            no_leg = &self.hedge;
        } else {
            yes_leg = &self.hedge;
            no_leg = &self.primary;
        }
        let matched = yes_leg.filled.min(no_leg.filled);
        let total_fees = self.primary.fees + self.hedge.fees;
        let realised_edge_cents = if matched > 0 {
            CONTRACT_PAYOUT_CENTS - yes_leg.avg_px() - no_leg.avg_px()
                - total_fees / Decimal::from(matched)
        } else {
            Decimal::ZERO
        };

        let mut slippage = Decimal::ZERO;
        for leg in [&self.primary, &self.hedge] {
            if leg.filled > 0 {
                slippage += leg.avg_px() - leg.order.expected_px();
            }
        }

        let realised_usd =
            realised_edge_cents * Decimal::from(matched) / Decimal::ONE_HUNDRED;
        engine.pnl.record(realised_usd, Utc::now());

        // Completion statistics for the admission probability estimate.
        if self.hedge.ack.is_some() || self.hedge.rejected {
            engine.hedge_stats.record(
                self.hedge.order.market().venue(),
                self.hedge.is_complete(qty),
            );
        }

        let now = Utc::now();
        TradeRecord {
            schema_version: TradeRecord::SCHEMA_VERSION,
            intent_id: intent.intent_id().clone(),
            pair_id: intent.pair_id().clone(),
            package: intent.package(),
            primary: self.order_snapshot(&self.primary),
            hedge: self.order_snapshot(&self.hedge),
            primary_status: self.primary.status(qty),
            hedge_status: self.hedge.status(qty),
            realised_edge_cents,
            slippage_cents: slippage,
            fee_version_hash: intent.fee_version_hash().to_string(),
            outcome,
            unwind_reason: self.unwind_reason,
            residual_contracts: self.exposure,
            opened_at: self.opened_at,
            closed_at: now,
        }
    }

    fn order_snapshot(&self, leg: &LegRuntime) -> OrderIntent {
        OrderIntent::new(
            leg.order.market().clone(),
            leg.order.side(),
            leg.order.limit_px(),
            self.qty(),
            self.opened_at,
            self.intent.deadline(),
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Leg {
    Primary,
    Hedge,
}

fn remaining_of(deadline: Instant) -> Duration {
    deadline.saturating_duration_since(Instant::now())
}

/// Receive the next fill, skipping lag markers. Parks forever when the
/// channel closes so the surrounding `select!` falls through to deadlines.
async fn next_fill(rx: &mut broadcast::Receiver<Fill>) -> Fill {
    loop {
        match rx.recv().await {
            Ok(fill) => return fill,
            Err(broadcast::error::RecvError::Lagged(_)) => {}
            Err(broadcast::error::RecvError::Closed) => {
                std::future::pending::<()>().await;
            }
        }
    }
}
