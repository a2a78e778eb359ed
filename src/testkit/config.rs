//! Canonical test configurations and a wired pipeline harness.

use std::collections::HashMap;
use std::sync::Arc;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tokio::sync::mpsc;

use crate::app::{AppState, Pipeline};
use crate::core::cache::{BarStore, BookCache};
use crate::core::domain::VenueId;
use crate::core::execution::{ExecutionEngine, ExecutionParams, PositionLedger};
use crate::core::registry::{FeeRegistry, PairStore};
use crate::core::risk::{
    ExposureView, HedgeStats, LiveHedges, PnlTracker, RiskController, RiskParams, StopLimits,
};
use crate::core::service::{EventBus, EventStream, MemoryTradeStore};
use crate::core::signal::{
    BarClose, LeadLagParams, LeadLagTracker, SignalEngine, SignalParams,
};
use crate::core::venue::{OrderGateway, VenueHealthBoard};
use crate::testkit::domain::{test_market, taker_only_pack};

/// Execution parameters fast enough for tests.
#[must_use]
pub fn fast_execution_params() -> ExecutionParams {
    ExecutionParams {
        hedge_timeout_ms: 250,
        unwind_budget_ms: 800,
        backoff_max_ms: 100,
        unwind_max_retries: 3,
        adverse_move_cents: dec!(1.5),
        adverse_move_duration_ms: 150,
    }
}

/// Risk parameters with spec defaults and a relaxed edge threshold.
#[must_use]
pub fn test_risk_params() -> RiskParams {
    RiskParams {
        min_net_edge_cents: dec!(1.5),
        freshness_budget_ms: 2_000,
        venue_cap_usd: dec!(5000),
        per_contract_exposure_usd: dec!(250),
        min_hedge_probability: 0.99,
        limit_slack_cents: Decimal::ZERO,
        hedge_timeout_ms: 250,
        stale_streak_limit: 3,
    }
}

/// A fully wired trading pipeline over mock gateways.
///
/// The canonical pair `p-1` (`alpha/mkt-a`, `beta/mkt-b`) is pre-ingested.
pub struct TestHarness {
    pub pipeline: Arc<Pipeline>,
    pub store: Arc<MemoryTradeStore>,
    pub ledger: Arc<PositionLedger>,
    pub health: Arc<VenueHealthBoard>,
    pub live: Arc<LiveHedges>,
    pub hedge_stats: Arc<HedgeStats>,
    pub pnl: Arc<PnlTracker>,
    pub engine: Arc<ExecutionEngine>,
    pub bar_close_rx: mpsc::Receiver<BarClose>,
}

/// Tunables for the harness.
pub struct TestHarnessBuilder {
    taker_bps_a: Decimal,
    taker_bps_b: Decimal,
    risk: RiskParams,
    execution: ExecutionParams,
    intended_qty: u64,
    dry_run: bool,
    pairs_max: usize,
    equity_usd: Decimal,
}

impl Default for TestHarnessBuilder {
    fn default() -> Self {
        Self {
            taker_bps_a: Decimal::ZERO,
            taker_bps_b: Decimal::ZERO,
            risk: test_risk_params(),
            execution: fast_execution_params(),
            intended_qty: 50,
            dry_run: false,
            pairs_max: 8,
            equity_usd: dec!(10000),
        }
    }
}

impl TestHarnessBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn taker_bps(mut self, venue_a: Decimal, venue_b: Decimal) -> Self {
        self.taker_bps_a = venue_a;
        self.taker_bps_b = venue_b;
        self
    }

    #[must_use]
    pub fn min_net_edge(mut self, cents: Decimal) -> Self {
        self.risk.min_net_edge_cents = cents;
        self
    }

    #[must_use]
    pub fn qty(mut self, qty: u64) -> Self {
        self.intended_qty = qty;
        self
    }

    #[must_use]
    pub fn hedge_timeout_ms(mut self, ms: u64) -> Self {
        self.risk.hedge_timeout_ms = ms;
        self.execution.hedge_timeout_ms = ms;
        self
    }

    #[must_use]
    pub fn execution_params(mut self, params: ExecutionParams) -> Self {
        self.risk.hedge_timeout_ms = params.hedge_timeout_ms;
        self.execution = params;
        self
    }

    #[must_use]
    pub fn risk_params(mut self, params: RiskParams) -> Self {
        self.execution.hedge_timeout_ms = params.hedge_timeout_ms;
        self.risk = params;
        self
    }

    #[must_use]
    pub fn pairs_max(mut self, max: usize) -> Self {
        self.pairs_max = max;
        self
    }

    #[must_use]
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Wire everything over the two gateways.
    #[must_use]
    pub fn build(
        self,
        gateway_a: Arc<dyn OrderGateway>,
        gateway_b: Arc<dyn OrderGateway>,
    ) -> TestHarness {
        let health = Arc::new(VenueHealthBoard::new());
        let state = Arc::new(AppState::new(Arc::clone(&health), self.dry_run));
        let bus = EventBus::new(1_024);
        let cache = Arc::new(BookCache::new());
        let bars = Arc::new(BarStore::new(5_000, 200));

        let pairs = Arc::new(PairStore::new(dec!(0.92)));
        pairs
            .ingest(
                "p-1",
                &test_market("alpha", "mkt-a"),
                &test_market("beta", "mkt-b"),
                dec!(0.95),
                true,
            )
            .unwrap();

        let fees = Arc::new(FeeRegistry::new());
        fees.publish(taker_only_pack("alpha", self.taker_bps_a));
        fees.publish(taker_only_pack("beta", self.taker_bps_b));

        let signal = Arc::new(SignalEngine::new(SignalParams {
            freshness_budget_ms: self.risk.freshness_budget_ms,
            intended_qty: self.intended_qty,
        }));
        let leadlag = Arc::new(LeadLagTracker::new(LeadLagParams {
            window_bars: 40,
            ..LeadLagParams::default()
        }));
        let (bar_close_tx, bar_close_rx) = mpsc::channel(64);

        let live = LiveHedges::shared(self.pairs_max);
        let exposure = Arc::new(ExposureView::new());
        let pnl = Arc::new(PnlTracker::new(StopLimits {
            equity_usd: self.equity_usd,
            daily_pct: dec!(1),
            weekly_pct: dec!(3),
            monthly_pct: dec!(5),
        }));
        let hedge_stats = Arc::new(HedgeStats::new());
        let risk = Arc::new(RiskController::new(
            self.risk.clone(),
            Arc::clone(&health),
            Arc::clone(&live),
            Arc::clone(&exposure),
            Arc::clone(&pnl),
            Arc::clone(&hedge_stats),
        ));
        crate::core::risk::spawn_exposure_task(Arc::clone(&exposure), bus.subscribe());

        let store = Arc::new(MemoryTradeStore::new());
        let store_port: Arc<dyn crate::core::service::TradeStore> = Arc::clone(&store);
        let ledger = Arc::new(PositionLedger::new());
        let mut gateways: HashMap<VenueId, Arc<dyn OrderGateway>> = HashMap::new();
        gateways.insert(gateway_a.venue().clone(), gateway_a);
        gateways.insert(gateway_b.venue().clone(), gateway_b);
        let engine = Arc::new(ExecutionEngine::new(
            gateways,
            Arc::clone(&cache),
            Arc::clone(&ledger),
            bus.clone(),
            store_port,
            Arc::clone(&live),
            Arc::clone(&hedge_stats),
            Arc::clone(&pnl),
            Arc::clone(&health),
            self.execution,
        ));

        let pipeline = Arc::new(Pipeline {
            cache,
            bars,
            pairs,
            fees,
            signal,
            risk,
            leadlag,
            bar_close_tx,
            engine: Arc::clone(&engine),
            bus,
            health: Arc::clone(&health),
            state,
            freshness_budget_ms: self.risk.freshness_budget_ms,
        });

        TestHarness {
            pipeline,
            store,
            ledger,
            health,
            live,
            hedge_stats,
            pnl,
            engine,
            bar_close_rx,
        }
    }
}

impl TestHarness {
    /// Subscribe to the bus.
    #[must_use]
    pub fn events(&self) -> EventStream {
        self.pipeline.bus.subscribe()
    }
}
