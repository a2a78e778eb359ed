//! Component construction from configuration.

use std::collections::HashMap;
use std::fs;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use tokio::sync::mpsc;
use tracing::info;
use url::Url;

use crate::app::config::Config;
use crate::app::orchestrator::handler::Pipeline;
use crate::app::state::AppState;
use crate::core::cache::{BarStore, BookCache};
use crate::core::domain::{Market, MarketId, MarketRef, VenueId};
use crate::core::execution::{ExecutionEngine, PositionLedger};
use crate::core::registry::{FeeRegistry, PairStore};
use crate::core::risk::{
    spawn_exposure_task, ExposureView, HedgeStats, LiveHedges, PnlTracker, RiskController,
};
use crate::core::service::{EventBus, JsonlTradeStore, MemoryTradeStore, TradeStore};
use crate::core::signal::{BarClose, LeadLagTracker, SignalEngine};
use crate::core::venue::{
    BookStream, CanonicalJsonCodec, OrderGateway, PaperGateway, ReconnectingBookStream,
    VenueHealthBoard, WsBookStream,
};
use crate::error::{ConfigError, Result};

/// A venue's book stream, boxed for the reader task.
pub struct VenueRuntime {
    pub venue: VenueId,
    pub stream: Box<dyn BookStream>,
}

/// Everything the orchestrator runs with.
pub struct Components {
    pub pipeline: Arc<Pipeline>,
    pub bar_close_rx: mpsc::Receiver<BarClose>,
    pub store: Arc<dyn TradeStore>,
    pub ledger: Arc<PositionLedger>,
}

/// Build the full component graph from configuration.
pub fn build_components(config: &Config) -> Result<Components> {
    let health = Arc::new(VenueHealthBoard::new());
    let state = Arc::new(AppState::new(Arc::clone(&health), config.dry_run));
    let bus = EventBus::new(config.bus_capacity);

    let cache = Arc::new(BookCache::new());
    let bars = Arc::new(BarStore::new(
        config.signal.bar_duration_ms,
        config.signal.bar_retention(),
    ));

    let pairs = Arc::new(PairStore::new(config.risk.pair_accept_score));
    let fees = Arc::new(FeeRegistry::new());
    fees.publish(config.venue_a.fee_pack());
    fees.publish(config.venue_b.fee_pack());

    let signal = Arc::new(SignalEngine::new(config.signal.signal_params()));
    let leadlag = Arc::new(LeadLagTracker::new(config.signal.leadlag_params()));
    let (bar_close_tx, bar_close_rx) = mpsc::channel(1_024);

    let live = LiveHedges::shared(config.risk.pairs_max);
    let exposure = Arc::new(ExposureView::new());
    let pnl = Arc::new(PnlTracker::new(config.risk.stop_limits()));
    let hedge_stats = Arc::new(HedgeStats::new());
    let risk = Arc::new(RiskController::new(
        config.risk.risk_params(
            config.signal.freshness_budget_ms,
            config.execution.hedge_timeout_ms,
        ),
        Arc::clone(&health),
        Arc::clone(&live),
        Arc::clone(&exposure),
        Arc::clone(&pnl),
        Arc::clone(&hedge_stats),
    ));

    // Risk's derived view of positions, fed by execution's bus events.
    spawn_exposure_task(Arc::clone(&exposure), bus.subscribe());

    let store: Arc<dyn TradeStore> = if config.dry_run {
        Arc::new(MemoryTradeStore::new())
    } else {
        Arc::new(JsonlTradeStore::open(&config.trade_store_path)?)
    };

    let ledger = Arc::new(PositionLedger::new());
    let gateways = build_gateways(config, &cache, &health);
    let engine = Arc::new(ExecutionEngine::new(
        gateways,
        Arc::clone(&cache),
        Arc::clone(&ledger),
        bus.clone(),
        Arc::clone(&store),
        live,
        hedge_stats,
        pnl,
        Arc::clone(&health),
        config.execution.execution_params(),
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
        engine,
        bus,
        health,
        state,
        freshness_budget_ms: config.signal.freshness_budget_ms,
    });

    Ok(Components {
        pipeline,
        bar_close_rx,
        store,
        ledger,
    })
}

/// Order gateways per venue. Paper mode simulates against the live books;
/// live venue gateways are plug-ins registered here by their crates.
fn build_gateways(
    config: &Config,
    cache: &Arc<BookCache>,
    health: &Arc<VenueHealthBoard>,
) -> HashMap<VenueId, Arc<dyn OrderGateway>> {
    let mut gateways: HashMap<VenueId, Arc<dyn OrderGateway>> = HashMap::new();
    for venue in [&config.venue_a, &config.venue_b] {
        let gateway = PaperGateway::new(
            venue.id.as_str(),
            Arc::clone(cache),
            Arc::clone(health),
            venue.fees.taker_bps,
        );
        gateways.insert(venue.venue_id(), Arc::new(gateway));
    }
    gateways
}

/// Build the two venue book streams (canonical WS feeds with reconnect).
pub fn build_venue_streams(config: &Config) -> Result<Vec<VenueRuntime>> {
    let mut runtimes = Vec::new();
    for venue in [&config.venue_a, &config.venue_b] {
        let url = Url::parse(&venue.ws_url).map_err(crate::error::Error::Url)?;
        let stream = WsBookStream::new(
            venue.id.as_str(),
            url,
            CanonicalJsonCodec::new(venue.id.as_str()),
        );
        let stream = ReconnectingBookStream::new(stream, (&config.reconnection).into());
        runtimes.push(VenueRuntime {
            venue: venue.venue_id(),
            stream: Box::new(stream),
        });
    }
    Ok(runtimes)
}

/// One pair as published by the external matcher.
#[derive(Debug, Deserialize)]
pub struct SeedMarket {
    pub venue: String,
    pub market_id: String,
    pub symbol: String,
    pub close_time: DateTime<Utc>,
    #[serde(default = "default_resolution_source")]
    pub resolution_source: String,
    #[serde(default = "default_true")]
    pub binary: bool,
    #[serde(default = "default_tick")]
    pub tick_cents: Decimal,
    #[serde(default = "default_lot")]
    pub lot_size: u64,
}

fn default_resolution_source() -> String {
    "matcher".into()
}

const fn default_true() -> bool {
    true
}

fn default_tick() -> Decimal {
    Decimal::ONE
}

const fn default_lot() -> u64 {
    1
}

#[derive(Debug, Deserialize)]
pub struct SeedPair {
    pub pair_id: String,
    pub similarity: Decimal,
    #[serde(default = "default_true")]
    pub rules_passed: bool,
    pub market_a: SeedMarket,
    pub market_b: SeedMarket,
}

impl SeedMarket {
    fn to_market(&self) -> Market {
        Market::new(
            MarketRef::new(self.venue.as_str(), self.market_id.as_str()),
            self.symbol.as_str(),
            self.close_time,
            self.resolution_source.as_str(),
            self.binary,
            self.tick_cents,
            self.lot_size,
        )
    }
}

/// Load the matcher's pair catalogue and ingest it into the store.
///
/// Returns the markets to subscribe, grouped by venue.
pub fn load_pairs(
    path: &str,
    pairs: &PairStore,
) -> Result<HashMap<VenueId, Vec<MarketId>>> {
    let contents = fs::read_to_string(path).map_err(ConfigError::ReadFile)?;
    let seeds: Vec<SeedPair> = serde_json::from_str(&contents)?;

    let mut by_venue: HashMap<VenueId, Vec<MarketId>> = HashMap::new();
    for seed in &seeds {
        let market_a = seed.market_a.to_market();
        let market_b = seed.market_b.to_market();
        pairs.ingest(
            seed.pair_id.as_str(),
            &market_a,
            &market_b,
            seed.similarity,
            seed.rules_passed,
        )?;
        for market in [&market_a, &market_b] {
            by_venue
                .entry(market.market_ref().venue().clone())
                .or_default()
                .push(market.market_ref().market_id().clone());
        }
    }
    info!(pairs = seeds.len(), path, "Pair catalogue loaded");
    Ok(by_venue)
}
