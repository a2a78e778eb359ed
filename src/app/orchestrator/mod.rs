//! App orchestration: wiring the venue readers, the trading loop, the
//! lead-lag worker, and the operator control surface.

mod builder;
mod handler;

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tracing::{error, info, warn};

use crate::app::config::Config;
use crate::core::domain::VenueId;
use crate::core::service::{control_channel, ControlHandle, OperatorCommand};
use crate::core::signal::spawn_worker;
use crate::core::venue::{BookStream, VenueEvent};
use crate::error::Result;

pub use builder::{
    build_components, build_venue_streams, load_pairs, Components, SeedMarket, SeedPair,
    VenueRuntime,
};
pub use handler::Pipeline;

/// Main application orchestrator.
pub struct Orchestrator;

impl Orchestrator {
    /// Run until shutdown with a dormant control surface.
    pub async fn run(config: Config) -> Result<()> {
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);
        let streams = build_venue_streams(&config)?;
        let (handle, control_rx) = control_channel(64);
        // Keep the handle alive so the control channel stays open.
        let _handle: ControlHandle = handle;
        Self::run_with_streams(config, streams, control_rx, shutdown_rx).await
    }

    /// Run with externally supplied venue streams (plug-ins or mocks), an
    /// operator command feed, and a shutdown signal.
    pub async fn run_with_streams(
        config: Config,
        streams: Vec<VenueRuntime>,
        mut control_rx: mpsc::Receiver<OperatorCommand>,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<()> {
        info!(
            venue_a = %config.venue_a.id,
            venue_b = %config.venue_b.id,
            dry_run = config.dry_run,
            "Starting pairtaker"
        );

        let Components {
            pipeline,
            bar_close_rx,
            store,
            ledger,
        } = build_components(&config)?;

        // Pair catalogue from the matcher.
        let mut markets_by_venue = std::collections::HashMap::new();
        if let Some(path) = &config.pairs_file {
            markets_by_venue = load_pairs(path, &pipeline.pairs)?;
        } else {
            warn!("No pairs file configured; waiting on control plane only");
        }

        // Lead-lag worker (the one CPU-heavy computation off the hot path).
        let _leadlag_worker = spawn_worker(
            Arc::clone(&pipeline.leadlag),
            Arc::clone(&pipeline.bars),
            Arc::clone(&pipeline.pairs),
            bar_close_rx,
        );

        // One reader task per venue, feeding the single trading-loop task.
        let (event_tx, mut event_rx) = mpsc::channel::<(VenueId, VenueEvent)>(1_024);
        for runtime in streams {
            let subscriptions = markets_by_venue
                .get(&runtime.venue)
                .cloned()
                .unwrap_or_default();
            spawn_reader(runtime, subscriptions, event_tx.clone());
        }
        drop(event_tx);

        // Periodic position snapshots to the trade store.
        let snapshot_store = Arc::clone(&store);
        let snapshot_ledger = Arc::clone(&ledger);
        let snapshot_period = Duration::from_secs(config.position_snapshot_secs.max(1));
        let _snapshot_task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(snapshot_period);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if let Err(e) = snapshot_store.snapshot_positions(&snapshot_ledger.snapshot()) {
                    error!(error = %e, "Position snapshot failed");
                }
            }
        });

        // The trading loop proper.
        let mut control_open = true;
        loop {
            tokio::select! {
                maybe_event = event_rx.recv() => {
                    match maybe_event {
                        Some((venue, event)) => pipeline.handle_venue_event(&venue, event),
                        None => {
                            warn!("All venue readers stopped");
                            break;
                        }
                    }
                }
                maybe_command = control_rx.recv(), if control_open => {
                    match maybe_command {
                        Some(command) => pipeline.handle_control(command),
                        None => control_open = false,
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        info!("Shutdown requested");
                        break;
                    }
                }
            }
        }

        // Final position snapshot on the way out.
        if let Err(e) = store.snapshot_positions(&ledger.snapshot()) {
            error!(error = %e, "Final position snapshot failed");
        }
        info!("pairtaker stopped");
        Ok(())
    }
}

/// Spawn the reader task for one venue stream.
fn spawn_reader(
    mut runtime: VenueRuntime,
    subscriptions: Vec<crate::core::domain::MarketId>,
    tx: mpsc::Sender<(VenueId, VenueEvent)>,
) {
    tokio::spawn(async move {
        let venue = runtime.venue.clone();
        if let Err(e) = runtime.stream.connect().await {
            warn!(venue = %venue, error = %e, "Initial connect failed, will retry");
        }
        if !subscriptions.is_empty() {
            // The reconnect wrapper remembers the set even when this send
            // fails; it resubscribes after the next successful connect.
            if let Err(e) = runtime.stream.subscribe(&subscriptions).await {
                warn!(venue = %venue, error = %e, "Initial subscribe failed");
            }
        }

        while let Some(event) = runtime.stream.next_event().await {
            if tx.send((venue.clone(), event)).await.is_err() {
                break;
            }
        }
        info!(venue = %venue, "Venue reader stopped");
    });
}
