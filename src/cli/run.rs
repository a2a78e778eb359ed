//! The `run` subcommand.

use tokio::signal;
use tokio::sync::watch;
use tracing::{error, info};

use crate::app::{Config, Orchestrator};
use crate::cli::{banner, Cli, RunArgs};
use crate::error::Result;

/// Load config, apply CLI overrides, and run the trading loop until ctrl-c.
pub async fn run(cli: &Cli, args: &RunArgs) -> Result<()> {
    let path = cli
        .config
        .clone()
        .unwrap_or_else(Config::default_path);
    let mut config = Config::load(&path)?;

    if let Some(level) = &cli.log_level {
        config.logging.level = level.clone();
    }
    if args.json_logs {
        config.logging.format = "json".into();
    }
    if args.dry_run {
        config.dry_run = true;
    }
    if let Some(min_edge) = args.min_edge {
        config.risk.min_net_edge_cents = min_edge;
    }
    if let Some(qty) = args.qty {
        config.signal.intended_qty = qty;
    }

    config.init_logging();
    banner::print(args.no_banner);
    info!(config = %path.display(), "Configuration loaded");

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let streams = crate::app::build_venue_streams(&config)?;
    let (control_handle, control_rx) = crate::core::service::control_channel(64);
    // The handle outlives the loop; operator frontends would clone it.
    let _control = control_handle;

    tokio::select! {
        result = Orchestrator::run_with_streams(config, streams, control_rx, shutdown_rx) => {
            if let Err(e) = result {
                error!(error = %e, "Fatal error");
                return Err(e);
            }
        }
        _ = signal::ctrl_c() => {
            info!("Shutdown signal received");
            let _ = shutdown_tx.send(true);
        }
    }

    Ok(())
}
