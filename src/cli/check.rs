//! The `check` subcommand: config validation and connectivity probes.

use std::time::Duration;

use owo_colors::OwoColorize;
use url::Url;

use crate::app::Config;
use crate::cli::{CheckArgs, Cli};
use crate::core::venue::RestClient;
use crate::error::Result;

/// Validate the configuration and probe both venues' REST health endpoints.
pub async fn check(cli: &Cli, args: &CheckArgs) -> Result<()> {
    let path = cli
        .config
        .clone()
        .unwrap_or_else(Config::default_path);
    let config = Config::load(&path)?;
    println!("{} config at {}", "ok".green(), path.display());

    println!(
        "  venues: {} / {}",
        config.venue_a.id.bold(),
        config.venue_b.id.bold()
    );
    println!(
        "  min edge {}c, hedge timeout {}ms, pairs max {}",
        config.risk.min_net_edge_cents,
        config.execution.hedge_timeout_ms,
        config.risk.pairs_max
    );

    if args.offline {
        return Ok(());
    }

    for venue in [&config.venue_a, &config.venue_b] {
        let base = Url::parse(&venue.api_url)?;
        let client = RestClient::new(venue.id.as_str(), base, Duration::from_secs(5))
            .map_err(crate::error::Error::Venue)?;
        match client.ping(&venue.health_path).await {
            Ok(()) => println!("{} {} reachable", "ok".green(), venue.id),
            Err(e) => println!("{} {} unreachable: {e}", "!!".red(), venue.id),
        }
    }

    Ok(())
}
