//! Command-line interface definitions.

pub mod banner;
mod check;
mod run;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use rust_decimal::Decimal;

pub use check::check;
pub use run::run;

/// pairtaker - cross-venue hedged taker engine.
#[derive(Parser, Debug)]
#[command(name = "pairtaker")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Override log level (debug, info, warn, error)
    #[arg(long)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the trading loop (foreground)
    Run(RunArgs),

    /// Validate configuration and probe venue connectivity
    Check(CheckArgs),
}

/// Arguments for the `run` subcommand.
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Skip ASCII art banner
    #[arg(long)]
    pub no_banner: bool,

    /// Use JSON log format instead of pretty
    #[arg(long)]
    pub json_logs: bool,

    /// Detect and admit but do not execute
    #[arg(long)]
    pub dry_run: bool,

    /// Override minimum net edge threshold, cents
    #[arg(long)]
    pub min_edge: Option<Decimal>,

    /// Override intended trade size, contracts
    #[arg(long)]
    pub qty: Option<u64>,
}

/// Arguments for the `check` subcommand.
#[derive(Parser, Debug)]
pub struct CheckArgs {
    /// Skip the venue connectivity probes
    #[arg(long)]
    pub offline: bool,
}
