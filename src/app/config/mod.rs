//! Application configuration loading and validation.
//!
//! Configuration is loaded from a TOML file; `PAIRTAKER_*` environment
//! variables override selected values. Every tunable is serde-defaulted so
//! a minimal file (two venues) runs with spec defaults.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{ConfigError, Result};

mod logging;
mod trading;
mod venue;

pub use logging::LoggingConfig;
pub use trading::{ExecutionConfig, RiskConfig, SignalConfig};
pub use venue::{FeeConfig, FrictionConfig, ReconnectionConfig, VenueConfig};

/// Main application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Venue A connection and fees.
    pub venue_a: VenueConfig,
    /// Venue B connection and fees.
    pub venue_b: VenueConfig,
    #[serde(default)]
    pub signal: SignalConfig,
    #[serde(default)]
    pub risk: RiskConfig,
    #[serde(default)]
    pub execution: ExecutionConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub reconnection: ReconnectionConfig,
    /// Event bus queue depth per subscriber.
    #[serde(default = "default_bus_capacity")]
    pub bus_capacity: usize,
    /// Path to the JSONL trade store.
    #[serde(default = "default_trade_store_path")]
    pub trade_store_path: String,
    /// Path to the pair seed file published by the matcher.
    #[serde(default)]
    pub pairs_file: Option<String>,
    /// Seconds between position snapshots to the trade store.
    #[serde(default = "default_position_snapshot_secs")]
    pub position_snapshot_secs: u64,
    /// Detect and admit but do not execute.
    #[serde(default)]
    pub dry_run: bool,
}

fn default_bus_capacity() -> usize {
    1_024
}

fn default_trade_store_path() -> String {
    "pairtaker-trades.jsonl".into()
}

fn default_position_snapshot_secs() -> u64 {
    60
}

impl Config {
    /// Load from a TOML file with environment overrides.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let contents = fs::read_to_string(path.as_ref()).map_err(ConfigError::ReadFile)?;
        let mut config: Self =
            toml::from_str(&contents).map_err(ConfigError::Parse)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Default config file location: `./pairtaker.toml`, falling back to
    /// the user config directory.
    #[must_use]
    pub fn default_path() -> PathBuf {
        let local = PathBuf::from("pairtaker.toml");
        if local.exists() {
            return local;
        }
        dirs::config_dir()
            .map(|dir| dir.join("pairtaker").join("pairtaker.toml"))
            .unwrap_or(local)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(level) = std::env::var("PAIRTAKER_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Ok(path) = std::env::var("PAIRTAKER_TRADE_STORE") {
            self.trade_store_path = path;
        }
        if std::env::var("PAIRTAKER_DRY_RUN").is_ok_and(|v| v == "1" || v == "true") {
            self.dry_run = true;
        }
    }

    /// Validate cross-field invariants.
    pub fn validate(&self) -> Result<()> {
        if self.venue_a.id == self.venue_b.id {
            return Err(ConfigError::Invalid {
                field: "venue_b.id",
                reason: "venues must be distinct".into(),
            }
            .into());
        }
        for (field, venue) in [("venue_a", &self.venue_a), ("venue_b", &self.venue_b)] {
            if venue.id.trim().is_empty() {
                return Err(ConfigError::Invalid {
                    field,
                    reason: "venue id is empty".into(),
                }
                .into());
            }
            url::Url::parse(&venue.ws_url).map_err(|e| ConfigError::Invalid {
                field,
                reason: format!("bad ws_url: {e}"),
            })?;
            url::Url::parse(&venue.api_url).map_err(|e| ConfigError::Invalid {
                field,
                reason: format!("bad api_url: {e}"),
            })?;
        }
        if self.signal.intended_qty == 0 {
            return Err(ConfigError::Invalid {
                field: "signal.intended_qty",
                reason: "must be positive".into(),
            }
            .into());
        }
        if self.risk.pairs_max == 0 {
            return Err(ConfigError::Invalid {
                field: "risk.pairs_max",
                reason: "must be positive".into(),
            }
            .into());
        }
        if !(0.0..=1.0).contains(&self.risk.min_hedge_probability) {
            return Err(ConfigError::Invalid {
                field: "risk.min_hedge_probability",
                reason: "must be in [0, 1]".into(),
            }
            .into());
        }
        Ok(())
    }

    /// Initialize logging per this config.
    pub fn init_logging(&self) {
        self.logging.init();
    }
}
