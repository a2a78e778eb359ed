//! Per-venue connection and fee configuration.

use rust_decimal::Decimal;
use serde::Deserialize;

use crate::core::domain::{FeePack, Frictions, RoundingRule, VenueId};
use crate::core::venue::ReconnectPolicy;

/// Friction block of a venue's fee configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FrictionConfig {
    #[serde(default)]
    pub gas_cost_usd: Decimal,
    #[serde(default)]
    pub bridge_cost_usd: Decimal,
    #[serde(default)]
    pub onramp_bps: Decimal,
    #[serde(default)]
    pub fx_spread_bps: Decimal,
}

/// A venue's published fee schedule.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FeeConfig {
    #[serde(default)]
    pub taker_bps: Decimal,
    #[serde(default)]
    pub maker_bps: Decimal,
    #[serde(default)]
    pub profit_fee_bps: Decimal,
    #[serde(default)]
    pub rounding: RoundingRule,
    #[serde(default)]
    pub frictions: FrictionConfig,
}

/// Connection endpoints and fees for one venue.
#[derive(Debug, Clone, Deserialize)]
pub struct VenueConfig {
    /// Venue identifier used throughout the engine.
    pub id: String,
    /// Streaming book feed endpoint.
    pub ws_url: String,
    /// REST API root for order placement and health probes.
    pub api_url: String,
    /// Health probe path under `api_url`.
    #[serde(default = "default_health_path")]
    pub health_path: String,
    #[serde(default)]
    pub fees: FeeConfig,
}

fn default_health_path() -> String {
    "health".into()
}

impl VenueConfig {
    /// The venue ID.
    #[must_use]
    pub fn venue_id(&self) -> VenueId {
        VenueId::from(self.id.as_str())
    }

    /// Build the immutable fee pack published at startup.
    #[must_use]
    pub fn fee_pack(&self) -> FeePack {
        FeePack::new(
            self.id.as_str(),
            self.fees.taker_bps,
            self.fees.maker_bps,
            self.fees.profit_fee_bps,
            self.fees.rounding,
            Frictions {
                gas_cost_usd: self.fees.frictions.gas_cost_usd,
                bridge_cost_usd: self.fees.frictions.bridge_cost_usd,
                onramp_bps: self.fees.frictions.onramp_bps,
                fx_spread_bps: self.fees.frictions.fx_spread_bps,
            },
        )
    }
}

/// Reconnection policy configuration, shared by both venues.
#[derive(Debug, Clone, Deserialize)]
pub struct ReconnectionConfig {
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,
    #[serde(default = "default_jitter")]
    pub jitter: f64,
    #[serde(default = "default_down_after_failures")]
    pub down_after_failures: u32,
}

fn default_initial_delay_ms() -> u64 {
    1_000
}

fn default_max_delay_ms() -> u64 {
    30_000
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

fn default_jitter() -> f64 {
    0.1
}

fn default_down_after_failures() -> u32 {
    3
}

impl Default for ReconnectionConfig {
    fn default() -> Self {
        Self {
            initial_delay_ms: default_initial_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            backoff_multiplier: default_backoff_multiplier(),
            jitter: default_jitter(),
            down_after_failures: default_down_after_failures(),
        }
    }
}

impl From<&ReconnectionConfig> for ReconnectPolicy {
    fn from(config: &ReconnectionConfig) -> Self {
        Self {
            initial_delay_ms: config.initial_delay_ms,
            max_delay_ms: config.max_delay_ms,
            backoff_multiplier: config.backoff_multiplier,
            jitter: config.jitter,
            down_after_failures: config.down_after_failures,
        }
    }
}
