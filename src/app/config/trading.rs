//! Signal, risk, and execution tunables.

use rust_decimal::Decimal;
use serde::Deserialize;

use crate::core::execution::ExecutionParams;
use crate::core::risk::{RiskParams, StopLimits};
use crate::core::signal::{LeadLagParams, SignalParams};

/// Signal engine configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SignalConfig {
    #[serde(default = "default_freshness_budget_ms")]
    pub freshness_budget_ms: u64,
    #[serde(default = "default_intended_qty")]
    pub intended_qty: u64,
    #[serde(default = "default_bar_duration_ms")]
    pub bar_duration_ms: u64,
    #[serde(default = "default_xcorr_window_bars")]
    pub xcorr_window_bars: usize,
    #[serde(default = "default_xcorr_max_lag_bars")]
    pub xcorr_max_lag_bars: usize,
}

fn default_freshness_budget_ms() -> u64 {
    2_000
}

fn default_intended_qty() -> u64 {
    100
}

fn default_bar_duration_ms() -> u64 {
    5_000
}

fn default_xcorr_window_bars() -> usize {
    120
}

fn default_xcorr_max_lag_bars() -> usize {
    6
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self {
            freshness_budget_ms: default_freshness_budget_ms(),
            intended_qty: default_intended_qty(),
            bar_duration_ms: default_bar_duration_ms(),
            xcorr_window_bars: default_xcorr_window_bars(),
            xcorr_max_lag_bars: default_xcorr_max_lag_bars(),
        }
    }
}

impl SignalConfig {
    /// Parameters for the signal engine.
    #[must_use]
    pub fn signal_params(&self) -> SignalParams {
        SignalParams {
            freshness_budget_ms: self.freshness_budget_ms,
            intended_qty: self.intended_qty,
        }
    }

    /// Parameters for the lead-lag tracker.
    #[must_use]
    pub fn leadlag_params(&self) -> LeadLagParams {
        LeadLagParams {
            window_bars: self.xcorr_window_bars,
            max_lag_bars: self.xcorr_max_lag_bars,
            ..LeadLagParams::default()
        }
    }

    /// Bars retained per market: the correlation window plus lag headroom.
    #[must_use]
    pub fn bar_retention(&self) -> usize {
        self.xcorr_window_bars + 2 * self.xcorr_max_lag_bars
    }
}

/// Risk/admission configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct RiskConfig {
    #[serde(default = "default_min_net_edge_cents")]
    pub min_net_edge_cents: Decimal,
    #[serde(default = "default_pairs_max")]
    pub pairs_max: usize,
    #[serde(default = "default_venue_cap_usd")]
    pub venue_cap_usd: Decimal,
    #[serde(default = "default_per_contract_exposure_usd")]
    pub per_contract_exposure_usd: Decimal,
    #[serde(default = "default_min_hedge_probability")]
    pub min_hedge_probability: f64,
    #[serde(default)]
    pub limit_slack_cents: Decimal,
    #[serde(default = "default_equity_usd")]
    pub equity_usd: Decimal,
    #[serde(default = "default_stops_daily_pct")]
    pub stops_daily_pct: Decimal,
    #[serde(default = "default_stops_weekly_pct")]
    pub stops_weekly_pct: Decimal,
    #[serde(default = "default_stops_monthly_pct")]
    pub stops_monthly_pct: Decimal,
    #[serde(default = "default_stale_streak_limit")]
    pub stale_streak_limit: u32,
    #[serde(default = "default_pair_accept_score")]
    pub pair_accept_score: Decimal,
}

fn default_min_net_edge_cents() -> Decimal {
    Decimal::new(25, 1) // 2.5
}

fn default_pairs_max() -> usize {
    8
}

fn default_venue_cap_usd() -> Decimal {
    Decimal::from(5_000)
}

fn default_per_contract_exposure_usd() -> Decimal {
    Decimal::from(250)
}

fn default_min_hedge_probability() -> f64 {
    0.99
}

fn default_equity_usd() -> Decimal {
    Decimal::from(10_000)
}

fn default_stops_daily_pct() -> Decimal {
    Decimal::ONE
}

fn default_stops_weekly_pct() -> Decimal {
    Decimal::from(3)
}

fn default_stops_monthly_pct() -> Decimal {
    Decimal::from(5)
}

fn default_stale_streak_limit() -> u32 {
    3
}

fn default_pair_accept_score() -> Decimal {
    Decimal::new(92, 2) // 0.92
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            min_net_edge_cents: default_min_net_edge_cents(),
            pairs_max: default_pairs_max(),
            venue_cap_usd: default_venue_cap_usd(),
            per_contract_exposure_usd: default_per_contract_exposure_usd(),
            min_hedge_probability: default_min_hedge_probability(),
            limit_slack_cents: Decimal::ZERO,
            equity_usd: default_equity_usd(),
            stops_daily_pct: default_stops_daily_pct(),
            stops_weekly_pct: default_stops_weekly_pct(),
            stops_monthly_pct: default_stops_monthly_pct(),
            stale_streak_limit: default_stale_streak_limit(),
            pair_accept_score: default_pair_accept_score(),
        }
    }
}

impl RiskConfig {
    /// Parameters for the admission controller.
    #[must_use]
    pub fn risk_params(&self, freshness_budget_ms: u64, hedge_timeout_ms: u64) -> RiskParams {
        RiskParams {
            min_net_edge_cents: self.min_net_edge_cents,
            freshness_budget_ms,
            venue_cap_usd: self.venue_cap_usd,
            per_contract_exposure_usd: self.per_contract_exposure_usd,
            min_hedge_probability: self.min_hedge_probability,
            limit_slack_cents: self.limit_slack_cents,
            hedge_timeout_ms,
            stale_streak_limit: self.stale_streak_limit,
        }
    }

    /// Drawdown stop limits.
    #[must_use]
    pub fn stop_limits(&self) -> StopLimits {
        StopLimits {
            equity_usd: self.equity_usd,
            daily_pct: self.stops_daily_pct,
            weekly_pct: self.stops_weekly_pct,
            monthly_pct: self.stops_monthly_pct,
        }
    }
}

/// Execution engine configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ExecutionConfig {
    #[serde(default = "default_hedge_timeout_ms")]
    pub hedge_timeout_ms: u64,
    #[serde(default = "default_unwind_budget_ms")]
    pub unwind_budget_ms: u64,
    #[serde(default = "default_backoff_max_ms")]
    pub backoff_max_ms: u64,
    #[serde(default = "default_unwind_max_retries")]
    pub unwind_max_retries: u32,
    #[serde(default = "default_adverse_move_cents")]
    pub adverse_move_cents: Decimal,
    #[serde(default = "default_adverse_move_duration_ms")]
    pub adverse_move_duration_ms: u64,
}

fn default_hedge_timeout_ms() -> u64 {
    250
}

fn default_unwind_budget_ms() -> u64 {
    800
}

fn default_backoff_max_ms() -> u64 {
    800
}

fn default_unwind_max_retries() -> u32 {
    3
}

fn default_adverse_move_cents() -> Decimal {
    Decimal::new(15, 1) // 1.5
}

fn default_adverse_move_duration_ms() -> u64 {
    5_000
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            hedge_timeout_ms: default_hedge_timeout_ms(),
            unwind_budget_ms: default_unwind_budget_ms(),
            backoff_max_ms: default_backoff_max_ms(),
            unwind_max_retries: default_unwind_max_retries(),
            adverse_move_cents: default_adverse_move_cents(),
            adverse_move_duration_ms: default_adverse_move_duration_ms(),
        }
    }
}

impl ExecutionConfig {
    /// Parameters for the execution engine.
    #[must_use]
    pub fn execution_params(&self) -> ExecutionParams {
        ExecutionParams {
            hedge_timeout_ms: self.hedge_timeout_ms,
            unwind_budget_ms: self.unwind_budget_ms,
            backoff_max_ms: self.backoff_max_ms,
            unwind_max_retries: self.unwind_max_retries,
            adverse_move_cents: self.adverse_move_cents,
            adverse_move_duration_ms: self.adverse_move_duration_ms,
        }
    }
}
