//! Lead-lag routing hints from rolling cross-correlation of mid bars.
//!
//! The tracker correlates the two legs' closed-bar mid series across lags.
//! A positive-lag argmax means venue A's moves precede venue B's, so the
//! execution engine should hit A first. The hint orders execution only; it
//! never overrides admission.

use std::collections::VecDeque;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, trace};

use crate::core::cache::{to_f64_series, Bar, BarStore};
use crate::core::domain::{MarketRef, PairId, VenueId};
use crate::core::registry::PairStore;

/// Lead-lag tracker parameters.
#[derive(Debug, Clone)]
pub struct LeadLagParams {
    /// Bars per correlation window.
    pub window_bars: usize,
    /// Maximum lag examined, in bars, each direction.
    pub max_lag_bars: usize,
    /// Window evaluations kept for the stability filter.
    pub stability_window: usize,
    /// Evaluations that must agree for a leader to be named.
    pub stability_required: usize,
}

impl Default for LeadLagParams {
    fn default() -> Self {
        Self {
            window_bars: 120,
            max_lag_bars: 6,
            stability_window: 4,
            stability_required: 3,
        }
    }
}

/// The current routing hint for a pair.
#[derive(Debug, Clone)]
pub struct LeaderHint {
    /// The leading venue, when one is stable.
    pub leader: Option<VenueId>,
    /// Peak cross-correlation behind the hint.
    pub confidence: f64,
    /// Lag at the peak, in bars; positive means venue A leads.
    pub lag_bars: i32,
}

impl LeaderHint {
    /// The neutral hint: no leader.
    #[must_use]
    pub const fn none() -> Self {
        Self {
            leader: None,
            confidence: 0.0,
            lag_bars: 0,
        }
    }
}

impl Default for LeaderHint {
    fn default() -> Self {
        Self::none()
    }
}

/// Pearson correlation of two equal-length series.
///
/// Returns 0.0 for degenerate series (constant or too short).
#[must_use]
pub fn pearson(x: &[f64], y: &[f64]) -> f64 {
    let n = x.len().min(y.len());
    if n < 2 {
        return 0.0;
    }
    let nf = n as f64;
    let mean_x = x[..n].iter().sum::<f64>() / nf;
    let mean_y = y[..n].iter().sum::<f64>() / nf;

    let mut cov = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for i in 0..n {
        let dx = x[i] - mean_x;
        let dy = y[i] - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }
    if var_x <= f64::EPSILON || var_y <= f64::EPSILON {
        return 0.0;
    }
    cov / (var_x * var_y).sqrt()
}

/// Correlation of `a` against `b` shifted by `lag` bars.
///
/// Positive lag compares `a[t]` with `b[t + lag]`: series A moving first.
fn lagged_correlation(a: &[f64], b: &[f64], lag: i32) -> f64 {
    let n = a.len().min(b.len());
    let shift = lag.unsigned_abs() as usize;
    if shift >= n {
        return 0.0;
    }
    if lag >= 0 {
        pearson(&a[..n - shift], &b[shift..n])
    } else {
        pearson(&a[shift..n], &b[..n - shift])
    }
}

/// One window evaluation: the candidate leader before stability filtering.
#[derive(Debug, Clone)]
struct Evaluation {
    candidate: Option<VenueId>,
    confidence: f64,
    lag_bars: i32,
}

/// Rolling lead-lag state per pair.
pub struct LeadLagTracker {
    params: LeadLagParams,
    history: DashMap<PairId, VecDeque<Option<VenueId>>>,
    hints: DashMap<PairId, LeaderHint>,
}

impl LeadLagTracker {
    /// Create a tracker with the given parameters.
    #[must_use]
    pub fn new(params: LeadLagParams) -> Self {
        Self {
            params,
            history: DashMap::new(),
            hints: DashMap::new(),
        }
    }

    /// The current hint for a pair (neutral when never evaluated).
    #[must_use]
    pub fn hint(&self, pair_id: &PairId) -> LeaderHint {
        self.hints
            .get(pair_id)
            .map(|h| h.clone())
            .unwrap_or_default()
    }

    /// Run one window evaluation from aligned bar series and update the
    /// pair's hint through the stability filter.
    pub fn evaluate(
        &self,
        pair_id: &PairId,
        venue_a: &VenueId,
        venue_b: &VenueId,
        bars_a: &[Bar],
        bars_b: &[Bar],
    ) -> LeaderHint {
        let evaluation = self.evaluate_window(venue_a, venue_b, bars_a, bars_b);

        let mut history = self.history.entry(pair_id.clone()).or_default();
        history.push_back(evaluation.candidate.clone());
        while history.len() > self.params.stability_window {
            history.pop_front();
        }

        // Leader must agree in `stability_required` of the kept windows.
        let stable = evaluation.candidate.as_ref().filter(|candidate| {
            history
                .iter()
                .filter(|entry| entry.as_ref() == Some(candidate))
                .count()
                >= self.params.stability_required
        });

        let hint = LeaderHint {
            leader: stable.cloned(),
            confidence: evaluation.confidence,
            lag_bars: evaluation.lag_bars,
        };
        drop(history);

        trace!(
            pair_id = %pair_id,
            leader = ?hint.leader,
            confidence = hint.confidence,
            lag_bars = hint.lag_bars,
            "Lead-lag evaluated"
        );
        self.hints.insert(pair_id.clone(), hint.clone());
        hint
    }

    fn evaluate_window(
        &self,
        venue_a: &VenueId,
        venue_b: &VenueId,
        bars_a: &[Bar],
        bars_b: &[Bar],
    ) -> Evaluation {
        let aligned = align(bars_a, bars_b, self.params.window_bars);
        let min_bars = self.params.max_lag_bars * 2 + 4;
        if aligned.0.len() < min_bars {
            return Evaluation {
                candidate: None,
                confidence: 0.0,
                lag_bars: 0,
            };
        }
        let (series_a, series_b) = aligned;

        let max_lag = self.params.max_lag_bars as i32;
        let mut best_lag = 0;
        let mut best_corr = 0.0_f64;
        for lag in -max_lag..=max_lag {
            let corr = lagged_correlation(&series_a, &series_b, lag);
            if corr > best_corr {
                best_corr = corr;
                best_lag = lag;
            }
        }

        // Lag zero or no positive correlation names no leader.
        let candidate = if best_corr > 0.0 && best_lag > 0 {
            Some(venue_a.clone())
        } else if best_corr > 0.0 && best_lag < 0 {
            Some(venue_b.clone())
        } else {
            None
        };

        Evaluation {
            candidate,
            confidence: best_corr,
            lag_bars: best_lag,
        }
    }
}

/// Intersect two bar series on the fixed bar grid, keeping the most recent
/// `window` aligned observations.
fn align(bars_a: &[Bar], bars_b: &[Bar], window: usize) -> (Vec<f64>, Vec<f64>) {
    let a = to_f64_series(bars_a);
    let b = to_f64_series(bars_b);
    let mut out_a = Vec::new();
    let mut out_b = Vec::new();

    let mut i = 0;
    let mut j = 0;
    while i < a.len() && j < b.len() {
        match a[i].0.cmp(&b[j].0) {
            std::cmp::Ordering::Less => i += 1,
            std::cmp::Ordering::Greater => j += 1,
            std::cmp::Ordering::Equal => {
                out_a.push(a[i].1);
                out_b.push(b[j].1);
                i += 1;
                j += 1;
            }
        }
    }

    let skip = out_a.len().saturating_sub(window);
    (out_a.split_off(skip), out_b.split_off(skip))
}

/// A bar-close notification for the worker.
#[derive(Debug, Clone)]
pub struct BarClose {
    /// The market whose bar closed.
    pub market: MarketRef,
}

/// Spawn the lead-lag worker.
///
/// Cross-correlation is the one CPU-heavy computation in the loop, so it
/// runs here rather than on the trading path. Each bar close re-evaluates
/// every active pair touching the market.
pub fn spawn_worker(
    tracker: Arc<LeadLagTracker>,
    bars: Arc<BarStore>,
    pairs: Arc<PairStore>,
    mut rx: mpsc::Receiver<BarClose>,
) -> JoinHandle<()> {
    let window = tracker.params.window_bars + tracker.params.max_lag_bars;
    tokio::spawn(async move {
        while let Some(close) = rx.recv().await {
            let snapshot = pairs.snapshot();
            for pair in snapshot.pairs_for_market(&close.market) {
                let bars_a = bars.recent(pair.market_a(), window);
                let bars_b = bars.recent(pair.market_b(), window);
                let hint = tracker.evaluate(
                    pair.pair_id(),
                    pair.market_a().venue(),
                    pair.market_b().venue(),
                    &bars_a,
                    &bars_b,
                );
                debug!(
                    pair_id = %pair.pair_id(),
                    leader = ?hint.leader,
                    "Leader hint updated"
                );
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn bars_from(values: &[f64], start_ms: i64) -> Vec<Bar> {
        values
            .iter()
            .enumerate()
            .map(|(i, v)| Bar {
                start_ms: start_ms + (i as i64) * 5_000,
                mid: Decimal::try_from(*v).unwrap(),
            })
            .collect()
    }

    /// A noisy-ish ramp: B trails A by `lag` bars.
    fn leading_series(len: usize, lag: usize) -> (Vec<f64>, Vec<f64>) {
        let base: Vec<f64> = (0..len + lag)
            .map(|i| 50.0 + 10.0 * ((i as f64) * 0.37).sin())
            .collect();
        let a = base[lag..].to_vec();
        let b = base[..len].to_vec();
        (a, b)
    }

    fn params() -> LeadLagParams {
        LeadLagParams {
            window_bars: 40,
            max_lag_bars: 6,
            stability_window: 4,
            stability_required: 3,
        }
    }

    #[test]
    fn test_pearson_perfect_correlation() {
        let x = [1.0, 2.0, 3.0, 4.0];
        let y = [2.0, 4.0, 6.0, 8.0];
        assert!((pearson(&x, &y) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_pearson_degenerate_series() {
        let x = [5.0, 5.0, 5.0];
        let y = [1.0, 2.0, 3.0];
        assert_eq!(pearson(&x, &y), 0.0);
    }

    #[test]
    fn test_leader_detected_with_stability() {
        let tracker = LeadLagTracker::new(params());
        let pair_id = PairId::from("p-1");
        let venue_a = VenueId::from("alpha");
        let venue_b = VenueId::from("beta");
        let (a, b) = leading_series(40, 2);
        let bars_a = bars_from(&a, 0);
        let bars_b = bars_from(&b, 0);

        // First two windows: candidate seen but not yet stable.
        let hint = tracker.evaluate(&pair_id, &venue_a, &venue_b, &bars_a, &bars_b);
        assert_eq!(hint.leader, None);
        tracker.evaluate(&pair_id, &venue_a, &venue_b, &bars_a, &bars_b);

        // Third agreeing window crosses the 3-of-4 bar.
        let hint = tracker.evaluate(&pair_id, &venue_a, &venue_b, &bars_a, &bars_b);
        assert_eq!(hint.leader, Some(venue_a.clone()));
        assert!(hint.lag_bars > 0);
        assert!(hint.confidence > 0.9);
    }

    #[test]
    fn test_mirror_series_names_other_venue() {
        let tracker = LeadLagTracker::new(params());
        let pair_id = PairId::from("p-1");
        let venue_a = VenueId::from("alpha");
        let venue_b = VenueId::from("beta");
        // B leads A: feed the shifted series the other way round.
        let (b_leads, a_trails) = leading_series(40, 2);
        let bars_a = bars_from(&a_trails, 0);
        let bars_b = bars_from(&b_leads, 0);

        for _ in 0..3 {
            tracker.evaluate(&pair_id, &venue_a, &venue_b, &bars_a, &bars_b);
        }
        let hint = tracker.hint(&pair_id);
        assert_eq!(hint.leader, Some(venue_b));
        assert!(hint.lag_bars < 0);
    }

    #[test]
    fn test_flapping_candidate_is_filtered() {
        let tracker = LeadLagTracker::new(params());
        let pair_id = PairId::from("p-1");
        let venue_a = VenueId::from("alpha");
        let venue_b = VenueId::from("beta");

        let (a_leads, b_trails) = leading_series(40, 2);
        let (b_leads, a_trails) = leading_series(40, 2);

        // Alternate directions: no 3-of-4 agreement can form.
        for i in 0..4 {
            if i % 2 == 0 {
                tracker.evaluate(
                    &pair_id,
                    &venue_a,
                    &venue_b,
                    &bars_from(&a_leads, 0),
                    &bars_from(&b_trails, 0),
                );
            } else {
                tracker.evaluate(
                    &pair_id,
                    &venue_a,
                    &venue_b,
                    &bars_from(&a_trails, 0),
                    &bars_from(&b_leads, 0),
                );
            }
        }
        assert_eq!(tracker.hint(&pair_id).leader, None);
    }

    #[test]
    fn test_short_series_yields_no_candidate() {
        let tracker = LeadLagTracker::new(params());
        let pair_id = PairId::from("p-1");
        let (a, b) = leading_series(6, 1);
        let hint = tracker.evaluate(
            &pair_id,
            &VenueId::from("alpha"),
            &VenueId::from("beta"),
            &bars_from(&a, 0),
            &bars_from(&b, 0),
        );
        assert_eq!(hint.leader, None);
        assert_eq!(hint.confidence, 0.0);
    }
}
