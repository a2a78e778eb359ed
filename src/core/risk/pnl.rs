//! Rolling realised-PnL tracking against drawdown stops.

use std::collections::VecDeque;

use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use rust_decimal::Decimal;
use tracing::warn;

use crate::core::domain::Notional;

/// Which stop window tripped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopWindow {
    Daily,
    Weekly,
    Monthly,
}

impl std::fmt::Display for StopWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Daily => write!(f, "daily"),
            Self::Weekly => write!(f, "weekly"),
            Self::Monthly => write!(f, "monthly"),
        }
    }
}

/// Drawdown stop thresholds as percentages of equity.
#[derive(Debug, Clone)]
pub struct StopLimits {
    pub equity_usd: Notional,
    pub daily_pct: Decimal,
    pub weekly_pct: Decimal,
    pub monthly_pct: Decimal,
}

struct Entry {
    at: DateTime<Utc>,
    pnl: Notional,
}

/// Append-only realised-PnL ledger with rolling window sums.
///
/// Entries older than the monthly window are pruned on record.
pub struct PnlTracker {
    limits: StopLimits,
    entries: RwLock<VecDeque<Entry>>,
}

impl PnlTracker {
    /// Create a tracker with the given limits.
    #[must_use]
    pub fn new(limits: StopLimits) -> Self {
        Self {
            limits,
            entries: RwLock::new(VecDeque::new()),
        }
    }

    /// Record a realised PnL amount (negative for losses).
    pub fn record(&self, pnl: Notional, at: DateTime<Utc>) {
        let mut entries = self.entries.write();
        entries.push_back(Entry { at, pnl });
        let horizon = at - Duration::days(31);
        while entries.front().is_some_and(|e| e.at < horizon) {
            entries.pop_front();
        }
    }

    fn window_pnl(&self, now: DateTime<Utc>, window: Duration) -> Notional {
        let cutoff = now - window;
        self.entries
            .read()
            .iter()
            .filter(|e| e.at >= cutoff)
            .map(|e| e.pnl)
            .sum()
    }

    /// Check the daily/weekly/monthly stops; returns the first window whose
    /// loss exceeds its threshold.
    #[must_use]
    pub fn tripped_stop(&self, now: DateTime<Utc>) -> Option<StopWindow> {
        let checks = [
            (StopWindow::Daily, Duration::days(1), self.limits.daily_pct),
            (StopWindow::Weekly, Duration::days(7), self.limits.weekly_pct),
            (
                StopWindow::Monthly,
                Duration::days(30),
                self.limits.monthly_pct,
            ),
        ];
        for (window, span, pct) in checks {
            let pnl = self.window_pnl(now, span);
            let threshold = -self.limits.equity_usd * pct / Decimal::ONE_HUNDRED;
            if pnl <= threshold {
                warn!(window = %window, pnl = %pnl, threshold = %threshold, "Drawdown stop tripped");
                return Some(window);
            }
        }
        None
    }
}
