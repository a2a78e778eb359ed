//! Per-market position accounting.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::market::{MarketRef, Side};
use super::money::{notional_usd, Cents, Notional};

/// Running nets for one `(venue, market)` cell.
///
/// Mutated only by the execution ledger on confirmed fills.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    qty_yes: u64,
    qty_no: u64,
    avg_px_yes: Cents,
    avg_px_no: Cents,
}

impl Position {
    /// YES contracts held.
    #[must_use]
    pub const fn qty_yes(&self) -> u64 {
        self.qty_yes
    }

    /// NO contracts held.
    #[must_use]
    pub const fn qty_no(&self) -> u64 {
        self.qty_no
    }

    /// Average YES entry price in cents.
    #[must_use]
    pub const fn avg_px_yes(&self) -> Cents {
        self.avg_px_yes
    }

    /// Average NO entry price in cents.
    #[must_use]
    pub const fn avg_px_no(&self) -> Cents {
        self.avg_px_no
    }

    /// Apply a confirmed fill, updating the running average for the side.
    pub fn apply(&mut self, side: Side, px: Cents, qty: u64) {
        match side {
            Side::BuyYes => {
                self.avg_px_yes = Self::next_avg(self.avg_px_yes, self.qty_yes, px, qty);
                self.qty_yes += qty;
            }
            Side::BuyNo => {
                self.avg_px_no = Self::next_avg(self.avg_px_no, self.qty_no, px, qty);
                self.qty_no += qty;
            }
        }
    }

    fn next_avg(avg: Cents, held: u64, px: Cents, qty: u64) -> Cents {
        let total = held + qty;
        if total == 0 {
            return Decimal::ZERO;
        }
        (avg * Decimal::from(held) + px * Decimal::from(qty)) / Decimal::from(total)
    }

    /// Net directional exposure in contracts: positive means long YES.
    #[must_use]
    pub fn net_contracts(&self) -> i64 {
        self.qty_yes as i64 - self.qty_no as i64
    }

    /// Flat within one contract lot: YES and NO offset each other.
    #[must_use]
    pub fn is_flat_within_lot(&self) -> bool {
        self.net_contracts().abs() <= 1
    }

    /// USD notional at entry prices across both sides.
    #[must_use]
    pub fn notional(&self) -> Notional {
        notional_usd(self.avg_px_yes, self.qty_yes) + notional_usd(self.avg_px_no, self.qty_no)
    }
}

/// An applied position change, published for the risk exposure view.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionDelta {
    market: MarketRef,
    side: Side,
    px: Cents,
    qty: u64,
    notional_delta: Notional,
}

impl PositionDelta {
    /// Create a delta for a fill applied to the ledger.
    #[must_use]
    pub fn new(market: MarketRef, side: Side, px: Cents, qty: u64) -> Self {
        let notional_delta = notional_usd(px, qty);
        Self {
            market,
            side,
            px,
            qty,
            notional_delta,
        }
    }

    /// Get the affected market.
    #[must_use]
    pub const fn market(&self) -> &MarketRef {
        &self.market
    }

    /// The filled side.
    #[must_use]
    pub const fn side(&self) -> Side {
        self.side
    }

    /// Fill price in cents.
    #[must_use]
    pub const fn px(&self) -> Cents {
        self.px
    }

    /// Filled quantity in contracts.
    #[must_use]
    pub const fn qty(&self) -> u64 {
        self.qty
    }

    /// USD notional added by the fill.
    #[must_use]
    pub const fn notional_delta(&self) -> Notional {
        self.notional_delta
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_apply_updates_running_average() {
        let mut pos = Position::default();
        pos.apply(Side::BuyYes, dec!(40), 100);
        pos.apply(Side::BuyYes, dec!(60), 100);
        assert_eq!(pos.qty_yes(), 200);
        assert_eq!(pos.avg_px_yes(), dec!(50));
    }

    #[test]
    fn test_net_contracts_and_flatness() {
        let mut pos = Position::default();
        pos.apply(Side::BuyYes, dec!(48), 50);
        assert_eq!(pos.net_contracts(), 50);
        assert!(!pos.is_flat_within_lot());

        pos.apply(Side::BuyNo, dec!(49), 49);
        assert_eq!(pos.net_contracts(), 1);
        assert!(pos.is_flat_within_lot());
    }

    #[test]
    fn test_notional_sums_both_sides() {
        let mut pos = Position::default();
        pos.apply(Side::BuyYes, dec!(50), 100);
        pos.apply(Side::BuyNo, dec!(50), 100);
        assert_eq!(pos.notional(), dec!(100));
    }

    #[test]
    fn test_delta_carries_notional() {
        let delta = PositionDelta::new(
            MarketRef::new("alpha", "mkt-1"),
            Side::BuyYes,
            dec!(48),
            50,
        );
        assert_eq!(delta.notional_delta(), dec!(24));
    }
}
