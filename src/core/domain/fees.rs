//! Venue fee packs and friction parameters.
//!
//! A `FeePack` is immutable once published; changing any parameter means
//! publishing a new pack with a new version hash. The signal engine stamps
//! the hash of the fee schedule it read onto every edge quote.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::id::VenueId;
use super::money::{Cents, CONTRACT_PAYOUT_CENTS};

const BPS_DENOMINATOR: Decimal = Decimal::from_parts(10_000, 0, 0, false, 0);

/// How a venue rounds per-fill fee amounts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundingRule {
    /// Round half away from zero (the common venue default).
    #[default]
    HalfUp,
    /// Banker's rounding.
    HalfEven,
    /// Always round up.
    Up,
}

impl RoundingRule {
    fn strategy(self) -> RoundingStrategy {
        match self {
            Self::HalfUp => RoundingStrategy::MidpointAwayFromZero,
            Self::HalfEven => RoundingStrategy::MidpointNearestEven,
            Self::Up => RoundingStrategy::AwayFromZero,
        }
    }

    /// Round a cents amount to two decimal places per this rule.
    #[must_use]
    pub fn round(self, amount: Cents) -> Cents {
        amount.round_dp_with_strategy(2, self.strategy())
    }
}

/// Per-package frictions outside the venue fee schedule.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Frictions {
    /// Chain gas cost per order, USD.
    #[serde(default)]
    pub gas_cost_usd: Decimal,
    /// Bridge cost per order, USD.
    #[serde(default)]
    pub bridge_cost_usd: Decimal,
    /// On-ramp cost on notional, basis points.
    #[serde(default)]
    pub onramp_bps: Decimal,
    /// FX spread on notional, basis points.
    #[serde(default)]
    pub fx_spread_bps: Decimal,
}

impl Frictions {
    /// Per-contract friction in cents for a leg priced at `px` with `qty`
    /// contracts. Fixed costs amortise over the quantity.
    #[must_use]
    pub fn per_contract_cents(&self, px: Cents, qty: u64) -> Cents {
        if qty == 0 {
            return Decimal::ZERO;
        }
        let fixed_cents =
            (self.gas_cost_usd + self.bridge_cost_usd) * Decimal::ONE_HUNDRED / Decimal::from(qty);
        let proportional = px * (self.onramp_bps + self.fx_spread_bps) / BPS_DENOMINATOR;
        fixed_cents + proportional
    }
}

/// Immutable per-venue fee parameters with a content-derived version hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeePack {
    venue: VenueId,
    taker_bps: Decimal,
    maker_bps: Decimal,
    profit_fee_bps: Decimal,
    rounding: RoundingRule,
    frictions: Frictions,
    version_hash: String,
}

impl FeePack {
    /// Create a fee pack, computing its version hash from the parameters.
    #[must_use]
    pub fn new(
        venue: impl Into<VenueId>,
        taker_bps: Decimal,
        maker_bps: Decimal,
        profit_fee_bps: Decimal,
        rounding: RoundingRule,
        frictions: Frictions,
    ) -> Self {
        let venue = venue.into();
        let version_hash = Self::compute_hash(
            &venue,
            taker_bps,
            maker_bps,
            profit_fee_bps,
            rounding,
            &frictions,
        );
        Self {
            venue,
            taker_bps,
            maker_bps,
            profit_fee_bps,
            rounding,
            frictions,
            version_hash,
        }
    }

    /// A zero-fee pack, useful for tests and paper venues.
    #[must_use]
    pub fn free(venue: impl Into<VenueId>) -> Self {
        Self::new(
            venue,
            Decimal::ZERO,
            Decimal::ZERO,
            Decimal::ZERO,
            RoundingRule::HalfUp,
            Frictions::default(),
        )
    }

    fn compute_hash(
        venue: &VenueId,
        taker_bps: Decimal,
        maker_bps: Decimal,
        profit_fee_bps: Decimal,
        rounding: RoundingRule,
        frictions: &Frictions,
    ) -> String {
        let mut hasher = Sha256::new();
        hasher.update(venue.as_str().as_bytes());
        hasher.update(taker_bps.to_string().as_bytes());
        hasher.update(maker_bps.to_string().as_bytes());
        hasher.update(profit_fee_bps.to_string().as_bytes());
        hasher.update(format!("{rounding:?}").as_bytes());
        hasher.update(frictions.gas_cost_usd.to_string().as_bytes());
        hasher.update(frictions.bridge_cost_usd.to_string().as_bytes());
        hasher.update(frictions.onramp_bps.to_string().as_bytes());
        hasher.update(frictions.fx_spread_bps.to_string().as_bytes());
        let digest = hasher.finalize();
        hex::encode(&digest[..8])
    }

    /// Get the venue.
    #[must_use]
    pub const fn venue(&self) -> &VenueId {
        &self.venue
    }

    /// Taker fee in basis points of notional.
    #[must_use]
    pub const fn taker_bps(&self) -> Decimal {
        self.taker_bps
    }

    /// Maker fee in basis points of notional.
    #[must_use]
    pub const fn maker_bps(&self) -> Decimal {
        self.maker_bps
    }

    /// Conditional profit fee in basis points of potential profit.
    #[must_use]
    pub const fn profit_fee_bps(&self) -> Decimal {
        self.profit_fee_bps
    }

    /// The venue's fee rounding rule.
    #[must_use]
    pub const fn rounding(&self) -> RoundingRule {
        self.rounding
    }

    /// Friction parameters.
    #[must_use]
    pub const fn frictions(&self) -> &Frictions {
        &self.frictions
    }

    /// Content-derived version hash.
    #[must_use]
    pub fn version_hash(&self) -> &str {
        &self.version_hash
    }

    /// Per-contract taker fee in cents for a fill at `px`, rounded per the
    /// venue's rule.
    #[must_use]
    pub fn taker_fee_cents(&self, px: Cents) -> Cents {
        self.rounding.round(px * self.taker_bps / BPS_DENOMINATOR)
    }

    /// Per-contract conditional profit fee in cents for a fill at `px`.
    ///
    /// The potential profit of a binary contract bought at `px` is
    /// `100 - px`.
    #[must_use]
    pub fn profit_fee_cents(&self, px: Cents) -> Cents {
        let potential = CONTRACT_PAYOUT_CENTS - px;
        self.rounding
            .round(potential * self.profit_fee_bps / BPS_DENOMINATOR)
    }

    /// Per-contract friction in cents for a leg at `px` with `qty` contracts.
    #[must_use]
    pub fn friction_cents(&self, px: Cents, qty: u64) -> Cents {
        self.frictions.per_contract_cents(px, qty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn pack(taker_bps: Decimal, profit_bps: Decimal) -> FeePack {
        FeePack::new(
            "alpha",
            taker_bps,
            Decimal::ZERO,
            profit_bps,
            RoundingRule::HalfUp,
            Frictions::default(),
        )
    }

    #[test]
    fn test_taker_fee_cents() {
        // 100 bps of a 50-cent fill = 0.5 cents.
        let fees = pack(dec!(100), dec!(0));
        assert_eq!(fees.taker_fee_cents(dec!(50)), dec!(0.5));
    }

    #[test]
    fn test_profit_fee_on_potential_profit() {
        // 700 bps of the 52-cent potential profit on a 48-cent fill.
        let fees = pack(dec!(0), dec!(700));
        assert_eq!(fees.profit_fee_cents(dec!(48)), dec!(3.64));
    }

    #[test]
    fn test_rounding_rules_differ() {
        let amount = dec!(0.125);
        assert_eq!(RoundingRule::HalfUp.round(amount), dec!(0.13));
        assert_eq!(RoundingRule::HalfEven.round(amount), dec!(0.12));
        assert_eq!(RoundingRule::Up.round(dec!(0.121)), dec!(0.13));
    }

    #[test]
    fn test_fixed_frictions_amortise_over_qty() {
        let frictions = Frictions {
            gas_cost_usd: dec!(0.30),
            bridge_cost_usd: dec!(0),
            onramp_bps: dec!(0),
            fx_spread_bps: dec!(0),
        };
        // $0.30 over 100 contracts = 0.3 cents per contract.
        assert_eq!(frictions.per_contract_cents(dec!(50), 100), dec!(0.3));
        assert_eq!(frictions.per_contract_cents(dec!(50), 0), dec!(0));
    }

    #[test]
    fn test_version_hash_changes_with_parameters() {
        let a = pack(dec!(100), dec!(0));
        let b = pack(dec!(150), dec!(0));
        assert_ne!(a.version_hash(), b.version_hash());
        // Identical parameters hash identically.
        assert_eq!(a.version_hash(), pack(dec!(100), dec!(0)).version_hash());
    }
}
