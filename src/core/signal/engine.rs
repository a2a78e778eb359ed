//! Edge computation over cached pair books.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::core::domain::{
    BookSnapshot, Cents, EdgeQuote, EdgeQuoteParts, FeePack, MarketRef, Package, Pair, Side,
    CONTRACT_PAYOUT_CENTS,
};
use crate::core::registry::FeeSchedule;
use crate::core::signal::depth::{walk_no, walk_yes, DepthQuote};
use crate::core::signal::leadlag::LeaderHint;

/// Why no quote was produced for a pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EdgeRejection {
    /// One leg has no cached book yet.
    MissingBook { market: MarketRef },
    /// One leg's snapshot exceeds the freshness budget.
    Stale { market: MarketRef },
    /// Neither package can fill the intended quantity.
    Infeasible,
}

impl std::fmt::Display for EdgeRejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingBook { market } => write!(f, "missing book for {market}"),
            Self::Stale { market } => write!(f, "stale book for {market}"),
            Self::Infeasible => write!(f, "infeasible"),
        }
    }
}

/// Planned execution of one leg, derived from the depth walk.
#[derive(Debug, Clone)]
pub struct LegPlan {
    market: MarketRef,
    side: Side,
    vwap_px: Cents,
    worst_px: Cents,
    top_px: Cents,
}

impl LegPlan {
    fn new(market: MarketRef, side: Side, quote: &DepthQuote) -> Self {
        Self {
            market,
            side,
            vwap_px: quote.vwap,
            worst_px: quote.worst,
            top_px: quote.top,
        }
    }

    /// The market this leg trades.
    #[must_use]
    pub const fn market(&self) -> &MarketRef {
        &self.market
    }

    /// The side this leg takes.
    #[must_use]
    pub const fn side(&self) -> Side {
        self.side
    }

    /// Expected size-weighted fill price, cents.
    #[must_use]
    pub const fn vwap_px(&self) -> Cents {
        self.vwap_px
    }

    /// Worst depth level touched; the natural limit price.
    #[must_use]
    pub const fn worst_px(&self) -> Cents {
        self.worst_px
    }

    /// Top-of-book price at computation time.
    #[must_use]
    pub const fn top_px(&self) -> Cents {
        self.top_px
    }
}

/// A full edge computation: the publishable quote plus the leg plans the
/// admission controller turns into an execution intent.
#[derive(Debug, Clone)]
pub struct EdgeComputation {
    quote: EdgeQuote,
    yes_leg: LegPlan,
    no_leg: LegPlan,
}

impl EdgeComputation {
    /// The publishable quote.
    #[must_use]
    pub const fn quote(&self) -> &EdgeQuote {
        &self.quote
    }

    /// The YES-buying leg of the winning package.
    #[must_use]
    pub const fn yes_leg(&self) -> &LegPlan {
        &self.yes_leg
    }

    /// The NO-buying leg of the winning package.
    #[must_use]
    pub const fn no_leg(&self) -> &LegPlan {
        &self.no_leg
    }

    /// Both legs, YES first.
    #[must_use]
    pub fn legs(&self) -> [&LegPlan; 2] {
        [&self.yes_leg, &self.no_leg]
    }

    /// The leg trading on the given venue, if any.
    #[must_use]
    pub fn leg_on_venue(&self, venue: &crate::core::domain::VenueId) -> Option<&LegPlan> {
        self.legs()
            .into_iter()
            .find(|leg| leg.market().venue() == venue)
    }
}

struct Candidate {
    package: Package,
    yes_leg: LegPlan,
    no_leg: LegPlan,
    gross: Cents,
    fees: Cents,
    friction: Cents,
    slippage: Cents,
}

impl Candidate {
    fn net(&self) -> Cents {
        self.gross - self.fees - self.friction - self.slippage
    }
}

/// Signal engine configuration.
#[derive(Debug, Clone)]
pub struct SignalParams {
    /// Maximum snapshot age eligible for edge computation, ms.
    pub freshness_budget_ms: u64,
    /// Intended trade size, contracts.
    pub intended_qty: u64,
}

/// Stateless edge calculator. All inputs arrive as immutable snapshots, so
/// recomputation from identical inputs is bit-identical.
pub struct SignalEngine {
    params: SignalParams,
}

impl SignalEngine {
    /// Create an engine with the given parameters.
    #[must_use]
    pub const fn new(params: SignalParams) -> Self {
        Self { params }
    }

    /// Intended trade size in contracts.
    #[must_use]
    pub const fn intended_qty(&self) -> u64 {
        self.params.intended_qty
    }

    /// Compute the pair's edge from the two cached books.
    ///
    /// Both candidate packages are priced; the one with the greater net
    /// edge wins. Returns a rejection when a book is missing or stale or
    /// both packages are infeasible at the intended size.
    pub fn compute(
        &self,
        pair: &Pair,
        book_a: Option<&BookSnapshot>,
        book_b: Option<&BookSnapshot>,
        fees: &FeeSchedule,
        leader_hint: &LeaderHint,
        now: DateTime<Utc>,
    ) -> Result<EdgeComputation, EdgeRejection> {
        let book_a = book_a.ok_or_else(|| EdgeRejection::MissingBook {
            market: pair.market_a().clone(),
        })?;
        let book_b = book_b.ok_or_else(|| EdgeRejection::MissingBook {
            market: pair.market_b().clone(),
        })?;

        for book in [book_a, book_b] {
            if !book.is_fresh(now, self.params.freshness_budget_ms) {
                return Err(EdgeRejection::Stale {
                    market: book.market().clone(),
                });
            }
        }

        let qty = self.params.intended_qty;
        let p1 = self.candidate(Package::AYesBNo, book_a, book_b, fees, qty);
        let p2 = self.candidate(Package::BYesANo, book_b, book_a, fees, qty);

        let winner = match (p1, p2) {
            (Some(a), Some(b)) => {
                if b.net() > a.net() {
                    b
                } else {
                    a
                }
            }
            (Some(a), None) => a,
            (None, Some(b)) => b,
            (None, None) => return Err(EdgeRejection::Infeasible),
        };

        let quote = EdgeQuote::from_parts(EdgeQuoteParts {
            pair_id: pair.pair_id().clone(),
            ts: now,
            package: winner.package,
            qty,
            gross_edge_cents: winner.gross,
            fees_cents: winner.fees,
            friction_cents: winner.friction,
            slippage_cents: winner.slippage,
            leader: leader_hint.leader.clone(),
            leader_confidence: leader_hint.confidence,
            fee_version_hash: fees.version_hash().to_string(),
            book_a_seq: book_a.sequence_no(),
            book_b_seq: book_b.sequence_no(),
        });

        Ok(EdgeComputation {
            quote,
            yes_leg: winner.yes_leg,
            no_leg: winner.no_leg,
        })
    }

    /// Price one package: YES bought on `yes_book`'s market, NO on
    /// `no_book`'s. `None` when either leg cannot fill the quantity.
    fn candidate(
        &self,
        package: Package,
        yes_book: &BookSnapshot,
        no_book: &BookSnapshot,
        fees: &FeeSchedule,
        qty: u64,
    ) -> Option<Candidate> {
        let yes_quote = walk_yes(yes_book, qty)?;
        let no_quote = walk_no(no_book, qty)?;

        let gross = CONTRACT_PAYOUT_CENTS - (yes_quote.vwap + no_quote.vwap);

        let fee_yes = leg_fees(fees.pack(yes_book.market().venue()), yes_quote.vwap);
        let fee_no = leg_fees(fees.pack(no_book.market().venue()), no_quote.vwap);

        let friction_yes =
            leg_friction(fees.pack(yes_book.market().venue()), yes_quote.vwap, qty);
        let friction_no = leg_friction(fees.pack(no_book.market().venue()), no_quote.vwap, qty);

        let slippage = yes_quote.slippage() + no_quote.slippage();

        Some(Candidate {
            package,
            yes_leg: LegPlan::new(yes_book.market().clone(), Side::BuyYes, &yes_quote),
            no_leg: LegPlan::new(no_book.market().clone(), Side::BuyNo, &no_quote),
            gross,
            fees: fee_yes + fee_no,
            friction: friction_yes + friction_no,
            slippage,
        })
    }
}

/// Taker + conditional profit fee for one leg. A venue with no published
/// pack contributes zero here; admission rejects it separately.
fn leg_fees(pack: Option<&std::sync::Arc<FeePack>>, vwap: Cents) -> Cents {
    pack.map_or(Decimal::ZERO, |p| {
        p.taker_fee_cents(vwap) + p.profit_fee_cents(vwap)
    })
}

fn leg_friction(pack: Option<&std::sync::Arc<FeePack>>, vwap: Cents, qty: u64) -> Cents {
    pack.map_or(Decimal::ZERO, |p| p.friction_cents(vwap, qty))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::domain::{Frictions, PriceLevel, RoundingRule};
    use crate::core::registry::FeeRegistry;
    use rust_decimal_macros::dec;

    fn pair() -> Pair {
        Pair::new(
            "p-1",
            MarketRef::new("alpha", "mkt-a"),
            MarketRef::new("beta", "mkt-b"),
            dec!(0.95),
            true,
            dec!(0.92),
        )
        .unwrap()
    }

    fn book(
        market: MarketRef,
        bids: Vec<(Cents, u64)>,
        asks: Vec<(Cents, u64)>,
        now: DateTime<Utc>,
    ) -> BookSnapshot {
        BookSnapshot::new(
            market,
            now,
            now,
            bids.into_iter()
                .map(|(px, size)| PriceLevel::new(px, size))
                .collect(),
            asks.into_iter()
                .map(|(px, size)| PriceLevel::new(px, size))
                .collect(),
            1,
        )
    }

    fn schedule(taker_bps: Decimal) -> std::sync::Arc<FeeSchedule> {
        let registry = FeeRegistry::new();
        for venue in ["alpha", "beta"] {
            registry.publish(FeePack::new(
                venue,
                taker_bps,
                dec!(0),
                dec!(0),
                RoundingRule::HalfUp,
                Frictions::default(),
            ));
        }
        registry.snapshot()
    }

    fn engine(qty: u64) -> SignalEngine {
        SignalEngine::new(SignalParams {
            freshness_budget_ms: 2_000,
            intended_qty: qty,
        })
    }

    #[test]
    fn test_happy_path_edge_arithmetic() {
        // YES on alpha at 48, NO on beta at 49 (YES bid 51): gross 3 cents.
        let now = Utc::now();
        let pair = pair();
        let book_a = book(pair.market_a().clone(), vec![], vec![(dec!(48), 100)], now);
        let book_b = book(pair.market_b().clone(), vec![(dec!(51), 100)], vec![], now);

        // Roughly 0.5 cents taker each side at ~50 cents.
        let fees = schedule(dec!(104));
        let computation = engine(50)
            .compute(
                &pair,
                Some(&book_a),
                Some(&book_b),
                &fees,
                &LeaderHint::none(),
                now,
            )
            .unwrap();

        let quote = computation.quote();
        assert_eq!(quote.package(), Package::AYesBNo);
        assert_eq!(quote.gross_edge_cents(), dec!(3));
        assert_eq!(quote.fees_cents(), dec!(1.01));
        assert_eq!(quote.slippage_cents(), dec!(0));
        assert_eq!(
            quote.net_edge_cents(),
            quote.gross_edge_cents() - quote.fees_cents()
        );
    }

    #[test]
    fn test_infeasible_depth_rejects() {
        let now = Utc::now();
        let pair = pair();
        let book_a = book(pair.market_a().clone(), vec![], vec![(dec!(48), 100)], now);
        let book_b = book(pair.market_b().clone(), vec![(dec!(51), 100)], vec![], now);

        let err = engine(500)
            .compute(
                &pair,
                Some(&book_a),
                Some(&book_b),
                &schedule(dec!(0)),
                &LeaderHint::none(),
                now,
            )
            .unwrap_err();
        assert_eq!(err, EdgeRejection::Infeasible);
    }

    #[test]
    fn test_stale_book_rejects() {
        let now = Utc::now();
        let pair = pair();
        let old = now - chrono::Duration::milliseconds(3_000);
        let book_a = book(pair.market_a().clone(), vec![], vec![(dec!(48), 100)], old);
        let book_b = book(pair.market_b().clone(), vec![(dec!(51), 100)], vec![], now);

        let err = engine(50)
            .compute(
                &pair,
                Some(&book_a),
                Some(&book_b),
                &schedule(dec!(0)),
                &LeaderHint::none(),
                now,
            )
            .unwrap_err();
        assert!(matches!(err, EdgeRejection::Stale { .. }));
    }

    #[test]
    fn test_missing_book_rejects() {
        let now = Utc::now();
        let pair = pair();
        let book_a = book(pair.market_a().clone(), vec![], vec![(dec!(48), 100)], now);

        let err = engine(50)
            .compute(
                &pair,
                Some(&book_a),
                None,
                &schedule(dec!(0)),
                &LeaderHint::none(),
                now,
            )
            .unwrap_err();
        assert!(matches!(err, EdgeRejection::MissingBook { .. }));
    }

    #[test]
    fn test_mirror_package_wins_when_better() {
        // Books favour YES on beta + NO on alpha.
        let now = Utc::now();
        let pair = pair();
        let book_a = book(
            pair.market_a().clone(),
            vec![(dec!(55), 100)],
            vec![(dec!(57), 100)],
            now,
        );
        let book_b = book(
            pair.market_b().clone(),
            vec![(dec!(40), 100)],
            vec![(dec!(42), 100)],
            now,
        );

        let computation = engine(50)
            .compute(
                &pair,
                Some(&book_a),
                Some(&book_b),
                &schedule(dec!(0)),
                &LeaderHint::none(),
                now,
            )
            .unwrap();
        // Buy YES on beta at 42, buy NO on alpha at 45: gross 13.
        assert_eq!(computation.quote().package(), Package::BYesANo);
        assert_eq!(computation.quote().gross_edge_cents(), dec!(13));
        assert_eq!(computation.yes_leg().market(), pair.market_b());
        assert_eq!(computation.no_leg().market(), pair.market_a());
    }

    #[test]
    fn test_identical_inputs_identical_output() {
        let now = Utc::now();
        let pair = pair();
        let book_a = book(pair.market_a().clone(), vec![], vec![(dec!(48), 100)], now);
        let book_b = book(pair.market_b().clone(), vec![(dec!(51), 100)], vec![], now);
        let fees = schedule(dec!(104));
        let engine = engine(50);

        let first = engine
            .compute(
                &pair,
                Some(&book_a),
                Some(&book_b),
                &fees,
                &LeaderHint::none(),
                now,
            )
            .unwrap();
        let second = engine
            .compute(
                &pair,
                Some(&book_a),
                Some(&book_b),
                &fees,
                &LeaderHint::none(),
                now,
            )
            .unwrap();
        assert_eq!(first.quote(), second.quote());
        assert_eq!(
            first.quote().fee_version_hash(),
            second.quote().fee_version_hash()
        );
    }

    #[test]
    fn test_equal_fair_prices_leave_no_edge() {
        // Both venues quote mid 50 with a 2-cent spread; both packages are
        // feasible but gross is negative.
        let now = Utc::now();
        let pair = pair();
        let book_a = book(
            pair.market_a().clone(),
            vec![(dec!(49), 100)],
            vec![(dec!(51), 100)],
            now,
        );
        let book_b = book(
            pair.market_b().clone(),
            vec![(dec!(49), 100)],
            vec![(dec!(51), 100)],
            now,
        );

        let computation = engine(50)
            .compute(
                &pair,
                Some(&book_a),
                Some(&book_b),
                &schedule(dec!(0)),
                &LeaderHint::none(),
                now,
            )
            .unwrap();
        assert!(computation.quote().net_edge_cents() < dec!(0));
    }
}
