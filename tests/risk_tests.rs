//! Admission controller integration tests.

mod support;

use std::sync::Arc;

use chrono::{Duration, Utc};
use rust_decimal_macros::dec;

use pairtaker::core::domain::{MarketRef, VenueId};
use pairtaker::core::registry::{FeeRegistry, PairStore};
use pairtaker::core::risk::{
    ExposureView, HedgeStats, LiveHedges, PnlTracker, RejectReason, RiskController, StopLimits,
};
use pairtaker::core::signal::{LeaderHint, SignalEngine, SignalParams};
use pairtaker::core::venue::VenueHealthBoard;
use pairtaker::testkit::config::test_risk_params;
use pairtaker::testkit::domain::{s1_books, taker_only_pack, test_pair};

struct RiskFixture {
    controller: RiskController,
    health: Arc<VenueHealthBoard>,
    live: Arc<LiveHedges>,
    exposure: Arc<ExposureView>,
    pnl: Arc<PnlTracker>,
    hedge_stats: Arc<HedgeStats>,
    fees: Arc<FeeRegistry>,
    signal: SignalEngine,
}

fn fixture_with(params: pairtaker::core::risk::RiskParams, pairs_max: usize) -> RiskFixture {
    let health = Arc::new(VenueHealthBoard::new());
    let live = LiveHedges::shared(pairs_max);
    let exposure = Arc::new(ExposureView::new());
    let pnl = Arc::new(PnlTracker::new(StopLimits {
        equity_usd: dec!(10000),
        daily_pct: dec!(1),
        weekly_pct: dec!(3),
        monthly_pct: dec!(5),
    }));
    let hedge_stats = Arc::new(HedgeStats::new());
    let controller = RiskController::new(
        params.clone(),
        Arc::clone(&health),
        Arc::clone(&live),
        Arc::clone(&exposure),
        Arc::clone(&pnl),
        Arc::clone(&hedge_stats),
    );
    let fees = Arc::new(FeeRegistry::new());
    fees.publish(taker_only_pack("alpha", dec!(0)));
    fees.publish(taker_only_pack("beta", dec!(0)));
    let signal = SignalEngine::new(SignalParams {
        freshness_budget_ms: params.freshness_budget_ms,
        intended_qty: 50,
    });
    RiskFixture {
        controller,
        health,
        live,
        exposure,
        pnl,
        hedge_stats,
        fees,
        signal,
    }
}

fn fixture() -> RiskFixture {
    fixture_with(test_risk_params(), 8)
}

#[test]
fn admits_clean_edge_and_reserves_slot() {
    let fix = fixture();
    let pair = test_pair();
    let (book_a, book_b) = s1_books(1);
    let now = Utc::now();
    let computation = fix
        .signal
        .compute(
            &pair,
            Some(&book_a),
            Some(&book_b),
            &fix.fees.snapshot(),
            &LeaderHint::none(),
            now,
        )
        .unwrap();

    let intent = fix
        .controller
        .admit(&computation, &pair, &fix.fees.snapshot(), &book_a, &book_b, now)
        .unwrap();

    // Gross 3c, zero fees: net 3c clears the 1.5c floor.
    assert_eq!(intent.net_edge_cents(), dec!(3));
    assert_eq!(
        intent.deadline() - now,
        Duration::milliseconds(250)
    );
    assert!(fix.live.is_pair_live(pair.pair_id()));

    // Predicate 3: the pair is now busy.
    let again = fix
        .controller
        .admit(&computation, &pair, &fix.fees.snapshot(), &book_a, &book_b, now)
        .unwrap_err();
    assert_eq!(again, RejectReason::PairBusy);
}

#[test]
fn rejects_edge_below_minimum() {
    let mut params = test_risk_params();
    params.min_net_edge_cents = dec!(5);
    let fix = fixture_with(params, 8);
    let pair = test_pair();
    let (book_a, book_b) = s1_books(1);
    let now = Utc::now();
    let computation = fix
        .signal
        .compute(
            &pair,
            Some(&book_a),
            Some(&book_b),
            &fix.fees.snapshot(),
            &LeaderHint::none(),
            now,
        )
        .unwrap();

    let err = fix
        .controller
        .admit(&computation, &pair, &fix.fees.snapshot(), &book_a, &book_b, now)
        .unwrap_err();
    assert!(matches!(err, RejectReason::EdgeBelowMinimum { .. }));
}

#[test]
fn stale_feed_rejections_flag_venue_down() {
    let fix = fixture();
    let pair = test_pair();
    let (book_a, book_b) = s1_books(1);
    // Evaluate 3 seconds after the books arrived: past the 2s budget.
    let later = Utc::now() + Duration::milliseconds(3_000);
    let computation = fix
        .signal
        .compute(
            &pair,
            Some(&book_a),
            Some(&book_b),
            &fix.fees.snapshot(),
            &LeaderHint::none(),
            // Fresh at compute time so the signal engine quotes.
            book_a.received_at(),
        )
        .unwrap();

    let alpha = VenueId::from("alpha");
    for i in 0..3 {
        let err = fix
            .controller
            .admit(&computation, &pair, &fix.fees.snapshot(), &book_a, &book_b, later)
            .unwrap_err();
        assert!(matches!(err, RejectReason::StaleFeed { .. }), "round {i}");
    }
    // Three consecutive stale rejections flag the venue down.
    assert!(fix.health.is_down(&alpha));
}

#[test]
fn rejects_down_and_halted_venues() {
    let fix = fixture();
    let pair = test_pair();
    let (book_a, book_b) = s1_books(1);
    let now = Utc::now();
    let computation = fix
        .signal
        .compute(
            &pair,
            Some(&book_a),
            Some(&book_b),
            &fix.fees.snapshot(),
            &LeaderHint::none(),
            now,
        )
        .unwrap();

    fix.health.mark_down(&VenueId::from("beta"), "test");
    let err = fix
        .controller
        .admit(&computation, &pair, &fix.fees.snapshot(), &book_a, &book_b, now)
        .unwrap_err();
    assert!(matches!(err, RejectReason::VenueDown { .. }));

    // Recover the feed, then halt by hand.
    fix.health
        .observe_snapshot(&VenueId::from("beta"), now, now, 2_000);
    fix.health.halt(&VenueId::from("alpha"));
    let err = fix
        .controller
        .admit(&computation, &pair, &fix.fees.snapshot(), &book_a, &book_b, now)
        .unwrap_err();
    assert!(matches!(err, RejectReason::VenueHalted { .. }));
}

#[test]
fn rejects_when_fee_pack_missing() {
    let fix = fixture();
    let pair = test_pair();
    let (book_a, book_b) = s1_books(1);
    let now = Utc::now();

    // A schedule missing venue beta: the signal engine still computes, the
    // controller refuses.
    let partial_fees = Arc::new(FeeRegistry::new());
    partial_fees.publish(taker_only_pack("alpha", dec!(0)));
    let computation = fix
        .signal
        .compute(
            &pair,
            Some(&book_a),
            Some(&book_b),
            &partial_fees.snapshot(),
            &LeaderHint::none(),
            now,
        )
        .unwrap();

    let err = fix
        .controller
        .admit(
            &computation,
            &pair,
            &partial_fees.snapshot(),
            &book_a,
            &book_b,
            now,
        )
        .unwrap_err();
    assert!(matches!(err, RejectReason::MissingFeePack { .. }));
}

#[test]
fn global_cap_limits_concurrent_hedges() {
    let fix = fixture_with(test_risk_params(), 1);
    let pair = test_pair();
    let (book_a, book_b) = s1_books(1);
    let now = Utc::now();
    let computation = fix
        .signal
        .compute(
            &pair,
            Some(&book_a),
            Some(&book_b),
            &fix.fees.snapshot(),
            &LeaderHint::none(),
            now,
        )
        .unwrap();

    // Occupy the only slot with a different pair.
    fix.live
        .reserve(&"p-other".into(), &"intent-x".into())
        .unwrap();
    let err = fix
        .controller
        .admit(&computation, &pair, &fix.fees.snapshot(), &book_a, &book_b, now)
        .unwrap_err();
    assert!(matches!(err, RejectReason::PairsAtCap { .. }));
}

#[test]
fn venue_and_contract_caps_bound_exposure() {
    let mut params = test_risk_params();
    params.per_contract_exposure_usd = dec!(20);
    let fix = fixture_with(params, 8);
    let pair = test_pair();
    let (book_a, book_b) = s1_books(1);
    let now = Utc::now();
    let computation = fix
        .signal
        .compute(
            &pair,
            Some(&book_a),
            Some(&book_b),
            &fix.fees.snapshot(),
            &LeaderHint::none(),
            now,
        )
        .unwrap();

    // 50 contracts at ~48c is ~$24 > $20 per-contract cap.
    let err = fix
        .controller
        .admit(&computation, &pair, &fix.fees.snapshot(), &book_a, &book_b, now)
        .unwrap_err();
    assert!(matches!(err, RejectReason::ContractCapExceeded { .. }));

    // Venue cap: preload exposure close to the ceiling.
    let mut params = test_risk_params();
    params.venue_cap_usd = dec!(100);
    let fix = fixture_with(params, 8);
    fix.exposure.apply(&pairtaker::core::domain::PositionDelta::new(
        MarketRef::new("alpha", "mkt-other"),
        pairtaker::core::domain::Side::BuyYes,
        dec!(50),
        180,
    ));
    let computation = fix
        .signal
        .compute(
            &pair,
            Some(&book_a),
            Some(&book_b),
            &fix.fees.snapshot(),
            &LeaderHint::none(),
            now,
        )
        .unwrap();
    let err = fix
        .controller
        .admit(&computation, &pair, &fix.fees.snapshot(), &book_a, &book_b, now)
        .unwrap_err();
    assert!(matches!(err, RejectReason::VenueCapExceeded { .. }));
}

#[test]
fn drawdown_stop_blocks_admission() {
    let fix = fixture();
    let pair = test_pair();
    let (book_a, book_b) = s1_books(1);
    let now = Utc::now();
    // Lose 1.5% of equity today.
    fix.pnl.record(dec!(-150), now);

    let computation = fix
        .signal
        .compute(
            &pair,
            Some(&book_a),
            Some(&book_b),
            &fix.fees.snapshot(),
            &LeaderHint::none(),
            now,
        )
        .unwrap();
    let err = fix
        .controller
        .admit(&computation, &pair, &fix.fees.snapshot(), &book_a, &book_b, now)
        .unwrap_err();
    assert!(matches!(err, RejectReason::DrawdownStop { .. }));
}

#[test]
fn low_hedge_probability_blocks_admission() {
    let fix = fixture();
    let pair = test_pair();
    let (book_a, book_b) = s1_books(1);
    let now = Utc::now();

    // The default package buys NO on beta (the hedge leg with no leader
    // hint); tank beta's completion record.
    let beta = VenueId::from("beta");
    for _ in 0..5 {
        fix.hedge_stats.record(&beta, false);
    }

    let computation = fix
        .signal
        .compute(
            &pair,
            Some(&book_a),
            Some(&book_b),
            &fix.fees.snapshot(),
            &LeaderHint::none(),
            now,
        )
        .unwrap();
    let err = fix
        .controller
        .admit(&computation, &pair, &fix.fees.snapshot(), &book_a, &book_b, now)
        .unwrap_err();
    assert!(matches!(err, RejectReason::HedgeProbabilityLow { .. }));
}

#[test]
fn leader_hint_orders_legs_without_gating() {
    let fix = fixture();
    let pair = test_pair();
    let (book_a, book_b) = s1_books(1);
    let now = Utc::now();

    let hint = LeaderHint {
        leader: Some(VenueId::from("beta")),
        confidence: 0.95,
        lag_bars: -2,
    };
    let computation = fix
        .signal
        .compute(
            &pair,
            Some(&book_a),
            Some(&book_b),
            &fix.fees.snapshot(),
            &hint,
            now,
        )
        .unwrap();
    let intent = fix
        .controller
        .admit(&computation, &pair, &fix.fees.snapshot(), &book_a, &book_b, now)
        .unwrap();

    // Beta leads, so its leg is placed first even though the package's YES
    // leg sits on alpha.
    assert_eq!(intent.primary().market().venue().as_str(), "beta");
    assert_eq!(intent.hedge().market().venue().as_str(), "alpha");
}

#[test]
fn inactive_pair_is_never_admitted() {
    let fix = fixture();
    let store = PairStore::new(dec!(0.92));
    store
        .ingest(
            "p-1",
            &pairtaker::testkit::domain::test_market("alpha", "mkt-a"),
            &pairtaker::testkit::domain::test_market("beta", "mkt-b"),
            dec!(0.95),
            true,
        )
        .unwrap();
    store.set_pair_active(&"p-1".into(), false);
    let snapshot = store.snapshot();
    let pair = snapshot.get(&"p-1".into()).unwrap();

    let (book_a, book_b) = s1_books(1);
    let now = Utc::now();
    let computation = fix
        .signal
        .compute(
            pair,
            Some(&book_a),
            Some(&book_b),
            &fix.fees.snapshot(),
            &LeaderHint::none(),
            now,
        )
        .unwrap();
    let err = fix
        .controller
        .admit(&computation, pair, &fix.fees.snapshot(), &book_a, &book_b, now)
        .unwrap_err();
    assert_eq!(err, RejectReason::PairInactive);
}
