//! End-to-end pipeline tests: snapshots in, events and trade records out.

mod support;

use std::time::Duration;

use chrono::Utc;
use rust_decimal_macros::dec;

use pairtaker::core::cache::Bar;
use pairtaker::core::domain::{MarketRef, PairId, Side, TradeOutcome, VenueId};
use pairtaker::core::service::Event;
use pairtaker::core::venue::VenueEvent;
use pairtaker::testkit::config::TestHarnessBuilder;
use pairtaker::testkit::domain::{snapshot, snapshot_at};
use pairtaker::testkit::venue::MockOrderGateway;
use support::{drain_events, event_kinds, wait_for_record};

fn alpha() -> VenueId {
    VenueId::from("alpha")
}

fn beta() -> VenueId {
    VenueId::from("beta")
}

fn book_a(seq: u64) -> VenueEvent {
    VenueEvent::Snapshot(snapshot(
        MarketRef::new("alpha", "mkt-a"),
        &[(dec!(46), 100)],
        &[(dec!(48), 100)],
        seq,
    ))
}

fn book_b(seq: u64) -> VenueEvent {
    VenueEvent::Snapshot(snapshot(
        MarketRef::new("beta", "mkt-b"),
        &[(dec!(51), 100)],
        &[(dec!(53), 100)],
        seq,
    ))
}

#[tokio::test]
async fn s1_happy_path_through_the_full_loop() {
    let gateway_a = MockOrderGateway::new("alpha");
    let gateway_b = MockOrderGateway::new("beta");
    // Taker fees sized to cost 0.5 cents per contract on each leg, both in
    // the edge math and on the simulated fills.
    gateway_a.set_fee(dec!(0.5));
    gateway_b.set_fee(dec!(0.5));
    let harness = TestHarnessBuilder::new()
        .taker_bps(dec!(104.1667), dec!(102.0408))
        .min_net_edge(dec!(1.5))
        .build(gateway_a.clone(), gateway_b.clone());
    let mut events = harness.events();

    harness.pipeline.handle_venue_event(&alpha(), book_a(1));
    harness.pipeline.handle_venue_event(&beta(), book_b(1));

    let record = wait_for_record(&harness.store, Duration::from_secs(2)).await;
    assert_eq!(record.outcome, TradeOutcome::Committed);
    // Gross 3c minus ~1c of taker fees.
    assert!(
        (record.realised_edge_cents - dec!(2)).abs() <= dec!(0.05),
        "realised {}",
        record.realised_edge_cents
    );
    assert_eq!(record.residual_contracts, 0);

    // The admission stamped the schedule the edge was computed under.
    assert_eq!(
        record.fee_version_hash,
        harness.pipeline.fees.snapshot().version_hash()
    );

    tokio::time::sleep(Duration::from_millis(50)).await;
    let kinds = event_kinds(&drain_events(&mut events));
    // First snapshot cannot price the pair yet; the second computes,
    // admits, and settles.
    assert!(kinds.contains(&"edge_rejected"));
    assert!(kinds.contains(&"edge_computed"));
    assert!(kinds.contains(&"intent_admitted"));
    assert!(kinds.contains(&"trade_settled"));
    assert!(kinds.contains(&"leg_filled"));
    assert!(kinds.contains(&"position_changed"));

    // Net edge arithmetic holds on the published quote.
    let quote = drain_quote(&harness);
    assert_eq!(
        quote.net_edge_cents(),
        quote.gross_edge_cents()
            - quote.fees_cents()
            - quote.friction_cents()
            - quote.slippage_cents()
    );
}

fn drain_quote(
    harness: &pairtaker::testkit::config::TestHarness,
) -> pairtaker::core::domain::EdgeQuote {
    // Recompute deterministically from the cached books.
    let pairs = harness.pipeline.pairs.snapshot();
    let pair = pairs.get(&PairId::from("p-1")).unwrap();
    let (book_a, book_b) = harness
        .pipeline
        .cache
        .get_pair(pair.market_a(), pair.market_b());
    harness
        .pipeline
        .signal
        .compute(
            pair,
            book_a.as_deref(),
            book_b.as_deref(),
            &harness.pipeline.fees.snapshot(),
            &pairtaker::core::signal::LeaderHint::none(),
            Utc::now(),
        )
        .unwrap()
        .quote()
        .clone()
}

#[tokio::test]
async fn s3_infeasible_depth_emits_only_edge_rejected() {
    let gateway_a = MockOrderGateway::new("alpha");
    let gateway_b = MockOrderGateway::new("beta");
    // Books hold 100 contracts; ask for 500.
    let harness = TestHarnessBuilder::new()
        .qty(500)
        .build(gateway_a.clone(), gateway_b.clone());
    let mut events = harness.events();

    harness.pipeline.handle_venue_event(&alpha(), book_a(1));
    harness.pipeline.handle_venue_event(&beta(), book_b(1));

    tokio::time::sleep(Duration::from_millis(50)).await;
    let kinds = event_kinds(&drain_events(&mut events));
    assert!(kinds.contains(&"edge_rejected"));
    assert!(!kinds.contains(&"edge_computed"));
    assert!(!kinds.contains(&"intent_admitted"));
    assert!(!kinds.contains(&"intent_rejected"));
    assert!(harness.store.records().is_empty());
    assert_eq!(gateway_a.place_count(), 0);
    assert_eq!(gateway_b.place_count(), 0);
}

#[tokio::test]
async fn s4_stale_feed_flags_venue_down_after_three_rejections() {
    let gateway_a = MockOrderGateway::new("alpha");
    let gateway_b = MockOrderGateway::new("beta");
    let harness = TestHarnessBuilder::new().build(gateway_a.clone(), gateway_b.clone());
    let mut events = harness.events();

    harness.pipeline.handle_venue_event(&alpha(), book_a(1));

    // Beta's snapshots arrive 3 seconds old against a 2-second budget.
    for seq in 1..=3 {
        let stale = snapshot_at(
            MarketRef::new("beta", "mkt-b"),
            &[(dec!(51), 100)],
            &[(dec!(53), 100)],
            seq,
            Utc::now() - chrono::Duration::milliseconds(3_000),
        );
        harness
            .pipeline
            .handle_venue_event(&beta(), VenueEvent::Snapshot(stale));
    }

    assert!(harness.health.is_down(&beta()));
    let drained = drain_events(&mut events);
    let kinds = event_kinds(&drained);
    assert_eq!(
        kinds.iter().filter(|k| **k == "intent_rejected").count(),
        3
    );
    assert!(kinds.contains(&"venue_down"));
    // The rejection reason names the stale feed.
    let stale_reasons = drained
        .iter()
        .filter(|e| matches!(e, Event::IntentRejected { reason, .. } if reason.contains("stale_feed")))
        .count();
    assert_eq!(stale_reasons, 3);
    assert!(harness.store.records().is_empty());
}

#[tokio::test]
async fn s5_leader_hint_routes_primary_to_the_leader() {
    let gateway_a = MockOrderGateway::new("alpha");
    let gateway_b = MockOrderGateway::new("beta");
    let harness = TestHarnessBuilder::new().build(gateway_a.clone(), gateway_b.clone());
    let mut events = harness.events();

    // Sustain "beta leads alpha by 2 bars" across enough window
    // evaluations to pass the stability filter.
    let base: Vec<f64> = (0..44)
        .map(|i| 50.0 + 8.0 * ((i as f64) * 0.37).sin())
        .collect();
    let leads: Vec<Bar> = base[2..44]
        .iter()
        .enumerate()
        .map(|(i, v)| Bar {
            start_ms: (i as i64) * 5_000,
            mid: rust_decimal::Decimal::try_from(*v).unwrap(),
        })
        .collect();
    let trails: Vec<Bar> = base[..42]
        .iter()
        .enumerate()
        .map(|(i, v)| Bar {
            start_ms: (i as i64) * 5_000,
            mid: rust_decimal::Decimal::try_from(*v).unwrap(),
        })
        .collect();
    for _ in 0..3 {
        harness.pipeline.leadlag.evaluate(
            &PairId::from("p-1"),
            &alpha(),
            &beta(),
            &trails,
            &leads,
        );
    }
    assert_eq!(
        harness.pipeline.leadlag.hint(&PairId::from("p-1")).leader,
        Some(beta())
    );

    harness.pipeline.handle_venue_event(&alpha(), book_a(1));
    harness.pipeline.handle_venue_event(&beta(), book_b(1));
    let _record = wait_for_record(&harness.store, Duration::from_secs(2)).await;

    // The admitted intent leads with the beta leg (NO side of the winning
    // package) even though the YES leg sits on alpha.
    tokio::time::sleep(Duration::from_millis(20)).await;
    let drained = drain_events(&mut events);
    let admitted = drained
        .iter()
        .find_map(|e| match e {
            Event::IntentAdmitted { intent } => Some(intent.clone()),
            _ => None,
        })
        .expect("intent admitted");
    assert_eq!(admitted.primary().market().venue(), &beta());
    assert_eq!(admitted.primary().side(), Side::BuyNo);
    assert_eq!(admitted.hedge().market().venue(), &alpha());

    // Placement order follows the hint.
    assert_eq!(gateway_b.placed()[0].side(), Side::BuyNo);
    assert_eq!(gateway_a.placed()[0].side(), Side::BuyYes);
}

#[tokio::test]
async fn per_pair_event_order_follows_snapshot_order() {
    let gateway_a = MockOrderGateway::new("alpha");
    let gateway_b = MockOrderGateway::new("beta");
    // High edge floor: every quote computes but nothing admits, keeping
    // the stream to edge events only.
    let harness = TestHarnessBuilder::new()
        .min_net_edge(dec!(99))
        .build(gateway_a.clone(), gateway_b.clone());
    let mut events = harness.events();

    harness.pipeline.handle_venue_event(&alpha(), book_a(1));
    for seq in 1..=5 {
        harness.pipeline.handle_venue_event(&beta(), book_b(seq));
    }

    let drained = drain_events(&mut events);
    let seqs: Vec<u64> = drained
        .iter()
        .filter_map(|e| match e {
            Event::EdgeComputed { quote } => Some(quote.book_b_seq()),
            _ => None,
        })
        .collect();
    // One edge per beta snapshot, in arrival order.
    assert_eq!(seqs, vec![1, 2, 3, 4, 5]);
}

#[tokio::test]
async fn stale_sequence_numbers_do_not_retrigger_signals() {
    let gateway_a = MockOrderGateway::new("alpha");
    let gateway_b = MockOrderGateway::new("beta");
    let harness = TestHarnessBuilder::new()
        .min_net_edge(dec!(99))
        .build(gateway_a.clone(), gateway_b.clone());
    let mut events = harness.events();

    harness.pipeline.handle_venue_event(&alpha(), book_a(1));
    harness.pipeline.handle_venue_event(&beta(), book_b(5));
    // Replay an older sequence number: dropped before the signal stage.
    harness.pipeline.handle_venue_event(&beta(), book_b(4));

    let drained = drain_events(&mut events);
    let computed = drained
        .iter()
        .filter(|e| matches!(e, Event::EdgeComputed { .. }))
        .count();
    assert_eq!(computed, 1);
    assert_eq!(harness.pipeline.cache.stale_drops(), 1);
}

#[tokio::test]
async fn dry_run_admits_but_never_places() {
    let gateway_a = MockOrderGateway::new("alpha");
    let gateway_b = MockOrderGateway::new("beta");
    let harness = TestHarnessBuilder::new()
        .dry_run(true)
        .build(gateway_a.clone(), gateway_b.clone());
    let mut events = harness.events();

    harness.pipeline.handle_venue_event(&alpha(), book_a(1));
    harness.pipeline.handle_venue_event(&beta(), book_b(1));

    tokio::time::sleep(Duration::from_millis(50)).await;
    let kinds = event_kinds(&drain_events(&mut events));
    assert!(kinds.contains(&"intent_admitted"));
    assert_eq!(gateway_a.place_count(), 0);
    assert_eq!(gateway_b.place_count(), 0);
    // The reserved slot was handed straight back.
    assert_eq!(harness.live.live(), 0);
}

#[tokio::test]
async fn disconnect_marks_venue_down_and_fresh_snapshot_recovers() {
    let gateway_a = MockOrderGateway::new("alpha");
    let gateway_b = MockOrderGateway::new("beta");
    let harness = TestHarnessBuilder::new().build(gateway_a.clone(), gateway_b.clone());
    let mut events = harness.events();

    harness.pipeline.handle_venue_event(
        &beta(),
        VenueEvent::Disconnected {
            reason: "socket closed".into(),
        },
    );
    assert!(harness.health.is_down(&beta()));

    // A fresh snapshot clears the flag and publishes recovery.
    harness.pipeline.handle_venue_event(&beta(), book_b(1));
    assert!(!harness.health.is_down(&beta()));

    let kinds = event_kinds(&drain_events(&mut events));
    assert!(kinds.contains(&"venue_down"));
    assert!(kinds.contains(&"venue_up"));
}

#[tokio::test]
async fn operator_deactivation_stops_new_admissions() {
    let gateway_a = MockOrderGateway::new("alpha");
    let gateway_b = MockOrderGateway::new("beta");
    let harness = TestHarnessBuilder::new().build(gateway_a.clone(), gateway_b.clone());
    let mut events = harness.events();

    harness
        .pipeline
        .handle_control(pairtaker::core::service::OperatorCommand::DeactivatePair {
            pair_id: PairId::from("p-1"),
            who: "ops".into(),
        });

    harness.pipeline.handle_venue_event(&alpha(), book_a(1));
    harness.pipeline.handle_venue_event(&beta(), book_b(1));

    tokio::time::sleep(Duration::from_millis(30)).await;
    let kinds = event_kinds(&drain_events(&mut events));
    assert!(kinds.contains(&"pair_deactivated"));
    assert!(!kinds.contains(&"intent_admitted"));
    assert_eq!(gateway_a.place_count(), 0);
}
