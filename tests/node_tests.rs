//! Integration tests for the limiter node
use chrono::Utc;

use tern::ledger::LedgerEntry;
use tern::node::{ConsumeOutcome, DenyReason, RateLimiterNode};
use tern::settings::BucketSettings;

fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

fn entry(replica: &str, consumed: u64, tokens: u64, ts: i64) -> LedgerEntry {
    LedgerEntry {
        replica_id: replica.into(),
        cumulative_consumed: consumed,
        tokens_available: tokens,
        observed_ts: ts,
    }
}

#[test]
fn refill_grants_exactly_one_token_after_one_second() {
    let node = RateLimiterNode::with_replica_id(
        "r1".into(),
        BucketSettings {
            capacity: 5,
            refill_rate: 1,
        },
    );
    let t0 = now_ms();

    // Drain the bucket, then get denied in the same instant
    assert!(matches!(
        node.consume_at(5, t0).unwrap(),
        ConsumeOutcome::Granted { .. }
    ));
    assert_eq!(
        node.consume_at(1, t0).unwrap(),
        ConsumeOutcome::Denied {
            reason: DenyReason::InsufficientTokens
        }
    );

    // One second later exactly one token has refilled
    match node.consume_at(1, t0 + 1000).unwrap() {
        ConsumeOutcome::Granted { tokens_remaining } => assert_eq!(tokens_remaining, 0),
        other => panic!("expected grant after refill, got {:?}", other),
    }
}

#[test]
fn peer_consumption_caps_the_derived_budget() {
    let settings = BucketSettings {
        capacity: 100,
        refill_rate: 1,
    };
    let r1 = RateLimiterNode::with_replica_id("r1".into(), settings);
    let r2 = RateLimiterNode::with_replica_id("r2".into(), settings);
    let t0 = now_ms();

    // R1 consumes locally and pushes its snapshot to R2
    assert!(matches!(
        r1.consume_at(60, t0).unwrap(),
        ConsumeOutcome::Granted { .. }
    ));
    let sync = r1.local_sync_entry_at(t0).unwrap();
    let ack = r2.receive_sync(sync).unwrap();
    assert_eq!(ack.global_budget, 40);

    // A hypothetical cluster-wide consume(50) is over budget at R2
    let check = r2.check_global(50).unwrap();
    assert!(!check.allowed);
    assert_eq!(check.global_budget, 40);

    // 40 would still fit
    assert!(r2.check_global(40).unwrap().allowed);
}

#[test]
fn duplicate_delivery_leaves_the_ledger_unchanged() {
    let node = RateLimiterNode::with_replica_id(
        "r1".into(),
        BucketSettings {
            capacity: 50,
            refill_rate: 1,
        },
    );
    let sync = entry("r2", 12, 3, now_ms());

    let first = node.receive_sync(sync.clone()).unwrap();
    let after_first = node.snapshot().unwrap();

    let second = node.receive_sync(sync).unwrap();
    let after_second = node.snapshot().unwrap();

    assert_eq!(first.global_budget, second.global_budget);
    assert_eq!(after_first.ledger_size, after_second.ledger_size);
    assert_eq!(after_first.global_budget, after_second.global_budget);
}

#[test]
fn late_stale_entry_never_regresses() {
    let node = RateLimiterNode::with_replica_id(
        "r1".into(),
        BucketSettings {
            capacity: 50,
            refill_rate: 1,
        },
    );
    let t0 = now_ms();

    let ack = node.receive_sync(entry("r2", 20, 0, t0)).unwrap();
    assert_eq!(ack.global_budget, 30);

    // An older snapshot for the same replica arrives afterwards
    let ack = node.receive_sync(entry("r2", 10, 5, t0 - 1000)).unwrap();
    assert_eq!(ack.global_budget, 30);
}

#[test]
fn budget_is_stable_without_consumption_and_shrinks_with_it() {
    let node = RateLimiterNode::with_replica_id(
        "r1".into(),
        BucketSettings {
            capacity: 100,
            refill_rate: 1,
        },
    );
    let t0 = now_ms();

    let mut last_budget = node.check_global(1).unwrap().global_budget;
    assert_eq!(last_budget, 100);

    // Quiet cluster: repeated reads are stable
    for _ in 0..5 {
        assert_eq!(node.check_global(1).unwrap().global_budget, last_budget);
    }

    // Continued consumption anywhere only drives the budget down
    for step in 1..=5u64 {
        node.receive_sync(entry("r2", step * 4, 0, t0 + step as i64))
            .unwrap();
        node.consume_at(2, t0).unwrap();
        let budget = node.check_global(1).unwrap().global_budget;
        assert!(budget <= last_budget);
        last_budget = budget;
    }
    assert_eq!(last_budget, 100 - 20 - 10);
}

#[test]
fn ledger_grows_but_never_shrinks_as_peers_appear() {
    let node = RateLimiterNode::with_replica_id(
        "r1".into(),
        BucketSettings {
            capacity: 1000,
            refill_rate: 1,
        },
    );
    let t0 = now_ms();

    for i in 0..10 {
        node.receive_sync(entry(&format!("peer-{}", i), i, 0, t0))
            .unwrap();
    }
    // 10 peers plus the local row
    assert_eq!(node.snapshot().unwrap().ledger_size, 11);

    // Re-delivering everything changes nothing
    for i in 0..10 {
        node.receive_sync(entry(&format!("peer-{}", i), i, 0, t0))
            .unwrap();
    }
    assert_eq!(node.snapshot().unwrap().ledger_size, 11);
}

#[test]
fn snapshot_reports_local_and_global_state() {
    let node = RateLimiterNode::with_replica_id(
        "r1".into(),
        BucketSettings {
            capacity: 20,
            refill_rate: 2,
        },
    );
    let t0 = now_ms();

    node.consume_at(8, t0).unwrap();
    node.receive_sync(entry("r2", 5, 15, t0)).unwrap();

    let snapshot = node.snapshot().unwrap();
    assert_eq!(snapshot.replica_id, "r1".into());
    assert_eq!(snapshot.local.capacity, 20);
    assert_eq!(snapshot.local.tokens_available, 12);
    assert_eq!(snapshot.local.cumulative_consumed, 8);
    assert_eq!(snapshot.global_budget, 20 - 8 - 5);
    assert_eq!(snapshot.ledger_size, 2);
}
