use std::time::Duration;

use serde_json::json;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::time::Instant;

use super::duration::parse_duration;
use super::state::{Countdown, Snapshot};
use super::{TimerHub, TimerRegistry};
use crate::client::Subscriber;
use crate::utils::TimerError;

const STOPPED: Snapshot = Snapshot {
    time_left: 0,
    is_running: false,
    max_duration: 0,
    subscriber_count: 0,
};

fn drain(rx: &mut UnboundedReceiver<Snapshot>) -> Vec<Snapshot> {
    let mut received = Vec::new();
    while let Ok(snapshot) = rx.try_recv() {
        received.push(snapshot);
    }
    received
}

#[test]
fn test_registry_new() {
    let registry = TimerRegistry::new();
    assert!(registry.is_empty());
    assert_eq!(registry.len(), 0);
}

#[test]
fn fresh_identifier_is_created_stopped() {
    let mut registry = TimerRegistry::new();
    let snapshot = registry.snapshot("demo", Instant::now()).unwrap();

    assert_eq!(snapshot, STOPPED);
    assert_eq!(registry.len(), 1);
    let timer = registry.get("demo").unwrap();
    assert_eq!(timer.countdown(), Countdown::Idle);
    assert_eq!(timer.end_time(), None);
}

#[test]
fn get_or_create_returns_the_same_timer() {
    let mut registry = TimerRegistry::new();
    let now = Instant::now();
    registry.start("demo", 30, now).unwrap();

    let timer = registry.get_or_create("demo").unwrap();
    assert_eq!(timer.max_duration(), 30);
    assert_eq!(registry.len(), 1);
}

#[test]
fn empty_identifier_is_rejected_everywhere() {
    let mut registry = TimerRegistry::new();
    let now = Instant::now();
    let (subscriber, _rx) = Subscriber::channel();

    assert_eq!(
        registry.get_or_create("").err(),
        Some(TimerError::missing_timer_id())
    );
    assert_eq!(
        registry.start("", 10, now),
        Err(TimerError::missing_timer_id())
    );
    assert_eq!(registry.reset("", now), Err(TimerError::missing_timer_id()));
    assert_eq!(
        registry.subscribe("", subscriber, now),
        Err(TimerError::missing_timer_id())
    );
    assert!(registry.is_empty());
}

#[test]
fn start_reports_running_with_bounded_time_left() {
    let mut registry = TimerRegistry::new();
    let t0 = Instant::now();

    let snapshot = registry.start("t1", 10, t0).unwrap();
    assert!(snapshot.is_running);
    assert_eq!(snapshot.time_left, 10);
    assert_eq!(snapshot.max_duration, 10);

    let later = registry
        .snapshot("t1", t0 + Duration::from_millis(2500))
        .unwrap();
    assert!(later.is_running);
    assert_eq!(later.time_left, 7);
    assert_eq!(later.max_duration, 10);
}

#[test]
fn time_left_rounds_down_to_whole_seconds() {
    let mut registry = TimerRegistry::new();
    let t0 = Instant::now();
    registry.start("t1", 10, t0).unwrap();

    let snapshot = registry
        .snapshot("t1", t0 + Duration::from_millis(500))
        .unwrap();
    assert_eq!(snapshot.time_left, 9);

    let snapshot = registry
        .snapshot("t1", t0 + Duration::from_millis(9_999))
        .unwrap();
    assert!(snapshot.is_running);
    assert_eq!(snapshot.time_left, 0);
}

#[test]
fn reset_clears_state_but_keeps_subscribers() {
    let mut registry = TimerRegistry::new();
    let now = Instant::now();
    let (subscriber, _rx) = Subscriber::channel();
    registry.subscribe("t1", subscriber, now).unwrap();
    registry.start("t1", 60, now).unwrap();

    let snapshot = registry.reset("t1", now).unwrap();
    assert_eq!(
        snapshot,
        Snapshot {
            subscriber_count: 1,
            ..STOPPED
        }
    );
    assert_eq!(registry.get("t1").unwrap().end_time(), None);
}

#[test]
fn reset_is_idempotent() {
    let mut registry = TimerRegistry::new();
    let now = Instant::now();
    registry.start("t1", 60, now).unwrap();

    let first = registry.reset("t1", now).unwrap();
    let second = registry.reset("t1", now).unwrap();
    assert_eq!(first, second);
    assert_eq!(second, STOPPED);
}

#[test]
fn reset_creates_unknown_timer() {
    let mut registry = TimerRegistry::new();
    assert_eq!(registry.reset("fresh", Instant::now()).unwrap(), STOPPED);
    assert_eq!(registry.len(), 1);
}

#[test]
fn invalid_start_leaves_state_unchanged() {
    let mut registry = TimerRegistry::new();
    let t0 = Instant::now();
    registry.start("t3", 30, t0).unwrap();
    let before = registry.snapshot("t3", t0).unwrap();

    assert!(matches!(
        registry.start("t3", 0, t0),
        Err(TimerError::InvalidArgument(_))
    ));
    assert!(matches!(
        registry.start("t3", -5, t0),
        Err(TimerError::InvalidArgument(_))
    ));
    assert!(matches!(
        parse_duration(&json!("not a number")),
        Err(TimerError::InvalidArgument(_))
    ));
    assert!(matches!(
        registry.start("", 10, t0),
        Err(TimerError::InvalidArgument(_))
    ));

    assert_eq!(registry.snapshot("t3", t0).unwrap(), before);
    assert_eq!(registry.get("t3").unwrap().max_duration(), 30);
}

#[test]
fn invalid_start_does_not_create_timer() {
    let mut registry = TimerRegistry::new();
    assert!(registry.start("t3", 0, Instant::now()).is_err());
    assert!(registry.get("t3").is_none());
}

#[test]
fn start_rejects_durations_past_the_clock_range() {
    let mut registry = TimerRegistry::new();
    let now = Instant::now();
    registry.start("t3", 5, now).unwrap();

    let result = registry.start("t3", i64::MAX, now);
    assert_eq!(result, Err(TimerError::invalid_duration("too large")));
    assert_eq!(registry.get("t3").unwrap().max_duration(), 5);

    assert!(registry.start("fresh", i64::MAX, now).is_err());
    assert!(registry.get("fresh").is_none());
}

#[test]
fn restart_while_running_overwrites() {
    let mut registry = TimerRegistry::new();
    let now = Instant::now();
    registry.start("t4", 100, now).unwrap();

    let snapshot = registry.start("t4", 5, now).unwrap();
    assert_eq!(snapshot.max_duration, 5);
    assert!(snapshot.time_left <= 5);
    assert!(snapshot.is_running);
}

#[test]
fn past_end_reads_as_stopped_before_any_sweep() {
    let mut registry = TimerRegistry::new();
    let t0 = Instant::now();
    registry.start("t1", 1, t0).unwrap();

    let at_end = t0 + Duration::from_secs(1);
    let snapshot = registry.snapshot("t1", at_end).unwrap();
    assert!(!snapshot.is_running);
    assert_eq!(snapshot.time_left, 0);
    assert_eq!(snapshot.max_duration, 1);
    assert!(registry.get("t1").unwrap().is_marked_running());
}

#[test]
fn sweep_expires_and_broadcasts() {
    let mut registry = TimerRegistry::new();
    let t0 = Instant::now();
    let (subscriber, mut rx) = Subscriber::channel();
    registry.subscribe("t1", subscriber, t0).unwrap();
    registry.start("t1", 1, t0).unwrap();
    drain(&mut rx);

    assert!(registry.sweep(t0 + Duration::from_millis(500)).is_empty());
    assert!(drain(&mut rx).is_empty());

    let expired = registry.sweep(t0 + Duration::from_millis(1000));
    assert_eq!(expired, vec!["t1".to_string()]);

    let received = drain(&mut rx);
    assert_eq!(
        received,
        vec![Snapshot {
            time_left: 0,
            is_running: false,
            max_duration: 1,
            subscriber_count: 1,
        }]
    );

    let timer = registry.get("t1").unwrap();
    assert!(!timer.is_marked_running());
    assert_eq!(timer.end_time(), Some(t0 + Duration::from_secs(1)));
    assert_eq!(timer.max_duration(), 1);
}

#[test]
fn sweep_only_touches_expired_running_timers() {
    let mut registry = TimerRegistry::new();
    let t0 = Instant::now();
    registry.start("short", 1, t0).unwrap();
    registry.start("long", 60, t0).unwrap();
    registry.reset("idle", t0).unwrap();

    let later = t0 + Duration::from_secs(2);
    assert_eq!(registry.sweep(later), vec!["short".to_string()]);
    assert!(registry.sweep(later).is_empty());
    assert!(registry.snapshot("long", later).unwrap().is_running);
}

#[test]
fn start_after_expiry_runs_again() {
    let mut registry = TimerRegistry::new();
    let t0 = Instant::now();
    registry.start("t1", 1, t0).unwrap();
    let later = t0 + Duration::from_secs(5);
    registry.sweep(later);

    let snapshot = registry.start("t1", 3, later).unwrap();
    assert!(snapshot.is_running);
    assert_eq!(snapshot.time_left, 3);
    assert_eq!(snapshot.max_duration, 3);
}

#[test]
fn subscribe_sends_current_state_then_broadcast() {
    let mut registry = TimerRegistry::new();
    let now = Instant::now();
    registry.start("t1", 30, now).unwrap();

    let (subscriber, mut rx) = Subscriber::channel();
    registry.subscribe("t1", subscriber, now).unwrap();

    let received = drain(&mut rx);
    assert_eq!(received.len(), 2);
    for snapshot in received {
        assert!(snapshot.is_running);
        assert_eq!(snapshot.max_duration, 30);
        assert_eq!(snapshot.subscriber_count, 1);
    }
}

#[test]
fn subscriber_accounting_through_connects_and_disconnects() {
    let mut registry = TimerRegistry::new();
    let now = Instant::now();

    let (a, mut rx_a) = Subscriber::channel();
    let (b, mut rx_b) = Subscriber::channel();
    let (c, rx_c) = Subscriber::channel();
    let c_id = c.id.clone();

    registry.subscribe("t2", a, now).unwrap();
    registry.subscribe("t2", b, now).unwrap();
    registry.subscribe("t2", c, now).unwrap();
    assert_eq!(
        drain(&mut rx_a).last().map(|s| s.subscriber_count),
        Some(3)
    );
    assert_eq!(
        drain(&mut rx_b).last().map(|s| s.subscriber_count),
        Some(3)
    );

    drop(rx_c);
    assert!(registry.unsubscribe("t2", &c_id, now));
    assert!(!registry.get("t2").unwrap().has_subscriber(&c_id));

    assert_eq!(drain(&mut rx_a).last().map(|s| s.subscriber_count), Some(2));
    assert_eq!(drain(&mut rx_b).last().map(|s| s.subscriber_count), Some(2));

    let next = registry.broadcast("t2", now).unwrap();
    assert_eq!(next.subscriber_count, 2);
}

#[test]
fn unsubscribe_twice_broadcasts_once() {
    let mut registry = TimerRegistry::new();
    let now = Instant::now();
    let (a, mut rx_a) = Subscriber::channel();
    let (b, _rx_b) = Subscriber::channel();
    let b_id = b.id.clone();
    registry.subscribe("t2", a, now).unwrap();
    registry.subscribe("t2", b, now).unwrap();
    drain(&mut rx_a);

    assert!(registry.unsubscribe("t2", &b_id, now));
    assert!(!registry.unsubscribe("t2", &b_id, now));
    assert!(!registry.unsubscribe("missing", &b_id, now));
    assert_eq!(drain(&mut rx_a).len(), 1);
}

#[test]
fn dead_subscriber_is_dropped_without_affecting_others() {
    let mut registry = TimerRegistry::new();
    let now = Instant::now();
    let (alive, mut rx_alive) = Subscriber::channel();
    let (dead, rx_dead) = Subscriber::channel();
    let dead_id = dead.id.clone();
    registry.subscribe("t5", alive, now).unwrap();
    registry.subscribe("t5", dead, now).unwrap();
    drain(&mut rx_alive);

    drop(rx_dead);
    let snapshot = registry.start("t5", 10, now).unwrap();

    assert_eq!(snapshot.subscriber_count, 1);
    assert!(!registry.get("t5").unwrap().has_subscriber(&dead_id));

    let received = drain(&mut rx_alive);
    assert_eq!(received.last().map(|s| s.subscriber_count), Some(1));
    assert!(received.iter().all(|s| s.is_running));
}

#[test]
fn snapshot_serializes_with_wire_field_names() {
    let snapshot = Snapshot {
        time_left: 42,
        is_running: true,
        max_duration: 60,
        subscriber_count: 3,
    };
    assert_eq!(
        serde_json::to_value(snapshot).unwrap(),
        json!({ "timeLeft": 42, "isRunning": true, "maxDuration": 60, "usersCount": 3 })
    );
}

#[test]
fn parse_duration_accepts_numbers_and_numeric_strings() {
    assert_eq!(parse_duration(&json!(10)), Ok(10));
    assert_eq!(parse_duration(&json!(-5)), Ok(-5));
    assert_eq!(parse_duration(&json!(12.9)), Ok(12));
    assert_eq!(parse_duration(&json!("15")), Ok(15));
    assert_eq!(parse_duration(&json!("  20s")), Ok(20));
    assert_eq!(parse_duration(&json!("+7")), Ok(7));
    assert_eq!(parse_duration(&json!("-3")), Ok(-3));
}

#[test]
fn parse_duration_rejects_non_numeric_input() {
    for value in [
        json!(null),
        json!(""),
        json!("abc"),
        json!("-"),
        json!(true),
        json!([10]),
        json!({ "seconds": 10 }),
        json!(u64::MAX),
        json!("99999999999999999999"),
    ] {
        assert!(
            matches!(parse_duration(&value), Err(TimerError::InvalidArgument(_))),
            "accepted {value}"
        );
    }
}

#[tokio::test]
async fn hub_detaches_subscriber_when_subscription_dropped() {
    let hub = TimerHub::new();
    let mut watcher = hub.subscribe("t2").unwrap();
    let leaver = hub.subscribe("t2").unwrap();
    assert_eq!(hub.snapshot("t2").unwrap().subscriber_count, 2);
    while watcher.try_recv().is_some() {}

    drop(leaver);

    let detached = tokio::time::timeout(Duration::from_secs(1), async {
        loop {
            if let Some(snapshot) = watcher.recv().await {
                if snapshot.subscriber_count == 1 {
                    break snapshot;
                }
            }
        }
    })
    .await
    .expect("no broadcast after disconnect");

    assert_eq!(detached.subscriber_count, 1);
    assert_eq!(hub.snapshot("t2").unwrap().subscriber_count, 1);
}

#[tokio::test]
async fn hub_rejects_empty_identifier() {
    let hub = TimerHub::new();
    assert!(hub.subscribe("").is_err());
    assert!(hub.start("", 10).is_err());
    assert!(hub.reset("").is_err());
    assert_eq!(hub.timer_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn sweeper_expires_timer_without_reset() {
    let hub = TimerHub::new();
    let mut subscription = hub.subscribe("t1").unwrap();
    tokio::spawn(hub.clone().run_sweeper());

    let started = hub.start("t1", 1).unwrap();
    assert!(started.is_running);

    tokio::time::sleep(Duration::from_millis(1500)).await;

    assert!(!hub.snapshot("t1").unwrap().is_running);

    let mut last = None;
    while let Some(snapshot) = subscription.try_recv() {
        last = Some(snapshot);
    }
    let last = last.expect("no updates received");
    assert!(!last.is_running);
    assert_eq!(last.time_left, 0);
    assert_eq!(last.max_duration, 1);
}
