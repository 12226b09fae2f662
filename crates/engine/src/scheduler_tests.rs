// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use warden_core::JobId;

fn timer(n: u64) -> TimerId {
    TimerId::kill(JobId::new(n))
}

#[test]
fn fired_timers_returns_expired_only() {
    let mut scheduler = Scheduler::new();
    let now = Instant::now();
    scheduler.set_timer(timer(1), Duration::from_secs(5), now);
    scheduler.set_timer(timer(2), Duration::from_secs(50), now);

    let fired = scheduler.fired_timers(now + Duration::from_secs(10));
    assert_eq!(fired, vec![timer(1)]);
    assert!(scheduler.has_timers());
}

#[test]
fn fired_timers_removes_expired() {
    let mut scheduler = Scheduler::new();
    let now = Instant::now();
    scheduler.set_timer(timer(1), Duration::from_secs(5), now);

    assert_eq!(scheduler.fired_timers(now + Duration::from_secs(6)).len(), 1);
    assert!(scheduler.fired_timers(now + Duration::from_secs(7)).is_empty());
    assert!(!scheduler.has_timers());
}

#[test]
fn cancel_removes_timer() {
    let mut scheduler = Scheduler::new();
    let now = Instant::now();
    scheduler.set_timer(timer(1), Duration::from_secs(5), now);
    scheduler.cancel_timer(&timer(1));
    assert!(scheduler.fired_timers(now + Duration::from_secs(10)).is_empty());
}

#[test]
fn setting_again_replaces_deadline() {
    let mut scheduler = Scheduler::new();
    let now = Instant::now();
    scheduler.set_timer(timer(1), Duration::from_secs(5), now);
    scheduler.set_timer(timer(1), Duration::from_secs(60), now);

    assert!(scheduler.fired_timers(now + Duration::from_secs(10)).is_empty());
}

#[test]
fn remaining_reports_time_left() {
    let mut scheduler = Scheduler::new();
    let now = Instant::now();
    scheduler.set_timer(timer(1), Duration::from_secs(30), now);

    assert_eq!(
        scheduler.remaining(&timer(1), now + Duration::from_secs(10)),
        Some(Duration::from_secs(20))
    );
    assert_eq!(scheduler.remaining(&timer(2), now), None);
}

#[test]
fn remaining_saturates_past_deadline() {
    let mut scheduler = Scheduler::new();
    let now = Instant::now();
    scheduler.set_timer(timer(1), Duration::from_secs(1), now);

    assert_eq!(
        scheduler.remaining(&timer(1), now + Duration::from_secs(5)),
        Some(Duration::ZERO)
    );
}

#[test]
fn next_deadline_is_earliest() {
    let mut scheduler = Scheduler::new();
    let now = Instant::now();
    assert_eq!(scheduler.next_deadline(), None);

    scheduler.set_timer(timer(1), Duration::from_secs(50), now);
    scheduler.set_timer(timer(2), Duration::from_secs(5), now);

    assert_eq!(scheduler.next_deadline(), Some(now + Duration::from_secs(5)));
}

#[test]
fn multiple_expired_fire_in_stable_order() {
    let mut scheduler = Scheduler::new();
    let now = Instant::now();
    scheduler.set_timer(timer(2), Duration::from_secs(1), now);
    scheduler.set_timer(timer(1), Duration::from_secs(2), now);

    let fired = scheduler.fired_timers(now + Duration::from_secs(5));
    assert_eq!(fired, vec![timer(1), timer(2)]);
}
