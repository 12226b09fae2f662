// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn event(name: &str) -> Event {
    Event::new(EventId::new(1), name, EnvList::new())
}

#[test]
fn new_event_is_pending_and_unblocked() {
    let e = event("startup");
    assert_eq!(e.progress, EventProgress::Pending);
    assert!(!e.failed);
    assert_eq!(e.blockers, 0);
    assert!(e.blocking.is_empty());
}

#[test]
fn failed_event_wants_derived_event() {
    let mut e = event("custom");
    assert!(!e.wants_failed_event());
    e.failed = true;
    assert!(e.wants_failed_event());
    assert_eq!(e.failed_name(), "custom/failed");
}

#[test]
fn derived_failure_event_is_not_rederived() {
    let mut e = event("custom/failed");
    e.failed = true;
    assert!(!e.wants_failed_event());
}

#[test]
fn log_summary_includes_env() {
    let env = EnvList::from_entries(["JOB=hello", "INSTANCE="]).unwrap();
    let e = Event::new(EventId::new(3), "starting", env);
    assert_eq!(e.log_summary(), "starting [3] JOB=hello INSTANCE=");
}

#[test]
fn serde_round_trip() {
    let mut e = event("stopping");
    e.env = EnvList::from_entries(["RESULT=failed"]).unwrap();
    e.progress = EventProgress::Handling;
    e.failed = true;
    e.blockers = 2;
    e.blocking.push(Blocked::Job {
        job: crate::job::JobId::new(4),
    });

    let json = serde_json::to_string(&e).unwrap();
    let restored: Event = serde_json::from_str(&json).unwrap();
    assert_eq!(restored, e);
}

#[test]
fn progress_serializes_snake_case() {
    let json = serde_json::to_string(&EventProgress::Handling).unwrap();
    assert_eq!(json, "\"handling\"");
}
