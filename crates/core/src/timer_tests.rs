// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn timer_id_display() {
    let id = TimerId::new("test-timer");
    assert_eq!(id.to_string(), "test-timer");
}

#[test]
fn kill_timer_id_format() {
    let id = TimerId::kill(JobId::new(12));
    assert_eq!(id.as_str(), "kill:12");
}

#[test]
fn is_kill() {
    assert!(TimerId::kill(JobId::new(1)).is_kill());
    assert!(!TimerId::new("other:1").is_kill());
}

#[test]
fn kill_job_id_round_trips() {
    let id = TimerId::kill(JobId::new(7));
    assert_eq!(id.kill_job_id(), Some(JobId::new(7)));
}

#[test]
fn kill_job_id_rejects_foreign_ids() {
    assert_eq!(TimerId::new("other:7").kill_job_id(), None);
    assert_eq!(TimerId::new("kill:not-a-number").kill_job_id(), None);
}

#[test]
fn timer_id_serde() {
    let id = TimerId::kill(JobId::new(3));
    let json = serde_json::to_string(&id).unwrap();
    assert_eq!(json, "\"kill:3\"");
    let parsed: TimerId = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, id);
}
