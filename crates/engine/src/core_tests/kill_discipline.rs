// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Kill signal, timeout escalation, and stubborn processes.

use super::Harness;
use std::time::Duration;
use warden_core::signal::{encode_signaled, SIGKILL};
use warden_core::JobState;

const STUBBORN: &str = r#"
[job.svc]
exec = "/bin/sleep 100"
kill_signal = "USR1"
kill_timeout = 7
"#;

fn stopping(h: &mut Harness) -> u32 {
    h.load(STUBBORN);
    h.start("svc", false);
    let pid = h.spawner.last_pid().unwrap();
    h.stop("svc", false);
    pid
}

#[test]
fn killed_sends_the_configured_signal() {
    let mut h = Harness::new();
    let pid = stopping(&mut h);

    assert_eq!(h.job("svc", "").unwrap().state, JobState::Killed);
    assert_eq!(h.spawner.killed(), vec![(pid, 10)]); // USR1
    assert!(h.job("svc", "").unwrap().kill_timer.is_some());
}

#[test]
fn prompt_exit_cancels_the_escalation_timer() {
    let mut h = Harness::new();
    let pid = stopping(&mut h);

    h.child_exit(pid, encode_signaled(10));

    assert_eq!(h.instance_count("svc"), 0);
    assert!(!h.core.scheduler.has_timers());
    // No KILL was ever sent.
    assert_eq!(h.spawner.killed().len(), 1);
}

#[test]
fn timeout_escalates_to_sigkill() {
    let mut h = Harness::new();
    let pid = stopping(&mut h);

    h.clock.advance(Duration::from_secs(8));
    for input in h.core.fired_timers() {
        h.handle(input);
    }

    assert_eq!(h.spawner.killed(), vec![(pid, 10), (pid, SIGKILL)]);
    // Still waiting for the exit to actually arrive.
    assert_eq!(h.job("svc", "").unwrap().state, JobState::Killed);

    h.child_exit(pid, encode_signaled(SIGKILL));
    assert_eq!(h.instance_count("svc"), 0);
    // A kill during a requested stop is still a clean stop.
    assert!(h
        .event_log()
        .contains(&"stopped JOB=svc INSTANCE= RESULT=ok".to_string()));
}

#[test]
fn timer_does_not_fire_before_the_timeout() {
    let mut h = Harness::new();
    stopping(&mut h);

    h.clock.advance(Duration::from_secs(6));
    assert!(h.core.fired_timers().is_empty());
}
