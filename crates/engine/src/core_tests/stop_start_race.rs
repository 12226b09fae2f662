// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! One event naming both the stop and start condition of a job.

use super::Harness;
use warden_core::JobState;

const RACY: &str = r#"
[job.svc]
exec = "/bin/sleep 100"
start_on = "foo"
stop_on = "foo"
"#;

#[test]
fn not_running_starts_then_immediately_stops() {
    let mut h = Harness::new();
    h.load(RACY);

    h.emit("foo");

    // The fresh instance saw the same event in its stop condition: it
    // passes through stopping and settles back to nothing.
    assert_eq!(
        h.event_names(),
        vec!["foo", "starting", "stopping", "stopped"]
    );
    assert_eq!(h.instance_count("svc"), 0);
    // The cycle turned around before the main process was ever spawned.
    assert!(h.spawner.spawned().is_empty());
    assert!(h.core.queue.is_empty());
}

#[test]
fn running_stops_then_restarts() {
    let mut h = Harness::new();
    h.load(RACY);

    h.start("svc", false);
    let old_pid = h.spawner.last_pid().unwrap();
    assert_eq!(h.job("svc", "").unwrap().state, JobState::Running);

    h.emit("foo");

    // Stop matched first: the old process is being killed, and the start
    // half set the goal so the cycle will come back up.
    let job = h.job("svc", "").unwrap();
    assert_eq!(job.state, JobState::Killed);
    assert!(h.spawner.killed().iter().any(|(pid, _)| *pid == old_pid));

    h.child_exit(old_pid, warden_core::signal::encode_signaled(15));

    let job = h.job("svc", "").unwrap();
    assert_eq!(job.state, JobState::Running);
    let new_pid = h.spawner.last_pid().unwrap();
    assert_ne!(new_pid, old_pid);
    assert_eq!(job.main_pid(), Some(new_pid));
}
