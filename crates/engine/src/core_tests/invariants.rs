// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cross-cutting invariants checked at every step of a busy scenario.

use super::Harness;
use warden_core::signal::encode_exited;

const BUSY: &str = r#"
[job.db]
exec = "/bin/sleep 100"
start_on = "startup"
stop_on = "shutdown"

[job.db.pre_start]
exec = "/bin/true"

[job.web]
exec = "/bin/sleep 100"
start_on = "started JOB=db"
stop_on = "stopping JOB=db"

[job.batch]
exec = "/bin/true"
task = true
start_on = "startup"
"#;

#[test]
fn blocker_counts_hold_through_a_full_boot_and_shutdown() {
    let mut h = Harness::new();
    h.load(BUSY);

    h.emit("startup");
    h.assert_blocker_invariant();
    h.assert_blocked_jobs_linked();

    // db pre-start finishes; db reaches running, which starts web.
    let db_hook = h
        .spawner
        .spawned()
        .iter()
        .find(|r| r.job == "db" && r.process == warden_core::ProcessType::PreStart)
        .map(|r| r.pid)
        .unwrap();
    h.child_exit(db_hook, 0);
    h.assert_blocker_invariant();
    h.assert_blocked_jobs_linked();

    // The batch task finishes.
    let batch_pid = h
        .spawner
        .spawned()
        .iter()
        .find(|r| r.job == "batch")
        .map(|r| r.pid)
        .unwrap();
    h.child_exit(batch_pid, 0);
    h.assert_blocker_invariant();

    // Everything that should run is running.
    assert!(h.job("db", "").is_some());
    assert!(h.job("web", "").is_some());
    assert_eq!(h.instance_count("batch"), 0);

    // Shutdown: db stops, which stops web through its stopping event.
    h.emit("shutdown");
    h.assert_blocker_invariant();
    h.assert_blocked_jobs_linked();

    let db_pid = h
        .spawner
        .spawned()
        .iter()
        .find(|r| r.job == "db" && r.process == warden_core::ProcessType::Main)
        .map(|r| r.pid)
        .unwrap();
    let web_pid = h
        .spawner
        .spawned()
        .iter()
        .find(|r| r.job == "web")
        .map(|r| r.pid)
        .unwrap();
    h.child_exit(db_pid, encode_exited(0));
    h.assert_blocker_invariant();
    h.child_exit(web_pid, encode_exited(0));
    h.assert_blocker_invariant();

    assert_eq!(h.instance_count("db"), 0);
    assert_eq!(h.instance_count("web"), 0);
    assert!(h.core.queue.is_empty());
    assert!(h.core.jobs.is_empty());
}

#[test]
fn poll_reaches_quiescence_every_turn() {
    let mut h = Harness::new();
    h.load(BUSY);

    h.emit("startup");
    // After handle() returns, no event may still be pending or finished.
    for event in h.core.queue.iter_ordered() {
        assert_eq!(event.progress, warden_core::EventProgress::Handling);
        assert!(event.blockers > 0);
    }
}
