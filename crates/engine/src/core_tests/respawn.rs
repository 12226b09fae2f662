// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Respawn policy and its rate limit.

use super::Harness;
use std::time::Duration;
use warden_core::signal::encode_exited;
use warden_core::{Goal, JobState};

const RESPAWNER: &str = r#"
[job.svc]
exec = "/bin/sleep 100"
respawn = { limit = 2, interval = 5 }
"#;

fn started(h: &mut Harness) -> u32 {
    h.load(RESPAWNER);
    h.start("svc", false);
    h.spawner.last_pid().unwrap()
}

#[test]
fn unexpected_exit_respawns_the_main_process() {
    let mut h = Harness::new();
    let pid = started(&mut h);

    h.child_exit(pid, encode_exited(1));

    let job = h.job("svc", "").unwrap();
    assert_eq!(job.state, JobState::Running);
    assert_eq!(job.goal, Goal::Start);
    assert_eq!(job.respawn_count, 1);
    let new_pid = h.spawner.last_pid().unwrap();
    assert_ne!(new_pid, pid);
    assert_eq!(job.main_pid(), Some(new_pid));

    // The respawn cycle re-ran the full stop/start event sequence.
    assert!(h.event_names().iter().filter(|n| *n == "starting").count() >= 2);
}

#[test]
fn normal_exit_does_not_respawn() {
    let mut h = Harness::new();
    let pid = started(&mut h);

    h.child_exit(pid, encode_exited(0));

    assert_eq!(h.instance_count("svc"), 0);
    // One spawn only: the clean exit stopped the job.
    assert_eq!(h.spawner.spawned().len(), 1);
}

#[test]
fn respawn_loop_hits_the_rate_limit() {
    let mut h = Harness::new();
    let mut pid = started(&mut h);

    // limit = 2 within the window; the third unexpected exit gives up.
    for _ in 0..2 {
        h.child_exit(pid, encode_exited(1));
        pid = h.spawner.last_pid().unwrap();
    }
    h.child_exit(pid, encode_exited(1));

    assert_eq!(h.instance_count("svc"), 0);
    // A respawn-loop failure names the respawn pseudo-process and carries
    // no exit status.
    assert!(h
        .event_log()
        .contains(&"stopping JOB=svc INSTANCE= RESULT=failed PROCESS=respawn".to_string()));
}

#[test]
fn respawn_window_resets_after_the_interval() {
    let mut h = Harness::new();
    let mut pid = started(&mut h);

    for _ in 0..2 {
        h.child_exit(pid, encode_exited(1));
        pid = h.spawner.last_pid().unwrap();
    }

    // Outside the 5s window the counter starts over.
    h.clock.advance(Duration::from_secs(6));
    h.child_exit(pid, encode_exited(1));

    let job = h.job("svc", "").unwrap();
    assert_eq!(job.state, JobState::Running);
    assert_eq!(job.respawn_count, 1);
}

#[test]
fn respawn_failure_records_pseudo_process() {
    let mut h = Harness::new();
    let mut pid = started(&mut h);

    for _ in 0..2 {
        h.child_exit(pid, encode_exited(1));
        pid = h.spawner.last_pid().unwrap();
    }

    // Observe the failure fields on the way down.
    h.child_exit(pid, encode_exited(1));
    let line = h
        .event_log()
        .iter()
        .find(|l| l.starts_with("stopped") && l.contains("RESULT=failed"))
        .cloned()
        .unwrap();
    assert!(line.contains("PROCESS=respawn"), "{line}");
    assert!(!line.contains("EXIT_STATUS"), "{line}");
}

#[test]
fn respawn_skips_pre_stop() {
    let mut h = Harness::new();
    h.load(
        r#"
[job.svc]
exec = "/bin/sleep 100"
respawn = true

[job.svc.pre_stop]
exec = "/bin/drain"
"#,
    );
    h.start("svc", false);
    let pid = h.spawner.last_pid().unwrap();

    h.child_exit(pid, encode_exited(1));

    // The stop half of the respawn cycle never ran the pre-stop hook.
    assert!(h
        .spawner
        .spawned()
        .iter()
        .all(|r| r.process != warden_core::ProcessType::PreStop));
    assert_eq!(h.job("svc", "").unwrap().state, JobState::Running);
}
