// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! A pre-stop script can veto the stop by starting the job again.

use super::Harness;
use warden_core::{Goal, JobState, ProcessType};

const DB: &str = r#"
[job.db]
exec = "/bin/sleep 100"
start_on = "startup"
stop_on = "shutdown"

[job.db.pre_stop]
script = "check-connections"
"#;

fn running_db(h: &mut Harness) -> u32 {
    h.load(DB);
    h.emit("startup");
    let main_pid = h.spawner.last_pid().unwrap();
    assert_eq!(h.job("db", "").unwrap().state, JobState::Running);
    main_pid
}

#[test]
fn pre_stop_abort_returns_to_running_without_stopping_event() {
    let mut h = Harness::new();
    let main_pid = running_db(&mut h);

    h.emit("shutdown");
    let job = h.job("db", "").unwrap();
    assert_eq!(job.state, JobState::PreStop);
    assert_eq!(job.goal, Goal::Stop);
    let hook_pid = h.spawner.last_pid().unwrap();
    assert_ne!(hook_pid, main_pid);

    // The pre-stop script decided against stopping.
    h.start("db", false);
    assert_eq!(h.job("db", "").unwrap().goal, Goal::Start);

    h.child_exit(hook_pid, 0);

    let job = h.job("db", "").unwrap();
    assert_eq!(job.state, JobState::Running);
    assert_eq!(job.main_pid(), Some(main_pid));
    assert!(job.stop_env.is_none());

    // No stopping or stopped event was ever emitted.
    assert!(!h.event_names().iter().any(|n| n == "stopping"));
    assert!(!h.event_names().iter().any(|n| n == "stopped"));
    // And no second started event either: the job never left running.
    let starts = h.event_names().iter().filter(|n| *n == "started").count();
    assert_eq!(starts, 1);
}

#[test]
fn pre_stop_completion_without_veto_stops_the_job() {
    let mut h = Harness::new();
    let main_pid = running_db(&mut h);

    h.emit("shutdown");
    let hook_pid = h.spawner.last_pid().unwrap();
    h.child_exit(hook_pid, 0);

    // Stop proceeds: stopping emitted, main being killed.
    assert_eq!(h.job("db", "").unwrap().state, JobState::Killed);
    assert!(h.event_names().iter().any(|n| n == "stopping"));

    h.child_exit(main_pid, warden_core::signal::encode_signaled(15));
    assert_eq!(h.instance_count("db"), 0);
    assert!(h
        .event_log()
        .contains(&"stopped JOB=db INSTANCE= RESULT=ok".to_string()));
}

#[test]
fn pre_stop_spawn_failure_does_not_block_the_stop() {
    let mut h = Harness::new();
    let main_pid = running_db(&mut h);
    h.spawner.fail_spawn("db", ProcessType::PreStop);

    h.emit("shutdown");

    // The stop carries on directly to stopping/killed.
    assert_eq!(h.job("db", "").unwrap().state, JobState::Killed);
    h.child_exit(main_pid, warden_core::signal::encode_signaled(15));
    assert_eq!(h.instance_count("db"), 0);
    // Pre-stop spawn failure is not fatal: the stop result stays ok.
    assert!(h
        .event_log()
        .contains(&"stopped JOB=db INSTANCE= RESULT=ok".to_string()));
}
