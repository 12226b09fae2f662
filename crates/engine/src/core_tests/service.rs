// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Services with hooks: pre-start ordering and start-waiter resolution.

use super::Harness;
use crate::reply::ReplyBody;
use warden_core::{Goal, JobState, ProcessType};

const SVC: &str = r#"
[job.svc]
exec = "/bin/sleep 100"
start_on = "startup"

[job.svc.pre_start]
exec = "/bin/true"
"#;

#[test]
fn pre_start_runs_before_main() {
    let mut h = Harness::new();
    h.load(SVC);

    h.emit("startup");

    // Held in pre-start until the hook exits.
    let job = h.job("svc", "").unwrap();
    assert_eq!(job.state, JobState::PreStart);
    let hook_pid = h.spawner.last_pid().unwrap();
    assert_eq!(job.pids.get(ProcessType::PreStart), Some(hook_pid));
    assert!(job.pids.get(ProcessType::Main).is_none());

    h.child_exit(hook_pid, 0);

    let job = h.job("svc", "").unwrap();
    assert_eq!(job.goal, Goal::Start);
    assert_eq!(job.state, JobState::Running);
    assert!(job.pids.get(ProcessType::Main).unwrap() > 0);
    assert!(job.pids.get(ProcessType::PreStart).is_none());

    let processes: Vec<ProcessType> = h.spawner.spawned().iter().map(|r| r.process).collect();
    assert_eq!(processes, vec![ProcessType::PreStart, ProcessType::Main]);
}

#[test]
fn start_wait_resolves_at_started_not_at_exit() {
    let mut h = Harness::new();
    h.load(SVC);

    let (token, effects) = h.start("svc", true);
    // Blocked through starting and pre-start; nothing answered yet.
    assert!(Harness::replies_for(&effects, token).is_empty());

    let hook_pid = h.spawner.last_pid().unwrap();
    let effects = h.child_exit(hook_pid, 0);

    let replies = Harness::replies_for(&effects, token);
    assert_eq!(replies.len(), 1);
    match &replies[0] {
        ReplyBody::Started { job } => {
            assert_eq!(job.state, "running");
            assert_eq!(job.goal, "start");
        }
        other => panic!("expected started reply, got {other:?}"),
    }

    // The service keeps running; the reply was not tied to process exit.
    assert_eq!(h.job("svc", "").unwrap().state, JobState::Running);
}

#[test]
fn pre_start_failure_fails_the_job() {
    let mut h = Harness::new();
    h.load(SVC);

    h.emit("startup");
    let hook_pid = h.spawner.last_pid().unwrap();
    h.child_exit(hook_pid, 1);

    // Failure routed to a stop; main never spawned.
    assert_eq!(h.instance_count("svc"), 0);
    let spawned: Vec<ProcessType> = h.spawner.spawned().iter().map(|r| r.process).collect();
    assert_eq!(spawned, vec![ProcessType::PreStart]);
    assert!(h
        .event_log()
        .contains(&"stopping JOB=svc INSTANCE= RESULT=failed PROCESS=pre-start EXIT_STATUS=1".to_string()));
}

#[test]
fn spawn_failure_of_main_fails_the_job() {
    let mut h = Harness::new();
    h.load(SVC);
    h.spawner.fail_spawn("svc", ProcessType::Main);

    h.emit("startup");
    let hook_pid = h.spawner.last_pid().unwrap();
    h.child_exit(hook_pid, 0);

    // Spawn failures carry no exit status on the stop events.
    assert!(h
        .event_log()
        .contains(&"stopping JOB=svc INSTANCE= RESULT=failed PROCESS=main".to_string()));
    assert_eq!(h.instance_count("svc"), 0);
}

#[test]
fn export_keys_ride_on_lifecycle_events() {
    let mut h = Harness::new();
    h.load(
        r#"
[job.net]
exec = "/bin/sleep 100"
start_on = "net-up IFACE=eth0"
export = ["IFACE"]
"#,
    );

    h.handle(crate::core::Input::Emit {
        name: "net-up".into(),
        env: vec!["IFACE=eth0".into()],
        session: None,
        reply: None,
    });

    assert!(h
        .event_log()
        .iter()
        .any(|line| line.starts_with("starting JOB=net INSTANCE=") && line.contains("IFACE=eth0")));
}
