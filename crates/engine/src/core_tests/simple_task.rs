// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! A task runs once and settles back to nothing.

use super::Harness;
use warden_core::{Goal, JobState, ProcessType};

const HELLO: &str = r#"
[job.hello]
exec = "/bin/true"
task = true
start_on = "startup"
"#;

#[test]
fn task_runs_to_completion_on_startup() {
    let mut h = Harness::new();
    h.load(HELLO);

    h.emit("startup");

    // Main spawned; the job rests in running until the exit arrives.
    let job = h.job("hello", "").unwrap();
    assert_eq!(job.goal, Goal::Start);
    assert_eq!(job.state, JobState::Running);
    let pid = h.spawner.last_pid().unwrap();
    assert_eq!(job.pids.get(ProcessType::Main), Some(pid));
    h.assert_blocker_invariant();

    h.child_exit(pid, 0);

    assert_eq!(
        h.event_log(),
        vec![
            "startup",
            "starting JOB=hello INSTANCE=",
            "started JOB=hello INSTANCE=",
            "stopping JOB=hello INSTANCE= RESULT=ok",
            "stopped JOB=hello INSTANCE= RESULT=ok",
        ]
    );
    assert_eq!(h.instance_count("hello"), 0);
    assert!(h.core.queue.is_empty());
}

#[test]
fn task_holds_startup_event_until_done() {
    let mut h = Harness::new();
    h.load(HELLO);

    h.emit("startup");

    // The startup event is held by the task until it completes.
    let held = h
        .core
        .queue
        .iter_ordered()
        .find(|e| e.name == "startup")
        .unwrap();
    assert_eq!(held.blockers, 1);
    h.assert_blocker_invariant();

    let pid = h.spawner.last_pid().unwrap();
    h.child_exit(pid, 0);
    assert!(h.core.queue.is_empty());
}

#[test]
fn unmatched_event_leaves_nothing_behind() {
    let mut h = Harness::new();
    h.load(HELLO);

    h.emit("unrelated");

    assert_eq!(h.event_names(), vec!["unrelated"]);
    assert!(h.core.queue.is_empty());
    assert_eq!(h.instance_count("hello"), 0);
    assert!(h.spawner.spawned().is_empty());
}

#[test]
fn second_startup_while_running_is_ignored() {
    let mut h = Harness::new();
    h.load(HELLO);

    h.emit("startup");
    let first_spawns = h.spawner.spawned().len();
    h.emit("startup");

    // Goal is already start; no second instance, no second spawn.
    assert_eq!(h.spawner.spawned().len(), first_spawns);
    assert_eq!(h.instance_count("hello"), 1);
}
