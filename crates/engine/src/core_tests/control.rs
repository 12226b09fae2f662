// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Control-surface behaviour: errors, instances, status output.

use super::Harness;
use crate::core::Input;
use crate::error::CoreError;
use crate::reply::ReplyBody;
use warden_core::JobState;

const SVC: &str = r#"
[job.svc]
exec = "/bin/sleep 100"
"#;

const WORKER: &str = r#"
[job.worker]
exec = "/bin/sleep 100"
instance = "$ID"
"#;

#[test]
fn start_unknown_job_is_an_error() {
    let mut h = Harness::new();
    let (token, effects) = h.start("nope", false);
    assert_eq!(
        Harness::replies_for(&effects, token),
        vec![ReplyBody::Error {
            error: CoreError::UnknownJob {
                name: "nope".into()
            }
        }]
    );
}

#[test]
fn start_twice_reports_already_started() {
    let mut h = Harness::new();
    h.load(SVC);
    h.start("svc", false);

    let (token, effects) = h.start("svc", false);
    assert_eq!(
        Harness::replies_for(&effects, token),
        vec![ReplyBody::Error {
            error: CoreError::AlreadyStarted { name: "svc".into() }
        }]
    );
    // The running instance was untouched.
    assert_eq!(h.spawner.spawned().len(), 1);
}

#[test]
fn stop_without_instance_reports_unknown_instance() {
    let mut h = Harness::new();
    h.load(SVC);
    let (token, effects) = h.stop("svc", false);
    assert_eq!(
        Harness::replies_for(&effects, token),
        vec![ReplyBody::Error {
            error: CoreError::UnknownInstance {
                name: "svc".into(),
                instance: String::new(),
            }
        }]
    );
}

#[test]
fn stop_twice_reports_already_stopped() {
    let mut h = Harness::new();
    h.load(SVC);
    h.start("svc", false);
    h.stop("svc", false);

    let (token, effects) = h.stop("svc", false);
    assert_eq!(
        Harness::replies_for(&effects, token),
        vec![ReplyBody::Error {
            error: CoreError::AlreadyStopped { name: "svc".into() }
        }]
    );
}

#[test]
fn stop_wait_resolves_when_the_job_is_gone() {
    let mut h = Harness::new();
    h.load(SVC);
    h.start("svc", false);
    let pid = h.spawner.last_pid().unwrap();

    let (token, effects) = h.stop("svc", true);
    assert!(Harness::replies_for(&effects, token).is_empty());

    let effects = h.child_exit(pid, warden_core::signal::encode_signaled(15));
    assert_eq!(
        Harness::replies_for(&effects, token),
        vec![ReplyBody::Stopped { job: "svc".into() }]
    );
    assert_eq!(h.instance_count("svc"), 0);
}

#[test]
fn restart_cycles_the_process_with_a_new_pid() {
    let mut h = Harness::new();
    h.load(SVC);
    h.start("svc", false);
    let old_pid = h.spawner.last_pid().unwrap();

    let (token, effects) = h.restart("svc", true);
    assert!(Harness::replies_for(&effects, token).is_empty());
    assert_eq!(h.job("svc", "").unwrap().state, JobState::Killed);

    let effects = h.child_exit(old_pid, warden_core::signal::encode_signaled(15));

    let job = h.job("svc", "").unwrap();
    assert_eq!(job.state, JobState::Running);
    assert_ne!(job.main_pid(), Some(old_pid));
    match &Harness::replies_for(&effects, token)[..] {
        [ReplyBody::Started { job }] => assert_eq!(job.state, "running"),
        other => panic!("expected started reply, got {other:?}"),
    }
}

#[test]
fn restart_without_instance_reports_unknown_instance() {
    let mut h = Harness::new();
    h.load(SVC);
    let (token, effects) = h.restart("svc", false);
    assert!(matches!(
        &Harness::replies_for(&effects, token)[..],
        [ReplyBody::Error {
            error: CoreError::UnknownInstance { .. }
        }]
    ));
}

#[test]
fn instance_template_spins_up_separate_jobs() {
    let mut h = Harness::new();
    h.load(WORKER);

    let token = h.reply_token();
    h.handle(Input::Start {
        name: "worker".into(),
        env: vec!["ID=a".into()],
        wait: false,
        session: None,
        reply: token,
    });
    let token = h.reply_token();
    h.handle(Input::Start {
        name: "worker".into(),
        env: vec!["ID=b".into()],
        wait: false,
        session: None,
        reply: token,
    });

    assert_eq!(h.instance_count("worker"), 2);
    assert!(h.job("worker", "a").is_some());
    assert!(h.job("worker", "b").is_some());
    assert_eq!(h.spawner.spawned().len(), 2);
}

#[test]
fn starting_the_same_instance_twice_is_an_error() {
    let mut h = Harness::new();
    h.load(WORKER);

    let token = h.reply_token();
    h.handle(Input::Start {
        name: "worker".into(),
        env: vec!["ID=a".into()],
        wait: false,
        session: None,
        reply: token,
    });

    let token = h.reply_token();
    let effects = h.handle(Input::Start {
        name: "worker".into(),
        env: vec!["ID=a".into()],
        wait: false,
        session: None,
        reply: token,
    });

    assert!(matches!(
        &Harness::replies_for(&effects, token)[..],
        [ReplyBody::Error {
            error: CoreError::AlreadyStarted { .. }
        }]
    ));
    assert_eq!(h.instance_count("worker"), 1);
    assert_eq!(h.spawner.spawned().len(), 1);
}

#[test]
fn status_reports_goal_state_and_pids() {
    let mut h = Harness::new();
    h.load(SVC);
    h.start("svc", false);
    let pid = h.spawner.last_pid().unwrap();

    let token = h.reply_token();
    let effects = h.handle(Input::Status {
        name: "svc".into(),
        session: None,
        reply: token,
    });

    match &Harness::replies_for(&effects, token)[..] {
        [ReplyBody::Status { class }] => {
            assert_eq!(class.name, "svc");
            assert_eq!(class.instances.len(), 1);
            let job = &class.instances[0];
            assert_eq!(job.goal, "start");
            assert_eq!(job.state, "running");
            assert_eq!(job.pids.len(), 1);
            assert_eq!(job.pids[0].process, "main");
            assert_eq!(job.pids[0].pid, pid);
        }
        other => panic!("expected status reply, got {other:?}"),
    }
}

#[test]
fn list_includes_idle_classes() {
    let mut h = Harness::new();
    h.load(SVC);
    h.load(SVC); // idempotent reload

    let token = h.reply_token();
    let effects = h.handle(Input::List {
        session: None,
        reply: token,
    });

    match &Harness::replies_for(&effects, token)[..] {
        [ReplyBody::List { classes }] => {
            assert_eq!(classes.len(), 1);
            assert_eq!(classes[0].name, "svc");
            assert!(classes[0].instances.is_empty());
        }
        other => panic!("expected list reply, got {other:?}"),
    }
}
