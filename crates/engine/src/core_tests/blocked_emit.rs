// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `emit --wait` replies only once the whole event chain settles.

use super::Harness;
use crate::error::CoreError;
use crate::reply::ReplyBody;
use warden_core::ProcessType;

const CHAIN: &str = r#"
[job.svc]
exec = "/bin/sleep 100"
start_on = "custom"

[job.svc.pre_start]
exec = "/bin/prepare"
"#;

#[test]
fn emit_wait_blocks_until_started_job_settles() {
    let mut h = Harness::new();
    h.load(CHAIN);

    let (token, effects) = h.emit_wait("custom");
    // The started job holds the event open through its starting chain.
    assert!(Harness::replies_for(&effects, token).is_empty());
    h.assert_blocker_invariant();

    let hook_pid = h.spawner.last_pid().unwrap();
    let effects = h.child_exit(hook_pid, 0);

    let replies = Harness::replies_for(&effects, token);
    assert_eq!(
        replies,
        vec![ReplyBody::EventFinished {
            name: "custom".into()
        }]
    );
}

#[test]
fn emit_wait_fails_with_the_failing_job_name() {
    let mut h = Harness::new();
    h.load(CHAIN);
    h.spawner.fail_spawn("svc", ProcessType::PreStart);

    let (token, effects) = h.emit_wait("custom");

    let replies = Harness::replies_for(&effects, token);
    assert_eq!(
        replies,
        vec![ReplyBody::Error {
            error: CoreError::EventFailed {
                name: "custom".into(),
                job: Some("svc".into()),
            }
        }]
    );
}

#[test]
fn failed_event_derives_failed_variant() {
    let mut h = Harness::new();
    h.load(CHAIN);
    h.spawner.fail_spawn("svc", ProcessType::PreStart);

    h.emit("custom");

    assert!(h.event_names().iter().any(|n| n == "custom/failed"));
    // The derived event must not derive again.
    let derived = h
        .event_names()
        .iter()
        .filter(|n| n.ends_with("/failed"))
        .count();
    assert_eq!(derived, 1);
}

#[test]
fn emit_wait_with_no_listeners_replies_immediately() {
    let mut h = Harness::new();

    let (token, effects) = h.emit_wait("lonely");

    assert_eq!(
        Harness::replies_for(&effects, token),
        vec![ReplyBody::EventFinished {
            name: "lonely".into()
        }]
    );
}

#[test]
fn emit_with_bad_env_is_rejected() {
    let mut h = Harness::new();
    let token = h.reply_token();
    let effects = h.handle(crate::core::Input::Emit {
        name: "custom".into(),
        env: vec!["NOEQ".into()],
        session: None,
        reply: Some(token),
    });

    match &Harness::replies_for(&effects, token)[..] {
        [ReplyBody::Error {
            error: CoreError::BadEnvironment { .. },
        }] => {}
        other => panic!("expected bad environment error, got {other:?}"),
    }
}
