// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::core::tests::Harness;
use warden_core::{EventProgress, Goal, JobState, ProcessType};

fn round_trip(h: &Harness) -> Harness {
    let snapshot = Snapshot::capture(&h.core);

    let mut buffer = Vec::new();
    snapshot.write_to(&mut buffer).unwrap();
    let restored = Snapshot::read_from(buffer.as_slice()).unwrap();

    let mut fresh = Harness::new();
    restored.restore(&mut fresh.core).unwrap();
    fresh
}

#[test]
fn running_service_round_trips() {
    let mut h = Harness::new();
    h.load(
        r#"
[job.svc]
exec = "/bin/sleep 100"
start_on = "startup"
stop_on = "shutdown"
"#,
    );
    h.emit("startup");
    let pid = h.spawner.last_pid().unwrap();
    assert_eq!(h.job("svc", "").unwrap().state, JobState::Running);

    let fresh = round_trip(&h);

    let job = fresh.job("svc", "").unwrap();
    assert_eq!(job.goal, Goal::Start);
    assert_eq!(job.state, JobState::Running);
    assert_eq!(job.pids.get(ProcessType::Main), Some(pid));
    assert!(!job.failed);
    assert_eq!(job.respawn_count, 0);
    assert!(job.stop_on.is_some());
}

#[test]
fn restored_reaper_routing_still_works() {
    let mut h = Harness::new();
    h.load(
        r#"
[job.svc]
exec = "/bin/sleep 100"
start_on = "startup"
"#,
    );
    h.emit("startup");
    let pid = h.spawner.last_pid().unwrap();

    let mut fresh = round_trip(&h);

    // The next exit for the adopted pid drives the normal stop path.
    fresh.child_exit(pid, 0);
    assert_eq!(fresh.instance_count("svc"), 0);
    assert!(fresh
        .event_log()
        .contains(&"stopped JOB=svc INSTANCE= RESULT=ok".to_string()));
}

#[test]
fn blocked_job_and_held_event_round_trip() {
    let mut h = Harness::new();
    h.load(
        r#"
[job.svc]
exec = "/bin/sleep 100"
start_on = "go"

[job.svc.pre_start]
exec = "/bin/prepare"
"#,
    );
    h.emit("go");
    let hook_pid = h.spawner.last_pid().unwrap();

    // Mid-start: the job waits on its hook, the event on the job.
    let held = h.core.queue.iter_ordered().next().unwrap();
    assert_eq!(held.name, "go");
    assert_eq!(held.progress, EventProgress::Handling);
    assert_eq!(held.blockers, 1);

    let fresh = round_trip(&h);

    let event = fresh.core.queue.iter_ordered().next().unwrap();
    assert_eq!(event.name, "go");
    assert_eq!(event.progress, EventProgress::Handling);
    assert_eq!(event.blockers, 1);
    fresh.assert_blocker_invariant();

    let job = fresh.job("svc", "").unwrap();
    assert_eq!(job.state, JobState::PreStart);
    assert_eq!(job.pids.get(ProcessType::PreStart), Some(hook_pid));

    // Finishing the hook after restore releases the held event.
    let mut fresh = fresh;
    fresh.child_exit(hook_pid, 0);
    assert!(fresh.core.queue.is_empty());
    assert_eq!(fresh.job("svc", "").unwrap().state, JobState::Running);
}

#[test]
fn starting_blocker_links_round_trip() {
    let mut h = Harness::new();
    h.load(
        r#"
[job.gate]
exec = "/bin/sleep 100"
start_on = "open"

[job.svc]
exec = "/bin/sleep 100"
start_on = "starting JOB=gate"

[job.svc.pre_start]
exec = "/bin/prepare"
"#,
    );
    // svc is started by gate's starting event and holds it open while its
    // own pre-start runs; gate is blocked in STARTING meanwhile.
    h.emit("open");
    assert_eq!(h.job("gate", "").unwrap().state, JobState::Starting);
    assert!(h.job("gate", "").unwrap().blocker.is_some());
    assert_eq!(h.job("svc", "").unwrap().state, JobState::PreStart);

    let mut fresh = round_trip(&h);

    let gate = fresh.job("gate", "").unwrap();
    assert_eq!(gate.state, JobState::Starting);
    assert!(gate.blocker.is_some());
    fresh.assert_blocker_invariant();
    fresh.assert_blocked_jobs_linked();

    // svc's hook completing releases the chain: both end up running.
    let hook_pid = fresh.job("svc", "").unwrap().pids.get(ProcessType::PreStart).unwrap();
    fresh.child_exit(hook_pid, 0);
    assert_eq!(fresh.job("svc", "").unwrap().state, JobState::Running);
    assert_eq!(fresh.job("gate", "").unwrap().state, JobState::Running);
}

#[test]
fn kill_timer_remaining_round_trips() {
    let mut h = Harness::new();
    h.load(
        r#"
[job.svc]
exec = "/bin/sleep 100"
kill_timeout = 30
"#,
    );
    h.start("svc", false);
    h.stop("svc", false);
    assert_eq!(h.job("svc", "").unwrap().state, JobState::Killed);

    let fresh = round_trip(&h);

    let job = fresh.job("svc", "").unwrap();
    assert_eq!(job.state, JobState::Killed);
    let timer = job.kill_timer.clone().unwrap();
    let remaining = fresh
        .core
        .scheduler
        .remaining(&timer, fresh.clock.now())
        .unwrap();
    assert!(remaining <= std::time::Duration::from_secs(30));
    assert!(remaining > std::time::Duration::from_secs(1));
}

#[test]
fn failure_fields_round_trip() {
    let mut h = Harness::new();
    h.load(
        r#"
[job.svc]
exec = "/bin/sleep 100"
start_on = "go"

[job.svc.post_stop]
exec = "/bin/cleanup"
"#,
    );
    h.spawner.fail_spawn("svc", ProcessType::Main);
    h.emit("go");

    // The job is mid post-stop after a main spawn failure.
    let job = h.job("svc", "").unwrap();
    assert!(job.failed);
    assert_eq!(job.state, JobState::PostStop);

    let fresh = round_trip(&h);
    let job = fresh.job("svc", "").unwrap();
    assert!(job.failed);
    assert_eq!(
        job.failed_process,
        Some(warden_core::FailedProcess::Process(ProcessType::Main))
    );
}

#[test]
fn unsupported_version_is_rejected() {
    let mut h = Harness::new();
    h.load("[job.svc]\nexec = \"/bin/true\"\n");
    let mut snapshot = Snapshot::capture(&h.core);
    snapshot.version = 99;

    let mut buffer = Vec::new();
    serde_json::to_writer(&mut buffer, &snapshot).unwrap();
    assert!(matches!(
        Snapshot::read_from(buffer.as_slice()),
        Err(SnapshotError::Version(99))
    ));
}

#[test]
fn garbage_is_a_json_error() {
    assert!(matches!(
        Snapshot::read_from(&b"not json"[..]),
        Err(SnapshotError::Json(_))
    ));
}

#[test]
fn classes_without_instances_are_not_captured() {
    let mut h = Harness::new();
    h.load("[job.idle]\nexec = \"/bin/true\"\n");

    let fresh = round_trip(&h);
    assert!(fresh.core.registry.is_empty());
}
