// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::spawn::SpawnRequest;
use warden_core::ConsoleMode;

fn request(job: &str, process: ProcessType) -> SpawnRequest {
    SpawnRequest {
        job: job.into(),
        process,
        command: "/bin/true".into(),
        script: false,
        env: Vec::new(),
        cwd: None,
        setuid: None,
        setgid: None,
        console: ConsoleMode::None,
        oom_score_adj: None,
    }
}

#[test]
fn spawn_hands_out_increasing_pids() {
    let spawner = FakeSpawner::new();
    let a = spawner.spawn(&request("a", ProcessType::Main)).unwrap();
    let b = spawner.spawn(&request("b", ProcessType::Main)).unwrap();
    assert!(b > a);
    assert_eq!(spawner.last_pid(), Some(b));
}

#[test]
fn spawn_records_requests() {
    let spawner = FakeSpawner::new();
    spawner.spawn(&request("svc", ProcessType::PreStart)).unwrap();

    let records = spawner.spawned();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].job, "svc");
    assert_eq!(records[0].process, ProcessType::PreStart);
}

#[test]
fn scripted_failures_fail_spawn() {
    let spawner = FakeSpawner::new();
    spawner.fail_spawn("svc", ProcessType::Main);

    assert!(spawner.spawn(&request("svc", ProcessType::Main)).is_err());
    // Other processes of the same job still spawn.
    assert!(spawner.spawn(&request("svc", ProcessType::PreStart)).is_ok());
}

#[test]
fn kill_is_recorded() {
    let spawner = FakeSpawner::new();
    spawner.kill(1234, 15).unwrap();
    assert_eq!(spawner.killed(), vec![(1234, 15)]);
}

#[test]
fn fake_tracer_passes_through_by_default() {
    let tracer = FakeTracer::default();
    let outcome = tracer.begin(55, ExpectMode::Daemon);
    assert_eq!(outcome.main_pid, 55);
    assert!(!outcome.failed);
}

#[test]
fn fake_tracer_reports_scripted_outcome_once() {
    let tracer = FakeTracer::default();
    tracer.set_outcome(TraceOutcome {
        main_pid: 99,
        failed: false,
    });

    assert_eq!(tracer.begin(55, ExpectMode::Fork).main_pid, 99);
    assert_eq!(tracer.begin(55, ExpectMode::Fork).main_pid, 55);
}
