// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake collaborators for deterministic tests.

use crate::spawn::{ProcessSpawner, SpawnError, SpawnRequest};
use crate::trace::{ForkTracer, TraceOutcome};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;
use warden_core::{ExpectMode, ProcessType};

/// One recorded spawn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpawnRecord {
    pub job: String,
    pub process: ProcessType,
    pub command: String,
    pub env: Vec<String>,
    pub pid: u32,
}

#[derive(Debug, Default)]
struct FakeState {
    next_pid: u32,
    fail: HashSet<(String, ProcessType)>,
    spawned: Vec<SpawnRecord>,
    killed: Vec<(u32, i32)>,
}

/// A spawner that hands out fake pids and records every call.
#[derive(Debug, Clone)]
pub struct FakeSpawner {
    state: Arc<Mutex<FakeState>>,
}

impl Default for FakeSpawner {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeSpawner {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(FakeState {
                next_pid: 1000,
                ..FakeState::default()
            })),
        }
    }

    /// Make every spawn of `(job, process)` fail.
    pub fn fail_spawn(&self, job: &str, process: ProcessType) {
        self.state.lock().fail.insert((job.to_string(), process));
    }

    /// All spawns so far, in order.
    pub fn spawned(&self) -> Vec<SpawnRecord> {
        self.state.lock().spawned.clone()
    }

    /// All kills so far, as `(pid, signal)` pairs.
    pub fn killed(&self) -> Vec<(u32, i32)> {
        self.state.lock().killed.clone()
    }

    /// Pid handed out by the most recent spawn.
    pub fn last_pid(&self) -> Option<u32> {
        self.state.lock().spawned.last().map(|r| r.pid)
    }
}

impl ProcessSpawner for FakeSpawner {
    fn spawn(&self, request: &SpawnRequest) -> Result<u32, SpawnError> {
        let mut state = self.state.lock();
        if state
            .fail
            .contains(&(request.job.clone(), request.process))
        {
            return Err(SpawnError::Failed(format!(
                "refused to spawn {} {}",
                request.job, request.process
            )));
        }
        state.next_pid += 1;
        let pid = state.next_pid;
        state.spawned.push(SpawnRecord {
            job: request.job.clone(),
            process: request.process,
            command: request.command.clone(),
            env: request.env.clone(),
            pid,
        });
        Ok(pid)
    }

    fn kill(&self, pid: u32, signal: i32) -> Result<(), SpawnError> {
        self.state.lock().killed.push((pid, signal));
        Ok(())
    }
}

/// A tracer that reports a scripted outcome.
#[derive(Debug, Clone)]
pub struct FakeTracer {
    outcome: Arc<Mutex<Option<TraceOutcome>>>,
}

impl Default for FakeTracer {
    fn default() -> Self {
        Self {
            outcome: Arc::new(Mutex::new(None)),
        }
    }
}

impl FakeTracer {
    /// Script the next outcome; unscripted traces pass the pid through.
    pub fn set_outcome(&self, outcome: TraceOutcome) {
        *self.outcome.lock() = Some(outcome);
    }
}

impl ForkTracer for FakeTracer {
    fn begin(&self, pid: u32, _expect: ExpectMode) -> TraceOutcome {
        self.outcome.lock().take().unwrap_or(TraceOutcome {
            main_pid: pid,
            failed: false,
        })
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
