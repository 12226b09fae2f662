// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job instances and the goal × state transition table.
//!
//! A job is the live embodiment of a class: it carries the goal it is being
//! driven toward (start, stop, respawn), its current lifecycle state, the
//! pid of each process it has running, its environment, and the blocking
//! bookkeeping that ties it into the event queue.

use crate::blocked::Blocked;
use crate::class::ClassId;
use crate::env::EnvList;
use crate::event::EventId;
use crate::operator::Operator;
use crate::timer::TimerId;
use serde::{Deserialize, Serialize};
use std::fmt;

crate::define_index_id! {
    /// Index of a job instance in the core arena.
    pub struct JobId;
}

/// The intent a job is being driven toward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Goal {
    Stop,
    Start,
    /// Like start, but the stop half of the cycle skips pre-stop: the main
    /// process is already dead.
    Respawn,
}

impl fmt::Display for Goal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Goal::Stop => write!(f, "stop"),
            Goal::Start => write!(f, "start"),
            Goal::Respawn => write!(f, "respawn"),
        }
    }
}

/// Lifecycle state of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Waiting,
    Starting,
    PreStart,
    Spawned,
    PostStart,
    Running,
    PreStop,
    Stopping,
    Killed,
    PostStop,
}

impl JobState {
    fn index(self) -> usize {
        match self {
            JobState::Waiting => 0,
            JobState::Starting => 1,
            JobState::PreStart => 2,
            JobState::Spawned => 3,
            JobState::PostStart => 4,
            JobState::Running => 5,
            JobState::PreStop => 6,
            JobState::Stopping => 7,
            JobState::Killed => 8,
            JobState::PostStop => 9,
        }
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobState::Waiting => write!(f, "waiting"),
            JobState::Starting => write!(f, "starting"),
            JobState::PreStart => write!(f, "pre-start"),
            JobState::Spawned => write!(f, "spawned"),
            JobState::PostStart => write!(f, "post-start"),
            JobState::Running => write!(f, "running"),
            JobState::PreStop => write!(f, "pre-stop"),
            JobState::Stopping => write!(f, "stopping"),
            JobState::Killed => write!(f, "killed"),
            JobState::PostStop => write!(f, "post-stop"),
        }
    }
}

/// The processes a class may define, and a job may have running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessType {
    PreStart,
    Main,
    PostStart,
    PreStop,
    PostStop,
}

impl ProcessType {
    pub const ALL: [ProcessType; 5] = [
        ProcessType::PreStart,
        ProcessType::Main,
        ProcessType::PostStart,
        ProcessType::PreStop,
        ProcessType::PostStop,
    ];

    pub fn index(self) -> usize {
        match self {
            ProcessType::PreStart => 0,
            ProcessType::Main => 1,
            ProcessType::PostStart => 2,
            ProcessType::PreStop => 3,
            ProcessType::PostStop => 4,
        }
    }
}

impl fmt::Display for ProcessType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProcessType::PreStart => write!(f, "pre-start"),
            ProcessType::Main => write!(f, "main"),
            ProcessType::PostStart => write!(f, "post-start"),
            ProcessType::PreStop => write!(f, "pre-stop"),
            ProcessType::PostStop => write!(f, "post-stop"),
        }
    }
}

/// Live pid per process type. `None` means not running.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PidTable([Option<u32>; 5]);

impl PidTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, process: ProcessType) -> Option<u32> {
        self.0[process.index()]
    }

    pub fn set(&mut self, process: ProcessType, pid: u32) {
        self.0[process.index()] = Some(pid);
    }

    pub fn clear(&mut self, process: ProcessType) {
        self.0[process.index()] = None;
    }

    /// Which process a pid belongs to, if any.
    pub fn process_of(&self, pid: u32) -> Option<ProcessType> {
        ProcessType::ALL
            .into_iter()
            .find(|p| self.0[p.index()] == Some(pid))
    }

    pub fn iter(&self) -> impl Iterator<Item = (ProcessType, u32)> + '_ {
        ProcessType::ALL
            .into_iter()
            .filter_map(|p| self.0[p.index()].map(|pid| (p, pid)))
    }

    pub fn is_empty(&self) -> bool {
        self.0.iter().all(Option::is_none)
    }
}

/// Which process a failure is attributed to.
///
/// `Respawn` marks a respawn-loop failure rather than a process failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailedProcess {
    Respawn,
    Process(ProcessType),
}

impl fmt::Display for FailedProcess {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailedProcess::Respawn => write!(f, "respawn"),
            FailedProcess::Process(p) => write!(f, "{p}"),
        }
    }
}

/// Fork-trace progress for classes with `expect` set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TraceState {
    #[default]
    None,
    /// Waiting for the tracer to report the effective main pid.
    Tracing,
    Done,
}

/// A live instantiation of a job class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub class: ClassId,
    /// Expanded instance name; empty for a singleton class.
    #[serde(default)]
    pub name: String,
    pub goal: Goal,
    pub state: JobState,
    #[serde(default)]
    pub pids: PidTable,
    #[serde(default)]
    pub env: EnvList,
    /// Environment to swap in at the next STARTING entry.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_env: Option<EnvList>,
    /// Environment to swap in at the next PRE_STOP entry.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_env: Option<EnvList>,
    /// Per-instance copy of the class stop condition, so match state is
    /// private to this instance.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_on: Option<Operator>,
    /// Event this job is waiting on; the job does not advance until it
    /// finishes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blocker: Option<EventId>,
    /// Events and replies this job must release when its transition settles.
    #[serde(default)]
    pub blocking: Vec<Blocked>,
    /// Armed kill timer, while a stubborn main process is being killed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kill_timer: Option<TimerId>,
    #[serde(default)]
    pub failed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failed_process: Option<FailedProcess>,
    /// Wait status of the failed process, in the encoding of
    /// [`crate::signal`]. `None` until a failure is recorded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit_status: Option<i32>,
    #[serde(default)]
    pub respawn_count: u32,
    /// Epoch ms at which the current respawn-rate window opened.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub respawn_window_ms: Option<u64>,
    #[serde(default)]
    pub trace_forks: u32,
    #[serde(default)]
    pub trace_state: TraceState,
}

impl Job {
    pub fn new(id: JobId, class: ClassId, name: impl Into<String>) -> Self {
        Self {
            id,
            class,
            name: name.into(),
            goal: Goal::Stop,
            state: JobState::Waiting,
            pids: PidTable::new(),
            env: EnvList::new(),
            start_env: None,
            stop_env: None,
            stop_on: None,
            blocker: None,
            blocking: Vec::new(),
            kill_timer: None,
            failed: false,
            failed_process: None,
            exit_status: None,
            respawn_count: 0,
            respawn_window_ms: None,
            trace_forks: 0,
            trace_state: TraceState::None,
        }
    }

    pub fn main_pid(&self) -> Option<u32> {
        self.pids.get(ProcessType::Main)
    }

    /// Clear failure bookkeeping at the start of a fresh cycle.
    pub fn clear_failure(&mut self) {
        self.failed = false;
        self.failed_process = None;
        self.exit_status = None;
    }
}

/// The state to enter next, possibly with a goal adjustment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NextStep {
    pub state: JobState,
    /// Set when the transition itself flips the goal (respawn rows).
    pub new_goal: Option<Goal>,
}

impl NextStep {
    fn to(state: JobState) -> Self {
        Self {
            state,
            new_goal: None,
        }
    }
}

/// One cell of the transition table.
#[derive(Debug, Clone, Copy)]
enum Transition {
    Goto(JobState),
    /// RUNNING with goal stop: pre-stop only if a live main process exists.
    StopFromRunning,
    /// Respawn observed mid-cycle: flip the goal to start, stop first.
    FlipRespawn,
    Invalid,
}

/// Rows indexed by [`JobState::index`], columns by goal (stop, start,
/// respawn). This is the single source of truth for legal transitions.
const TRANSITIONS: [[Transition; 3]; 10] = {
    use JobState::*;
    use Transition::*;
    [
        // waiting
        [Invalid, Goto(Starting), Goto(Starting)],
        // starting
        [Goto(Stopping), Goto(PreStart), Goto(PreStart)],
        // pre-start
        [Goto(Stopping), Goto(Spawned), Goto(Spawned)],
        // spawned
        [Goto(Stopping), Goto(PostStart), Goto(PostStart)],
        // post-start
        [Goto(Stopping), Goto(Running), FlipRespawn],
        // running
        [StopFromRunning, Goto(Stopping), Goto(Stopping)],
        // pre-stop
        [Goto(Stopping), Goto(Running), FlipRespawn],
        // stopping
        [Goto(Killed), Goto(Killed), Goto(Killed)],
        // killed
        [Goto(PostStop), Goto(PostStop), Goto(PostStop)],
        // post-stop
        [Goto(Waiting), Goto(Starting), Goto(Starting)],
    ]
};

/// The legal successor of `(state, goal)`, or `None` for the one impossible
/// combination (waiting, stop). A broken transition table is a supervisor
/// bug; callers treat `None` as fatal.
pub fn next_state(
    state: JobState,
    goal: Goal,
    has_main: bool,
    main_alive: bool,
) -> Option<NextStep> {
    let column = match goal {
        Goal::Stop => 0,
        Goal::Start => 1,
        Goal::Respawn => 2,
    };
    match TRANSITIONS[state.index()][column] {
        Transition::Goto(next) => Some(NextStep::to(next)),
        Transition::StopFromRunning => {
            if has_main && main_alive {
                Some(NextStep::to(JobState::PreStop))
            } else {
                Some(NextStep::to(JobState::Stopping))
            }
        }
        Transition::FlipRespawn => Some(NextStep {
            state: JobState::Stopping,
            new_goal: Some(Goal::Start),
        }),
        Transition::Invalid => None,
    }
}

#[cfg(test)]
#[path = "job_tests.rs"]
mod tests;
