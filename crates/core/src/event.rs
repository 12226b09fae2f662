// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Events and their lifecycle.
//!
//! An event is a named occurrence with an environment. Events are processed
//! in three phases: they are created PENDING, become HANDLING once every
//! class has seen them, and FINISHED once nothing holds a blocker on them
//! any more. A FINISHED event wakes everything in its `blocking` list and is
//! then freed.

use crate::blocked::{Blocked, ReplyToken};
use crate::env::EnvList;
use crate::session::SessionId;
use serde::{Deserialize, Serialize};

crate::define_index_id! {
    /// Index of an event in the event queue arena.
    pub struct EventId;
}

/// Event emitted when a job begins starting. Blocks the job until handled.
pub const STARTING_EVENT: &str = "starting";
/// Event emitted when a job is running (or, for tasks, about to run).
pub const STARTED_EVENT: &str = "started";
/// Event emitted when a job begins stopping. Blocks the job until handled.
pub const STOPPING_EVENT: &str = "stopping";
/// Event emitted once a job has fully stopped.
pub const STOPPED_EVENT: &str = "stopped";

/// Environment variable naming the job class in lifecycle events.
pub const JOB_ENV: &str = "JOB";
/// Environment variable naming the instance in lifecycle events.
pub const INSTANCE_ENV: &str = "INSTANCE";
/// Environment variable carrying `ok` or `failed` on stop events.
pub const RESULT_ENV: &str = "RESULT";
/// Environment variable naming the failed process on stop events.
pub const PROCESS_ENV: &str = "PROCESS";
/// Environment variable carrying the exit code of a failed process.
pub const EXIT_STATUS_ENV: &str = "EXIT_STATUS";
/// Environment variable carrying the signal name/number of a killed process.
pub const EXIT_SIGNAL_ENV: &str = "EXIT_SIGNAL";
/// Environment variable listing the events a start/stop operator matched.
pub const MATCHED_EVENTS_ENV: &str = "WARDEN_EVENTS";

/// Suffix appended to the name of an event re-emitted after failure.
pub const FAILED_EVENT_SUFFIX: &str = "/failed";

/// Progress of an event through the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventProgress {
    Pending,
    Handling,
    Finished,
}

/// A queued event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub name: String,
    #[serde(default)]
    pub env: EnvList,
    /// Supervision domain this event is scoped to. `None` is the system.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session: Option<SessionId>,
    pub progress: EventProgress,
    /// Set when a job this event started or stopped failed.
    #[serde(default)]
    pub failed: bool,
    /// Name of the first job whose failure marked this event failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failed_by: Option<String>,
    /// Number of holds on this event; it cannot finish while nonzero.
    #[serde(default)]
    pub blockers: u32,
    /// Parties to wake when this event finishes.
    #[serde(default)]
    pub blocking: Vec<Blocked>,
    /// Reply handle of an `emit --wait` caller, answered at FINISHED.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply: Option<ReplyToken>,
}

impl Event {
    pub fn new(id: EventId, name: impl Into<String>, env: EnvList) -> Self {
        Self {
            id,
            name: name.into(),
            env,
            session: None,
            progress: EventProgress::Pending,
            failed: false,
            failed_by: None,
            blockers: 0,
            blocking: Vec::new(),
            reply: None,
        }
    }

    /// Whether a `{name}/failed` event should be derived on failure.
    pub fn wants_failed_event(&self) -> bool {
        self.failed && !self.name.ends_with(FAILED_EVENT_SUFFIX)
    }

    /// Name of the derived failure event.
    pub fn failed_name(&self) -> String {
        format!("{}{}", self.name, FAILED_EVENT_SUFFIX)
    }

    pub fn log_summary(&self) -> String {
        let mut out = format!("{} [{}]", self.name, self.id);
        for entry in self.env.entries() {
            out.push(' ');
            out.push_str(entry);
        }
        out
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
