// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job classes: the templates jobs are instantiated from.
//!
//! A class carries everything the configuration declared for a job name:
//! the start/stop conditions, the command per process type, the kill and
//! respawn policy, credential and resource settings, and the registry
//! bookkeeping (`deleted`, instance map) used during reload reconciliation.

use crate::env::EnvList;
use crate::job::{JobId, ProcessType};
use crate::operator::Operator;
use crate::session::SessionId;
use crate::signal::SIGTERM;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

crate::define_index_id! {
    /// Index of a class in the registry arena.
    pub struct ClassId;
}

/// How many forks after the main exec identify the real daemon pid.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpectMode {
    #[default]
    None,
    /// Double-forking daemon: the grandchild is the real pid.
    Daemon,
    /// Single fork: the child is the real pid.
    Fork,
    /// The process raises SIGSTOP when ready.
    Stop,
}

/// Where a job's output goes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsoleMode {
    /// Captured to the per-job log file.
    #[default]
    Log,
    /// Discarded.
    None,
    /// Inherit the supervisor's own stdout/stderr.
    Output,
}

impl std::str::FromStr for ConsoleMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "log" => Ok(ConsoleMode::Log),
            "none" => Ok(ConsoleMode::None),
            "output" => Ok(ConsoleMode::Output),
            other => Err(format!("unknown console mode: {other:?}")),
        }
    }
}

/// Respawn policy with rate limiting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RespawnPolicy {
    pub enabled: bool,
    /// Respawns allowed within one interval before the job is failed.
    pub limit: u32,
    #[serde(with = "duration_secs")]
    pub interval: Duration,
}

impl Default for RespawnPolicy {
    fn default() -> Self {
        Self {
            enabled: false,
            limit: Self::DEFAULT_LIMIT,
            interval: Self::DEFAULT_INTERVAL,
        }
    }
}

impl RespawnPolicy {
    pub const DEFAULT_LIMIT: u32 = 10;
    pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(5);
}

/// An exit the class treats as normal: no failure, no respawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NormalExit {
    Status(i32),
    Signal(i32),
}

/// A recorded resource limit. Values are stored and reported; enforcement
/// is outside the supervisor core.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceLimit {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub soft: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hard: Option<u64>,
}

/// Command for one process slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessCommand {
    pub command: String,
    /// True for `script` stanzas: run under `sh -e` as a script body.
    #[serde(default)]
    pub script: bool,
}

impl ProcessCommand {
    pub fn exec(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            script: false,
        }
    }

    pub fn script(body: impl Into<String>) -> Self {
        Self {
            command: body.into(),
            script: true,
        }
    }
}

/// Commands per process type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProcessCommands([Option<ProcessCommand>; 5]);

impl ProcessCommands {
    pub fn get(&self, process: ProcessType) -> Option<&ProcessCommand> {
        self.0[process.index()].as_ref()
    }

    pub fn set(&mut self, process: ProcessType, command: ProcessCommand) {
        self.0[process.index()] = Some(command);
    }

    pub fn has(&self, process: ProcessType) -> bool {
        self.0[process.index()].is_some()
    }
}

/// A job template, keyed by name in the registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobClass {
    pub id: ClassId,
    pub name: String,
    /// Configuration file this class came from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<PathBuf>,
    /// Supervision domain; `None` is the system session.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session: Option<SessionId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Instance-name template, expanded against the start environment.
    /// Empty means the class is a singleton.
    #[serde(default)]
    pub instance: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_on: Option<Operator>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_on: Option<Operator>,
    /// Events this class documents that it emits. Informational only.
    #[serde(default)]
    pub emits: Vec<String>,
    #[serde(default)]
    pub processes: ProcessCommands,
    /// Tasks hold start-waiters until they have stopped again.
    #[serde(default)]
    pub task: bool,
    #[serde(default)]
    pub expect: ExpectMode,
    pub kill_signal: i32,
    #[serde(with = "duration_secs")]
    pub kill_timeout: Duration,
    #[serde(default)]
    pub respawn: RespawnPolicy,
    /// Exits treated as normal in addition to code 0.
    #[serde(default)]
    pub normal_exit: Vec<NormalExit>,
    #[serde(default)]
    pub env: EnvList,
    /// Job-env keys copied verbatim onto emitted lifecycle events.
    #[serde(default)]
    pub export: Vec<String>,
    #[serde(default)]
    pub console: ConsoleMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub umask: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nice: Option<i8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oom_score_adj: Option<i16>,
    /// Recorded rlimits by name (`core`, `nofile`, ...).
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub limits: HashMap<String, ResourceLimit>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chroot: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chdir: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub setuid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub setgid: Option<String>,
    /// True once a reload has dropped this class but instances remain.
    #[serde(default)]
    pub deleted: bool,
    /// Live instances by expanded name (singletons use the empty name).
    #[serde(default)]
    pub instances: HashMap<String, JobId>,
}

impl JobClass {
    pub fn new(id: ClassId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            source: None,
            session: None,
            description: None,
            instance: String::new(),
            start_on: None,
            stop_on: None,
            emits: Vec::new(),
            processes: ProcessCommands::default(),
            task: false,
            expect: ExpectMode::None,
            kill_signal: SIGTERM,
            kill_timeout: Self::DEFAULT_KILL_TIMEOUT,
            respawn: RespawnPolicy::default(),
            normal_exit: Vec::new(),
            env: EnvList::new(),
            export: Vec::new(),
            console: ConsoleMode::default(),
            umask: None,
            nice: None,
            oom_score_adj: None,
            limits: HashMap::new(),
            chroot: None,
            chdir: None,
            setuid: None,
            setgid: None,
            deleted: false,
            instances: HashMap::new(),
        }
    }

    pub const DEFAULT_KILL_TIMEOUT: Duration = Duration::from_secs(5);

    pub fn is_singleton(&self) -> bool {
        self.instance.is_empty()
    }

    pub fn has_process(&self, process: ProcessType) -> bool {
        self.processes.has(process)
    }

    /// Whether a wait status is a normal exit for this class.
    pub fn is_normal_exit(&self, status: i32) -> bool {
        use crate::signal::{wait_code, wait_signal};
        match wait_signal(status) {
            Some(signal) => self
                .normal_exit
                .iter()
                .any(|n| matches!(n, NormalExit::Signal(s) if *s == signal)),
            None => {
                let code = wait_code(status);
                code == 0
                    || self
                        .normal_exit
                        .iter()
                        .any(|n| matches!(n, NormalExit::Status(c) if *c == code))
            }
        }
    }
}

pub(crate) mod duration_secs {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(duration: &Duration, s: S) -> Result<S::Ok, S::Error> {
        duration.as_secs().serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let secs = u64::deserialize(d)?;
        Ok(Duration::from_secs(secs))
    }
}

#[cfg(test)]
#[path = "class_tests.rs"]
mod tests;
