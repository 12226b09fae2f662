// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job definitions as declared in configuration files.
//!
//! These structs mirror the file syntax; [`crate::build_class`] turns them
//! into the policy types the engine consumes.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A parsed configuration file: one or more labelled `job` blocks.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfFile {
    #[serde(default, alias = "job")]
    pub jobs: IndexMap<String, JobDef>,
}

/// A process stanza.
///
/// Accepts either:
///   `pre_start = "command"`                — exec shorthand
///   `pre_start { script = "..." }`         — block form
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProcessDef {
    Exec(String),
    Block {
        #[serde(default)]
        exec: Option<String>,
        #[serde(default)]
        script: Option<String>,
    },
}

/// Respawn stanza: `respawn = true` or `respawn { limit = 5, interval = 10 }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RespawnDef {
    Enabled(bool),
    Policy {
        #[serde(default)]
        limit: Option<u32>,
        /// Window in seconds.
        #[serde(default)]
        interval: Option<u64>,
    },
}

/// One entry of `normal_exit`: an exit code or a signal name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NormalExitDef {
    Code(i32),
    Signal(String),
}

/// One recorded rlimit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LimitDef {
    #[serde(default)]
    pub soft: Option<u64>,
    #[serde(default)]
    pub hard: Option<u64>,
}

/// A job declaration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JobDef {
    /// Class name (injected from the block label).
    #[serde(skip)]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Instance-name template; absent means singleton.
    #[serde(default)]
    pub instance: Option<String>,
    #[serde(default)]
    pub start_on: Option<String>,
    #[serde(default)]
    pub stop_on: Option<String>,
    /// Main process, exec form. Mutually exclusive with `script`.
    #[serde(default)]
    pub exec: Option<String>,
    /// Main process, script form.
    #[serde(default)]
    pub script: Option<String>,
    #[serde(default)]
    pub pre_start: Option<ProcessDef>,
    #[serde(default)]
    pub post_start: Option<ProcessDef>,
    #[serde(default)]
    pub pre_stop: Option<ProcessDef>,
    #[serde(default)]
    pub post_stop: Option<ProcessDef>,
    #[serde(default)]
    pub task: bool,
    /// `fork`, `daemon`, or `stop`.
    #[serde(default)]
    pub expect: Option<String>,
    #[serde(default)]
    pub respawn: Option<RespawnDef>,
    /// Signal name, e.g. `TERM` or `SIGUSR1`.
    #[serde(default)]
    pub kill_signal: Option<String>,
    /// Seconds before the kill escalates to SIGKILL.
    #[serde(default)]
    pub kill_timeout: Option<u64>,
    #[serde(default)]
    pub normal_exit: Vec<NormalExitDef>,
    #[serde(default)]
    pub env: IndexMap<String, String>,
    /// Job-env keys copied onto emitted lifecycle events.
    #[serde(default)]
    pub export: Vec<String>,
    /// Events this job documents that it emits.
    #[serde(default)]
    pub emits: Vec<String>,
    /// `log`, `none`, or `output`.
    #[serde(default)]
    pub console: Option<String>,
    /// Octal string, e.g. `"022"`.
    #[serde(default)]
    pub umask: Option<String>,
    #[serde(default)]
    pub nice: Option<i8>,
    #[serde(default)]
    pub oom_score_adj: Option<i16>,
    #[serde(default)]
    pub limits: IndexMap<String, LimitDef>,
    #[serde(default)]
    pub chroot: Option<PathBuf>,
    #[serde(default)]
    pub chdir: Option<PathBuf>,
    #[serde(default)]
    pub setuid: Option<String>,
    #[serde(default)]
    pub setgid: Option<String>,
}

#[cfg(test)]
#[path = "def_tests.rs"]
mod tests;
