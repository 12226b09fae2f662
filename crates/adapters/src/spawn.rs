// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Spawning and signalling job processes.
//!
//! The spawner is deliberately synchronous: state-machine entry actions
//! consume spawn failures inline, so the call either returns a live pid or
//! an error the machine records before advancing. Children are never waited
//! on here; the reaper owns `waitpid`.

use std::path::PathBuf;
use std::process::{Command, Stdio};
use thiserror::Error;
use tracing::{debug, warn};
use warden_core::{ConsoleMode, ProcessType};

/// Errors from spawning or signalling.
#[derive(Debug, Error)]
pub enum SpawnError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("unknown user: {0}")]
    UnknownUser(String),

    #[error("unknown group: {0}")]
    UnknownGroup(String),

    #[error("bad signal number: {0}")]
    BadSignal(i32),

    #[error("kill failed: {0}")]
    Kill(nix::Error),

    #[error("spawn failed: {0}")]
    Failed(String),
}

/// Everything the spawner needs to start one job process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpawnRequest {
    /// Display name for logs, `class` or `class-instance`.
    pub job: String,
    pub process: ProcessType,
    pub command: String,
    /// Run as a script body under `sh -e`.
    pub script: bool,
    /// Full child environment as `KEY=VALUE` entries.
    pub env: Vec<String>,
    pub cwd: Option<PathBuf>,
    pub setuid: Option<String>,
    pub setgid: Option<String>,
    pub console: ConsoleMode,
    pub oom_score_adj: Option<i16>,
}

/// Starts and signals job processes.
pub trait ProcessSpawner: Send + Sync {
    /// Fork and exec the requested process, returning its pid.
    fn spawn(&self, request: &SpawnRequest) -> Result<u32, SpawnError>;

    /// Deliver `signal` to the process group of `pid`.
    fn kill(&self, pid: u32, signal: i32) -> Result<(), SpawnError>;
}

/// The real spawner.
#[derive(Debug, Clone)]
pub struct UnixSpawner {
    log_dir: PathBuf,
    /// Discard job output instead of writing log files.
    no_log: bool,
}

/// Shell metacharacters that force a command through `sh -c`.
const SHELL_META: &[char] = &[
    '|', '&', ';', '<', '>', '(', ')', '$', '`', '\\', '"', '\'', '*', '?', '[', ']', '#', '~',
    '\n',
];

/// Whether a command line needs a shell to interpret it.
pub(crate) fn needs_shell(command: &str) -> bool {
    command.contains(SHELL_META)
}

impl UnixSpawner {
    pub fn new(log_dir: PathBuf, no_log: bool) -> Self {
        Self { log_dir, no_log }
    }

    fn build_command(&self, request: &SpawnRequest) -> Result<Command, SpawnError> {
        let mut command = if request.script {
            let mut c = Command::new("/bin/sh");
            c.args(["-e", "-c", &request.command]);
            c
        } else if needs_shell(&request.command) {
            let mut c = Command::new("/bin/sh");
            c.args(["-c", &request.command]);
            c
        } else {
            let mut words = request.command.split_whitespace();
            let program = words
                .next()
                .ok_or_else(|| SpawnError::Failed("empty command".into()))?;
            let mut c = Command::new(program);
            c.args(words);
            c
        };

        command.env_clear();
        for key in ["TERM", "PATH"] {
            if let Ok(value) = std::env::var(key) {
                command.env(key, value);
            }
        }
        for entry in &request.env {
            if let Some((key, value)) = entry.split_once('=') {
                command.env(key, value);
            }
        }

        if let Some(cwd) = &request.cwd {
            command.current_dir(cwd);
        }

        command.stdin(Stdio::null());
        let output = self.output_for(request)?;
        match output {
            OutputSink::Null => {
                command.stdout(Stdio::null());
                command.stderr(Stdio::null());
            }
            OutputSink::Inherit => {
                command.stdout(Stdio::inherit());
                command.stderr(Stdio::inherit());
            }
            OutputSink::File(file) => {
                let clone = file.try_clone()?;
                command.stdout(Stdio::from(file));
                command.stderr(Stdio::from(clone));
            }
        }

        use std::os::unix::process::CommandExt;
        command.process_group(0);

        if let Some(user) = &request.setuid {
            let resolved = nix::unistd::User::from_name(user)
                .map_err(|e| SpawnError::Failed(e.to_string()))?
                .ok_or_else(|| SpawnError::UnknownUser(user.clone()))?;
            command.uid(resolved.uid.as_raw());
        }
        if let Some(group) = &request.setgid {
            let resolved = nix::unistd::Group::from_name(group)
                .map_err(|e| SpawnError::Failed(e.to_string()))?
                .ok_or_else(|| SpawnError::UnknownGroup(group.clone()))?;
            command.gid(resolved.gid.as_raw());
        }

        Ok(command)
    }

    fn output_for(&self, request: &SpawnRequest) -> Result<OutputSink, SpawnError> {
        match request.console {
            ConsoleMode::None => Ok(OutputSink::Null),
            ConsoleMode::Output => Ok(OutputSink::Inherit),
            ConsoleMode::Log => {
                if self.no_log {
                    return Ok(OutputSink::Null);
                }
                std::fs::create_dir_all(&self.log_dir)?;
                let path = self.log_dir.join(format!("{}.log", log_name(&request.job)));
                let file = std::fs::OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(path)?;
                Ok(OutputSink::File(file))
            }
        }
    }
}

enum OutputSink {
    Null,
    Inherit,
    File(std::fs::File),
}

/// Sanitise a job name for use as a log file name.
fn log_name(job: &str) -> String {
    job.chars()
        .map(|c| if c == '/' || c.is_whitespace() { '-' } else { c })
        .collect()
}

impl ProcessSpawner for UnixSpawner {
    fn spawn(&self, request: &SpawnRequest) -> Result<u32, SpawnError> {
        let mut command = self.build_command(request)?;
        let child = command.spawn()?;
        let pid = child.id();
        // The reaper collects the exit; dropping the handle does not wait.
        drop(child);

        if let Some(adj) = request.oom_score_adj {
            let path = format!("/proc/{pid}/oom_score_adj");
            if let Err(e) = std::fs::write(&path, adj.to_string()) {
                warn!(job = %request.job, pid, error = %e, "failed to set oom_score_adj");
            }
        }

        debug!(
            job = %request.job,
            process = %request.process,
            pid,
            command = %request.command,
            "spawned"
        );
        Ok(pid)
    }

    fn kill(&self, pid: u32, signal: i32) -> Result<(), SpawnError> {
        let signal =
            nix::sys::signal::Signal::try_from(signal).map_err(|_| SpawnError::BadSignal(signal))?;
        // Each job process leads its own group; signal the whole group.
        let group = nix::unistd::Pid::from_raw(-(pid as i32));
        match nix::sys::signal::kill(group, signal) {
            Ok(()) => Ok(()),
            Err(nix::Error::ESRCH) => {
                // Already gone; the reaper will deliver the exit.
                debug!(pid, "kill target already exited");
                Ok(())
            }
            Err(e) => Err(SpawnError::Kill(e)),
        }
    }
}

#[cfg(test)]
#[path = "spawn_tests.rs"]
mod tests;
