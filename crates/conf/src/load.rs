// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Directory loading and class construction.
//!
//! `load_dir` reads every `*.toml` / `*.conf` / `*.hcl` file in the
//! configuration directory (sorted, so precedence is deterministic), parses
//! the job blocks, and builds `JobClass` templates. Each source file is
//! content-hashed so callers can tell whether a reload would change
//! anything.

use crate::def::{JobDef, NormalExitDef, ProcessDef, RespawnDef};
use crate::on_expr::{parse_on, OnParseError};
use crate::parse::{parse_conf, Format, ParseError};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};
use warden_core::{
    signal_from_name, ClassId, ConsoleMode, EnvList, JobClass, NormalExit, ProcessCommand,
    ProcessType, ResourceLimit, RespawnPolicy,
};

/// Errors from loading a configuration directory.
#[derive(Debug, Error)]
pub enum ConfError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parse error in {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: ParseError,
    },

    #[error("invalid {field} in job {job:?}: {message}")]
    Invalid {
        job: String,
        field: &'static str,
        message: String,
    },

    #[error("invalid {field} expression in job {job:?}: {source}")]
    On {
        job: String,
        field: &'static str,
        #[source]
        source: OnParseError,
    },
}

/// One loaded source file, identified by path and content digest.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ConfSource {
    pub path: PathBuf,
    /// Hex sha256 of the file contents.
    pub digest: String,
}

/// Result of loading a configuration directory.
#[derive(Debug, Default)]
pub struct LoadResult {
    pub classes: Vec<JobClass>,
    pub sources: Vec<ConfSource>,
}

impl LoadResult {
    /// Whether another load produced identical sources.
    pub fn same_sources(&self, other: &[ConfSource]) -> bool {
        self.sources == other
    }
}

fn invalid(job: &str, field: &'static str, message: impl Into<String>) -> ConfError {
    ConfError::Invalid {
        job: job.to_string(),
        field,
        message: message.into(),
    }
}

fn process_command(def: &ProcessDef, job: &str, field: &'static str) -> Result<ProcessCommand, ConfError> {
    match def {
        ProcessDef::Exec(command) => Ok(ProcessCommand::exec(command.clone())),
        ProcessDef::Block { exec, script } => match (exec, script) {
            (Some(command), None) => Ok(ProcessCommand::exec(command.clone())),
            (None, Some(body)) => Ok(ProcessCommand::script(body.clone())),
            (Some(_), Some(_)) => Err(invalid(job, field, "exec and script are mutually exclusive")),
            (None, None) => Err(invalid(job, field, "needs exec or script")),
        },
    }
}

/// Build a `JobClass` template from a parsed definition.
///
/// The returned class carries a placeholder id; the registry assigns the
/// real one when the class is installed.
pub fn build_class(def: &JobDef, source: Option<&Path>) -> Result<JobClass, ConfError> {
    build_class_with(def, source, ConsoleMode::Log)
}

/// Like [`build_class`], with an explicit default console mode for jobs
/// that do not set one.
pub fn build_class_with(
    def: &JobDef,
    source: Option<&Path>,
    default_console: ConsoleMode,
) -> Result<JobClass, ConfError> {
    let name = def.name.as_str();
    let mut class = JobClass::new(ClassId::new(0), name);
    class.source = source.map(Path::to_path_buf);
    class.description = def.description.clone();
    class.instance = def.instance.clone().unwrap_or_default();
    class.task = def.task;
    class.emits = def.emits.clone();
    class.export = def.export.clone();
    class.chroot = def.chroot.clone();
    class.chdir = def.chdir.clone();
    class.setuid = def.setuid.clone();
    class.setgid = def.setgid.clone();
    class.nice = def.nice;
    class.oom_score_adj = def.oom_score_adj;

    if let Some(expr) = &def.start_on {
        class.start_on = Some(parse_on(expr).map_err(|source| ConfError::On {
            job: name.to_string(),
            field: "start_on",
            source,
        })?);
    }
    if let Some(expr) = &def.stop_on {
        class.stop_on = Some(parse_on(expr).map_err(|source| ConfError::On {
            job: name.to_string(),
            field: "stop_on",
            source,
        })?);
    }

    if let Some(command) = &def.exec {
        class
            .processes
            .set(ProcessType::Main, ProcessCommand::exec(command.clone()));
    } else if let Some(body) = &def.script {
        class
            .processes
            .set(ProcessType::Main, ProcessCommand::script(body.clone()));
    }
    for (process, stanza, field) in [
        (ProcessType::PreStart, &def.pre_start, "pre_start"),
        (ProcessType::PostStart, &def.post_start, "post_start"),
        (ProcessType::PreStop, &def.pre_stop, "pre_stop"),
        (ProcessType::PostStop, &def.post_stop, "post_stop"),
    ] {
        if let Some(stanza) = stanza {
            class
                .processes
                .set(process, process_command(stanza, name, field)?);
        }
    }

    class.expect = match def.expect.as_deref() {
        None => warden_core::ExpectMode::None,
        Some("fork") => warden_core::ExpectMode::Fork,
        Some("daemon") => warden_core::ExpectMode::Daemon,
        Some("stop") => warden_core::ExpectMode::Stop,
        Some(other) => return Err(invalid(name, "expect", format!("unknown mode {other:?}"))),
    };

    if let Some(respawn) = &def.respawn {
        class.respawn = match respawn {
            RespawnDef::Enabled(enabled) => RespawnPolicy {
                enabled: *enabled,
                ..RespawnPolicy::default()
            },
            RespawnDef::Policy { limit, interval } => RespawnPolicy {
                enabled: true,
                limit: limit.unwrap_or(RespawnPolicy::DEFAULT_LIMIT),
                interval: interval
                    .map(Duration::from_secs)
                    .unwrap_or(RespawnPolicy::DEFAULT_INTERVAL),
            },
        };
    }

    if let Some(signal) = &def.kill_signal {
        class.kill_signal = signal_from_name(signal)
            .ok_or_else(|| invalid(name, "kill_signal", format!("unknown signal {signal:?}")))?;
    }
    if let Some(timeout) = def.kill_timeout {
        class.kill_timeout = Duration::from_secs(timeout);
    }

    for entry in &def.normal_exit {
        class.normal_exit.push(match entry {
            NormalExitDef::Code(code) => NormalExit::Status(*code),
            NormalExitDef::Signal(signal) => NormalExit::Signal(
                signal_from_name(signal).ok_or_else(|| {
                    invalid(name, "normal_exit", format!("unknown signal {signal:?}"))
                })?,
            ),
        });
    }

    let mut env = EnvList::new();
    for (key, value) in &def.env {
        env.set(key, value)
            .map_err(|e| invalid(name, "env", e.to_string()))?;
    }
    class.env = env;

    class.console = match &def.console {
        Some(console) => console
            .parse::<ConsoleMode>()
            .map_err(|e| invalid(name, "console", e))?,
        None => default_console,
    };

    if let Some(umask) = &def.umask {
        class.umask = Some(
            u32::from_str_radix(umask, 8)
                .map_err(|_| invalid(name, "umask", format!("not octal: {umask:?}")))?,
        );
    }

    for (limit_name, limit) in &def.limits {
        class.limits.insert(
            limit_name.clone(),
            ResourceLimit {
                soft: limit.soft,
                hard: limit.hard,
            },
        );
    }

    Ok(class)
}

/// Load every job definition under `dir`.
///
/// Files are visited in sorted order; a class redefined by a later file
/// overrides the earlier definition with a warning. A missing directory is
/// an empty configuration, not an error.
pub fn load_dir(dir: &Path) -> Result<LoadResult, ConfError> {
    load_dir_with(dir, ConsoleMode::Log)
}

/// Like [`load_dir`], with an explicit default console mode.
pub fn load_dir_with(dir: &Path, default_console: ConsoleMode) -> Result<LoadResult, ConfError> {
    let mut result = LoadResult::default();

    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(dir = %dir.display(), "configuration directory does not exist");
            return Ok(result);
        }
        Err(source) => {
            return Err(ConfError::Io {
                path: dir.to_path_buf(),
                source,
            })
        }
    };

    let mut paths: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            path.extension()
                .and_then(|e| e.to_str())
                .and_then(Format::from_extension)
                .is_some()
        })
        .collect();
    paths.sort();

    for path in paths {
        let format = match path
            .extension()
            .and_then(|e| e.to_str())
            .and_then(Format::from_extension)
        {
            Some(format) => format,
            None => continue,
        };
        let content = std::fs::read_to_string(&path).map_err(|source| ConfError::Io {
            path: path.clone(),
            source,
        })?;

        result.sources.push(ConfSource {
            path: path.clone(),
            digest: hex_digest(&content),
        });

        let conf = parse_conf(&content, format).map_err(|source| ConfError::Parse {
            path: path.clone(),
            source,
        })?;

        for def in conf.jobs.values() {
            let class = build_class_with(def, Some(&path), default_console)?;
            if let Some(previous) = result.classes.iter_mut().find(|c| c.name == class.name) {
                warn!(
                    class = %class.name,
                    path = %path.display(),
                    "job redefined, later definition wins"
                );
                *previous = class;
            } else {
                result.classes.push(class);
            }
        }
    }

    debug!(
        dir = %dir.display(),
        classes = result.classes.len(),
        files = result.sources.len(),
        "configuration loaded"
    );
    Ok(result)
}

fn hex_digest(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    let digest = hasher.finalize();
    let mut out = String::with_capacity(64);
    for byte in digest {
        out.push_str(&format!("{byte:02x}"));
    }
    out
}

#[cfg(test)]
#[path = "load_tests.rs"]
mod tests;
