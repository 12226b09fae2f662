// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon lifecycle: paths, lock file, state restore, shutdown.

use fs2::FileExt;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};
use warden_core::{Clock, ConsoleMode};
use warden_engine::{Core, Snapshot};

/// Lifecycle errors
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("could not determine state directory")]
    NoStateDir,

    #[error("failed to acquire lock: daemon already running?")]
    LockFailed(#[source] std::io::Error),

    #[error("failed to bind socket at {0}: {1}")]
    BindFailed(PathBuf, std::io::Error),

    #[error("configuration error: {0}")]
    Conf(#[from] warden_conf::ConfError),

    #[error("snapshot error: {0}")]
    Snapshot(#[from] warden_engine::SnapshotError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid console mode: {0}")]
    BadConsole(String),
}

/// Resolved daemon paths and options.
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory holding job definitions.
    pub confdir: PathBuf,
    /// Root state directory (socket, pid file, daemon log).
    pub state_dir: PathBuf,
    /// Directory for the daemon log and per-job log files.
    pub logdir: PathBuf,
    /// Path to the control socket.
    pub socket_path: PathBuf,
    /// Path to the lock/pid file.
    pub lock_path: PathBuf,
    /// Path to the daemon log file.
    pub log_path: PathBuf,
    /// Default console mode for jobs that do not set one.
    pub default_console: ConsoleMode,
    /// Discard job output entirely.
    pub no_log: bool,
}

/// The state directory this user's daemon runs against.
///
/// `WARDEN_STATE_DIR` overrides; root uses `/run/warden`; everyone else the
/// XDG state directory.
pub fn state_dir() -> Result<PathBuf, LifecycleError> {
    if let Ok(dir) = std::env::var("WARDEN_STATE_DIR") {
        return Ok(PathBuf::from(dir));
    }
    if nix::unistd::Uid::effective().is_root() {
        return Ok(PathBuf::from("/run/warden"));
    }
    dirs::state_dir()
        .map(|dir| dir.join("warden"))
        .ok_or(LifecycleError::NoStateDir)
}

/// The control socket path for this user's daemon.
pub fn socket_path() -> Result<PathBuf, LifecycleError> {
    Ok(state_dir()?.join("control.sock"))
}

impl Config {
    /// Resolve paths from the command-line options.
    pub fn resolve(
        confdir: Option<PathBuf>,
        logdir: Option<PathBuf>,
        default_console: &str,
        no_log: bool,
    ) -> Result<Self, LifecycleError> {
        let state_dir = state_dir()?;
        let root = nix::unistd::Uid::effective().is_root();

        let confdir = match confdir {
            Some(dir) => dir,
            None if root => PathBuf::from("/etc/warden"),
            None => dirs::config_dir()
                .map(|dir| dir.join("warden"))
                .ok_or(LifecycleError::NoStateDir)?,
        };
        let logdir = match logdir {
            Some(dir) => dir,
            None if root => PathBuf::from("/var/log/warden"),
            None => state_dir.join("log"),
        };
        let default_console = default_console
            .parse::<ConsoleMode>()
            .map_err(LifecycleError::BadConsole)?;

        Ok(Self {
            confdir,
            socket_path: state_dir.join("control.sock"),
            lock_path: state_dir.join("wardend.pid"),
            log_path: logdir.join("wardend.log"),
            state_dir,
            logdir,
            default_console,
            no_log,
        })
    }
}

/// Take the exclusive daemon lock and record our pid in it.
///
/// The returned file must stay open for the lifetime of the daemon; the
/// lock releases on drop.
pub fn acquire_lock(config: &Config) -> Result<File, LifecycleError> {
    std::fs::create_dir_all(&config.state_dir)?;
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(false)
        .open(&config.lock_path)?;
    file.try_lock_exclusive()
        .map_err(LifecycleError::LockFailed)?;
    file.set_len(0)?;
    writeln!(file, "{}", std::process::id())?;
    Ok(file)
}

/// Restore state from the re-exec descriptor, if one was handed over.
///
/// A restore failure is logged and the daemon proceeds as a fresh boot; a
/// supervisor that refuses to start is worse than one that forgot.
pub fn restore_state<C: Clock>(core: &mut Core<C>, state_fd: i32) -> bool {
    let path = format!("/proc/self/fd/{state_fd}");
    let file = match File::open(&path) {
        Ok(file) => file,
        Err(e) => {
            warn!(state_fd, error = %e, "cannot open state descriptor; fresh boot");
            return false;
        }
    };
    match Snapshot::read_from(file) {
        Ok(snapshot) => match snapshot.restore(core) {
            Ok(()) => {
                info!(
                    jobs = core.jobs().len(),
                    events = core.queue().len(),
                    "state restored from previous instance"
                );
                true
            }
            Err(e) => {
                warn!(error = %e, "state restore failed; fresh boot");
                false
            }
        },
        Err(e) => {
            warn!(error = %e, "state descriptor unreadable; fresh boot");
            false
        }
    }
}

/// Remove the socket and pid files on the way out.
pub fn cleanup(config: &Config) {
    for path in [&config.socket_path, &config.lock_path] {
        if path.exists() {
            if let Err(e) = std::fs::remove_file(path) {
                warn!(path = %path.display(), error = %e, "cleanup failed");
            }
        }
    }
}

/// Size at which the daemon log is swapped out for a fresh one (8 MB).
const LOG_SWAP_BYTES: u64 = 8 * 1024 * 1024;

/// Swap an oversized daemon log aside before logging starts.
///
/// Exactly one predecessor is kept, as `wardend.log.old`; an older one is
/// discarded first. Every step is best-effort because nothing about log
/// housekeeping may stop the supervisor from booting.
pub fn rotate_log_if_needed(log_path: &Path) {
    let oversized = std::fs::metadata(log_path)
        .map(|meta| meta.len() > LOG_SWAP_BYTES)
        .unwrap_or(false);
    if !oversized {
        return;
    }

    let previous = log_path.with_extension("log.old");
    let _ = std::fs::remove_file(&previous);
    let _ = std::fs::rename(log_path, &previous);
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
