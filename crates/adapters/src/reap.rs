// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The child reaper.
//!
//! One task owns `waitpid` for the whole process: it wakes on SIGCHLD and
//! drains every pending exit in a tight loop, translating each into the
//! wait-status encoding the core stores.

use nix::sys::wait::{waitpid, WaitPidFlag, WaitStatus};
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::mpsc;
use tracing::{debug, error};
use warden_core::signal::{encode_exited, encode_signaled};

/// One reaped child.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChildExit {
    pub pid: u32,
    /// Wait status in the [`warden_core::signal`] encoding.
    pub status: i32,
}

/// Translate a `waitpid` result into a `ChildExit`, if it is a real exit.
///
/// Stop/continue notifications are not exits and return `None`.
pub(crate) fn child_exit(status: WaitStatus) -> Option<ChildExit> {
    match status {
        WaitStatus::Exited(pid, code) => Some(ChildExit {
            pid: pid.as_raw() as u32,
            status: encode_exited(code),
        }),
        WaitStatus::Signaled(pid, signal, _core_dumped) => Some(ChildExit {
            pid: pid.as_raw() as u32,
            status: encode_signaled(signal as i32),
        }),
        _ => None,
    }
}

/// Collect every child that has exited, without blocking.
pub fn drain_exits() -> Vec<ChildExit> {
    let mut exits = Vec::new();
    loop {
        match waitpid(None, Some(WaitPidFlag::WNOHANG)) {
            Ok(WaitStatus::StillAlive) => break,
            Ok(status) => {
                if let Some(exit) = child_exit(status) {
                    debug!(pid = exit.pid, status = exit.status, "reaped child");
                    exits.push(exit);
                }
            }
            // No children left at all.
            Err(nix::Error::ECHILD) => break,
            Err(e) => {
                error!(error = %e, "waitpid failed");
                break;
            }
        }
    }
    exits
}

/// Run the reaper until the receiver side closes.
///
/// Drains once at startup: children that died before the signal handler was
/// installed (or that were inherited across a re-exec) must not be lost.
pub async fn run_reaper(tx: mpsc::Sender<ChildExit>) {
    let mut sigchld = match signal(SignalKind::child()) {
        Ok(stream) => stream,
        Err(e) => {
            error!(error = %e, "failed to install SIGCHLD handler");
            return;
        }
    };

    for exit in drain_exits() {
        if tx.send(exit).await.is_err() {
            return;
        }
    }

    while sigchld.recv().await.is_some() {
        for exit in drain_exits() {
            if tx.send(exit).await.is_err() {
                return;
            }
        }
    }
}

#[cfg(test)]
#[path = "reap_tests.rs"]
mod tests;
