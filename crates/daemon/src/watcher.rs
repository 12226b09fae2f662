// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Configuration-directory watching.
//!
//! Changes under the conf dir trigger a reload command; the engine loop
//! skips reloads whose source digests are unchanged, so event storms from
//! editors are harmless.

use crate::listener::DaemonCmd;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::Path;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Watch the conf dir; the returned watcher must be kept alive.
pub(crate) fn spawn(confdir: &Path, cmd_tx: mpsc::Sender<DaemonCmd>) -> Option<RecommendedWatcher> {
    let mut watcher = match notify::recommended_watcher(
        move |result: Result<Event, notify::Error>| match result {
            Ok(event) => {
                let relevant = matches!(
                    event.kind,
                    EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
                );
                if relevant {
                    // Runs on the notify thread; the engine loop dedups.
                    let _ = cmd_tx.blocking_send(DaemonCmd::Reload { reply: None });
                }
            }
            Err(e) => warn!(error = %e, "conf watch error"),
        },
    ) {
        Ok(watcher) => watcher,
        Err(e) => {
            warn!(error = %e, "conf watching unavailable");
            return None;
        }
    };

    if let Err(e) = watcher.watch(confdir, RecursiveMode::NonRecursive) {
        warn!(dir = %confdir.display(), error = %e, "cannot watch conf dir");
        return None;
    }
    debug!(dir = %confdir.display(), "watching configuration");
    Some(watcher)
}
