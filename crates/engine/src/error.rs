// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Errors surfaced to control callers.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error kinds a control request can come back with.
///
/// These cross the wire, so they carry plain data rather than sources.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CoreError {
    #[error("unknown job: {name}")]
    UnknownJob { name: String },

    #[error("unknown instance: {name} ({instance})")]
    UnknownInstance { name: String, instance: String },

    #[error("job is already started: {name}")]
    AlreadyStarted { name: String },

    #[error("job is already stopped: {name}")]
    AlreadyStopped { name: String },

    #[error("permission denied: {name}")]
    PermissionDenied { name: String },

    #[error("job failed: {name}")]
    JobFailed { name: String },

    #[error("event failed: {name}")]
    EventFailed {
        name: String,
        /// Job whose failure failed the event, when known.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        job: Option<String>,
    },

    #[error("failed to spawn {name} {process}")]
    SpawnFailed { name: String, process: String },

    #[error("bad environment: {message}")]
    BadEnvironment { message: String },
}
