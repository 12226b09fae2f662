// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Control-facing views of the supervisor graph.

use crate::error::CoreError;
use serde::{Deserialize, Serialize};
use warden_core::{Job, JobClass};

/// One running process of a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessView {
    pub process: String,
    pub pid: u32,
}

/// A job instance as reported to control callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobView {
    /// Expanded instance name; empty for singletons.
    pub instance: String,
    pub goal: String,
    pub state: String,
    #[serde(default)]
    pub pids: Vec<ProcessView>,
    #[serde(default)]
    pub failed: bool,
    #[serde(default)]
    pub respawn_count: u32,
}

impl JobView {
    pub fn of(job: &Job) -> Self {
        Self {
            instance: job.name.clone(),
            goal: job.goal.to_string(),
            state: job.state.to_string(),
            pids: job
                .pids
                .iter()
                .map(|(process, pid)| ProcessView {
                    process: process.to_string(),
                    pid,
                })
                .collect(),
            failed: job.failed,
            respawn_count: job.respawn_count,
        }
    }
}

/// A class and its instances as reported to control callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassView {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub task: bool,
    #[serde(default)]
    pub deleted: bool,
    #[serde(default)]
    pub instances: Vec<JobView>,
}

impl ClassView {
    pub fn of(class: &JobClass, instances: Vec<JobView>) -> Self {
        Self {
            name: class.name.clone(),
            description: class.description.clone(),
            task: class.task,
            deleted: class.deleted,
            instances,
        }
    }
}

/// The body of a deferred or immediate control reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reply", rename_all = "snake_case")]
pub enum ReplyBody {
    Ok,
    Started { job: JobView },
    Stopped { job: String },
    Status { class: ClassView },
    List { classes: Vec<ClassView> },
    EventFinished { name: String },
    Error { error: CoreError },
}

impl ReplyBody {
    pub fn err(error: CoreError) -> Self {
        ReplyBody::Error { error }
    }
}
