// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Re-exec state snapshot.
//!
//! The snapshot captures the complete live graph (sessions, events in
//! queue order, every class with at least one instance, and every instance
//! with its blocking links) as self-describing JSON. Cross-references are
//! encoded as integer indices into the snapshot's own event list; restore
//! rebuilds the arenas with fresh ids and re-registers every blocker so the
//! count invariant holds on the other side.

use crate::core::Core;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::{Read, Write};
use std::time::Duration;
use thiserror::Error;
use tracing::warn;
use warden_conf::ConfSource;
use warden_core::{
    Blocked, Clock, EnvList, Event, EventId, EventProgress, FailedProcess, Goal, Job, JobClass,
    JobId, JobState, Operator, PidTable, Session, SessionId, TimerId, TraceState,
};

/// Current snapshot format version.
pub const SNAPSHOT_VERSION: u32 = 1;

/// Errors from snapshot IO.
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unsupported snapshot version {0}")]
    Version(u32),
}

/// A blocking-list entry with process-independent references.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum SnapBlocked {
    Job { class: String, instance: String },
    Event { event: usize },
}

/// One queued event.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct SnapEvent {
    name: String,
    #[serde(default)]
    env: EnvList,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    session: Option<SessionId>,
    /// File descriptor attached by the emitter. Never populated here;
    /// carried for format compatibility.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    fd: Option<i32>,
    progress: EventProgress,
    #[serde(default)]
    failed: bool,
    #[serde(default)]
    blockers: u32,
    #[serde(default)]
    blocking: Vec<SnapBlocked>,
}

/// One job instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct SnapJob {
    name: String,
    goal: Goal,
    state: JobState,
    #[serde(default)]
    pids: PidTable,
    #[serde(default)]
    env: EnvList,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    start_env: Option<EnvList>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    stop_env: Option<EnvList>,
    /// Per-instance stop condition; event references are snapshot indices.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    stop_on: Option<Operator>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    blocker: Option<usize>,
    #[serde(default)]
    blocking: Vec<SnapBlocked>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    kill_timer_remaining_ms: Option<u64>,
    #[serde(default)]
    failed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    failed_process: Option<FailedProcess>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    exit_status: Option<i32>,
    #[serde(default)]
    respawn_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    respawn_window_ms: Option<u64>,
    #[serde(default)]
    trace_forks: u32,
    #[serde(default)]
    trace_state: TraceState,
}

/// One class that had instances at capture time.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct SnapClass {
    class: JobClass,
    jobs: Vec<SnapJob>,
}

/// The complete serialised supervisor state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub version: u32,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub sessions: Vec<Session>,
    #[serde(default)]
    pub conf_sources: Vec<ConfSource>,
    #[serde(default)]
    events: Vec<SnapEvent>,
    #[serde(default)]
    classes: Vec<SnapClass>,
}

impl Snapshot {
    /// Capture the live graph.
    pub fn capture<C: Clock>(core: &Core<C>) -> Self {
        let now = core.clock().now();

        // Events keep queue order; their position is their reference.
        let live_events: Vec<&Event> = core.queue().iter_ordered().collect();
        let index_of: HashMap<EventId, usize> = live_events
            .iter()
            .enumerate()
            .map(|(index, event)| (event.id, index))
            .collect();

        let snap_blocked = |blocked: &Blocked| -> Option<SnapBlocked> {
            match blocked {
                Blocked::Job { job } => {
                    let job = core.jobs().get(job)?;
                    let class = core.registry().get(job.class)?;
                    Some(SnapBlocked::Job {
                        class: class.name.clone(),
                        instance: job.name.clone(),
                    })
                }
                Blocked::Event { event } => {
                    index_of.get(event).map(|&event| SnapBlocked::Event { event })
                }
                // Reply handles die with their connection.
                Blocked::StartReply { .. }
                | Blocked::StopReply { .. }
                | Blocked::RestartReply { .. } => None,
            }
        };

        let events = live_events
            .iter()
            .map(|event| SnapEvent {
                name: event.name.clone(),
                env: event.env.clone(),
                session: event.session,
                fd: None,
                progress: event.progress,
                failed: event.failed,
                blockers: event.blockers,
                blocking: event.blocking.iter().filter_map(snap_blocked).collect(),
            })
            .collect();

        let remap = |operator: &Operator| -> Operator {
            let mut clone = operator.clone();
            clone.remap_events(&|id| index_of.get(&id).map(|&index| EventId::new(index as u64)));
            clone
        };

        let mut classes = Vec::new();
        for class in core.registry().iter() {
            if class.instances.is_empty() {
                continue;
            }
            let mut template = class.clone();
            template.instances.clear();
            if let Some(op) = &mut template.start_on {
                *op = remap(op);
            }
            if let Some(op) = &mut template.stop_on {
                *op = remap(op);
            }

            let mut jobs = Vec::new();
            let mut instance_names: Vec<&String> = class.instances.keys().collect();
            instance_names.sort();
            for name in instance_names {
                let Some(job) = class.instances.get(name).and_then(|id| core.jobs().get(id))
                else {
                    continue;
                };
                jobs.push(SnapJob {
                    name: job.name.clone(),
                    goal: job.goal,
                    state: job.state,
                    pids: job.pids.clone(),
                    env: job.env.clone(),
                    start_env: job.start_env.clone(),
                    stop_env: job.stop_env.clone(),
                    stop_on: job.stop_on.as_ref().map(remap),
                    blocker: job.blocker.and_then(|id| index_of.get(&id).copied()),
                    blocking: job.blocking.iter().filter_map(snap_blocked).collect(),
                    kill_timer_remaining_ms: job.kill_timer.as_ref().and_then(|timer| {
                        core.scheduler
                            .remaining(timer, now)
                            .map(|d| d.as_millis() as u64)
                    }),
                    failed: job.failed,
                    failed_process: job.failed_process,
                    exit_status: job.exit_status,
                    respawn_count: job.respawn_count,
                    respawn_window_ms: job.respawn_window_ms,
                    trace_forks: job.trace_forks,
                    trace_state: job.trace_state,
                });
            }
            classes.push(SnapClass {
                class: template,
                jobs,
            });
        }

        Self {
            version: SNAPSHOT_VERSION,
            created_at: Utc::now(),
            sessions: core.sessions().to_vec(),
            conf_sources: core.conf_sources().to_vec(),
            events,
            classes,
        }
    }

    /// Rebuild the graph inside a fresh core.
    pub fn restore<C: Clock>(self, core: &mut Core<C>) -> Result<(), SnapshotError> {
        if self.version != SNAPSHOT_VERSION {
            return Err(SnapshotError::Version(self.version));
        }

        core.sessions = self.sessions;
        core.conf_sources = self.conf_sources;

        // Pass 1: events, with empty blocking lists for now.
        let mut event_ids = Vec::with_capacity(self.events.len());
        for snap in &self.events {
            let mut event = Event::new(EventId::new(0), snap.name.clone(), snap.env.clone());
            event.session = snap.session;
            event.progress = snap.progress;
            event.failed = snap.failed;
            let id = core.queue.restore(event);
            event_ids.push(id);
        }
        let map_event = |index: usize| -> Option<EventId> { event_ids.get(index).copied() };

        // Pass 2: classes and their instances.
        let now = core.clock.now();
        let mut jobs_by_name: HashMap<(String, String), JobId> = HashMap::new();
        for snap_class in self.classes {
            let class_name = snap_class.class.name.clone();
            let class_id = core.registry.install(snap_class.class);

            for snap in snap_class.jobs {
                let job_id = JobId::new(core.job_ids.next());
                let mut job = Job::new(job_id, class_id, snap.name.clone());
                job.goal = snap.goal;
                job.state = snap.state;
                job.pids = snap.pids;
                job.env = snap.env;
                job.start_env = snap.start_env;
                job.stop_env = snap.stop_env;
                job.stop_on = snap.stop_on.map(|mut op| {
                    let unlinked =
                        op.remap_events(&|id| map_event(id.as_u64() as usize));
                    if unlinked > 0 {
                        warn!(
                            class = %class_name,
                            instance = %snap.name,
                            unlinked,
                            "stop condition references dropped during restore"
                        );
                    }
                    op
                });
                job.blocker = snap.blocker.and_then(map_event);
                job.blocking = snap
                    .blocking
                    .iter()
                    .filter_map(|blocked| match blocked {
                        SnapBlocked::Event { event } => {
                            map_event(*event).map(|event| Blocked::Event { event })
                        }
                        SnapBlocked::Job { .. } => {
                            warn!("job record in a job blocking list; dropped");
                            None
                        }
                    })
                    .collect();
                job.failed = snap.failed;
                job.failed_process = snap.failed_process;
                job.exit_status = snap.exit_status;
                job.respawn_count = snap.respawn_count;
                job.respawn_window_ms = snap.respawn_window_ms;
                job.trace_forks = snap.trace_forks;
                job.trace_state = snap.trace_state;

                if let Some(remaining) = snap.kill_timer_remaining_ms {
                    let timer = TimerId::kill(job_id);
                    core.scheduler
                        .set_timer(timer.clone(), Duration::from_millis(remaining), now);
                    job.kill_timer = Some(timer);
                }

                jobs_by_name.insert((class_name.clone(), snap.name.clone()), job_id);
                core.jobs.insert(job_id, job);
                if let Some(class) = core.registry.get_mut(class_id) {
                    class.instances.insert(snap.name, job_id);
                }
            }
        }

        // Pass 3: event blocking lists, now that jobs exist.
        for (index, snap) in self.events.iter().enumerate() {
            let Some(&event_id) = event_ids.get(index) else {
                continue;
            };
            let mut blocking = Vec::new();
            for blocked in &snap.blocking {
                match blocked {
                    SnapBlocked::Job { class, instance } => {
                        match jobs_by_name.get(&(class.clone(), instance.clone())) {
                            Some(&job) => blocking.push(Blocked::Job { job }),
                            None => warn!(
                                event = %snap.name,
                                class = %class,
                                instance = %instance,
                                "blocked job not restored; waiter dropped"
                            ),
                        }
                    }
                    SnapBlocked::Event { event } => match map_event(*event) {
                        Some(event) => blocking.push(Blocked::Event { event }),
                        None => warn!(event = %snap.name, "nested event not restored"),
                    },
                }
            }
            if let Some(event) = core.queue.get_mut(event_id) {
                event.blocking = blocking;
            }
        }

        // Pass 4: recompute blocker counts from the restored edges; the
        // serialised numbers are only a cross-check.
        let mut counts: HashMap<EventId, u32> = HashMap::new();
        for job in core.jobs.values() {
            for blocked in &job.blocking {
                if let Blocked::Event { event } = blocked {
                    *counts.entry(*event).or_insert(0) += 1;
                }
            }
        }
        for event_id in core.queue.ordered_ids() {
            let Some(event) = core.queue.get(event_id) else {
                continue;
            };
            for blocked in &event.blocking {
                if let Blocked::Event { event } = blocked {
                    *counts.entry(*event).or_insert(0) += 1;
                }
            }
        }
        for (index, snap) in self.events.iter().enumerate() {
            let Some(&event_id) = event_ids.get(index) else {
                continue;
            };
            let computed = counts.get(&event_id).copied().unwrap_or(0);
            if computed != snap.blockers {
                warn!(
                    event = %snap.name,
                    serialized = snap.blockers,
                    computed,
                    "blocker count mismatch; using recomputed value"
                );
            }
            if let Some(event) = core.queue.get_mut(event_id) {
                event.blockers = computed;
            }
        }

        Ok(())
    }

    /// Serialise to a writer as JSON.
    pub fn write_to(&self, mut writer: impl Write) -> Result<(), SnapshotError> {
        serde_json::to_writer(&mut writer, self)?;
        writer.flush()?;
        Ok(())
    }

    /// Deserialise from a reader, checking the version.
    pub fn read_from(reader: impl Read) -> Result<Self, SnapshotError> {
        let snapshot: Snapshot = serde_json::from_reader(reader)?;
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(SnapshotError::Version(snapshot.version));
        }
        Ok(snapshot)
    }
}

#[cfg(test)]
#[path = "snapshot_tests.rs"]
mod tests;
