// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The supervisor core: one value owning the whole graph.
//!
//! All mutation goes through [`Core::handle`], which applies one input,
//! drains the event queue to quiescence, and returns the effects the caller
//! must execute. The spawner is passed in per call so the state machine can
//! consume spawn failures inline.

use crate::queue::EventQueue;
use crate::registry::ClassRegistry;
use crate::reply::ReplyBody;
use crate::scheduler::Scheduler;
use std::collections::HashMap;
use tracing::{debug, info, warn};
use warden_adapters::ProcessSpawner;
use warden_conf::ConfSource;
use warden_core::{
    Blocked, Clock, EnvList, EventId, EventProgress, IdAlloc, Job, JobClass, JobId, ReplyToken,
    Session, SessionId, SystemClock, TimerId,
};

/// One input for the core to apply.
#[derive(Debug, Clone)]
pub enum Input {
    /// Emit a named event into the queue.
    Emit {
        name: String,
        env: Vec<String>,
        session: Option<SessionId>,
        /// Reply to send once the event reaches FINISHED (`emit --wait`).
        reply: Option<ReplyToken>,
    },
    /// A child exited; status uses the [`warden_core::signal`] encoding.
    ChildExit { pid: u32, status: i32 },
    /// The fork tracer settled on an effective main pid.
    TraceDone {
        job: JobId,
        main_pid: u32,
        failed: bool,
    },
    /// A scheduler timer fired.
    TimerFired { id: TimerId },
    /// Control: start an instance of a class.
    Start {
        name: String,
        env: Vec<String>,
        wait: bool,
        session: Option<SessionId>,
        reply: ReplyToken,
    },
    /// Control: stop an instance.
    Stop {
        name: String,
        env: Vec<String>,
        wait: bool,
        session: Option<SessionId>,
        reply: ReplyToken,
    },
    /// Control: stop then start an instance, skipping pre-stop.
    Restart {
        name: String,
        env: Vec<String>,
        wait: bool,
        session: Option<SessionId>,
        reply: ReplyToken,
    },
    /// Control: one class with instances.
    Status {
        name: String,
        session: Option<SessionId>,
        reply: ReplyToken,
    },
    /// Control: every class with instances.
    List {
        session: Option<SessionId>,
        reply: ReplyToken,
    },
    /// Freshly loaded configuration to reconcile against.
    Reload {
        classes: Vec<JobClass>,
        sources: Vec<ConfSource>,
        reply: Option<ReplyToken>,
    },
}

/// A side effect the caller must execute after `handle` returns.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Answer a control connection.
    Reply { token: ReplyToken, body: ReplyBody },
    /// Start fork tracing for a freshly spawned main process; the outcome
    /// comes back as [`Input::TraceDone`].
    BeginTrace {
        job: JobId,
        pid: u32,
        expect: warden_core::ExpectMode,
    },
}

/// The supervisor graph and everything that moves it.
pub struct Core<C: Clock = SystemClock> {
    pub(crate) clock: C,
    pub(crate) queue: EventQueue,
    pub(crate) registry: ClassRegistry,
    pub(crate) jobs: HashMap<JobId, Job>,
    pub(crate) job_ids: IdAlloc,
    pub(crate) sessions: Vec<Session>,
    pub(crate) scheduler: Scheduler,
    pub(crate) conf_sources: Vec<ConfSource>,
}

impl Core<SystemClock> {
    pub fn new() -> Self {
        Self::with_clock(SystemClock)
    }
}

impl Default for Core<SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> Core<C> {
    pub fn with_clock(clock: C) -> Self {
        Self {
            clock,
            queue: EventQueue::new(),
            registry: ClassRegistry::new(),
            jobs: HashMap::new(),
            job_ids: IdAlloc::new(),
            sessions: Vec::new(),
            scheduler: Scheduler::new(),
            conf_sources: Vec::new(),
        }
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn queue(&self) -> &EventQueue {
        &self.queue
    }

    pub fn registry(&self) -> &ClassRegistry {
        &self.registry
    }

    pub fn jobs(&self) -> &HashMap<JobId, Job> {
        &self.jobs
    }

    pub fn sessions(&self) -> &[Session] {
        &self.sessions
    }

    pub fn conf_sources(&self) -> &[ConfSource] {
        &self.conf_sources
    }

    /// Earliest armed timer deadline, for the main loop's sleep.
    pub fn next_deadline(&self) -> Option<std::time::Instant> {
        self.scheduler.next_deadline()
    }

    /// Register (or find) the session for a user.
    pub fn register_session(&mut self, user: u32) -> SessionId {
        if let Some(session) = self.sessions.iter().find(|s| s.user == Some(user)) {
            return session.id;
        }
        let id = SessionId::new(self.sessions.len() as u64);
        self.sessions.push(Session::for_user(id, user));
        id
    }

    /// Expired timers as inputs for the main loop to feed back in.
    pub fn fired_timers(&mut self) -> Vec<Input> {
        let now = self.clock.now();
        self.scheduler
            .fired_timers(now)
            .into_iter()
            .map(|id| Input::TimerFired { id })
            .collect()
    }

    /// Apply one input, drain the event queue to quiescence, and return the
    /// effects to execute.
    pub fn handle(&mut self, input: Input, spawner: &dyn ProcessSpawner) -> Vec<Effect> {
        let mut effects = Vec::new();

        match input {
            Input::Emit {
                name,
                env,
                session,
                reply,
            } => {
                match EnvList::from_entries(&env) {
                    Ok(env) => {
                        let id = self.queue.emit(name, env, session);
                        if let Some(token) = reply {
                            if let Some(event) = self.queue.get_mut(id) {
                                event.reply = Some(token);
                            }
                        }
                    }
                    Err(e) => {
                        warn!(event = %name, error = %e, "rejected event environment");
                        if let Some(token) = reply {
                            effects.push(Effect::Reply {
                                token,
                                body: ReplyBody::err(crate::CoreError::BadEnvironment {
                                    message: e.to_string(),
                                }),
                            });
                        }
                    }
                }
            }
            Input::ChildExit { pid, status } => {
                self.handle_child_exit(pid, status, spawner, &mut effects);
            }
            Input::TraceDone {
                job,
                main_pid,
                failed,
            } => {
                self.handle_trace_done(job, main_pid, failed, spawner, &mut effects);
            }
            Input::TimerFired { id } => {
                self.handle_timer(id, spawner, &mut effects);
            }
            Input::Start {
                name,
                env,
                wait,
                session,
                reply,
            } => self.control_start(&name, &env, wait, session, reply, spawner, &mut effects),
            Input::Stop {
                name,
                env,
                wait,
                session,
                reply,
            } => self.control_stop(&name, &env, wait, session, reply, spawner, &mut effects),
            Input::Restart {
                name,
                env,
                wait,
                session,
                reply,
            } => self.control_restart(&name, &env, wait, session, reply, spawner, &mut effects),
            Input::Status {
                name,
                session,
                reply,
            } => self.control_status(&name, session, reply, &mut effects),
            Input::List { session, reply } => self.control_list(session, reply, &mut effects),
            Input::Reload {
                classes,
                sources,
                reply,
            } => {
                info!(classes = classes.len(), "reloading configuration");
                self.registry.reload(classes);
                self.conf_sources = sources;
                if let Some(token) = reply {
                    effects.push(Effect::Reply {
                        token,
                        body: ReplyBody::Ok,
                    });
                }
            }
        }

        self.event_poll(spawner, &mut effects);
        effects
    }

    /// Drain the event queue until a full pass makes no changes.
    pub(crate) fn event_poll(&mut self, spawner: &dyn ProcessSpawner, effects: &mut Vec<Effect>) {
        loop {
            let mut again = false;

            for event_id in self.queue.ordered_ids() {
                let Some(progress) = self.queue.get(event_id).map(|e| e.progress) else {
                    continue;
                };
                match progress {
                    EventProgress::Pending => {
                        let Some(snapshot) = self.queue.get(event_id).cloned() else {
                            continue;
                        };
                        info!(event = %snapshot.log_summary(), "handling event");
                        if let Some(event) = self.queue.get_mut(event_id) {
                            event.progress = EventProgress::Handling;
                        }
                        self.handle_pending_event(&snapshot, spawner, effects);
                        again = true;
                    }
                    EventProgress::Handling => {
                        let blockers = self
                            .queue
                            .get(event_id)
                            .map(|e| e.blockers)
                            .unwrap_or(0);
                        if blockers == 0 {
                            if let Some(event) = self.queue.get_mut(event_id) {
                                event.progress = EventProgress::Finished;
                            }
                            self.finish_event(event_id, spawner, effects);
                            again = true;
                        }
                    }
                    EventProgress::Finished => {
                        self.finish_event(event_id, spawner, effects);
                        again = true;
                    }
                }
            }

            if !again {
                break;
            }
        }
    }

    /// Dispatch a FINISHED event: wake blocked jobs, answer waiters, derive
    /// the `/failed` event, and free it.
    fn finish_event(
        &mut self,
        event_id: EventId,
        spawner: &dyn ProcessSpawner,
        effects: &mut Vec<Effect>,
    ) {
        let Some(mut event) = self.queue.remove(event_id) else {
            return;
        };
        debug!(event = %event.log_summary(), failed = event.failed, "event finished");

        for blocked in event.blocking.drain(..) {
            match blocked {
                Blocked::Job { job } => {
                    let held = self
                        .jobs
                        .get_mut(&job)
                        .map(|j| {
                            if j.blocker == Some(event_id) {
                                j.blocker = None;
                                true
                            } else {
                                false
                            }
                        })
                        .unwrap_or(false);
                    if held {
                        self.advance(job, spawner, effects);
                    }
                }
                Blocked::Event { event: nested } => {
                    if event.failed {
                        if let Some(nested_event) = self.queue.get_mut(nested) {
                            nested_event.failed = true;
                            if nested_event.failed_by.is_none() {
                                nested_event.failed_by = event.failed_by.clone();
                            }
                        }
                    }
                    self.queue.unblock(nested);
                }
                // Reply records live on jobs; an event carrying one is a
                // restore artefact and its connection is gone.
                other => {
                    warn!(event = %event.name, ?other, "dropping stale reply record");
                }
            }
        }

        if let Some(token) = event.reply.take() {
            let body = if event.failed {
                ReplyBody::err(crate::CoreError::EventFailed {
                    name: event.name.clone(),
                    job: event.failed_by.clone(),
                })
            } else {
                ReplyBody::EventFinished {
                    name: event.name.clone(),
                }
            };
            effects.push(Effect::Reply { token, body });
        }

        if event.wants_failed_event() {
            let name = event.failed_name();
            self.queue.emit(name, event.env.clone(), event.session);
        }
    }
}

#[cfg(test)]
#[path = "core_tests/mod.rs"]
pub(crate) mod tests;
