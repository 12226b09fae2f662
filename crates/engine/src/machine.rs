// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The job state machine.
//!
//! `change_state` loops through entry actions until the job either rests,
//! blocks on an event or a child process, or is destroyed at WAITING. The
//! transition table itself lives in `warden_core::job::next_state`; this
//! module supplies the entry actions, the reaper, kill escalation and the
//! respawn rate limit.

use crate::core::{Core, Effect};
use crate::reply::{JobView, ReplyBody};
use crate::CoreError;
use tracing::{debug, error, info, warn};
use warden_adapters::{ProcessSpawner, SpawnRequest};
use warden_core::event::{STARTED_EVENT, STARTING_EVENT, STOPPED_EVENT, STOPPING_EVENT};
use warden_core::signal::SIGKILL;
use warden_core::{
    next_state, Blocked, ClassId, Clock, EnvList, EventId, ExpectMode, FailedProcess, Goal, Job,
    JobClass, JobId, JobState, ProcessType, TimerId, TraceState,
};

/// Which way an entry action went.
enum Entered {
    /// The job now waits on an event, a child, or the tracer.
    Wait,
    /// Nothing to wait for; take the next transition.
    Advance,
}

/// How a hook's spawn failure is treated.
#[derive(Clone, Copy, PartialEq)]
enum SpawnFailure {
    /// Record the failure and drive the goal to stop.
    Fatal,
    /// Log and carry on with the transition.
    Harmless,
}

impl<C: Clock> Core<C> {
    /// Human-readable job name for logs: `class` or `class (instance)`.
    pub(crate) fn log_name(&self, job_id: JobId) -> String {
        match self.jobs.get(&job_id) {
            Some(job) => {
                let class = self
                    .registry
                    .get(job.class)
                    .map(|c| c.name.clone())
                    .unwrap_or_else(|| "?".into());
                if job.name.is_empty() {
                    class
                } else {
                    format!("{} ({})", class, job.name)
                }
            }
            None => format!("job#{job_id}"),
        }
    }

    fn class_of(&self, job_id: JobId) -> Option<JobClass> {
        self.jobs
            .get(&job_id)
            .and_then(|job| self.registry.get(job.class))
            .cloned()
    }

    fn class_has(&self, job_id: JobId, process: ProcessType) -> bool {
        self.jobs
            .get(&job_id)
            .and_then(|job| self.registry.get(job.class))
            .map(|class| class.has_process(process))
            .unwrap_or(false)
    }

    /// Create a fresh instance of a class, at rest (stop, waiting).
    pub(crate) fn create_instance(&mut self, class_id: ClassId, name: &str) -> JobId {
        let job_id = JobId::new(self.job_ids.next());
        let stop_on = self
            .registry
            .get(class_id)
            .and_then(|class| class.stop_on.clone())
            .map(|mut op| {
                op.reset();
                op
            });
        let mut job = Job::new(job_id, class_id, name);
        job.stop_on = stop_on;
        self.jobs.insert(job_id, job);
        if let Some(class) = self.registry.get_mut(class_id) {
            class.instances.insert(name.to_string(), job_id);
        }
        debug!(job = %self.log_name(job_id), "instance created");
        job_id
    }

    /// Set a new goal and induct motion if the job rests at the goal's
    /// origin state. A job mid-transition just keeps going; each step reads
    /// the goal afresh.
    pub(crate) fn change_goal(
        &mut self,
        job_id: JobId,
        goal: Goal,
        spawner: &dyn ProcessSpawner,
        effects: &mut Vec<Effect>,
    ) {
        let name = self.log_name(job_id);
        let state = {
            let Some(job) = self.jobs.get_mut(&job_id) else {
                return;
            };
            if job.goal == goal {
                return;
            }
            info!(job = %name, from = %job.goal, to = %goal, "goal change");
            job.goal = goal;
            job.state
        };

        let induct = matches!(
            (goal, state),
            (Goal::Start, JobState::Waiting)
                | (Goal::Stop, JobState::Running)
                | (Goal::Respawn, JobState::Running)
        );
        if induct {
            self.advance(job_id, spawner, effects);
        }
    }

    /// Set the goal without inducting motion (used mid-transition).
    fn set_goal(&mut self, job_id: JobId, goal: Goal) {
        let name = self.log_name(job_id);
        if let Some(job) = self.jobs.get_mut(&job_id) {
            if job.goal != goal {
                info!(job = %name, from = %job.goal, to = %goal, "goal change");
                job.goal = goal;
            }
        }
    }

    /// Take the transition the table prescribes for the job's current
    /// (state, goal).
    pub(crate) fn advance(
        &mut self,
        job_id: JobId,
        spawner: &dyn ProcessSpawner,
        effects: &mut Vec<Effect>,
    ) {
        let Some(step) = self.plan_step(job_id) else {
            return;
        };
        if let Some(goal) = step.new_goal {
            self.set_goal(job_id, goal);
        }
        self.change_state(job_id, step.state, spawner, effects);
    }

    /// `next_state` against the live job, aborting on an impossible
    /// transition: a supervisor with a broken table must not limp on.
    fn plan_step(&self, job_id: JobId) -> Option<warden_core::NextStep> {
        let job = self.jobs.get(&job_id)?;
        let class = self.registry.get(job.class)?;
        let step = next_state(
            job.state,
            job.goal,
            class.has_process(ProcessType::Main),
            job.main_pid().is_some(),
        );
        if step.is_none() {
            error!(
                job = %self.log_name(job_id),
                state = %job.state,
                goal = %job.goal,
                "impossible state transition"
            );
            std::process::abort();
        }
        step
    }

    /// Enter `state` and keep transitioning until the job rests, blocks,
    /// or is destroyed.
    pub(crate) fn change_state(
        &mut self,
        job_id: JobId,
        mut state: JobState,
        spawner: &dyn ProcessSpawner,
        effects: &mut Vec<Effect>,
    ) {
        loop {
            let name = self.log_name(job_id);
            let prev = {
                let Some(job) = self.jobs.get_mut(&job_id) else {
                    return;
                };
                let prev = job.state;
                job.state = state;
                prev
            };
            info!(job = %name, from = %prev, to = %state, "state change");

            let outcome = match state {
                JobState::Starting => {
                    self.enter_starting(job_id);
                    Entered::Wait
                }
                JobState::PreStart => {
                    self.enter_hook(job_id, ProcessType::PreStart, SpawnFailure::Fatal, spawner, effects)
                }
                JobState::Spawned => self.enter_spawned(job_id, spawner, effects),
                JobState::PostStart => self.enter_hook(
                    job_id,
                    ProcessType::PostStart,
                    SpawnFailure::Harmless,
                    spawner,
                    effects,
                ),
                JobState::Running => {
                    self.enter_running(job_id, prev, effects);
                    Entered::Wait
                }
                JobState::PreStop => {
                    // The pending stop environment rides on the job for the
                    // pre-stop script and the stop events.
                    if let Some(env) =
                        self.jobs.get_mut(&job_id).and_then(|job| job.stop_env.take())
                    {
                        if let Some(job) = self.jobs.get_mut(&job_id) {
                            job.env.merge(&env);
                        }
                    }
                    self.enter_hook(
                        job_id,
                        ProcessType::PreStop,
                        SpawnFailure::Harmless,
                        spawner,
                        effects,
                    )
                }
                JobState::Stopping => {
                    self.enter_stopping(job_id);
                    Entered::Wait
                }
                JobState::Killed => self.enter_killed(job_id, spawner),
                JobState::PostStop => {
                    self.enter_hook(job_id, ProcessType::PostStop, SpawnFailure::Fatal, spawner, effects)
                }
                JobState::Waiting => {
                    self.enter_waiting(job_id, effects);
                    return;
                }
            };

            match outcome {
                Entered::Wait => return,
                Entered::Advance => {
                    let Some(step) = self.plan_step(job_id) else {
                        return;
                    };
                    if let Some(goal) = step.new_goal {
                        self.set_goal(job_id, goal);
                    }
                    state = step.state;
                }
            }
        }
    }

    // ------------------------------------------------------------------
    // Entry actions
    // ------------------------------------------------------------------

    fn enter_starting(&mut self, job_id: JobId) {
        let Some(class) = self.class_of(job_id) else {
            return;
        };
        {
            let Some(job) = self.jobs.get_mut(&job_id) else {
                return;
            };
            // Respawn has done its job once the cycle is back here.
            if job.goal == Goal::Respawn {
                job.goal = Goal::Start;
            }
            if let Some(env) = job.start_env.take() {
                if !env.is_empty() {
                    job.env = env;
                }
            }
            job.stop_env = None;
            job.clear_failure();
        }
        let env = self.lifecycle_env(job_id, &class, false);
        let event_id = self.queue.emit(STARTING_EVENT, env, class.session);
        self.block_job_on(job_id, event_id);
    }

    /// Run a hook process if the class defines one.
    fn enter_hook(
        &mut self,
        job_id: JobId,
        process: ProcessType,
        failure: SpawnFailure,
        spawner: &dyn ProcessSpawner,
        effects: &mut Vec<Effect>,
    ) -> Entered {
        if !self.class_has(job_id, process) {
            return Entered::Advance;
        }
        match self.run_process(job_id, process, spawner) {
            Ok(()) => Entered::Wait,
            Err(()) => {
                if failure == SpawnFailure::Fatal {
                    self.job_failed(job_id, Some(FailedProcess::Process(process)), None, effects);
                    self.set_goal(job_id, Goal::Stop);
                }
                Entered::Advance
            }
        }
    }

    fn enter_spawned(
        &mut self,
        job_id: JobId,
        spawner: &dyn ProcessSpawner,
        effects: &mut Vec<Effect>,
    ) -> Entered {
        let Some(class) = self.class_of(job_id) else {
            return Entered::Advance;
        };
        if !class.has_process(ProcessType::Main) {
            return Entered::Advance;
        }
        match self.run_process(job_id, ProcessType::Main, spawner) {
            Err(()) => {
                self.job_failed(
                    job_id,
                    Some(FailedProcess::Process(ProcessType::Main)),
                    None,
                    effects,
                );
                self.set_goal(job_id, Goal::Stop);
                Entered::Advance
            }
            Ok(()) => {
                if class.expect == ExpectMode::None {
                    return Entered::Advance;
                }
                // Hold in SPAWNED until the tracer reports the real pid.
                let pid = self
                    .jobs
                    .get_mut(&job_id)
                    .map(|job| {
                        job.trace_state = TraceState::Tracing;
                        job.main_pid()
                    })
                    .unwrap_or(None);
                if let Some(pid) = pid {
                    effects.push(Effect::BeginTrace {
                        job: job_id,
                        pid,
                        expect: class.expect,
                    });
                }
                Entered::Wait
            }
        }
    }

    fn enter_running(&mut self, job_id: JobId, prev: JobState, effects: &mut Vec<Effect>) {
        let Some(class) = self.class_of(job_id) else {
            return;
        };
        if prev == JobState::PreStop {
            // The pre-stop script aborted the stop; the job never left
            // RUNNING as far as listeners are concerned.
            if let Some(job) = self.jobs.get_mut(&job_id) {
                job.stop_env = None;
            }
            self.job_finished(job_id, false, effects);
            return;
        }
        let env = self.lifecycle_env(job_id, &class, false);
        self.queue.emit(STARTED_EVENT, env, class.session);
        if !class.task {
            // Start-waiters of a service are satisfied once it runs; only
            // tasks hold them to completion.
            self.job_finished(job_id, false, effects);
        }
    }

    fn enter_stopping(&mut self, job_id: JobId) {
        let Some(class) = self.class_of(job_id) else {
            return;
        };
        let env = self.lifecycle_env(job_id, &class, true);
        let event_id = self.queue.emit(STOPPING_EVENT, env, class.session);
        self.block_job_on(job_id, event_id);
    }

    fn enter_killed(&mut self, job_id: JobId, spawner: &dyn ProcessSpawner) -> Entered {
        let Some(class) = self.class_of(job_id) else {
            return Entered::Advance;
        };
        let Some(pid) = self.jobs.get(&job_id).and_then(Job::main_pid) else {
            return Entered::Advance;
        };
        info!(
            job = %self.log_name(job_id),
            pid,
            signal = class.kill_signal,
            "killing main process"
        );
        if let Err(e) = spawner.kill(pid, class.kill_signal) {
            error!(job = %self.log_name(job_id), pid, error = %e, "kill failed");
        }
        let timer = TimerId::kill(job_id);
        self.scheduler
            .set_timer(timer.clone(), class.kill_timeout, self.clock.now());
        if let Some(job) = self.jobs.get_mut(&job_id) {
            job.kill_timer = Some(timer);
        }
        Entered::Wait
    }

    fn enter_waiting(&mut self, job_id: JobId, effects: &mut Vec<Effect>) {
        let Some(class) = self.class_of(job_id) else {
            return;
        };
        let env = self.lifecycle_env(job_id, &class, true);
        self.queue.emit(STOPPED_EVENT, env, class.session);
        self.job_finished(job_id, false, effects);
        self.destroy_job(job_id);
    }

    /// Unlink and destroy a job; destroys its class too if the class was
    /// deleted and this was the last instance.
    fn destroy_job(&mut self, job_id: JobId) {
        let name = self.log_name(job_id);
        let Some(job) = self.jobs.remove(&job_id) else {
            return;
        };
        debug!(job = %name, "instance destroyed");
        // job_finished ran first, but be safe about stray holds.
        for blocked in job.blocking {
            if let Blocked::Event { event } = blocked {
                self.queue.unblock(event);
            }
        }
        if let Some(timer) = job.kill_timer {
            self.scheduler.cancel_timer(&timer);
        }
        if let Some(class) = self.registry.get_mut(job.class) {
            class.instances.retain(|_, id| *id != job_id);
        }
        self.registry.reconsider(job.class);
    }

    // ------------------------------------------------------------------
    // Event plumbing
    // ------------------------------------------------------------------

    /// Build the env for a lifecycle event: `JOB=`, `INSTANCE=`, the stop
    /// result fields when requested, and the class's exported keys.
    fn lifecycle_env(&self, job_id: JobId, class: &JobClass, with_result: bool) -> EnvList {
        use warden_core::event::{
            EXIT_SIGNAL_ENV, EXIT_STATUS_ENV, INSTANCE_ENV, JOB_ENV, PROCESS_ENV, RESULT_ENV,
        };
        use warden_core::signal::{signal_name, wait_code, wait_signal};

        let mut env = EnvList::new();
        let Some(job) = self.jobs.get(&job_id) else {
            return env;
        };
        // Keys below are constant, validated names.
        let _ = env.set(JOB_ENV, &class.name);
        let _ = env.set(INSTANCE_ENV, &job.name);

        if with_result {
            if job.failed {
                let _ = env.set(RESULT_ENV, "failed");
                if let Some(failed_process) = job.failed_process {
                    let _ = env.set(PROCESS_ENV, &failed_process.to_string());
                    if failed_process != FailedProcess::Respawn {
                        if let Some(status) = job.exit_status {
                            match wait_signal(status) {
                                Some(sig) => {
                                    let value = signal_name(sig)
                                        .map(str::to_string)
                                        .unwrap_or_else(|| sig.to_string());
                                    let _ = env.set(EXIT_SIGNAL_ENV, &value);
                                }
                                None => {
                                    let _ =
                                        env.set(EXIT_STATUS_ENV, &wait_code(status).to_string());
                                }
                            }
                        }
                    }
                }
            } else {
                let _ = env.set(RESULT_ENV, "ok");
            }
        }

        for key in &class.export {
            if let Some(value) = job.env.get(key) {
                let _ = env.set(key, value);
            }
        }
        env
    }

    /// Make `event` the job's blocker: the job halts until it finishes.
    fn block_job_on(&mut self, job_id: JobId, event_id: EventId) {
        if let Some(event) = self.queue.get_mut(event_id) {
            event.blocking.push(Blocked::Job { job: job_id });
        }
        if let Some(job) = self.jobs.get_mut(&job_id) {
            job.blocker = Some(event_id);
        }
    }

    /// Record a failure. Only the first failure of a cycle sticks.
    pub(crate) fn job_failed(
        &mut self,
        job_id: JobId,
        process: Option<FailedProcess>,
        status: Option<i32>,
        effects: &mut Vec<Effect>,
    ) {
        {
            let Some(job) = self.jobs.get_mut(&job_id) else {
                return;
            };
            if job.failed {
                return;
            }
            job.failed = true;
            job.failed_process = process;
            job.exit_status = status;
        }
        warn!(job = %self.log_name(job_id), ?process, ?status, "job failed");
        self.job_finished(job_id, true, effects);
    }

    /// Resolve everything waiting on this job's transition.
    pub(crate) fn job_finished(&mut self, job_id: JobId, failed: bool, effects: &mut Vec<Effect>) {
        let name = self.log_name(job_id);
        let view = self.jobs.get(&job_id).map(JobView::of);
        let blocking = match self.jobs.get_mut(&job_id) {
            Some(job) => std::mem::take(&mut job.blocking),
            None => return,
        };

        for blocked in blocking {
            match blocked {
                Blocked::Event { event } => {
                    if failed {
                        if let Some(event) = self.queue.get_mut(event) {
                            event.failed = true;
                            if event.failed_by.is_none() {
                                event.failed_by = Some(name.clone());
                            }
                        }
                    }
                    self.queue.unblock(event);
                }
                Blocked::StartReply { reply } | Blocked::RestartReply { reply } => {
                    let body = if failed {
                        ReplyBody::err(CoreError::JobFailed { name: name.clone() })
                    } else {
                        match &view {
                            Some(view) => ReplyBody::Started { job: view.clone() },
                            None => ReplyBody::Ok,
                        }
                    };
                    effects.push(Effect::Reply { token: reply, body });
                }
                Blocked::StopReply { reply } => {
                    let body = if failed {
                        ReplyBody::err(CoreError::JobFailed { name: name.clone() })
                    } else {
                        ReplyBody::Stopped { job: name.clone() }
                    };
                    effects.push(Effect::Reply { token: reply, body });
                }
                Blocked::Job { .. } => {
                    // Jobs wait on events, never on other jobs directly.
                    warn!(job = %name, "unexpected job record in blocking list");
                }
            }
        }
    }

    // ------------------------------------------------------------------
    // Processes
    // ------------------------------------------------------------------

    /// Spawn one process slot for the job.
    fn run_process(
        &mut self,
        job_id: JobId,
        process: ProcessType,
        spawner: &dyn ProcessSpawner,
    ) -> Result<(), ()> {
        let Some(class) = self.class_of(job_id) else {
            return Err(());
        };
        let Some(command) = class.processes.get(process).cloned() else {
            return Err(());
        };
        let Some(job) = self.jobs.get(&job_id) else {
            return Err(());
        };

        let file_name = if job.name.is_empty() {
            class.name.clone()
        } else {
            format!("{}-{}", class.name, job.name)
        };
        let request = SpawnRequest {
            job: file_name,
            process,
            command: command.command,
            script: command.script,
            env: job.env.entries().to_vec(),
            cwd: class.chdir.clone(),
            setuid: class.setuid.clone(),
            setgid: class.setgid.clone(),
            console: class.console,
            oom_score_adj: class.oom_score_adj,
        };

        match spawner.spawn(&request) {
            Ok(pid) => {
                info!(job = %self.log_name(job_id), process = %process, pid, "process started");
                if let Some(job) = self.jobs.get_mut(&job_id) {
                    job.pids.set(process, pid);
                }
                Ok(())
            }
            Err(e) => {
                error!(
                    job = %self.log_name(job_id),
                    process = %process,
                    error = %e,
                    "failed to spawn process"
                );
                Err(())
            }
        }
    }

    // ------------------------------------------------------------------
    // Reaper
    // ------------------------------------------------------------------

    /// Route a child exit to the owning job.
    pub(crate) fn handle_child_exit(
        &mut self,
        pid: u32,
        status: i32,
        spawner: &dyn ProcessSpawner,
        effects: &mut Vec<Effect>,
    ) {
        let found = self
            .jobs
            .iter()
            .find_map(|(id, job)| job.pids.process_of(pid).map(|process| (*id, process)));
        let Some((job_id, process)) = found else {
            debug!(pid, status, "exit of unknown child");
            return;
        };

        if let Some(job) = self.jobs.get_mut(&job_id) {
            job.pids.clear(process);
        }
        info!(
            job = %self.log_name(job_id),
            process = %process,
            pid,
            status,
            "process exited"
        );

        match process {
            ProcessType::Main => self.main_exited(job_id, status, spawner, effects),
            hook => self.hook_exited(job_id, hook, status, spawner, effects),
        }
    }

    fn hook_exited(
        &mut self,
        job_id: JobId,
        process: ProcessType,
        status: i32,
        spawner: &dyn ProcessSpawner,
        effects: &mut Vec<Effect>,
    ) {
        let Some(state) = self.jobs.get(&job_id).map(|job| job.state) else {
            return;
        };
        let failed_exit = status != 0;
        if failed_exit {
            warn!(
                job = %self.log_name(job_id),
                process = %process,
                status,
                "process exited with failure"
            );
        }

        match process {
            ProcessType::PreStart if failed_exit => {
                self.job_failed(
                    job_id,
                    Some(FailedProcess::Process(ProcessType::PreStart)),
                    Some(status),
                    effects,
                );
                self.set_goal(job_id, Goal::Stop);
            }
            ProcessType::PostStop if failed_exit => {
                self.job_failed(
                    job_id,
                    Some(FailedProcess::Process(ProcessType::PostStop)),
                    Some(status),
                    effects,
                );
                self.set_goal(job_id, Goal::Stop);
            }
            _ => {}
        }

        // Only the state that waits on this hook advances on its exit; a
        // late exit after the machine moved on is just bookkeeping.
        let waits_here = matches!(
            (process, state),
            (ProcessType::PreStart, JobState::PreStart)
                | (ProcessType::PostStart, JobState::PostStart)
                | (ProcessType::PreStop, JobState::PreStop)
                | (ProcessType::PostStop, JobState::PostStop)
        );
        if waits_here {
            self.advance(job_id, spawner, effects);
        }
    }

    fn main_exited(
        &mut self,
        job_id: JobId,
        status: i32,
        spawner: &dyn ProcessSpawner,
        effects: &mut Vec<Effect>,
    ) {
        let Some((state, goal)) = self.jobs.get(&job_id).map(|job| (job.state, job.goal)) else {
            return;
        };
        let Some(class) = self.class_of(job_id) else {
            return;
        };

        // A pending kill escalation is moot once the process is gone.
        if let Some(timer) = self.jobs.get_mut(&job_id).and_then(|job| job.kill_timer.take()) {
            self.scheduler.cancel_timer(&timer);
        }

        match state {
            JobState::Killed => {
                self.advance(job_id, spawner, effects);
            }
            JobState::Stopping | JobState::PreStop => {
                // The stop is already in motion; KILLED will find the
                // process gone and move straight on.
            }
            JobState::Spawned => {
                // Died before the tracer settled.
                self.job_failed(
                    job_id,
                    Some(FailedProcess::Process(ProcessType::Main)),
                    Some(status),
                    effects,
                );
                self.set_goal(job_id, Goal::Stop);
                if let Some(job) = self.jobs.get_mut(&job_id) {
                    job.trace_state = TraceState::None;
                }
                self.advance(job_id, spawner, effects);
            }
            JobState::Running | JobState::PostStart => {
                let normal = class.is_normal_exit(status);
                if goal == Goal::Start {
                    if class.respawn.enabled && !normal {
                        if self.respawn_limit_hit(job_id, &class) {
                            warn!(job = %self.log_name(job_id), "respawning too fast, stopped");
                            self.job_failed(job_id, Some(FailedProcess::Respawn), None, effects);
                            self.set_goal(job_id, Goal::Stop);
                        } else {
                            warn!(job = %self.log_name(job_id), "main process ended, respawning");
                            self.set_goal(job_id, Goal::Respawn);
                        }
                    } else {
                        if !normal {
                            self.job_failed(
                                job_id,
                                Some(FailedProcess::Process(ProcessType::Main)),
                                Some(status),
                                effects,
                            );
                        }
                        self.set_goal(job_id, Goal::Stop);
                    }
                }
                // With goal stop or respawn the exit is what the cycle was
                // waiting for. POST_START keeps waiting for its hook; the
                // hook's exit advances under the goal set above.
                if state == JobState::Running {
                    self.advance(job_id, spawner, effects);
                }
            }
            other => {
                warn!(
                    job = %self.log_name(job_id),
                    state = %other,
                    "main process exit in unexpected state"
                );
            }
        }
    }

    /// Count a respawn against the rate window; true when the limit is hit.
    fn respawn_limit_hit(&mut self, job_id: JobId, class: &JobClass) -> bool {
        let now = self.clock.epoch_ms();
        let interval_ms = class.respawn.interval.as_millis() as u64;
        let Some(job) = self.jobs.get_mut(&job_id) else {
            return false;
        };
        match job.respawn_window_ms {
            Some(window) if now.saturating_sub(window) < interval_ms => {
                job.respawn_count += 1;
            }
            _ => {
                job.respawn_window_ms = Some(now);
                job.respawn_count = 1;
            }
        }
        job.respawn_count > class.respawn.limit
    }

    // ------------------------------------------------------------------
    // Tracer and timers
    // ------------------------------------------------------------------

    pub(crate) fn handle_trace_done(
        &mut self,
        job_id: JobId,
        main_pid: u32,
        failed: bool,
        spawner: &dyn ProcessSpawner,
        effects: &mut Vec<Effect>,
    ) {
        let valid = self
            .jobs
            .get(&job_id)
            .map(|job| job.state == JobState::Spawned && job.trace_state == TraceState::Tracing)
            .unwrap_or(false);
        if !valid {
            debug!(job = %self.log_name(job_id), "stale trace result");
            return;
        }

        if let Some(job) = self.jobs.get_mut(&job_id) {
            job.trace_state = TraceState::Done;
            job.pids.clear(ProcessType::Main);
            job.pids.set(ProcessType::Main, main_pid);
        }
        if failed {
            self.job_failed(
                job_id,
                Some(FailedProcess::Process(ProcessType::Main)),
                None,
                effects,
            );
            self.set_goal(job_id, Goal::Stop);
        }
        self.advance(job_id, spawner, effects);
    }

    pub(crate) fn handle_timer(
        &mut self,
        id: TimerId,
        spawner: &dyn ProcessSpawner,
        _effects: &mut [Effect],
    ) {
        let Some(job_id) = id.kill_job_id() else {
            debug!(timer = %id, "unknown timer fired");
            return;
        };
        let armed = self
            .jobs
            .get(&job_id)
            .map(|job| job.kill_timer.as_ref() == Some(&id))
            .unwrap_or(false);
        if !armed {
            return;
        }

        if let Some(pid) = self.jobs.get(&job_id).and_then(Job::main_pid) {
            warn!(
                job = %self.log_name(job_id),
                pid,
                "kill timeout expired, sending KILL"
            );
            if let Err(e) = spawner.kill(pid, SIGKILL) {
                error!(job = %self.log_name(job_id), pid, error = %e, "KILL failed");
            }
        }
        if let Some(job) = self.jobs.get_mut(&job_id) {
            job.kill_timer = None;
        }
    }
}
