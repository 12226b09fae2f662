// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Event matching against the class registry.
//!
//! For each class, stop conditions are evaluated before start conditions:
//! an event that names a job in both its stop and start condition replaces
//! the running process instead of starting a second one and stopping it.

use crate::core::{Core, Effect};
use tracing::{debug, info, warn};
use warden_adapters::ProcessSpawner;
use warden_core::event::MATCHED_EVENTS_ENV;
use warden_core::{Blocked, ClassId, Clock, EnvList, Event, EventId, Goal, JobId};

impl<C: Clock> Core<C> {
    /// Run one pending event against every class.
    ///
    /// Instances of deleted classes still stop-match (a replaced service
    /// must remain stoppable); only live definitions start new work.
    pub(crate) fn handle_pending_event(
        &mut self,
        event: &Event,
        spawner: &dyn ProcessSpawner,
        effects: &mut Vec<Effect>,
    ) {
        for class_id in self.registry.ids() {
            self.match_stop(class_id, event, spawner, effects);
            let live = self
                .registry
                .get(class_id)
                .map(|class| !class.deleted)
                .unwrap_or(false);
            if live {
                self.match_start(class_id, event, spawner, effects);
            }
        }
    }

    fn match_stop(
        &mut self,
        class_id: ClassId,
        event: &Event,
        spawner: &dyn ProcessSpawner,
        effects: &mut Vec<Effect>,
    ) {
        let instance_ids: Vec<JobId> = match self.registry.get(class_id) {
            Some(class) if class.session == event.session => {
                class.instances.values().copied().collect()
            }
            _ => return,
        };

        for job_id in instance_ids {
            self.stop_match_instance(job_id, event, spawner, effects);
        }
    }

    /// Evaluate one instance's stop condition against an event.
    fn stop_match_instance(
        &mut self,
        job_id: JobId,
        event: &Event,
        spawner: &dyn ProcessSpawner,
        effects: &mut Vec<Effect>,
    ) {
        let matched = {
            let Some(job) = self.jobs.get_mut(&job_id) else {
                return;
            };
            // The job env is the reference for `KEY=$VAR` matchers.
            let reference = job.env.clone();
            match job.stop_on.as_mut() {
                Some(op) => op.handle(event, Some(&reference)),
                None => false,
            }
        };
        if !matched {
            return;
        }

        // The condition is consumed whether or not it changes the goal.
        let (stop_env, matched_events) = {
            let Some(op) = self.jobs.get_mut(&job_id).and_then(|job| job.stop_on.as_mut())
            else {
                return;
            };
            let mut env = EnvList::new();
            op.environment(&mut env, MATCHED_EVENTS_ENV);
            let events = op.matched_events();
            op.reset();
            (env, events)
        };

        let already_stopping = self
            .jobs
            .get(&job_id)
            .map(|job| job.goal == Goal::Stop)
            .unwrap_or(true);
        if already_stopping {
            return;
        }

        info!(job = %self.log_name(job_id), event = %event.name, "stop condition met");
        if let Some(job) = self.jobs.get_mut(&job_id) {
            job.stop_env = Some(stop_env);
        }
        // Cancel waiters from the start half of the cycle, then hold
        // every matched event open until the stop settles.
        self.job_finished(job_id, false, effects);
        self.block_job_events(job_id, &matched_events);
        self.change_goal(job_id, Goal::Stop, spawner, effects);
    }

    fn match_start(
        &mut self,
        class_id: ClassId,
        event: &Event,
        spawner: &dyn ProcessSpawner,
        effects: &mut Vec<Effect>,
    ) {
        let matched = {
            let Some(class) = self.registry.get_mut(class_id) else {
                return;
            };
            if class.session != event.session {
                return;
            }
            match class.start_on.as_mut() {
                Some(op) => op.handle(event, None),
                None => false,
            }
        };
        if !matched {
            return;
        }

        let (env, matched_events, instance_template, class_name) = {
            let Some(class) = self.registry.get_mut(class_id) else {
                return;
            };
            let mut env = class.env.clone();
            let template = class.instance.clone();
            let name = class.name.clone();
            let Some(op) = class.start_on.as_mut() else {
                return;
            };
            op.environment(&mut env, MATCHED_EVENTS_ENV);
            let events = op.matched_events();
            op.reset();
            (env, events, template, name)
        };

        let instance = match env.expand(&instance_template) {
            Ok(instance) => instance,
            Err(e) => {
                warn!(
                    class = %class_name,
                    template = %instance_template,
                    error = %e,
                    "instance expansion failed, not starting"
                );
                return;
            }
        };

        let existing = self
            .registry
            .get(class_id)
            .and_then(|class| class.instances.get(&instance).copied());
        let mut fresh = false;
        let job_id = match existing {
            Some(job_id) => {
                let starting = self
                    .jobs
                    .get(&job_id)
                    .map(|job| job.goal == Goal::Start)
                    .unwrap_or(false);
                if starting {
                    debug!(job = %self.log_name(job_id), "already starting");
                    return;
                }
                job_id
            }
            None => {
                fresh = true;
                self.create_instance(class_id, &instance)
            }
        };

        info!(job = %self.log_name(job_id), event = %event.name, "start condition met");
        if let Some(job) = self.jobs.get_mut(&job_id) {
            job.start_env = Some(env);
        }
        self.block_job_events(job_id, &matched_events);
        self.change_goal(job_id, Goal::Start, spawner, effects);

        // A brand-new instance existed too late for the stop pass; the
        // event must still reach its stop condition, so that a condition
        // naming both halves starts and then stops the job.
        if fresh {
            self.stop_match_instance(job_id, event, spawner, effects);
        }
    }

    /// Hold each matched event open on behalf of the job.
    fn block_job_events(&mut self, job_id: JobId, events: &[EventId]) {
        for &event_id in events {
            if let Some(job) = self.jobs.get_mut(&job_id) {
                job.blocking.push(Blocked::Event { event: event_id });
            }
            self.queue.block(event_id);
        }
    }
}
