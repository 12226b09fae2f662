// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Control-surface handlers: start, stop, restart, status, list.
//!
//! Requests resolve a class by name against the caller's session, mutate
//! the instance's goal, and either answer immediately or park the reply in
//! the job's blocking list to be answered when the transition settles.

use crate::core::{Core, Effect};
use crate::error::CoreError;
use crate::reply::{ClassView, JobView, ReplyBody};
use tracing::debug;
use warden_adapters::ProcessSpawner;
use warden_core::{Blocked, ClassId, Clock, EnvList, Goal, JobId, ReplyToken, SessionId};

/// Resolution of a control target down to a live instance.
struct Target {
    class_id: ClassId,
    instance: String,
    env: EnvList,
}

impl<C: Clock> Core<C> {
    fn reply(effects: &mut Vec<Effect>, token: ReplyToken, body: ReplyBody) {
        effects.push(Effect::Reply { token, body });
    }

    /// Resolve a class for a mutating request: the caller must own it.
    fn resolve_for_control(
        &self,
        name: &str,
        session: Option<SessionId>,
    ) -> Result<ClassId, CoreError> {
        let class_id = self
            .registry
            .visible(name, session)
            .ok_or_else(|| CoreError::UnknownJob {
                name: name.to_string(),
            })?;
        let class = self
            .registry
            .get(class_id)
            .ok_or_else(|| CoreError::UnknownJob {
                name: name.to_string(),
            })?;
        if class.session != session {
            return Err(CoreError::PermissionDenied {
                name: name.to_string(),
            });
        }
        Ok(class_id)
    }

    /// Build the request environment and expand the instance name.
    fn resolve_target(
        &self,
        name: &str,
        env_entries: &[String],
        session: Option<SessionId>,
    ) -> Result<Target, CoreError> {
        let class_id = self.resolve_for_control(name, session)?;
        let class = self
            .registry
            .get(class_id)
            .ok_or_else(|| CoreError::UnknownJob {
                name: name.to_string(),
            })?;

        let mut env = class.env.clone();
        for entry in env_entries {
            env.set_entry(entry).map_err(|e| CoreError::BadEnvironment {
                message: e.to_string(),
            })?;
        }
        let instance = env
            .expand(&class.instance)
            .map_err(|e| CoreError::BadEnvironment {
                message: e.to_string(),
            })?;

        Ok(Target {
            class_id,
            instance,
            env,
        })
    }

    fn find_instance(&self, target: &Target) -> Option<JobId> {
        self.registry
            .get(target.class_id)
            .and_then(|class| class.instances.get(&target.instance).copied())
    }

    #[allow(clippy::too_many_arguments)]
    pub(crate) fn control_start(
        &mut self,
        name: &str,
        env_entries: &[String],
        wait: bool,
        session: Option<SessionId>,
        reply: ReplyToken,
        spawner: &dyn ProcessSpawner,
        effects: &mut Vec<Effect>,
    ) {
        let target = match self.resolve_target(name, env_entries, session) {
            Ok(target) => target,
            Err(e) => return Self::reply(effects, reply, ReplyBody::err(e)),
        };

        let job_id = match self.find_instance(&target) {
            Some(job_id) => {
                let starting = self
                    .jobs
                    .get(&job_id)
                    .map(|job| job.goal != Goal::Stop)
                    .unwrap_or(false);
                if starting {
                    let error = CoreError::AlreadyStarted {
                        name: self.log_name(job_id),
                    };
                    return Self::reply(effects, reply, ReplyBody::err(error));
                }
                job_id
            }
            None => self.create_instance(target.class_id, &target.instance),
        };
        debug!(job = %self.log_name(job_id), wait, "control start");

        if let Some(job) = self.jobs.get_mut(&job_id) {
            job.start_env = Some(target.env);
            if wait {
                job.blocking.push(Blocked::StartReply { reply });
            }
        }
        if !wait {
            Self::reply(effects, reply, ReplyBody::Ok);
        }
        self.change_goal(job_id, Goal::Start, spawner, effects);
    }

    #[allow(clippy::too_many_arguments)]
    pub(crate) fn control_stop(
        &mut self,
        name: &str,
        env_entries: &[String],
        wait: bool,
        session: Option<SessionId>,
        reply: ReplyToken,
        spawner: &dyn ProcessSpawner,
        effects: &mut Vec<Effect>,
    ) {
        let target = match self.resolve_target(name, env_entries, session) {
            Ok(target) => target,
            Err(e) => return Self::reply(effects, reply, ReplyBody::err(e)),
        };

        let Some(job_id) = self.find_instance(&target) else {
            let error = CoreError::UnknownInstance {
                name: name.to_string(),
                instance: target.instance,
            };
            return Self::reply(effects, reply, ReplyBody::err(error));
        };
        let stopped = self
            .jobs
            .get(&job_id)
            .map(|job| job.goal == Goal::Stop)
            .unwrap_or(true);
        if stopped {
            let error = CoreError::AlreadyStopped {
                name: self.log_name(job_id),
            };
            return Self::reply(effects, reply, ReplyBody::err(error));
        }
        debug!(job = %self.log_name(job_id), wait, "control stop");

        if let Some(job) = self.jobs.get_mut(&job_id) {
            job.stop_env = Some(target.env);
            if wait {
                job.blocking.push(Blocked::StopReply { reply });
            }
        }
        if !wait {
            Self::reply(effects, reply, ReplyBody::Ok);
        }
        self.change_goal(job_id, Goal::Stop, spawner, effects);
    }

    /// Restart drives a respawn cycle: the stop half skips pre-stop, and
    /// STARTING flips the goal back to start with the new environment.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn control_restart(
        &mut self,
        name: &str,
        env_entries: &[String],
        wait: bool,
        session: Option<SessionId>,
        reply: ReplyToken,
        spawner: &dyn ProcessSpawner,
        effects: &mut Vec<Effect>,
    ) {
        let target = match self.resolve_target(name, env_entries, session) {
            Ok(target) => target,
            Err(e) => return Self::reply(effects, reply, ReplyBody::err(e)),
        };

        let Some(job_id) = self.find_instance(&target) else {
            let error = CoreError::UnknownInstance {
                name: name.to_string(),
                instance: target.instance,
            };
            return Self::reply(effects, reply, ReplyBody::err(error));
        };
        let stopped = self
            .jobs
            .get(&job_id)
            .map(|job| job.goal == Goal::Stop)
            .unwrap_or(true);
        if stopped {
            let error = CoreError::AlreadyStopped {
                name: self.log_name(job_id),
            };
            return Self::reply(effects, reply, ReplyBody::err(error));
        }
        debug!(job = %self.log_name(job_id), wait, "control restart");

        if let Some(job) = self.jobs.get_mut(&job_id) {
            job.start_env = Some(target.env);
            if wait {
                job.blocking.push(Blocked::RestartReply { reply });
            }
        }
        if !wait {
            Self::reply(effects, reply, ReplyBody::Ok);
        }
        self.change_goal(job_id, Goal::Respawn, spawner, effects);
    }

    pub(crate) fn control_status(
        &mut self,
        name: &str,
        session: Option<SessionId>,
        reply: ReplyToken,
        effects: &mut Vec<Effect>,
    ) {
        let Some(class_id) = self.registry.visible(name, session) else {
            let error = CoreError::UnknownJob {
                name: name.to_string(),
            };
            return Self::reply(effects, reply, ReplyBody::err(error));
        };
        let Some(class) = self.registry.get(class_id) else {
            let error = CoreError::UnknownJob {
                name: name.to_string(),
            };
            return Self::reply(effects, reply, ReplyBody::err(error));
        };
        let view = ClassView::of(class, self.instance_views(class_id));
        Self::reply(effects, reply, ReplyBody::Status { class: view });
    }

    pub(crate) fn control_list(
        &mut self,
        session: Option<SessionId>,
        reply: ReplyToken,
        effects: &mut Vec<Effect>,
    ) {
        let mut classes = Vec::new();
        for class_id in self.registry.ids() {
            let Some(class) = self.registry.get(class_id) else {
                continue;
            };
            if class.session.is_some() && class.session != session {
                continue;
            }
            classes.push(ClassView::of(class, self.instance_views(class_id)));
        }
        Self::reply(effects, reply, ReplyBody::List { classes });
    }

    fn instance_views(&self, class_id: ClassId) -> Vec<JobView> {
        let mut views: Vec<JobView> = self
            .registry
            .get(class_id)
            .map(|class| {
                class
                    .instances
                    .values()
                    .filter_map(|job_id| self.jobs.get(job_id))
                    .map(JobView::of)
                    .collect()
            })
            .unwrap_or_default();
        views.sort_by(|a, b| a.instance.cmp(&b.instance));
        views
    }
}
