// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared scenario harness: a core on a fake clock with a fake spawner.

use crate::core::{Core, Effect, Input};
use crate::reply::ReplyBody;
use warden_adapters::FakeSpawner;
use warden_conf::{build_class, parse_conf, Format};
use warden_core::{Blocked, FakeClock, Job, JobClass, ReplyToken};

pub(crate) struct Harness {
    pub core: Core<FakeClock>,
    pub clock: FakeClock,
    pub spawner: FakeSpawner,
    next_reply: u64,
}

impl Harness {
    pub fn new() -> Self {
        let clock = FakeClock::new();
        Self {
            core: Core::with_clock(clock.clone()),
            clock,
            spawner: FakeSpawner::new(),
            next_reply: 1,
        }
    }

    /// Load TOML job definitions into the registry.
    pub fn load(&mut self, toml: &str) {
        let conf = parse_conf(toml, Format::Toml).unwrap();
        let classes: Vec<JobClass> = conf
            .jobs
            .values()
            .map(|def| build_class(def, None).unwrap())
            .collect();
        self.handle(Input::Reload {
            classes,
            sources: Vec::new(),
            reply: None,
        });
    }

    pub fn handle(&mut self, input: Input) -> Vec<Effect> {
        self.core.handle(input, &self.spawner)
    }

    pub fn reply_token(&mut self) -> ReplyToken {
        let token = ReplyToken::new(self.next_reply);
        self.next_reply += 1;
        token
    }

    pub fn emit(&mut self, name: &str) -> Vec<Effect> {
        self.handle(Input::Emit {
            name: name.to_string(),
            env: Vec::new(),
            session: None,
            reply: None,
        })
    }

    pub fn emit_wait(&mut self, name: &str) -> (ReplyToken, Vec<Effect>) {
        let token = self.reply_token();
        let effects = self.handle(Input::Emit {
            name: name.to_string(),
            env: Vec::new(),
            session: None,
            reply: Some(token),
        });
        (token, effects)
    }

    pub fn child_exit(&mut self, pid: u32, status: i32) -> Vec<Effect> {
        self.handle(Input::ChildExit { pid, status })
    }

    pub fn start(&mut self, name: &str, wait: bool) -> (ReplyToken, Vec<Effect>) {
        let token = self.reply_token();
        let effects = self.handle(Input::Start {
            name: name.to_string(),
            env: Vec::new(),
            wait,
            session: None,
            reply: token,
        });
        (token, effects)
    }

    pub fn stop(&mut self, name: &str, wait: bool) -> (ReplyToken, Vec<Effect>) {
        let token = self.reply_token();
        let effects = self.handle(Input::Stop {
            name: name.to_string(),
            env: Vec::new(),
            wait,
            session: None,
            reply: token,
        });
        (token, effects)
    }

    pub fn restart(&mut self, name: &str, wait: bool) -> (ReplyToken, Vec<Effect>) {
        let token = self.reply_token();
        let effects = self.handle(Input::Restart {
            name: name.to_string(),
            env: Vec::new(),
            wait,
            session: None,
            reply: token,
        });
        (token, effects)
    }

    /// Names of every event emitted so far, in order.
    pub fn event_names(&self) -> Vec<String> {
        self.core
            .queue
            .emitted
            .iter()
            .map(|event| event.name.clone())
            .collect()
    }

    /// Emitted events rendered as `name KEY=VALUE ...`, in order.
    pub fn event_log(&self) -> Vec<String> {
        self.core
            .queue
            .emitted
            .iter()
            .map(|event| {
                let mut line = event.name.clone();
                for entry in event.env.entries() {
                    line.push(' ');
                    line.push_str(entry);
                }
                line
            })
            .collect()
    }

    pub fn job(&self, class: &str, instance: &str) -> Option<&Job> {
        let class_id = self.core.registry.visible(class, None)?;
        let job_id = self
            .core
            .registry
            .get(class_id)?
            .instances
            .get(instance)
            .copied()?;
        self.core.jobs.get(&job_id)
    }

    pub fn instance_count(&self, class: &str) -> usize {
        self.core
            .registry
            .visible(class, None)
            .and_then(|id| self.core.registry.get(id))
            .map(|class| class.instances.len())
            .unwrap_or(0)
    }

    /// Reply bodies addressed to `token` among the effects.
    pub fn replies_for(effects: &[Effect], token: ReplyToken) -> Vec<ReplyBody> {
        effects
            .iter()
            .filter_map(|effect| match effect {
                Effect::Reply { token: t, body } if *t == token => Some(body.clone()),
                _ => None,
            })
            .collect()
    }

    /// Check the count invariant: for every live event, `blockers` equals
    /// the number of records referencing it across all blocking lists.
    pub fn assert_blocker_invariant(&self) {
        for event_id in self.core.queue.ordered_ids() {
            let Some(event) = self.core.queue.get(event_id) else {
                continue;
            };
            let mut count = 0u32;
            for job in self.core.jobs.values() {
                count += job
                    .blocking
                    .iter()
                    .filter(|b| b.references_event(event_id))
                    .count() as u32;
            }
            for other_id in self.core.queue.ordered_ids() {
                if let Some(other) = self.core.queue.get(other_id) {
                    count += other
                        .blocking
                        .iter()
                        .filter(|b| b.references_event(event_id))
                        .count() as u32;
                }
            }
            assert_eq!(
                event.blockers, count,
                "blocker count mismatch on event {}",
                event.name
            );
        }
    }

    /// Every job blocked on an event must be referenced back by it.
    pub fn assert_blocked_jobs_linked(&self) {
        for (job_id, job) in &self.core.jobs {
            if let Some(event_id) = job.blocker {
                let linked = self
                    .core
                    .queue
                    .get(event_id)
                    .map(|event| {
                        event
                            .blocking
                            .iter()
                            .any(|b| matches!(b, Blocked::Job { job } if job == job_id))
                    })
                    .unwrap_or(false);
                assert!(linked, "job {job_id} blocker not linked back");
            }
        }
    }
}
