// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Deadline tracking for the engine.
//!
//! Kill escalations and other delayed work register a deadline under a
//! stable [`TimerId`]; the daemon's tick asks what has come due and feeds
//! each expiry back in as an input. Arming an id that is already armed
//! simply moves its deadline. Nothing here sleeps: the loop owns the clock
//! and hands `now` in on every call, which keeps timers testable against a
//! fake clock and lets the snapshot ask how much of a kill timeout is left.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};
use warden_core::TimerId;

/// Armed deadlines by timer id.
#[derive(Debug, Default)]
pub struct Scheduler {
    deadlines: BTreeMap<TimerId, Instant>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm (or re-arm) a timer to fire `duration` after `now`.
    pub fn set_timer(&mut self, id: TimerId, duration: Duration, now: Instant) {
        self.deadlines.insert(id, now + duration);
    }

    /// Disarm a timer. Unknown ids are a no-op.
    pub fn cancel_timer(&mut self, id: &TimerId) {
        self.deadlines.remove(id);
    }

    /// Take every timer whose deadline has passed, in id order.
    ///
    /// Fired timers are disarmed; periodic work re-arms itself.
    pub fn fired_timers(&mut self, now: Instant) -> Vec<TimerId> {
        let due: Vec<TimerId> = self
            .deadlines
            .iter()
            .filter(|(_, deadline)| **deadline <= now)
            .map(|(id, _)| id.clone())
            .collect();
        for id in &due {
            self.deadlines.remove(id);
        }
        due
    }

    /// Time left until `id` fires, if it is armed. Zero once overdue.
    pub fn remaining(&self, id: &TimerId, now: Instant) -> Option<Duration> {
        self.deadlines
            .get(id)
            .map(|deadline| deadline.saturating_duration_since(now))
    }

    /// The soonest armed deadline, for sizing the main loop's sleep.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.deadlines.values().min().copied()
    }

    /// Whether any timer is armed at all.
    pub fn has_timers(&self) -> bool {
        !self.deadlines.is_empty()
    }
}

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod tests;
