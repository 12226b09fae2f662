// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Timer identifier type for tracking scheduled timers.
//!
//! Timer ids are structured strings so the owner can be recovered from the
//! id alone when a timer fires.

use crate::job::JobId;

crate::define_id! {
    /// Unique identifier for a timer instance.
    pub struct TimerId;
}

impl TimerId {
    /// Timer ID for the kill-timeout escalation of a job's main process.
    pub fn kill(job_id: JobId) -> Self {
        Self::new(format!("kill:{}", job_id))
    }

    /// Returns true if this is a kill timer.
    pub fn is_kill(&self) -> bool {
        self.0.starts_with("kill:")
    }

    /// Extracts the job id if this is a kill timer.
    pub fn kill_job_id(&self) -> Option<JobId> {
        self.0
            .strip_prefix("kill:")
            .and_then(|rest| rest.parse::<u64>().ok())
            .map(JobId::new)
    }
}

#[cfg(test)]
#[path = "timer_tests.rs"]
mod tests;
