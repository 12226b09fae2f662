// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Blocked records: "X is waiting on Y".
//!
//! A `Blocked` lives in exactly one blocking list. Events keep the jobs and
//! replies they must wake on completion; jobs keep the events and replies
//! they must release when their transition settles.

use crate::event::EventId;
use crate::job::JobId;
use serde::{Deserialize, Serialize};

crate::define_index_id! {
    /// Handle for a pending control-connection reply.
    ///
    /// The daemon maps tokens to live connections; the core only threads
    /// them through blocking lists. Tokens do not survive a re-exec.
    pub struct ReplyToken;
}

/// One entry in a blocking list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Blocked {
    /// A job waiting for an event to finish.
    Job { job: JobId },
    /// An event held open until a job transition settles.
    Event { event: EventId },
    /// A `start --wait` caller.
    StartReply { reply: ReplyToken },
    /// A `stop --wait` caller.
    StopReply { reply: ReplyToken },
    /// A `restart --wait` caller.
    RestartReply { reply: ReplyToken },
}

impl Blocked {
    /// The reply token, for the RPC variants.
    pub fn reply(&self) -> Option<ReplyToken> {
        match self {
            Blocked::StartReply { reply }
            | Blocked::StopReply { reply }
            | Blocked::RestartReply { reply } => Some(*reply),
            Blocked::Job { .. } | Blocked::Event { .. } => None,
        }
    }

    /// Whether this record references the given event.
    pub fn references_event(&self, id: EventId) -> bool {
        matches!(self, Blocked::Event { event } if *event == id)
    }
}

#[cfg(test)]
#[path = "blocked_tests.rs"]
mod tests;
