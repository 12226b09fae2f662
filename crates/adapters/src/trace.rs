// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fork-trace seam for `expect` classes.
//!
//! A class with `expect = "fork"` or `expect = "daemon"` must not advance
//! past SPAWNED until the tracer reports which descendant is the effective
//! main pid. The ptrace mechanism itself is outside the supervisor core;
//! this trait is the contract the state machine relies on.

use tracing::warn;
use warden_core::ExpectMode;

/// What the tracer concluded about a spawned main process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TraceOutcome {
    /// The effective main pid after the expected forks.
    pub main_pid: u32,
    pub failed: bool,
}

/// Observes forks of a freshly spawned main process.
pub trait ForkTracer: Send + Sync {
    /// Begin tracing `pid` for the given expectation. The outcome is
    /// delivered to the engine as a trace-done input.
    fn begin(&self, pid: u32, expect: ExpectMode) -> TraceOutcome;
}

/// Pass-through tracer: reports the spawned pid unchanged.
#[derive(Debug, Clone, Default)]
pub struct NullTracer;

impl ForkTracer for NullTracer {
    fn begin(&self, pid: u32, expect: ExpectMode) -> TraceOutcome {
        if expect != ExpectMode::None {
            warn!(
                pid,
                ?expect,
                "fork counting is not implemented on this build; \
                 treating the spawned pid as the main pid"
            );
        }
        TraceOutcome {
            main_pid: pid,
            failed: false,
        }
    }
}
