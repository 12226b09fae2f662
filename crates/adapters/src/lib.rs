// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Process-facing collaborators for the Warden supervisor.
//!
//! The engine core is synchronous and IO-free; everything that touches real
//! processes lives here behind small traits so tests can swap in fakes.

#[cfg(any(test, feature = "test-support"))]
pub mod fake;
pub mod reap;
pub mod spawn;
pub mod trace;

#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeSpawner, FakeTracer, SpawnRecord};
pub use reap::{drain_exits, run_reaper, ChildExit};
pub use spawn::{ProcessSpawner, SpawnError, SpawnRequest, UnixSpawner};
pub use trace::{ForkTracer, NullTracer, TraceOutcome};
