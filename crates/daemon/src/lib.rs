// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Warden daemon library.
//!
//! The `wardend` binary lives in `main.rs`; this library exposes the wire
//! protocol and path conventions so the `warden` CLI can speak to a running
//! daemon.

pub mod lifecycle;
pub mod protocol;

pub use lifecycle::{Config, LifecycleError};
pub use protocol::{Request, Response};
