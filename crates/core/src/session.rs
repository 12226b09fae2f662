// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Supervision domains.
//!
//! Events and classes may be scoped to a session: the system-wide domain
//! (`None` everywhere a session is optional) or a per-user/per-chroot one.
//! Matching requires the event and class sessions to agree.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

crate::define_index_id! {
    /// Index of a session in the core session list.
    pub struct SessionId;
}

/// A supervision domain other than the system one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub id: SessionId,
    /// Owning uid for per-user sessions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<u32>,
    /// Root path for chroot sessions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chroot: Option<PathBuf>,
}

impl Session {
    pub fn for_user(id: SessionId, user: u32) -> Self {
        Self {
            id,
            user: Some(user),
            chroot: None,
        }
    }
}
