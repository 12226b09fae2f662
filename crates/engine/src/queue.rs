// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The event queue.
//!
//! Events live in an arena keyed by id; a separate list preserves insertion
//! order, which the poll loop and the re-exec snapshot both rely on. The
//! queue only manages storage and blocker counts; the three-phase poll that
//! drives events through their lifecycle lives on [`crate::Core`].

use tracing::{debug, error};
use warden_core::{EnvList, Event, EventId, IdAlloc, SessionId};
use std::collections::HashMap;

/// Ordered arena of live events.
#[derive(Debug, Default)]
pub struct EventQueue {
    ids: IdAlloc,
    order: Vec<EventId>,
    events: HashMap<EventId, Event>,
    /// Every event ever emitted, for test assertions on sequences.
    #[cfg(test)]
    pub(crate) emitted: Vec<Event>,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a new PENDING event and return its id.
    pub fn emit(
        &mut self,
        name: impl Into<String>,
        env: EnvList,
        session: Option<SessionId>,
    ) -> EventId {
        let id = EventId::new(self.ids.next());
        let mut event = Event::new(id, name, env);
        event.session = session;
        debug!(event = %event.log_summary(), "queued");
        self.order.push(id);
        #[cfg(test)]
        self.emitted.push(event.clone());
        self.events.insert(id, event);
        id
    }

    /// Re-insert a restored event, preserving its queue position.
    pub(crate) fn restore(&mut self, event: Event) -> EventId {
        let id = EventId::new(self.ids.next());
        let mut event = event;
        event.id = id;
        self.order.push(id);
        self.events.insert(id, event);
        id
    }

    pub fn get(&self, id: EventId) -> Option<&Event> {
        self.events.get(&id)
    }

    pub fn get_mut(&mut self, id: EventId) -> Option<&mut Event> {
        self.events.get_mut(&id)
    }

    /// Hold the event open: it cannot finish while blocked.
    pub fn block(&mut self, id: EventId) {
        if let Some(event) = self.events.get_mut(&id) {
            event.blockers += 1;
        }
    }

    /// Release one hold on the event.
    pub fn unblock(&mut self, id: EventId) {
        match self.events.get_mut(&id) {
            Some(event) if event.blockers > 0 => event.blockers -= 1,
            Some(event) => {
                // Underflow means the blocker discipline was broken somewhere.
                error!(event = %event.name, "unblock with no blockers held");
            }
            None => error!(event = %id, "unblock of unknown event"),
        }
    }

    /// Remove a finished event from the queue entirely.
    pub fn remove(&mut self, id: EventId) -> Option<Event> {
        self.order.retain(|e| *e != id);
        self.events.remove(&id)
    }

    /// Event ids in queue order.
    pub fn ordered_ids(&self) -> Vec<EventId> {
        self.order.clone()
    }

    /// Events in queue order.
    pub fn iter_ordered(&self) -> impl Iterator<Item = &Event> {
        self.order.iter().filter_map(|id| self.events.get(id))
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

#[cfg(test)]
#[path = "queue_tests.rs"]
mod tests;
