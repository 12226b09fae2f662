// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use warden_core::EventProgress;

fn queue_with(names: &[&str]) -> (EventQueue, Vec<EventId>) {
    let mut queue = EventQueue::new();
    let ids = names
        .iter()
        .map(|name| queue.emit(*name, EnvList::new(), None))
        .collect();
    (queue, ids)
}

#[test]
fn emit_appends_pending_events_in_order() {
    let (queue, ids) = queue_with(&["a", "b", "c"]);

    let names: Vec<&str> = queue.iter_ordered().map(|e| e.name.as_str()).collect();
    assert_eq!(names, vec!["a", "b", "c"]);
    for id in ids {
        assert_eq!(queue.get(id).unwrap().progress, EventProgress::Pending);
        assert_eq!(queue.get(id).unwrap().blockers, 0);
    }
}

#[test]
fn emit_assigns_unique_ids() {
    let (_, ids) = queue_with(&["a", "a"]);
    assert_ne!(ids[0], ids[1]);
}

#[test]
fn block_and_unblock_adjust_count() {
    let (mut queue, ids) = queue_with(&["a"]);
    queue.block(ids[0]);
    queue.block(ids[0]);
    assert_eq!(queue.get(ids[0]).unwrap().blockers, 2);

    queue.unblock(ids[0]);
    assert_eq!(queue.get(ids[0]).unwrap().blockers, 1);
    queue.unblock(ids[0]);
    assert_eq!(queue.get(ids[0]).unwrap().blockers, 0);
}

#[test]
fn unblock_never_underflows() {
    let (mut queue, ids) = queue_with(&["a"]);
    queue.unblock(ids[0]);
    assert_eq!(queue.get(ids[0]).unwrap().blockers, 0);
}

#[test]
fn remove_takes_event_out_of_order() {
    let (mut queue, ids) = queue_with(&["a", "b", "c"]);
    let removed = queue.remove(ids[1]).unwrap();
    assert_eq!(removed.name, "b");

    let names: Vec<&str> = queue.iter_ordered().map(|e| e.name.as_str()).collect();
    assert_eq!(names, vec!["a", "c"]);
    assert!(queue.get(ids[1]).is_none());
    assert_eq!(queue.len(), 2);
}

#[test]
fn restore_preserves_relative_order_and_state() {
    let mut queue = EventQueue::new();
    let mut event = Event::new(EventId::new(0), "recovered", EnvList::new());
    event.progress = EventProgress::Handling;
    event.failed = true;

    let id = queue.restore(event);

    let restored = queue.get(id).unwrap();
    assert_eq!(restored.id, id);
    assert_eq!(restored.progress, EventProgress::Handling);
    assert!(restored.failed);
}

#[test]
fn session_tag_is_kept() {
    let mut queue = EventQueue::new();
    let id = queue.emit("user-event", EnvList::new(), Some(warden_core::SessionId::new(3)));
    assert_eq!(
        queue.get(id).unwrap().session,
        Some(warden_core::SessionId::new(3))
    );
}
