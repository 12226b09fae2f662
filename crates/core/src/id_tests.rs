// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

crate::define_index_id! {
    pub struct TestId;
}

#[test]
fn index_id_display_and_value() {
    let id = TestId::new(42);
    assert_eq!(id.to_string(), "42");
    assert_eq!(id.as_u64(), 42);
}

#[test]
fn index_id_serde_is_transparent() {
    let id = TestId::new(7);
    let json = serde_json::to_string(&id).unwrap();
    assert_eq!(json, "7");
    let parsed: TestId = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, id);
}

#[test]
fn index_id_orders_by_value() {
    assert!(TestId::new(1) < TestId::new(2));
}

#[test]
fn alloc_is_monotonic() {
    let mut alloc = IdAlloc::new();
    assert_eq!(alloc.next(), 0);
    assert_eq!(alloc.next(), 1);
    assert_eq!(alloc.next(), 2);
}

#[test]
fn alloc_resumes_after_high_water_mark() {
    let mut alloc = IdAlloc::starting_after(9);
    assert_eq!(alloc.next(), 10);
}

#[test]
fn alloc_serde_round_trip() {
    let mut alloc = IdAlloc::new();
    alloc.next();
    alloc.next();
    let json = serde_json::to_string(&alloc).unwrap();
    let mut restored: IdAlloc = serde_json::from_str(&json).unwrap();
    assert_eq!(restored.next(), 2);
}
