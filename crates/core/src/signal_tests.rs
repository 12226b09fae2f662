// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

#[parameterized(
    term = { "TERM", 15 },
    sig_prefixed = { "SIGTERM", 15 },
    lowercase = { "kill", 9 },
    hup = { "HUP", 1 },
    usr2 = { "USR2", 12 },
)]
fn name_to_number(name: &str, expected: i32) {
    assert_eq!(signal_from_name(name), Some(expected));
}

#[test]
fn unknown_name_is_none() {
    assert_eq!(signal_from_name("NOPE"), None);
}

#[parameterized(
    term = { 15, "TERM" },
    kill = { 9, "KILL" },
    segv = { 11, "SEGV" },
)]
fn number_to_name(num: i32, expected: &str) {
    assert_eq!(signal_name(num), Some(expected));
}

#[test]
fn unknown_number_is_none() {
    assert_eq!(signal_name(200), None);
}

#[test]
fn normal_exit_round_trips() {
    let status = encode_exited(3);
    assert_eq!(wait_code(status), 3);
    assert_eq!(wait_signal(status), None);
}

#[test]
fn signal_death_round_trips() {
    let status = encode_signaled(11);
    assert_eq!(wait_signal(status), Some(11));
}

#[test]
fn zero_status_is_clean_exit() {
    assert_eq!(wait_code(0), 0);
    assert_eq!(wait_signal(0), None);
}
