// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Signal names and wait-status encoding.
//!
//! Exit statuses are carried in the classic `wait()` encoding so they can be
//! stored in a single integer, snapshotted, and turned into event variables:
//! a normal exit keeps its code in the low byte; a signal death keeps the
//! signal number in the high byte.

/// Signal numbers the supervisor knows by name (Linux numbering).
const SIGNALS: &[(&str, i32)] = &[
    ("HUP", 1),
    ("INT", 2),
    ("QUIT", 3),
    ("ILL", 4),
    ("TRAP", 5),
    ("ABRT", 6),
    ("BUS", 7),
    ("FPE", 8),
    ("KILL", 9),
    ("USR1", 10),
    ("SEGV", 11),
    ("USR2", 12),
    ("PIPE", 13),
    ("ALRM", 14),
    ("TERM", 15),
    ("CHLD", 17),
    ("CONT", 18),
    ("STOP", 19),
    ("TSTP", 20),
    ("TTIN", 21),
    ("TTOU", 22),
    ("XCPU", 24),
    ("XFSZ", 25),
    ("VTALRM", 26),
    ("PROF", 27),
    ("WINCH", 28),
    ("IO", 29),
    ("PWR", 30),
    ("SYS", 31),
];

/// Default signal used to stop jobs.
pub const SIGTERM: i32 = 15;

/// Signal of last resort when the kill timeout expires.
pub const SIGKILL: i32 = 9;

/// Look up a signal number by name; accepts both `TERM` and `SIGTERM`.
pub fn signal_from_name(name: &str) -> Option<i32> {
    let name = name.strip_prefix("SIG").unwrap_or(name);
    SIGNALS
        .iter()
        .find(|(n, _)| n.eq_ignore_ascii_case(name))
        .map(|(_, num)| *num)
}

/// Look up a signal name (without the `SIG` prefix) by number.
pub fn signal_name(num: i32) -> Option<&'static str> {
    SIGNALS.iter().find(|(_, n)| *n == num).map(|(name, _)| *name)
}

/// Encode a normal exit with the given code.
pub fn encode_exited(code: i32) -> i32 {
    code & 0xff
}

/// Encode a death by signal.
pub fn encode_signaled(signal: i32) -> i32 {
    (signal & 0xff) << 8
}

/// Signal number if the status records a death by signal.
pub fn wait_signal(status: i32) -> Option<i32> {
    let signal = (status >> 8) & 0xff;
    (signal != 0).then_some(signal)
}

/// Exit code (low byte) for a normal exit.
pub fn wait_code(status: i32) -> i32 {
    status & 0xff
}

#[cfg(test)]
#[path = "signal_tests.rs"]
mod tests;
