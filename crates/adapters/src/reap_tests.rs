// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use nix::unistd::Pid;

#[test]
fn exited_status_translates_to_low_byte() {
    let status = WaitStatus::Exited(Pid::from_raw(42), 3);
    assert_eq!(
        child_exit(status),
        Some(ChildExit {
            pid: 42,
            status: 3,
        })
    );
}

#[test]
fn signaled_status_translates_to_high_byte() {
    let status = WaitStatus::Signaled(Pid::from_raw(42), nix::sys::signal::Signal::SIGKILL, false);
    let exit = child_exit(status).unwrap();
    assert_eq!(exit.pid, 42);
    assert_eq!(warden_core::signal::wait_signal(exit.status), Some(9));
}

#[test]
fn stop_notifications_are_not_exits() {
    let status = WaitStatus::Stopped(Pid::from_raw(42), nix::sys::signal::Signal::SIGSTOP);
    assert_eq!(child_exit(status), None);
}

#[test]
fn drain_collects_a_real_child_exit() {
    let child = std::process::Command::new("/bin/true")
        .spawn()
        .unwrap();
    let pid = child.id();
    drop(child);

    let deadline = std::time::Instant::now() + std::time::Duration::from_secs(5);
    loop {
        let exits = drain_exits();
        if let Some(exit) = exits.iter().find(|e| e.pid == pid) {
            assert_eq!(exit.status, 0);
            break;
        }
        assert!(
            std::time::Instant::now() < deadline,
            "child {pid} was never reaped"
        );
        std::thread::sleep(std::time::Duration::from_millis(10));
    }
}
