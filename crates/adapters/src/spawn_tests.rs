// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use warden_core::signal::SIGKILL;
use yare::parameterized;

fn request(command: &str) -> SpawnRequest {
    SpawnRequest {
        job: "svc".into(),
        process: ProcessType::Main,
        command: command.into(),
        script: false,
        env: vec!["JOB=svc".into()],
        cwd: None,
        setuid: None,
        setgid: None,
        console: ConsoleMode::None,
        oom_score_adj: None,
    }
}

#[parameterized(
    pipe = { "a | b", true },
    redirect = { "a > /dev/null", true },
    variable = { "echo $HOME", true },
    quote = { "echo 'hi'", true },
    plain = { "/bin/sleep 100", false },
    flags = { "/usr/bin/tail -f /var/log/syslog", false },
)]
fn shell_metachar_detection(command: &str, expected: bool) {
    assert_eq!(needs_shell(command), expected);
}

#[test]
fn spawn_plain_command_returns_pid() {
    let dir = tempfile::tempdir().unwrap();
    let spawner = UnixSpawner::new(dir.path().to_path_buf(), true);

    let pid = spawner.spawn(&request("/bin/sleep 5")).unwrap();
    assert!(pid > 0);

    // Clean up; ESRCH after a fast exit is mapped to Ok.
    spawner.kill(pid, SIGKILL).unwrap();
}

#[test]
fn spawn_missing_binary_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let spawner = UnixSpawner::new(dir.path().to_path_buf(), true);

    let result = spawner.spawn(&request("/no/such/binary"));
    assert!(matches!(result, Err(SpawnError::Io(_))));
}

#[test]
fn spawn_empty_command_is_error() {
    let dir = tempfile::tempdir().unwrap();
    let spawner = UnixSpawner::new(dir.path().to_path_buf(), true);

    let result = spawner.spawn(&request("   "));
    assert!(matches!(result, Err(SpawnError::Failed(_))));
}

#[test]
fn log_mode_creates_log_file() {
    let dir = tempfile::tempdir().unwrap();
    let spawner = UnixSpawner::new(dir.path().join("logs"), false);

    let mut req = request("/bin/echo hi");
    req.console = ConsoleMode::Log;
    let pid = spawner.spawn(&req).unwrap();
    assert!(pid > 0);

    assert!(dir.path().join("logs").join("svc.log").exists());
}

#[test]
fn no_log_skips_log_file() {
    let dir = tempfile::tempdir().unwrap();
    let spawner = UnixSpawner::new(dir.path().join("logs"), true);

    let mut req = request("/bin/echo hi");
    req.console = ConsoleMode::Log;
    spawner.spawn(&req).unwrap();

    assert!(!dir.path().join("logs").join("svc.log").exists());
}

#[test]
fn kill_unknown_pid_is_ok() {
    let dir = tempfile::tempdir().unwrap();
    let spawner = UnixSpawner::new(dir.path().to_path_buf(), true);

    // Pid far beyond pid_max on test systems; ESRCH maps to Ok.
    spawner.kill(3_999_999, SIGKILL).unwrap();
}

#[test]
fn kill_bad_signal_is_error() {
    let dir = tempfile::tempdir().unwrap();
    let spawner = UnixSpawner::new(dir.path().to_path_buf(), true);

    assert!(matches!(
        spawner.kill(1, 4242),
        Err(SpawnError::BadSignal(4242))
    ));
}

#[test]
fn unknown_user_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let spawner = UnixSpawner::new(dir.path().to_path_buf(), true);

    let mut req = request("/bin/true");
    req.setuid = Some("no-such-user-zz".into());
    assert!(matches!(
        spawner.spawn(&req),
        Err(SpawnError::UnknownUser(name)) if name == "no-such-user-zz"
    ));
}
