// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use clap::Parser;
use yare::parameterized;

fn parse(argv: &[&str]) -> Cli {
    Cli::try_parse_from(argv).unwrap()
}

#[test]
fn start_with_env_and_wait_default() {
    let cli = parse(&["warden", "start", "svc", "PORT=80"]);
    match to_request(&cli.command) {
        Request::Start { name, env, wait } => {
            assert_eq!(name, "svc");
            assert_eq!(env, vec!["PORT=80".to_string()]);
            assert!(wait);
        }
        other => panic!("expected start request, got {other:?}"),
    }
}

#[test]
fn no_wait_flag_disables_waiting() {
    let cli = parse(&["warden", "stop", "svc", "--no-wait"]);
    assert!(matches!(
        to_request(&cli.command),
        Request::Stop { wait: false, .. }
    ));
}

#[test]
fn emit_defaults_to_not_waiting() {
    let cli = parse(&["warden", "emit", "deploy-done", "APP=web"]);
    match to_request(&cli.command) {
        Request::Emit { name, env, wait } => {
            assert_eq!(name, "deploy-done");
            assert_eq!(env, vec!["APP=web".to_string()]);
            assert!(!wait);
        }
        other => panic!("expected emit request, got {other:?}"),
    }
}

#[test]
fn emit_wait_flag() {
    let cli = parse(&["warden", "emit", "deploy-done", "--wait"]);
    assert!(matches!(
        to_request(&cli.command),
        Request::Emit { wait: true, .. }
    ));
}

#[parameterized(
    list = { &["warden", "list"] },
    reload = { &["warden", "reload"] },
    reexec = { &["warden", "reexec"] },
    version = { &["warden", "version"] },
    shutdown = { &["warden", "shutdown"] },
)]
fn bare_subcommands_parse(argv: &[&str]) {
    let cli = parse(argv);
    let _ = to_request(&cli.command);
}

#[test]
fn restart_maps_to_restart_request() {
    let cli = parse(&["warden", "restart", "svc"]);
    assert!(matches!(
        to_request(&cli.command),
        Request::Restart { wait: true, .. }
    ));
}

#[test]
fn socket_override_is_global() {
    let cli = parse(&["warden", "--socket", "/tmp/x.sock", "list"]);
    assert_eq!(cli.socket.as_deref(), Some(std::path::Path::new("/tmp/x.sock")));

    let cli = parse(&["warden", "list", "--socket", "/tmp/x.sock"]);
    assert_eq!(cli.socket.as_deref(), Some(std::path::Path::new("/tmp/x.sock")));
}

#[test]
fn missing_subcommand_is_an_error() {
    assert!(Cli::try_parse_from(["warden"]).is_err());
}
