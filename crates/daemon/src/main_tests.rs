// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use warden_core::JobClass;

#[test]
fn args_defaults() {
    let args = Args::try_parse_from(["wardend"]).unwrap();
    assert!(args.confdir.is_none());
    assert_eq!(args.default_console, "log");
    assert_eq!(args.startup_event, "startup");
    assert!(!args.no_log);
    assert!(!args.restart);
    assert!(args.state_fd.is_none());
}

#[test]
fn args_accept_every_documented_flag() {
    let args = Args::try_parse_from([
        "wardend",
        "--confdir",
        "/etc/warden",
        "--logdir",
        "/var/log/warden",
        "--default-console",
        "none",
        "--no-log",
        "--no-sessions",
        "--no-startup-event",
        "--restart",
        "--state-fd",
        "7",
        "--session",
        "--startup-event",
        "boot",
    ])
    .unwrap();

    assert_eq!(args.confdir.as_deref(), Some(std::path::Path::new("/etc/warden")));
    assert_eq!(args.default_console, "none");
    assert!(args.no_log && args.no_sessions && args.no_startup_event);
    assert!(args.restart && args.session);
    assert_eq!(args.state_fd, Some(7));
    assert_eq!(args.startup_event, "boot");
}

#[test]
fn state_fd_requires_restart() {
    assert!(Args::try_parse_from(["wardend", "--state-fd", "7"]).is_err());
}

#[test]
fn unknown_flag_is_rejected() {
    assert!(Args::try_parse_from(["wardend", "--bogus"]).is_err());
}

#[test]
fn reexec_args_round_trip_through_the_parser() {
    let original = Args::try_parse_from([
        "wardend",
        "--confdir",
        "/etc/warden",
        "--no-log",
        "--session",
        "--startup-event",
        "boot",
    ])
    .unwrap();

    let rebuilt: Vec<String> = reexec_args(&original, 5);
    let mut argv = vec!["wardend".to_string()];
    argv.extend(rebuilt);
    let parsed = Args::try_parse_from(argv).unwrap();

    assert_eq!(parsed.confdir, original.confdir);
    assert!(parsed.no_log);
    assert!(parsed.session);
    assert_eq!(parsed.startup_event, "boot");
    assert!(parsed.restart);
    assert_eq!(parsed.state_fd, Some(5));
}

#[test]
fn reload_input_tags_classes_with_the_session() {
    let load = LoadResult {
        classes: vec![JobClass::new(warden_core::ClassId::new(0), "svc")],
        sources: Vec::new(),
    };

    let input = reload_input(load, Some(SessionId::new(1)), None);
    match input {
        Input::Reload { classes, .. } => {
            assert_eq!(classes[0].session, Some(SessionId::new(1)));
        }
        other => panic!("expected reload input, got {other:?}"),
    }
}

#[test]
fn reload_input_leaves_system_classes_untagged() {
    let load = LoadResult {
        classes: vec![JobClass::new(warden_core::ClassId::new(0), "svc")],
        sources: Vec::new(),
    };

    match reload_input(load, None, None) {
        Input::Reload { classes, .. } => assert_eq!(classes[0].session, None),
        other => panic!("expected reload input, got {other:?}"),
    }
}
