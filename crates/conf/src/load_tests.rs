// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::def::JobDef;
use crate::parse::{parse_conf, Format};
use warden_core::{ExpectMode, NormalExit, ProcessType};

fn def_from_toml(toml: &str) -> JobDef {
    let conf = parse_conf(toml, Format::Toml).unwrap();
    conf.jobs.into_iter().next().map(|(_, def)| def).unwrap()
}

#[test]
fn builds_minimal_class() {
    let def = def_from_toml(
        r#"
[job.hello]
exec = "/bin/true"
task = true
"#,
    );
    let class = build_class(&def, None).unwrap();

    assert_eq!(class.name, "hello");
    assert!(class.task);
    assert!(class.is_singleton());
    assert_eq!(
        class.processes.get(ProcessType::Main).map(|c| c.command.as_str()),
        Some("/bin/true")
    );
    assert!(class.start_on.is_none());
}

#[test]
fn builds_policy_fields() {
    let def = def_from_toml(
        r#"
[job.web]
exec = "/usr/sbin/httpd"
instance = "$PORT"
start_on = "net-up IFACE=eth0"
expect = "daemon"
kill_signal = "USR1"
kill_timeout = 30
normal_exit = [1, "HUP"]
umask = "022"
respawn = { limit = 3, interval = 60 }
[job.web.env]
PORT = "80"
"#,
    );
    let class = build_class(&def, Some(std::path::Path::new("/etc/warden/web.toml"))).unwrap();

    assert_eq!(class.instance, "$PORT");
    assert!(class.start_on.is_some());
    assert_eq!(class.expect, ExpectMode::Daemon);
    assert_eq!(class.kill_signal, 10); // USR1
    assert_eq!(class.kill_timeout, Duration::from_secs(30));
    assert_eq!(
        class.normal_exit,
        vec![NormalExit::Status(1), NormalExit::Signal(1)]
    );
    assert_eq!(class.umask, Some(0o022));
    assert!(class.respawn.enabled);
    assert_eq!(class.respawn.limit, 3);
    assert_eq!(class.env.get("PORT"), Some("80"));
    assert_eq!(
        class.source.as_deref(),
        Some(std::path::Path::new("/etc/warden/web.toml"))
    );
}

#[test]
fn rejects_unknown_signal() {
    let def = def_from_toml(
        r#"
[job.x]
exec = "/bin/x"
kill_signal = "NOPE"
"#,
    );
    assert!(matches!(
        build_class(&def, None),
        Err(ConfError::Invalid { field: "kill_signal", .. })
    ));
}

#[test]
fn rejects_bad_start_on() {
    let def = def_from_toml(
        r#"
[job.x]
exec = "/bin/x"
start_on = "a and"
"#,
    );
    assert!(matches!(
        build_class(&def, None),
        Err(ConfError::On { field: "start_on", .. })
    ));
}

#[test]
fn rejects_bad_umask() {
    let def = def_from_toml(
        r#"
[job.x]
exec = "/bin/x"
umask = "99"
"#,
    );
    assert!(matches!(
        build_class(&def, None),
        Err(ConfError::Invalid { field: "umask", .. })
    ));
}

#[test]
fn load_dir_reads_sorted_files() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("b.toml"),
        "[job.beta]\nexec = \"/bin/b\"\n",
    )
    .unwrap();
    std::fs::write(
        dir.path().join("a.toml"),
        "[job.alpha]\nexec = \"/bin/a\"\n",
    )
    .unwrap();
    std::fs::write(dir.path().join("ignored.txt"), "not a job file").unwrap();

    let result = load_dir(dir.path()).unwrap();

    let names: Vec<&str> = result.classes.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["alpha", "beta"]);
    assert_eq!(result.sources.len(), 2);
}

#[test]
fn load_dir_later_file_overrides() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("10-base.toml"), "[job.svc]\nexec = \"/bin/old\"\n").unwrap();
    std::fs::write(
        dir.path().join("20-override.toml"),
        "[job.svc]\nexec = \"/bin/new\"\n",
    )
    .unwrap();

    let result = load_dir(dir.path()).unwrap();

    assert_eq!(result.classes.len(), 1);
    assert_eq!(
        result.classes[0]
            .processes
            .get(ProcessType::Main)
            .map(|c| c.command.as_str()),
        Some("/bin/new")
    );
}

#[test]
fn load_dir_missing_directory_is_empty() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("no-such-dir");
    let result = load_dir(&missing).unwrap();
    assert!(result.classes.is_empty());
    assert!(result.sources.is_empty());
}

#[test]
fn digests_change_with_content() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("svc.toml");
    std::fs::write(&path, "[job.svc]\nexec = \"/bin/one\"\n").unwrap();
    let first = load_dir(dir.path()).unwrap();

    std::fs::write(&path, "[job.svc]\nexec = \"/bin/two\"\n").unwrap();
    let second = load_dir(dir.path()).unwrap();

    assert!(!second.same_sources(&first.sources));

    let third = load_dir(dir.path()).unwrap();
    assert!(third.same_sources(&second.sources));
}

#[test]
fn load_dir_surfaces_parse_errors_with_path() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("bad.toml"), "not [valid toml").unwrap();

    match load_dir(dir.path()) {
        Err(ConfError::Parse { path, .. }) => {
            assert!(path.ends_with("bad.toml"));
        }
        other => panic!("expected parse error, got {other:?}"),
    }
}
