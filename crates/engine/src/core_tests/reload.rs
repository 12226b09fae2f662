// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Reload reconciliation with live instances.

use super::Harness;
use warden_core::JobState;

const OLD: &str = r#"
[job.svc]
exec = "/bin/sleep 100"
"#;

const NEW: &str = r#"
[job.svc]
exec = "/bin/sleep 200"
"#;

#[test]
fn unchanged_reload_keeps_running_instances() {
    let mut h = Harness::new();
    h.load(OLD);
    h.start("svc", false);

    h.load(OLD);

    assert_eq!(h.instance_count("svc"), 1);
    assert_eq!(h.job("svc", "").unwrap().state, JobState::Running);
}

#[test]
fn changed_definition_shadows_but_keeps_the_old_instance() {
    let mut h = Harness::new();
    h.load(OLD);
    h.start("svc", false);
    let pid = h.spawner.last_pid().unwrap();

    h.load(NEW);

    // The new definition is visible; the old one survives, deleted, with
    // its running instance.
    let visible = h.core.registry.visible("svc", None).unwrap();
    assert!(!h.core.registry.get(visible).unwrap().deleted);
    assert!(h.core.registry.get(visible).unwrap().instances.is_empty());

    let old_class = h
        .core
        .registry
        .iter()
        .find(|class| class.deleted)
        .unwrap();
    assert_eq!(old_class.instances.len(), 1);

    // Stopping the old instance destroys the shadowed class.
    let job_id = *old_class.instances.values().next().unwrap();
    let old_class_id = old_class.id;
    h.stop("svc", false); // resolves against the NEW class: no instance
    assert!(h.core.registry.get(old_class_id).is_some());

    // Drive the old instance down via its class directly.
    let spawner = h.spawner.clone();
    let mut effects = Vec::new();
    h.core
        .change_goal(job_id, warden_core::Goal::Stop, &spawner, &mut effects);
    h.child_exit(pid, warden_core::signal::encode_signaled(15));

    assert!(h.core.registry.get(old_class_id).is_none());
    assert_eq!(h.instance_count("svc"), 0);
}

#[test]
fn dropped_definition_is_deleted_until_unused() {
    let mut h = Harness::new();
    h.load(OLD);
    h.start("svc", false);
    let pid = h.spawner.last_pid().unwrap();

    // Empty configuration: svc vanished.
    h.load("");

    assert!(h.core.registry.visible("svc", None).is_none());
    let class = h.core.registry.iter().find(|c| c.name == "svc").unwrap();
    assert!(class.deleted);

    // Its instance still stop-matches and winds down normally.
    let job_id = *class.instances.values().next().unwrap();
    let spawner = h.spawner.clone();
    let mut effects = Vec::new();
    h.core
        .change_goal(job_id, warden_core::Goal::Stop, &spawner, &mut effects);
    let mut drain = Vec::new();
    h.core.event_poll(&spawner, &mut drain);
    h.child_exit(pid, warden_core::signal::encode_signaled(15));

    assert!(h.core.registry.iter().all(|c| c.name != "svc"));
}

#[test]
fn deleted_class_instances_still_stop_match() {
    let mut h = Harness::new();
    h.load(
        r#"
[job.svc]
exec = "/bin/sleep 100"
stop_on = "shutdown"
"#,
    );
    h.start("svc", false);
    let pid = h.spawner.last_pid().unwrap();

    h.load("");
    h.emit("shutdown");

    // The orphaned instance reacted to its stop event.
    assert_eq!(
        h.core.jobs.values().next().unwrap().state,
        JobState::Killed
    );
    h.child_exit(pid, warden_core::signal::encode_signaled(15));
    assert!(h.core.jobs.is_empty());
    assert!(h.core.registry.iter().all(|c| c.name != "svc"));
}
