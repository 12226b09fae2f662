// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use warden_core::{JobId, ProcessCommand, ProcessType};

fn template(name: &str) -> JobClass {
    let mut class = JobClass::new(ClassId::new(0), name);
    class
        .processes
        .set(ProcessType::Main, ProcessCommand::exec("/bin/svc"));
    class
}

#[test]
fn install_makes_class_visible() {
    let mut registry = ClassRegistry::new();
    let id = registry.install(template("svc"));
    assert_eq!(registry.visible("svc", None), Some(id));
    assert!(!registry.get(id).unwrap().deleted);
}

#[test]
fn unknown_name_is_not_visible() {
    let registry = ClassRegistry::new();
    assert_eq!(registry.visible("nope", None), None);
}

#[test]
fn reinstall_without_instances_replaces_outright() {
    let mut registry = ClassRegistry::new();
    let old = registry.install(template("svc"));
    let new = registry.install(template("svc"));

    assert_eq!(registry.visible("svc", None), Some(new));
    assert!(registry.get(old).is_none());
    assert_eq!(registry.len(), 1);
}

#[test]
fn reinstall_with_instances_keeps_deleted_shadow() {
    let mut registry = ClassRegistry::new();
    let old = registry.install(template("svc"));
    registry
        .get_mut(old)
        .unwrap()
        .instances
        .insert(String::new(), JobId::new(1));

    let new = registry.install(template("svc"));

    assert_eq!(registry.visible("svc", None), Some(new));
    assert!(registry.get(old).unwrap().deleted);
    assert_eq!(registry.len(), 2);
}

#[test]
fn reconsider_destroys_deleted_empty_class() {
    let mut registry = ClassRegistry::new();
    let old = registry.install(template("svc"));
    registry
        .get_mut(old)
        .unwrap()
        .instances
        .insert(String::new(), JobId::new(1));
    let new = registry.install(template("svc"));

    // Not yet: the shadow still has an instance.
    assert!(!registry.reconsider(old));

    registry.get_mut(old).unwrap().instances.clear();
    assert!(registry.reconsider(old));
    assert!(registry.get(old).is_none());
    assert_eq!(registry.visible("svc", None), Some(new));
}

#[test]
fn reconsider_keeps_live_classes() {
    let mut registry = ClassRegistry::new();
    let id = registry.install(template("svc"));
    assert!(!registry.reconsider(id));
    assert!(registry.get(id).is_some());
}

#[test]
fn reload_keeps_unchanged_definitions() {
    let mut registry = ClassRegistry::new();
    let id = registry.install(template("svc"));
    registry
        .get_mut(id)
        .unwrap()
        .instances
        .insert(String::new(), JobId::new(1));

    registry.reload(vec![template("svc")]);

    // Same definition: the class object survives, instances intact.
    assert_eq!(registry.visible("svc", None), Some(id));
    assert_eq!(registry.len(), 1);
    assert!(!registry.get(id).unwrap().instances.is_empty());
}

#[test]
fn reload_installs_changed_definitions() {
    let mut registry = ClassRegistry::new();
    let old = registry.install(template("svc"));
    registry
        .get_mut(old)
        .unwrap()
        .instances
        .insert(String::new(), JobId::new(1));

    let mut changed = template("svc");
    changed.task = true;
    registry.reload(vec![changed]);

    let new = registry.visible("svc", None).unwrap();
    assert_ne!(new, old);
    assert!(registry.get(new).unwrap().task);
    assert!(registry.get(old).unwrap().deleted);
}

#[test]
fn reload_drops_vanished_definitions() {
    let mut registry = ClassRegistry::new();
    let going = registry.install(template("old"));
    registry.install(template("kept"));

    registry.reload(vec![template("kept")]);

    assert!(registry.get(going).is_none());
    assert_eq!(registry.visible("old", None), None);
    assert!(registry.visible("kept", None).is_some());
}

#[test]
fn reload_marks_vanished_class_with_instances_deleted() {
    let mut registry = ClassRegistry::new();
    let going = registry.install(template("old"));
    registry
        .get_mut(going)
        .unwrap()
        .instances
        .insert(String::new(), JobId::new(1));

    registry.reload(vec![]);

    assert!(registry.get(going).unwrap().deleted);
    assert_eq!(registry.visible("old", None), None);
}

#[test]
fn session_class_shadows_system_class_in_its_session() {
    use warden_core::SessionId;

    let mut registry = ClassRegistry::new();
    let system = registry.install(template("svc"));
    let mut scoped = template("svc");
    scoped.session = Some(SessionId::new(1));
    let session_class = registry.install(scoped);

    assert_eq!(
        registry.visible("svc", Some(SessionId::new(1))),
        Some(session_class)
    );
    assert_eq!(registry.visible("svc", Some(SessionId::new(2))), Some(system));
    assert_eq!(registry.visible("svc", None), Some(system));
}

#[test]
fn ids_are_name_ordered() {
    let mut registry = ClassRegistry::new();
    registry.install(template("zeta"));
    registry.install(template("alpha"));

    let names: Vec<String> = registry
        .ids()
        .into_iter()
        .filter_map(|id| registry.get(id).map(|c| c.name.clone()))
        .collect();
    assert_eq!(names, vec!["alpha", "zeta"]);
}
