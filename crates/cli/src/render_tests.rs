// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::Command;
use warden_daemon::protocol::{ClassView, JobView, ProcessView};

fn running_job(instance: &str, pid: u32) -> JobView {
    JobView {
        instance: instance.to_string(),
        goal: "start".into(),
        state: "running".into(),
        pids: vec![ProcessView {
            process: "main".into(),
            pid,
        }],
        failed: false,
        respawn_count: 0,
    }
}

#[test]
fn started_reply_renders_like_a_status_line() {
    let command = Command::Start {
        name: "svc".into(),
        env: Vec::new(),
        no_wait: false,
    };
    let response = Response::Started {
        job: running_job("", 1234),
    };
    assert_eq!(render(&command, &response), vec!["svc start/running, process 1234"]);
}

#[test]
fn instances_are_named_in_parentheses() {
    let command = Command::Status { name: "worker".into() };
    let response = Response::Status {
        class: ClassView {
            name: "worker".into(),
            description: None,
            task: false,
            deleted: false,
            instances: vec![running_job("a", 10), running_job("b", 11)],
        },
    };
    assert_eq!(
        render(&command, &response),
        vec![
            "worker (a) start/running, process 10",
            "worker (b) start/running, process 11",
        ]
    );
}

#[test]
fn idle_class_shows_rest_state() {
    let command = Command::List;
    let response = Response::List {
        classes: vec![ClassView {
            name: "idle".into(),
            description: None,
            task: true,
            deleted: false,
            instances: Vec::new(),
        }],
    };
    assert_eq!(render(&command, &response), vec!["idle stop/waiting"]);
}

#[test]
fn deleted_class_is_marked() {
    let command = Command::List;
    let response = Response::List {
        classes: vec![ClassView {
            name: "gone".into(),
            description: None,
            task: false,
            deleted: true,
            instances: Vec::new(),
        }],
    };
    assert_eq!(render(&command, &response), vec!["gone stop/waiting (deleted)"]);
}

#[test]
fn hook_pids_are_labelled() {
    let command = Command::Status { name: "svc".into() };
    let mut job = running_job("", 1);
    job.state = "pre-start".into();
    job.pids = vec![ProcessView {
        process: "pre-start".into(),
        pid: 99,
    }];
    let response = Response::Status {
        class: ClassView {
            name: "svc".into(),
            description: None,
            task: false,
            deleted: false,
            instances: vec![job],
        },
    };
    assert_eq!(
        render(&command, &response),
        vec!["svc start/pre-start, pre-start process 99"]
    );
}

#[test]
fn ok_renders_nothing() {
    let command = Command::Reload;
    assert!(render(&command, &Response::Ok).is_empty());
}

#[test]
fn stopped_and_event_replies_render_plainly() {
    let command = Command::Stop {
        name: "svc".into(),
        env: Vec::new(),
        no_wait: false,
    };
    assert_eq!(
        render(&command, &Response::Stopped { job: "svc".into() }),
        vec!["svc stopped"]
    );
    let command = Command::Emit {
        name: "boom".into(),
        env: Vec::new(),
        wait: true,
    };
    assert_eq!(
        render(&command, &Response::EventFinished { name: "boom".into() }),
        vec!["boom finished"]
    );
}
