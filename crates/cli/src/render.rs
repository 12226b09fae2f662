// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Human-readable rendering of daemon responses.

use warden_daemon::protocol::Response;

/// One status line per instance: `name (inst) goal/state, process 1234`.
fn job_line(class: &str, instance: &str, goal: &str, state: &str, pids: &[(String, u32)]) -> String {
    let mut line = if instance.is_empty() {
        format!("{class} {goal}/{state}")
    } else {
        format!("{class} ({instance}) {goal}/{state}")
    };
    for (process, pid) in pids {
        if process == "main" {
            line.push_str(&format!(", process {pid}"));
        } else {
            line.push_str(&format!(", {process} process {pid}"));
        }
    }
    line
}

/// Render a successful response as output lines.
pub fn render(command: &crate::Command, response: &Response) -> Vec<String> {
    match response {
        Response::Pong => vec!["pong".into()],
        Response::Version { version } => vec![format!(
            "warden {}, wardend {version}",
            env!("CARGO_PKG_VERSION")
        )],
        Response::Ok => Vec::new(),
        Response::Started { job } => {
            let name = command_target(command).unwrap_or_default();
            let pids: Vec<(String, u32)> = job
                .pids
                .iter()
                .map(|p| (p.process.clone(), p.pid))
                .collect();
            vec![job_line(&name, &job.instance, &job.goal, &job.state, &pids)]
        }
        Response::Stopped { job } => vec![format!("{job} stopped")],
        Response::Status { class } => render_class(class),
        Response::List { classes } => {
            let mut lines = Vec::new();
            for class in classes {
                lines.extend(render_class(class));
            }
            lines
        }
        Response::EventFinished { name } => vec![format!("{name} finished")],
        Response::Restarting => vec!["daemon restarting".into()],
        Response::ShuttingDown => vec!["daemon shutting down".into()],
        // Handled by the caller before rendering.
        Response::Error { error } => vec![error.to_string()],
        Response::Failed { message } => vec![message.clone()],
    }
}

fn render_class(class: &warden_daemon::protocol::ClassView) -> Vec<String> {
    if class.instances.is_empty() {
        let marker = if class.deleted { " (deleted)" } else { "" };
        return vec![format!("{} stop/waiting{marker}", class.name)];
    }
    class
        .instances
        .iter()
        .map(|job| {
            let pids: Vec<(String, u32)> = job
                .pids
                .iter()
                .map(|p| (p.process.clone(), p.pid))
                .collect();
            job_line(&class.name, &job.instance, &job.goal, &job.state, &pids)
        })
        .collect()
}

fn command_target(command: &crate::Command) -> Option<String> {
    match command {
        crate::Command::Start { name, .. }
        | crate::Command::Stop { name, .. }
        | crate::Command::Restart { name, .. }
        | crate::Command::Status { name }
        | crate::Command::Emit { name, .. } => Some(name.clone()),
        _ => None,
    }
}

#[cfg(test)]
#[path = "render_tests.rs"]
mod tests;
