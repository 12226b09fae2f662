// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! warden: control client for the Warden supervisor.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod client;
mod render;

use anyhow::{anyhow, bail};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use warden_daemon::lifecycle;
use warden_daemon::protocol::{Request, Response};

#[derive(Parser, Debug)]
#[command(name = "warden", version, about = "Control the Warden supervisor")]
struct Cli {
    /// Control socket path (defaults to the running daemon's)
    #[arg(long, value_name = "PATH", global = true)]
    socket: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start a job
    Start {
        /// Job name
        name: String,
        /// KEY=VALUE environment entries for this start
        env: Vec<String>,
        /// Return immediately instead of waiting for the job to start
        #[arg(long)]
        no_wait: bool,
    },
    /// Stop a job
    Stop {
        name: String,
        env: Vec<String>,
        #[arg(long)]
        no_wait: bool,
    },
    /// Restart a job
    Restart {
        name: String,
        env: Vec<String>,
        #[arg(long)]
        no_wait: bool,
    },
    /// Show one job's goal, state, and processes
    Status { name: String },
    /// List all jobs
    List,
    /// Emit an event
    Emit {
        /// Event name
        name: String,
        /// KEY=VALUE environment entries for the event
        env: Vec<String>,
        /// Wait for every listener to finish handling the event
        #[arg(long)]
        wait: bool,
    },
    /// Reload the job configuration directory
    Reload,
    /// Re-exec the daemon, carrying all state across
    Reexec,
    /// Show client and daemon versions
    Version,
    /// Stop the daemon
    Shutdown,
}

fn to_request(command: &Command) -> Request {
    match command {
        Command::Start { name, env, no_wait } => Request::Start {
            name: name.clone(),
            env: env.clone(),
            wait: !no_wait,
        },
        Command::Stop { name, env, no_wait } => Request::Stop {
            name: name.clone(),
            env: env.clone(),
            wait: !no_wait,
        },
        Command::Restart { name, env, no_wait } => Request::Restart {
            name: name.clone(),
            env: env.clone(),
            wait: !no_wait,
        },
        Command::Status { name } => Request::Status { name: name.clone() },
        Command::List => Request::List,
        Command::Emit { name, env, wait } => Request::Emit {
            name: name.clone(),
            env: env.clone(),
            wait: *wait,
        },
        Command::Reload => Request::ReloadConf,
        Command::Reexec => Request::ReExec,
        Command::Version => Request::Version,
        Command::Shutdown => Request::Shutdown,
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let socket = match cli.socket {
        Some(path) => path,
        None => lifecycle::socket_path().map_err(|e| anyhow!("{e}"))?,
    };

    let request = to_request(&cli.command);
    let response = client::request(&socket, request).await?;

    match response {
        Response::Error { error } => bail!("{error}"),
        Response::Failed { message } => bail!("{message}"),
        other => {
            for line in render::render(&cli.command, &other) {
                println!("{line}");
            }
            Ok(())
        }
    }
}

#[cfg(test)]
#[path = "main_tests.rs"]
mod tests;
