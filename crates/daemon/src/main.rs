// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Warden daemon (wardend)
//!
//! The supervisor process: owns the engine core and drives it from a
//! single loop over control commands, reaped children, timers and signals.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod lifecycle;
mod listener;
mod protocol;
mod watcher;

use std::collections::VecDeque;
use std::io::{Seek, SeekFrom, Write};
use std::os::fd::{AsRawFd, RawFd};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::net::UnixListener;
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::lifecycle::{Config, LifecycleError};
use crate::listener::{DaemonCmd, ListenCtx, Replies};
use crate::protocol::Response;
use warden_adapters::{run_reaper, ForkTracer, NullTracer, UnixSpawner};
use warden_conf::LoadResult;
use warden_core::{ReplyToken, SessionId};
use warden_engine::{Core, Effect, Input, Snapshot};

#[derive(Parser, Debug, Clone)]
#[command(name = "wardend", version, about = "Warden service supervisor daemon")]
struct Args {
    /// Directory holding job definitions
    #[arg(long, value_name = "DIR")]
    confdir: Option<PathBuf>,

    /// Directory for the daemon log and per-job logs
    #[arg(long, value_name = "DIR")]
    logdir: Option<PathBuf>,

    /// Default console mode for jobs: log, none, or output
    #[arg(long, value_name = "VALUE", default_value = "log")]
    default_console: String,

    /// Discard job output instead of writing log files
    #[arg(long)]
    no_log: bool,

    /// Disable per-user sessions
    #[arg(long)]
    no_sessions: bool,

    /// Do not emit the startup event
    #[arg(long)]
    no_startup_event: bool,

    /// We were re-exec'd by a previous instance
    #[arg(long)]
    restart: bool,

    /// Read serialised state from this file descriptor
    #[arg(long, value_name = "N", requires = "restart")]
    state_fd: Option<i32>,

    /// Run as a per-user session daemon
    #[arg(long)]
    session: bool,

    /// Name of the startup event
    #[arg(long, value_name = "NAME", default_value = "startup")]
    startup_event: String,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let config = match Config::resolve(
        args.confdir.clone(),
        args.logdir.clone(),
        &args.default_console,
        args.no_log,
    ) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("wardend: {e}");
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = std::fs::create_dir_all(&config.logdir) {
        eprintln!("wardend: cannot create {}: {e}", config.logdir.display());
        return ExitCode::FAILURE;
    }
    lifecycle::rotate_log_if_needed(&config.log_path);
    write_startup_marker(&config);

    let _log_guard = match setup_logging(&config) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("wardend: cannot set up logging: {e}");
            return ExitCode::FAILURE;
        }
    };

    info!(version = env!("CARGO_PKG_VERSION"), "starting wardend");

    match run(args, config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("fatal: {e}");
            eprintln!("wardend: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Everything the engine loop needs to execute effects.
struct EngineCtx<'a> {
    spawner: &'a UnixSpawner,
    tracer: &'a NullTracer,
    replies: &'a Replies,
}

async fn run(args: Args, config: Config) -> Result<(), LifecycleError> {
    // Held for the daemon's lifetime; releases on drop.
    let _lock = lifecycle::acquire_lock(&config)?;

    let mut core = Core::new();
    let restored = match (args.restart, args.state_fd) {
        (true, Some(fd)) => lifecycle::restore_state(&mut core, fd),
        (true, None) => {
            warn!("--restart without --state-fd; fresh boot");
            false
        }
        _ => false,
    };

    let session = if args.session && !args.no_sessions {
        Some(core.register_session(nix::unistd::Uid::effective().as_raw()))
    } else {
        None
    };

    let spawner = UnixSpawner::new(config.logdir.join("jobs"), config.no_log);
    let tracer = NullTracer;
    let replies = Arc::new(Replies::new());
    let ctx = EngineCtx {
        spawner: &spawner,
        tracer: &tracer,
        replies: &replies,
    };

    match warden_conf::load_dir_with(&config.confdir, config.default_console) {
        Ok(load) => run_core(&mut core, reload_input(load, session, None), &ctx),
        Err(e) => warn!(error = %e, "configuration load failed; starting with empty registry"),
    }

    if !restored && !args.no_startup_event {
        info!(event = %args.startup_event, "emitting startup event");
        run_core(
            &mut core,
            Input::Emit {
                name: args.startup_event.clone(),
                env: Vec::new(),
                session,
                reply: None,
            },
            &ctx,
        );
    }

    // Control socket.
    if config.socket_path.exists() {
        let _ = std::fs::remove_file(&config.socket_path);
    }
    let socket = UnixListener::bind(&config.socket_path)
        .map_err(|e| LifecycleError::BindFailed(config.socket_path.clone(), e))?;
    let (cmd_tx, mut cmd_rx) = mpsc::channel::<DaemonCmd>(64);
    let listen_ctx = Arc::new(ListenCtx {
        cmd_tx: cmd_tx.clone(),
        replies: Arc::clone(&replies),
        session,
    });
    tokio::spawn(listener::run(socket, listen_ctx));

    // Child reaper.
    let (child_tx, mut child_rx) = mpsc::channel(256);
    tokio::spawn(run_reaper(child_tx));

    // Conf watching; the watcher must stay alive for the loop's lifetime.
    let _watcher = watcher::spawn(&config.confdir, cmd_tx.clone());

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sighup = signal(SignalKind::hangup())?;

    // NOTE: must be created outside the loop; select! re-evaluates branches
    // iteration, and a fresh sleep would never let timers fire under load.
    let mut timer_check = tokio::time::interval(Duration::from_secs(1));

    info!(socket = %config.socket_path.display(), "wardend ready");

    loop {
        tokio::select! {
            Some(cmd) = cmd_rx.recv() => match cmd {
                DaemonCmd::Core(input) => run_core(&mut core, input, &ctx),
                DaemonCmd::Reload { reply } => {
                    handle_reload(&mut core, &config, session, reply, &ctx);
                }
                DaemonCmd::ReExec { reply } => {
                    replies.respond(reply, Response::Restarting);
                    // Give the listener task a beat to flush the reply.
                    tokio::time::sleep(Duration::from_millis(100)).await;
                    let e = reexec(&core, &args, &config);
                    error!(error = %e, "re-exec failed, continuing");
                }
                DaemonCmd::Shutdown { reply } => {
                    replies.respond(reply, Response::ShuttingDown);
                    info!("shutdown requested");
                    break;
                }
            },

            Some(exit) = child_rx.recv() => {
                run_core(
                    &mut core,
                    Input::ChildExit { pid: exit.pid, status: exit.status },
                    &ctx,
                );
            }

            _ = timer_check.tick() => {
                for input in core.fired_timers() {
                    run_core(&mut core, input, &ctx);
                }
            }

            _ = sighup.recv() => {
                info!("SIGHUP: reloading configuration");
                handle_reload(&mut core, &config, session, None, &ctx);
            }

            _ = sigterm.recv() => {
                info!("SIGTERM received, shutting down");
                break;
            }

            _ = sigint.recv() => {
                info!("SIGINT received, shutting down");
                break;
            }
        }
    }

    lifecycle::cleanup(&config);
    info!("wardend stopped");
    Ok(())
}

/// Feed one input through the core and execute the returned effects.
///
/// Trace effects resolve synchronously and their outcomes loop back in.
fn run_core(core: &mut Core, input: Input, ctx: &EngineCtx) {
    let mut pending = VecDeque::from([input]);
    while let Some(input) = pending.pop_front() {
        for effect in core.handle(input, ctx.spawner) {
            match effect {
                Effect::Reply { token, body } => ctx.replies.respond(token, body.into()),
                Effect::BeginTrace { job, pid, expect } => {
                    let outcome = ctx.tracer.begin(pid, expect);
                    pending.push_back(Input::TraceDone {
                        job,
                        main_pid: outcome.main_pid,
                        failed: outcome.failed,
                    });
                }
            }
        }
    }
}

fn reload_input(load: LoadResult, session: Option<SessionId>, reply: Option<ReplyToken>) -> Input {
    let mut classes = load.classes;
    if session.is_some() {
        for class in &mut classes {
            class.session = session;
        }
    }
    Input::Reload {
        classes,
        sources: load.sources,
        reply,
    }
}

fn handle_reload(
    core: &mut Core,
    config: &Config,
    session: Option<SessionId>,
    reply: Option<ReplyToken>,
    ctx: &EngineCtx,
) {
    match warden_conf::load_dir_with(&config.confdir, config.default_console) {
        Ok(load) => {
            if load.same_sources(core.conf_sources()) {
                debug!("configuration unchanged");
                if let Some(token) = reply {
                    ctx.replies.respond(token, Response::Ok);
                }
                return;
            }
            run_core(core, reload_input(load, session, reply), ctx);
        }
        Err(e) => {
            warn!(error = %e, "configuration reload failed");
            if let Some(token) = reply {
                ctx.replies.respond(
                    token,
                    Response::Failed {
                        message: e.to_string(),
                    },
                );
            }
        }
    }
}

/// Serialise the graph to an unlinked temp file and exec ourselves with
/// `--restart --state-fd N`. Returns only on failure.
fn reexec(core: &Core, args: &Args, config: &Config) -> std::io::Error {
    use std::os::unix::process::CommandExt;

    let snapshot = Snapshot::capture(core);
    let mut file = match tempfile::tempfile() {
        Ok(file) => file,
        Err(e) => return e,
    };
    if let Err(e) = snapshot.write_to(&mut file) {
        return std::io::Error::other(e);
    }
    if let Err(e) = file.seek(SeekFrom::Start(0)) {
        return e;
    }

    // The descriptor must survive the exec.
    let fd = file.as_raw_fd();
    if let Err(e) = nix::fcntl::fcntl(
        fd,
        nix::fcntl::FcntlArg::F_SETFD(nix::fcntl::FdFlag::empty()),
    ) {
        return std::io::Error::from(e);
    }

    let exe = match std::env::current_exe() {
        Ok(exe) => exe,
        Err(e) => return e,
    };
    info!(
        exe = %exe.display(),
        state_fd = fd,
        socket = %config.socket_path.display(),
        "re-executing"
    );

    let mut command = std::process::Command::new(exe);
    command.args(reexec_args(args, fd));
    // `file` is still open here; exec inherits the descriptor.
    command.exec()
}

/// Rebuild the command line for the replacement instance.
fn reexec_args(args: &Args, fd: RawFd) -> Vec<String> {
    let mut out = Vec::new();
    if let Some(dir) = &args.confdir {
        out.push("--confdir".into());
        out.push(dir.display().to_string());
    }
    if let Some(dir) = &args.logdir {
        out.push("--logdir".into());
        out.push(dir.display().to_string());
    }
    out.push("--default-console".into());
    out.push(args.default_console.clone());
    if args.no_log {
        out.push("--no-log".into());
    }
    if args.no_sessions {
        out.push("--no-sessions".into());
    }
    if args.no_startup_event {
        out.push("--no-startup-event".into());
    }
    if args.session {
        out.push("--session".into());
    }
    out.push("--startup-event".into());
    out.push(args.startup_event.clone());
    out.push("--restart".into());
    out.push("--state-fd".into());
    out.push(fd.to_string());
    out
}

/// Leave a boot marker in the log before tracing is up, so a reader can
/// tell where this attempt begins even if startup dies early.
fn write_startup_marker(config: &Config) {
    let marker = format!("=== wardend boot, pid {} ===\n", std::process::id());
    // Tracing is not running yet; there is nowhere to report a failure.
    let _ = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&config.log_path)
        .and_then(|mut file| file.write_all(marker.as_bytes()));
}

/// Route tracing to the daemon log through a non-blocking appender.
///
/// The returned guard owns the writer thread and must live until exit.
/// Size housekeeping happened in `rotate_log_if_needed`; the appender
/// itself only ever appends.
fn setup_logging(
    config: &Config,
) -> Result<tracing_appender::non_blocking::WorkerGuard, LifecycleError> {
    use tracing_subscriber::EnvFilter;

    let directory = config.log_path.parent().ok_or(LifecycleError::NoStateDir)?;
    let file_name = config
        .log_path
        .file_name()
        .ok_or(LifecycleError::NoStateDir)?;
    let (writer, guard) =
        tracing_appender::non_blocking(tracing_appender::rolling::never(directory, file_name));

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .init();

    Ok(guard)
}

#[cfg(test)]
#[path = "main_tests.rs"]
mod tests;
