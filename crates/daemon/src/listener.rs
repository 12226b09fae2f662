// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Listener task for the control socket.
//!
//! Each connection carries one request. The listener translates it into a
//! command for the engine loop, registers a reply slot keyed by token, and
//! waits for the engine to answer. For `--wait` requests that happens
//! only when the job transition or event chain settles.

use crate::protocol::{self, Request, Response, DEFAULT_TIMEOUT, PROTOCOL_VERSION};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, warn};
use warden_core::{ReplyToken, SessionId};
use warden_engine::Input;

/// A command for the engine loop.
#[derive(Debug)]
pub(crate) enum DaemonCmd {
    /// Feed an input straight into the core.
    Core(Input),
    /// Reload the configuration directory. `None` for watcher-triggered
    /// reloads that nobody waits on.
    Reload { reply: Option<ReplyToken> },
    /// Serialise state and exec ourselves.
    ReExec { reply: ReplyToken },
    /// Stop the daemon.
    Shutdown { reply: ReplyToken },
}

/// Pending replies keyed by token.
#[derive(Default)]
pub(crate) struct Replies {
    next: AtomicU64,
    pending: Mutex<HashMap<ReplyToken, oneshot::Sender<Response>>>,
}

impl Replies {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a token and the channel its response will arrive on.
    pub fn register(&self) -> (ReplyToken, oneshot::Receiver<Response>) {
        let token = ReplyToken::new(self.next.fetch_add(1, Ordering::SeqCst));
        let (tx, rx) = oneshot::channel();
        self.pending.lock().insert(token, tx);
        (token, rx)
    }

    /// Deliver a response; silently drops if the caller went away.
    pub fn respond(&self, token: ReplyToken, response: Response) {
        if let Some(tx) = self.pending.lock().remove(&token) {
            let _ = tx.send(response);
        } else {
            debug!(token = %token, "reply for a departed caller");
        }
    }
}

/// Shared context for connection handlers.
pub(crate) struct ListenCtx {
    pub cmd_tx: mpsc::Sender<DaemonCmd>,
    pub replies: Arc<Replies>,
    /// Session every request is scoped to (daemon-wide `--session` mode).
    pub session: Option<SessionId>,
}

/// Run the accept loop until the socket is torn down.
pub(crate) async fn run(socket: UnixListener, ctx: Arc<ListenCtx>) {
    loop {
        match socket.accept().await {
            Ok((stream, _)) => {
                let ctx = Arc::clone(&ctx);
                tokio::spawn(async move {
                    if let Err(e) = handle_connection(stream, &ctx).await {
                        match e {
                            protocol::ProtocolError::Disconnected => {
                                debug!("client disconnected")
                            }
                            protocol::ProtocolError::TimedOut(_) => warn!("connection timeout"),
                            _ => error!("connection error: {e}"),
                        }
                    }
                });
            }
            Err(e) => {
                error!("accept error: {e}");
            }
        }
    }
}

/// Handle a single client connection: one request, one response.
async fn handle_connection(
    stream: UnixStream,
    ctx: &ListenCtx,
) -> Result<(), protocol::ProtocolError> {
    let (mut reader, mut writer) = stream.into_split();

    let request = protocol::read_request(&mut reader, DEFAULT_TIMEOUT).await?;
    debug!(request = ?request, "received request");

    let response = dispatch(request, ctx).await;
    protocol::write_response(&mut writer, &response, DEFAULT_TIMEOUT).await?;
    Ok(())
}

/// Turn a request into engine work and wait for the answer.
async fn dispatch(request: Request, ctx: &ListenCtx) -> Response {
    let session = ctx.session;
    match request {
        Request::Ping => Response::Pong,
        Request::Version => Response::Version {
            version: PROTOCOL_VERSION.to_string(),
        },

        Request::Start { name, env, wait } => {
            let (reply, rx) = ctx.replies.register();
            forward(
                ctx,
                DaemonCmd::Core(Input::Start {
                    name,
                    env,
                    wait,
                    session,
                    reply,
                }),
                rx,
            )
            .await
        }
        Request::Stop { name, env, wait } => {
            let (reply, rx) = ctx.replies.register();
            forward(
                ctx,
                DaemonCmd::Core(Input::Stop {
                    name,
                    env,
                    wait,
                    session,
                    reply,
                }),
                rx,
            )
            .await
        }
        Request::Restart { name, env, wait } => {
            let (reply, rx) = ctx.replies.register();
            forward(
                ctx,
                DaemonCmd::Core(Input::Restart {
                    name,
                    env,
                    wait,
                    session,
                    reply,
                }),
                rx,
            )
            .await
        }
        Request::Status { name } => {
            let (reply, rx) = ctx.replies.register();
            forward(
                ctx,
                DaemonCmd::Core(Input::Status {
                    name,
                    session,
                    reply,
                }),
                rx,
            )
            .await
        }
        Request::List => {
            let (reply, rx) = ctx.replies.register();
            forward(ctx, DaemonCmd::Core(Input::List { session, reply }), rx).await
        }

        Request::Emit { name, env, wait } => {
            if wait {
                let (reply, rx) = ctx.replies.register();
                forward(
                    ctx,
                    DaemonCmd::Core(Input::Emit {
                        name,
                        env,
                        session,
                        reply: Some(reply),
                    }),
                    rx,
                )
                .await
            } else {
                let sent = ctx
                    .cmd_tx
                    .send(DaemonCmd::Core(Input::Emit {
                        name,
                        env,
                        session,
                        reply: None,
                    }))
                    .await;
                match sent {
                    Ok(()) => Response::Ok,
                    Err(_) => unavailable(),
                }
            }
        }

        Request::ReloadConf => {
            let (reply, rx) = ctx.replies.register();
            forward(ctx, DaemonCmd::Reload { reply: Some(reply) }, rx).await
        }
        Request::ReExec => {
            let (reply, rx) = ctx.replies.register();
            forward(ctx, DaemonCmd::ReExec { reply }, rx).await
        }
        Request::Shutdown => {
            let (reply, rx) = ctx.replies.register();
            forward(ctx, DaemonCmd::Shutdown { reply }, rx).await
        }
    }
}

async fn forward(
    ctx: &ListenCtx,
    cmd: DaemonCmd,
    rx: oneshot::Receiver<Response>,
) -> Response {
    if ctx.cmd_tx.send(cmd).await.is_err() {
        return unavailable();
    }
    match rx.await {
        Ok(response) => response,
        Err(_) => unavailable(),
    }
}

fn unavailable() -> Response {
    Response::Failed {
        message: "daemon is shutting down".into(),
    }
}

#[cfg(test)]
#[path = "listener_tests.rs"]
mod tests;
