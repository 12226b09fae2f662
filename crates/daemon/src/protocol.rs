// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wire protocol for the control socket.
//!
//! Each message travels as one frame: a four-byte big-endian body length
//! followed by the JSON body. Requests are answered with exactly one
//! response on the same connection.

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use warden_engine::ReplyBody;
pub use warden_engine::{ClassView, CoreError, JobView, ProcessView};

/// Errors on the control socket.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("socket IO failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed message: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("frame of {0} bytes exceeds the {MAX_FRAME_BYTES}-byte limit")]
    FrameTooLarge(usize),

    #[error("peer closed the connection")]
    Disconnected,

    #[error("no traffic within {0:?}")]
    TimedOut(Duration),
}

/// Largest body a frame may carry (16 MB).
pub const MAX_FRAME_BYTES: usize = 16 * 1024 * 1024;

/// Deadline for reading a request and writing its response.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Protocol version (from Cargo.toml)
pub const PROTOCOL_VERSION: &str = env!("CARGO_PKG_VERSION");

fn default_wait() -> bool {
    true
}

/// A request from the control client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "request", rename_all = "snake_case")]
pub enum Request {
    Ping,
    Version,
    Start {
        name: String,
        #[serde(default)]
        env: Vec<String>,
        #[serde(default = "default_wait")]
        wait: bool,
    },
    Stop {
        name: String,
        #[serde(default)]
        env: Vec<String>,
        #[serde(default = "default_wait")]
        wait: bool,
    },
    Restart {
        name: String,
        #[serde(default)]
        env: Vec<String>,
        #[serde(default = "default_wait")]
        wait: bool,
    },
    Status {
        name: String,
    },
    List,
    Emit {
        name: String,
        #[serde(default)]
        env: Vec<String>,
        #[serde(default)]
        wait: bool,
    },
    ReloadConf,
    ReExec,
    Shutdown,
}

/// A response to the control client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "response", rename_all = "snake_case")]
pub enum Response {
    Pong,
    Version { version: String },
    Ok,
    Started { job: JobView },
    Stopped { job: String },
    Status { class: ClassView },
    List { classes: Vec<ClassView> },
    EventFinished { name: String },
    Restarting,
    ShuttingDown,
    Error { error: CoreError },
    /// Daemon-level failure outside the core error kinds.
    Failed { message: String },
}

impl From<ReplyBody> for Response {
    fn from(body: ReplyBody) -> Self {
        match body {
            ReplyBody::Ok => Response::Ok,
            ReplyBody::Started { job } => Response::Started { job },
            ReplyBody::Stopped { job } => Response::Stopped { job },
            ReplyBody::Status { class } => Response::Status { class },
            ReplyBody::List { classes } => Response::List { classes },
            ReplyBody::EventFinished { name } => Response::EventFinished { name },
            ReplyBody::Error { error } => Response::Error { error },
        }
    }
}

fn check_frame(len: usize) -> Result<(), ProtocolError> {
    if len > MAX_FRAME_BYTES {
        return Err(ProtocolError::FrameTooLarge(len));
    }
    Ok(())
}

/// A closed socket mid-frame is a disconnect, not an IO fault.
fn eof_is_disconnect(e: std::io::Error) -> ProtocolError {
    if e.kind() == std::io::ErrorKind::UnexpectedEof {
        ProtocolError::Disconnected
    } else {
        ProtocolError::Io(e)
    }
}

/// Send one message as a single frame.
pub async fn send<T, W>(writer: &mut W, message: &T) -> Result<(), ProtocolError>
where
    T: Serialize,
    W: AsyncWriteExt + Unpin,
{
    let body = serde_json::to_vec(message)?;
    check_frame(body.len())?;

    // One buffer, one write: header and body never land in separate
    // packets for a reader to trip over.
    let mut frame = Vec::with_capacity(4 + body.len());
    frame.extend_from_slice(&(body.len() as u32).to_be_bytes());
    frame.extend_from_slice(&body);
    writer.write_all(&frame).await?;
    writer.flush().await?;
    Ok(())
}

/// Receive and decode one frame.
pub async fn recv<T, R>(reader: &mut R) -> Result<T, ProtocolError>
where
    T: DeserializeOwned,
    R: AsyncReadExt + Unpin,
{
    let mut header = [0u8; 4];
    reader
        .read_exact(&mut header)
        .await
        .map_err(eof_is_disconnect)?;
    let len = u32::from_be_bytes(header) as usize;
    check_frame(len)?;

    let mut body = vec![0u8; len];
    reader
        .read_exact(&mut body)
        .await
        .map_err(eof_is_disconnect)?;
    Ok(serde_json::from_slice(&body)?)
}

/// Read a request, giving up after `timeout`.
pub async fn read_request<R>(reader: &mut R, timeout: Duration) -> Result<Request, ProtocolError>
where
    R: AsyncReadExt + Unpin,
{
    match tokio::time::timeout(timeout, recv(reader)).await {
        Ok(result) => result,
        Err(_) => Err(ProtocolError::TimedOut(timeout)),
    }
}

/// Write a response, giving up after `timeout`.
pub async fn write_response<W>(
    writer: &mut W,
    response: &Response,
    timeout: Duration,
) -> Result<(), ProtocolError>
where
    W: AsyncWriteExt + Unpin,
{
    match tokio::time::timeout(timeout, send(writer, response)).await {
        Ok(result) => result,
        Err(_) => Err(ProtocolError::TimedOut(timeout)),
    }
}

/// Read a response with no deadline: `--wait` requests settle only when
/// the transition or event chain on the daemon side does.
pub async fn read_response<R>(reader: &mut R) -> Result<Response, ProtocolError>
where
    R: AsyncReadExt + Unpin,
{
    recv(reader).await
}

#[cfg(test)]
#[path = "protocol_tests.rs"]
mod tests;
