// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Control-socket client.

use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::net::UnixStream;
use warden_daemon::protocol::{self, ProtocolError, Request, Response};

/// Errors talking to the daemon.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("cannot connect to {path} (is wardend running?): {source}")]
    Connect {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),
}

/// Send one request and wait for the response.
///
/// There is deliberately no read timeout: `--wait` style requests block
/// until the transition settles on the daemon side.
pub async fn request(socket: &Path, request: Request) -> Result<Response, ClientError> {
    let stream = UnixStream::connect(socket)
        .await
        .map_err(|source| ClientError::Connect {
            path: socket.to_path_buf(),
            source,
        })?;
    let (mut reader, mut writer) = stream.into_split();

    protocol::send(&mut writer, &request).await?;
    Ok(protocol::read_response(&mut reader).await?)
}
