//! Backend stream transport.
//!
//! Owns the single stream connection used for one query/response
//! exchange. The backend is reached either through a filesystem
//! local socket (via the `interprocess` crate) or a TCP socket.
//! One connection serves exactly one exchange; there is no pooling.

use std::fmt::{Display, Formatter};
use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;

use interprocess::local_socket::tokio::prelude::*;
use interprocess::local_socket::tokio::Stream as LocalStream;
use interprocess::local_socket::GenericFilePath;
use serde::Deserialize;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::debug;

use crate::config::TimeoutConfig;
use crate::{AppError, Result};

/// How to reach the livestatus backend.
///
/// Immutable for the lifetime of one request.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(tag = "socket_type")]
pub enum BackendTarget {
    /// Filesystem-addressed local socket.
    #[serde(rename = "unix")]
    Local {
        /// Socket path on the local filesystem.
        path: PathBuf,
    },
    /// TCP socket reached via host and port.
    #[serde(rename = "tcp")]
    Remote {
        /// Backend host name or address.
        host: String,
        /// Backend TCP port.
        port: u16,
    },
}

impl Display for BackendTarget {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Local { path } => write!(f, "unix:{}", path.display()),
            Self::Remote { host, port } => write!(f, "tcp:{host}:{port}"),
        }
    }
}

/// The underlying stream, one variant per target kind.
#[derive(Debug)]
enum BackendStream {
    Local(LocalStream),
    Tcp(TcpStream),
}

/// A connected stream to the backend, scoped to a single exchange.
///
/// The connection is owned by the request handling it and released on
/// every exit path; [`BackendConnection::close`] swallows shutdown
/// errors, and dropping the value closes the socket regardless.
#[derive(Debug)]
pub struct BackendConnection {
    stream: BackendStream,
    timeouts: TimeoutConfig,
}

impl BackendConnection {
    /// Open a stream socket to `target`.
    ///
    /// For TCP targets Nagle's algorithm is disabled so small protocol
    /// messages are not held back. For local targets the socket path
    /// must exist before the connect is attempted.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Connect` when the socket cannot be created,
    /// the path is missing, or the connect handshake fails or times out.
    pub async fn connect(target: &BackendTarget, timeouts: TimeoutConfig) -> Result<Self> {
        let stream = match target {
            BackendTarget::Local { path } => {
                if !path.exists() {
                    return Err(AppError::Connect(
                        "the configured livestatus socket does not exist".into(),
                    ));
                }
                let name = path.clone().to_fs_name::<GenericFilePath>().map_err(|err| {
                    AppError::Connect(format!(
                        "invalid livestatus socket path {}: {err}",
                        path.display()
                    ))
                })?;
                let stream =
                    connect_with_timeout(timeouts.connect_timeout(), LocalStream::connect(name))
                        .await?;
                BackendStream::Local(stream)
            }
            BackendTarget::Remote { host, port } => {
                let stream = connect_with_timeout(
                    timeouts.connect_timeout(),
                    TcpStream::connect((host.as_str(), *port)),
                )
                .await?;
                // Nagle's algorithm is bad for brief protocols.
                stream
                    .set_nodelay(true)
                    .map_err(|err| AppError::Connect(format!("failed to set TCP_NODELAY: {err}")))?;
                BackendStream::Tcp(stream)
            }
        };

        debug!(%target, "connected to livestatus backend");
        Ok(Self { stream, timeouts })
    }

    /// Write the full buffer to the backend.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Transport` on any write failure; no partial
    /// write recovery is attempted for this request.
    pub async fn write(&mut self, bytes: &[u8]) -> Result<()> {
        let io = match &mut self.stream {
            BackendStream::Local(stream) => stream.write_all(bytes).await,
            BackendStream::Tcp(stream) => stream.write_all(bytes).await,
        };
        io.map_err(|err| AppError::Transport(format!("failed to write query: {err}")))
    }

    /// Accumulate up to `len` bytes by repeated reads.
    ///
    /// A read returning zero bytes before `len` is reached ends the loop
    /// early and the short buffer is returned as-is; the caller detects
    /// the peer-closed-early case by comparing lengths, not through an
    /// error from this function.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Transport` when a read fails (e.g. the peer
    /// reset the connection) or the configured read timeout elapses.
    pub async fn read_until_complete(&mut self, len: usize) -> Result<Vec<u8>> {
        let mut buf = vec![0_u8; len];
        let mut offset = 0;

        while offset < len {
            let read = self.read_some(&mut buf[offset..]).await?;
            if read == 0 {
                break;
            }
            offset += read;
        }

        buf.truncate(offset);
        Ok(buf)
    }

    /// Close the connection, swallowing shutdown errors.
    ///
    /// Safe to call in any state; the exchange outcome is already
    /// decided by the time the connection is released.
    pub async fn close(mut self) {
        let _ = match &mut self.stream {
            BackendStream::Local(stream) => stream.shutdown().await,
            BackendStream::Tcp(stream) => stream.shutdown().await,
        };
    }

    /// One read call against the stream, honoring the read timeout.
    async fn read_some(&mut self, buf: &mut [u8]) -> Result<usize> {
        let limit = self.timeouts.read_timeout();
        let io = match &mut self.stream {
            BackendStream::Local(stream) => read_with_timeout(limit, stream.read(buf)).await?,
            BackendStream::Tcp(stream) => read_with_timeout(limit, stream.read(buf)).await?,
        };
        io.map_err(|err| AppError::Transport(format!("problem while reading from socket: {err}")))
    }
}

/// Await a connect future under an optional timeout.
async fn connect_with_timeout<T, F>(limit: Option<Duration>, connect: F) -> Result<T>
where
    F: Future<Output = std::io::Result<T>>,
{
    let io = match limit {
        Some(limit) => tokio::time::timeout(limit, connect).await.map_err(|_| {
            AppError::Connect(format!("connect timed out after {}s", limit.as_secs()))
        })?,
        None => connect.await,
    };
    io.map_err(|err| AppError::Connect(format!("unable to connect to livestatus socket: {err}")))
}

/// Await a read future under an optional timeout.
async fn read_with_timeout<F>(limit: Option<Duration>, read: F) -> Result<std::io::Result<usize>>
where
    F: Future<Output = std::io::Result<usize>>,
{
    match limit {
        Some(limit) => tokio::time::timeout(limit, read).await.map_err(|_| {
            AppError::Transport(format!("read timed out after {}s", limit.as_secs()))
        }),
        None => Ok(read.await),
    }
}
