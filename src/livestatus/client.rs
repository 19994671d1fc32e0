//! One query/response exchange against the livestatus backend.
//!
//! Drives a single attempt through its states — query sent, header
//! read, body read, outcome classified — and guarantees the connection
//! is released on every path. Checks happen in a fixed order: transport
//! completeness first, then the status code, then JSON syntax. A non-200
//! body is plain diagnostic text and must never reach the JSON parser.

use serde_json::Value;
use tracing::debug;

use crate::config::TimeoutConfig;
use crate::livestatus::codec::{self, HEADER_LEN};
use crate::livestatus::transport::{BackendConnection, BackendTarget};
use crate::query::Query;
use crate::{AppError, Result};

/// Client for the livestatus backend.
///
/// Holds the connection target and timeouts; each [`Self::execute`]
/// call opens a fresh connection, runs exactly one exchange, and closes
/// the connection unconditionally. Nothing survives across requests.
#[derive(Debug, Clone)]
pub struct LivestatusClient {
    target: BackendTarget,
    timeouts: TimeoutConfig,
}

impl LivestatusClient {
    /// Create a client for the given target.
    #[must_use]
    pub fn new(target: BackendTarget, timeouts: TimeoutConfig) -> Self {
        Self { target, timeouts }
    }

    /// The configured backend target.
    #[must_use]
    pub fn target(&self) -> &BackendTarget {
        &self.target
    }

    /// Run one query/response exchange and decode the result.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Connect` when the backend is unreachable,
    /// `AppError::Transport` on write failure or short read,
    /// `AppError::Protocol` when the backend reports a non-200 status
    /// (message = the diagnostic body text), and `AppError::Decode`
    /// when a 200 body is not valid JSON.
    pub async fn execute(&self, query: &Query) -> Result<Value> {
        let mut conn = BackendConnection::connect(&self.target, self.timeouts).await?;
        let outcome = exchange(&mut conn, query).await;
        conn.close().await;
        outcome
    }
}

/// The exchange proper, separated so the caller can close the
/// connection on every outcome.
async fn exchange(conn: &mut BackendConnection, query: &Query) -> Result<Value> {
    let wire = codec::build_wire_query(query);
    conn.write(wire.as_bytes()).await?;

    let header_raw = conn.read_until_complete(HEADER_LEN).await?;
    let header = codec::parse_header(&header_raw)?;
    debug!(
        status = header.status,
        body_len = header.body_len,
        "response header received"
    );

    // The declared length is authoritative: the body is not considered
    // read until exactly that many bytes have been accumulated.
    let body = conn.read_until_complete(header.body_len).await?;
    if body.len() < header.body_len {
        return Err(AppError::Transport(format!(
            "problem while reading from socket: connection closed after {} of {} body bytes",
            body.len(),
            header.body_len
        )));
    }

    if !header.is_ok() {
        // The backend embeds human-readable error text in the body.
        return Err(AppError::Protocol(
            String::from_utf8_lossy(&body).into_owned(),
        ));
    }

    let text = String::from_utf8_lossy(&body);
    serde_json::from_str(&text)
        .map_err(|_| AppError::Decode("the response has an invalid format".into()))
}
