//! Wire framing for the livestatus `fixed16` protocol.
//!
//! Outbound: the validated query plus two directive lines requesting
//! JSON output and the fixed 16-byte response header, terminated by the
//! blank line that signals end-of-query to the backend.
//!
//! Inbound: a fixed 16-byte preamble — 3-digit status code, one space,
//! 11-digit left-padded body length, one newline — followed by exactly
//! `body_len` bytes of payload.

use crate::query::Query;
use crate::{AppError, Result};

/// Length of the fixed response header in bytes.
pub const HEADER_LEN: usize = 16;

/// The single success status code in the fixed header.
pub const STATUS_OK: u16 = 200;

/// Parsed fixed 16-byte response header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResponseHeader {
    /// Backend status code; `200` is the only success value.
    pub status: u16,
    /// Exact byte count of the body that follows the header.
    pub body_len: usize,
}

impl ResponseHeader {
    /// Whether the backend reported success.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.status == STATUS_OK
    }
}

/// Frame a validated query for the wire.
///
/// Trailing newlines on the query are normalized first so the result is
/// always `<query lines>\nOutputFormat:json\nResponseHeader: fixed16\n\n`,
/// with the final blank line terminating the query.
#[must_use]
pub fn build_wire_query(query: &Query) -> String {
    let text = query.as_str().trim_end_matches('\n');
    format!("{text}\nOutputFormat:json\nResponseHeader: fixed16\n\n")
}

/// Parse the fixed 16-byte response header.
///
/// The status code is the first 3 bytes read as an unsigned integer.
/// The body length is bytes 4..15 (the space at index 3 is skipped),
/// trimmed and parsed; non-numeric content yields length 0, which then
/// surfaces as a downstream decode failure rather than a header error.
///
/// # Errors
///
/// Returns `AppError::Transport` when fewer than [`HEADER_LEN`] bytes
/// were received (the peer closed before sending the full header) and
/// `AppError::Protocol` when the status field is not numeric.
pub fn parse_header(raw: &[u8]) -> Result<ResponseHeader> {
    if raw.len() < HEADER_LEN {
        return Err(AppError::Transport(format!(
            "problem while reading from socket: got {} of {HEADER_LEN} header bytes",
            raw.len()
        )));
    }

    let status_field = String::from_utf8_lossy(&raw[..3]);
    let status = status_field.parse::<u16>().map_err(|_| {
        AppError::Protocol(format!("malformed response header status {status_field:?}"))
    })?;

    let body_len = String::from_utf8_lossy(&raw[4..15])
        .trim()
        .parse::<usize>()
        .unwrap_or(0);

    Ok(ResponseHeader { status, body_len })
}
