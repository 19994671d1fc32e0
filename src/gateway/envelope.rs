//! Caller-facing JSON envelope.
//!
//! Every query attempt renders as a two-element JSON array
//! `[[status, text], body]`: `[[0, "OK"], <decoded payload>]` on
//! success, `[[1, "ERROR: ..."], []]` on any failure. Exactly one of
//! the two shapes exists per attempt; error kinds are distinguished
//! only in logs, never in the wire response.

use serde_json::{json, Value};

use crate::errors::Result;

/// Rendered outcome of one query attempt.
#[derive(Debug, Clone)]
pub struct Envelope {
    status: u8,
    text: String,
    body: Value,
}

impl Envelope {
    /// Success envelope carrying the decoded backend payload.
    #[must_use]
    pub fn success(body: Value) -> Self {
        Self {
            status: 0,
            text: "OK".into(),
            body,
        }
    }

    /// Failure envelope; the body is always the empty sequence.
    #[must_use]
    pub fn failure(message: &str) -> Self {
        Self {
            status: 1,
            text: format!("ERROR: {message}"),
            body: json!([]),
        }
    }

    /// Render a query outcome into the uniform envelope.
    #[must_use]
    pub fn from_outcome(outcome: Result<Value>) -> Self {
        match outcome {
            Ok(body) => Self::success(body),
            Err(err) => Self::failure(err.caller_message()),
        }
    }

    /// Whether this envelope reports success.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status == 0
    }

    /// The envelope as a JSON value.
    #[must_use]
    pub fn to_value(&self) -> Value {
        json!([[self.status, &self.text], &self.body])
    }

    /// The envelope serialized as compact JSON text.
    #[must_use]
    pub fn to_json(&self) -> String {
        serde_json::to_string(&self.to_value())
            .unwrap_or_else(|_| r#"[[1,"ERROR: serialization failed"],[]]"#.to_owned())
    }
}

/// Wrap rendered JSON as a script-callback invocation for cross-origin
/// embedding, when `name` is an acceptable callback identifier.
///
/// Returns `None` for names that are not plain (possibly dotted)
/// identifiers; the caller then falls back to plain JSON.
#[must_use]
pub fn wrap_jsonp(name: &str, rendered: &str) -> Option<String> {
    is_valid_callback(name).then(|| format!("{name}({rendered})"))
}

/// Callback names are restricted to dotted ASCII identifiers.
fn is_valid_callback(name: &str) -> bool {
    !name.is_empty()
        && !name.starts_with(|c: char| c.is_ascii_digit() || c == '.')
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '$' | '.'))
}
