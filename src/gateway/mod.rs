//! Caller-facing HTTP boundary.
//!
//! Translates between the HTTP request/response shape and the backend
//! wire protocol: query extraction, envelope rendering, JSONP wrapping,
//! and the axum server itself.

pub mod envelope;
pub mod server;

pub use envelope::Envelope;
