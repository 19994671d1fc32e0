//! Livestatus wire-protocol client.
//!
//! One query/response exchange over a stream socket speaking the
//! MKLivestatus text protocol with the `fixed16` response header.
//!
//! Submodules:
//! - `transport`: stream connection (unix socket or tcp) with the
//!   read-until-complete loop.
//! - `codec`: outbound query framing and fixed 16-byte header parsing.
//! - `client`: drives a single exchange and classifies the outcome.

pub mod client;
pub mod codec;
pub mod transport;

pub use client::LivestatusClient;
pub use transport::BackendTarget;
