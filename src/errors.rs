//! Error types shared across the application.

use std::fmt::{Display, Formatter};

/// Shared application result type.
pub type Result<T> = std::result::Result<T, AppError>;

/// Application error enumeration covering all domain failure modes.
///
/// Every variant carries a human-readable message. All variants render
/// into the same uniform failure envelope at the gateway boundary; the
/// kind is only distinguished in logs.
#[derive(Debug)]
pub enum AppError {
    /// Configuration parsing or validation failure.
    Config(String),
    /// Query text failed the allow-list grammar.
    Validation(String),
    /// Socket creation or connect handshake failure.
    Connect(String),
    /// Write failure, short read, or peer reset during the exchange.
    Transport(String),
    /// Backend answered with a non-success status code; the message is
    /// the diagnostic text the backend embedded in the response body.
    Protocol(String),
    /// Response body is not valid JSON.
    Decode(String),
    /// File-system or other I/O operation failure.
    Io(String),
}

impl Display for AppError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "config: {msg}"),
            Self::Validation(msg) => write!(f, "validation: {msg}"),
            Self::Connect(msg) => write!(f, "connect: {msg}"),
            Self::Transport(msg) => write!(f, "transport: {msg}"),
            Self::Protocol(msg) => write!(f, "protocol: {msg}"),
            Self::Decode(msg) => write!(f, "decode: {msg}"),
            Self::Io(msg) => write!(f, "io: {msg}"),
        }
    }
}

impl std::error::Error for AppError {}

impl From<toml::de::Error> for AppError {
    fn from(err: toml::de::Error) -> Self {
        Self::Config(format!("invalid config: {err}"))
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl AppError {
    /// Message shown to the caller, without the internal kind prefix.
    ///
    /// The failure envelope reports only the message text; the kind is
    /// recorded in logs.
    #[must_use]
    pub fn caller_message(&self) -> &str {
        match self {
            Self::Config(msg)
            | Self::Validation(msg)
            | Self::Connect(msg)
            | Self::Transport(msg)
            | Self::Protocol(msg)
            | Self::Decode(msg)
            | Self::Io(msg) => msg,
        }
    }
}
