//! Global configuration parsing and validation.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::livestatus::transport::BackendTarget;
use crate::{AppError, Result};

/// Allow-list grammar fragments for inbound queries.
///
/// A query is accepted when it begins with one of `verbs`, followed by
/// whitespace, a table name matching `table_pattern`, and a newline.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct QueryConfig {
    /// Allowed query verbs.
    #[serde(default = "default_verbs")]
    pub verbs: Vec<String>,
    /// Regex fragment matched against the table name.
    #[serde(default = "default_table_pattern")]
    pub table_pattern: String,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            verbs: default_verbs(),
            table_pattern: default_table_pattern(),
        }
    }
}

fn default_verbs() -> Vec<String> {
    vec!["GET".into(), "LOGROTATE".into(), "COMMAND".into()]
}

fn default_table_pattern() -> String {
    "[a-z]+".into()
}

/// Configurable timeout values (seconds) for backend socket operations.
///
/// A value of `0` disables the timeout; the exchange then blocks until
/// data arrives or the peer disconnects.
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct TimeoutConfig {
    /// Connect handshake timeout.
    #[serde(default)]
    pub connect_seconds: u64,
    /// Timeout applied to each individual socket read.
    #[serde(default)]
    pub read_seconds: u64,
}

impl TimeoutConfig {
    /// Connect timeout as a [`Duration`], `None` when disabled.
    #[must_use]
    pub fn connect_timeout(&self) -> Option<Duration> {
        (self.connect_seconds > 0).then(|| Duration::from_secs(self.connect_seconds))
    }

    /// Per-read timeout as a [`Duration`], `None` when disabled.
    #[must_use]
    pub fn read_timeout(&self) -> Option<Duration> {
        (self.read_seconds > 0).then(|| Duration::from_secs(self.read_seconds))
    }
}

fn default_http_port() -> u16 {
    8080
}

fn default_backend() -> BackendTarget {
    BackendTarget::Local {
        path: "/var/lib/nagios/rw/live".into(),
    }
}

/// Global configuration parsed from `config.toml`.
///
/// Every field carries a default so the config file is optional; the
/// defaults describe a local livestatus socket at the conventional path.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct GlobalConfig {
    /// HTTP port the gateway listens on.
    #[serde(default = "default_http_port")]
    pub http_port: u16,
    /// How to reach the livestatus backend.
    #[serde(default = "default_backend")]
    pub backend: BackendTarget,
    /// Inbound query allow-list grammar.
    #[serde(default)]
    pub query: QueryConfig,
    /// Timeouts for backend socket operations.
    #[serde(default)]
    pub timeouts: TimeoutConfig,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            http_port: default_http_port(),
            backend: default_backend(),
            query: QueryConfig::default(),
            timeouts: TimeoutConfig::default(),
        }
    }
}

impl GlobalConfig {
    /// Load and validate configuration from a TOML file path.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the file cannot be read or contains
    /// invalid TOML, or if validation fails.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .map_err(|err| AppError::Config(format!("failed to read config: {err}")))?;
        Self::from_toml_str(&raw)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if parsing or validation fails.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        match &self.backend {
            BackendTarget::Local { path } => {
                if path.as_os_str().is_empty() {
                    return Err(AppError::Config("backend path must not be empty".into()));
                }
            }
            BackendTarget::Remote { host, port } => {
                if host.is_empty() {
                    return Err(AppError::Config("backend host must not be empty".into()));
                }
                if *port == 0 {
                    return Err(AppError::Config(
                        "backend port must be greater than zero".into(),
                    ));
                }
            }
        }

        if self.query.verbs.is_empty() {
            return Err(AppError::Config("query verbs must not be empty".into()));
        }
        if self.query.verbs.iter().any(|verb| verb.is_empty()) {
            return Err(AppError::Config(
                "query verbs must not contain the empty string".into(),
            ));
        }
        if self.query.table_pattern.is_empty() {
            return Err(AppError::Config("query table_pattern must not be empty".into()));
        }

        Ok(())
    }
}
