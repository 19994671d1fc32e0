//! Inbound query unescaping and allow-list validation.
//!
//! Callers supply the query text with literal `\n` escape sequences
//! (one HTTP parameter cannot carry raw newlines comfortably). The text
//! is unescaped to real newlines first, then matched against the
//! configured grammar before any socket I/O happens.

use regex::Regex;

use crate::config::QueryConfig;
use crate::{AppError, Result};

/// A livestatus query that passed the allow-list grammar.
///
/// Construction goes through [`QueryValidator::validate`]; holding a
/// `Query` is proof the text starts with an allowed verb and table name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query(String);

impl Query {
    /// The validated query text, with real newlines.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Compiled allow-list matcher for inbound queries.
#[derive(Debug, Clone)]
pub struct QueryValidator {
    pattern: Regex,
}

impl QueryValidator {
    /// Compile the grammar from configuration.
    ///
    /// Verbs are matched literally; `table_pattern` is a regex fragment
    /// taken as-is from the configuration.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` when the assembled pattern does not
    /// compile (a malformed `table_pattern`).
    pub fn new(config: &QueryConfig) -> Result<Self> {
        let verbs = config
            .verbs
            .iter()
            .map(|verb| regex::escape(verb))
            .collect::<Vec<_>>()
            .join("|");
        let raw = format!("^({verbs})\\s({})\n", config.table_pattern);
        let pattern = Regex::new(&raw)
            .map_err(|err| AppError::Config(format!("invalid query grammar: {err}")))?;
        Ok(Self { pattern })
    }

    /// Unescape and validate raw query text.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Validation` when the text does not match the
    /// allow-list grammar.
    pub fn validate(&self, raw: &str) -> Result<Query> {
        let text = unescape_newlines(raw);
        if self.pattern.is_match(&text) {
            Ok(Query(text))
        } else {
            Err(AppError::Validation("invalid livestatus query".into()))
        }
    }
}

/// Replace literal `\n` escape sequences with real newlines.
#[must_use]
pub fn unescape_newlines(raw: &str) -> String {
    raw.replace("\\n", "\n")
}
