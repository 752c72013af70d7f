//! Error types for the fieldmap-core library.

use thiserror::Error;

/// Main error type for the fieldmap library.
#[derive(Error, Debug)]
pub enum FieldmapError {
    /// Field key construction error.
    #[error("field key error: {0}")]
    Key(#[from] KeyError),

    /// Rule evaluation error.
    #[error("rule error: {0}")]
    Rule(#[from] RuleError),

    /// JSON (de)serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Errors raised when building a field key.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KeyError {
    /// Header field names must not be empty.
    #[error("header field name is empty")]
    Empty,

    /// Header field names must not contain the line-item separator.
    #[error("header field name {0:?} contains '.'")]
    ReservedSeparator(String),

    /// Line numbers start at 1.
    #[error("line number must be positive")]
    ZeroLine,
}

/// Errors raised while evaluating a single rule.
///
/// These never abort an extraction run; the engine records them and moves on.
#[derive(Error, Debug)]
pub enum RuleError {
    /// A parser pattern failed to compile.
    #[error("invalid pattern {pattern:?}: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// The rule variant has no evaluator yet.
    #[error("{0} rules are not implemented")]
    NotImplemented(&'static str),
}

/// Result type for the fieldmap library.
pub type Result<T> = std::result::Result<T, FieldmapError>;
