//! Error types for the log parser runtime.
//!
//! Only configuration and rule-table problems are errors. Per-record conditions
//! (a pattern that does not fit, a value that cannot be converted, a message id
//! with no route) are ordinary outcomes and never surface here.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ParserError>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParserError {
    #[error("Invalid tz_offset: {0}")]
    InvalidTimezone(String),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("Invalid dissect pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },
    #[error("Invalid date format '{format}': {reason}")]
    InvalidDateFormat { format: String, reason: String },
    #[error("Unknown converter: {0}")]
    UnknownConverter(String),
    #[error("Unknown merge policy: {0}")]
    UnknownPolicy(String),
    #[error("Unknown function: {0}")]
    UnknownFunction(String),
    #[error("Unknown lookup table: {0}")]
    UnknownLookup(String),
    #[error("Compilation error: {0}")]
    CompilationError(String),
    #[error("YAML parsing error: {0}")]
    YamlError(String),
    #[error("JSON parsing error: {0}")]
    JsonError(String),
    #[error("IO error: {0}")]
    IoError(String),
}

impl ParserError {
    pub(crate) fn pattern(pattern: &str, reason: impl Into<String>) -> Self {
        ParserError::InvalidPattern {
            pattern: pattern.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn date_format(format: &str, reason: impl Into<String>) -> Self {
        ParserError::InvalidDateFormat {
            format: format.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<std::io::Error> for ParserError {
    fn from(err: std::io::Error) -> Self {
        ParserError::IoError(err.to_string())
    }
}

impl From<serde_yaml::Error> for ParserError {
    fn from(err: serde_yaml::Error) -> Self {
        ParserError::YamlError(err.to_string())
    }
}

impl From<serde_json::Error> for ParserError {
    fn from(err: serde_json::Error) -> Self {
        ParserError::JsonError(err.to_string())
    }
}
