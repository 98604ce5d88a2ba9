//! Configuration error types.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during configuration loading and validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Numeric env var could not be parsed.
    #[error("failed to parse {var}='{value}' as an integer: {source}")]
    IntParseError {
        var: &'static str,
        value: String,
        #[source]
        source: std::num::ParseIntError,
    },

    /// Float env var could not be parsed.
    #[error("failed to parse {var}='{value}' as a number: {source}")]
    FloatParseError {
        var: &'static str,
        value: String,
        #[source]
        source: std::num::ParseFloatError,
    },

    /// Similarity threshold must stay within (0, 1].
    #[error("similarity threshold {value} is out of range (0, 1]")]
    ThresholdOutOfRange { value: f32 },

    /// A duration or size setting that must be positive was zero.
    #[error("{var} must be greater than zero")]
    ZeroValue { var: &'static str },

    /// The two vector collections must be distinct.
    #[error("blocks and answers collections must differ (both are '{name}')")]
    SameCollection { name: String },

    /// A collection name was empty.
    #[error("{var} must not be empty")]
    EmptyValue { var: &'static str },

    /// Path exists but is not a file (when a file was expected).
    #[error("path is not a file: {path}")]
    NotAFile { path: PathBuf },
}
