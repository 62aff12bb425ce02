//! Error types for the classification pipeline.
//!
//! Every stage returns [`PipelineError`]. The set of kinds is deliberately
//! small: callers branch on the kind, the message carries the detail.

use std::path::PathBuf;

use polars::prelude::PolarsError;
use thiserror::Error;

/// Errors produced by the pipeline stages.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Configuration is missing, malformed, or has an invalid value.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A source table or artifact could not be read, written or decoded.
    #[error("I/O error on '{path}': {message}")]
    Io {
        /// File the operation was acting on
        path: PathBuf,
        /// Description of the failure, including the underlying cause
        message: String,
    },

    /// The data does not have the shape the stage expects.
    #[error("Schema mismatch: {0}")]
    SchemaMismatch(String),

    /// The configured classifier name matches no known classifier.
    #[error("Unknown classifier '{name}'. Expected one of: {expected}")]
    UnknownClassifier {
        /// Name taken verbatim from the configuration
        name: String,
        /// Comma-separated list of accepted names
        expected: String,
    },

    /// Data is well-formed but cannot be used (e.g. a non-binary target).
    #[error("Invalid data: {0}")]
    InvalidData(String),
}

impl PipelineError {
    /// Build an [`PipelineError::Io`] from any displayable cause.
    pub fn io(path: impl Into<PathBuf>, cause: impl std::fmt::Display) -> Self {
        PipelineError::Io {
            path: path.into(),
            message: cause.to_string(),
        }
    }
}

// Column lookups and casts are the only polars calls made outside of the
// loader, so an unqualified polars error is a schema problem.
impl From<PolarsError> for PipelineError {
    fn from(err: PolarsError) -> Self {
        PipelineError::SchemaMismatch(err.to_string())
    }
}

/// Result alias used throughout the library.
pub type Result<T> = std::result::Result<T, PipelineError>;
