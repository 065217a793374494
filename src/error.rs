//! Loader error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum IngestError {
    /// A raw record is missing an identity field; only that record is skipped.
    #[error("Malformed record #{index}: {reason}")]
    MalformedRecord { index: usize, reason: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Any failure reported by the database for a single write operation.
    #[error("Database write failed ({operation}): {message}")]
    DatabaseWrite {
        operation: &'static str,
        message: String,
    },

    #[error("Missing {0} in environment")]
    MissingEnv(&'static str),

    #[error("Failed to read source {path}: {message}")]
    Source { path: String, message: String },
}

impl IngestError {
    pub fn malformed(index: usize, reason: impl Into<String>) -> Self {
        IngestError::MalformedRecord {
            index,
            reason: reason.into(),
        }
    }

    pub fn write(operation: &'static str, err: impl std::fmt::Display) -> Self {
        IngestError::DatabaseWrite {
            operation,
            message: err.to_string(),
        }
    }
}
