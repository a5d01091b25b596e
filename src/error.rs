//! Pipeline error kinds
//!
//! Only [`PipelineError::Configuration`] ever escapes [`crate::Pipeline::run`].
//! Enumeration failures are folded into the dataset report, and read, transform
//! and write failures are folded into the per-object failure list.

use thiserror::Error;

use crate::storage::StorageError;
use crate::transform::TransformError;

/// Error type for pipeline operations
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Missing or invalid credentials, settings or dataset definitions
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The raw zone could not be listed for a dataset
    #[error("Failed to enumerate dataset '{dataset}': {source}")]
    Enumeration {
        dataset: String,
        #[source]
        source: StorageError,
    },

    /// A source object could not be fetched
    #[error("Failed to read {key}: {source}")]
    Read {
        key: String,
        #[source]
        source: StorageError,
    },

    /// Schema cast failure or malformed row data
    #[error("Failed to transform {key}: {source}")]
    Transform {
        key: String,
        #[source]
        source: TransformError,
    },

    /// The destination object could not be written
    #[error("Failed to write {key}: {source}")]
    Write {
        key: String,
        #[source]
        source: StorageError,
    },
}

impl PipelineError {
    /// Shorthand for a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        PipelineError::Configuration(message.into())
    }
}

/// Result type for pipeline operations
pub type PipelineResult<T> = Result<T, PipelineError>;
