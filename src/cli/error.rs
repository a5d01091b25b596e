//! CLI-specific error types

use thiserror::Error;

use crate::catalog::CatalogError;
use crate::error::PipelineError;
use crate::storage::StorageError;

/// CLI-specific error type
#[derive(Error, Debug)]
pub enum CliError {
    #[error("{0}")]
    Pipeline(#[from] PipelineError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}
