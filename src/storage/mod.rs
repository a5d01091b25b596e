//! Object storage abstraction
//!
//! One [`ObjectStore`] addresses one zone (a bucket or container). Backends:
//! - [`MemoryStore`]: in-process map, used by tests and dry runs
//! - [`LocalStore`]: one directory per zone under a local root
//! - `S3Store`: S3-compatible object storage (feature `s3`)
//!
//! Every backend must give replace-on-write, all-or-nothing object writes and
//! must be safe to share between concurrent workers.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub mod filesystem;
pub mod memory;
#[cfg(feature = "s3")]
pub mod s3;

pub use filesystem::LocalStore;
pub use memory::MemoryStore;
#[cfg(feature = "s3")]
pub use s3::S3Store;

use crate::config::{PipelineConfig, StorageBackendType};
use crate::error::PipelineResult;

/// Error type for storage operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StorageError {
    /// No object under this key
    #[error("Object not found: {0}")]
    NotFound(String),

    /// The zone itself does not exist
    #[error("Zone not found: {0}")]
    ZoneNotFound(String),

    /// Key cannot be mapped onto the backend
    #[error("Invalid object key: {0}")]
    InvalidKey(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(String),

    /// Error reported by a remote service
    #[error("Storage backend error: {0}")]
    Backend(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Listing entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectMeta {
    /// `/`-separated object key
    pub key: String,
    /// Size in bytes
    pub size: u64,
    pub last_modified: Option<DateTime<Utc>>,
}

/// Storage zone
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Zone {
    /// Unmodified row-oriented source data
    Raw,
    /// Schema-enforced columnar data
    Processed,
}

impl std::fmt::Display for Zone {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Zone::Raw => write!(f, "raw"),
            Zone::Processed => write!(f, "processed"),
        }
    }
}

/// Object storage trait for one zone
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Name of the bucket/container this store addresses
    fn zone(&self) -> &str;

    /// Fully qualified URI of a key (or key pattern) in this zone
    fn uri(&self, key: &str) -> String;

    /// List objects whose key starts with `prefix`, sorted by key
    async fn list(&self, prefix: &str) -> StorageResult<Vec<ObjectMeta>>;

    /// Read a whole object
    async fn read(&self, key: &str) -> StorageResult<Bytes>;

    /// Write a whole object, replacing any existing object at `key`
    async fn write(&self, key: &str, data: Bytes) -> StorageResult<()>;

    /// Whether the zone exists
    async fn exists(&self) -> StorageResult<bool>;

    /// Create the zone
    async fn create(&self) -> StorageResult<()>;
}

/// Reject keys that cannot be addressed portably
pub(crate) fn validate_key(key: &str) -> StorageResult<()> {
    if key.is_empty()
        || key.starts_with('/')
        || key.ends_with('/')
        || key.contains('\\')
        || key.split('/').any(|s| s.is_empty() || s == "." || s == "..")
    {
        return Err(StorageError::InvalidKey(key.to_string()));
    }
    Ok(())
}

/// Open the store for one zone as configured
pub async fn open(config: &PipelineConfig, zone: Zone) -> PipelineResult<Arc<dyn ObjectStore>> {
    let name = match zone {
        Zone::Raw => config.raw_zone()?,
        Zone::Processed => config.processed_zone()?,
    };

    match config.storage.backend {
        StorageBackendType::Local => Ok(Arc::new(LocalStore::new(config.storage_root(), name))),
        #[cfg(feature = "s3")]
        StorageBackendType::S3 => Ok(Arc::new(S3Store::connect(&config.storage, name).await?)),
        #[cfg(not(feature = "s3"))]
        StorageBackendType::S3 => Err(crate::error::PipelineError::config(
            "storage.backend = \"s3\" requires the 's3' feature",
        )),
    }
}
