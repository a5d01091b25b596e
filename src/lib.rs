//! Datalake ETL - raw CSV to partitioned Parquet
//!
//! Provides:
//! - Schema registry for the lake's datasets
//! - Enumeration of raw objects under a dataset prefix
//! - Row-to-columnar transformation with schema enforcement
//! - Partition-preserving path mapping between the raw and processed zones
//! - A pipeline orchestrator with per-object failure isolation
//! - Object storage backends (memory, local filesystem, S3-compatible)
//! - External table definitions and a synthetic data generator

pub mod catalog;
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod enumerate;
pub mod error;
pub mod path;
pub mod pipeline;
pub mod schema;
pub mod seed;
pub mod storage;
pub mod transform;

// Re-export commonly used types
pub use catalog::{Catalog, CatalogError, ExternalTable};
pub use config::PipelineConfig;
pub use enumerate::{SourceEnumerator, SourceListing, SourceObject};
pub use error::{PipelineError, PipelineResult};
pub use path::{PathMapper, map_path};
pub use pipeline::{
    DatasetOutcome, DatasetReport, ObjectFailure, Pipeline, PipelineReport, ProgressObserver,
};
pub use schema::{ColumnSpec, ColumnType, DatasetDefinition, Schema, SchemaError, SchemaRegistry};
pub use storage::{LocalStore, MemoryStore, ObjectStore, StorageError, Zone};
pub use transform::{ColumnarOutput, TransformError, Transformer, transform};
