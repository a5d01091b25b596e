//! Pipeline orchestration
//!
//! Runs datasets one after another. Within a dataset every recognized raw
//! object is read, transformed and written to the processed zone under its
//! mapped key. A failing object is recorded and the run moves on; only
//! configuration problems stop the run as a whole.
//!
//! Objects of one dataset may run concurrently (`pipeline.concurrency`), but
//! results are reported in listing order. Cancellation is checked before each
//! object starts; an object already in flight finishes its write.
//!
//! ## Example
//!
//! ```rust,ignore
//! use datalake_etl::{Pipeline, PipelineConfig};
//!
//! let config = PipelineConfig::load(std::path::Path::new("."))?;
//! let pipeline = Pipeline::connect(&config).await?;
//! let report = pipeline.run(&["orders"]).await?;
//! println!("{}", report.summary());
//! ```

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use futures::StreamExt;
use futures::stream;
use sha2::{Digest, Sha256};
use tokio_util::sync::CancellationToken;

pub mod report;

pub use report::{
    DatasetOutcome, DatasetReport, FailureKind, ObjectFailure, PipelineReport, WrittenObject,
};

use crate::config::PipelineConfig;
use crate::enumerate::{SourceEnumerator, SourceObject};
use crate::error::{PipelineError, PipelineResult};
use crate::path::PathMapper;
use crate::schema::{DatasetDefinition, Schema, SchemaRegistry};
use crate::storage::{self, ObjectStore, StorageError, Zone};
use crate::transform::{TransformError, TransformOptions, Transformer};

/// Receives progress events while a run is underway
///
/// All methods default to doing nothing.
pub trait ProgressObserver: Send + Sync {
    fn dataset_started(&self, _dataset: &str) {}

    fn object_written(&self, _dataset: &str, _written: &WrittenObject) {}

    fn object_failed(&self, _dataset: &str, _failure: &ObjectFailure) {}

    fn dataset_finished(&self, _report: &DatasetReport) {}
}

enum ObjectOutcome {
    Written(WrittenObject),
    Failed(PipelineError),
    NotStarted,
}

/// The raw-to-processed pipeline
pub struct Pipeline {
    registry: SchemaRegistry,
    enumerator: SourceEnumerator,
    processed: Arc<dyn ObjectStore>,
    transformer: Transformer,
    mapper: PathMapper,
    concurrency: usize,
    max_failure_reasons: usize,
    default_datasets: Vec<String>,
    observer: Option<Arc<dyn ProgressObserver>>,
}

impl Pipeline {
    /// Build a pipeline over two already opened zones
    pub fn new(
        config: &PipelineConfig,
        raw: Arc<dyn ObjectStore>,
        processed: Arc<dyn ObjectStore>,
    ) -> PipelineResult<Self> {
        config.validate()?;
        let registry = SchemaRegistry::from_config(config)?;
        let mapper = PathMapper::from_config(config);

        Ok(Self {
            registry,
            enumerator: SourceEnumerator::new(raw, mapper.clone()),
            processed,
            transformer: Transformer::new(TransformOptions::from_config(config)),
            mapper,
            concurrency: config.pipeline.concurrency,
            max_failure_reasons: config.pipeline.max_failure_reasons,
            default_datasets: config.pipeline.datasets.clone(),
            observer: None,
        })
    }

    /// Open both zones as configured and build the pipeline
    pub async fn connect(config: &PipelineConfig) -> PipelineResult<Self> {
        let raw = storage::open(config, Zone::Raw).await?;
        let processed = storage::open(config, Zone::Processed).await?;
        Self::new(config, raw, processed)
    }

    pub fn with_observer(mut self, observer: Arc<dyn ProgressObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Override the number of objects processed at once
    pub fn with_concurrency(mut self, concurrency: usize) -> PipelineResult<Self> {
        if concurrency == 0 {
            return Err(PipelineError::config("concurrency must be at least 1"));
        }
        self.concurrency = concurrency;
        Ok(self)
    }

    pub fn registry(&self) -> &SchemaRegistry {
        &self.registry
    }

    pub fn mapper(&self) -> &PathMapper {
        &self.mapper
    }

    /// Datasets a run without explicit names processes
    pub fn default_datasets(&self) -> &[String] {
        &self.default_datasets
    }

    /// Run the configured datasets
    pub async fn run_all(&self) -> PipelineResult<PipelineReport> {
        self.run(&self.default_datasets).await
    }

    /// Run the named datasets, in order
    pub async fn run<S: AsRef<str>>(&self, datasets: &[S]) -> PipelineResult<PipelineReport> {
        self.run_with_cancel(datasets, CancellationToken::new()).await
    }

    /// Run the named datasets, stopping between objects once `cancel` fires
    pub async fn run_with_cancel<S: AsRef<str>>(
        &self,
        datasets: &[S],
        cancel: CancellationToken,
    ) -> PipelineResult<PipelineReport> {
        let definitions = datasets
            .iter()
            .map(|name| {
                let name = name.as_ref();
                let unknown = || PipelineError::config(format!("Unknown dataset '{}'", name));
                let schema = self.registry.schema_for(name).map_err(|_| unknown())?;
                let definition = self.registry.dataset(name).ok_or_else(unknown)?;
                Ok((definition, schema))
            })
            .collect::<PipelineResult<Vec<_>>>()?;

        let mut report = PipelineReport::start();
        tracing::info!(
            run_id = %report.run_id,
            datasets = definitions.len(),
            "Starting pipeline run"
        );

        for (definition, schema) in definitions {
            if cancel.is_cancelled() {
                report.cancelled = true;
                break;
            }

            let dataset = self.run_dataset(definition, schema, &cancel).await;
            let cancelled = dataset.outcome == DatasetOutcome::Cancelled;
            report.datasets.push(dataset);
            if cancelled {
                report.cancelled = true;
                break;
            }
        }

        report.finished_at = Utc::now();
        tracing::info!(
            run_id = %report.run_id,
            processed = report.total_processed(),
            skipped = report.total_skipped(),
            failed = report.total_failed(),
            cancelled = report.cancelled,
            "Pipeline run finished"
        );
        Ok(report)
    }

    async fn run_dataset(
        &self,
        definition: &DatasetDefinition,
        schema: &Schema,
        cancel: &CancellationToken,
    ) -> DatasetReport {
        let started = Instant::now();
        let name = definition.name.as_str();
        let mut report = DatasetReport::new(name, self.max_failure_reasons);

        if let Some(observer) = &self.observer {
            observer.dataset_started(name);
        }
        tracing::info!(dataset = name, prefix = %definition.prefix, "Enumerating dataset");

        let mut listing = match self.enumerator.list(&definition.prefix).await {
            Ok(listing) => listing,
            Err(source) => {
                let error = PipelineError::Enumeration {
                    dataset: name.to_string(),
                    source,
                };
                tracing::warn!(dataset = name, "{}", error);
                report.outcome = DatasetOutcome::EnumerationFailed {
                    reason: error.to_string(),
                };
                return self.finish_dataset(report, started);
            }
        };

        let schema = Arc::new(schema.clone());
        let mut cancelled = false;
        {
            let results = stream::iter(listing.by_ref())
                .map(|object| self.process_object(object, schema.clone(), cancel))
                .buffered(self.concurrency);
            let mut results = std::pin::pin!(results);

            while let Some(outcome) = results.next().await {
                match outcome {
                    ObjectOutcome::Written(written) => {
                        if let Some(observer) = &self.observer {
                            observer.object_written(name, &written);
                        }
                        report.record_written(written);
                    }
                    ObjectOutcome::Failed(error) => {
                        tracing::warn!(dataset = name, "{}", error);
                        if let Some(failure) = ObjectFailure::from_error(&error) {
                            if let Some(observer) = &self.observer {
                                observer.object_failed(name, &failure);
                            }
                            report.record_failure(failure);
                        }
                    }
                    ObjectOutcome::NotStarted => {
                        cancelled = true;
                        report.not_started += 1;
                    }
                }
            }
        }

        report.skipped = listing.skipped();
        report.outcome = if cancelled {
            DatasetOutcome::Cancelled
        } else if listing.matched() == 0 {
            tracing::info!(dataset = name, prefix = %definition.prefix, "No objects found");
            DatasetOutcome::NoObjectsFound
        } else {
            DatasetOutcome::Completed
        };

        self.finish_dataset(report, started)
    }

    fn finish_dataset(&self, mut report: DatasetReport, started: Instant) -> DatasetReport {
        report.duration = started.elapsed();
        tracing::info!(
            dataset = %report.dataset,
            outcome = report.outcome.label(),
            processed = report.processed,
            skipped = report.skipped,
            failed = report.failed,
            rows = report.rows_written,
            "Dataset finished"
        );
        if let Some(observer) = &self.observer {
            observer.dataset_finished(&report);
        }
        report
    }

    async fn process_object(
        &self,
        object: SourceObject,
        schema: Arc<Schema>,
        cancel: &CancellationToken,
    ) -> ObjectOutcome {
        if cancel.is_cancelled() {
            return ObjectOutcome::NotStarted;
        }
        match self.transfer(&object, schema).await {
            Ok(written) => ObjectOutcome::Written(written),
            Err(error) => ObjectOutcome::Failed(error),
        }
    }

    /// Read, transform and write one object
    async fn transfer(
        &self,
        object: &SourceObject,
        schema: Arc<Schema>,
    ) -> PipelineResult<WrittenObject> {
        let destination = self
            .mapper
            .map_path(&object.key)
            .ok_or_else(|| PipelineError::Write {
                key: object.key.clone(),
                source: StorageError::InvalidKey(object.key.clone()),
            })?;

        let source = self
            .enumerator
            .read(object)
            .await
            .map_err(|source| PipelineError::Read {
                key: object.key.clone(),
                source,
            })?;

        let transformer = self.transformer;
        let output = tokio::task::spawn_blocking(move || transformer.transform(&source, &schema))
            .await
            .map_err(|e| TransformError::Encode(format!("transform task failed: {}", e)))
            .and_then(|result| result)
            .map_err(|source| PipelineError::Transform {
                key: object.key.clone(),
                source,
            })?;

        let sha256 = format!("{:x}", Sha256::digest(&output.bytes));
        let bytes = output.bytes.len() as u64;

        self.processed
            .write(&destination, output.bytes)
            .await
            .map_err(|source| PipelineError::Write {
                key: object.key.clone(),
                source,
            })?;

        tracing::info!(
            key = %object.key,
            destination = %destination,
            rows = output.rows,
            bytes,
            "Wrote columnar object"
        );

        Ok(WrittenObject {
            source_key: object.key.clone(),
            destination_key: destination,
            rows: output.rows,
            bytes,
            sha256,
        })
    }
}
