//! Run command: raw zone to processed zone

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::cli::error::CliError;
use crate::cli::progress::ProgressReporter;
use crate::config::PipelineConfig;
use crate::pipeline::Pipeline;

/// Run command arguments
#[derive(Debug, Clone, Default)]
pub struct RunArgs {
    /// Datasets to run; the configured list when empty
    pub datasets: Vec<String>,
    /// Override `pipeline.concurrency`
    pub concurrency: Option<usize>,
    /// Print the report as JSON
    pub json: bool,
}

/// Handle the run command
///
/// Object and dataset failures are part of the report and do not make the
/// command fail; only configuration problems do.
pub async fn handle_run(config: &PipelineConfig, args: &RunArgs) -> Result<(), CliError> {
    let mut pipeline = Pipeline::connect(config).await?;
    if let Some(concurrency) = args.concurrency {
        pipeline = pipeline.with_concurrency(concurrency)?;
    }

    let progress = (!args.json).then(|| Arc::new(ProgressReporter::new()));
    if let Some(progress) = &progress {
        pipeline = pipeline.with_observer(progress.clone());
    }

    let datasets = if args.datasets.is_empty() {
        pipeline.default_datasets().to_vec()
    } else {
        args.datasets.clone()
    };

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, finishing in-flight objects");
            on_interrupt.cancel();
        }
    });

    let result = pipeline.run_with_cancel(&datasets, cancel).await;
    interrupt.abort();
    if let Some(progress) = &progress {
        progress.finish();
    }
    let report = result?;

    if args.json {
        let json = serde_json::to_string_pretty(&report)
            .map_err(|e| CliError::Serialization(e.to_string()))?;
        println!("{}", json);
    } else {
        println!();
        println!("{}", report.summary());
    }

    Ok(())
}
