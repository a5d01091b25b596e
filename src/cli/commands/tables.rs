//! Tables command: external table definitions for the processed zone

use crate::catalog::{Catalog, DEFAULT_ANALYTICS_DATASET};
use crate::cli::error::CliError;
use crate::config::PipelineConfig;
use crate::schema::SchemaRegistry;
use crate::storage::{self, Zone};

/// Tables command arguments
#[derive(Debug, Clone)]
pub struct TablesArgs {
    /// Analytics dataset the tables live in
    pub analytics_dataset: String,
    /// Print definitions as JSON
    pub json: bool,
    /// Print `CREATE EXTERNAL TABLE` statements
    pub ddl: bool,
    /// Also print statements materializing native copies
    pub materialize: bool,
}

impl Default for TablesArgs {
    fn default() -> Self {
        Self {
            analytics_dataset: DEFAULT_ANALYTICS_DATASET.to_string(),
            json: false,
            ddl: false,
            materialize: false,
        }
    }
}

/// Handle the tables command
pub async fn handle_tables(config: &PipelineConfig, args: &TablesArgs) -> Result<(), CliError> {
    let registry = SchemaRegistry::from_config(config)?;
    let processed = storage::open(config, Zone::Processed).await?;

    let tables = Catalog::new(config.project_id()?)
        .with_analytics_dataset(&args.analytics_dataset)
        .external_tables(
            &registry,
            &config.pipeline.datasets,
            processed.as_ref(),
            &config.pipeline.output_suffix,
        )?;

    if args.json {
        let json = serde_json::to_string_pretty(&tables)
            .map_err(|e| CliError::Serialization(e.to_string()))?;
        println!("{}", json);
        return Ok(());
    }

    for table in &tables {
        if args.ddl {
            println!("{};", table.ddl());
            println!();
        } else {
            println!("{} -> {}", table.table_id, table.source_uris.join(", "));
        }
    }

    if args.materialize {
        for table in &tables {
            println!("{};", table.materialize_sql());
            println!();
        }
    }

    Ok(())
}
