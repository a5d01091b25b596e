//! Seed command: upload synthetic raw data

use chrono::{NaiveDate, Utc};

use crate::cli::error::CliError;
use crate::config::PipelineConfig;
use crate::seed;
use crate::storage::{self, StorageError, Zone};

/// Seed command arguments
#[derive(Debug, Clone)]
pub struct SeedArgs {
    /// Order date (defaults to today, UTC)
    pub date: Option<NaiveDate>,
    /// Number of orders
    pub orders: usize,
    /// RNG seed (random when not given)
    pub seed: Option<u64>,
}

/// Handle the seed command
pub async fn handle_seed(config: &PipelineConfig, args: &SeedArgs) -> Result<(), CliError> {
    let date = args.date.unwrap_or_else(|| Utc::now().date_naive());
    let rng_seed = args.seed.unwrap_or_else(rand::random);

    let objects = seed::generate(date, args.orders, rng_seed)?;
    for object in &objects {
        println!("  Generated {} rows for {}", object.rows, object.key);
    }

    let raw = storage::open(config, Zone::Raw).await?;
    println!("Uploading to {}...", raw.zone());
    let keys = seed::upload(raw.as_ref(), objects)
        .await
        .map_err(|e| match e {
            StorageError::ZoneNotFound(zone) => CliError::InvalidArgument(format!(
                "Zone {} does not exist. Run 'setup' first.",
                zone
            )),
            other => CliError::Storage(other),
        })?;

    for key in keys {
        println!("  Uploaded: {}", raw.uri(&key));
    }
    println!("Seed: {}", rng_seed);
    Ok(())
}
