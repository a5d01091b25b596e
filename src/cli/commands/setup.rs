//! Setup command: make sure both zones exist

use crate::cli::error::CliError;
use crate::config::PipelineConfig;
use crate::storage::{self, Zone};

/// Setup command arguments
#[derive(Debug, Clone, Default)]
pub struct SetupArgs {
    /// Only report, do not create missing zones
    pub check: bool,
}

/// Handle the setup command
pub async fn handle_setup(config: &PipelineConfig, args: &SetupArgs) -> Result<(), CliError> {
    println!("Project: {}", config.project_id()?);

    for zone in [Zone::Raw, Zone::Processed] {
        let store = storage::open(config, zone).await?;

        if store.exists().await? {
            println!("  {} zone {}: exists", zone, store.zone());
        } else if args.check {
            println!("  {} zone {}: missing", zone, store.zone());
        } else {
            store.create().await?;
            tracing::info!(zone = store.zone(), "Created zone");
            println!("  {} zone {}: created", zone, store.zone());
        }
    }

    Ok(())
}
