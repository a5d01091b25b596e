//! CLI command implementations

pub mod map_path;
pub mod run;
pub mod seed;
pub mod setup;
pub mod tables;

use std::path::{Path, PathBuf};

use crate::cli::error::CliError;
use crate::config::PipelineConfig;

/// Load configuration from an explicit file, or from the current directory
pub fn load_config(path: Option<&PathBuf>) -> Result<PipelineConfig, CliError> {
    let config = match path {
        Some(path) => PipelineConfig::load_file(path)?,
        None => PipelineConfig::load(Path::new("."))?,
    };
    Ok(config)
}
