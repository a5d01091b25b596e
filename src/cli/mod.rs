//! Command-line interface for datalake-etl

pub mod commands;
pub mod error;
pub mod logging;
pub mod progress;
