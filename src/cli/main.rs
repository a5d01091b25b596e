//! CLI binary entry point for datalake-etl

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use datalake_etl::catalog::DEFAULT_ANALYTICS_DATASET;
use datalake_etl::cli::commands::load_config;
use datalake_etl::cli::commands::map_path::{MapPathArgs, handle_map_path};
use datalake_etl::cli::commands::run::{RunArgs, handle_run};
use datalake_etl::cli::commands::seed::{SeedArgs, handle_seed};
use datalake_etl::cli::commands::setup::{SetupArgs, handle_setup};
use datalake_etl::cli::commands::tables::{TablesArgs, handle_tables};
use datalake_etl::cli::error::CliError;
use datalake_etl::cli::logging;
use datalake_etl::path::{CSV_SUFFIX, PARQUET_SUFFIX};
use datalake_etl::seed::DEFAULT_ORDER_COUNT;

#[derive(Parser)]
#[command(name = "datalake-etl")]
#[command(about = "Move raw CSV objects into a partitioned Parquet zone")]
#[command(version)]
struct Cli {
    /// Configuration file (default: ./.datalake.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log level used when RUST_LOG is not set
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the raw and processed zones if they do not exist
    Setup {
        /// Only report which zones exist
        #[arg(long)]
        check: bool,
    },

    /// Generate synthetic stores, products and orders into the raw zone
    Seed {
        /// Order date (YYYY-MM-DD, default: today)
        #[arg(short, long)]
        date: Option<NaiveDate>,
        /// Number of orders
        #[arg(short, long, default_value_t = DEFAULT_ORDER_COUNT)]
        orders: usize,
        /// RNG seed for reproducible data
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Transform raw objects into the processed zone
    Run {
        /// Dataset to run (repeatable, default: pipeline.datasets)
        #[arg(short, long = "dataset")]
        datasets: Vec<String>,
        /// Objects processed concurrently within a dataset
        #[arg(long)]
        concurrency: Option<usize>,
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show external table definitions over the processed zone
    Tables {
        /// Analytics dataset name
        #[arg(long, default_value = DEFAULT_ANALYTICS_DATASET)]
        analytics_dataset: String,
        /// Print as JSON
        #[arg(long)]
        json: bool,
        /// Print CREATE EXTERNAL TABLE statements
        #[arg(long)]
        ddl: bool,
        /// Print statements that copy each table into a native table
        #[arg(long)]
        materialize: bool,
    },

    /// Print the processed-zone key for raw keys
    MapPath {
        /// Raw object keys
        #[arg(required = true)]
        keys: Vec<String>,
        #[arg(long, default_value = CSV_SUFFIX)]
        input_suffix: String,
        #[arg(long, default_value = PARQUET_SUFFIX)]
        output_suffix: String,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    logging::init(&cli.log_level);

    let result = run(cli).await;

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let config = || load_config(cli.config.as_ref());

    match cli.command {
        Commands::Setup { check } => handle_setup(&config()?, &SetupArgs { check }).await,
        Commands::Seed { date, orders, seed } => {
            let args = SeedArgs { date, orders, seed };
            handle_seed(&config()?, &args).await
        }
        Commands::Run {
            datasets,
            concurrency,
            json,
        } => {
            let args = RunArgs {
                datasets,
                concurrency,
                json,
            };
            handle_run(&config()?, &args).await
        }
        Commands::Tables {
            analytics_dataset,
            json,
            ddl,
            materialize,
        } => {
            let args = TablesArgs {
                analytics_dataset,
                json,
                ddl,
                materialize,
            };
            handle_tables(&config()?, &args).await
        }
        // needs no configuration
        Commands::MapPath {
            keys,
            input_suffix,
            output_suffix,
        } => {
            let args = MapPathArgs {
                keys,
                input_suffix,
                output_suffix,
            };
            handle_map_path(&args)
        }
    }
}
