//! Integration tests for configuration loading

use std::fs;

use datalake_etl::config::{CONFIG_FILENAME, StorageBackendType, sample_config};
use datalake_etl::schema::Partitioning;
use datalake_etl::{ColumnType, PipelineConfig, PipelineError, SchemaRegistry};
use tempfile::TempDir;

fn write_key_file(dir: &TempDir, project_id: &str) {
    fs::write(
        dir.path().join("service-account-key.json"),
        format!(
            r#"{{"type": "service_account", "project_id": "{}", "client_email": "etl@example.com"}}"#,
            project_id
        ),
    )
    .unwrap();
}

#[test]
fn test_project_id_from_key_file() {
    let dir = TempDir::new().unwrap();
    write_key_file(&dir, "supermarket-42");

    let config = PipelineConfig::load(dir.path()).unwrap();
    assert_eq!(config.project_id().unwrap(), "supermarket-42");
    assert_eq!(config.raw_zone().unwrap(), "supermarket-42-raw");
    assert_eq!(config.processed_zone().unwrap(), "supermarket-42-processed");
    assert_eq!(config.storage_root(), dir.path().join("./datalake"));
}

#[test]
fn test_missing_key_file_is_configuration_error() {
    let dir = TempDir::new().unwrap();
    let err = PipelineConfig::load(dir.path()).unwrap_err();
    match err {
        PipelineError::Configuration(message) => {
            assert!(message.contains("service-account-key.json"))
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[test]
fn test_invalid_key_file_is_configuration_error() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("service-account-key.json"), "{\"type\": 1}").unwrap();
    assert!(matches!(
        PipelineConfig::load(dir.path()),
        Err(PipelineError::Configuration(_))
    ));
}

#[test]
fn test_config_file_with_dataset_overrides() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join(CONFIG_FILENAME),
        r#"
[project]
project_id = "acme"

[zones]
raw = "landing"

[pipeline]
datasets = ["stores", "products", "orders", "returns"]
concurrency = 4

[datasets.products]
columns = { price = "float64", product_id = "string" }
required = ["product_id"]

[datasets.returns]
prefix = "returns/v1"
columns = { order_id = "string", returned_at = "timestamp" }
"#,
    )
    .unwrap();

    let config = PipelineConfig::load(dir.path()).unwrap();
    assert_eq!(config.raw_zone().unwrap(), "landing");
    assert_eq!(config.processed_zone().unwrap(), "acme-processed");
    assert_eq!(config.pipeline.concurrency, 4);
    assert_eq!(config.storage.backend, StorageBackendType::Local);

    let registry = SchemaRegistry::from_config(&config).unwrap();
    let products = registry.dataset("products").unwrap();
    assert_eq!(products.partitioning, Partitioning::Reference);
    let product_id = products.schema.column("product_id").unwrap();
    assert!(product_id.required);
    assert_eq!(
        products.schema.column("price").unwrap().column_type,
        ColumnType::Float64
    );

    let returns = registry.dataset("returns").unwrap();
    assert_eq!(returns.prefix, "returns/v1/");
    assert_eq!(returns.partitioning, Partitioning::Date);

    // orders keeps its built-in definition
    assert_eq!(registry.schema_for("orders").unwrap().len(), 6);
}

#[test]
fn test_undeclared_dataset_in_run_list_rejected() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join(CONFIG_FILENAME),
        "[project]\nproject_id = \"acme\"\n\n[pipeline]\ndatasets = [\"orders\", \"customers\"]\n",
    )
    .unwrap();

    assert!(matches!(
        PipelineConfig::load(dir.path()),
        Err(PipelineError::Configuration(_))
    ));
}

#[test]
fn test_same_zone_for_raw_and_processed_rejected() {
    let mut config = PipelineConfig::for_project("acme");
    config.zones.raw = Some("lake".to_string());
    config.zones.processed = Some("lake".to_string());
    assert!(config.validate().is_err());
}

#[test]
fn test_sample_config_parses() {
    let config = PipelineConfig::parse(sample_config()).unwrap();
    assert_eq!(config.pipeline.input_suffix, ".csv");
    assert_eq!(config.pipeline.output_suffix, ".parquet");

    let round_trip = PipelineConfig::parse(&config.to_toml().unwrap()).unwrap();
    assert_eq!(round_trip.pipeline.datasets, config.pipeline.datasets);
}
