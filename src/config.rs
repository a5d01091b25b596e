//! Pipeline configuration file support
//!
//! Handles parsing of `.datalake.toml` configuration files, the service account
//! key file and environment variable overrides. The configuration is loaded once
//! at process start and handed to every collaborator by reference.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, PipelineResult};
use crate::schema::{ColumnType, ORDERS, PRODUCTS, Partitioning, STORES};

/// Default configuration filename
pub const CONFIG_FILENAME: &str = ".datalake.toml";

/// Default service account key filename
pub const DEFAULT_KEY_FILE: &str = "service-account-key.json";

/// Default base directory for the local storage backend
pub const DEFAULT_STORAGE_ROOT: &str = "./datalake";

/// Environment variable for the project id
pub const ENV_PROJECT_ID: &str = "DATALAKE_PROJECT_ID";

/// Environment variable for the key file path
pub const ENV_KEY_FILE: &str = "DATALAKE_KEY_FILE";

/// Environment variable for the local storage root
pub const ENV_STORAGE_ROOT: &str = "DATALAKE_STORAGE_ROOT";

/// Environment variable for the raw zone name
pub const ENV_RAW_ZONE: &str = "DATALAKE_RAW_ZONE";

/// Environment variable for the processed zone name
pub const ENV_PROCESSED_ZONE: &str = "DATALAKE_PROCESSED_ZONE";

/// Environment variable for the per-dataset worker count
pub const ENV_CONCURRENCY: &str = "DATALAKE_CONCURRENCY";

/// Environment variable for an S3-compatible endpoint
pub const ENV_S3_ENDPOINT: &str = "DATALAKE_S3_ENDPOINT";

/// Storage backend type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackendType {
    /// One directory per zone under a local root (default)
    #[default]
    Local,
    /// S3-compatible object storage, one bucket per zone
    S3,
}

impl std::str::FromStr for StorageBackendType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "local" | "fs" => Ok(StorageBackendType::Local),
            "s3" => Ok(StorageBackendType::S3),
            _ => Err(format!(
                "Unknown storage backend: {}. Use 'local' or 's3'.",
                s
            )),
        }
    }
}

impl std::fmt::Display for StorageBackendType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageBackendType::Local => write!(f, "local"),
            StorageBackendType::S3 => write!(f, "s3"),
        }
    }
}

/// Project and credentials section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectSection {
    /// Service account key file (relative to the config directory)
    #[serde(default = "default_key_file")]
    pub key_file: String,

    /// Explicit project id; read from the key file when absent
    #[serde(default)]
    pub project_id: Option<String>,
}

fn default_key_file() -> String {
    DEFAULT_KEY_FILE.to_string()
}

impl Default for ProjectSection {
    fn default() -> Self {
        Self {
            key_file: default_key_file(),
            project_id: None,
        }
    }
}

/// Storage section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageSection {
    #[serde(default)]
    pub backend: StorageBackendType,

    /// Base directory for the local backend
    #[serde(default = "default_storage_root")]
    pub root: String,

    /// Endpoint URL for S3-compatible services
    #[serde(default)]
    pub endpoint: Option<String>,

    #[serde(default)]
    pub region: Option<String>,

    /// AWS profile name
    #[serde(default)]
    pub profile: Option<String>,
}

fn default_storage_root() -> String {
    DEFAULT_STORAGE_ROOT.to_string()
}

impl Default for StorageSection {
    fn default() -> Self {
        Self {
            backend: StorageBackendType::default(),
            root: default_storage_root(),
            endpoint: None,
            region: None,
            profile: None,
        }
    }
}

/// Zone (bucket/container) names
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ZonesSection {
    /// Defaults to `{project_id}-raw`
    #[serde(default)]
    pub raw: Option<String>,

    /// Defaults to `{project_id}-processed`
    #[serde(default)]
    pub processed: Option<String>,
}

/// Pipeline behaviour section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineSection {
    /// Datasets processed by a plain `run`, in order
    #[serde(default = "default_datasets")]
    pub datasets: Vec<String>,

    /// Objects processed concurrently within one dataset
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Failure reasons kept per dataset in the report
    #[serde(default = "default_max_failure_reasons")]
    pub max_failure_reasons: usize,

    /// Suffix of recognized raw inputs
    #[serde(default = "default_input_suffix")]
    pub input_suffix: String,

    /// Suffix of written columnar objects
    #[serde(default = "default_output_suffix")]
    pub output_suffix: String,

    /// Field delimiter of the raw inputs
    #[serde(default = "default_delimiter")]
    pub delimiter: char,

    /// Infer int64/float64 for columns the schema does not declare
    #[serde(default = "default_infer_types")]
    pub infer_types: bool,
}

fn default_datasets() -> Vec<String> {
    vec![STORES.to_string(), PRODUCTS.to_string(), ORDERS.to_string()]
}

fn default_concurrency() -> usize {
    1
}

fn default_max_failure_reasons() -> usize {
    10
}

fn default_input_suffix() -> String {
    ".csv".to_string()
}

fn default_output_suffix() -> String {
    ".parquet".to_string()
}

fn default_delimiter() -> char {
    ','
}

fn default_infer_types() -> bool {
    true
}

impl Default for PipelineSection {
    fn default() -> Self {
        Self {
            datasets: default_datasets(),
            concurrency: default_concurrency(),
            max_failure_reasons: default_max_failure_reasons(),
            input_suffix: default_input_suffix(),
            output_suffix: default_output_suffix(),
            delimiter: default_delimiter(),
            infer_types: default_infer_types(),
        }
    }
}

/// Dataset definition override
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DatasetSection {
    /// Storage prefix (defaults to `<name>/`)
    #[serde(default)]
    pub prefix: Option<String>,

    #[serde(default)]
    pub partitioning: Option<Partitioning>,

    /// Declared column types; an empty table means pass-through
    #[serde(default)]
    pub columns: BTreeMap<String, ColumnType>,

    /// Columns that must not contain empty values
    #[serde(default)]
    pub required: Vec<String>,
}

/// Service account key file contents we care about
#[derive(Debug, Clone, Deserialize)]
struct ServiceAccountKey {
    project_id: String,
}

/// Main configuration structure
///
/// Represents the `.datalake.toml` configuration file format.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PipelineConfig {
    #[serde(default)]
    pub project: ProjectSection,

    #[serde(default)]
    pub storage: StorageSection,

    #[serde(default)]
    pub zones: ZonesSection,

    #[serde(default)]
    pub pipeline: PipelineSection,

    #[serde(default)]
    pub datasets: BTreeMap<String, DatasetSection>,

    /// Directory relative paths are resolved against
    #[serde(skip)]
    base_dir: PathBuf,
}

impl PipelineConfig {
    /// Create a new default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Configuration for a known project id, with everything else defaulted
    pub fn for_project(project_id: impl Into<String>) -> Self {
        Self {
            project: ProjectSection {
                project_id: Some(project_id.into()),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    /// Load configuration from a working directory
    ///
    /// Looks for `.datalake.toml` in the directory and falls back to defaults
    /// if it does not exist.
    pub fn load(workspace_path: &Path) -> PipelineResult<Self> {
        let config_path = workspace_path.join(CONFIG_FILENAME);
        if config_path.exists() {
            Self::load_file(&config_path)
        } else {
            let mut config = Self::default();
            config.base_dir = workspace_path.to_path_buf();
            config.finish()
        }
    }

    /// Load configuration from an explicit file path
    pub fn load_file(path: &Path) -> PipelineResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            PipelineError::config(format!("Failed to read {}: {}", path.display(), e))
        })?;

        let mut config = Self::parse(&content)?;
        config.base_dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        config.finish()
    }

    /// Parse configuration from TOML string
    pub fn parse(content: &str) -> PipelineResult<Self> {
        toml::from_str(content)
            .map_err(|e| PipelineError::config(format!("Failed to parse config: {}", e)))
    }

    /// Convert configuration to TOML string
    pub fn to_toml(&self) -> PipelineResult<String> {
        toml::to_string_pretty(self)
            .map_err(|e| PipelineError::config(format!("Failed to serialize config: {}", e)))
    }

    fn finish(mut self) -> PipelineResult<Self> {
        self.apply_env_overrides();
        self.resolve_project_id()?;
        self.validate()?;
        Ok(self)
    }

    /// Apply environment variable overrides
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|name| std::env::var(name).ok());
    }

    /// Apply overrides from any variable lookup; unset names leave the value alone
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(project_id) = lookup(ENV_PROJECT_ID) {
            self.project.project_id = Some(project_id);
        }

        if let Some(key_file) = lookup(ENV_KEY_FILE) {
            self.project.key_file = key_file;
        }

        if let Some(root) = lookup(ENV_STORAGE_ROOT) {
            self.storage.root = root;
        }

        if let Some(raw) = lookup(ENV_RAW_ZONE) {
            self.zones.raw = Some(raw);
        }

        if let Some(processed) = lookup(ENV_PROCESSED_ZONE) {
            self.zones.processed = Some(processed);
        }

        if let Some(concurrency) = lookup(ENV_CONCURRENCY) {
            match concurrency.parse() {
                Ok(concurrency) => self.pipeline.concurrency = concurrency,
                Err(_) => tracing::warn!(
                    value = %concurrency,
                    "Ignoring non-numeric {}",
                    ENV_CONCURRENCY
                ),
            }
        }

        if let Some(endpoint) = lookup(ENV_S3_ENDPOINT) {
            self.storage.endpoint = Some(endpoint);
        }
    }

    /// Fill in the project id from the key file when it is not set explicitly
    pub fn resolve_project_id(&mut self) -> PipelineResult<()> {
        if self.project.project_id.is_some() {
            return Ok(());
        }

        let key_path = self.key_file_path();
        let content = std::fs::read_to_string(&key_path).map_err(|e| {
            PipelineError::config(format!(
                "Key file {} not found or unreadable ({}). Set project.project_id or {}.",
                key_path.display(),
                e,
                ENV_PROJECT_ID
            ))
        })?;

        let key: ServiceAccountKey = serde_json::from_str(&content).map_err(|e| {
            PipelineError::config(format!(
                "Key file {} has no usable project_id: {}",
                key_path.display(),
                e
            ))
        })?;

        self.project.project_id = Some(key.project_id);
        Ok(())
    }

    /// Check settings that would otherwise fail halfway through a run
    pub fn validate(&self) -> PipelineResult<()> {
        let project_id = self.project_id()?;
        if project_id.trim().is_empty() {
            return Err(PipelineError::config("project_id is empty"));
        }

        if self.pipeline.concurrency == 0 {
            return Err(PipelineError::config("pipeline.concurrency must be at least 1"));
        }

        let input = &self.pipeline.input_suffix;
        let output = &self.pipeline.output_suffix;
        if input.is_empty() || output.is_empty() {
            return Err(PipelineError::config(
                "pipeline.input_suffix and pipeline.output_suffix must not be empty",
            ));
        }
        if input == output {
            return Err(PipelineError::config(format!(
                "input and output suffix are both '{}'",
                input
            )));
        }

        if !self.pipeline.delimiter.is_ascii() {
            return Err(PipelineError::config(format!(
                "pipeline.delimiter must be a single ASCII character, got '{}'",
                self.pipeline.delimiter
            )));
        }

        if self.raw_zone()? == self.processed_zone()? {
            return Err(PipelineError::config(
                "raw and processed zones must be different containers",
            ));
        }

        for name in &self.pipeline.datasets {
            let builtin = [STORES, PRODUCTS, ORDERS].contains(&name.as_str());
            if !builtin && !self.datasets.contains_key(name) {
                return Err(PipelineError::config(format!(
                    "pipeline.datasets lists '{}' but there is no [datasets.{}] section",
                    name, name
                )));
            }
        }

        Ok(())
    }

    /// The project id, once resolved
    pub fn project_id(&self) -> PipelineResult<&str> {
        self.project
            .project_id
            .as_deref()
            .ok_or_else(|| PipelineError::config("project_id is not configured"))
    }

    /// Raw zone container name
    pub fn raw_zone(&self) -> PipelineResult<String> {
        match &self.zones.raw {
            Some(raw) => Ok(raw.clone()),
            None => Ok(format!("{}-raw", self.project_id()?)),
        }
    }

    /// Processed zone container name
    pub fn processed_zone(&self) -> PipelineResult<String> {
        match &self.zones.processed {
            Some(processed) => Ok(processed.clone()),
            None => Ok(format!("{}-processed", self.project_id()?)),
        }
    }

    /// Key file path resolved against the config directory
    pub fn key_file_path(&self) -> PathBuf {
        self.resolve_path(&self.project.key_file)
    }

    /// Local storage root resolved against the config directory
    pub fn storage_root(&self) -> PathBuf {
        self.resolve_path(&self.storage.root)
    }

    fn resolve_path(&self, path: &str) -> PathBuf {
        let path = Path::new(path);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }

    /// Set the directory relative paths are resolved against
    pub fn with_base_dir(mut self, base_dir: impl Into<PathBuf>) -> Self {
        self.base_dir = base_dir.into();
        self
    }
}

/// Generate a sample configuration file content
pub fn sample_config() -> &'static str {
    r#"# datalake-etl configuration

[project]
# Service account key file; project_id is read from it unless set below
key_file = "service-account-key.json"
# project_id = "my-project"

[storage]
# "local" (one directory per zone under root) or "s3"
backend = "local"
root = "./datalake"
# endpoint = "https://storage.googleapis.com"
# region = "us-central1"

[zones]
# raw = "my-project-raw"
# processed = "my-project-processed"

[pipeline]
datasets = ["stores", "products", "orders"]
concurrency = 1
max_failure_reasons = 10
input_suffix = ".csv"
output_suffix = ".parquet"

[datasets.orders]
partitioning = "date"
required = [
    "order_id",
    "order_timestamp",
    "store_id",
    "product_id",
    "quantity",
    "unit_price",
]

[datasets.orders.columns]
order_id = "string"
order_timestamp = "timestamp"
store_id = "string"
product_id = "string"
quantity = "int64"
unit_price = "float64"
"#
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = PipelineConfig::new();
        assert_eq!(config.storage.backend, StorageBackendType::Local);
        assert_eq!(config.pipeline.datasets, vec!["stores", "products", "orders"]);
        assert_eq!(config.pipeline.concurrency, 1);
        assert_eq!(config.pipeline.input_suffix, ".csv");
        assert_eq!(config.pipeline.output_suffix, ".parquet");
        assert!(config.pipeline.infer_types);
    }

    #[test]
    fn test_zone_names_derive_from_project() {
        let config = PipelineConfig::for_project("acme");
        assert_eq!(config.raw_zone().unwrap(), "acme-raw");
        assert_eq!(config.processed_zone().unwrap(), "acme-processed");
    }

    #[test]
    fn test_parse_sample_config() {
        let config = PipelineConfig::parse(sample_config()).unwrap();
        let orders = &config.datasets["orders"];
        assert_eq!(orders.columns["quantity"], ColumnType::Int64);
        assert_eq!(orders.partitioning, Some(Partitioning::Date));
        assert_eq!(orders.required.len(), 6);
    }

    #[test]
    fn test_sample_config_matches_builtin_orders() {
        let config = PipelineConfig::parse(sample_config()).unwrap();
        let registry = crate::schema::SchemaRegistry::from_config(&config).unwrap();
        let builtin = crate::schema::SchemaRegistry::builtin();

        let mut sample: Vec<_> = registry.schema_for(ORDERS).unwrap().columns().to_vec();
        let mut expected: Vec<_> = builtin.schema_for(ORDERS).unwrap().columns().to_vec();
        sample.sort_by(|a, b| a.name.cmp(&b.name));
        expected.sort_by(|a, b| a.name.cmp(&b.name));
        assert_eq!(sample, expected);
    }

    #[test]
    fn test_overrides_from_lookup() {
        let vars: BTreeMap<&str, &str> = [
            (ENV_PROJECT_ID, "from-env"),
            (ENV_STORAGE_ROOT, "/data/lake"),
            (ENV_RAW_ZONE, "landing"),
            (ENV_CONCURRENCY, "8"),
            (ENV_S3_ENDPOINT, "http://localhost:9000"),
        ]
        .into_iter()
        .collect();

        let mut config = PipelineConfig::for_project("acme");
        config.apply_overrides(|name| vars.get(name).map(|v| v.to_string()));

        assert_eq!(config.project_id().unwrap(), "from-env");
        assert_eq!(config.storage.root, "/data/lake");
        assert_eq!(config.raw_zone().unwrap(), "landing");
        assert_eq!(config.processed_zone().unwrap(), "from-env-processed");
        assert_eq!(config.pipeline.concurrency, 8);
        assert_eq!(config.storage.endpoint.as_deref(), Some("http://localhost:9000"));
        assert_eq!(config.project.key_file, DEFAULT_KEY_FILE);
    }

    #[test]
    fn test_non_numeric_concurrency_override_ignored() {
        let mut config = PipelineConfig::for_project("acme");
        config.apply_overrides(|name| (name == ENV_CONCURRENCY).then(|| "many".to_string()));
        assert_eq!(config.pipeline.concurrency, 1);
        assert_eq!(config.project_id().unwrap(), "acme");
    }

    #[test]
    fn test_project_id_from_key_file() {
        let dir = tempdir().unwrap();
        std::fs::write(
            dir.path().join(DEFAULT_KEY_FILE),
            r#"{"type": "service_account", "project_id": "from-key"}"#,
        )
        .unwrap();

        let mut config = PipelineConfig::new().with_base_dir(dir.path());
        config.resolve_project_id().unwrap();
        assert_eq!(config.project_id().unwrap(), "from-key");
    }

    #[test]
    fn test_missing_key_file_is_configuration_error() {
        let dir = tempdir().unwrap();
        let mut config = PipelineConfig::new().with_base_dir(dir.path());
        let err = config.resolve_project_id().unwrap_err();
        assert!(matches!(err, PipelineError::Configuration(_)));
    }

    #[test]
    fn test_validate_rejects_zero_concurrency() {
        let mut config = PipelineConfig::for_project("acme");
        config.pipeline.concurrency = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_same_suffix() {
        let mut config = PipelineConfig::for_project("acme");
        config.pipeline.output_suffix = ".csv".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_unknown_dataset() {
        let mut config = PipelineConfig::for_project("acme");
        config.pipeline.datasets.push("customers".to_string());
        assert!(config.validate().is_err());

        config
            .datasets
            .insert("customers".to_string(), DatasetSection::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_storage_root_relative_to_base_dir() {
        let config = PipelineConfig::for_project("acme").with_base_dir("/srv/etl");
        assert_eq!(config.storage_root(), PathBuf::from("/srv/etl/datalake"));
    }

    #[test]
    fn test_to_toml_roundtrip() {
        let config = PipelineConfig::for_project("acme");
        let toml = config.to_toml().unwrap();
        assert!(toml.contains("acme"));
        let parsed = PipelineConfig::parse(&toml).unwrap();
        assert_eq!(parsed.project.project_id.as_deref(), Some("acme"));
    }
}
