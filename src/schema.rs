//! Schema registry
//!
//! Static mapping from dataset name to its storage prefix, partition layout and
//! target column types. The registry is built once at process start and is never
//! mutated afterwards.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use arrow::datatypes::{DataType, TimeUnit};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::PipelineConfig;
use crate::error::{PipelineError, PipelineResult};

/// Name of the fact dataset
pub const ORDERS: &str = "orders";

/// Name of the product dimension
pub const PRODUCTS: &str = "products";

/// Name of the store dimension
pub const STORES: &str = "stores";

/// Primitive column type a schema can declare
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    /// UTF-8 text, taken verbatim
    String,
    /// 64-bit signed integer
    Int64,
    /// 64-bit float
    Float64,
    /// Zone-less date/time
    Timestamp,
}

impl ColumnType {
    /// Arrow type used for the columnar representation
    pub fn arrow_type(&self) -> DataType {
        match self {
            ColumnType::String => DataType::Utf8,
            ColumnType::Int64 => DataType::Int64,
            ColumnType::Float64 => DataType::Float64,
            ColumnType::Timestamp => DataType::Timestamp(TimeUnit::Microsecond, None),
        }
    }
}

impl FromStr for ColumnType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "string" | "str" | "utf8" => Ok(ColumnType::String),
            "int64" | "int" | "integer" | "bigint" => Ok(ColumnType::Int64),
            "float64" | "float" | "double" => Ok(ColumnType::Float64),
            "timestamp" | "datetime" => Ok(ColumnType::Timestamp),
            _ => Err(format!(
                "Unknown column type: {}. Use 'string', 'int64', 'float64' or 'timestamp'.",
                s
            )),
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnType::String => write!(f, "string"),
            ColumnType::Int64 => write!(f, "int64"),
            ColumnType::Float64 => write!(f, "float64"),
            ColumnType::Timestamp => write!(f, "timestamp"),
        }
    }
}

/// A declared column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSpec {
    /// Column name as it appears in the header row
    pub name: String,
    /// Target type
    pub column_type: ColumnType,
    /// Reject empty values instead of storing nulls
    #[serde(default)]
    pub required: bool,
}

impl ColumnSpec {
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
            required: false,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }
}

/// Target schema for a dataset.
///
/// An empty schema is the pass-through schema: nothing is cast.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    columns: Vec<ColumnSpec>,
}

impl Schema {
    /// Create a schema from column declarations
    pub fn new(columns: Vec<ColumnSpec>) -> Self {
        Self { columns }
    }

    /// The pass-through schema
    pub fn pass_through() -> Self {
        Self::default()
    }

    pub fn is_pass_through(&self) -> bool {
        self.columns.is_empty()
    }

    /// Look up a declared column
    pub fn column(&self, name: &str) -> Option<&ColumnSpec> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn columns(&self) -> &[ColumnSpec] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

/// How a dataset lays out its objects below its prefix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Partitioning {
    /// `<dataset>/<YYYY-MM-DD>/<file>`
    #[default]
    Date,
    /// `<dataset>/ref_data/<file>`
    Reference,
}

/// Segment used by reference (dimension) datasets
pub const REFERENCE_SEGMENT: &str = "ref_data";

/// A named logical collection shared between the raw and processed zones
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetDefinition {
    /// Dataset name (`stores`, `products`, `orders`, ...)
    pub name: String,
    /// Storage prefix, always ending in `/`
    pub prefix: String,
    /// Partition layout below the prefix
    pub partitioning: Partitioning,
    /// Target schema
    pub schema: Schema,
}

impl DatasetDefinition {
    pub fn new(name: impl Into<String>, partitioning: Partitioning, schema: Schema) -> Self {
        let name = name.into();
        Self {
            prefix: format!("{}/", name),
            name,
            partitioning,
            schema,
        }
    }

    /// Override the storage prefix; a trailing `/` is added when missing
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        let mut prefix = prefix.into();
        if !prefix.ends_with('/') {
            prefix.push('/');
        }
        self.prefix = prefix;
        self
    }
}

/// Lookup failure in the registry
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    #[error("No dataset definition for '{0}'")]
    NotFound(String),
}

/// Registry of dataset definitions
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    datasets: BTreeMap<String, DatasetDefinition>,
}

impl SchemaRegistry {
    /// An empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// The supermarket datasets: two pass-through dimensions and the orders fact table
    pub fn builtin() -> Self {
        let orders = Schema::new(vec![
            ColumnSpec::new("order_id", ColumnType::String).required(),
            ColumnSpec::new("order_timestamp", ColumnType::Timestamp).required(),
            ColumnSpec::new("store_id", ColumnType::String).required(),
            ColumnSpec::new("product_id", ColumnType::String).required(),
            ColumnSpec::new("quantity", ColumnType::Int64).required(),
            ColumnSpec::new("unit_price", ColumnType::Float64).required(),
        ]);

        Self::new()
            .with_dataset(DatasetDefinition::new(
                STORES,
                Partitioning::Reference,
                Schema::pass_through(),
            ))
            .with_dataset(DatasetDefinition::new(
                PRODUCTS,
                Partitioning::Reference,
                Schema::pass_through(),
            ))
            .with_dataset(DatasetDefinition::new(ORDERS, Partitioning::Date, orders))
    }

    /// Built-in definitions overlaid with the `[datasets.*]` sections of a config
    pub fn from_config(config: &PipelineConfig) -> PipelineResult<Self> {
        let mut registry = Self::builtin();

        for (name, section) in &config.datasets {
            let mut columns = Vec::with_capacity(section.columns.len());
            for (column, column_type) in &section.columns {
                columns.push(ColumnSpec {
                    name: column.clone(),
                    column_type: *column_type,
                    required: section.required.contains(column),
                });
            }
            if let Some(unknown) = section
                .required
                .iter()
                .find(|r| !section.columns.contains_key(*r))
            {
                return Err(PipelineError::config(format!(
                    "Dataset '{}' marks '{}' as required but does not declare its type",
                    name, unknown
                )));
            }

            let partitioning = section.partitioning.unwrap_or_else(|| {
                registry
                    .dataset(name)
                    .map(|d| d.partitioning)
                    .unwrap_or_default()
            });

            // a section without columns keeps the built-in columns
            let schema = if columns.is_empty() {
                let inherited = registry.schema_for(name).cloned().unwrap_or_default();
                if !inherited.is_pass_through() {
                    tracing::debug!(
                        dataset = %name,
                        columns = inherited.len(),
                        "Keeping built-in columns"
                    );
                }
                inherited
            } else {
                Schema::new(columns)
            };

            let mut definition = DatasetDefinition::new(name, partitioning, schema);
            if let Some(prefix) = &section.prefix {
                if prefix.trim_matches('/').is_empty() {
                    return Err(PipelineError::config(format!(
                        "Dataset '{}' has an empty prefix",
                        name
                    )));
                }
                definition = definition.with_prefix(prefix.trim_start_matches('/'));
            }
            registry = registry.with_dataset(definition);
        }

        Ok(registry)
    }

    /// Add or replace a definition
    pub fn with_dataset(mut self, definition: DatasetDefinition) -> Self {
        self.datasets.insert(definition.name.clone(), definition);
        self
    }

    pub fn dataset(&self, name: &str) -> Option<&DatasetDefinition> {
        self.datasets.get(name)
    }

    /// Schema for a dataset. Declared datasets without columns get the
    /// pass-through schema; undeclared names are `NotFound`.
    pub fn schema_for(&self, name: &str) -> Result<&Schema, SchemaError> {
        self.datasets
            .get(name)
            .map(|d| &d.schema)
            .ok_or_else(|| SchemaError::NotFound(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.datasets.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.datasets.keys().map(String::as_str)
    }

    pub fn definitions(&self) -> impl Iterator<Item = &DatasetDefinition> {
        self.datasets.values()
    }
}
