//! External table definitions
//!
//! Describes how a query engine should expose the processed zone: one
//! external Parquet table per dataset with an auto-detected schema. Date
//! partitioned datasets point at every object below their prefix, reference
//! datasets at their single `ref_data` object. Nothing here talks to a query
//! engine; callers register the definitions or run the generated DDL.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::schema::{DatasetDefinition, Partitioning, REFERENCE_SEGMENT, SchemaRegistry};
use crate::storage::ObjectStore;

/// Analytics dataset the tables are created in by default
pub const DEFAULT_ANALYTICS_DATASET: &str = "supermarket_analytics";

/// Suffix of materialized native copies
pub const NATIVE_SUFFIX: &str = "_native";

/// Error type for catalog construction
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    #[error("No dataset definition for '{0}'")]
    UnknownDataset(String),
}

/// Result type for catalog operations
pub type CatalogResult<T> = Result<T, CatalogError>;

/// One external table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExternalTable {
    /// Table name (the dataset name)
    pub name: String,
    /// `<project>.<analytics dataset>.<name>`
    pub table_id: String,
    pub source_uris: Vec<String>,
    pub format: String,
    pub autodetect: bool,
}

impl ExternalTable {
    /// `CREATE EXTERNAL TABLE` statement (BigQuery dialect)
    pub fn ddl(&self) -> String {
        let uris = self
            .source_uris
            .iter()
            .map(|u| format!("'{}'", u))
            .collect::<Vec<_>>()
            .join(", ");
        format!(
            "CREATE EXTERNAL TABLE IF NOT EXISTS `{}`\nOPTIONS (\n  format = '{}',\n  uris = [{}]\n)",
            self.table_id, self.format, uris
        )
    }

    /// Statement copying the external table into a native one
    pub fn materialize_sql(&self) -> String {
        format!(
            "CREATE OR REPLACE TABLE `{}{}` AS\nSELECT * FROM `{}`",
            self.table_id, NATIVE_SUFFIX, self.table_id
        )
    }
}

/// Builds external table definitions for one project
#[derive(Debug, Clone)]
pub struct Catalog {
    project_id: String,
    analytics_dataset: String,
}

impl Catalog {
    pub fn new(project_id: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            analytics_dataset: DEFAULT_ANALYTICS_DATASET.to_string(),
        }
    }

    pub fn with_analytics_dataset(mut self, analytics_dataset: impl Into<String>) -> Self {
        self.analytics_dataset = analytics_dataset.into();
        self
    }

    /// `<project>.<analytics dataset>`
    pub fn dataset_id(&self) -> String {
        format!("{}.{}", self.project_id, self.analytics_dataset)
    }

    /// Table for one dataset, reading from the processed zone
    pub fn external_table(
        &self,
        definition: &DatasetDefinition,
        processed: &dyn ObjectStore,
        output_suffix: &str,
    ) -> ExternalTable {
        let pattern = match definition.partitioning {
            Partitioning::Date => format!("{}*", definition.prefix),
            Partitioning::Reference => format!(
                "{}{}/{}{}",
                definition.prefix, REFERENCE_SEGMENT, definition.name, output_suffix
            ),
        };

        ExternalTable {
            name: definition.name.clone(),
            table_id: format!("{}.{}", self.dataset_id(), definition.name),
            source_uris: vec![processed.uri(&pattern)],
            format: "PARQUET".to_string(),
            autodetect: true,
        }
    }

    /// Tables for the named datasets, in order
    pub fn external_tables<S: AsRef<str>>(
        &self,
        registry: &SchemaRegistry,
        datasets: &[S],
        processed: &dyn ObjectStore,
        output_suffix: &str,
    ) -> CatalogResult<Vec<ExternalTable>> {
        datasets
            .iter()
            .map(|name| {
                registry
                    .dataset(name.as_ref())
                    .map(|d| self.external_table(d, processed, output_suffix))
                    .ok_or_else(|| CatalogError::UnknownDataset(name.as_ref().to_string()))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{ORDERS, PRODUCTS, STORES};
    use crate::storage::MemoryStore;

    fn tables() -> Vec<ExternalTable> {
        let processed = MemoryStore::new("acme-processed");
        Catalog::new("acme")
            .external_tables(
                &SchemaRegistry::builtin(),
                &[ORDERS, PRODUCTS, STORES],
                &processed,
                ".parquet",
            )
            .unwrap()
    }

    #[test]
    fn test_source_uris_follow_layout() {
        let tables = tables();
        assert_eq!(tables[0].source_uris, vec!["memory://acme-processed/orders/*"]);
        assert_eq!(
            tables[1].source_uris,
            vec!["memory://acme-processed/products/ref_data/products.parquet"]
        );
        assert_eq!(tables[2].table_id, "acme.supermarket_analytics.stores");
        assert!(tables.iter().all(|t| t.format == "PARQUET" && t.autodetect));
    }

    #[test]
    fn test_ddl() {
        let orders = &tables()[0];
        assert_eq!(
            orders.ddl(),
            "CREATE EXTERNAL TABLE IF NOT EXISTS `acme.supermarket_analytics.orders`\n\
             OPTIONS (\n  format = 'PARQUET',\n  uris = ['memory://acme-processed/orders/*']\n)"
        );
        assert!(
            orders
                .materialize_sql()
                .starts_with("CREATE OR REPLACE TABLE `acme.supermarket_analytics.orders_native`")
        );
    }

    #[test]
    fn test_unknown_dataset() {
        let processed = MemoryStore::new("acme-processed");
        let err = Catalog::new("acme")
            .external_tables(&SchemaRegistry::builtin(), &["customers"], &processed, ".parquet")
            .unwrap_err();
        assert_eq!(err, CatalogError::UnknownDataset("customers".to_string()));
    }
}
