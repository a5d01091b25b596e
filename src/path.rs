//! Partition path mapping
//!
//! A destination key is the source key with its trailing row-format suffix
//! swapped for the columnar suffix. Every other byte of the key, including the
//! date or `ref_data` partition segment, is copied verbatim:
//!
//! ```text
//! orders/2025-01-01/orders.csv        -> orders/2025-01-01/orders.parquet
//! products/ref_data/products.csv      -> products/ref_data/products.parquet
//! ```
//!
//! Suffix matching is case-sensitive. Only keys ending in the exact input
//! suffix are mapped, so two distinct source keys can never share a
//! destination key.

use crate::config::PipelineConfig;

/// Default raw-zone suffix
pub const CSV_SUFFIX: &str = ".csv";

/// Default processed-zone suffix
pub const PARQUET_SUFFIX: &str = ".parquet";

/// Maps source keys onto destination keys
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathMapper {
    input_suffix: String,
    output_suffix: String,
}

impl Default for PathMapper {
    fn default() -> Self {
        Self::new(CSV_SUFFIX, PARQUET_SUFFIX)
    }
}

impl PathMapper {
    pub fn new(input_suffix: impl Into<String>, output_suffix: impl Into<String>) -> Self {
        Self {
            input_suffix: input_suffix.into(),
            output_suffix: output_suffix.into(),
        }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(
            config.pipeline.input_suffix.clone(),
            config.pipeline.output_suffix.clone(),
        )
    }

    pub fn input_suffix(&self) -> &str {
        &self.input_suffix
    }

    pub fn output_suffix(&self) -> &str {
        &self.output_suffix
    }

    /// Whether a key is a recognized raw input
    pub fn accepts(&self, source_key: &str) -> bool {
        self.stem(source_key, &self.input_suffix).is_some()
    }

    /// Destination key for a source key, or `None` if the key does not carry
    /// the input suffix
    pub fn map_path(&self, source_key: &str) -> Option<String> {
        self.stem(source_key, &self.input_suffix)
            .map(|stem| format!("{}{}", stem, self.output_suffix))
    }

    /// Source key a destination key was mapped from
    pub fn source_path(&self, destination_key: &str) -> Option<String> {
        self.stem(destination_key, &self.output_suffix)
            .map(|stem| format!("{}{}", stem, self.input_suffix))
    }

    /// Key without `suffix`; the file name must not be the bare suffix
    fn stem<'a>(&self, key: &'a str, suffix: &str) -> Option<&'a str> {
        let stem = key.strip_suffix(suffix)?;
        if stem.is_empty() || stem.ends_with('/') {
            return None;
        }
        Some(stem)
    }
}

/// Map a key with the default `.csv` -> `.parquet` suffixes
pub fn map_path(source_key: &str) -> Option<String> {
    PathMapper::default().map_path(source_key)
}

/// Partition segment of a key (the directory holding the file), if any
///
/// `orders/2025-01-01/orders.csv` gives `2025-01-01`;
/// `products/ref_data/products.csv` gives `ref_data`.
pub fn partition_of(key: &str) -> Option<&str> {
    let mut segments = key.rsplit('/');
    segments.next()?;
    let partition = segments.next()?;
    // the dataset segment itself is not a partition
    segments.next()?;
    Some(partition)
}
