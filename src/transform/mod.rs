//! Row-to-columnar transformation
//!
//! Turns the bytes of one delimited text object into one Parquet object:
//!
//! 1. parse the bytes into a [`RowBatch`] (column names from the header row)
//! 2. cast every column the schema declares, failing the whole object on the
//!    first bad value
//! 3. encode the typed batch, keeping column order and row order
//!
//! The transformer never touches storage.
//!
//! ## Example
//!
//! ```rust,ignore
//! use datalake_etl::schema::{ColumnSpec, ColumnType, Schema};
//! use datalake_etl::transform::Transformer;
//!
//! let schema = Schema::new(vec![ColumnSpec::new("price", ColumnType::Float64)]);
//! let output = Transformer::default().transform(b"product_id,price\nP001,0.50\n", &schema)?;
//! assert_eq!(output.rows, 1);
//! ```

use std::sync::Arc;

use arrow::datatypes::{Field, Schema as ArrowSchema};
use arrow::record_batch::RecordBatch;
use bytes::Bytes;
use thiserror::Error;

mod cast;
pub mod columnar;
mod rows;

pub use rows::RowBatch;

use crate::config::PipelineConfig;
use crate::schema::Schema;

/// Errors raised while transforming one object
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransformError {
    /// Malformed delimited text
    #[error("Malformed row data at line {line}: {reason}")]
    Parse { line: u64, reason: String },

    /// A column the schema declares is absent from the header row
    #[error("Column '{0}' is declared in the schema but missing from the input")]
    MissingColumn(String),

    /// A value could not be cast to its declared type (`row` is 1-based)
    #[error("Cannot cast '{value}' in column '{column}' (row {row}): {reason}")]
    Cast {
        column: String,
        value: String,
        row: usize,
        reason: String,
    },

    /// Columnar encoding failed
    #[error("Columnar encoding failed: {0}")]
    Encode(String),
}

/// Transformer settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransformOptions {
    /// Field delimiter
    pub delimiter: u8,
    /// Infer int64/float64 for columns the schema does not declare
    pub infer_types: bool,
}

impl Default for TransformOptions {
    fn default() -> Self {
        Self {
            delimiter: b',',
            infer_types: true,
        }
    }
}

impl TransformOptions {
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self {
            delimiter: config.pipeline.delimiter as u8,
            infer_types: config.pipeline.infer_types,
        }
    }
}

/// Encoded output of one object
#[derive(Debug, Clone)]
pub struct ColumnarOutput {
    /// Parquet bytes
    pub bytes: Bytes,
    pub rows: usize,
    pub columns: usize,
}

/// Row-to-columnar transformer
#[derive(Debug, Clone, Copy, Default)]
pub struct Transformer {
    options: TransformOptions,
}

impl Transformer {
    pub fn new(options: TransformOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &TransformOptions {
        &self.options
    }

    /// Parse, cast and encode one object
    pub fn transform(
        &self,
        source: &[u8],
        schema: &Schema,
    ) -> Result<ColumnarOutput, TransformError> {
        let rows = RowBatch::parse(source, self.options.delimiter)?;
        let batch = self.to_record_batch(&rows, schema)?;
        let bytes = columnar::encode(&batch)?;

        Ok(ColumnarOutput {
            bytes,
            rows: batch.num_rows(),
            columns: batch.num_columns(),
        })
    }

    /// Apply the schema to a row batch, keeping column and row order
    pub fn to_record_batch(
        &self,
        rows: &RowBatch,
        schema: &Schema,
    ) -> Result<RecordBatch, TransformError> {
        if let Some(missing) = schema
            .columns()
            .iter()
            .find(|c| rows.column_index(&c.name).is_none())
        {
            return Err(TransformError::MissingColumn(missing.name.clone()));
        }

        let mut fields = Vec::with_capacity(rows.num_columns());
        let mut arrays = Vec::with_capacity(rows.num_columns());

        for (index, name) in rows.columns().iter().enumerate() {
            let values = rows.column_values(index);
            let (field, array) = match schema.column(name) {
                Some(spec) => (
                    Field::new(name, spec.column_type.arrow_type(), !spec.required),
                    cast::cast_column(spec, values)?,
                ),
                None => {
                    let array = if self.options.infer_types {
                        cast::infer_column(values)
                    } else {
                        cast::string_column(values)
                    };
                    (Field::new(name, array.data_type().clone(), true), array)
                }
            };
            fields.push(field);
            arrays.push(array);
        }

        RecordBatch::try_new(Arc::new(ArrowSchema::new(fields)), arrays)
            .map_err(|e| TransformError::Encode(e.to_string()))
    }
}

/// Transform with default options
pub fn transform(source: &[u8], schema: &Schema) -> Result<ColumnarOutput, TransformError> {
    Transformer::default().transform(source, schema)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{ColumnSpec, ColumnType};
    use arrow::array::{Array, Float64Array, Int64Array, StringArray};
    use arrow::datatypes::DataType;

    fn orders_schema() -> Schema {
        Schema::new(vec![
            ColumnSpec::new("order_id", ColumnType::String).required(),
            ColumnSpec::new("quantity", ColumnType::Int64).required(),
            ColumnSpec::new("unit_price", ColumnType::Float64),
        ])
    }

    #[test]
    fn test_record_batch_keeps_column_order() {
        let rows = RowBatch::parse(b"unit_price,order_id,quantity\n0.5,ORD-1,2\n", b',').unwrap();
        let batch = Transformer::default()
            .to_record_batch(&rows, &orders_schema())
            .unwrap();

        let names: Vec<_> = batch
            .schema()
            .fields()
            .iter()
            .map(|f| f.name().clone())
            .collect();
        assert_eq!(names, vec!["unit_price", "order_id", "quantity"]);
        assert_eq!(batch.column(2).data_type(), &DataType::Int64);
        assert!(!batch.schema().field(2).is_nullable());
    }

    #[test]
    fn test_missing_declared_column() {
        let rows = RowBatch::parse(b"order_id,quantity\nORD-1,2\n", b',').unwrap();
        let err = Transformer::default()
            .to_record_batch(&rows, &orders_schema())
            .unwrap_err();
        assert_eq!(err, TransformError::MissingColumn("unit_price".to_string()));
    }

    #[test]
    fn test_cast_failure_reports_column_and_value() {
        let err = transform(
            b"order_id,quantity,unit_price\nORD-1,2,0.5\nORD-2,abc,0.5\n",
            &orders_schema(),
        )
        .unwrap_err();

        assert_eq!(
            err,
            TransformError::Cast {
                column: "quantity".to_string(),
                value: "abc".to_string(),
                row: 2,
                reason: "not a number".to_string(),
            }
        );
    }

    #[test]
    fn test_pass_through_infers_types() {
        let rows = RowBatch::parse(b"product_id,price,stock\nP001,0.50,3\n", b',').unwrap();
        let batch = Transformer::default()
            .to_record_batch(&rows, &Schema::pass_through())
            .unwrap();

        assert!(batch.column(0).as_any().downcast_ref::<StringArray>().is_some());
        assert!(batch.column(1).as_any().downcast_ref::<Float64Array>().is_some());
        assert!(batch.column(2).as_any().downcast_ref::<Int64Array>().is_some());
    }

    #[test]
    fn test_pass_through_without_inference_keeps_strings() {
        let transformer = Transformer::new(TransformOptions {
            infer_types: false,
            ..Default::default()
        });
        let rows = RowBatch::parse(b"product_id,price\nP001,0.50\n", b',').unwrap();
        let batch = transformer
            .to_record_batch(&rows, &Schema::pass_through())
            .unwrap();

        let price = batch
            .column(1)
            .as_any()
            .downcast_ref::<StringArray>()
            .unwrap();
        assert_eq!(price.value(0), "0.50");
    }

    #[test]
    fn test_header_only_input_produces_empty_output() {
        let output = transform(b"order_id,quantity,unit_price\n", &orders_schema()).unwrap();
        assert_eq!(output.rows, 0);
        assert_eq!(output.columns, 3);
        assert!(!output.bytes.is_empty());
    }
}
