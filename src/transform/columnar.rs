//! Columnar (Parquet) encoding

use arrow::record_batch::RecordBatch;
use bytes::Bytes;
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;

use super::TransformError;

/// Encode one record batch as a single Parquet file.
///
/// Writer properties are fixed, so equal batches always encode to equal bytes.
pub fn encode(batch: &RecordBatch) -> Result<Bytes, TransformError> {
    let props = WriterProperties::builder()
        .set_compression(Compression::SNAPPY)
        .build();

    let mut buffer = Vec::new();
    let mut writer = ArrowWriter::try_new(&mut buffer, batch.schema(), Some(props))
        .map_err(|e| TransformError::Encode(e.to_string()))?;
    writer
        .write(batch)
        .map_err(|e| TransformError::Encode(e.to_string()))?;
    writer
        .close()
        .map_err(|e| TransformError::Encode(e.to_string()))?;

    Ok(Bytes::from(buffer))
}
