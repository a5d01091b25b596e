//! Row batch: delimited text materialized in read order

use super::TransformError;

/// Rows of one source object, as read, with column names from the header row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowBatch {
    columns: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl RowBatch {
    /// Parse delimited text. The first record names the columns.
    pub fn parse(source: &[u8], delimiter: u8) -> Result<Self, TransformError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .delimiter(delimiter)
            .from_reader(source);

        let columns: Vec<String> = reader
            .headers()
            .map_err(|e| parse_error(&e))?
            .iter()
            .map(str::to_string)
            .collect();

        if columns.is_empty() || columns.iter().all(|c| c.trim().is_empty()) {
            return Err(TransformError::Parse {
                line: 1,
                reason: "missing header row".to_string(),
            });
        }
        if let Some(empty) = columns.iter().position(|c| c.trim().is_empty()) {
            return Err(TransformError::Parse {
                line: 1,
                reason: format!("header column {} has no name", empty + 1),
            });
        }
        for (i, name) in columns.iter().enumerate() {
            if columns[..i].contains(name) {
                return Err(TransformError::Parse {
                    line: 1,
                    reason: format!("duplicate column name '{}'", name),
                });
            }
        }

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record.map_err(|e| parse_error(&e))?;
            rows.push(record.iter().map(str::to_string).collect());
        }

        Ok(Self { columns, rows })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Values of one column, in row order
    pub fn column_values(&self, index: usize) -> impl Iterator<Item = &str> + Clone {
        self.rows.iter().map(move |row| row[index].as_str())
    }

    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }
}

fn parse_error(e: &csv::Error) -> TransformError {
    let line = e.position().map(|p| p.line()).unwrap_or(0);
    let reason = match e.kind() {
        csv::ErrorKind::UnequalLengths {
            expected_len, len, ..
        } => format!("expected {} fields, found {}", expected_len, len),
        csv::ErrorKind::Utf8 { .. } => "invalid UTF-8".to_string(),
        _ => e.to_string(),
    };
    TransformError::Parse { line, reason }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_header_and_rows() {
        let batch = RowBatch::parse(b"a,b\n1,x\n2,y\n", b',').unwrap();
        assert_eq!(batch.columns(), &["a", "b"]);
        assert_eq!(batch.num_rows(), 2);
        let b: Vec<_> = batch.column_values(1).collect();
        assert_eq!(b, vec!["x", "y"]);
    }

    #[test]
    fn test_header_only() {
        let batch = RowBatch::parse(b"store_id,location\n", b',').unwrap();
        assert_eq!(batch.num_columns(), 2);
        assert_eq!(batch.num_rows(), 0);
    }

    #[test]
    fn test_empty_input_rejected() {
        let err = RowBatch::parse(b"", b',').unwrap_err();
        assert!(matches!(err, TransformError::Parse { line: 1, .. }));
    }

    #[test]
    fn test_ragged_row_rejected() {
        let err = RowBatch::parse(b"a,b\n1,2\n3\n", b',').unwrap_err();
        match err {
            TransformError::Parse { line, reason } => {
                assert_eq!(line, 3);
                assert!(reason.contains("expected 2 fields"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_duplicate_header_rejected() {
        assert!(RowBatch::parse(b"a,a\n1,2\n", b',').is_err());
    }

    #[test]
    fn test_quoted_fields_and_custom_delimiter() {
        let batch = RowBatch::parse(b"id;location\nS001;\"New York; Downtown\"\n", b';').unwrap();
        let location: Vec<_> = batch.column_values(1).collect();
        assert_eq!(location, vec!["New York; Downtown"]);
    }
}
