//! CSV encoding of tables exchanged with the object store

use crate::error::{PipelineError, Result};
use polars::prelude::*;
use std::io::Cursor;
use tracing::debug;

/// Parse comma-separated bytes with a header row.
///
/// Column types are inferred from every row so a late non-integer value
/// cannot break an integer guess made from a prefix.
pub fn read_csv_bytes(bytes: &[u8]) -> Result<DataFrame> {
    let df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(None)
        .into_reader_with_file_handle(Cursor::new(bytes.to_vec()))
        .finish()
        .map_err(|e| PipelineError::MalformedInput {
            column: "<csv>".to_string(),
            row: None,
            reason: e.to_string(),
        })?;

    debug!(rows = df.height(), columns = df.width(), "CSV parsed");
    Ok(df)
}

/// Serialize a table as comma-separated bytes with a header row
pub fn write_csv_bytes(df: &mut DataFrame) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    CsvWriter::new(&mut buffer)
        .include_header(true)
        .finish(df)
        .map_err(|e| PipelineError::StorageAccess(format!("CSV encoding failed: {}", e)))?;
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_infers_types() {
        let df = read_csv_bytes(b"BMI,Smoking,AgeCategory\n28.5,Yes,55-59\n31.0,No,80 or older\n").unwrap();
        assert_eq!(df.height(), 2);
        assert_eq!(df.column("BMI").unwrap().dtype(), &DataType::Float64);
        assert_eq!(df.column("Smoking").unwrap().dtype(), &DataType::String);
    }

    #[test]
    fn test_write_keeps_header_and_order() {
        let mut df = DataFrame::new(vec![
            Series::new("BMI".into(), vec![28.5, 31.0]).into(),
            Series::new("Age".into(), vec![55i64, 80]).into(),
        ])
        .unwrap();
        let bytes = write_csv_bytes(&mut df).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert_eq!(text.lines().next(), Some("BMI,Age"));
        assert_eq!(text.lines().nth(1), Some("28.5,55"));
    }

    #[test]
    fn test_read_back_written_table() {
        let mut df = DataFrame::new(vec![
            Series::new("BMI".into(), vec![28.5, 31.25]).into(),
            Series::new("HeartDisease".into(), vec![0i64, 1]).into(),
        ])
        .unwrap();
        let parsed = read_csv_bytes(&write_csv_bytes(&mut df).unwrap()).unwrap();
        assert!(parsed.equals(&df));
    }
}
