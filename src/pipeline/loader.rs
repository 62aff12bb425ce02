//! Dataset loader for CSV and Parquet files

use std::path::Path;

use polars::prelude::*;

use crate::error::{PipelineError, Result};

/// Build a lazy scan for a file (CSV or Parquet based on extension)
fn scan_dataset(path: &Path, infer_schema_length: usize) -> Result<LazyFrame> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    // 0 means full table scan
    let schema_length = if infer_schema_length == 0 {
        None
    } else {
        Some(infer_schema_length)
    };

    let lf = match extension.as_str() {
        "csv" => LazyCsvReader::new(path)
            .with_has_header(true)
            .with_infer_schema_length(schema_length)
            .finish()
            .map_err(|e| PipelineError::io(path, format!("Failed to load CSV file: {}", e)))?,
        "parquet" => LazyFrame::scan_parquet(path, Default::default())
            .map_err(|e| PipelineError::io(path, format!("Failed to load Parquet file: {}", e)))?,
        _ => {
            return Err(PipelineError::io(
                path,
                format!(
                    "Unsupported file format: '{}'. Supported formats: csv, parquet",
                    extension
                ),
            ))
        }
    };

    Ok(lf)
}

/// Load a dataset into memory.
///
/// # Arguments
/// * `path` - CSV or Parquet file
/// * `infer_schema_length` - Rows used for CSV type inference (0 = full scan)
pub fn load_dataset(path: &Path, infer_schema_length: usize) -> Result<DataFrame> {
    tracing::info!(path = %path.display(), "reading data");

    if !path.exists() {
        return Err(PipelineError::io(path, "File does not exist"));
    }

    let df = scan_dataset(path, infer_schema_length)?
        .collect()
        .map_err(|e| PipelineError::io(path, format!("Failed to read data: {}", e)))?;

    let (rows, cols) = df.shape();
    tracing::info!(rows, cols, "data has been read successfully");

    Ok(df)
}

/// Read only the column names of a dataset (schema, no data)
pub fn get_column_names(path: &Path) -> Result<Vec<String>> {
    let schema = scan_dataset(path, crate::config::DEFAULT_INFER_SCHEMA_LENGTH)?
        .collect_schema()
        .map_err(|e| PipelineError::io(path, format!("Failed to read schema: {}", e)))?;

    Ok(schema.iter_names().map(|s| s.to_string()).collect())
}

/// Estimated in-memory size of a table in megabytes
pub fn estimated_memory_mb(df: &DataFrame) -> f64 {
    df.estimated_size() as f64 / (1024.0 * 1024.0)
}
