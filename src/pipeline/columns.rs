//! Column typing helpers shared by training and prediction
//!
//! Nominal columns are rendered as strings before encoding, and the split of
//! feature columns into numeric and nominal groups is captured once in a
//! [`ColumnPartition`] that the fitted transformer carries with it.

use std::collections::BTreeSet;

use polars::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};

/// Whether a column can be fed to the numeric scaler
pub fn is_numeric_dtype(dtype: &DataType) -> bool {
    dtype.is_primitive_numeric() || matches!(dtype, DataType::Boolean)
}

/// Render a column as category labels.
///
/// Integral floats render without a fractional part (`2.0` → `"2"`), so a code
/// read as Int64 in one file and Float64 in another maps to the same label.
pub fn category_labels(col: &Column) -> Result<Vec<Option<String>>> {
    let values: Vec<Option<String>> = match col.dtype() {
        DataType::String => col
            .str()?
            .into_iter()
            .map(|v| v.map(|s| s.to_string()))
            .collect(),
        DataType::Int8 | DataType::Int16 | DataType::Int32 | DataType::Int64 => {
            let cast = col.cast(&DataType::Int64)?;
            cast.i64()?
                .into_iter()
                .map(|v| v.map(|n| n.to_string()))
                .collect()
        }
        DataType::UInt8 | DataType::UInt16 | DataType::UInt32 | DataType::UInt64 => {
            let cast = col.cast(&DataType::UInt64)?;
            cast.u64()?
                .into_iter()
                .map(|v| v.map(|n| n.to_string()))
                .collect()
        }
        DataType::Float32 | DataType::Float64 => {
            let cast = col.cast(&DataType::Float64)?;
            cast.f64()?
                .into_iter()
                .map(|v| v.map(|n| format!("{}", n)))
                .collect()
        }
        DataType::Boolean => col
            .bool()?
            .into_iter()
            .map(|v| v.map(|b| b.to_string()))
            .collect(),
        _ => {
            let cast = col.cast(&DataType::String)?;
            cast.str()?
                .into_iter()
                .map(|v| v.map(|s| s.to_string()))
                .collect()
        }
    };

    Ok(values)
}

/// Read a numeric column as `f64`, failing on nulls or non-numeric data.
pub fn numeric_column_values(df: &DataFrame, name: &str) -> Result<Vec<f64>> {
    let column = df.column(name).map_err(|_| {
        PipelineError::SchemaMismatch(format!("Column '{}' not found in data", name))
    })?;

    if !is_numeric_dtype(column.dtype()) {
        return Err(PipelineError::SchemaMismatch(format!(
            "Column '{}' must be numeric, found {}",
            name,
            column.dtype()
        )));
    }

    let cast = column.cast(&DataType::Float64)?;
    cast.f64()?
        .into_iter()
        .enumerate()
        .map(|(row, v)| {
            v.ok_or_else(|| {
                PipelineError::SchemaMismatch(format!(
                    "Column '{}' has a missing value at row {}",
                    name, row
                ))
            })
        })
        .collect()
}

/// Read a nominal column as category labels, failing on nulls.
pub fn nominal_column_values(df: &DataFrame, name: &str) -> Result<Vec<String>> {
    let column = df.column(name).map_err(|_| {
        PipelineError::SchemaMismatch(format!("Column '{}' not found in data", name))
    })?;

    category_labels(column)?
        .into_iter()
        .enumerate()
        .map(|(row, v)| {
            v.ok_or_else(|| {
                PipelineError::SchemaMismatch(format!(
                    "Column '{}' has a missing value at row {}",
                    name, row
                ))
            })
        })
        .collect()
}

/// Recast each nominal column as a String column of category labels.
pub fn coerce_nominal_columns(mut df: DataFrame, nominal_columns: &[String]) -> Result<DataFrame> {
    tracing::info!("converting nominal categorical columns to string type");

    for name in nominal_columns {
        let column = df.column(name).map_err(|_| {
            PipelineError::SchemaMismatch(format!("Nominal column '{}' not found in data", name))
        })?;
        if column.dtype() == &DataType::String {
            continue;
        }
        let labels = category_labels(column)?;
        df.with_column(Series::new(name.as_str().into(), labels))?;
    }

    tracing::info!("data type conversion is complete");
    Ok(df)
}

/// Split of feature columns into numeric and nominal groups, in table order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnPartition {
    pub numeric: Vec<String>,
    pub nominal: Vec<String>,
}

impl ColumnPartition {
    /// Derive the partition from the configured nominal list.
    ///
    /// Every column other than `target` that is not declared nominal must be
    /// numeric. Pass `None` as target for prediction rows.
    pub fn resolve(df: &DataFrame, target: Option<&str>, nominal_columns: &[String]) -> Result<Self> {
        let names: Vec<String> = df.get_column_names().iter().map(|s| s.to_string()).collect();

        if let Some(target) = target {
            if !names.iter().any(|n| n == target) {
                return Err(PipelineError::SchemaMismatch(format!(
                    "Target column '{}' not found. Available columns: {:?}",
                    target, names
                )));
            }
        }

        for nominal in nominal_columns {
            if !names.contains(nominal) {
                return Err(PipelineError::SchemaMismatch(format!(
                    "Nominal column '{}' not found. Available columns: {:?}",
                    nominal, names
                )));
            }
        }

        let mut partition = ColumnPartition {
            numeric: Vec::new(),
            nominal: Vec::new(),
        };

        for name in names {
            if Some(name.as_str()) == target {
                continue;
            }
            if nominal_columns.contains(&name) {
                partition.nominal.push(name);
                continue;
            }
            let dtype = df.column(&name)?.dtype().clone();
            if !is_numeric_dtype(&dtype) {
                return Err(PipelineError::SchemaMismatch(format!(
                    "Column '{}' is neither numeric nor declared nominal (type {})",
                    name, dtype
                )));
            }
            partition.numeric.push(name);
        }

        Ok(partition)
    }

    /// Partition purely by column type: strings are nominal, numbers numeric.
    pub fn infer(df: &DataFrame, target: Option<&str>) -> Result<Self> {
        let mut partition = ColumnPartition {
            numeric: Vec::new(),
            nominal: Vec::new(),
        };

        for column in df.get_columns() {
            let name = column.name().to_string();
            if Some(name.as_str()) == target {
                continue;
            }
            match column.dtype() {
                DataType::String => partition.nominal.push(name),
                dtype if is_numeric_dtype(dtype) => partition.numeric.push(name),
                dtype => {
                    return Err(PipelineError::SchemaMismatch(format!(
                        "Column '{}' has unsupported type {}",
                        name, dtype
                    )))
                }
            }
        }

        Ok(partition)
    }

    /// Total number of feature columns
    pub fn len(&self) -> usize {
        self.numeric.len() + self.nominal.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Same columns in the same groups, regardless of column order.
    pub fn conforms_to(&self, expected: &ColumnPartition) -> bool {
        self.differences(expected).is_empty()
    }

    /// Human-readable list of differences against `expected`.
    pub fn differences(&self, expected: &ColumnPartition) -> Vec<String> {
        let mut out = Vec::new();
        diff_group("numeric", &self.numeric, &expected.numeric, &mut out);
        diff_group("nominal", &self.nominal, &expected.nominal, &mut out);
        out
    }
}

fn diff_group(group: &str, actual: &[String], expected: &[String], out: &mut Vec<String>) {
    let actual: BTreeSet<&String> = actual.iter().collect();
    let expected: BTreeSet<&String> = expected.iter().collect();

    for missing in expected.difference(&actual) {
        out.push(format!("expected {} column '{}' is missing", group, missing));
    }
    for extra in actual.difference(&expected) {
        out.push(format!("unexpected {} column '{}'", group, extra));
    }
}
