//! Outlier capping using the interquartile range
//!
//! Only the upper tail is treated: values above `Q3 + 1.5 * IQR` are replaced
//! by that bound, everything else is left as-is.

use polars::prelude::*;

use crate::error::{PipelineError, Result};

/// Multiplier applied to the IQR to obtain the capping bound
pub const IQR_MULTIPLIER: f64 = 1.5;

/// Result of capping a single column
#[derive(Debug, Clone, PartialEq)]
pub struct CappedColumn {
    pub column: String,
    /// Upper bound computed on the column before capping
    pub upper_bound: f64,
    /// Number of values that were lowered to the bound
    pub capped: usize,
}

/// Quantile of pre-sorted values using linear interpolation between the two
/// closest ranks (position `q * (n - 1)`).
///
/// Returns `None` for an empty slice.
pub fn quantile(sorted: &[f64], q: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let pos = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lower = pos.floor() as usize;
    let upper = pos.ceil() as usize;
    let frac = pos - lower as f64;
    Some(sorted[lower] + (sorted[upper] - sorted[lower]) * frac)
}

/// Upper capping bound `Q3 + 1.5 * IQR` for a set of values.
///
/// NaN values are ignored. Returns `None` when no finite value remains.
pub fn iqr_upper_bound(values: &[f64]) -> Option<f64> {
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let q1 = quantile(&sorted, 0.25)?;
    let q3 = quantile(&sorted, 0.75)?;
    Some(q3 + IQR_MULTIPLIER * (q3 - q1))
}

/// Cap values at `bound`. Returns the capped values and how many changed.
pub fn cap_values(values: &[Option<f64>], bound: f64) -> (Vec<Option<f64>>, usize) {
    let mut capped = 0usize;
    let out = values
        .iter()
        .map(|v| match v {
            Some(x) if *x > bound => {
                capped += 1;
                Some(bound)
            }
            other => *other,
        })
        .collect();
    (out, capped)
}

/// Read a numeric column as `Option<f64>` values.
fn numeric_values(df: &DataFrame, column_name: &str) -> Result<Vec<Option<f64>>> {
    let column = df.column(column_name).map_err(|_| {
        PipelineError::SchemaMismatch(format!(
            "Outlier column '{}' not found in data",
            column_name
        ))
    })?;

    if !column.dtype().is_primitive_numeric() {
        return Err(PipelineError::SchemaMismatch(format!(
            "Outlier column '{}' must be numeric, found {}",
            column_name,
            column.dtype()
        )));
    }

    let float_col = column.cast(&DataType::Float64)?;
    Ok(float_col.f64()?.into_iter().collect())
}

/// Cap one column in place and report what happened.
pub fn cap_column(df: &mut DataFrame, column_name: &str) -> Result<CappedColumn> {
    let values = numeric_values(df, column_name)?;
    let present: Vec<f64> = values.iter().filter_map(|v| *v).collect();

    let Some(upper_bound) = iqr_upper_bound(&present) else {
        tracing::warn!(column = column_name, "column has no values, skipping outlier capping");
        return Ok(CappedColumn {
            column: column_name.to_string(),
            upper_bound: f64::NAN,
            capped: 0,
        });
    };

    let (capped_values, capped) = cap_values(&values, upper_bound);
    df.with_column(Series::new(column_name.into(), capped_values))?;

    tracing::debug!(column = column_name, upper_bound, capped, "outliers capped");

    Ok(CappedColumn {
        column: column_name.to_string(),
        upper_bound,
        capped,
    })
}

/// Cap upper outliers in each configured column.
///
/// Columns are rewritten as Float64. Fails on a missing or non-numeric column.
pub fn cap_outliers(mut df: DataFrame, outlier_columns: &[String]) -> Result<(DataFrame, Vec<CappedColumn>)> {
    tracing::info!("outlier removal initiated");

    let mut report = Vec::with_capacity(outlier_columns.len());
    for column_name in outlier_columns {
        report.push(cap_column(&mut df, column_name)?);
    }

    tracing::info!(shape = ?df.shape(), "all outliers have been capped");
    Ok((df, report))
}
