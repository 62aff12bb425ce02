//! Feature transformation: min-max scaling and one-hot encoding
//!
//! The fitted [`FittedTransformer`] is the composite of a [`MinMaxScaler`] over
//! the numeric columns and a [`OneHotEncoder`] over the nominal columns. Its
//! output columns are the numeric names in order followed by the generated
//! one-hot names.

use std::collections::{BTreeSet, HashSet};
use std::path::Path;

use polars::prelude::*;
use serde::{Deserialize, Serialize};

use super::artifact::{load_artifact, save_artifact, ArtifactKind};
use super::columns::{
    coerce_nominal_columns, nominal_column_values, numeric_column_values, ColumnPartition,
};
use crate::config::DataTransformationConfig;
use crate::error::{PipelineError, Result};

/// Per-column min-max scaling to [0, 1].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MinMaxScaler {
    pub columns: Vec<String>,
    /// Minimum of each column seen during fit
    pub data_min: Vec<f64>,
    /// Maximum of each column seen during fit
    pub data_max: Vec<f64>,
}

impl MinMaxScaler {
    /// Learn min and max of each column. `values[i]` holds column `i`.
    pub fn fit(columns: &[String], values: &[Vec<f64>]) -> Result<Self> {
        let mut data_min = Vec::with_capacity(columns.len());
        let mut data_max = Vec::with_capacity(columns.len());

        for (name, column) in columns.iter().zip(values) {
            if column.is_empty() {
                return Err(PipelineError::InvalidData(format!(
                    "Cannot fit scaler on empty column '{}'",
                    name
                )));
            }
            let min = column.iter().copied().fold(f64::INFINITY, f64::min);
            let max = column.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            if !min.is_finite() || !max.is_finite() {
                return Err(PipelineError::InvalidData(format!(
                    "Column '{}' contains non-finite values",
                    name
                )));
            }
            data_min.push(min);
            data_max.push(max);
        }

        Ok(Self {
            columns: columns.to_vec(),
            data_min,
            data_max,
        })
    }

    /// Scale a value of column `index`.
    ///
    /// A constant column has range 0 and is scaled by 1, so it maps to 0.
    /// Values outside the fitted range are not clipped.
    pub fn scale(&self, index: usize, value: f64) -> f64 {
        let min = self.data_min[index];
        let range = self.data_max[index] - min;
        if range == 0.0 {
            value - min
        } else {
            (value - min) / range
        }
    }
}

/// One-hot encoding with the drop-if-binary rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OneHotEncoder {
    pub columns: Vec<String>,
    /// Sorted categories of each column
    pub categories: Vec<Vec<String>>,
}

impl OneHotEncoder {
    /// Learn the sorted vocabulary of each column. `values[i]` holds column `i`.
    pub fn fit(columns: &[String], values: &[Vec<String>]) -> Result<Self> {
        let mut categories = Vec::with_capacity(columns.len());

        for (name, column) in columns.iter().zip(values) {
            let unique: BTreeSet<&String> = column.iter().collect();
            if unique.is_empty() {
                return Err(PipelineError::InvalidData(format!(
                    "Cannot fit encoder on empty column '{}'",
                    name
                )));
            }
            let mut sorted: Vec<String> = unique.into_iter().cloned().collect();
            sort_categories(&mut sorted);
            categories.push(sorted);
        }

        Ok(Self {
            columns: columns.to_vec(),
            categories,
        })
    }

    /// A column with exactly two categories collapses to one indicator
    fn is_binary(&self, index: usize) -> bool {
        self.categories[index].len() == 2
    }

    /// Categories that produce an output column for column `index`
    fn encoded_categories(&self, index: usize) -> &[String] {
        let cats = &self.categories[index];
        if self.is_binary(index) {
            &cats[1..]
        } else {
            cats
        }
    }

    /// Output column names, `"{column}_{category}"`.
    pub fn feature_names(&self) -> Vec<String> {
        self.columns
            .iter()
            .enumerate()
            .flat_map(|(i, name)| {
                self.encoded_categories(i)
                    .iter()
                    .map(move |cat| format!("{}_{}", name, cat))
            })
            .collect()
    }

    /// Number of output columns produced for column `index`
    pub fn output_width(&self, index: usize) -> usize {
        self.encoded_categories(index).len()
    }

    /// Encode one value of column `index`, appending indicators to `out`.
    pub fn encode_into(&self, index: usize, value: &str, out: &mut Vec<f64>) -> Result<()> {
        if !self.categories[index].iter().any(|c| c == value) {
            return Err(PipelineError::SchemaMismatch(format!(
                "Unknown category '{}' for nominal column '{}'. Known categories: {:?}",
                value, self.columns[index], self.categories[index]
            )));
        }
        out.extend(
            self.encoded_categories(index)
                .iter()
                .map(|c| if c == value { 1.0 } else { 0.0 }),
        );
        Ok(())
    }
}

/// Numeric-looking categories sort by value, everything else lexically.
fn sort_categories(categories: &mut [String]) {
    let all_numeric = categories.iter().all(|c| c.parse::<f64>().is_ok());
    if all_numeric {
        categories.sort_by(|a, b| {
            let x: f64 = a.parse().unwrap_or(f64::NAN);
            let y: f64 = b.parse().unwrap_or(f64::NAN);
            // Equal values spelled differently ("1", "01") fall back to text order
            x.total_cmp(&y).then_with(|| a.cmp(b))
        });
    } else {
        categories.sort();
    }
}

/// Composite transformer fitted on the training table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedTransformer {
    pub partition: ColumnPartition,
    /// Target column removed before fitting
    pub target: String,
    pub scaler: MinMaxScaler,
    pub encoder: OneHotEncoder,
    /// Output column names, numeric first then one-hot
    pub feature_names: Vec<String>,
}

impl FittedTransformer {
    /// Fit on `df` (which still contains the target) using `partition`.
    pub fn fit(df: &DataFrame, target: &str, partition: ColumnPartition) -> Result<Self> {
        if df.height() == 0 {
            return Err(PipelineError::InvalidData(
                "Cannot fit transformer on an empty table".to_string(),
            ));
        }
        if partition.is_empty() {
            return Err(PipelineError::InvalidData(
                "No feature columns left after removing the target".to_string(),
            ));
        }

        let numeric_values = partition
            .numeric
            .iter()
            .map(|name| numeric_column_values(df, name))
            .collect::<Result<Vec<_>>>()?;
        let nominal_values = partition
            .nominal
            .iter()
            .map(|name| nominal_column_values(df, name))
            .collect::<Result<Vec<_>>>()?;

        let scaler = MinMaxScaler::fit(&partition.numeric, &numeric_values)?;
        let encoder = OneHotEncoder::fit(&partition.nominal, &nominal_values)?;

        let mut feature_names = partition.numeric.clone();
        feature_names.extend(encoder.feature_names());

        let target_name = target.to_string();
        let mut seen = HashSet::new();
        for name in feature_names.iter().chain(std::iter::once(&target_name)) {
            if !seen.insert(name.clone()) {
                return Err(PipelineError::SchemaMismatch(format!(
                    "Transformed column name '{}' is produced twice",
                    name
                )));
            }
        }

        Ok(Self {
            partition,
            target: target.to_string(),
            scaler,
            encoder,
            feature_names,
        })
    }

    /// Number of output features
    pub fn n_features_out(&self) -> usize {
        self.feature_names.len()
    }

    /// Transform to row-major feature vectors.
    ///
    /// Columns are looked up by name, so column order in `df` is irrelevant and
    /// extra columns (such as the target) are ignored.
    pub fn transform_rows(&self, df: &DataFrame) -> Result<Vec<Vec<f64>>> {
        let numeric_values = self
            .partition
            .numeric
            .iter()
            .map(|name| numeric_column_values(df, name))
            .collect::<Result<Vec<_>>>()?;
        let nominal_values = self
            .partition
            .nominal
            .iter()
            .map(|name| nominal_column_values(df, name))
            .collect::<Result<Vec<_>>>()?;

        let n_rows = df.height();
        let mut rows = Vec::with_capacity(n_rows);
        for row in 0..n_rows {
            let mut features = Vec::with_capacity(self.n_features_out());
            for (i, column) in numeric_values.iter().enumerate() {
                features.push(self.scaler.scale(i, column[row]));
            }
            for (i, column) in nominal_values.iter().enumerate() {
                self.encoder.encode_into(i, &column[row], &mut features)?;
            }
            rows.push(features);
        }

        Ok(rows)
    }

    /// Transform to a dense Float64 table with the output column names.
    pub fn transform(&self, df: &DataFrame) -> Result<DataFrame> {
        let rows = self.transform_rows(df)?;
        let columns: Vec<Column> = self
            .feature_names
            .iter()
            .enumerate()
            .map(|(j, name)| {
                let values: Vec<f64> = rows.iter().map(|r| r[j]).collect();
                Column::new(name.as_str().into(), values)
            })
            .collect();

        Ok(DataFrame::new(columns)?)
    }

    /// Persist to `path`, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<()> {
        save_artifact(path, ArtifactKind::Transformer, self)
    }

    /// Load a transformer written by [`FittedTransformer::save`].
    pub fn load(path: &Path) -> Result<Self> {
        Ok(load_artifact(path, ArtifactKind::Transformer)?.payload)
    }
}

/// Fit the transformer and return the transformed table with the original
/// target column reattached as the last column.
///
/// `df` must already have its nominal columns coerced to strings. The
/// configured partition and the type-inferred partition must agree.
pub fn fit_transform(
    df: &DataFrame,
    target: &str,
    nominal_columns: &[String],
) -> Result<(DataFrame, FittedTransformer)> {
    let partition = ColumnPartition::resolve(df, Some(target), nominal_columns)?;
    let inferred = ColumnPartition::infer(df, Some(target))?;
    if partition != inferred {
        return Err(PipelineError::SchemaMismatch(format!(
            "Column types do not match the nominal configuration: {}",
            inferred.differences(&partition).join("; ")
        )));
    }

    tracing::info!(
        numeric = partition.numeric.len(),
        nominal = partition.nominal.len(),
        "separated numerical and categorical data"
    );

    let transformer = FittedTransformer::fit(df, target, partition)?;
    let mut transformed = transformer.transform(df)?;
    transformed.with_column(df.column(target)?.clone())?;

    tracing::info!(shape = ?transformed.shape(), "data has been transformed");
    Ok((transformed, transformer))
}

/// Transformation stage: coerce nominal columns, fit, transform and persist.
pub fn transform_data(df: DataFrame, config: &DataTransformationConfig) -> Result<(DataFrame, FittedTransformer)> {
    let df = coerce_nominal_columns(df, &config.nominal_columns)?;
    let (transformed, transformer) = fit_transform(&df, &config.target, &config.nominal_columns)?;

    transformer.save(&config.transformer_pickle)?;
    tracing::info!("transformer object saved");

    Ok((transformed, transformer))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_equal_numeric_spellings_have_fixed_order() {
        let column = names(&["2", "1.0", "01", "1", "2", "01"]);
        let encoder = OneHotEncoder::fit(&names(&["code"]), &[column.clone()]).unwrap();
        assert_eq!(encoder.categories[0], names(&["01", "1", "1.0", "2"]));

        let mut reversed = column;
        reversed.reverse();
        let again = OneHotEncoder::fit(&names(&["code"]), &[reversed]).unwrap();
        assert_eq!(again.feature_names(), encoder.feature_names());
    }

    #[test]
    fn test_minmax_constant_column_maps_to_zero() {
        let scaler = MinMaxScaler::fit(&names(&["c"]), &[vec![4.0, 4.0]]).unwrap();
        assert_eq!(scaler.scale(0, 4.0), 0.0);
    }

    #[test]
    fn test_minmax_does_not_clip() {
        let scaler = MinMaxScaler::fit(&names(&["x"]), &[vec![0.0, 10.0]]).unwrap();
        assert_eq!(scaler.scale(0, 20.0), 2.0);
        assert_eq!(scaler.scale(0, -5.0), -0.5);
    }

    #[test]
    fn test_numeric_categories_sorted_by_value() {
        let values = vec![names(&["10", "2", "1", "2"])];
        let encoder = OneHotEncoder::fit(&names(&["purpose"]), &values).unwrap();
        assert_eq!(encoder.categories[0], names(&["1", "2", "10"]));
        assert_eq!(
            encoder.feature_names(),
            names(&["purpose_1", "purpose_2", "purpose_10"])
        );
    }

    #[test]
    fn test_binary_column_keeps_second_category() {
        let values = vec![names(&["B", "A", "A"])];
        let encoder = OneHotEncoder::fit(&names(&["flag"]), &values).unwrap();
        assert_eq!(encoder.feature_names(), names(&["flag_B"]));

        let mut out = Vec::new();
        encoder.encode_into(0, "A", &mut out).unwrap();
        encoder.encode_into(0, "B", &mut out).unwrap();
        assert_eq!(out, vec![0.0, 1.0]);
    }

    #[test]
    fn test_single_category_column_keeps_its_column() {
        let encoder = OneHotEncoder::fit(&names(&["one"]), &[names(&["x", "x"])]).unwrap();
        assert_eq!(encoder.output_width(0), 1);
    }

    #[test]
    fn test_unknown_category_is_schema_mismatch() {
        let encoder = OneHotEncoder::fit(&names(&["c"]), &[names(&["a", "b", "c"])]).unwrap();
        let mut out = Vec::new();
        let err = encoder.encode_into(0, "z", &mut out).unwrap_err();
        assert!(matches!(err, PipelineError::SchemaMismatch(_)));
    }

    #[test]
    fn test_fit_transform_rejects_undeclared_string_column() {
        let df = df! {
            "amount" => [1.0f64, 2.0],
            "city" => ["a", "b"],
            "label" => [0i32, 1],
        }
        .unwrap();
        let err = fit_transform(&df, "label", &[]).unwrap_err();
        assert!(matches!(err, PipelineError::SchemaMismatch(_)));
    }

    #[test]
    fn test_fit_transform_detects_uncoerced_nominal_column() {
        let df = df! {
            "amount" => [1.0f64, 2.0],
            "purpose" => [1i64, 2],
            "label" => [0i32, 1],
        }
        .unwrap();
        let err = fit_transform(&df, "label", &names(&["purpose"])).unwrap_err();
        assert!(err.to_string().contains("do not match"));
    }
}
