//! Shared test utilities and fixture generators
#![allow(dead_code)]

use std::path::{Path, PathBuf};

use polars::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tempfile::TempDir;

pub const TARGET: &str = "Creditability";
pub const NOMINAL: [&str; 3] = ["Account Balance", "Purpose", "Foreign Worker"];
pub const OUTLIER: [&str; 2] = ["Credit Amount", "Age"];

/// Synthetic credit applications with a learnable target.
///
/// Columns:
/// - `Creditability`: 0/1 target, roughly 30% ones
/// - `Account Balance`: nominal code 1..=4, bad applicants skew to 1-2
/// - `Duration`: months, longer for bad applicants
/// - `Credit Amount`: right-skewed amounts with a few large outliers
/// - `Purpose`: nominal code 0..=4, unrelated to the target
/// - `Foreign Worker`: binary nominal code 1/2
/// - `Age`: years
pub fn create_credit_dataframe(rows: usize, seed: u64) -> DataFrame {
    let mut rng = StdRng::seed_from_u64(seed);

    let mut target = Vec::with_capacity(rows);
    let mut account = Vec::with_capacity(rows);
    let mut duration = Vec::with_capacity(rows);
    let mut amount = Vec::with_capacity(rows);
    let mut purpose = Vec::with_capacity(rows);
    let mut foreign = Vec::with_capacity(rows);
    let mut age = Vec::with_capacity(rows);

    for i in 0..rows {
        let bad = rng.gen::<f64>() < 0.3;
        target.push(i64::from(bad));
        account.push(if bad {
            rng.gen_range(1i64..=2)
        } else {
            rng.gen_range(1i64..=4)
        });
        duration.push(if bad {
            rng.gen_range(24i64..=60)
        } else {
            rng.gen_range(6i64..=36)
        });
        let skew = rng.gen::<f64>().powi(3);
        let outlier = if i % 37 == 0 { 40_000.0 } else { 0.0 };
        amount.push(500.0 + skew * 12_000.0 + outlier);
        purpose.push(rng.gen_range(0i64..=4));
        foreign.push(rng.gen_range(1i64..=2));
        age.push(rng.gen_range(19i64..=75));
    }

    df! {
        TARGET => target,
        "Account Balance" => account,
        "Duration" => duration,
        "Credit Amount" => amount,
        "Purpose" => purpose,
        "Foreign Worker" => foreign,
        "Age" => age,
    }
    .unwrap()
}

/// Nominal column list as owned strings
pub fn nominal_columns() -> Vec<String> {
    NOMINAL.iter().map(|s| s.to_string()).collect()
}

/// Create a temporary directory with a test CSV file
pub fn create_temp_csv(df: &mut DataFrame) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let csv_path = temp_dir.path().join("credit.csv");

    let mut file = std::fs::File::create(&csv_path).unwrap();
    CsvWriter::new(&mut file).finish(df).unwrap();

    (temp_dir, csv_path)
}

/// Create a temporary directory with a test Parquet file
pub fn create_temp_parquet(df: &mut DataFrame) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let parquet_path = temp_dir.path().join("credit.parquet");

    let file = std::fs::File::create(&parquet_path).unwrap();
    ParquetWriter::new(file).finish(df).unwrap();

    (temp_dir, parquet_path)
}

/// Artifact paths used by [`write_config`]
pub fn transformer_path(dir: &Path) -> PathBuf {
    dir.join("artifacts").join("transformer.json")
}

pub fn model_path(dir: &Path) -> PathBuf {
    dir.join("artifacts").join("model.json")
}

/// Write a full pipeline configuration into `dir` and return its path.
///
/// `param_grid` is a YAML flow mapping such as `{ n_estimators: 10 }`.
pub fn write_config(dir: &Path, data: &Path, classifier: &str, param_grid: &str) -> PathBuf {
    let yaml = format!(
        r#"data_ingestion:
  source_dir: "{data}"
data_cleaning:
  outlier_columns:
    - Credit Amount
    - Age
data_transformation:
  nominal_columns:
    - Account Balance
    - Purpose
    - Foreign Worker
  target: {target}
  transformer_pickle: "{transformer}"
model_training:
  param_grid: {param_grid}
  test_size: 0.2
  target: {target}
  random_state: 42
  classifier: {classifier}
  model_artifact_dir: "{model}"
prediction:
  transformer_pickle_dir: "{transformer}"
  model_artifact_dir: "{model}"
  nominal_columns:
    - Account Balance
    - Purpose
    - Foreign Worker
"#,
        data = data.display(),
        target = TARGET,
        transformer = transformer_path(dir).display(),
        model = model_path(dir).display(),
        param_grid = param_grid,
        classifier = classifier,
    );

    let path = dir.join("pipeline.yaml");
    std::fs::write(&path, yaml).unwrap();
    path
}

/// `NAME=VALUE` pairs for one applicant, covering every input feature
pub fn applicant_pairs() -> Vec<(String, String)> {
    [
        ("Account Balance", "1"),
        ("Duration", "48"),
        ("Credit Amount", "7500"),
        ("Purpose", "3"),
        ("Foreign Worker", "1"),
        ("Age", "29"),
    ]
    .iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

/// Assert that a DataFrame has expected shape
pub fn assert_shape(df: &DataFrame, expected_rows: usize, expected_cols: usize) {
    let (rows, cols) = df.shape();
    assert_eq!(rows, expected_rows, "Row count mismatch: expected {}, got {}", expected_rows, rows);
    assert_eq!(cols, expected_cols, "Column count mismatch: expected {}, got {}", expected_cols, cols);
}

/// Float64 values of a column
pub fn f64_values(df: &DataFrame, name: &str) -> Vec<f64> {
    df.column(name)
        .unwrap()
        .cast(&DataType::Float64)
        .unwrap()
        .f64()
        .unwrap()
        .into_no_null_iter()
        .collect()
}
