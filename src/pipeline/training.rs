//! Model training stage
//!
//! Evaluates the configured classifier on a stratified split, then refits a
//! fresh instance on every row and persists that refit. The metrics in the
//! returned report therefore describe the evaluated model, not the saved one.

use std::path::{Path, PathBuf};

use polars::prelude::*;
use serde::{Deserialize, Serialize};

use super::artifact::{load_artifact, save_artifact, ArtifactKind};
use super::columns::numeric_column_values;
use super::split::stratified_split;
use crate::config::ModelTrainingConfig;
use crate::error::{PipelineError, Result};
use crate::model::{Classifier, ClassificationMetrics, ClassifierKind, Estimator};

/// Persisted model: the fitted classifier and the features it expects.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FittedModel {
    pub classifier: Classifier,
    /// Feature columns in the order the classifier consumes them
    pub feature_names: Vec<String>,
    /// Rows the classifier was fitted on
    pub n_samples: usize,
}

impl FittedModel {
    pub fn kind(&self) -> ClassifierKind {
        self.classifier.kind()
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        save_artifact(path, ArtifactKind::Model, self)
    }

    pub fn load(path: &Path) -> Result<Self> {
        Ok(load_artifact(path, ArtifactKind::Model)?.payload)
    }
}

/// Outcome of a training run
#[derive(Debug, Clone, Serialize)]
pub struct TrainingReport {
    pub classifier: ClassifierKind,
    pub train: ClassificationMetrics,
    pub test: ClassificationMetrics,
    pub n_train: usize,
    pub n_test: usize,
    pub n_features: usize,
    pub model_path: PathBuf,
}

/// Row-major features of every column except `target`, with their names.
pub fn feature_matrix(df: &DataFrame, target: &str) -> Result<(Vec<Vec<f64>>, Vec<String>)> {
    let names: Vec<String> = df
        .get_column_names()
        .into_iter()
        .filter(|name| name.as_str() != target)
        .map(|name| name.to_string())
        .collect();
    if names.is_empty() {
        return Err(PipelineError::InvalidData(
            "No feature columns besides the target".to_string(),
        ));
    }

    let columns = names
        .iter()
        .map(|name| numeric_column_values(df, name))
        .collect::<Result<Vec<_>>>()?;

    let rows = (0..df.height())
        .map(|row| columns.iter().map(|col| col[row]).collect())
        .collect();
    Ok((rows, names))
}

/// Read the target as 0/1 labels (integer, float or boolean column).
pub fn binary_labels(df: &DataFrame, target: &str) -> Result<Vec<u8>> {
    let column = df.column(target).map_err(|_| {
        PipelineError::SchemaMismatch(format!("Target column '{}' not found in data", target))
    })?;
    let values = column.cast(&DataType::Float64).map_err(|_| {
        PipelineError::InvalidData(format!(
            "Target column '{}' of type {} cannot be read as 0/1 labels",
            target,
            column.dtype()
        ))
    })?;

    values
        .f64()?
        .into_iter()
        .enumerate()
        .map(|(row, v)| match v {
            Some(v) if v == 0.0 => Ok(0),
            Some(v) if v == 1.0 => Ok(1),
            Some(v) => Err(PipelineError::InvalidData(format!(
                "Target column '{}' must be binary 0/1, found {} at row {}",
                target, v, row
            ))),
            None => Err(PipelineError::InvalidData(format!(
                "Target column '{}' has a missing value at row {}",
                target, row
            ))),
        })
        .collect()
}

fn take_rows<T: Clone>(values: &[T], indices: &[usize]) -> Vec<T> {
    indices.iter().map(|&i| values[i].clone()).collect()
}

/// Training stage on the transformed table.
pub fn train_model(df: &DataFrame, config: &ModelTrainingConfig) -> Result<TrainingReport> {
    // Selection is checked before any work so a typo never leaves a model behind
    let kind: ClassifierKind = config.classifier.parse()?;
    let build = || Classifier::from_params(kind, &config.param_grid, config.random_state);
    let mut evaluated = build()?;

    let (x, feature_names) = feature_matrix(df, &config.target)?;
    let y = binary_labels(df, &config.target)?;

    let split = stratified_split(&y, config.test_size, config.random_state)?;
    let (x_train, y_train) = (take_rows(&x, &split.train), take_rows(&y, &split.train));
    let (x_test, y_test) = (take_rows(&x, &split.test), take_rows(&y, &split.test));
    tracing::info!(
        train_rows = x_train.len(),
        test_rows = x_test.len(),
        "data split into train and test"
    );

    tracing::info!(classifier = %kind, "training model");
    evaluated.fit(&x_train, &y_train)?;

    let train = ClassificationMetrics::compute(&y_train, &evaluated.predict(&x_train));
    let test = ClassificationMetrics::compute(&y_test, &evaluated.predict(&x_test));
    tracing::info!(
        accuracy = train.accuracy,
        precision = train.precision,
        recall = train.recall,
        f1 = train.f1,
        "train metrics"
    );
    tracing::info!(
        accuracy = test.accuracy,
        precision = test.precision,
        recall = test.recall,
        f1 = test.f1,
        "test metrics"
    );

    let mut final_classifier = build()?;
    final_classifier.fit(&x, &y)?;
    let model = FittedModel {
        classifier: final_classifier,
        feature_names,
        n_samples: x.len(),
    };
    model.save(&config.model_artifact_dir)?;
    tracing::info!(rows = model.n_samples, "model refit on all rows and saved");

    Ok(TrainingReport {
        classifier: kind,
        train,
        test,
        n_train: split.train.len(),
        n_test: split.test.len(),
        n_features: model.feature_names.len(),
        model_path: config.model_artifact_dir.clone(),
    })
}
