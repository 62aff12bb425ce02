//! Prediction path: persisted transformer + persisted model on one row
//!
//! The input row goes through the same nominal coercion as the training table
//! and must resolve to exactly the partition stored in the transformer before
//! it is transformed.

use std::fmt;

use polars::prelude::*;

use super::columns::{coerce_nominal_columns, ColumnPartition};
use super::training::FittedModel;
use super::transform::FittedTransformer;
use crate::config::PredictionConfig;
use crate::error::{PipelineError, Result};
use crate::model::Estimator;

/// Predicted credit class
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PredictionLabel {
    Good,
    Bad,
}

impl PredictionLabel {
    pub fn code(self) -> u8 {
        match self {
            PredictionLabel::Good => 0,
            PredictionLabel::Bad => 1,
        }
    }
}

impl From<u8> for PredictionLabel {
    fn from(code: u8) -> Self {
        if code == 1 {
            PredictionLabel::Bad
        } else {
            PredictionLabel::Good
        }
    }
}

impl fmt::Display for PredictionLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PredictionLabel::Bad => write!(f, "BAD (1)"),
            PredictionLabel::Good => write!(f, "Good (0)"),
        }
    }
}

/// One input field of a prediction row
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Numeric(f64),
    /// Category code of a nominal feature
    Code(String),
}

/// Build a single-row table from ordered `(column, value)` pairs.
pub fn build_input_row(values: &[(String, FieldValue)]) -> Result<DataFrame> {
    if values.is_empty() {
        return Err(PipelineError::SchemaMismatch(
            "Prediction row has no fields".to_string(),
        ));
    }

    let columns: Vec<Column> = values
        .iter()
        .map(|(name, value)| match value {
            FieldValue::Numeric(v) => Column::new(name.as_str().into(), [*v]),
            FieldValue::Code(code) => Column::new(name.as_str().into(), [code.as_str()]),
        })
        .collect();

    Ok(DataFrame::new(columns)?)
}

/// Loaded artifacts plus the configured nominal list
#[derive(Debug, Clone)]
pub struct PredictionPipeline {
    transformer: FittedTransformer,
    model: FittedModel,
    nominal_columns: Vec<String>,
}

impl PredictionPipeline {
    /// Load both artifacts named in the configuration.
    pub fn load(config: &PredictionConfig) -> Result<Self> {
        let settings = &config.prediction;
        let transformer = FittedTransformer::load(&settings.transformer_pickle_dir)?;
        let model = FittedModel::load(&settings.model_artifact_dir)?;

        if model.feature_names != transformer.feature_names {
            return Err(PipelineError::SchemaMismatch(format!(
                "Model was fitted on {} features that differ from the transformer's {} outputs",
                model.feature_names.len(),
                transformer.n_features_out()
            )));
        }

        tracing::info!(
            classifier = %model.kind(),
            features = transformer.n_features_out(),
            "prediction artifacts loaded"
        );
        Ok(Self {
            transformer,
            model,
            nominal_columns: settings.nominal_columns.clone(),
        })
    }

    pub fn transformer(&self) -> &FittedTransformer {
        &self.transformer
    }

    pub fn model(&self) -> &FittedModel {
        &self.model
    }

    /// Type raw `NAME=VALUE` strings using the stored partition.
    ///
    /// Nominal features become codes in the stored vocabulary; every other
    /// field must parse as a number.
    pub fn row_from_pairs(&self, pairs: &[(String, String)]) -> Result<DataFrame> {
        let values = pairs
            .iter()
            .map(|(name, raw)| {
                let value = if self.transformer.partition.nominal.contains(name) {
                    FieldValue::Code(self.canonical_code(name, raw))
                } else {
                    let number = raw.trim().parse::<f64>().map_err(|_| {
                        PipelineError::SchemaMismatch(format!(
                            "Value '{}' for numeric column '{}' is not a number",
                            raw, name
                        ))
                    })?;
                    FieldValue::Numeric(number)
                };
                Ok((name.clone(), value))
            })
            .collect::<Result<Vec<_>>>()?;
        build_input_row(&values)
    }

    /// Spell `raw` the way the fitted vocabulary does.
    ///
    /// A code already in the vocabulary is kept as typed. Otherwise a number
    /// is rendered like an integral float at fit time, so `2.0` matches `2`.
    fn canonical_code(&self, name: &str, raw: &str) -> String {
        let raw = raw.trim();
        let encoder = &self.transformer.encoder;
        let Some(index) = encoder.columns.iter().position(|c| c == name) else {
            return raw.to_string();
        };
        let known = &encoder.categories[index];
        if known.iter().any(|c| c == raw) {
            return raw.to_string();
        }
        match raw.parse::<f64>() {
            Ok(number) if known.contains(&number.to_string()) => number.to_string(),
            _ => raw.to_string(),
        }
    }

    /// Label the rows of `df`; usually a single row.
    pub fn predict_all(&self, df: DataFrame) -> Result<Vec<u8>> {
        let df = coerce_nominal_columns(df, &self.nominal_columns)?;

        let partition = ColumnPartition::resolve(&df, None, &self.nominal_columns)?;
        if !partition.conforms_to(&self.transformer.partition) {
            return Err(PipelineError::SchemaMismatch(format!(
                "Input columns do not match the training schema: {}",
                partition
                    .differences(&self.transformer.partition)
                    .join("; ")
            )));
        }

        let rows = self.transformer.transform_rows(&df)?;
        let width = self.transformer.n_features_out();
        if width != self.model.classifier.n_features() {
            return Err(PipelineError::SchemaMismatch(format!(
                "Transformed width {} does not match the model's {} features",
                width,
                self.model.classifier.n_features()
            )));
        }

        Ok(self.model.classifier.predict(&rows))
    }

    /// Label a single-row table.
    pub fn predict(&self, row: DataFrame) -> Result<u8> {
        if row.height() != 1 {
            return Err(PipelineError::SchemaMismatch(format!(
                "Expected exactly one input row, got {}",
                row.height()
            )));
        }
        let labels = self.predict_all(row)?;
        let label = labels[0];
        tracing::info!(label, "prediction made");
        Ok(label)
    }
}

/// Load the artifacts and label one row.
pub fn make_prediction(row: DataFrame, config: &PredictionConfig) -> Result<u8> {
    PredictionPipeline::load(config)?.predict(row)
}
