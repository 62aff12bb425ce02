//! Typed pipeline configuration loaded from YAML.
//!
//! Each stage gets its own section struct. Missing keys are rejected by serde
//! when the file is parsed and value ranges are checked by `validate`, so a
//! bad configuration fails before any stage runs.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};
use crate::model::{Classifier, ClassifierKind};

/// Default number of rows used for CSV schema inference
pub const DEFAULT_INFER_SCHEMA_LENGTH: usize = 10_000;

fn default_infer_schema_length() -> usize {
    DEFAULT_INFER_SCHEMA_LENGTH
}

/// `data_ingestion` section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataIngestionConfig {
    /// Path to the source table (CSV or Parquet)
    pub source_dir: PathBuf,
    /// Rows used for CSV schema inference (0 = full scan)
    #[serde(default = "default_infer_schema_length")]
    pub infer_schema_length: usize,
}

/// `data_cleaning` section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataCleaningConfig {
    /// Columns whose upper outliers are capped
    pub outlier_columns: Vec<String>,
}

/// `data_transformation` section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataTransformationConfig {
    /// Columns treated as nominal (one-hot encoded)
    pub nominal_columns: Vec<String>,
    /// Target column, removed before fitting and reattached afterwards
    pub target: String,
    /// Where the fitted transformer is written
    pub transformer_pickle: PathBuf,
}

/// `model_training` section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelTrainingConfig {
    /// Hyperparameters passed through to the selected classifier
    #[serde(default)]
    pub param_grid: serde_yaml::Mapping,
    /// Fraction of rows held out for evaluation
    pub test_size: f64,
    /// Target column of the transformed table
    pub target: String,
    /// Seed for the split (and for classifiers without their own seed)
    pub random_state: u64,
    /// Classifier name, matched exactly
    pub classifier: String,
    /// Where the final model is written
    pub model_artifact_dir: PathBuf,
}

/// `prediction` section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionSettings {
    /// Path of the persisted transformer
    pub transformer_pickle_dir: PathBuf,
    /// Path of the persisted model
    pub model_artifact_dir: PathBuf,
    /// Columns treated as nominal; must match the training configuration
    pub nominal_columns: Vec<String>,
}

/// Everything the training run needs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingConfig {
    pub data_ingestion: DataIngestionConfig,
    pub data_cleaning: DataCleaningConfig,
    pub data_transformation: DataTransformationConfig,
    pub model_training: ModelTrainingConfig,
}

/// Everything a prediction request needs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionConfig {
    pub prediction: PredictionSettings,
}

impl TrainingConfig {
    /// Load and validate the training sections of a YAML file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let config: Self = read_yaml(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse and validate from a YAML string.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)
            .map_err(|e| PipelineError::Config(format!("Invalid training config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let transformation = &self.data_transformation;
        let training = &self.model_training;

        require_non_empty("data_transformation.target", &transformation.target)?;
        require_non_empty("model_training.target", &training.target)?;
        require_non_empty("model_training.classifier", &training.classifier)?;
        require_path("data_ingestion.source_dir", &self.data_ingestion.source_dir)?;
        require_path(
            "data_transformation.transformer_pickle",
            &transformation.transformer_pickle,
        )?;
        require_path("model_training.model_artifact_dir", &training.model_artifact_dir)?;
        require_unique("data_cleaning.outlier_columns", &self.data_cleaning.outlier_columns)?;
        require_unique(
            "data_transformation.nominal_columns",
            &transformation.nominal_columns,
        )?;

        if !(training.test_size > 0.0 && training.test_size < 1.0) {
            return Err(PipelineError::Config(format!(
                "model_training.test_size must be in (0, 1), got {}",
                training.test_size
            )));
        }

        if transformation.target != training.target {
            return Err(PipelineError::Config(format!(
                "data_transformation.target ('{}') and model_training.target ('{}') must match",
                transformation.target, training.target
            )));
        }

        if transformation.nominal_columns.contains(&transformation.target) {
            return Err(PipelineError::Config(format!(
                "Target column '{}' cannot also be a nominal feature",
                transformation.target
            )));
        }

        // Classifier name and hyperparameters are checked here so that no
        // stage writes an artifact for a run that cannot finish
        let kind: ClassifierKind = training.classifier.parse()?;
        Classifier::from_params(kind, &training.param_grid, training.random_state)?;

        Ok(())
    }
}

impl PredictionConfig {
    /// Load and validate the prediction section of a YAML file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let config: Self = read_yaml(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse and validate from a YAML string.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)
            .map_err(|e| PipelineError::Config(format!("Invalid prediction config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let settings = &self.prediction;
        require_path(
            "prediction.transformer_pickle_dir",
            &settings.transformer_pickle_dir,
        )?;
        require_path("prediction.model_artifact_dir", &settings.model_artifact_dir)?;
        require_unique("prediction.nominal_columns", &settings.nominal_columns)
    }
}

fn read_yaml<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let text = std::fs::read_to_string(path).map_err(|e| {
        PipelineError::Config(format!(
            "Failed to read config file {}: {}",
            path.display(),
            e
        ))
    })?;
    tracing::debug!(path = %path.display(), "config file read");
    serde_yaml::from_str(&text).map_err(|e| {
        PipelineError::Config(format!("Invalid config file {}: {}", path.display(), e))
    })
}

fn require_non_empty(key: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(PipelineError::Config(format!("{} must not be empty", key)));
    }
    Ok(())
}

fn require_path(key: &str, value: &Path) -> Result<()> {
    if value.as_os_str().is_empty() {
        return Err(PipelineError::Config(format!("{} must not be empty", key)));
    }
    Ok(())
}

fn require_unique(key: &str, values: &[String]) -> Result<()> {
    let mut seen = HashSet::new();
    for value in values {
        if !seen.insert(value.as_str()) {
            return Err(PipelineError::Config(format!(
                "{} lists '{}' more than once",
                key, value
            )));
        }
    }
    Ok(())
}
