//! Binary classifiers and evaluation metrics
//!
//! Four classifiers are available, selected by their configured name. Each is
//! built from a YAML mapping of hyperparameters and is fully deterministic for
//! a given `random_state`.

pub mod boosting;
pub mod forest;
pub mod logistic;
pub mod metrics;
pub mod tree;

use std::fmt;
use std::str::FromStr;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};

pub use boosting::{GradientBoostingClassifier, GradientBoostingParams};
pub use forest::{RandomForestClassifier, RandomForestParams};
pub use logistic::{LogisticParams, LogisticRegression, Penalty};
pub use metrics::ClassificationMetrics;
pub use tree::{Criterion, DecisionTreeClassifier, DecisionTreeParams, MaxFeatures};

/// Probability above which a row is labelled 1
pub const DECISION_THRESHOLD: f64 = 0.5;

/// Common interface of all classifiers.
///
/// `x` is row-major (one `Vec` per sample); labels are 0 or 1.
pub trait Estimator {
    /// Fit on the given samples, replacing any previous state.
    fn fit(&mut self, x: &[Vec<f64>], y: &[u8]) -> Result<()>;

    /// Probability of label 1 for one sample.
    fn predict_proba_row(&self, row: &[f64]) -> f64;

    /// Number of features seen during fit (0 when unfitted).
    fn n_features(&self) -> usize;

    fn predict_proba(&self, x: &[Vec<f64>]) -> Vec<f64> {
        x.iter().map(|row| self.predict_proba_row(row)).collect()
    }

    fn predict(&self, x: &[Vec<f64>]) -> Vec<u8> {
        x.iter()
            .map(|row| u8::from(self.predict_proba_row(row) > DECISION_THRESHOLD))
            .collect()
    }
}

/// Classifier selection, matched exactly against the configured name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClassifierKind {
    LogisticRegression,
    DecisionTree,
    RandomForest,
    XGBoost,
}

impl ClassifierKind {
    pub const ALL: [ClassifierKind; 4] = [
        ClassifierKind::LogisticRegression,
        ClassifierKind::DecisionTree,
        ClassifierKind::RandomForest,
        ClassifierKind::XGBoost,
    ];

    /// Name used in configuration files
    pub fn name(&self) -> &'static str {
        match self {
            ClassifierKind::LogisticRegression => "Logistics Regression",
            ClassifierKind::DecisionTree => "Decision tree",
            ClassifierKind::RandomForest => "Random Forest",
            ClassifierKind::XGBoost => "XGBoost",
        }
    }

    fn expected_names() -> String {
        Self::ALL
            .iter()
            .map(|k| format!("\"{}\"", k.name()))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for ClassifierKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for ClassifierKind {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|k| k.name() == s)
            .ok_or_else(|| PipelineError::UnknownClassifier {
                name: s.to_string(),
                expected: Self::expected_names(),
            })
    }
}

/// A classifier of any supported kind, fitted or not.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", content = "model")]
pub enum Classifier {
    LogisticRegression(LogisticRegression),
    DecisionTree(DecisionTreeClassifier),
    RandomForest(RandomForestClassifier),
    XGBoost(GradientBoostingClassifier),
}

impl Classifier {
    /// Build an unfitted classifier from a hyperparameter mapping.
    ///
    /// Unknown hyperparameter names are rejected. When the mapping has no
    /// `random_state`, `default_seed` is used.
    pub fn from_params(kind: ClassifierKind, params: &serde_yaml::Mapping, default_seed: u64) -> Result<Self> {
        let classifier = match kind {
            ClassifierKind::LogisticRegression => {
                let mut p: LogisticParams = decode_params(kind, params)?;
                p.random_state = p.random_state.or(Some(default_seed));
                Classifier::LogisticRegression(LogisticRegression::new(p)?)
            }
            ClassifierKind::DecisionTree => {
                let mut p: DecisionTreeParams = decode_params(kind, params)?;
                p.random_state = p.random_state.or(Some(default_seed));
                Classifier::DecisionTree(DecisionTreeClassifier::new(p)?)
            }
            ClassifierKind::RandomForest => {
                let mut p: RandomForestParams = decode_params(kind, params)?;
                p.random_state = p.random_state.or(Some(default_seed));
                Classifier::RandomForest(RandomForestClassifier::new(p)?)
            }
            ClassifierKind::XGBoost => {
                let mut p: GradientBoostingParams = decode_params(kind, params)?;
                p.random_state = p.random_state.or(Some(default_seed));
                Classifier::XGBoost(GradientBoostingClassifier::new(p)?)
            }
        };
        Ok(classifier)
    }

    pub fn kind(&self) -> ClassifierKind {
        match self {
            Classifier::LogisticRegression(_) => ClassifierKind::LogisticRegression,
            Classifier::DecisionTree(_) => ClassifierKind::DecisionTree,
            Classifier::RandomForest(_) => ClassifierKind::RandomForest,
            Classifier::XGBoost(_) => ClassifierKind::XGBoost,
        }
    }

    fn inner(&self) -> &dyn Estimator {
        match self {
            Classifier::LogisticRegression(m) => m,
            Classifier::DecisionTree(m) => m,
            Classifier::RandomForest(m) => m,
            Classifier::XGBoost(m) => m,
        }
    }

    fn inner_mut(&mut self) -> &mut dyn Estimator {
        match self {
            Classifier::LogisticRegression(m) => m,
            Classifier::DecisionTree(m) => m,
            Classifier::RandomForest(m) => m,
            Classifier::XGBoost(m) => m,
        }
    }
}

impl Estimator for Classifier {
    fn fit(&mut self, x: &[Vec<f64>], y: &[u8]) -> Result<()> {
        self.inner_mut().fit(x, y)
    }

    fn predict_proba_row(&self, row: &[f64]) -> f64 {
        self.inner().predict_proba_row(row)
    }

    fn n_features(&self) -> usize {
        self.inner().n_features()
    }
}

fn decode_params<T: DeserializeOwned>(kind: ClassifierKind, params: &serde_yaml::Mapping) -> Result<T> {
    serde_yaml::from_value(serde_yaml::Value::Mapping(params.clone())).map_err(|e| {
        PipelineError::Config(format!("Invalid param_grid for {}: {}", kind, e))
    })
}

/// Check that `x` and `y` describe a usable training set and return the
/// feature count.
pub(crate) fn validate_training_data(x: &[Vec<f64>], y: &[u8]) -> Result<usize> {
    if x.is_empty() {
        return Err(PipelineError::InvalidData("Cannot fit on zero samples".to_string()));
    }
    if x.len() != y.len() {
        return Err(PipelineError::InvalidData(format!(
            "Feature rows ({}) and labels ({}) differ in length",
            x.len(),
            y.len()
        )));
    }
    let width = x[0].len();
    if width == 0 {
        return Err(PipelineError::InvalidData("Samples have no features".to_string()));
    }
    if let Some(row) = x.iter().position(|r| r.len() != width) {
        return Err(PipelineError::InvalidData(format!(
            "Row {} has {} features, expected {}",
            row,
            x[row].len(),
            width
        )));
    }
    if let Some(label) = y.iter().find(|&&l| l > 1) {
        return Err(PipelineError::InvalidData(format!(
            "Labels must be 0 or 1, found {}",
            label
        )));
    }
    Ok(width)
}

/// Numerically stable logistic function
pub(crate) fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}
