//! Gradient-boosted trees with second-order logistic loss
//!
//! Follows the XGBoost formulation: each round fits a regression tree to the
//! gradient and hessian of the log-loss, scoring splits by
//!
//! ```text
//! gain = ½ [G_L² / (H_L + λ) + G_R² / (H_R + λ) − G² / (H + λ)] − γ
//! ```
//!
//! and setting each leaf to `−η · G / (H + λ)`.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use super::tree::{sort_by_feature, Node, Tree};
use super::{sigmoid, validate_training_data, Estimator};
use crate::error::{PipelineError, Result};

const VALUE_EPSILON: f64 = 1e-10;

/// Hyperparameters of [`GradientBoostingClassifier`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GradientBoostingParams {
    pub n_estimators: usize,
    pub max_depth: usize,
    /// Shrinkage applied to every leaf weight (eta)
    pub learning_rate: f64,
    /// L2 regularization on leaf weights (lambda)
    pub reg_lambda: f64,
    /// Minimum loss reduction required to split (gamma)
    pub gamma: f64,
    /// Minimum hessian sum in a child
    pub min_child_weight: f64,
    /// Fraction of rows sampled per round
    pub subsample: f64,
    /// Fraction of features sampled per tree
    pub colsample_bytree: f64,
    /// Initial probability for every sample
    pub base_score: f64,
    pub random_state: Option<u64>,
}

impl Default for GradientBoostingParams {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            max_depth: 6,
            learning_rate: 0.3,
            reg_lambda: 1.0,
            gamma: 0.0,
            min_child_weight: 1.0,
            subsample: 1.0,
            colsample_bytree: 1.0,
            base_score: 0.5,
            random_state: None,
        }
    }
}

impl GradientBoostingParams {
    fn validate(&self) -> Result<()> {
        let fraction = |name: &str, v: f64| {
            if v > 0.0 && v <= 1.0 {
                Ok(())
            } else {
                Err(PipelineError::Config(format!("{} must be in (0, 1], got {}", name, v)))
            }
        };
        if self.n_estimators == 0 {
            return Err(PipelineError::Config("n_estimators must be at least 1".to_string()));
        }
        if !(self.learning_rate > 0.0) {
            return Err(PipelineError::Config(format!(
                "learning_rate must be positive, got {}",
                self.learning_rate
            )));
        }
        if self.reg_lambda < 0.0 || self.gamma < 0.0 || self.min_child_weight < 0.0 {
            return Err(PipelineError::Config(
                "reg_lambda, gamma and min_child_weight must be non-negative".to_string(),
            ));
        }
        if !(self.base_score > 0.0 && self.base_score < 1.0) {
            return Err(PipelineError::Config(format!(
                "base_score must be in (0, 1), got {}",
                self.base_score
            )));
        }
        fraction("subsample", self.subsample)?;
        fraction("colsample_bytree", self.colsample_bytree)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradientBoostingClassifier {
    pub params: GradientBoostingParams,
    pub trees: Vec<Tree>,
    /// Log-odds of `base_score`
    pub base_margin: f64,
    pub n_features: usize,
}

impl GradientBoostingClassifier {
    pub fn new(params: GradientBoostingParams) -> Result<Self> {
        params.validate()?;
        let base_margin = (params.base_score / (1.0 - params.base_score)).ln();
        Ok(Self {
            params,
            trees: Vec::new(),
            base_margin,
            n_features: 0,
        })
    }

    fn margin(&self, row: &[f64]) -> f64 {
        self.base_margin + self.trees.iter().map(|t| t.predict_value(row)).sum::<f64>()
    }
}

impl Estimator for GradientBoostingClassifier {
    fn fit(&mut self, x: &[Vec<f64>], y: &[u8]) -> Result<()> {
        let width = validate_training_data(x, y)?;
        let n = x.len();
        let mut rng = StdRng::seed_from_u64(self.params.random_state.unwrap_or_default());

        let mut margins = vec![self.base_margin; n];
        let mut grad = vec![0.0; n];
        let mut hess = vec![0.0; n];
        self.trees.clear();

        let n_rows = ((self.params.subsample * n as f64).round() as usize).clamp(1, n);
        let n_cols = ((self.params.colsample_bytree * width as f64).round() as usize).clamp(1, width);

        for _ in 0..self.params.n_estimators {
            for i in 0..n {
                let p = sigmoid(margins[i]);
                grad[i] = p - f64::from(y[i]);
                hess[i] = (p * (1.0 - p)).max(1e-16);
            }

            let mut rows: Vec<usize> = (0..n).collect();
            if n_rows < n {
                rows.shuffle(&mut rng);
                rows.truncate(n_rows);
            }
            let mut features: Vec<usize> = (0..width).collect();
            if n_cols < width {
                features.shuffle(&mut rng);
                features.truncate(n_cols);
            }

            let tree = RegressionTreeBuilder {
                x,
                grad: &grad,
                hess: &hess,
                features: &features,
                params: &self.params,
                tree: Tree::default(),
            }
            .build(rows);

            for (m, row) in margins.iter_mut().zip(x) {
                *m += tree.predict_value(row);
            }
            self.trees.push(tree);
        }
        self.n_features = width;

        tracing::debug!(rounds = self.trees.len(), "gradient boosting finished");
        Ok(())
    }

    fn predict_proba_row(&self, row: &[f64]) -> f64 {
        sigmoid(self.margin(row))
    }

    fn n_features(&self) -> usize {
        self.n_features
    }
}

struct RegressionTreeBuilder<'a> {
    x: &'a [Vec<f64>],
    grad: &'a [f64],
    hess: &'a [f64],
    features: &'a [usize],
    params: &'a GradientBoostingParams,
    tree: Tree,
}

struct GainSplit {
    feature: usize,
    threshold: f64,
    split_at: usize,
    gain: f64,
}

impl RegressionTreeBuilder<'_> {
    fn build(mut self, rows: Vec<usize>) -> Tree {
        let root = self.tree.push_placeholder();
        self.grow(root, rows, 0);
        self.tree
    }

    fn leaf_weight(&self, g: f64, h: f64) -> f64 {
        -self.params.learning_rate * g / (h + self.params.reg_lambda)
    }

    fn score(&self, g: f64, h: f64) -> f64 {
        g * g / (h + self.params.reg_lambda)
    }

    fn grow(&mut self, slot: usize, mut rows: Vec<usize>, depth: usize) {
        let g: f64 = rows.iter().map(|&i| self.grad[i]).sum();
        let h: f64 = rows.iter().map(|&i| self.hess[i]).sum();

        let split = if depth < self.params.max_depth && rows.len() >= 2 {
            self.find_best_split(&mut rows, g, h)
        } else {
            None
        };

        let Some(best) = split else {
            let value = self.leaf_weight(g, h);
            self.tree.set(slot, Node::Leaf { value });
            return;
        };

        sort_by_feature(self.x, &mut rows, best.feature);
        let right_rows = rows.split_off(best.split_at);
        let left = self.tree.push_placeholder();
        let right = self.tree.push_placeholder();
        self.tree.set(
            slot,
            Node::Split {
                feature: best.feature,
                threshold: best.threshold,
                left,
                right,
            },
        );
        self.grow(left, rows, depth + 1);
        self.grow(right, right_rows, depth + 1);
    }

    fn find_best_split(&self, rows: &mut [usize], g: f64, h: f64) -> Option<GainSplit> {
        let parent = self.score(g, h);
        let n = rows.len();
        let mut best: Option<GainSplit> = None;

        for &feature in self.features {
            sort_by_feature(self.x, rows, feature);
            let mut gl = 0.0;
            let mut hl = 0.0;
            for i in 0..n - 1 {
                gl += self.grad[rows[i]];
                hl += self.hess[rows[i]];
                let gr = g - gl;
                let hr = h - hl;
                if hl < self.params.min_child_weight || hr < self.params.min_child_weight {
                    continue;
                }

                let here = self.x[rows[i]][feature];
                let next = self.x[rows[i + 1]][feature];
                if (next - here).abs() < VALUE_EPSILON {
                    continue;
                }

                let gain = 0.5 * (self.score(gl, hl) + self.score(gr, hr) - parent) - self.params.gamma;
                if gain > 0.0 && best.as_ref().map_or(true, |b| gain > b.gain) {
                    best = Some(GainSplit {
                        feature,
                        threshold: (here + next) / 2.0,
                        split_at: i + 1,
                        gain,
                    });
                }
            }
        }

        best
    }
}
