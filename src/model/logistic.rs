//! Logistic regression trained with full-batch gradient descent

use serde::{Deserialize, Serialize};

use super::{sigmoid, validate_training_data, Estimator};
use crate::error::{PipelineError, Result};

/// Regularization applied to the coefficients
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Penalty {
    L2,
    None,
}

/// Hyperparameters of [`LogisticRegression`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LogisticParams {
    /// Inverse regularization strength
    #[serde(rename = "C")]
    pub c: f64,
    pub max_iter: usize,
    pub learning_rate: f64,
    /// Stop once every gradient component is below this
    pub tol: f64,
    pub fit_intercept: bool,
    pub penalty: Penalty,
    /// Accepted for parity with the other classifiers; the fit is deterministic
    pub random_state: Option<u64>,
}

impl Default for LogisticParams {
    fn default() -> Self {
        Self {
            c: 1.0,
            max_iter: 1000,
            learning_rate: 0.5,
            tol: 1e-6,
            fit_intercept: true,
            penalty: Penalty::L2,
            random_state: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogisticRegression {
    pub params: LogisticParams,
    pub coefficients: Vec<f64>,
    pub intercept: f64,
    /// Iterations run by the last fit
    pub n_iter: usize,
}

impl LogisticRegression {
    pub fn new(params: LogisticParams) -> Result<Self> {
        if !(params.c > 0.0) {
            return Err(PipelineError::Config(format!("C must be positive, got {}", params.c)));
        }
        if !(params.learning_rate > 0.0) {
            return Err(PipelineError::Config(format!(
                "learning_rate must be positive, got {}",
                params.learning_rate
            )));
        }
        if params.max_iter == 0 {
            return Err(PipelineError::Config("max_iter must be at least 1".to_string()));
        }
        Ok(Self {
            params,
            coefficients: Vec::new(),
            intercept: 0.0,
            n_iter: 0,
        })
    }

    fn decision_function(&self, row: &[f64]) -> f64 {
        self.intercept
            + self
                .coefficients
                .iter()
                .zip(row)
                .map(|(w, x)| w * x)
                .sum::<f64>()
    }
}

impl Estimator for LogisticRegression {
    fn fit(&mut self, x: &[Vec<f64>], y: &[u8]) -> Result<()> {
        let width = validate_training_data(x, y)?;
        let n = x.len() as f64;
        let lr = self.params.learning_rate;
        // Mean log-loss + ||w||^2 / (2 C n) has the same minimiser as
        // C * sum(log-loss) + ||w||^2 / 2
        let l2 = match self.params.penalty {
            Penalty::L2 => 1.0 / (self.params.c * n),
            Penalty::None => 0.0,
        };

        self.coefficients = vec![0.0; width];
        self.intercept = 0.0;
        self.n_iter = 0;

        let mut grad = vec![0.0; width];
        for _ in 0..self.params.max_iter {
            self.n_iter += 1;
            grad.iter_mut().for_each(|g| *g = 0.0);
            let mut grad_b = 0.0;

            for (row, &label) in x.iter().zip(y) {
                let err = sigmoid(self.decision_function(row)) - f64::from(label);
                for (g, xi) in grad.iter_mut().zip(row) {
                    *g += err * xi;
                }
                grad_b += err;
            }

            let mut max_grad: f64 = 0.0;
            for (g, w) in grad.iter_mut().zip(&self.coefficients) {
                *g = *g / n + l2 * w;
                max_grad = max_grad.max(g.abs());
            }
            grad_b /= n;
            if self.params.fit_intercept {
                max_grad = max_grad.max(grad_b.abs());
            }

            for (w, g) in self.coefficients.iter_mut().zip(&grad) {
                *w -= lr * g;
            }
            if self.params.fit_intercept {
                self.intercept -= lr * grad_b;
            }

            if max_grad < self.params.tol {
                break;
            }
        }

        tracing::debug!(n_iter = self.n_iter, "logistic regression converged");
        Ok(())
    }

    fn predict_proba_row(&self, row: &[f64]) -> f64 {
        sigmoid(self.decision_function(row))
    }

    fn n_features(&self) -> usize {
        self.coefficients.len()
    }
}
