//! Random forest of bootstrapped CART trees

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use super::tree::{validate_growth, CartBuilder, Criterion, GrowthLimits, MaxFeatures, Tree};
use super::{validate_training_data, Estimator};
use crate::error::{PipelineError, Result};

/// Hyperparameters of [`RandomForestClassifier`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RandomForestParams {
    pub n_estimators: usize,
    pub criterion: Criterion,
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    pub max_features: MaxFeatures,
    /// Draw each tree's samples with replacement
    pub bootstrap: bool,
    pub random_state: Option<u64>,
}

impl Default for RandomForestParams {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            criterion: Criterion::Gini,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: MaxFeatures::SQRT,
            bootstrap: true,
            random_state: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomForestClassifier {
    pub params: RandomForestParams,
    pub trees: Vec<Tree>,
    pub n_features: usize,
}

impl RandomForestClassifier {
    pub fn new(params: RandomForestParams) -> Result<Self> {
        if params.n_estimators == 0 {
            return Err(PipelineError::Config(
                "n_estimators must be at least 1".to_string(),
            ));
        }
        validate_growth(params.min_samples_split, params.min_samples_leaf)?;
        params.max_features.validate()?;
        Ok(Self {
            params,
            trees: Vec::new(),
            n_features: 0,
        })
    }
}

impl Estimator for RandomForestClassifier {
    fn fit(&mut self, x: &[Vec<f64>], y: &[u8]) -> Result<()> {
        let width = validate_training_data(x, y)?;
        let limits = GrowthLimits {
            criterion: self.params.criterion,
            max_depth: self.params.max_depth,
            min_samples_split: self.params.min_samples_split,
            min_samples_leaf: self.params.min_samples_leaf,
            max_features: self.params.max_features.resolve(width),
        };

        // Each tree gets its own seed from the master generator, so the
        // forest is reproducible regardless of how trees are grown.
        let mut master = StdRng::seed_from_u64(self.params.random_state.unwrap_or_default());
        let n = x.len();

        self.trees = (0..self.params.n_estimators)
            .map(|_| {
                let tree_seed: u64 = master.gen();
                let indices: Vec<usize> = if self.params.bootstrap {
                    let mut rng = StdRng::seed_from_u64(tree_seed);
                    (0..n).map(|_| rng.gen_range(0..n)).collect()
                } else {
                    (0..n).collect()
                };
                CartBuilder::new(x, y, limits, tree_seed.wrapping_add(1)).build(indices)
            })
            .collect();
        self.n_features = width;

        tracing::debug!(
            n_trees = self.trees.len(),
            max_features = limits.max_features,
            "random forest grown"
        );
        Ok(())
    }

    fn predict_proba_row(&self, row: &[f64]) -> f64 {
        if self.trees.is_empty() {
            return 0.0;
        }
        let sum: f64 = self.trees.iter().map(|t| t.predict_value(row)).sum();
        sum / self.trees.len() as f64
    }

    fn n_features(&self) -> usize {
        self.n_features
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_clusters() -> (Vec<Vec<f64>>, Vec<u8>) {
        let mut x = Vec::new();
        let mut y = Vec::new();
        for i in 0..20 {
            let jitter = (i % 5) as f64 * 0.01;
            x.push(vec![0.1 + jitter, 0.2 + jitter]);
            y.push(0);
            x.push(vec![0.8 + jitter, 0.9 - jitter]);
            y.push(1);
        }
        (x, y)
    }

    #[test]
    fn test_forest_separates_clusters() {
        let (x, y) = two_clusters();
        let mut forest = RandomForestClassifier::new(RandomForestParams {
            n_estimators: 15,
            random_state: Some(42),
            ..Default::default()
        })
        .unwrap();
        forest.fit(&x, &y).unwrap();

        assert_eq!(forest.trees.len(), 15);
        assert_eq!(forest.predict(&x), y);
    }

    #[test]
    fn test_same_seed_same_forest() {
        let (x, y) = two_clusters();
        let params = RandomForestParams {
            n_estimators: 10,
            random_state: Some(42),
            ..Default::default()
        };
        let mut a = RandomForestClassifier::new(params.clone()).unwrap();
        let mut b = RandomForestClassifier::new(params).unwrap();
        a.fit(&x, &y).unwrap();
        b.fit(&x, &y).unwrap();

        assert_eq!(a.trees, b.trees);
        assert_eq!(a.predict_proba(&x), b.predict_proba(&x));
    }

    #[test]
    fn test_probability_is_tree_average() {
        let (x, y) = two_clusters();
        let mut forest = RandomForestClassifier::new(RandomForestParams {
            n_estimators: 4,
            random_state: Some(1),
            ..Default::default()
        })
        .unwrap();
        forest.fit(&x, &y).unwrap();

        let row = &x[0];
        let mean = forest.trees.iter().map(|t| t.predict_value(row)).sum::<f64>() / 4.0;
        assert!((forest.predict_proba_row(row) - mean).abs() < 1e-12);
    }

    #[test]
    fn test_zero_estimators_rejected() {
        let err = RandomForestClassifier::new(RandomForestParams {
            n_estimators: 0,
            ..Default::default()
        })
        .unwrap_err();
        assert!(matches!(err, PipelineError::Config(_)));
    }
}
