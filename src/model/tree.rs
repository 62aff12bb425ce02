//! CART decision trees
//!
//! Trees are stored as a flat node arena so deep trees serialize without
//! recursion. The same [`Tree`] type holds class-1 probabilities (decision
//! tree, random forest) and boosting leaf weights.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use super::{validate_training_data, Estimator};
use crate::error::{PipelineError, Result};

/// Minimum impurity decrease for a split to be kept
const MIN_GAIN: f64 = 1e-12;

/// Values closer than this are treated as equal when placing thresholds
const VALUE_EPSILON: f64 = 1e-10;

/// A node in a [`Tree`] arena
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Node {
    Leaf {
        value: f64,
    },
    Split {
        feature: usize,
        /// Samples with `x[feature] <= threshold` go left
        threshold: f64,
        left: usize,
        right: usize,
    },
}

/// Binary tree stored as a node arena; node 0 is the root.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Tree {
    pub nodes: Vec<Node>,
}

impl Tree {
    /// Leaf value reached by `row`
    pub fn predict_value(&self, row: &[f64]) -> f64 {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                Node::Leaf { value } => return *value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    idx = if row[*feature] <= *threshold { *left } else { *right };
                }
            }
        }
    }

    /// Depth of the deepest leaf (a lone root leaf has depth 0)
    pub fn depth(&self) -> usize {
        fn walk(nodes: &[Node], idx: usize) -> usize {
            match &nodes[idx] {
                Node::Leaf { .. } => 0,
                Node::Split { left, right, .. } => 1 + walk(nodes, *left).max(walk(nodes, *right)),
            }
        }
        if self.nodes.is_empty() {
            0
        } else {
            walk(&self.nodes, 0)
        }
    }

    pub fn n_leaves(&self) -> usize {
        self.nodes
            .iter()
            .filter(|n| matches!(n, Node::Leaf { .. }))
            .count()
    }

    /// Reserve a slot and return its index; filled in later with `set`.
    pub(crate) fn push_placeholder(&mut self) -> usize {
        self.nodes.push(Node::Leaf { value: 0.0 });
        self.nodes.len() - 1
    }

    pub(crate) fn set(&mut self, idx: usize, node: Node) {
        self.nodes[idx] = node;
    }
}

/// Impurity measure for classification splits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Criterion {
    #[default]
    Gini,
    Entropy,
}

impl Criterion {
    /// Impurity of a node with the given class counts
    fn impurity(self, positives: f64, negatives: f64) -> f64 {
        let total = positives + negatives;
        if total == 0.0 {
            return 0.0;
        }
        let p = positives / total;
        match self {
            Criterion::Gini => 2.0 * p * (1.0 - p),
            Criterion::Entropy => {
                let h = |q: f64| if q > 0.0 { -q * q.log2() } else { 0.0 };
                h(p) + h(1.0 - p)
            }
        }
    }
}

/// Named strategies for the number of features tried per split
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MaxFeaturesName {
    Sqrt,
    Log2,
    All,
}

/// Number of features considered at each split
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MaxFeatures {
    Count(usize),
    Fraction(f64),
    Named(MaxFeaturesName),
}

impl MaxFeatures {
    pub const SQRT: MaxFeatures = MaxFeatures::Named(MaxFeaturesName::Sqrt);
    pub const ALL: MaxFeatures = MaxFeatures::Named(MaxFeaturesName::All);

    /// Resolve against the number of available features (always at least 1)
    pub fn resolve(self, n_features: usize) -> usize {
        let n = n_features as f64;
        let k = match self {
            MaxFeatures::Count(k) => k,
            MaxFeatures::Fraction(f) => (f * n).floor() as usize,
            MaxFeatures::Named(MaxFeaturesName::Sqrt) => n.sqrt().floor() as usize,
            MaxFeatures::Named(MaxFeaturesName::Log2) => n.log2().floor() as usize,
            MaxFeatures::Named(MaxFeaturesName::All) => n_features,
        };
        k.clamp(1, n_features.max(1))
    }

    pub(crate) fn validate(self) -> Result<()> {
        match self {
            MaxFeatures::Count(0) => Err(PipelineError::Config(
                "max_features must be at least 1".to_string(),
            )),
            MaxFeatures::Fraction(f) if !(f > 0.0 && f <= 1.0) => Err(PipelineError::Config(
                format!("max_features fraction must be in (0, 1], got {}", f),
            )),
            _ => Ok(()),
        }
    }
}

/// Growth limits shared by the decision tree and the random forest
#[derive(Debug, Clone, Copy)]
pub(crate) struct GrowthLimits {
    pub criterion: Criterion,
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    pub max_features: usize,
}

pub(crate) fn validate_growth(min_samples_split: usize, min_samples_leaf: usize) -> Result<()> {
    if min_samples_split < 2 {
        return Err(PipelineError::Config(format!(
            "min_samples_split must be at least 2, got {}",
            min_samples_split
        )));
    }
    if min_samples_leaf < 1 {
        return Err(PipelineError::Config(
            "min_samples_leaf must be at least 1".to_string(),
        ));
    }
    Ok(())
}

/// Grows a classification tree over a set of sample indices.
///
/// Indices may repeat (bootstrap samples); a repeated index counts once per
/// occurrence.
pub(crate) struct CartBuilder<'a> {
    x: &'a [Vec<f64>],
    y: &'a [u8],
    limits: GrowthLimits,
    rng: StdRng,
    tree: Tree,
}

struct BestSplit {
    feature: usize,
    threshold: f64,
    /// Position in the sorted indices where the right side starts
    split_at: usize,
    gain: f64,
}

impl<'a> CartBuilder<'a> {
    pub fn new(x: &'a [Vec<f64>], y: &'a [u8], limits: GrowthLimits, seed: u64) -> Self {
        Self {
            x,
            y,
            limits,
            rng: StdRng::seed_from_u64(seed),
            tree: Tree::default(),
        }
    }

    pub fn build(mut self, indices: Vec<usize>) -> Tree {
        let root = self.tree.push_placeholder();
        self.grow(root, indices, 0);
        self.tree
    }

    fn grow(&mut self, slot: usize, mut indices: Vec<usize>, depth: usize) {
        let positives = indices.iter().filter(|&&i| self.y[i] == 1).count() as f64;
        let total = indices.len() as f64;
        let value = if total > 0.0 { positives / total } else { 0.0 };

        let depth_reached = self.limits.max_depth.is_some_and(|d| depth >= d);
        let pure = positives == 0.0 || positives == total;
        if depth_reached || pure || indices.len() < self.limits.min_samples_split {
            self.tree.set(slot, Node::Leaf { value });
            return;
        }

        let Some(best) = self.find_best_split(&mut indices, positives) else {
            self.tree.set(slot, Node::Leaf { value });
            return;
        };

        sort_by_feature(self.x, &mut indices, best.feature);
        let right_indices = indices.split_off(best.split_at);
        let left_indices = indices;

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
        self.grow(left, left_indices, depth + 1);
        self.grow(right, right_indices, depth + 1);
    }

    fn find_best_split(&mut self, indices: &mut [usize], positives: f64) -> Option<BestSplit> {
        let n_features = self.x[indices[0]].len();
        let mut features: Vec<usize> = (0..n_features).collect();
        if self.limits.max_features < n_features {
            features.shuffle(&mut self.rng);
            features.truncate(self.limits.max_features);
        }

        let total = indices.len() as f64;
        let negatives = total - positives;
        let parent = self.limits.criterion.impurity(positives, negatives);
        let min_leaf = self.limits.min_samples_leaf;
        let n = indices.len();

        let mut best: Option<BestSplit> = None;
        for feature in features {
            sort_by_feature(self.x, indices, feature);

            let mut left_pos = 0.0f64;
            for i in 0..n - 1 {
                if self.y[indices[i]] == 1 {
                    left_pos += 1.0;
                }
                let left_count = i + 1;
                let right_count = n - left_count;
                if left_count < min_leaf || right_count < min_leaf {
                    continue;
                }

                let here = self.x[indices[i]][feature];
                let next = self.x[indices[i + 1]][feature];
                if (next - here).abs() < VALUE_EPSILON {
                    continue;
                }

                let left_n = left_count as f64;
                let right_n = right_count as f64;
                let right_pos = positives - left_pos;
                let child = (left_n / total)
                    * self.limits.criterion.impurity(left_pos, left_n - left_pos)
                    + (right_n / total)
                        * self.limits.criterion.impurity(right_pos, right_n - right_pos);
                let gain = parent - child;

                if gain > MIN_GAIN && best.as_ref().map_or(true, |b| gain > b.gain) {
                    best = Some(BestSplit {
                        feature,
                        threshold: (here + next) / 2.0,
                        split_at: left_count,
                        gain,
                    });
                }
            }
        }

        best
    }
}

/// Stable sort of sample indices by one feature
pub(crate) fn sort_by_feature(x: &[Vec<f64>], indices: &mut [usize], feature: usize) {
    indices.sort_by(|&a, &b| x[a][feature].total_cmp(&x[b][feature]));
}

/// Hyperparameters of [`DecisionTreeClassifier`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DecisionTreeParams {
    pub criterion: Criterion,
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    pub max_features: MaxFeatures,
    pub random_state: Option<u64>,
}

impl Default for DecisionTreeParams {
    fn default() -> Self {
        Self {
            criterion: Criterion::Gini,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: MaxFeatures::ALL,
            random_state: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionTreeClassifier {
    pub params: DecisionTreeParams,
    pub tree: Tree,
    pub n_features: usize,
}

impl DecisionTreeClassifier {
    pub fn new(params: DecisionTreeParams) -> Result<Self> {
        validate_growth(params.min_samples_split, params.min_samples_leaf)?;
        params.max_features.validate()?;
        Ok(Self {
            params,
            tree: Tree::default(),
            n_features: 0,
        })
    }
}

impl Estimator for DecisionTreeClassifier {
    fn fit(&mut self, x: &[Vec<f64>], y: &[u8]) -> Result<()> {
        let width = validate_training_data(x, y)?;
        let limits = GrowthLimits {
            criterion: self.params.criterion,
            max_depth: self.params.max_depth,
            min_samples_split: self.params.min_samples_split,
            min_samples_leaf: self.params.min_samples_leaf,
            max_features: self.params.max_features.resolve(width),
        };
        let seed = self.params.random_state.unwrap_or_default();

        self.tree = CartBuilder::new(x, y, limits, seed).build((0..x.len()).collect());
        self.n_features = width;

        tracing::debug!(
            depth = self.tree.depth(),
            leaves = self.tree.n_leaves(),
            "decision tree grown"
        );
        Ok(())
    }

    fn predict_proba_row(&self, row: &[f64]) -> f64 {
        self.tree.predict_value(row)
    }

    fn n_features(&self) -> usize {
        self.n_features
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gini_impurity_binary() {
        assert_eq!(Criterion::Gini.impurity(5.0, 5.0), 0.5);
        assert_eq!(Criterion::Gini.impurity(10.0, 0.0), 0.0);
        assert!((Criterion::Entropy.impurity(5.0, 5.0) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_single_split_threshold_is_midpoint() {
        let x = vec![vec![1.0], vec![2.0], vec![3.0], vec![10.0], vec![11.0], vec![12.0]];
        let y = vec![0, 0, 0, 1, 1, 1];
        let mut model = DecisionTreeClassifier::new(DecisionTreeParams::default()).unwrap();
        model.fit(&x, &y).unwrap();

        assert_eq!(model.tree.depth(), 1);
        match &model.tree.nodes[0] {
            Node::Split { threshold, .. } => assert_eq!(*threshold, 6.5),
            other => panic!("expected split at root, got {:?}", other),
        }
        assert_eq!(model.predict(&x), y);
    }

    #[test]
    fn test_max_depth_limits_growth() {
        let x: Vec<Vec<f64>> = (0..8).map(|i| vec![i as f64]).collect();
        let y = vec![0, 1, 0, 1, 0, 1, 0, 1];
        let mut model = DecisionTreeClassifier::new(DecisionTreeParams {
            max_depth: Some(2),
            ..Default::default()
        })
        .unwrap();
        model.fit(&x, &y).unwrap();
        assert!(model.tree.depth() <= 2);
    }

    #[test]
    fn test_unbounded_tree_memorizes_training_data() {
        let x: Vec<Vec<f64>> = (0..8).map(|i| vec![i as f64]).collect();
        let y = vec![0, 1, 0, 1, 0, 1, 0, 1];
        let mut model = DecisionTreeClassifier::new(DecisionTreeParams::default()).unwrap();
        model.fit(&x, &y).unwrap();
        assert_eq!(model.predict(&x), y);
    }

    #[test]
    fn test_min_samples_leaf_respected() {
        let x: Vec<Vec<f64>> = (0..6).map(|i| vec![i as f64]).collect();
        let y = vec![0, 0, 0, 0, 0, 1];
        let mut model = DecisionTreeClassifier::new(DecisionTreeParams {
            min_samples_leaf: 3,
            ..Default::default()
        })
        .unwrap();
        model.fit(&x, &y).unwrap();
        // Only a 3/3 split is allowed
        match &model.tree.nodes[0] {
            Node::Split { threshold, .. } => assert_eq!(*threshold, 2.5),
            Node::Leaf { .. } => {}
        }
    }

    #[test]
    fn test_max_features_resolution() {
        assert_eq!(MaxFeatures::SQRT.resolve(16), 4);
        assert_eq!(MaxFeatures::Named(MaxFeaturesName::Log2).resolve(16), 4);
        assert_eq!(MaxFeatures::Fraction(0.5).resolve(10), 5);
        assert_eq!(MaxFeatures::Count(50).resolve(10), 10);
        assert_eq!(MaxFeatures::ALL.resolve(7), 7);
        assert_eq!(MaxFeatures::SQRT.resolve(1), 1);
    }

    #[test]
    fn test_max_features_from_yaml() {
        let named: MaxFeatures = serde_yaml::from_str("sqrt").unwrap();
        assert_eq!(named, MaxFeatures::SQRT);
        let count: MaxFeatures = serde_yaml::from_str("3").unwrap();
        assert_eq!(count, MaxFeatures::Count(3));
        let fraction: MaxFeatures = serde_yaml::from_str("0.25").unwrap();
        assert_eq!(fraction, MaxFeatures::Fraction(0.25));
    }

    #[test]
    fn test_invalid_min_samples_split() {
        let err = DecisionTreeClassifier::new(DecisionTreeParams {
            min_samples_split: 1,
            ..Default::default()
        })
        .unwrap_err();
        assert!(matches!(err, PipelineError::Config(_)));
    }
}
