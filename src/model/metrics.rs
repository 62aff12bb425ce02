//! Binary classification metrics with label 1 as the positive class

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ClassificationMetrics {
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
}

impl ClassificationMetrics {
    /// Compute metrics for paired labels.
    ///
    /// Any ratio with a zero denominator is reported as 0.
    pub fn compute(y_true: &[u8], y_pred: &[u8]) -> Self {
        let mut tp = 0usize;
        let mut fp = 0usize;
        let mut fn_ = 0usize;
        let mut correct = 0usize;

        for (&t, &p) in y_true.iter().zip(y_pred) {
            if t == p {
                correct += 1;
            }
            match (t, p) {
                (1, 1) => tp += 1,
                (0, 1) => fp += 1,
                (1, 0) => fn_ += 1,
                _ => {}
            }
        }

        let ratio = |num: usize, den: usize| if den == 0 { 0.0 } else { num as f64 / den as f64 };
        let accuracy = ratio(correct, y_true.len().min(y_pred.len()));
        let precision = ratio(tp, tp + fp);
        let recall = ratio(tp, tp + fn_);
        let f1 = if precision + recall == 0.0 {
            0.0
        } else {
            2.0 * precision * recall / (precision + recall)
        };

        Self {
            accuracy,
            precision,
            recall,
            f1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_known_values() {
        // tp=2 fp=1 fn=1 tn=1
        let m = ClassificationMetrics::compute(&[1, 1, 1, 0, 0], &[1, 1, 0, 1, 0]);
        assert!((m.accuracy - 0.6).abs() < 1e-12);
        assert!((m.precision - 2.0 / 3.0).abs() < 1e-12);
        assert!((m.recall - 2.0 / 3.0).abs() < 1e-12);
        assert!((m.f1 - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_no_positive_predictions_gives_zero() {
        let m = ClassificationMetrics::compute(&[1, 0, 0], &[0, 0, 0]);
        assert_eq!(m.precision, 0.0);
        assert_eq!(m.recall, 0.0);
        assert_eq!(m.f1, 0.0);
        assert!((m.accuracy - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_perfect_predictions() {
        let y = [0, 1, 1, 0];
        let m = ClassificationMetrics::compute(&y, &y);
        assert_eq!(m.accuracy, 1.0);
        assert_eq!(m.f1, 1.0);
    }
}
