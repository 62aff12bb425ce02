//! Stratified train/test split

use std::collections::BTreeMap;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::error::{PipelineError, Result};

/// Row indices of the two partitions, each in ascending order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrainTestSplit {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// Split rows so each label keeps its share in the test partition.
///
/// The test partition holds `ceil(test_size * n)` rows, divided between the
/// labels by largest remainder. Rows of each label are shuffled with a
/// generator seeded from `seed` before the test rows are taken.
pub fn stratified_split(labels: &[u8], test_size: f64, seed: u64) -> Result<TrainTestSplit> {
    let n = labels.len();
    if !(test_size > 0.0 && test_size < 1.0) {
        return Err(PipelineError::Config(format!(
            "test_size must be in (0, 1), got {}",
            test_size
        )));
    }

    let n_test = (test_size * n as f64).ceil() as usize;
    if n_test == 0 || n_test >= n {
        return Err(PipelineError::InvalidData(format!(
            "Cannot split {} rows with test_size {}: both partitions must be non-empty",
            n, test_size
        )));
    }

    let mut by_label: BTreeMap<u8, Vec<usize>> = BTreeMap::new();
    for (i, &label) in labels.iter().enumerate() {
        by_label.entry(label).or_default().push(i);
    }
    if let Some((label, rows)) = by_label.iter().find(|(_, rows)| rows.len() < 2) {
        return Err(PipelineError::InvalidData(format!(
            "Label {} has {} row(s); stratified splitting needs at least 2 per label",
            label,
            rows.len()
        )));
    }

    let allocation = allocate(&by_label, n_test, n);

    let mut rng = StdRng::seed_from_u64(seed);
    let mut train = Vec::with_capacity(n - n_test);
    let mut test = Vec::with_capacity(n_test);
    for ((label, mut rows), take) in by_label.into_iter().zip(allocation) {
        rows.shuffle(&mut rng);
        tracing::debug!(label, rows = rows.len(), test_rows = take, "stratum split");
        test.extend_from_slice(&rows[..take]);
        train.extend_from_slice(&rows[take..]);
    }
    train.sort_unstable();
    test.sort_unstable();

    Ok(TrainTestSplit { train, test })
}

/// Largest-remainder allocation of `n_test` rows across the strata.
fn allocate(by_label: &BTreeMap<u8, Vec<usize>>, n_test: usize, n: usize) -> Vec<usize> {
    let ideal: Vec<f64> = by_label
        .values()
        .map(|rows| n_test as f64 * rows.len() as f64 / n as f64)
        .collect();
    let mut counts: Vec<usize> = ideal.iter().map(|v| v.floor() as usize).collect();

    let mut order: Vec<usize> = (0..ideal.len()).collect();
    // Larger fractional part first; ties go to the smaller label
    order.sort_by(|&a, &b| {
        let fa = ideal[a] - ideal[a].floor();
        let fb = ideal[b] - ideal[b].floor();
        fb.total_cmp(&fa).then(a.cmp(&b))
    });

    let mut remaining = n_test - counts.iter().sum::<usize>();
    for idx in order.into_iter().cycle() {
        if remaining == 0 {
            break;
        }
        let capacity = by_label.values().nth(idx).map_or(0, |rows| rows.len());
        if counts[idx] < capacity {
            counts[idx] += 1;
            remaining -= 1;
        }
    }
    counts
}
