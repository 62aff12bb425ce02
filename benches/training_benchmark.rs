//! Benchmark fitting each classifier on synthetic, already-scaled features
//!
//! Run with: cargo bench --bench training_benchmark

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rand::prelude::*;
use rand::SeedableRng;

use creditcheck::model::{Classifier, ClassifierKind, Estimator};

/// Generate a feature matrix with a few informative columns and noise
fn generate_data(n_rows: usize, n_features: usize, seed: u64) -> (Vec<Vec<f64>>, Vec<u8>) {
    let mut rng = rand::rngs::StdRng::seed_from_u64(seed);

    let mut x = Vec::with_capacity(n_rows);
    let mut y = Vec::with_capacity(n_rows);
    for _ in 0..n_rows {
        let label = u8::from(rng.gen::<f64>() > 0.7);
        let row: Vec<f64> = (0..n_features)
            .map(|j| {
                let noise = rng.gen::<f64>();
                if j % 3 == 0 {
                    // Informative: shifted by the label
                    (0.3 * noise + 0.5 * f64::from(label)).min(1.0)
                } else {
                    noise
                }
            })
            .collect();
        x.push(row);
        y.push(label);
    }
    (x, y)
}

fn small_grid(kind: ClassifierKind) -> serde_yaml::Mapping {
    let yaml = match kind {
        ClassifierKind::RandomForest => "{ n_estimators: 20 }",
        ClassifierKind::XGBoost => "{ n_estimators: 20, max_depth: 4 }",
        ClassifierKind::DecisionTree => "{ max_depth: 8 }",
        ClassifierKind::LogisticRegression => "{ max_iter: 300 }",
    };
    serde_yaml::from_str(yaml).unwrap()
}

fn bench_classifier_fit(c: &mut Criterion) {
    let mut group = c.benchmark_group("classifier_fit");
    group.sample_size(10);

    for n_rows in [500, 2000] {
        let (x, y) = generate_data(n_rows, 20, 42);
        group.throughput(Throughput::Elements(n_rows as u64));

        for kind in ClassifierKind::ALL {
            let grid = small_grid(kind);
            group.bench_with_input(
                BenchmarkId::new(kind.name(), n_rows),
                &(&x, &y),
                |b, (x, y)| {
                    b.iter(|| {
                        let mut model = Classifier::from_params(kind, &grid, 42).unwrap();
                        model.fit(black_box(x), black_box(y)).unwrap();
                        model
                    })
                },
            );
        }
    }

    group.finish();
}

fn bench_predict(c: &mut Criterion) {
    let (x, y) = generate_data(2000, 20, 7);
    let mut model =
        Classifier::from_params(ClassifierKind::RandomForest, &small_grid(ClassifierKind::RandomForest), 7)
            .unwrap();
    model.fit(&x, &y).unwrap();

    c.bench_function("random_forest_predict_2000", |b| {
        b.iter(|| model.predict(black_box(&x)))
    });
}

criterion_group!(benches, bench_classifier_fit, bench_predict);
criterion_main!(benches);
