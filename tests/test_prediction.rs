//! Tests for the prediction path

use creditcheck::config::{PredictionConfig, TrainingConfig};
use creditcheck::pipeline::{
    build_input_row, make_prediction, run_training, save_artifact, ArtifactKind, FieldValue,
    PredictionPipeline,
};
use creditcheck::PipelineError;
use tempfile::TempDir;

#[path = "common/mod.rs"]
mod common;

/// Train a small forest and return the temp dir plus the prediction config
fn trained(classifier: &str, grid: &str) -> (TempDir, PredictionConfig) {
    let mut df = common::create_credit_dataframe(200, 3);
    let (temp_dir, csv_path) = common::create_temp_csv(&mut df);
    let config_path = common::write_config(temp_dir.path(), &csv_path, classifier, grid);

    run_training(&TrainingConfig::from_file(&config_path).unwrap()).unwrap();
    let config = PredictionConfig::from_file(&config_path).unwrap();
    (temp_dir, config)
}

#[test]
fn test_prediction_is_binary_and_deterministic() {
    let (_dir, config) = trained("Random Forest", "{ n_estimators: 15 }");
    let pipeline = PredictionPipeline::load(&config).unwrap();

    let first = pipeline
        .predict(pipeline.row_from_pairs(&common::applicant_pairs()).unwrap())
        .unwrap();
    let second = pipeline
        .predict(pipeline.row_from_pairs(&common::applicant_pairs()).unwrap())
        .unwrap();

    assert!(first == 0 || first == 1);
    assert_eq!(first, second);

    let reloaded = make_prediction(
        PredictionPipeline::load(&config)
            .unwrap()
            .row_from_pairs(&common::applicant_pairs())
            .unwrap(),
        &config,
    )
    .unwrap();
    assert_eq!(first, reloaded);
}

#[test]
fn test_float_spelled_codes_match_integer_categories() {
    let (_dir, config) = trained("Decision tree", "{ max_depth: 5 }");
    let pipeline = PredictionPipeline::load(&config).unwrap();

    let plain = pipeline
        .predict(pipeline.row_from_pairs(&common::applicant_pairs()).unwrap())
        .unwrap();

    let mut spelled = common::applicant_pairs();
    spelled[3].1 = "3.0".to_string();
    spelled[0].1 = " 1 ".to_string();
    let label = pipeline
        .predict(pipeline.row_from_pairs(&spelled).unwrap())
        .unwrap();
    assert_eq!(label, plain);

    let mut unknown = common::applicant_pairs();
    unknown[3].1 = "3.5".to_string();
    let err = pipeline
        .predict(pipeline.row_from_pairs(&unknown).unwrap())
        .unwrap_err();
    assert!(matches!(err, PipelineError::SchemaMismatch(_)));
}

#[test]
fn test_field_order_does_not_matter() {
    let (_dir, config) = trained("Logistics Regression", "{}");
    let pipeline = PredictionPipeline::load(&config).unwrap();

    let mut reversed = common::applicant_pairs();
    reversed.reverse();
    let a = pipeline
        .predict(pipeline.row_from_pairs(&common::applicant_pairs()).unwrap())
        .unwrap();
    let b = pipeline
        .predict(pipeline.row_from_pairs(&reversed).unwrap())
        .unwrap();
    assert_eq!(a, b);
}

#[test]
fn test_numeric_codes_accepted_for_nominal_fields() {
    let (_dir, config) = trained("Decision tree", "{ max_depth: 5 }");
    let row = build_input_row(&[
        ("Account Balance".to_string(), FieldValue::Numeric(1.0)),
        ("Duration".to_string(), FieldValue::Numeric(12.0)),
        ("Credit Amount".to_string(), FieldValue::Numeric(900.0)),
        ("Purpose".to_string(), FieldValue::Numeric(0.0)),
        ("Foreign Worker".to_string(), FieldValue::Numeric(2.0)),
        ("Age".to_string(), FieldValue::Numeric(35.0)),
    ])
    .unwrap();

    let label = make_prediction(row, &config).unwrap();
    assert!(label <= 1);
}

#[test]
fn test_missing_field_is_schema_mismatch() {
    let (_dir, config) = trained("Decision tree", "{ max_depth: 3 }");
    let pipeline = PredictionPipeline::load(&config).unwrap();

    let pairs: Vec<(String, String)> = common::applicant_pairs()
        .into_iter()
        .filter(|(name, _)| name != "Age")
        .collect();
    let err = pipeline
        .predict(pipeline.row_from_pairs(&pairs).unwrap())
        .unwrap_err();
    assert!(matches!(err, PipelineError::SchemaMismatch(_)));
    assert!(err.to_string().contains("Age"));
}

#[test]
fn test_prediction_config_nominal_mismatch() {
    let (_dir, mut config) = trained("Decision tree", "{ max_depth: 3 }");
    config
        .prediction
        .nominal_columns
        .retain(|name| name != "Purpose");
    let pipeline = PredictionPipeline::load(&config).unwrap();

    let row = build_input_row(&[
        ("Account Balance".to_string(), FieldValue::Code("1".to_string())),
        ("Duration".to_string(), FieldValue::Numeric(12.0)),
        ("Credit Amount".to_string(), FieldValue::Numeric(900.0)),
        ("Purpose".to_string(), FieldValue::Numeric(2.0)),
        ("Foreign Worker".to_string(), FieldValue::Code("1".to_string())),
        ("Age".to_string(), FieldValue::Numeric(35.0)),
    ])
    .unwrap();
    let err = pipeline.predict(row).unwrap_err();
    assert!(matches!(err, PipelineError::SchemaMismatch(_)));
    assert!(err.to_string().contains("Purpose"));
}

#[test]
fn test_unknown_code_is_schema_mismatch() {
    let (_dir, config) = trained("Decision tree", "{ max_depth: 3 }");
    let pipeline = PredictionPipeline::load(&config).unwrap();

    let mut pairs = common::applicant_pairs();
    pairs[3].1 = "42".to_string();
    let err = pipeline
        .predict(pipeline.row_from_pairs(&pairs).unwrap())
        .unwrap_err();
    assert!(matches!(err, PipelineError::SchemaMismatch(_)));
}

#[test]
fn test_non_numeric_value_rejected() {
    let (_dir, config) = trained("Decision tree", "{ max_depth: 3 }");
    let pipeline = PredictionPipeline::load(&config).unwrap();

    let mut pairs = common::applicant_pairs();
    pairs[1].1 = "long".to_string();
    let err = pipeline.row_from_pairs(&pairs).unwrap_err();
    assert!(matches!(err, PipelineError::SchemaMismatch(_)));
}

#[test]
fn test_missing_model_artifact_is_io_error() {
    let (dir, config) = trained("Decision tree", "{ max_depth: 3 }");
    std::fs::remove_file(common::model_path(dir.path())).unwrap();

    let err = PredictionPipeline::load(&config).unwrap_err();
    assert!(matches!(err, PipelineError::Io { .. }));
}

#[test]
fn test_transformer_in_model_slot_is_rejected() {
    let (dir, config) = trained("Decision tree", "{ max_depth: 3 }");
    save_artifact(&common::model_path(dir.path()), ArtifactKind::Transformer, &"swapped").unwrap();

    let err = PredictionPipeline::load(&config).unwrap_err();
    assert!(matches!(err, PipelineError::Io { .. }));
    assert!(err.to_string().contains("Expected a model artifact"));
}
