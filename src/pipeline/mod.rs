//! Pipeline module - the training stages and the prediction path

pub mod artifact;
pub mod cleaning;
pub mod columns;
pub mod loader;
pub mod prediction;
pub mod split;
pub mod training;
pub mod transform;

pub use artifact::{load_artifact, save_artifact, Artifact, ArtifactKind};
pub use cleaning::*;
pub use columns::*;
pub use loader::*;
pub use prediction::*;
pub use split::*;
pub use training::*;
pub use transform::*;

use std::fmt;

use crate::config::TrainingConfig;
use crate::error::Result;

/// Everything a full training run produced
#[derive(Debug, Clone)]
pub struct TrainingOutcome {
    /// Shape of the ingested table
    pub raw_shape: (usize, usize),
    pub capped: Vec<CappedColumn>,
    /// Shape of the transformed table, target included
    pub transformed_shape: (usize, usize),
    pub report: TrainingReport,
}

/// The four training stages, in run order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Ingestion,
    Cleaning,
    Transformation,
    Training,
}

impl Stage {
    /// 1-based position in the run
    pub fn number(self) -> u8 {
        match self {
            Stage::Ingestion => 1,
            Stage::Cleaning => 2,
            Stage::Transformation => 3,
            Stage::Training => 4,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Ingestion => "Data Ingestion",
            Stage::Cleaning => "Outlier Capping",
            Stage::Transformation => "Feature Transformation",
            Stage::Training => "Model Training",
        };
        f.write_str(name)
    }
}

/// Progress notifications emitted by [`run_training_with`]
#[derive(Debug)]
pub enum StageEvent<'a> {
    Started(Stage),
    Loaded { shape: (usize, usize), memory_mb: f64 },
    Capped(&'a [CappedColumn]),
    Transformed(&'a FittedTransformer),
    Trained(&'a TrainingReport),
    Failed(Stage),
}

/// Run ingest, clean, transform and train in order.
pub fn run_training(config: &TrainingConfig) -> Result<TrainingOutcome> {
    run_training_with(config, |_| {})
}

/// [`run_training`] with a callback for each stage transition.
///
/// The configuration is validated before the first stage, so an unknown
/// classifier or bad hyperparameter leaves every artifact untouched.
pub fn run_training_with<F>(config: &TrainingConfig, mut on_event: F) -> Result<TrainingOutcome>
where
    F: FnMut(StageEvent<'_>),
{
    config.validate()?;
    tracing::info!("training pipeline started");

    on_event(StageEvent::Started(Stage::Ingestion));
    let ingestion = &config.data_ingestion;
    let df = load_dataset(&ingestion.source_dir, ingestion.infer_schema_length)
        .inspect_err(|_| on_event(StageEvent::Failed(Stage::Ingestion)))?;
    let raw_shape = df.shape();
    on_event(StageEvent::Loaded {
        shape: raw_shape,
        memory_mb: estimated_memory_mb(&df),
    });

    on_event(StageEvent::Started(Stage::Cleaning));
    let (df, capped) = cap_outliers(df, &config.data_cleaning.outlier_columns)
        .inspect_err(|_| on_event(StageEvent::Failed(Stage::Cleaning)))?;
    on_event(StageEvent::Capped(&capped));

    on_event(StageEvent::Started(Stage::Transformation));
    let (transformed, transformer) = transform_data(df, &config.data_transformation)
        .inspect_err(|_| on_event(StageEvent::Failed(Stage::Transformation)))?;
    on_event(StageEvent::Transformed(&transformer));

    on_event(StageEvent::Started(Stage::Training));
    let report = train_model(&transformed, &config.model_training)
        .inspect_err(|_| on_event(StageEvent::Failed(Stage::Training)))?;
    on_event(StageEvent::Trained(&report));

    tracing::info!("training pipeline finished");
    Ok(TrainingOutcome {
        raw_shape,
        capped,
        transformed_shape: transformed.shape(),
        report,
    })
}
