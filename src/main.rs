//! creditcheck: credit-risk classification CLI
//!
//! `train` runs the four training stages from a YAML configuration,
//! `predict` scores one applicant from `--set` values or an interactive form,
//! and `inspect` summarizes the persisted artifacts.

use std::path::Path;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use console::style;
use indicatif::ProgressBar;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use creditcheck::cli::{confirm_another, fill_form, Cli, Commands};
use creditcheck::config::{PredictionConfig, TrainingConfig};
use creditcheck::pipeline::{
    build_input_row, run_training_with, FittedModel, FittedTransformer, PredictionLabel,
    PredictionPipeline, Stage, StageEvent,
};
use creditcheck::report::{display_artifacts, display_training_outcome};
use creditcheck::utils::{
    create_spinner, finish_with_error, finish_with_success, finish_with_warning, print_banner,
    print_completion, print_info, print_step_header, print_success, print_training_config,
};

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_level.as_deref());

    match cli.command {
        Commands::Train { config } => run_train(&config),
        Commands::Predict { config, set } => run_predict(&config, &set),
        Commands::Inspect { config } => run_inspect(&config),
    }
}

/// Logs go to stderr so prediction output on stdout stays clean
fn init_tracing(log_level: Option<&str>) {
    let filter = match log_level {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn run_train(config_path: &Path) -> Result<()> {
    let config = TrainingConfig::from_file(config_path)
        .with_context(|| format!("Failed to load training config {}", config_path.display()))?;
    let started = Instant::now();

    print_banner(env!("CARGO_PKG_VERSION"));
    print_training_config(
        &config.data_ingestion.source_dir,
        &config.model_training.target,
        &config.model_training.classifier,
        &config.model_training.model_artifact_dir,
    );

    let mut spinner: Option<ProgressBar> = None;
    let outcome = run_training_with(&config, |event| match event {
        StageEvent::Started(stage) => {
            print_step_header(stage.number(), &stage.to_string());
            spinner = Some(create_spinner(&stage_message(stage, &config)));
        }
        StageEvent::Loaded { shape, memory_mb } => {
            if let Some(pb) = spinner.take() {
                finish_with_success(&pb, "Dataset loaded");
            }
            println!("      Rows: {}", style(shape.0).yellow().bold());
            println!("      Columns: {}", style(shape.1).yellow().bold());
            println!("      Estimated memory: {:.2} MB", memory_mb);
        }
        StageEvent::Capped(capped) => {
            if let Some(pb) = spinner.take() {
                if capped.is_empty() {
                    finish_with_warning(&pb, "No outlier columns configured");
                } else {
                    let total: usize = capped.iter().map(|c| c.capped).sum();
                    finish_with_success(
                        &pb,
                        &format!("{} value(s) capped across {} column(s)", total, capped.len()),
                    );
                }
            }
        }
        StageEvent::Transformed(transformer) => {
            if let Some(pb) = spinner.take() {
                finish_with_success(
                    &pb,
                    &format!("{} feature(s) produced", transformer.n_features_out()),
                );
            }
            print_info(&format!(
                "Transformer saved to {}",
                config.data_transformation.transformer_pickle.display()
            ));
        }
        StageEvent::Trained(report) => {
            if let Some(pb) = spinner.take() {
                finish_with_success(&pb, &format!("{} trained", report.classifier));
            }
            print_success(&format!("Model saved to {}", report.model_path.display()));
        }
        StageEvent::Failed(stage) => {
            if let Some(pb) = spinner.take() {
                finish_with_error(&pb, &format!("{} failed", stage));
            }
        }
    })
    .context("Training run failed")?;

    display_training_outcome(&outcome);

    print_completion(&format!(
        "Training complete in {:.1}s",
        started.elapsed().as_secs_f64()
    ));
    Ok(())
}

fn stage_message(stage: Stage, config: &TrainingConfig) -> String {
    match stage {
        Stage::Ingestion => "Reading dataset...".to_string(),
        Stage::Cleaning => "Capping outliers...".to_string(),
        Stage::Transformation => "Scaling and encoding features...".to_string(),
        Stage::Training => format!("Training {}...", config.model_training.classifier),
    }
}

fn run_predict(config_path: &Path, assignments: &[(String, String)]) -> Result<()> {
    let config = PredictionConfig::from_file(config_path)
        .with_context(|| format!("Failed to load prediction config {}", config_path.display()))?;
    let pipeline = PredictionPipeline::load(&config).context("Failed to load artifacts")?;

    if !assignments.is_empty() {
        let row = pipeline.row_from_pairs(assignments)?;
        let label = pipeline.predict(row).context("Prediction failed")?;
        println!("{}", PredictionLabel::from(label));
        return Ok(());
    }

    print_banner(env!("CARGO_PKG_VERSION"));
    print_info(&format!(
        "Enter the applicant's details ({} fields)",
        pipeline.transformer().partition.len()
    ));
    println!();

    loop {
        let values = fill_form(pipeline.transformer())?;
        let row = build_input_row(&values)?;
        let label = PredictionLabel::from(pipeline.predict(row).context("Prediction failed")?);

        println!();
        let rendered = match label {
            PredictionLabel::Bad => style(label.to_string()).red().bold(),
            PredictionLabel::Good => style(label.to_string()).green().bold(),
        };
        println!("    Prediction: {}", rendered);
        println!();

        if !confirm_another()? {
            break;
        }
    }
    Ok(())
}

fn run_inspect(config_path: &Path) -> Result<()> {
    let config = PredictionConfig::from_file(config_path)
        .with_context(|| format!("Failed to load prediction config {}", config_path.display()))?;
    let settings = &config.prediction;

    let transformer = FittedTransformer::load(&settings.transformer_pickle_dir)
        .context("Failed to load transformer")?;
    let model = match FittedModel::load(&settings.model_artifact_dir) {
        Ok(model) => Some(model),
        Err(e) => {
            tracing::warn!(error = %e, "model artifact unavailable");
            None
        }
    };

    display_artifacts(&transformer, model.as_ref());
    println!();
    Ok(())
}
