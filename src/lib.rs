//! creditcheck: Credit Risk Classification Library
//!
//! A small tabular pipeline: ingest a CSV, cap outliers, scale and one-hot
//! encode features, train one of four binary classifiers, and score single
//! applicants against the persisted transformer and model.

pub mod cli;
pub mod config;
pub mod error;
pub mod model;
pub mod pipeline;
pub mod report;
pub mod utils;

pub use error::{PipelineError, Result};
