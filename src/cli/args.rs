//! Command-line argument definitions using clap

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// creditcheck - Train a credit-risk classifier from a CSV and score applicants
#[derive(Parser, Debug)]
#[command(name = "creditcheck")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Log filter (e.g. "info", "debug", "creditcheck=trace").
    /// Defaults to RUST_LOG, then "info".
    #[arg(long, global = true)]
    pub log_level: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run ingestion, cleaning, transformation and training
    Train {
        /// Pipeline configuration file (YAML)
        #[arg(short, long, default_value = "config/pipeline.yaml")]
        config: PathBuf,
    },

    /// Predict the class of one applicant
    Predict {
        /// Pipeline configuration file (YAML)
        #[arg(short, long, default_value = "config/pipeline.yaml")]
        config: PathBuf,

        /// Feature value as NAME=VALUE (repeatable).
        /// Without any --set the interactive form is shown.
        #[arg(long = "set", value_name = "NAME=VALUE", value_parser = parse_assignment)]
        set: Vec<(String, String)>,
    },

    /// Show what the persisted transformer and model contain
    Inspect {
        /// Pipeline configuration file (YAML)
        #[arg(short, long, default_value = "config/pipeline.yaml")]
        config: PathBuf,
    },
}

/// Parser for NAME=VALUE pairs; the value may itself contain '='
fn parse_assignment(s: &str) -> Result<(String, String), String> {
    let (name, value) = s
        .split_once('=')
        .ok_or_else(|| format!("'{}' is not in NAME=VALUE form", s))?;
    if name.trim().is_empty() {
        return Err(format!("'{}' has an empty column name", s));
    }
    Ok((name.trim().to_string(), value.to_string()))
}
