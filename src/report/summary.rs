//! Training and artifact summaries rendered with comfy-table

use comfy_table::{presets::UTF8_FULL_CONDENSED, Attribute, Cell, CellAlignment, Color, Table};
use console::style;

use crate::model::ClassificationMetrics;
use crate::pipeline::{CappedColumn, FittedModel, FittedTransformer, TrainingOutcome, TrainingReport};

fn new_table(header: &[&str]) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_header(
        header
            .iter()
            .map(|h| Cell::new(h).add_attribute(Attribute::Bold))
            .collect::<Vec<_>>(),
    );
    table
}

fn metric_cell(value: f64) -> Cell {
    let color = if value >= 0.8 {
        Color::Green
    } else if value >= 0.6 {
        Color::Yellow
    } else {
        Color::Red
    };
    Cell::new(format!("{:.4}", value))
        .fg(color)
        .set_alignment(CellAlignment::Right)
}

fn print_section(icon: &str, title: &str, table: &Table) {
    println!();
    println!("    {} {}", style(icon).cyan(), style(title).white().bold());
    println!("    {}", style("─".repeat(50)).dim());
    println!();
    // Indent the table
    for line in table.to_string().lines() {
        println!("    {}", line);
    }
}

/// Train and test metrics side by side
pub fn metrics_table(report: &TrainingReport) -> Table {
    let mut table = new_table(&["Metric", "Train", "Test"]);
    let rows: [(&str, fn(&ClassificationMetrics) -> f64); 4] = [
        ("Accuracy", |m| m.accuracy),
        ("Precision", |m| m.precision),
        ("Recall", |m| m.recall),
        ("F1", |m| m.f1),
    ];
    for (name, get) in rows {
        table.add_row(vec![
            Cell::new(name),
            metric_cell(get(&report.train)),
            metric_cell(get(&report.test)),
        ]);
    }
    table.add_row(vec![
        Cell::new("Rows"),
        Cell::new(report.n_train).set_alignment(CellAlignment::Right),
        Cell::new(report.n_test).set_alignment(CellAlignment::Right),
    ]);
    table
}

/// Bound and number of capped values per outlier column
pub fn capping_table(capped: &[CappedColumn]) -> Table {
    let mut table = new_table(&["Column", "Upper bound", "Capped"]);
    for column in capped {
        let bound = if column.upper_bound.is_nan() {
            Cell::new("-")
        } else {
            Cell::new(format!("{:.4}", column.upper_bound))
        };
        table.add_row(vec![
            Cell::new(&column.column),
            bound.set_alignment(CellAlignment::Right),
            Cell::new(column.capped)
                .fg(if column.capped > 0 { Color::Yellow } else { Color::White })
                .set_alignment(CellAlignment::Right),
        ]);
    }
    table
}

/// Input features of a persisted transformer and what they expand to
pub fn transformer_table(transformer: &FittedTransformer) -> Table {
    let mut table = new_table(&["Feature", "Type", "Details"]);
    for (i, name) in transformer.partition.numeric.iter().enumerate() {
        table.add_row(vec![
            Cell::new(name),
            Cell::new("numeric").fg(Color::Cyan),
            Cell::new(format!(
                "min {} / max {}",
                transformer.scaler.data_min[i], transformer.scaler.data_max[i]
            )),
        ]);
    }
    for (i, name) in transformer.partition.nominal.iter().enumerate() {
        table.add_row(vec![
            Cell::new(name),
            Cell::new("nominal").fg(Color::Magenta),
            Cell::new(format!(
                "codes [{}] -> {} column(s)",
                transformer.encoder.categories[i].join(", "),
                transformer.encoder.output_width(i)
            )),
        ]);
    }
    table
}

/// Print the result of a full training run
pub fn display_training_outcome(outcome: &TrainingOutcome) {
    if !outcome.capped.is_empty() {
        print_section("✂️ ", "OUTLIER CAPPING", &capping_table(&outcome.capped));
    }

    let report = &outcome.report;
    print_section(
        "📋",
        &format!("{} METRICS", report.classifier.name().to_uppercase()),
        &metrics_table(report),
    );
    println!();
    println!(
        "      {} rows x {} columns ingested, {} features after transformation",
        style(outcome.raw_shape.0).yellow().bold(),
        style(outcome.raw_shape.1).yellow().bold(),
        style(report.n_features).yellow().bold()
    );
    println!(
        "      {}",
        style("Metrics describe the held-out evaluation; the saved model is refit on all rows.")
            .dim()
    );
}

/// Print what a persisted transformer and model contain
pub fn display_artifacts(transformer: &FittedTransformer, model: Option<&FittedModel>) {
    print_section("📐", "TRANSFORMER", &transformer_table(transformer));
    println!();
    println!(
        "      Target {}, {} output features",
        style(&transformer.target).cyan(),
        style(transformer.n_features_out()).yellow().bold()
    );

    if let Some(model) = model {
        println!();
        println!(
            "      Model {} fitted on {} rows",
            style(model.kind().name()).cyan().bold(),
            style(model.n_samples).yellow().bold()
        );
    }
}
