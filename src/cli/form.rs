//! Interactive prediction form using dialoguer
//!
//! Fields come from the persisted transformer: one numeric input per numeric
//! feature and a drop-down of the known codes per nominal feature.

use anyhow::Result;
use dialoguer::theme::ColorfulTheme;
use dialoguer::{Confirm, Input, Select};

use crate::pipeline::{FieldValue, FittedTransformer};

/// Ask for every input feature of `transformer`, in partition order.
pub fn fill_form(transformer: &FittedTransformer) -> Result<Vec<(String, FieldValue)>> {
    let theme = ColorfulTheme::default();
    let mut values = Vec::with_capacity(transformer.partition.len());

    for name in &transformer.partition.numeric {
        let value: f64 = Input::with_theme(&theme)
            .with_prompt(name)
            .default(0.0)
            .interact_text()?;
        values.push((name.clone(), FieldValue::Numeric(value)));
    }

    for (i, name) in transformer.partition.nominal.iter().enumerate() {
        let codes = &transformer.encoder.categories[i];
        let choice = Select::with_theme(&theme)
            .with_prompt(name)
            .items(codes)
            .default(0)
            .interact()?;
        values.push((name.clone(), FieldValue::Code(codes[choice].clone())));
    }

    Ok(values)
}

/// Ask whether to score another applicant
pub fn confirm_another() -> Result<bool> {
    let again = Confirm::new()
        .with_prompt("Score another applicant?")
        .default(false)
        .interact()?;
    Ok(again)
}
