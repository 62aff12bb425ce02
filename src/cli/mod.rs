//! CLI module - argument parsing and the interactive prediction form

mod args;
pub mod form;

pub use args::{Cli, Commands};
pub use form::{confirm_another, fill_form};
