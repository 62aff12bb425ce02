//! Report module - rendering pipeline results as tables

pub mod summary;

pub use summary::*;
