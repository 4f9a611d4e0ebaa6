//! Report output
//!
//! Formats the run report for stdout and exports it to files.

mod export;
mod formatter;

pub use export::export;
pub use formatter::{OutputFormat, ReportFormatter};
