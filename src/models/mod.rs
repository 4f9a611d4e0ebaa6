//! Data models for test orchestration
//!
//! This module contains the units, results and reports passed between
//! pipeline stages.

mod test_result;

pub use test_result::{
    Classification, ProcessResult, ReportBuilder, RunReport, TestUnit, Verdict,
};
