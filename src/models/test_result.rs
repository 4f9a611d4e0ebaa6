//! Test unit and result models
//!
//! Defines what gets scheduled, what a finished runner process yields, and
//! the run-level report aggregated from those results.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// One schedulable execution target
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TestUnit {
    pub path: PathBuf,

    /// True for a merged suite written by the concatenator
    pub synthesized: bool,
}

impl TestUnit {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            synthesized: false,
        }
    }

    pub fn synthesized(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            synthesized: true,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl fmt::Display for TestUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path.display())
    }
}

/// Verdict for a single runner process
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Classification {
    Passed,
    Failed,
    /// Passed, but stderr carried a deprecation/advisory notice
    Warning,
}

impl Classification {
    pub fn symbol(&self) -> &'static str {
        match self {
            Classification::Passed => "✓",
            Classification::Failed => "✗",
            Classification::Warning => "⚠",
        }
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Classification::Passed => write!(f, "PASS"),
            Classification::Failed => write!(f, "FAIL"),
            Classification::Warning => write!(f, "WARN"),
        }
    }
}

/// Outcome of one terminated runner process
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProcessResult {
    pub unit: TestUnit,
    pub stdout: String,
    pub stderr: String,

    /// Exit code, None when killed by a signal or timed out
    pub exit_code: Option<i32>,
    pub classification: Classification,

    /// Text the aggregator counts and the finalizer echoes
    pub output: String,
    pub passed: usize,
    pub failed: usize,
    pub duration_ms: u64,
}

impl ProcessResult {
    pub fn exit_success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

impl fmt::Display for ProcessResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} [{}ms] passed {} / failed {}",
            self.classification.symbol(),
            self.unit,
            self.duration_ms,
            self.passed,
            self.failed
        )
    }
}

/// Overall run verdict
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Success,
    Failure,
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Success => write!(f, "SUCCESS"),
            Verdict::Failure => write!(f, "FAILURE"),
        }
    }
}

/// Accumulates process results; only [`ReportBuilder::finish`] yields a report
#[derive(Debug)]
pub struct ReportBuilder {
    started_at: DateTime<Utc>,
    passed: usize,
    failed: usize,
    results: Vec<ProcessResult>,
}

impl ReportBuilder {
    pub fn new(started_at: DateTime<Utc>) -> Self {
        Self {
            started_at,
            passed: 0,
            failed: 0,
            results: Vec::new(),
        }
    }

    pub fn add(&mut self, result: ProcessResult) {
        self.passed = self.passed.saturating_add(result.passed);
        self.failed = self.failed.saturating_add(result.failed);
        self.results.push(result);
    }

    pub fn pending_len(&self) -> usize {
        self.results.len()
    }

    /// Close the report once every process has been joined
    pub fn finish(mut self) -> RunReport {
        // Arrival order is arbitrary; the log should not be
        self.results.sort_by(|a, b| a.unit.path.cmp(&b.unit.path));

        let total = self.passed.saturating_add(self.failed);
        let percentage = if total > 0 {
            self.passed as f64 / total as f64 * 100.0
        } else {
            0.0
        };
        let verdict = if self.failed > 0 {
            Verdict::Failure
        } else {
            Verdict::Success
        };

        RunReport {
            passed: self.passed,
            failed: self.failed,
            total,
            percentage,
            verdict,
            started_at: self.started_at,
            completed_at: Utc::now(),
            results: self.results,
        }
    }
}

/// Final, run-level report
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RunReport {
    pub passed: usize,
    pub failed: usize,
    pub total: usize,
    pub percentage: f64,
    pub verdict: Verdict,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub results: Vec<ProcessResult>,
}

impl RunReport {
    #[cfg(test)]
    pub fn from_results(results: impl IntoIterator<Item = ProcessResult>) -> Self {
        let mut builder = ReportBuilder::new(Utc::now());
        for result in results {
            builder.add(result);
        }
        builder.finish()
    }

    /// All accepted output, joined with `\n\r`
    pub fn log(&self) -> String {
        self.results
            .iter()
            .map(|r| r.output.as_str())
            .collect::<Vec<_>>()
            .join("\n\r")
    }

    pub fn fail_percentage(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            100.0 - self.percentage
        }
    }

    pub fn duration_ms(&self) -> i64 {
        (self.completed_at - self.started_at).num_milliseconds()
    }

    pub fn is_success(&self) -> bool {
        self.verdict == Verdict::Success
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━")?;
        for result in &self.results {
            writeln!(f, "  {result}")?;
        }
        writeln!(f, "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━")?;
        writeln!(
            f,
            "Total: {} | Pass: {} | Fail: {} | {}",
            self.total, self.passed, self.failed, self.verdict
        )?;
        writeln!(f, "Pass Rate: {:.1}%", self.percentage)
    }
}
