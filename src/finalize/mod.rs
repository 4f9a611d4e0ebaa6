//! Run finalization
//!
//! Prints the optional verbose log and the pass/fail summary, removes the
//! merged suite and maps the report to an exit status.

use std::io::Write;
use std::process::ExitCode;
use tracing::{info, warn};

use crate::artifact::TransientSuite;
use crate::config::RunOptions;
use crate::models::{RunReport, Verdict};

/// Writes the end-of-run summary
#[derive(Clone, Debug, Default)]
pub struct Finalizer {
    echo_log: bool,
}

impl Finalizer {
    pub fn new(echo_log: bool) -> Self {
        Self { echo_log }
    }

    pub fn from_options(options: &RunOptions) -> Self {
        Self::new(options.output)
    }

    /// Everything printed for `report`, log first when enabled
    pub fn render(&self, report: &RunReport) -> String {
        let mut text = String::new();

        if self.echo_log {
            text.push_str(&report.log());
            text.push('\n');
        }

        text.push_str(&summary(report));
        text
    }

    /// Print the summary and release the merged suite.
    ///
    /// Cleanup failures are logged; they never change the verdict.
    pub fn finalize<W: Write>(
        &self,
        report: &RunReport,
        transient: Option<TransientSuite>,
        out: &mut W,
    ) -> std::io::Result<Verdict> {
        if let Some(mut suite) = transient {
            if let Err(e) = suite.cleanup() {
                warn!(
                    "Failed to remove merged suite {}: {}",
                    suite.path().display(),
                    e
                );
            }
        }

        out.write_all(self.render(report).as_bytes())?;
        out.flush()?;

        info!(
            "Run finished in {}ms: {}",
            report.duration_ms(),
            report.verdict
        );
        Ok(report.verdict)
    }
}

/// `passed N test(s) [P%]`, plus the failed line when anything failed
pub fn summary(report: &RunReport) -> String {
    let mut lines = format!(
        "passed {} test(s) [{}%]\n",
        report.passed,
        format_percentage(report.percentage)
    );

    if report.failed > 0 {
        lines.push_str(&format!(
            "failed {} test(s) [{}%]\n",
            report.failed,
            format_percentage(report.fail_percentage())
        ));
    }

    lines
}

/// Whole numbers print bare, anything else with up to two decimals
pub fn format_percentage(value: f64) -> String {
    if value.fract() == 0.0 {
        return format!("{value:.0}");
    }
    let text = format!("{value:.2}");
    text.trim_end_matches('0').trim_end_matches('.').to_string()
}

pub fn exit_code(verdict: Verdict) -> ExitCode {
    match verdict {
        Verdict::Success => ExitCode::SUCCESS,
        Verdict::Failure => ExitCode::FAILURE,
    }
}
