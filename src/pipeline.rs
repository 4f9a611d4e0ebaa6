//! Test run pipeline
//!
//! resolve runner → provision shim → emit config → concatenate → spawn and
//! join → aggregate. The merged suite is owned by a guard for the whole
//! run, so every early return removes it.

use chrono::Utc;
use std::io::Write;
use tracing::{debug, error, info};

use crate::artifact::{emit, ensure_shim, Concatenator, TransientSuite};
use crate::config::RunOptions;
use crate::error::{PipelineError, PipelineResult};
use crate::executor::ProcessScheduler;
use crate::finalize::Finalizer;
use crate::models::{ReportBuilder, RunReport, TestUnit, Verdict};
use crate::output::{OutputFormat, ReportFormatter};
use crate::runner::{RunnerInvocation, RunnerResolver};
use crate::utils::Stopwatch;

/// A finished run whose transient files have not been released yet
#[derive(Debug)]
pub struct RunOutcome {
    pub report: RunReport,
    pub transient: Option<TransientSuite>,
}

/// Drives one test run
#[derive(Clone, Debug)]
pub struct Pipeline {
    options: RunOptions,
    invocation: Option<RunnerInvocation>,
}

impl Pipeline {
    pub fn new(options: RunOptions) -> Self {
        Self {
            options,
            invocation: None,
        }
    }

    /// Use `invocation` instead of resolving the runner
    #[cfg(test)]
    pub fn with_invocation(mut self, invocation: RunnerInvocation) -> Self {
        self.invocation = Some(invocation);
        self
    }

    /// Run every stage up to the aggregated report
    pub async fn run(&self, units: Vec<TestUnit>) -> PipelineResult<RunOutcome> {
        let started_at = Utc::now();
        let mut stopwatch = Stopwatch::new();

        let invocation = match &self.invocation {
            Some(invocation) => invocation.clone(),
            None => RunnerResolver::from_options(&self.options).resolve().await,
        };
        stopwatch.lap("resolve");

        ensure_shim(
            &self.options.cwd,
            self.options.use_shim,
            self.options.shim_source.as_deref(),
        )?;
        stopwatch.lap("shim");

        emit(&self.options)?;
        stopwatch.lap("config");

        let (units, transient) = Concatenator::new(&self.options.cwd)
            .enabled(self.options.concat)
            .bootstrap(self.options.use_shim)
            .concatenate(units)?;
        stopwatch.lap("concat");

        let results = ProcessScheduler::from_options(&self.options)
            .run(&units, &invocation)
            .await
            .map_err(|e| {
                if let (PipelineError::ProcessSpawn { .. }, Some(reason)) =
                    (&e, &invocation.unavailable_reason)
                {
                    error!("{}", PipelineError::RunnerUnavailable(reason.clone()));
                }
                e
            })?;
        stopwatch.lap("run");

        let mut builder = ReportBuilder::new(started_at);
        for result in results {
            builder.add(result);
        }
        debug!("Aggregating {} process result(s)", builder.pending_len());
        let report = builder.finish();
        stopwatch.lap("aggregate");

        debug!("Stage timings: {}", stopwatch.format());
        info!(
            "{} process(es) finished in {}ms",
            report.results.len(),
            stopwatch.total().as_millis()
        );

        Ok(RunOutcome { report, transient })
    }

    /// Run, print the report to `out` and release transient files.
    ///
    /// The table format is followed by the summary on `out`; machine formats
    /// keep `out` clean and send the summary to stderr.
    pub async fn execute<W: Write>(
        &self,
        units: Vec<TestUnit>,
        formatter: &ReportFormatter,
        out: &mut W,
    ) -> anyhow::Result<(RunReport, Verdict)> {
        let outcome = self.run(units).await?;
        let finalizer = Finalizer::from_options(&self.options);
        let rendered = formatter.format_report(&outcome.report)?;

        let verdict = match formatter.format() {
            OutputFormat::Table => {
                out.write_all(rendered.as_bytes())?;
                finalizer.finalize(&outcome.report, outcome.transient, out)?
            }
            _ => {
                let verdict = finalizer.finalize(
                    &outcome.report,
                    outcome.transient,
                    &mut std::io::stderr(),
                )?;
                writeln!(out, "{rendered}")?;
                verdict
            }
        };

        Ok((outcome.report, verdict))
    }
}
