//! Runner process scheduling
//!
//! Spawns one runner process per test unit and joins them all. The
//! orchestration stays on the calling task: children run in parallel at the
//! OS level while this side only awaits their termination.

use futures::future::try_join_all;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use super::command::{build_command, command_args, unit_argument, DEFAULT_HTML_REPORT_DEST};
use crate::classify::{evaluate, CapturedOutput};
use crate::config::RunOptions;
use crate::error::{PipelineError, PipelineResult};
use crate::models::{ProcessResult, TestUnit};
use crate::runner::RunnerInvocation;
use crate::utils::Timer;

/// Spawns and joins runner processes
#[derive(Clone, Debug)]
pub struct ProcessScheduler {
    cwd: PathBuf,
    max_concurrent: Option<usize>,
    timeout_secs: Option<u64>,
    html_report_dest: Option<String>,
}

impl ProcessScheduler {
    pub fn new(cwd: impl Into<PathBuf>) -> Self {
        Self {
            cwd: cwd.into(),
            max_concurrent: None,
            timeout_secs: None,
            html_report_dest: None,
        }
    }

    pub fn from_options(options: &RunOptions) -> Self {
        let mut scheduler = Self::new(&options.cwd);

        if let Some(max) = options.max_concurrent {
            scheduler = scheduler.with_max_concurrent(max);
        }
        if let Some(secs) = options.timeout_secs {
            scheduler = scheduler.with_timeout(secs);
        }
        if options.html_report {
            scheduler = scheduler.with_html_report(
                options
                    .html_report_dest
                    .as_deref()
                    .unwrap_or(DEFAULT_HTML_REPORT_DEST),
            );
        }

        scheduler
    }

    /// Cap concurrent runner processes (unbounded by default)
    pub fn with_max_concurrent(mut self, max: usize) -> Self {
        self.max_concurrent = Some(max.max(1));
        self
    }

    /// Kill runners that exceed `secs` (no timeout by default)
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }

    pub fn with_html_report(mut self, dest: impl Into<String>) -> Self {
        self.html_report_dest = Some(dest.into());
        self
    }

    /// Run every unit and wait for all of them.
    ///
    /// A unit that cannot be spawned aborts the whole call: children still
    /// running are killed and no results are returned.
    pub async fn run(
        &self,
        units: &[TestUnit],
        invocation: &RunnerInvocation,
    ) -> PipelineResult<Vec<ProcessResult>> {
        match self.max_concurrent {
            Some(max) => info!(
                "Starting Galen: {} process(es), at most {} at a time",
                units.len(),
                max
            ),
            None => info!("Starting Galen: {} process(es)", units.len()),
        }

        let semaphore = self.max_concurrent.map(|n| Arc::new(Semaphore::new(n)));

        let pending = units
            .iter()
            .map(|unit| self.run_unit(unit.clone(), invocation, semaphore.clone()));

        let results = try_join_all(pending).await?;

        debug!("Joined {} runner process(es)", results.len());
        Ok(results)
    }

    async fn run_unit(
        &self,
        unit: TestUnit,
        invocation: &RunnerInvocation,
        semaphore: Option<Arc<Semaphore>>,
    ) -> PipelineResult<ProcessResult> {
        let _permit = match semaphore {
            Some(semaphore) => semaphore.acquire_owned().await.ok(),
            None => None,
        };

        let html = self.html_report_dest.as_deref();
        debug!(
            "Spawning: {} {}",
            invocation.program,
            command_args(invocation, &unit_argument(&unit), html).join(" ")
        );

        let timer = Timer::start(unit.to_string());
        let child = build_command(invocation, &unit, &self.cwd, html)
            .spawn()
            .map_err(|source| PipelineError::ProcessSpawn {
                path: unit.path.clone(),
                source,
            })?;

        let waited = match self.timeout_secs {
            Some(secs) => {
                match tokio::time::timeout(Duration::from_secs(secs), child.wait_with_output())
                    .await
                {
                    Ok(waited) => waited,
                    Err(_) => {
                        // Dropping the wait future kills the child
                        warn!("{} timed out after {}s", timer.label(), secs);
                        let captured = CapturedOutput {
                            stderr: format!("runner timed out after {secs}s"),
                            duration_ms: timer.elapsed_ms(),
                            ..Default::default()
                        };
                        return Ok(evaluate(unit, captured));
                    }
                }
            }
            None => child.wait_with_output().await,
        };

        let captured = match waited {
            Ok(output) => CapturedOutput {
                stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
                exit_code: output.status.code(),
                duration_ms: timer.elapsed_ms(),
            },
            Err(e) => CapturedOutput {
                stderr: format!("failed to collect runner output: {e}"),
                duration_ms: timer.elapsed_ms(),
                ..Default::default()
            },
        };

        let result = evaluate(unit, captured);
        info!("   • {} done", result.unit);
        debug!("{}", result);

        Ok(result)
    }
}
