//! Galen runner detection
//!
//! Queries the runner version and picks either a direct invocation or the
//! local fallback bootstrap.

use std::path::PathBuf;
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::config::RunOptions;
use crate::error::PipelineError;

/// Argument that makes the runner print its version
const VERSION_ARG: &str = "-v";

/// Set once the fallback advisory has been printed in this process
static FALLBACK_ADVISORY: AtomicBool = AtomicBool::new(false);

/// Result of querying the runner binary
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RunnerStatus {
    Available { version: String },
    Missing(String),
    VersionMismatch { expected: String, found: String },
}

impl RunnerStatus {
    pub fn is_available(&self) -> bool {
        matches!(self, RunnerStatus::Available { .. })
    }

    pub fn as_str(&self) -> &str {
        match self {
            RunnerStatus::Available { .. } => "Available",
            RunnerStatus::Missing(_) => "Missing",
            RunnerStatus::VersionMismatch { .. } => "Version Mismatch",
        }
    }
}

/// How later stages launch the runner
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RunnerInvocation {
    pub available: bool,

    /// Program to execute
    pub program: String,

    /// Arguments placed before `test <file>`
    pub prefix_args: Vec<String>,

    /// Why the direct runner was rejected
    pub unavailable_reason: Option<String>,
}

impl RunnerInvocation {
    pub fn direct(program: impl Into<String>) -> Self {
        Self {
            available: true,
            program: program.into(),
            prefix_args: Vec::new(),
            unavailable_reason: None,
        }
    }

    /// Fallback invocation; `command` is program first
    pub fn fallback(command: &[String], reason: impl Into<String>) -> Self {
        let (program, args) = command
            .split_first()
            .map(|(p, a)| (p.clone(), a.to_vec()))
            .unwrap_or_else(|| ("node".to_string(), Vec::new()));

        Self {
            available: false,
            program,
            prefix_args: args,
            unavailable_reason: Some(reason.into()),
        }
    }

    /// Human-readable invocation prefix
    pub fn prefix(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.prefix_args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Resolves the runner to use for a run
#[derive(Clone, Debug)]
pub struct RunnerResolver {
    program: String,
    fallback: Vec<String>,
    required_version: Option<String>,
    cwd: PathBuf,
    advisory: &'static AtomicBool,
}

impl RunnerResolver {
    pub fn new(program: impl Into<String>, fallback: Vec<String>) -> Self {
        Self {
            program: program.into(),
            fallback,
            required_version: None,
            cwd: PathBuf::from("."),
            advisory: &FALLBACK_ADVISORY,
        }
    }

    pub fn from_options(options: &RunOptions) -> Self {
        Self {
            program: options.runner.clone(),
            fallback: options.fallback.clone(),
            required_version: options.runner_version.clone(),
            cwd: options.cwd.clone(),
            advisory: &FALLBACK_ADVISORY,
        }
    }

    pub fn required_version(mut self, version: impl Into<String>) -> Self {
        self.required_version = Some(version.into());
        self
    }

    pub fn cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = cwd.into();
        self
    }

    #[cfg(test)]
    fn advisory_flag(mut self, flag: &'static AtomicBool) -> Self {
        self.advisory = flag;
        self
    }

    /// Run the version query against the runner binary
    pub async fn check(&self) -> RunnerStatus {
        debug!("Checking runner: {} {}", self.program, VERSION_ARG);

        let output = Command::new(&self.program)
            .arg(VERSION_ARG)
            .current_dir(&self.cwd)
            .stdin(Stdio::null())
            .output()
            .await;

        let output = match output {
            Ok(output) => output,
            Err(e) => return RunnerStatus::Missing(format!("{}: {e}", self.program)),
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return RunnerStatus::Missing(format!(
                "{} {VERSION_ARG} exited with {}: {}",
                self.program,
                output.status,
                stderr.trim()
            ));
        }

        let version = String::from_utf8_lossy(&output.stdout).trim().to_string();

        match &self.required_version {
            Some(expected) if !version.contains(expected.as_str()) => {
                RunnerStatus::VersionMismatch {
                    expected: expected.clone(),
                    found: version,
                }
            }
            _ => RunnerStatus::Available { version },
        }
    }

    /// Pick the invocation later stages will use; never fails
    pub async fn resolve(&self) -> RunnerInvocation {
        let status = self.check().await;

        match status {
            RunnerStatus::Available { version } => {
                info!("Using runner {} ({})", self.program, version);
                RunnerInvocation::direct(&self.program)
            }
            RunnerStatus::Missing(reason) => self.fall_back(reason),
            RunnerStatus::VersionMismatch { expected, found } => {
                self.fall_back(format!("expected version {expected}, found '{found}'"))
            }
        }
    }

    fn fall_back(&self, reason: String) -> RunnerInvocation {
        debug!("{}", PipelineError::RunnerUnavailable(reason.clone()));

        let invocation = RunnerInvocation::fallback(&self.fallback, reason);

        if !self.advisory.swap(true, Ordering::SeqCst) {
            warn!(
                "Galen runner not found; using fallback '{}'. The first run may download Galen, please wait.",
                invocation.prefix()
            );
        }

        invocation
    }
}
