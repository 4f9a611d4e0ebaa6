//! Test suite concatenation
//!
//! Every Galen process pays a JVM and browser startup cost, so many small
//! test scripts can be merged into one. Each script body is wrapped in its
//! own function scope, and the shim bootstrap is loaded once at the top.

use chrono::Utc;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::{debug, info};

use super::TransientSuite;
use crate::error::{PipelineError, PipelineResult};
use crate::models::TestUnit;

/// Directory (under the working directory) holding merged suites
pub const TRANSIENT_DIR: &str = ".galen-concat";

/// Bootstrap line placed at the top of a merged suite
pub const BOOTSTRAP_IMPORT: &str = "load('../gl.js');";

fn bootstrap_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"^\s*load\(\s*['"][^'"]*gl\.js['"]\s*\)\s*;?\s*$"#)
            .expect("valid bootstrap regex")
    })
}

/// Whether a script line is the shim bootstrap import
pub fn is_bootstrap_line(line: &str) -> bool {
    bootstrap_pattern().is_match(line)
}

/// Merges test units into a single synthesized unit
#[derive(Clone, Debug)]
pub struct Concatenator {
    cwd: PathBuf,
    enabled: bool,
    bootstrap: bool,
}

impl Concatenator {
    pub fn new(cwd: impl Into<PathBuf>) -> Self {
        Self {
            cwd: cwd.into(),
            enabled: true,
            bootstrap: true,
        }
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Prepend the shim bootstrap (off when the shim is not used)
    pub fn bootstrap(mut self, bootstrap: bool) -> Self {
        self.bootstrap = bootstrap;
        self
    }

    pub fn transient_dir(&self) -> PathBuf {
        self.cwd.join(TRANSIENT_DIR)
    }

    /// Merge `units` into one, or hand them back untouched.
    ///
    /// The returned guard owns the merged suite; dropping it removes the
    /// suite, so it must outlive every process reading it. Concurrent runs
    /// in the same working directory each get their own suite file.
    pub fn concatenate(
        &self,
        units: Vec<TestUnit>,
    ) -> PipelineResult<(Vec<TestUnit>, Option<TransientSuite>)> {
        if !self.enabled || units.len() <= 1 {
            return Ok((units, None));
        }

        let mut sources = Vec::with_capacity(units.len());
        for unit in &units {
            let text = std::fs::read_to_string(unit.path())
                .map_err(|e| PipelineError::artifact_io(unit.path(), e))?;
            sources.push((unit.path(), text));
        }

        let merged = merge_sources(&sources, self.bootstrap);

        let dir = self.transient_dir();
        let path = dir.join(synthesized_name());
        let guard = TransientSuite::new(&path, &dir);
        write_suite(&dir, &path, &merged)?;

        info!(
            "Concatenated {} test file(s) into {}",
            units.len(),
            path.display()
        );

        Ok((vec![TestUnit::synthesized(path)], Some(guard)))
    }
}

/// Write a suite, recreating the directory if a finishing run removed it
fn write_suite(dir: &Path, path: &Path, merged: &str) -> PipelineResult<()> {
    let mut retried = false;
    loop {
        std::fs::create_dir_all(dir).map_err(|e| PipelineError::artifact_io(dir, e))?;
        match std::fs::write(path, merged) {
            Ok(()) => return Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound && !retried => retried = true,
            Err(e) => return Err(PipelineError::artifact_io(path, e)),
        }
    }
}

/// Build the merged script text, keeping source order
pub fn merge_sources(sources: &[(&Path, String)], bootstrap: bool) -> String {
    let mut merged = String::new();

    if bootstrap {
        merged.push_str(BOOTSTRAP_IMPORT);
        merged.push('\n');
    }

    for (path, text) in sources {
        let mut stripped = 0;
        let body: Vec<&str> = text
            .lines()
            .filter(|line| {
                let keep = !is_bootstrap_line(line);
                if !keep {
                    stripped += 1;
                }
                keep
            })
            .collect();

        debug!(
            "{}: {} line(s), {} bootstrap import(s) stripped",
            path.display(),
            body.len(),
            stripped
        );

        merged.push_str(&format!(
            "\n// {}\n(function () {{\n{}\n}})();\n",
            path.display(),
            body.join("\n")
        ));
    }

    merged
}

/// `suite_<timestamp>_<random>.test.js`, unique per invocation
fn synthesized_name() -> String {
    let timestamp = Utc::now().format("%Y%m%d%H%M%S%3f");
    let random: u32 = rand::random();
    format!("suite_{timestamp}_{random:08x}.test.js")
}
