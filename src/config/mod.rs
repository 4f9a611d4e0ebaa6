//! Configuration module
//!
//! Turns a raw options file (plus CLI and environment overrides) into a
//! validated, immutable [`RunOptions`].

mod env;
mod file;

pub use env::{print_env_help, EnvConfig};
pub use file::{DeviceSpec, GridSpec, OptionsFile};

use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::{debug, info};

use crate::error::{PipelineError, PipelineResult};

/// Default browser when a device profile does not name one
pub const DEFAULT_BROWSER: &str = "firefox";

/// Default fallback bootstrap, relative to the working directory
pub const DEFAULT_FALLBACK: &[&str] = &["node", "node_modules/grunt-galen/galen-cli/galen.js"];

/// Device profile as the shim sees it
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DeviceProfile {
    #[serde(rename = "deviceName")]
    pub name: String,

    pub browser: String,

    /// Viewport "WxH"; absent for remote grid profiles
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,

    /// Free-form capabilities passed through to the grid driver
    #[serde(flatten)]
    pub capabilities: BTreeMap<String, String>,
}

impl DeviceProfile {
    pub fn new(name: impl Into<String>, browser: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            browser: browser.into(),
            size: None,
            capabilities: BTreeMap::new(),
        }
    }

    pub fn with_size(mut self, size: impl Into<String>) -> Self {
        self.size = Some(size.into());
        self
    }

    pub fn with_capability(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.capabilities.insert(key.into(), value.into());
        self
    }

    /// Remote profiles have no local viewport and run on the grid
    pub fn is_remote(&self) -> bool {
        self.size.is_none()
    }

    /// Parse the viewport into (width, height)
    pub fn viewport(&self) -> Option<(u32, u32)> {
        parse_size(self.size.as_deref()?)
    }
}

/// Project identity handed to the shim
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ProjectInfo {
    pub name: String,
    pub url: String,
}

/// Validated run configuration
#[derive(Clone, Debug)]
pub struct RunOptions {
    /// Target base URL
    pub url: String,

    /// Optional project identity
    pub project: Option<ProjectInfo>,

    /// Device profiles keyed by name
    pub devices: BTreeMap<String, DeviceProfile>,

    /// Selenium grid endpoint, already synthesized
    pub grid_url: Option<String>,

    /// Echo the full runner log before the summary
    pub output: bool,

    /// Ask the runner for an HTML report
    pub html_report: bool,

    /// HTML report destination
    pub html_report_dest: Option<String>,

    /// Merge all test files into one execution unit
    pub concat: bool,

    /// Provision and bootstrap the gl.js shim
    pub use_shim: bool,

    /// Working directory for artifacts and child processes
    pub cwd: PathBuf,

    /// Concurrent child process cap (None = unbounded)
    pub max_concurrent: Option<usize>,

    /// Per-process timeout in seconds (None = wait forever)
    pub timeout_secs: Option<u64>,

    /// Runner program name or path
    pub runner: String,

    /// Fallback invocation used when the runner is unavailable
    pub fallback: Vec<String>,

    /// Version string the runner must report
    pub runner_version: Option<String>,

    /// Where to copy gl.js from when it is missing
    pub shim_source: Option<PathBuf>,
}

impl RunOptions {
    /// Validate a raw options file into run options
    pub fn from_file(raw: OptionsFile) -> PipelineResult<Self> {
        let mut grid_url = raw.selenium_grid.as_ref().map(GridSpec::endpoint);

        let mut devices = BTreeMap::new();
        for (key, spec) in &raw.devices {
            let profile = validate_device(key, spec)?;
            devices.insert(key.clone(), profile);
        }

        if raw.skip_grid.unwrap_or(false) {
            let before = devices.len();
            devices.retain(|_, d: &mut DeviceProfile| !d.is_remote());
            if grid_url.take().is_some() || before != devices.len() {
                info!(
                    "Skipping grid execution ({} remote profile(s) dropped)",
                    before - devices.len()
                );
            }
        }

        if devices.is_empty() {
            return Err(PipelineError::ConfigValidation(
                "at least one device profile is required".to_string(),
            ));
        }

        let project = raw.project.as_ref().map(|p| ProjectInfo {
            name: p.name.clone().unwrap_or_else(|| "Project".to_string()),
            url: p
                .url
                .clone()
                .or_else(|| raw.url.clone())
                .unwrap_or_default(),
        });

        let url = raw
            .url
            .clone()
            .filter(|u| !u.trim().is_empty())
            .or_else(|| project.as_ref().map(|p| p.url.clone()))
            .filter(|u| !u.trim().is_empty())
            .ok_or_else(|| PipelineError::ConfigValidation("missing target url".to_string()))?;

        if raw.max_concurrent == Some(0) {
            return Err(PipelineError::ConfigValidation(
                "max_concurrent must be at least 1".to_string(),
            ));
        }

        let cwd = raw.cwd.clone().unwrap_or_else(|| PathBuf::from("."));
        let fallback = raw.fallback.clone().unwrap_or_else(|| {
            DEFAULT_FALLBACK.iter().map(|s| s.to_string()).collect()
        });
        if fallback.is_empty() {
            return Err(PipelineError::ConfigValidation(
                "fallback command must not be empty".to_string(),
            ));
        }

        let options = Self {
            url,
            project,
            devices,
            grid_url,
            output: raw.output.unwrap_or(false),
            html_report: raw.html_report.unwrap_or(false),
            html_report_dest: raw.html_report_dest.clone(),
            concat: raw.concat.unwrap_or(false),
            use_shim: raw.use_shim.unwrap_or(true),
            cwd,
            max_concurrent: raw.max_concurrent,
            timeout_secs: raw.timeout_secs,
            runner: raw.runner.clone().unwrap_or_else(|| "galen".to_string()),
            fallback,
            runner_version: raw.runner_version.clone(),
            shim_source: raw.shim_source.clone(),
        };

        debug!("Validated run options: {:?}", options);
        Ok(options)
    }

    /// Minimal options for a target URL and device set
    #[cfg(test)]
    pub fn new(url: impl Into<String>, devices: Vec<DeviceProfile>) -> Self {
        Self {
            url: url.into(),
            project: None,
            devices: devices.into_iter().map(|d| (d.name.clone(), d)).collect(),
            grid_url: None,
            output: false,
            html_report: false,
            html_report_dest: None,
            concat: false,
            use_shim: true,
            cwd: PathBuf::from("."),
            max_concurrent: None,
            timeout_secs: None,
            runner: "galen".to_string(),
            fallback: DEFAULT_FALLBACK.iter().map(|s| s.to_string()).collect(),
            runner_version: None,
            shim_source: None,
        }
    }

    #[cfg(test)]
    pub fn with_cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = cwd.into();
        self
    }

    #[cfg(test)]
    pub fn with_concat(mut self, concat: bool) -> Self {
        self.concat = concat;
        self
    }
}

fn validate_device(key: &str, spec: &DeviceSpec) -> PipelineResult<DeviceProfile> {
    let name = spec.device_name.clone().unwrap_or_else(|| key.to_string());

    if let Some(size) = &spec.size {
        if parse_size(size).is_none() {
            return Err(PipelineError::ConfigValidation(format!(
                "device '{name}': invalid size '{size}', expected WxH"
            )));
        }
    }

    let browser = spec.browser.as_deref().unwrap_or(DEFAULT_BROWSER);
    let mut profile = DeviceProfile::new(name.as_str(), browser);
    if let Some(size) = &spec.size {
        profile = profile.with_size(size.as_str());
    }

    for (capability, value) in &spec.capabilities {
        match value {
            serde_json::Value::String(s) => {
                profile = profile.with_capability(capability.as_str(), s.as_str());
            }
            other => {
                return Err(PipelineError::NonStringCapability {
                    device: name,
                    capability: capability.clone(),
                    found: json_type_name(other).to_string(),
                });
            }
        }
    }

    Ok(profile)
}

fn json_type_name(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

/// Parse "WxH" into (width, height)
pub fn parse_size(size: &str) -> Option<(u32, u32)> {
    let (w, h) = size.trim().split_once(['x', 'X'])?;
    let w = w.trim().parse().ok()?;
    let h = h.trim().parse().ok()?;
    if w == 0 || h == 0 {
        return None;
    }
    Some((w, h))
}
