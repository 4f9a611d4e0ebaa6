//! gl.config.js generation
//!
//! Galen's JavaScript engine converts poorly between JSON strings and its
//! own objects, so run parameters reach the shim as a script that calls
//! `config.set(...)` with a literal object.

use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::{debug, info};

use crate::config::{DeviceProfile, ProjectInfo, RunOptions};
use crate::error::{PipelineError, PipelineResult};

/// File name the shim loads its configuration from
pub const CONFIG_ARTIFACT: &str = "gl.config.js";

/// Payload handed to `config.set`
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShimConfig<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project: Option<&'a ProjectInfo>,
    pub url: &'a str,
    pub devices: &'a BTreeMap<String, DeviceProfile>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selenium_grid: Option<GridEndpoint<'a>>,
}

/// Grid hub address
#[derive(Clone, Debug, Serialize)]
pub struct GridEndpoint<'a> {
    pub url: &'a str,
}

impl<'a> ShimConfig<'a> {
    pub fn from_options(options: &'a RunOptions) -> Self {
        Self {
            project: options.project.as_ref(),
            url: &options.url,
            devices: &options.devices,
            selenium_grid: options
                .grid_url
                .as_deref()
                .map(|url| GridEndpoint { url }),
        }
    }

    /// Render the single `config.set(...)` statement
    pub fn render(&self) -> PipelineResult<String> {
        let json = serde_json::to_string(self).map_err(|e| {
            PipelineError::ConfigValidation(format!("unserializable configuration: {e}"))
        })?;
        Ok(format!("config.set({json});\n"))
    }
}

/// Write gl.config.js into the working directory, replacing any previous one
pub fn emit(options: &RunOptions) -> PipelineResult<PathBuf> {
    let path = options.cwd.join(CONFIG_ARTIFACT);
    let content = ShimConfig::from_options(options).render()?;

    debug!("Config artifact: {}", content.trim_end());
    std::fs::write(&path, content).map_err(|e| PipelineError::artifact_io(&path, e))?;

    info!(
        "Wrote {} ({} device profile(s))",
        path.display(),
        options.devices.len()
    );
    Ok(path)
}
