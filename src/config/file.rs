//! Options file management
//!
//! Handles finding, loading and saving the run options file. Keys are
//! camelCase (`seleniumGrid`, `htmlReport`, ...).

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Options file locations (in order of precedence)
const CONFIG_LOCATIONS: &[&str] = &[
    "./galen.yaml",
    "./galen.yml",
    "./.galen.yaml",
    "./galen.json",
    "~/.config/galen-runner/config.yaml",
];

/// Raw, unvalidated run options
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionsFile {
    /// Test file glob patterns
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub src: Vec<String>,

    /// Target base URL
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// Project name and URL
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project: Option<ProjectSpec>,

    /// Device profiles keyed by name
    #[serde(default)]
    pub devices: BTreeMap<String, DeviceSpec>,

    /// Remote grid settings
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selenium_grid: Option<GridSpec>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub html_report: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub html_report_dest: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub concat: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub use_shim: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub cwd: Option<PathBuf>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_concurrent: Option<usize>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,

    /// Runner program (defaults to `galen`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub runner: Option<String>,

    /// Fallback invocation, program first
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback: Option<Vec<String>>,

    /// Version the runner must report
    #[serde(skip_serializing_if = "Option::is_none")]
    pub runner_version: Option<String>,

    /// Source of gl.js to provision into the working directory
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shim_source: Option<PathBuf>,

    /// Skip remote/grid profiles
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skip_grid: Option<bool>,
}

/// Raw device profile; unknown keys are capabilities
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct DeviceSpec {
    #[serde(rename = "deviceName", default, skip_serializing_if = "Option::is_none")]
    pub device_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub browser: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,

    #[serde(flatten)]
    pub capabilities: BTreeMap<String, serde_json::Value>,
}

/// Project identity
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ProjectSpec {
    pub name: Option<String>,
    pub url: Option<String>,
}

/// Selenium grid settings
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GridSpec {
    /// Explicit hub URL; wins over the parts below
    pub url: Option<String>,
    pub username: Option<String>,
    pub access_key: Option<String>,
    pub protocol: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub path: Option<String>,
}

impl GridSpec {
    /// Hub endpoint, synthesized from credentials when no URL is given
    pub fn endpoint(&self) -> String {
        if let Some(url) = self.url.as_deref().filter(|u| !u.is_empty()) {
            return url.to_string();
        }

        let protocol = self.protocol.as_deref().unwrap_or("http");
        let username = self.username.as_deref().unwrap_or_default();
        let access_key = self.access_key.as_deref().unwrap_or_default();
        let host = self.host.as_deref().unwrap_or("ondemand.saucelabs.com");
        let port = self.port.unwrap_or(80);
        let path = self.path.as_deref().unwrap_or("/wd/hub");
        let path = if path.starts_with('/') {
            path.to_string()
        } else {
            format!("/{path}")
        };

        format!("{protocol}://{username}:{access_key}@{host}:{port}{path}")
    }
}

impl OptionsFile {
    /// Find an options file in standard locations
    pub fn find() -> Option<PathBuf> {
        CONFIG_LOCATIONS
            .iter()
            .map(|location| expand_path(location))
            .find(|path| path.exists())
    }

    /// Load from the default location, or start empty
    pub fn load_default() -> Result<Self> {
        match Self::find() {
            Some(path) => Self::load(&path),
            None => Ok(Self::default()),
        }
    }

    /// Load options from file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read options file: {}", path.display()))?;

        let options: Self = if is_yaml_file(path) {
            serde_yaml::from_str(&content)
                .with_context(|| format!("Failed to parse YAML options: {}", path.display()))?
        } else {
            serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse JSON options: {}", path.display()))?
        };

        Ok(options)
    }

    /// Save options to file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let content = if is_yaml_file(path) {
            serde_yaml::to_string(self).context("Failed to serialize options")?
        } else {
            serde_json::to_string_pretty(self).context("Failed to serialize options")?
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }

        std::fs::write(path, content)
            .with_context(|| format!("Failed to write options file: {}", path.display()))?;

        Ok(())
    }

    /// Example options mirroring a typical local setup
    pub fn example() -> Self {
        let mut devices = BTreeMap::new();
        devices.insert(
            "desktop".to_string(),
            DeviceSpec {
                device_name: Some("desktop".to_string()),
                browser: Some("firefox".to_string()),
                size: Some("1280x800".to_string()),
                capabilities: BTreeMap::new(),
            },
        );
        devices.insert(
            "tablet".to_string(),
            DeviceSpec {
                device_name: Some("tablet".to_string()),
                browser: Some("firefox".to_string()),
                size: Some("768x576".to_string()),
                capabilities: BTreeMap::new(),
            },
        );

        Self {
            src: vec!["test/**/*.test.js".to_string()],
            url: Some("http://127.0.0.1:3000".to_string()),
            devices,
            output: Some(true),
            ..Default::default()
        }
    }
}

/// Expand ~ to home directory
fn expand_path(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}

/// Check if file is YAML based on extension
fn is_yaml_file(path: &Path) -> bool {
    path.extension()
        .map(|e| e == "yaml" || e == "yml")
        .unwrap_or(false)
}
