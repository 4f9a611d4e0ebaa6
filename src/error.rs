//! Pipeline error taxonomy
//!
//! Fatal stages return a [`PipelineError`]; per-unit test failures are
//! aggregated into the report instead.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that abort (or redirect) a test run
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Invalid run configuration: {0}")]
    ConfigValidation(String),

    #[error("Device '{device}': capability '{capability}' must be a string, got {found}")]
    NonStringCapability {
        device: String,
        capability: String,
        found: String,
    },

    #[error("Galen runner unavailable: {0}")]
    RunnerUnavailable(String),

    #[error("Failed to spawn runner for {path}: {source}")]
    ProcessSpawn {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Artifact I/O failed for {path}: {source}")]
    ArtifactIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl PipelineError {
    pub fn artifact_io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        PipelineError::ArtifactIo {
            path: path.into(),
            source,
        }
    }

    /// Whether the error originates before any process was spawned
    pub fn is_pre_spawn(&self) -> bool {
        matches!(
            self,
            PipelineError::ConfigValidation(_)
                | PipelineError::NonStringCapability { .. }
                | PipelineError::ArtifactIo { .. }
        )
    }
}

pub type PipelineResult<T> = Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capability_error_names_capability() {
        let err = PipelineError::NonStringCapability {
            device: "iphone".to_string(),
            capability: "deviceOrientation".to_string(),
            found: "number".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("deviceOrientation"));
        assert!(msg.contains("iphone"));
        assert!(err.is_pre_spawn());
    }

    #[test]
    fn test_spawn_error_is_not_pre_spawn() {
        let err = PipelineError::ProcessSpawn {
            path: PathBuf::from("test/a.test.js"),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        };
        assert!(!err.is_pre_spawn());
        assert!(err.to_string().contains("a.test.js"));
    }
}
