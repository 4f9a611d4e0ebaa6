//! gl.js provisioning
//!
//! Test scripts `load('../gl.js')` from the working directory. When the file
//! is missing it is copied from the configured shim source.

use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::error::{PipelineError, PipelineResult};

/// Shim library file name
pub const SHIM_FILE: &str = "gl.js";

/// Outcome of checking for the shim
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ShimStatus {
    /// Shim use is switched off
    Disabled,
    /// Already in place
    Present(PathBuf),
    /// Copied from the shim source
    Installed(PathBuf),
    /// Neither present nor installable
    Missing,
}

/// Make sure `<cwd>/gl.js` exists when the shim is in use
pub fn ensure_shim(
    cwd: &Path,
    use_shim: bool,
    source: Option<&Path>,
) -> PipelineResult<ShimStatus> {
    if !use_shim {
        debug!("Shim library disabled");
        return Ok(ShimStatus::Disabled);
    }

    let target = cwd.join(SHIM_FILE);
    if target.is_file() {
        debug!("Shim library present at {}", target.display());
        return Ok(ShimStatus::Present(target));
    }

    match source {
        Some(source) => {
            std::fs::copy(source, &target).map_err(|e| PipelineError::artifact_io(source, e))?;
            info!("Copied {} to {}", source.display(), target.display());
            Ok(ShimStatus::Installed(target))
        }
        None => {
            warn!(
                "{} not found in {} and no shim source configured; tests loading it will fail",
                SHIM_FILE,
                cwd.display()
            );
            Ok(ShimStatus::Missing)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_disabled() {
        let dir = tempdir().unwrap();
        assert_eq!(
            ensure_shim(dir.path(), false, None).unwrap(),
            ShimStatus::Disabled
        );
    }

    #[test]
    fn test_present_is_left_alone() {
        let dir = tempdir().unwrap();
        let target = dir.path().join(SHIM_FILE);
        std::fs::write(&target, "// local gl").unwrap();

        let status = ensure_shim(dir.path(), true, None).unwrap();
        assert_eq!(status, ShimStatus::Present(target.clone()));
        assert_eq!(std::fs::read_to_string(target).unwrap(), "// local gl");
    }

    #[test]
    fn test_installs_from_source() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("vendor-gl.js");
        std::fs::write(&source, "var config;").unwrap();

        let status = ensure_shim(dir.path(), true, Some(&source)).unwrap();
        let target = dir.path().join(SHIM_FILE);
        assert_eq!(status, ShimStatus::Installed(target.clone()));
        assert_eq!(std::fs::read_to_string(target).unwrap(), "var config;");
    }

    #[test]
    fn test_missing_without_source() {
        let dir = tempdir().unwrap();
        assert_eq!(
            ensure_shim(dir.path(), true, None).unwrap(),
            ShimStatus::Missing
        );
    }

    #[test]
    fn test_bad_source_is_io_error() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("nope.js");
        assert!(ensure_shim(dir.path(), true, Some(&source)).is_err());
    }
}
