//! Transient run artifacts
//!
//! Everything written to disk before the runner starts: the shim
//! configuration script, the optional merged suite and the shim library.

pub mod concat;
pub mod config;
pub mod shim;

pub use concat::Concatenator;
pub use config::emit;
pub use shim::ensure_shim;

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Owns one merged suite inside the shared transient directory.
///
/// Dropping it removes the suite, then the directory once no other run has
/// a suite left in it.
#[derive(Debug)]
pub struct TransientSuite {
    file: PathBuf,
    dir: PathBuf,
    removed: bool,
}

impl TransientSuite {
    pub fn new(file: impl Into<PathBuf>, dir: impl Into<PathBuf>) -> Self {
        Self {
            file: file.into(),
            dir: dir.into(),
            removed: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.file
    }

    /// Remove the suite now; later calls and the drop are no-ops
    pub fn cleanup(&mut self) -> std::io::Result<()> {
        if self.removed {
            return Ok(());
        }
        self.removed = true;

        match std::fs::remove_file(&self.file) {
            Ok(()) => debug!("Removed merged suite {}", self.file.display()),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(e),
        }

        remove_dir_if_empty(&self.dir)
    }
}

impl Drop for TransientSuite {
    fn drop(&mut self) {
        if let Err(e) = self.cleanup() {
            warn!(
                "Failed to remove merged suite {}: {}",
                self.file.display(),
                e
            );
        }
    }
}

/// A concurrent run may still own files in `dir`; leave it alone then
fn remove_dir_if_empty(dir: &Path) -> std::io::Result<()> {
    let mut entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e),
    };
    if entries.next().is_some() {
        debug!("{} still in use, keeping it", dir.display());
        return Ok(());
    }

    // Another run can create a suite between the check and the removal
    match std::fs::remove_dir(dir) {
        Ok(()) => debug!("Removed transient directory {}", dir.display()),
        Err(e) => debug!("Kept transient directory {}: {}", dir.display(), e),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn suite(dir: &Path, name: &str) -> PathBuf {
        std::fs::create_dir_all(dir).unwrap();
        let path = dir.join(name);
        std::fs::write(&path, "x").unwrap();
        path
    }

    #[test]
    fn test_cleanup_removes_suite_and_empty_dir() {
        let dir = tempdir().unwrap();
        let transient = dir.path().join(".galen-concat");
        let file = suite(&transient, "suite_1.test.js");

        let mut guard = TransientSuite::new(&file, &transient);
        guard.cleanup().unwrap();
        assert!(!file.exists());
        assert!(!transient.exists());
        guard.cleanup().unwrap();
    }

    #[test]
    fn test_cleanup_keeps_other_runs_suites() {
        let dir = tempdir().unwrap();
        let transient = dir.path().join(".galen-concat");
        let mine = suite(&transient, "suite_1.test.js");
        let theirs = suite(&transient, "suite_2.test.js");

        drop(TransientSuite::new(&mine, &transient));
        assert!(!mine.exists());
        assert!(theirs.exists());

        drop(TransientSuite::new(&theirs, &transient));
        assert!(!transient.exists());
    }

    #[test]
    fn test_missing_suite_is_fine() {
        let dir = tempdir().unwrap();
        let transient = dir.path().join("never-created");
        let mut guard = TransientSuite::new(transient.join("suite.test.js"), &transient);
        assert!(guard.cleanup().is_ok());
    }
}
