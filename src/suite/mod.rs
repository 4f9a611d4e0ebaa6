//! Test suite resolution
//!
//! Expands `src` glob patterns against the working directory into the
//! ordered list of test units handed to the pipeline.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::error::{PipelineError, PipelineResult};
use crate::models::TestUnit;

/// Resolve `patterns` relative to `cwd`.
///
/// Only regular files are kept. Order is pattern order, then lexical order
/// within a pattern; a file matched twice keeps its first position.
pub fn resolve_suite(cwd: &Path, patterns: &[String]) -> PipelineResult<Vec<TestUnit>> {
    if patterns.is_empty() {
        return Err(PipelineError::ConfigValidation(
            "no test file patterns given".to_string(),
        ));
    }

    let mut seen = HashSet::new();
    let mut units = Vec::new();

    for pattern in patterns {
        let mut matched = expand(cwd, pattern)?;
        matched.sort();

        if matched.is_empty() {
            warn!("Pattern '{}' matched no test files", pattern);
        }

        for path in matched {
            if seen.insert(path.clone()) {
                units.push(TestUnit::new(path));
            }
        }
    }

    if units.is_empty() {
        return Err(PipelineError::ConfigValidation(format!(
            "no test files matched {} in {}",
            patterns.join(", "),
            cwd.display()
        )));
    }

    debug!("Resolved {} test file(s)", units.len());
    Ok(units)
}

fn expand(cwd: &Path, pattern: &str) -> PipelineResult<Vec<PathBuf>> {
    let full = if Path::new(pattern).is_absolute() {
        pattern.to_string()
    } else {
        cwd.join(pattern).to_string_lossy().into_owned()
    };

    let paths = glob::glob(&full).map_err(|e| {
        PipelineError::ConfigValidation(format!("invalid pattern '{pattern}': {e}"))
    })?;

    Ok(paths
        .filter_map(|entry| match entry {
            Ok(path) => Some(path),
            Err(e) => {
                warn!("Skipping unreadable path: {}", e);
                None
            }
        })
        .filter(|path| path.is_file())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn touch(dir: &Path, name: &str) {
        let path = dir.join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, "test();").unwrap();
    }

    fn names(units: &[TestUnit]) -> Vec<String> {
        units
            .iter()
            .map(|u| u.path().file_name().unwrap().to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn test_lexical_order_within_pattern() {
        let dir = tempdir().unwrap();
        touch(dir.path(), "test/c.test.js");
        touch(dir.path(), "test/a.test.js");
        touch(dir.path(), "test/b.test.js");

        let units = resolve_suite(dir.path(), &["test/*.test.js".to_string()]).unwrap();
        assert_eq!(names(&units), vec!["a.test.js", "b.test.js", "c.test.js"]);
    }

    #[test]
    fn test_pattern_order_and_dedup() {
        let dir = tempdir().unwrap();
        touch(dir.path(), "test/a.test.js");
        touch(dir.path(), "test/z.test.js");

        let patterns = vec!["test/z.test.js".to_string(), "test/*.test.js".to_string()];
        let units = resolve_suite(dir.path(), &patterns).unwrap();
        assert_eq!(names(&units), vec!["z.test.js", "a.test.js"]);
    }

    #[test]
    fn test_directories_are_skipped() {
        let dir = tempdir().unwrap();
        touch(dir.path(), "test/a.test.js");
        std::fs::create_dir_all(dir.path().join("test/dir.test.js")).unwrap();

        let units = resolve_suite(dir.path(), &["test/*.test.js".to_string()]).unwrap();
        assert_eq!(names(&units), vec!["a.test.js"]);
    }

    #[test]
    fn test_no_match_is_config_error() {
        let dir = tempdir().unwrap();
        let err = resolve_suite(dir.path(), &["test/*.test.js".to_string()]).unwrap_err();
        assert!(matches!(err, PipelineError::ConfigValidation(_)));
    }

    #[test]
    fn test_empty_patterns_is_config_error() {
        let dir = tempdir().unwrap();
        assert!(resolve_suite(dir.path(), &[]).is_err());
    }

    #[test]
    fn test_invalid_pattern() {
        let dir = tempdir().unwrap();
        let err = resolve_suite(dir.path(), &["test/[.js".to_string()]).unwrap_err();
        assert!(err.to_string().contains("invalid pattern"));
    }
}
