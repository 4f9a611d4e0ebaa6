//! Runner command lines
//!
//! `<runner-or-fallback> test <file> [--htmlreport <dest>]`

use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;

use crate::models::TestUnit;
use crate::runner::RunnerInvocation;

/// HTML report directory used when none is configured
pub const DEFAULT_HTML_REPORT_DEST: &str = "reports";

/// Full argument list after the program name
pub fn command_args(
    invocation: &RunnerInvocation,
    file: &Path,
    html_report_dest: Option<&str>,
) -> Vec<String> {
    let mut args = invocation.prefix_args.clone();
    args.push("test".to_string());
    args.push(file.display().to_string());

    if let Some(dest) = html_report_dest {
        args.push("--htmlreport".to_string());
        args.push(dest.to_string());
    }

    args
}

/// Unit path as the child sees it; relative paths are anchored to our cwd
/// because the child runs in the configured working directory
pub fn unit_argument(unit: &TestUnit) -> PathBuf {
    let path = unit.path();
    if path.is_absolute() {
        return path.to_path_buf();
    }
    match std::env::current_dir() {
        Ok(dir) => dir.join(path),
        Err(_) => path.to_path_buf(),
    }
}

/// Build the child process command for a unit
pub fn build_command(
    invocation: &RunnerInvocation,
    unit: &TestUnit,
    cwd: &Path,
    html_report_dest: Option<&str>,
) -> Command {
    let mut command = Command::new(&invocation.program);
    command
        .args(command_args(invocation, &unit_argument(unit), html_report_dest))
        .current_dir(cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    command
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direct_command_args() {
        let inv = RunnerInvocation::direct("galen");
        let args = command_args(&inv, Path::new("/suite/a.test.js"), None);
        assert_eq!(args, vec!["test", "/suite/a.test.js"]);
    }

    #[test]
    fn test_html_report_args() {
        let inv = RunnerInvocation::direct("galen");
        let args = command_args(&inv, Path::new("a.test.js"), Some("reports/html"));
        assert_eq!(
            args,
            vec!["test", "a.test.js", "--htmlreport", "reports/html"]
        );
    }

    #[test]
    fn test_fallback_prefix_comes_first() {
        let inv = RunnerInvocation::fallback(
            &["node".to_string(), "galen-cli/galen.js".to_string()],
            "missing",
        );
        let args = command_args(&inv, Path::new("a.test.js"), None);
        assert_eq!(args, vec!["galen-cli/galen.js", "test", "a.test.js"]);
    }

    #[test]
    fn test_unit_argument_is_absolute() {
        let arg = unit_argument(&TestUnit::new("test/a.test.js"));
        assert!(arg.is_absolute());
        assert!(arg.ends_with("test/a.test.js"));
    }
}
