//! Runner output classification
//!
//! Galen reports results as free-form text, so verdicts come from pattern
//! matching. Rule order matters and is fixed:
//!
//! 1. non-blank stderr made only of deprecation/advisory lines is logged
//!    and stdout stays authoritative;
//! 2. any other non-blank stderr fails the unit and becomes its output;
//! 3. otherwise stdout fails the unit if it mentions a failure.

use regex::Regex;
use std::sync::OnceLock;
use tracing::{debug, warn};

use crate::models::{Classification, ProcessResult, TestUnit};

/// Raw output of a terminated runner process
#[derive(Clone, Debug, Default)]
pub struct CapturedOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: Option<i32>,
    pub duration_ms: u64,
}

fn advisory_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)^\s*(?:warn(?:ing)?\b|.*\b(?:deprecat\w*|advisory)\b)")
            .expect("valid advisory regex")
    })
}

fn failure_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)fail(?:ed|ing)?").expect("valid failure regex"))
}

fn token_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)(?:\b(\d+)\s+)?(pass(?:ed|ing?)?|fail(?:ed|ing?)?)")
            .expect("valid token regex")
    })
}

/// Whether stderr only carries benign deprecation/advisory notices.
///
/// Every non-blank line has to qualify; one foreign line (a stack trace,
/// an exception) makes the whole stream an execution failure.
pub fn is_advisory(stderr: &str) -> bool {
    let mut lines = stderr.lines().filter(|line| !line.trim().is_empty()).peekable();
    lines.peek().is_some() && lines.all(|line| advisory_pattern().is_match(line))
}

/// Whether text mentions a failure
pub fn mentions_failure(text: &str) -> bool {
    failure_pattern().is_match(text)
}

/// Classify a process from its captured streams
pub fn classify(stdout: &str, stderr: &str) -> Classification {
    let stderr = stderr.trim();

    if !stderr.is_empty() && is_advisory(stderr) {
        if mentions_failure(stdout) {
            Classification::Failed
        } else {
            Classification::Warning
        }
    } else if !stderr.is_empty() {
        Classification::Failed
    } else if mentions_failure(stdout) {
        Classification::Failed
    } else {
        Classification::Passed
    }
}

/// Count pass and fail tokens; "3 passed" counts three
pub fn count_tokens(text: &str) -> (usize, usize) {
    let mut passed: usize = 0;
    let mut failed: usize = 0;

    for caps in token_pattern().captures_iter(text) {
        // Counts too large for usize saturate
        let weight = caps
            .get(1)
            .map(|m| m.as_str().parse::<usize>().unwrap_or(usize::MAX))
            .unwrap_or(1);
        let is_pass = caps
            .get(2)
            .map(|m| m.as_str().to_lowercase().starts_with("pass"))
            .unwrap_or(false);

        if is_pass {
            passed = passed.saturating_add(weight);
        } else {
            failed = failed.saturating_add(weight);
        }
    }

    (passed, failed)
}

/// Turn captured output into a classified, counted result
pub fn evaluate(unit: TestUnit, captured: CapturedOutput) -> ProcessResult {
    let classification = classify(&captured.stdout, &captured.stderr);
    let stderr_blank = captured.stderr.trim().is_empty();
    let advisory = !stderr_blank && is_advisory(&captured.stderr);

    if advisory {
        warn!("{}: {}", unit, captured.stderr.trim());
    }

    // Rule 2: real stderr replaces stdout entirely
    let output = if stderr_blank || advisory {
        captured.stdout.clone()
    } else {
        captured.stderr.clone()
    };

    let (passed, mut failed) = count_tokens(&output);
    if classification == Classification::Failed && failed == 0 {
        failed = 1;
    }

    let result = ProcessResult {
        unit,
        stdout: captured.stdout,
        stderr: captured.stderr,
        exit_code: captured.exit_code,
        classification,
        output,
        passed,
        failed,
        duration_ms: captured.duration_ms,
    };

    // Exit status is informational only
    if !result.exit_success() {
        debug!("{} exited with {:?}", result.unit, result.exit_code);
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn captured(stdout: &str, stderr: &str) -> CapturedOutput {
        CapturedOutput {
            stdout: stdout.to_string(),
            stderr: stderr.to_string(),
            exit_code: Some(0),
            duration_ms: 5,
        }
    }

    #[test]
    fn test_counts_numeric_summary() {
        let result = evaluate(TestUnit::new("a.test.js"), captured("3 passed, 1 failed", ""));
        assert_eq!(result.passed, 3);
        assert_eq!(result.failed, 1);
        assert_eq!(result.classification, Classification::Failed);
    }

    #[test]
    fn test_clean_stdout_passes() {
        let result = evaluate(
            TestUnit::new("a.test.js"),
            captured("Containers position on desktop: passed\nTotal tests: 1", ""),
        );
        assert_eq!(result.classification, Classification::Passed);
        assert_eq!((result.passed, result.failed), (1, 0));
    }

    #[test]
    fn test_deprecation_stderr_uses_stdout() {
        let result = evaluate(
            TestUnit::new("a.test.js"),
            captured(
                "2 passed",
                "Warning: Nashorn engine is deprecated and will be removed",
            ),
        );
        assert_eq!(result.classification, Classification::Warning);
        assert_eq!(result.output, "2 passed");
        assert_eq!((result.passed, result.failed), (2, 0));
    }

    #[test]
    fn test_deprecation_stderr_with_failing_stdout() {
        let result = evaluate(
            TestUnit::new("a.test.js"),
            captured("1 passed, 2 failed", "DEPRECATED option --foo"),
        );
        assert_eq!(result.classification, Classification::Failed);
        assert_eq!((result.passed, result.failed), (1, 2));
    }

    #[test]
    fn test_other_stderr_fails_with_stderr_text() {
        let result = evaluate(
            TestUnit::new("a.test.js"),
            captured("5 passed", "Exception in thread main: spec file not found"),
        );
        assert_eq!(result.classification, Classification::Failed);
        assert_eq!(result.output, "Exception in thread main: spec file not found");
        assert_eq!(result.passed, 0);
        assert_eq!(result.failed, 1);
    }

    #[test]
    fn test_whitespace_stderr_is_blank() {
        assert_eq!(classify("all good", "  \n\t"), Classification::Passed);
    }

    #[test]
    fn test_failure_tokens_case_insensitive() {
        assert_eq!(classify("Layout FAILED on tablet", ""), Classification::Failed);
        assert_eq!(classify("test is Failing", ""), Classification::Failed);
    }

    #[test]
    fn test_count_tokens_variants() {
        assert_eq!(count_tokens("pass passed passing PASS"), (4, 0));
        assert_eq!(count_tokens("fail failed failing"), (0, 3));
        assert_eq!(count_tokens("10 passed\n0 failed"), (10, 0));
        assert_eq!(count_tokens("nothing here"), (0, 0));
    }

    #[test]
    fn test_warning_plus_exception_is_failure() {
        let stderr = "WARNING: An illegal reflective access operation has occurred\n\
                      Exception in thread \"main\" java.lang.RuntimeException: Cannot open browser";
        let mut crashed = captured("", stderr);
        crashed.exit_code = Some(1);

        let result = evaluate(TestUnit::new("a.test.js"), crashed);
        assert_eq!(result.classification, Classification::Failed);
        assert_eq!(result.failed, 1);
        assert!(result.output.contains("Cannot open browser"));

        let report = crate::models::RunReport::from_results(vec![result]);
        assert!(!report.is_success());
    }

    #[test]
    fn test_multiline_advisory_stays_warning() {
        let stderr = "WARNING: An illegal reflective access operation has occurred\n\n\
                      WARNING: Please consider reporting this to the maintainers\n\
                      Nashorn engine is deprecated";
        assert_eq!(classify("2 passed", stderr), Classification::Warning);
    }

    #[test]
    fn test_count_tokens_saturates() {
        assert_eq!(
            count_tokens("18446744073709551615 passed\n1 passed"),
            (usize::MAX, 0)
        );
        assert_eq!(
            count_tokens("99999999999999999999999 failed"),
            (0, usize::MAX)
        );
    }

    #[test]
    fn test_advisory_pattern() {
        assert!(is_advisory("DeprecationWarning: old api"));
        assert!(is_advisory("advisory: update available"));
        assert!(!is_advisory("java.lang.NullPointerException"));
        assert!(!is_advisory("  \n"));
        assert!(!is_advisory("error: cannot warn the user"));
    }
}
