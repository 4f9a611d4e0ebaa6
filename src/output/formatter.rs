//! Report formatters
//!
//! Renders a [`RunReport`] as a table, JSON or CSV on stdout.

use anyhow::Result;

use crate::models::{Classification, ProcessResult, RunReport};

/// Output format options
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Table,
    Json,
    JsonPretty,
    Csv,
}

impl OutputFormat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "table" => Some(OutputFormat::Table),
            "json" => Some(OutputFormat::Json),
            "json-pretty" | "jsonpretty" => Some(OutputFormat::JsonPretty),
            "csv" => Some(OutputFormat::Csv),
            _ => None,
        }
    }
}

/// Report formatter
pub struct ReportFormatter {
    format: OutputFormat,
    colorize: bool,
}

impl ReportFormatter {
    pub fn new(format: OutputFormat) -> Self {
        Self {
            format,
            colorize: true,
        }
    }

    pub fn no_color(mut self) -> Self {
        self.colorize = false;
        self
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    pub fn format_report(&self, report: &RunReport) -> Result<String> {
        Ok(match self.format {
            OutputFormat::Table => self.format_table(report),
            OutputFormat::Json => serde_json::to_string(report)?,
            OutputFormat::JsonPretty => serde_json::to_string_pretty(report)?,
            OutputFormat::Csv => self.format_csv(report)?,
        })
    }

    fn status(&self, classification: Classification) -> &'static str {
        match (classification, self.colorize) {
            (Classification::Passed, true) => "\x1b[32m✓ PASS\x1b[0m",
            (Classification::Failed, true) => "\x1b[31m✗ FAIL\x1b[0m",
            (Classification::Warning, true) => "\x1b[33m! WARN\x1b[0m",
            (Classification::Passed, false) => "✓ PASS",
            (Classification::Failed, false) => "✗ FAIL",
            (Classification::Warning, false) => "! WARN",
        }
    }

    fn format_table(&self, report: &RunReport) -> String {
        let mut output = String::new();

        output.push_str("\n╔══════════════════════════════════════════════════════════════╗\n");
        let verdict = match (report.is_success(), self.colorize) {
            (true, true) => format!("\x1b[32m{}\x1b[0m", report.verdict),
            (false, true) => format!("\x1b[31m{}\x1b[0m", report.verdict),
            (_, false) => report.verdict.to_string(),
        };
        output.push_str(&format!("║  Galen run - {verdict}\n"));
        output.push_str("╠══════════════════════════════════════════════════════════════╣\n");

        for result in &report.results {
            output.push_str(&format!(
                "║  {} {:32} {:>3}/{:<3} [{:>7}ms]\n",
                self.status(result.classification),
                truncate(&result.unit.to_string(), 32),
                result.passed,
                result.failed,
                result.duration_ms
            ));
        }

        output.push_str("╠══════════════════════════════════════════════════════════════╣\n");

        let fail_str = if self.colorize && report.failed > 0 {
            format!("\x1b[31m{}\x1b[0m", report.failed)
        } else {
            report.failed.to_string()
        };
        output.push_str(&format!(
            "║  Passed: {} | Failed: {} | Total: {} | Rate: {:.1}%\n",
            report.passed, fail_str, report.total, report.percentage
        ));
        output.push_str(&format!("║  Duration: {}ms\n", report.duration_ms()));
        output.push_str("╚══════════════════════════════════════════════════════════════╝\n");

        output
    }

    fn format_csv(&self, report: &RunReport) -> Result<String> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(CSV_HEADER)?;
        for result in &report.results {
            writer.write_record(csv_record(result))?;
        }
        let bytes = writer.into_inner().map_err(|e| e.into_error())?;
        Ok(String::from_utf8(bytes)?)
    }
}

pub(crate) const CSV_HEADER: [&str; 6] = [
    "file",
    "classification",
    "passed",
    "failed",
    "exit_code",
    "duration_ms",
];

pub(crate) fn csv_record(result: &ProcessResult) -> [String; 6] {
    [
        result.unit.to_string(),
        format!("{:?}", result.classification).to_lowercase(),
        result.passed.to_string(),
        result.failed.to_string(),
        result.exit_code.map(|c| c.to_string()).unwrap_or_default(),
        result.duration_ms.to_string(),
    ]
}

fn truncate(text: &str, max: usize) -> String {
    let count = text.chars().count();
    if count <= max {
        return text.to_string();
    }
    let tail: String = text.chars().skip(count - (max - 1)).collect();
    format!("…{tail}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TestUnit;

    fn report() -> RunReport {
        RunReport::from_results(vec![
            ProcessResult {
                unit: TestUnit::new("test/home.test.js"),
                stdout: "3 passed, 1 failed".to_string(),
                stderr: String::new(),
                exit_code: Some(0),
                classification: Classification::Failed,
                output: "3 passed, 1 failed".to_string(),
                passed: 3,
                failed: 1,
                duration_ms: 1200,
            },
            ProcessResult {
                unit: TestUnit::new("test/about.test.js"),
                stdout: "1 passed".to_string(),
                stderr: String::new(),
                exit_code: Some(0),
                classification: Classification::Passed,
                output: "1 passed".to_string(),
                passed: 1,
                failed: 0,
                duration_ms: 800,
            },
        ])
    }

    #[test]
    fn test_output_format_from_str() {
        assert_eq!(OutputFormat::from_str("table"), Some(OutputFormat::Table));
        assert_eq!(OutputFormat::from_str("JSON"), Some(OutputFormat::Json));
        assert_eq!(OutputFormat::from_str("csv"), Some(OutputFormat::Csv));
        assert_eq!(OutputFormat::from_str("yaml"), None);
    }

    #[test]
    fn test_table_format() {
        let output = ReportFormatter::new(OutputFormat::Table)
            .no_color()
            .format_report(&report())
            .unwrap();
        assert!(output.contains("✗ FAIL"));
        assert!(output.contains("✓ PASS"));
        assert!(output.contains("Passed: 4 | Failed: 1 | Total: 5"));
        assert!(output.contains("FAILURE"));
    }

    #[test]
    fn test_json_format() {
        let output = ReportFormatter::new(OutputFormat::Json)
            .format_report(&report())
            .unwrap();
        let value: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(value["passed"], 4);
        assert_eq!(value["verdict"], "failure");
        assert_eq!(value["results"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_csv_format() {
        let output = ReportFormatter::new(OutputFormat::Csv)
            .format_report(&report())
            .unwrap();
        let mut lines = output.lines();
        assert_eq!(
            lines.next(),
            Some("file,classification,passed,failed,exit_code,duration_ms")
        );
        // Sorted by path
        assert_eq!(lines.next(), Some("test/about.test.js,passed,1,0,0,800"));
        assert_eq!(lines.next(), Some("test/home.test.js,failed,3,1,0,1200"));
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        let long = truncate("a/very/long/path/to/some.test.js", 10);
        assert_eq!(long.chars().count(), 10);
        assert!(long.ends_with("test.js"));
    }
}
