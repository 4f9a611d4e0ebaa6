//! Report export
//!
//! Saves a finished report to disk as JSON or CSV.

use anyhow::{Context, Result};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use tracing::info;

use super::formatter::{csv_record, CSV_HEADER};
use crate::models::RunReport;

/// Export format
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExportFormat {
    Json,
    Csv,
}

impl ExportFormat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "json" => Some(ExportFormat::Json),
            "csv" => Some(ExportFormat::Csv),
            _ => None,
        }
    }

    pub fn from_extension(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_str)
    }
}

/// Write `report` to `path`; the format follows the extension, JSON otherwise
pub fn export(report: &RunReport, path: &Path) -> Result<()> {
    let format = ExportFormat::from_extension(path).unwrap_or(ExportFormat::Json);

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }

    match format {
        ExportFormat::Json => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create {}", path.display()))?;
            serde_json::to_writer_pretty(BufWriter::new(file), report)?;
        }
        ExportFormat::Csv => {
            let mut writer = csv::Writer::from_path(path)
                .with_context(|| format!("Failed to create {}", path.display()))?;
            writer.write_record(CSV_HEADER)?;
            for result in &report.results {
                writer.write_record(csv_record(result))?;
            }
            writer.flush()?;
        }
    }

    info!("Saved report to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Classification, ProcessResult, TestUnit};
    use tempfile::tempdir;

    fn report() -> RunReport {
        RunReport::from_results(vec![ProcessResult {
            unit: TestUnit::new("a.test.js"),
            stdout: "2 passed".to_string(),
            stderr: String::new(),
            exit_code: Some(0),
            classification: Classification::Passed,
            output: "2 passed".to_string(),
            passed: 2,
            failed: 0,
            duration_ms: 10,
        }])
    }

    #[test]
    fn test_export_format() {
        assert_eq!(ExportFormat::from_str("json"), Some(ExportFormat::Json));
        assert_eq!(
            ExportFormat::from_extension(Path::new("out/report.CSV")),
            Some(ExportFormat::Csv)
        );
        assert_eq!(ExportFormat::from_extension(Path::new("report")), None);
    }

    #[test]
    fn test_export_json() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("reports/run.json");
        export(&report(), &path).unwrap();

        let loaded: RunReport =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(loaded.passed, 2);
        assert!(loaded.is_success());
    }

    #[test]
    fn test_export_csv() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("run.csv");
        export(&report(), &path).unwrap();

        let mut reader = csv::Reader::from_path(&path).unwrap();
        let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 1);
        assert_eq!(&rows[0][0], "a.test.js");
        assert_eq!(&rows[0][2], "2");
    }
}
