//! Post-hoc schema validation for a generated output directory.
//!
//! Every line of every family file is strict-parsed back into its typed
//! record; a line that fails to deserialize, or a log that references a trace
//! without a span, marks the file invalid. The report is serializable so the
//! CLI can dump it next to the data.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::info;

use crate::error::{MeltError, Result};
use crate::model::{EventRecord, Family, LogRecord, MetricPoint, TraceSpan};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidationSummary {
    pub total_files: u64,
    pub valid_files: u64,
    pub invalid_files: u64,
    pub total_records: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineError {
    pub line: u64,
    pub error: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FileReport {
    pub valid: bool,
    pub record_count: u64,
    pub errors: Vec<LineError>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidationReport {
    pub summary: ValidationSummary,
    pub files: BTreeMap<String, FileReport>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.summary.invalid_files == 0
    }
}

/// Validate every family file present in `dir`.
pub fn validate_directory(dir: &Path) -> Result<ValidationReport> {
    let mut report = ValidationReport::default();

    for family in Family::ALL {
        let path = dir.join(family.file_name());
        if !path.exists() {
            continue;
        }

        let file_report = validate_file(&path, family)?;
        report.summary.total_files += 1;
        if file_report.valid {
            report.summary.valid_files += 1;
        } else {
            report.summary.invalid_files += 1;
        }
        report.summary.total_records += file_report.record_count;
        report
            .files
            .insert(family.file_name().to_string(), file_report);
    }

    info!(
        files = report.summary.total_files,
        invalid = report.summary.invalid_files,
        records = report.summary.total_records,
        "validation finished"
    );
    Ok(report)
}

fn validate_file(path: &Path, family: Family) -> Result<FileReport> {
    let file = File::open(path).map_err(|e| MeltError::persistence(path, e))?;
    let reader = BufReader::new(file);

    let mut report = FileReport {
        valid: true,
        record_count: 0,
        errors: Vec::new(),
    };

    for (index, line) in reader.lines().enumerate() {
        let line_number = index as u64 + 1;
        let line = line.map_err(|e| MeltError::persistence(path, e))?;
        if line.trim().is_empty() {
            continue;
        }

        match check_line(family, &line) {
            Ok(()) => report.record_count += 1,
            Err(message) => {
                report.valid = false;
                report.errors.push(LineError {
                    line: line_number,
                    error: message,
                });
            }
        }
    }

    Ok(report)
}

fn check_line(family: Family, line: &str) -> std::result::Result<(), String> {
    match family {
        Family::Metrics => {
            serde_json::from_str::<MetricPoint>(line).map_err(|e| e.to_string())?;
        }
        Family::Logs => {
            let log: LogRecord = serde_json::from_str(line).map_err(|e| e.to_string())?;
            if log.trace_id.is_some() && log.span_id.is_none() {
                return Err("trace_id present without span_id".to_string());
            }
        }
        Family::Traces => {
            let span: TraceSpan = serde_json::from_str(line).map_err(|e| e.to_string())?;
            if span.duration == 0 {
                return Err("span duration must be > 0".to_string());
            }
        }
        Family::Events => {
            serde_json::from_str::<EventRecord>(line).map_err(|e| e.to_string())?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_empty_directory_has_no_files() {
        let dir = tempfile::tempdir().unwrap();
        let report = validate_directory(dir.path()).unwrap();
        assert_eq!(report.summary.total_files, 0);
        assert!(report.is_valid());
    }

    #[test]
    fn test_generated_output_validates() {
        use crate::config::{AnomalyConfig, GenerationConfig};
        use crate::generator::MeltGenerator;

        let dir = tempfile::tempdir().unwrap();
        let generator =
            MeltGenerator::new(GenerationConfig::default(), AnomalyConfig::default()).unwrap();
        let data = generator.generate("64KB", &[]).unwrap();
        generator.save(&data, dir.path(), &[]).unwrap();

        let report = validate_directory(dir.path()).unwrap();
        assert_eq!(report.summary.total_files, 4);
        assert!(report.is_valid(), "errors: {:?}", report.files);
        assert_eq!(report.summary.total_records, data.total_records() as u64);
    }

    #[test]
    fn test_malformed_lines_are_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("metrics.jsonl");
        let mut file = File::create(&path).unwrap();
        writeln!(file, "{{\"not\": \"a metric\"}}").unwrap();
        writeln!(file, "this is not json").unwrap();
        drop(file);

        let report = validate_directory(dir.path()).unwrap();
        assert_eq!(report.summary.invalid_files, 1);
        let file_report = &report.files["metrics.jsonl"];
        assert!(!file_report.valid);
        assert_eq!(file_report.errors.len(), 2);
        assert_eq!(file_report.errors[0].line, 1);
        assert_eq!(file_report.errors[1].line, 2);
    }

    #[test]
    fn test_log_trace_without_span_is_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs.jsonl");
        let mut file = File::create(&path).unwrap();
        writeln!(
            file,
            "{}",
            serde_json::json!({
                "timestamp": "2025-01-01T00:00:00Z",
                "level": "INFO",
                "service": "api",
                "message": "ok",
                "metadata": {},
                "trace_id": "0123456789abcdef",
                "span_id": null,
            })
        )
        .unwrap();
        drop(file);

        let report = validate_directory(dir.path()).unwrap();
        assert!(!report.is_valid());
    }
}
