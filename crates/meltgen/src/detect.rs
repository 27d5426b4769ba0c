//! Threshold-based anomaly detection over a generated output directory.
//!
//! A deliberately simple cross-check, not a product: it reads the same JSONL
//! files a real detector would and confirms that injected incidents are
//! visible — flagged metric points, threshold breaches, burst-prefixed error
//! logs, failed or slow spans, incident events.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{MeltError, Result};
use crate::model::{EventRecord, EventSeverity, Family, LogRecord, MetricPoint, SpanStatus, TraceSpan};

/// Static thresholds per metric name.
const THRESHOLDS: [(&str, f64); 4] = [
    ("cpu_usage", 80.0),
    ("memory_usage", 90.0),
    ("response_time", 1000.0),
    ("error_rate", 0.1),
];

/// Error share of a log file above which the whole file is flagged.
const LOG_ERROR_RATE_THRESHOLD: f64 = 0.1;
/// Span duration (microseconds) considered a latency anomaly.
const SLOW_SPAN_THRESHOLD_US: u64 = 1_000_000;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DetectionSummary {
    pub total_anomalies: u64,
    pub cpu_spikes: u64,
    pub latency_spikes: u64,
    pub error_bursts: u64,
    pub service_outages: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Finding {
    pub kind: String,
    pub timestamp: String,
    pub service: String,
    pub detail: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DetectionDetails {
    pub metrics: Vec<Finding>,
    pub logs: Vec<Finding>,
    pub traces: Vec<Finding>,
    pub events: Vec<Finding>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DetectionReport {
    pub summary: DetectionSummary,
    pub details: DetectionDetails,
}

/// Run threshold detection over every family file present in `dir`.
pub fn detect_anomalies(dir: &Path) -> Result<DetectionReport> {
    let mut report = DetectionReport::default();

    if dir.join(Family::Metrics.file_name()).exists() {
        report.details.metrics = scan_metrics(&dir.join(Family::Metrics.file_name()))?;
    }
    if dir.join(Family::Logs.file_name()).exists() {
        report.details.logs = scan_logs(&dir.join(Family::Logs.file_name()))?;
    }
    if dir.join(Family::Traces.file_name()).exists() {
        report.details.traces = scan_traces(&dir.join(Family::Traces.file_name()))?;
    }
    if dir.join(Family::Events.file_name()).exists() {
        report.details.events = scan_events(&dir.join(Family::Events.file_name()))?;
    }

    let count = |findings: &[Finding], kind: &str| -> u64 {
        findings.iter().filter(|f| f.kind == kind).count() as u64
    };

    report.summary.cpu_spikes = count(&report.details.metrics, "cpu_spike");
    report.summary.latency_spikes = count(&report.details.metrics, "latency_spike")
        + count(&report.details.traces, "latency_spike");
    report.summary.error_bursts =
        count(&report.details.metrics, "error_burst") + count(&report.details.logs, "error_burst");
    report.summary.service_outages = count(&report.details.events, "service_outage");
    report.summary.total_anomalies = report.summary.cpu_spikes
        + report.summary.latency_spikes
        + report.summary.error_bursts
        + report.summary.service_outages;

    info!(
        total = report.summary.total_anomalies,
        cpu_spikes = report.summary.cpu_spikes,
        latency_spikes = report.summary.latency_spikes,
        error_bursts = report.summary.error_bursts,
        service_outages = report.summary.service_outages,
        "detection finished"
    );
    Ok(report)
}

fn read_lines<T, F>(path: &Path, mut handle: F) -> Result<()>
where
    T: for<'de> Deserialize<'de>,
    F: FnMut(T),
{
    let file = File::open(path).map_err(|e| MeltError::persistence(path, e))?;
    for line in BufReader::new(file).lines() {
        let line = line.map_err(|e| MeltError::persistence(path, e))?;
        if line.trim().is_empty() {
            continue;
        }
        // The validator owns strict schema checking; the detector skips
        // unreadable lines instead of aborting the scan.
        if let Ok(record) = serde_json::from_str::<T>(&line) {
            handle(record);
        }
    }
    Ok(())
}

fn metric_kind(name: &str) -> &'static str {
    if name.contains("cpu") {
        "cpu_spike"
    } else if name.contains("response_time") {
        "latency_spike"
    } else if name.contains("error_rate") {
        "error_burst"
    } else {
        "threshold_exceeded"
    }
}

fn scan_metrics(path: &Path) -> Result<Vec<Finding>> {
    let mut findings = Vec::new();
    read_lines::<MetricPoint, _>(path, |point| {
        let service = point
            .labels
            .get("service")
            .cloned()
            .unwrap_or_else(|| "unknown".to_string());

        if point.anomaly {
            findings.push(Finding {
                kind: metric_kind(&point.metric_name).to_string(),
                timestamp: point.timestamp.to_rfc3339(),
                service: service.clone(),
                detail: format!("{} marked anomalous at {}", point.metric_name, point.value),
            });
        }

        if let Some((_, threshold)) = THRESHOLDS.iter().find(|(n, _)| *n == point.metric_name) {
            if point.value > *threshold {
                findings.push(Finding {
                    kind: metric_kind(&point.metric_name).to_string(),
                    timestamp: point.timestamp.to_rfc3339(),
                    service,
                    detail: format!(
                        "{} = {} exceeds threshold {}",
                        point.metric_name, point.value, threshold
                    ),
                });
            }
        }
    })?;
    Ok(findings)
}

fn scan_logs(path: &Path) -> Result<Vec<Finding>> {
    let mut findings = Vec::new();
    let mut error_count = 0u64;
    let mut total_count = 0u64;

    read_lines::<LogRecord, _>(path, |log| {
        total_count += 1;
        if log.level.is_error() {
            error_count += 1;
        }
        if log.message.starts_with("Error burst:") {
            findings.push(Finding {
                kind: "error_burst".to_string(),
                timestamp: log.timestamp.to_rfc3339(),
                service: log.service.clone(),
                detail: truncate(&log.message, 100),
            });
        }
    })?;

    if total_count > 0 {
        let rate = error_count as f64 / total_count as f64;
        if rate > LOG_ERROR_RATE_THRESHOLD {
            findings.push(Finding {
                kind: "high_error_rate".to_string(),
                timestamp: String::new(),
                service: "all".to_string(),
                detail: format!("{error_count}/{total_count} log lines are errors"),
            });
        }
    }

    Ok(findings)
}

fn scan_traces(path: &Path) -> Result<Vec<Finding>> {
    let mut findings = Vec::new();
    read_lines::<TraceSpan, _>(path, |span| {
        match span.status {
            SpanStatus::Error | SpanStatus::Timeout => findings.push(Finding {
                kind: "trace_failure".to_string(),
                timestamp: span.start_time.to_rfc3339(),
                service: span.service.clone(),
                detail: format!("{} finished with status {:?}", span.operation_name, span.status),
            }),
            SpanStatus::Ok => {}
        }

        if span.duration > SLOW_SPAN_THRESHOLD_US {
            findings.push(Finding {
                kind: "latency_spike".to_string(),
                timestamp: span.start_time.to_rfc3339(),
                service: span.service,
                detail: format!(
                    "{} took {:.1}ms",
                    span.operation_name,
                    span.duration as f64 / 1000.0
                ),
            });
        }
    })?;
    Ok(findings)
}

fn scan_events(path: &Path) -> Result<Vec<Finding>> {
    let mut findings = Vec::new();
    read_lines::<EventRecord, _>(path, |event| {
        let service = event
            .metadata
            .get("service")
            .and_then(|v| v.as_str())
            .unwrap_or("unknown")
            .to_string();

        if event.event_type == "incident" {
            let lowered = event.message.to_lowercase();
            let kind = if lowered.contains("unavailable") || lowered.contains("outage") {
                "service_outage"
            } else {
                "incident"
            };
            findings.push(Finding {
                kind: kind.to_string(),
                timestamp: event.timestamp.to_rfc3339(),
                service: service.clone(),
                detail: event.message.clone(),
            });
        }

        if event.event_type == "alert" && event.severity == EventSeverity::Critical {
            findings.push(Finding {
                kind: "critical_alert".to_string(),
                timestamp: event.timestamp.to_rfc3339(),
                service,
                detail: event.message,
            });
        }
    })?;
    Ok(findings)
}

fn truncate(text: &str, max: usize) -> String {
    if text.len() <= max {
        text.to_string()
    } else {
        let mut end = max;
        while !text.is_char_boundary(end) {
            end -= 1;
        }
        text[..end].to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AnomalyConfig, CpuSpikeSettings, GenerationConfig};
    use crate::generator::MeltGenerator;
    use crate::inject::AnomalyKind;

    #[test]
    fn test_detects_injected_cpu_spikes() {
        let dir = tempfile::tempdir().unwrap();
        let anomaly_config = AnomalyConfig {
            cpu_spike: CpuSpikeSettings {
                probability: 0.2,
                duration_minutes: 30,
                intensity: 5.0,
            },
            ..AnomalyConfig::default()
        };
        let generator = MeltGenerator::new(GenerationConfig::default(), anomaly_config).unwrap();
        let data = generator
            .generate("256KB", &[AnomalyKind::CpuSpike])
            .unwrap();
        generator
            .save(&data, dir.path(), &[AnomalyKind::CpuSpike])
            .unwrap();

        let report = detect_anomalies(dir.path()).unwrap();
        assert!(report.summary.cpu_spikes > 0);
        assert!(report.summary.total_anomalies >= report.summary.cpu_spikes);
    }

    #[test]
    fn test_clean_directory_yields_empty_report() {
        let dir = tempfile::tempdir().unwrap();
        let report = detect_anomalies(dir.path()).unwrap();
        assert_eq!(report.summary.total_anomalies, 0);
        assert!(report.details.metrics.is_empty());
    }

    #[test]
    fn test_threshold_breach_without_flag_is_found() {
        use std::io::Write;

        let dir = tempfile::tempdir().unwrap();
        let mut file = File::create(dir.path().join("metrics.jsonl")).unwrap();
        writeln!(
            file,
            "{}",
            serde_json::json!({
                "timestamp": "2025-01-01T00:00:00Z",
                "metric_name": "cpu_usage",
                "value": 97.5,
                "labels": {"service": "api"},
                "anomaly": false,
            })
        )
        .unwrap();
        drop(file);

        let report = detect_anomalies(dir.path()).unwrap();
        assert_eq!(report.summary.cpu_spikes, 1);
        assert_eq!(report.details.metrics[0].service, "api");
    }
}
