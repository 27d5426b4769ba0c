//! Core record types for the four MELT families.
//!
//! Field names and enum casings are the compatibility surface for any
//! downstream validator: log levels serialize UPPERCASE, event severities and
//! span statuses lowercase. All mappings use `BTreeMap` so serialized key
//! order is stable across runs (byte-identical output for a fixed seed).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ============================================================================
// Severity / status enums
// ============================================================================

/// Log severity. Wire format is UPPERCASE (`DEBUG` .. `CRITICAL`).
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
    Critical,
}

impl LogLevel {
    pub const ALL: [LogLevel; 5] = [
        LogLevel::Debug,
        LogLevel::Info,
        LogLevel::Warn,
        LogLevel::Error,
        LogLevel::Critical,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERROR",
            LogLevel::Critical => "CRITICAL",
        }
    }

    pub fn is_error(self) -> bool {
        matches!(self, LogLevel::Error | LogLevel::Critical)
    }
}

/// Event severity. Wire format is lowercase (`debug` .. `critical`).
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum EventSeverity {
    Debug,
    Info,
    Warn,
    Error,
    Critical,
}

impl EventSeverity {
    pub const ALL: [EventSeverity; 5] = [
        EventSeverity::Debug,
        EventSeverity::Info,
        EventSeverity::Warn,
        EventSeverity::Error,
        EventSeverity::Critical,
    ];
}

/// Span completion status. Wire format is lowercase (`ok`, `error`, `timeout`).
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum SpanStatus {
    Ok,
    Error,
    Timeout,
}

// ============================================================================
// Record families
// ============================================================================

/// A single metric sample. `value` stays within the plausible range declared
/// for its `metric_name` unless `anomaly` is set.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct MetricPoint {
    pub timestamp: DateTime<Utc>,
    pub metric_name: String,
    pub value: f64,
    pub labels: BTreeMap<String, String>,
    pub anomaly: bool,
}

/// An application log line. If `trace_id` is present a `span_id` is present
/// as well (a log may reference a trace without being the owning span, so the
/// reverse is not required).
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct LogRecord {
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub service: String,
    pub message: String,
    pub metadata: BTreeMap<String, serde_json::Value>,
    pub trace_id: Option<String>,
    pub span_id: Option<String>,
}

/// An operational event (deployment, scaling, alert, ...).
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct EventRecord {
    pub timestamp: DateTime<Utc>,
    pub event_type: String,
    pub severity: EventSeverity,
    pub source: String,
    pub message: String,
    pub metadata: BTreeMap<String, serde_json::Value>,
}

/// One timed operation in a trace tree. A span with a `parent_span_id` has a
/// parent in the same trace whose `start_time` is not after its own, and its
/// `duration` (microseconds) never exceeds half the parent's at creation time.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct TraceSpan {
    pub trace_id: String,
    pub span_id: String,
    pub parent_span_id: Option<String>,
    pub operation_name: String,
    pub start_time: DateTime<Utc>,
    pub duration: u64,
    pub service: String,
    pub tags: BTreeMap<String, String>,
    pub status: SpanStatus,
}

// ============================================================================
// Dataset
// ============================================================================

/// One materialized unit of generation: the four record collections for a
/// run or a chunk. Mutable only during the injection pass; immutable once
/// handed to a sink.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct MeltDataset {
    pub metrics: Vec<MetricPoint>,
    pub logs: Vec<LogRecord>,
    pub traces: Vec<TraceSpan>,
    pub events: Vec<EventRecord>,
}

impl MeltDataset {
    pub fn total_records(&self) -> usize {
        self.metrics.len() + self.logs.len() + self.traces.len() + self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.total_records() == 0
    }
}

/// Record family discriminator used by sinks, statistics, and reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Family {
    Metrics,
    Logs,
    Traces,
    Events,
}

impl Family {
    pub const ALL: [Family; 4] = [Family::Metrics, Family::Logs, Family::Traces, Family::Events];

    pub fn file_name(self) -> &'static str {
        match self {
            Family::Metrics => "metrics.jsonl",
            Family::Logs => "logs.jsonl",
            Family::Traces => "traces.jsonl",
            Family::Events => "events.jsonl",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Family::Metrics => "metrics",
            Family::Logs => "logs",
            Family::Traces => "traces",
            Family::Events => "events",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_total_records() {
        let mut data = MeltDataset::default();
        assert_eq!(data.total_records(), 0);
        assert!(data.is_empty());

        data.metrics.push(MetricPoint {
            timestamp: Utc::now(),
            metric_name: "cpu_usage".to_string(),
            value: 42.0,
            labels: BTreeMap::new(),
            anomaly: false,
        });
        data.events.push(EventRecord {
            timestamp: Utc::now(),
            event_type: "deployment".to_string(),
            severity: EventSeverity::Info,
            source: "ci-cd-pipeline".to_string(),
            message: "deployed".to_string(),
            metadata: BTreeMap::new(),
        });

        assert_eq!(data.total_records(), 2);
    }

    #[test]
    fn test_enum_wire_casing() {
        assert_eq!(
            serde_json::to_string(&LogLevel::Critical).unwrap(),
            "\"CRITICAL\""
        );
        assert_eq!(
            serde_json::to_string(&EventSeverity::Critical).unwrap(),
            "\"critical\""
        );
        assert_eq!(
            serde_json::to_string(&SpanStatus::Timeout).unwrap(),
            "\"timeout\""
        );

        let level: LogLevel = serde_json::from_str("\"WARN\"").unwrap();
        assert_eq!(level, LogLevel::Warn);
        // Wrong casing is rejected at the boundary, not silently accepted.
        assert!(serde_json::from_str::<LogLevel>("\"warn\"").is_err());
    }

    #[test]
    fn test_span_serialization_fields() {
        let span = TraceSpan {
            trace_id: "0123456789abcdef".to_string(),
            span_id: "01234567".to_string(),
            parent_span_id: None,
            operation_name: "GET /users".to_string(),
            start_time: Utc::now(),
            duration: 1500,
            service: "api".to_string(),
            tags: BTreeMap::new(),
            status: SpanStatus::Ok,
        };

        let json: serde_json::Value = serde_json::from_str(&serde_json::to_string(&span).unwrap()).unwrap();
        assert_eq!(json["status"], "ok");
        assert_eq!(json["duration"], 1500);
        assert!(json["parent_span_id"].is_null());
    }
}
