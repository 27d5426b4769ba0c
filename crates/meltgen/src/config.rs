//! Generation and anomaly configuration.
//!
//! Both structs are read once at construction and never mutated during a
//! run. Validation is fail-fast: out-of-range probabilities and malformed
//! size strings abort before any record is generated. The one sanctioned
//! fallback (degenerate log-level weights) lives in the logs generator.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{MeltError, Result};

/// Heuristic average serialized record size, used only to turn a byte budget
/// into a record budget.
pub const AVG_RECORD_BYTES: u64 = 250;

// ============================================================================
// Generation config
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GenerationConfig {
    pub seed: u64,
    pub duration_hours: f64,
    pub services: Vec<String>,
    pub hosts: Vec<String>,
    pub environments: Vec<String>,
    pub metrics_frequency_seconds: u32,
    pub logs_frequency_seconds: u32,
    pub traces_frequency_seconds: u32,
    pub events_frequency_seconds: u32,
    pub error_rate: f64,
    pub debug_log_ratio: f64,
    pub missing_span_rate: f64,
    pub max_trace_depth: u32,
    pub incident_probability: f64,
    /// Base instant for every per-family time cursor. Pinned by default so
    /// two runs with the same seed produce byte-identical files; override to
    /// date a dataset differently.
    pub start_time: DateTime<Utc>,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            duration_hours: 1.0,
            services: vec!["api".to_string(), "web".to_string(), "database".to_string()],
            hosts: vec!["web-01".to_string(), "web-02".to_string(), "db-01".to_string()],
            environments: vec!["production".to_string()],
            metrics_frequency_seconds: 30,
            logs_frequency_seconds: 1,
            traces_frequency_seconds: 10,
            events_frequency_seconds: 300,
            error_rate: 0.05,
            debug_log_ratio: 0.3,
            missing_span_rate: 0.02,
            max_trace_depth: 5,
            incident_probability: 0.1,
            start_time: default_start_time(),
        }
    }
}

fn default_start_time() -> DateTime<Utc> {
    // 2025-01-01T00:00:00Z
    DateTime::from_timestamp(1_735_689_600, 0).unwrap_or(DateTime::UNIX_EPOCH)
}

impl GenerationConfig {
    pub fn validate(&self) -> Result<()> {
        check_unit_range("error_rate", self.error_rate)?;
        check_unit_range("debug_log_ratio", self.debug_log_ratio)?;
        check_unit_range("missing_span_rate", self.missing_span_rate)?;
        check_unit_range("incident_probability", self.incident_probability)?;

        if self.max_trace_depth < 1 {
            return Err(MeltError::Config("max_trace_depth must be >= 1".to_string()));
        }
        for (name, freq) in [
            ("metrics_frequency_seconds", self.metrics_frequency_seconds),
            ("logs_frequency_seconds", self.logs_frequency_seconds),
            ("traces_frequency_seconds", self.traces_frequency_seconds),
            ("events_frequency_seconds", self.events_frequency_seconds),
        ] {
            if freq < 1 {
                return Err(MeltError::Config(format!("{name} must be >= 1")));
            }
        }
        for (name, pool) in [
            ("services", &self.services),
            ("hosts", &self.hosts),
            ("environments", &self.environments),
        ] {
            if pool.is_empty() {
                return Err(MeltError::Config(format!("{name} must not be empty")));
            }
        }
        if !self.duration_hours.is_finite() || self.duration_hours <= 0.0 {
            return Err(MeltError::Config("duration_hours must be > 0".to_string()));
        }
        Ok(())
    }
}

// ============================================================================
// Anomaly config
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CpuSpikeSettings {
    pub probability: f64,
    pub duration_minutes: u64,
    pub intensity: f64,
}

impl Default for CpuSpikeSettings {
    fn default() -> Self {
        Self {
            probability: 0.05,
            duration_minutes: 5,
            intensity: 3.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServiceOutageSettings {
    pub probability: f64,
    pub duration_minutes: u64,
    pub affected_services: Vec<String>,
}

impl Default for ServiceOutageSettings {
    fn default() -> Self {
        Self {
            probability: 0.01,
            duration_minutes: 10,
            affected_services: vec!["api".to_string(), "database".to_string()],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LatencySpikeSettings {
    pub probability: f64,
    pub duration_minutes: u64,
    pub multiplier: f64,
}

impl Default for LatencySpikeSettings {
    fn default() -> Self {
        Self {
            probability: 0.03,
            duration_minutes: 3,
            multiplier: 5.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ErrorBurstSettings {
    pub probability: f64,
    pub duration_minutes: u64,
    /// Target error rate during a burst; also the per-record mutation
    /// probability for in-window logs and spans.
    pub error_rate: f64,
}

impl Default for ErrorBurstSettings {
    fn default() -> Self {
        Self {
            probability: 0.02,
            duration_minutes: 2,
            error_rate: 0.5,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AnomalyConfig {
    pub cpu_spike: CpuSpikeSettings,
    pub service_outage: ServiceOutageSettings,
    pub latency_spike: LatencySpikeSettings,
    pub error_burst: ErrorBurstSettings,
}

impl AnomalyConfig {
    pub fn validate(&self) -> Result<()> {
        check_unit_range("cpu_spike.probability", self.cpu_spike.probability)?;
        check_unit_range("service_outage.probability", self.service_outage.probability)?;
        check_unit_range("latency_spike.probability", self.latency_spike.probability)?;
        check_unit_range("error_burst.probability", self.error_burst.probability)?;
        check_unit_range("error_burst.error_rate", self.error_burst.error_rate)?;

        if self.cpu_spike.intensity <= 0.0 {
            return Err(MeltError::Config("cpu_spike.intensity must be > 0".to_string()));
        }
        if self.latency_spike.multiplier <= 0.0 {
            return Err(MeltError::Config(
                "latency_spike.multiplier must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}

fn check_unit_range(name: &str, value: f64) -> Result<()> {
    if !(0.0..=1.0).contains(&value) {
        return Err(MeltError::Config(format!(
            "{name} must be within [0, 1], got {value}"
        )));
    }
    Ok(())
}

// ============================================================================
// Settings file
// ============================================================================

/// Top-level YAML settings file: a `generation` section and an `anomalies`
/// section, both optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    pub generation: GenerationConfig,
    pub anomalies: AnomalyConfig,
}

impl Settings {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| MeltError::Config(format!("cannot read {}: {e}", path.display())))?;
        let settings: Settings = serde_yaml::from_str(&text)
            .map_err(|e| MeltError::Config(format!("{}: {e}", path.display())))?;
        settings.generation.validate()?;
        settings.anomalies.validate()?;
        Ok(settings)
    }

    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(|e| MeltError::Config(e.to_string()))
    }
}

// ============================================================================
// Size specification
// ============================================================================

/// Parse a size string (`1GB`, `250MB`, `1.5tb`, bare bytes) into a byte
/// budget. Powers of 1024. Malformed input is a config error.
pub fn parse_size(input: &str) -> Result<u64> {
    let normalized = input.trim().to_ascii_uppercase();

    const UNITS: [(&str, u64); 5] = [
        ("TB", 1 << 40),
        ("GB", 1 << 30),
        ("MB", 1 << 20),
        ("KB", 1 << 10),
        ("B", 1),
    ];

    for (suffix, multiplier) in UNITS {
        if let Some(prefix) = normalized.strip_suffix(suffix) {
            let number: f64 = prefix.trim().parse().map_err(|_| {
                MeltError::Config(format!(
                    "invalid size '{input}': expected <number>{suffix}"
                ))
            })?;
            if !number.is_finite() || number < 0.0 {
                return Err(MeltError::Config(format!("invalid size '{input}'")));
            }
            return Ok((number * multiplier as f64) as u64);
        }
    }

    // Bare digits are taken as bytes.
    normalized.parse::<u64>().map_err(|_| {
        MeltError::Config(format!(
            "invalid size '{input}': expected <number> with B/KB/MB/GB/TB suffix"
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_size_suffixes() {
        assert_eq!(parse_size("1KB").unwrap(), 1024);
        assert_eq!(parse_size("1MB").unwrap(), 1024 * 1024);
        assert_eq!(parse_size("2gb").unwrap(), 2 * 1024 * 1024 * 1024);
        assert_eq!(parse_size("1TB").unwrap(), 1u64 << 40);
        assert_eq!(parse_size("512B").unwrap(), 512);
        assert_eq!(parse_size("1.5KB").unwrap(), 1536);
        assert_eq!(parse_size(" 100MB ").unwrap(), 100 * 1024 * 1024);
        // Bare digits are bytes.
        assert_eq!(parse_size("12345").unwrap(), 12345);
    }

    #[test]
    fn test_parse_size_rejects_garbage() {
        assert!(parse_size("").is_err());
        assert!(parse_size("GB").is_err());
        assert!(parse_size("ten MB").is_err());
        assert!(parse_size("-5MB").is_err());
        assert!(parse_size("1PB").is_err());
    }

    #[test]
    fn test_default_config_is_valid() {
        GenerationConfig::default().validate().unwrap();
        AnomalyConfig::default().validate().unwrap();
    }

    #[test]
    fn test_validation_rejects_out_of_range() {
        let mut config = GenerationConfig::default();
        config.error_rate = 1.5;
        assert!(config.validate().is_err());

        let mut config = GenerationConfig::default();
        config.max_trace_depth = 0;
        assert!(config.validate().is_err());

        let mut config = GenerationConfig::default();
        config.services.clear();
        assert!(config.validate().is_err());

        let mut anomalies = AnomalyConfig::default();
        anomalies.error_burst.error_rate = -0.1;
        assert!(anomalies.validate().is_err());
    }

    #[test]
    fn test_settings_yaml_round_trip() {
        let settings = Settings::default();
        let yaml = settings.to_yaml().unwrap();
        let parsed: Settings = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed, settings);
    }

    #[test]
    fn test_partial_settings_fill_defaults() {
        let yaml = "generation:\n  seed: 7\n  services: [checkout]\n";
        let parsed: Settings = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(parsed.generation.seed, 7);
        assert_eq!(parsed.generation.services, vec!["checkout".to_string()]);
        assert_eq!(parsed.generation.metrics_frequency_seconds, 30);
        assert_eq!(parsed.anomalies.cpu_spike.intensity, 3.0);
    }
}
