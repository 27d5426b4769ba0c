//! Cross-stream anomaly injection.
//!
//! The injector takes exclusive ownership of a materialized dataset for the
//! duration of the pass and walks index lists into each record buffer. Every
//! kind follows the same shape: sample epicenter records from the relevant
//! metric stream, derive a time window and scope key per epicenter, then
//! apply the kind-specific transformation to every in-window, in-scope record
//! across metrics, logs, and traces.
//!
//! Kinds run in a fixed order when `all` is requested; later kinds may stack
//! on already-mutated values (layered incidents, not a bug).

use chrono::Duration;
use rand::Rng;
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use std::fmt;
use std::str::FromStr;
use tracing::{debug, info};

use crate::config::AnomalyConfig;
use crate::error::MeltError;
use crate::model::{LogLevel, MeltDataset, SpanStatus};

/// Span duration (microseconds) above which a latency-stretched span is
/// reported as timed out.
const TIMEOUT_THRESHOLD_US: u64 = 1_000_000;

// ============================================================================
// Anomaly kinds
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnomalyKind {
    CpuSpike,
    ServiceOutage,
    LatencySpike,
    ErrorBurst,
    All,
}

impl AnomalyKind {
    /// Injection order used when `all` is requested.
    pub const ORDERED: [AnomalyKind; 4] = [
        AnomalyKind::CpuSpike,
        AnomalyKind::ServiceOutage,
        AnomalyKind::LatencySpike,
        AnomalyKind::ErrorBurst,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            AnomalyKind::CpuSpike => "cpu_spike",
            AnomalyKind::ServiceOutage => "service_outage",
            AnomalyKind::LatencySpike => "latency_spike",
            AnomalyKind::ErrorBurst => "error_burst",
            AnomalyKind::All => "all",
        }
    }
}

impl fmt::Display for AnomalyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AnomalyKind {
    type Err = MeltError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "cpu_spike" => Ok(AnomalyKind::CpuSpike),
            "service_outage" => Ok(AnomalyKind::ServiceOutage),
            "latency_spike" => Ok(AnomalyKind::LatencySpike),
            "error_burst" => Ok(AnomalyKind::ErrorBurst),
            "all" => Ok(AnomalyKind::All),
            other => Err(MeltError::Config(format!(
                "unknown anomaly kind '{other}' (expected cpu_spike, service_outage, latency_spike, error_burst, or all)"
            ))),
        }
    }
}

/// Parse a comma-separated anomaly list from the CLI.
pub fn parse_kinds(csv: &str) -> crate::error::Result<Vec<AnomalyKind>> {
    csv.split(',')
        .filter(|s| !s.trim().is_empty())
        .map(AnomalyKind::from_str)
        .collect()
}

// ============================================================================
// Injector
// ============================================================================

pub struct AnomalyInjector<'a> {
    config: &'a AnomalyConfig,
}

impl<'a> AnomalyInjector<'a> {
    pub fn new(config: &'a AnomalyConfig) -> Self {
        Self { config }
    }

    /// Mutate qualifying records in place. Degenerate inputs (no eligible
    /// records for a kind) are logged no-ops.
    pub fn inject(&self, rng: &mut StdRng, data: &mut MeltDataset, kinds: &[AnomalyKind]) {
        for kind in kinds {
            match kind {
                AnomalyKind::All => {
                    for ordered in AnomalyKind::ORDERED {
                        self.inject_one(rng, data, ordered);
                    }
                }
                other => self.inject_one(rng, data, *other),
            }
        }
    }

    fn inject_one(&self, rng: &mut StdRng, data: &mut MeltDataset, kind: AnomalyKind) {
        match kind {
            AnomalyKind::CpuSpike => self.inject_cpu_spike(rng, data),
            AnomalyKind::ServiceOutage => self.inject_service_outage(rng, data),
            AnomalyKind::LatencySpike => self.inject_latency_spike(rng, data),
            AnomalyKind::ErrorBurst => self.inject_error_burst(rng, data),
            AnomalyKind::All => {}
        }
    }

    fn inject_cpu_spike(&self, rng: &mut StdRng, data: &mut MeltDataset) {
        let settings = &self.config.cpu_spike;
        let eligible = metric_indices(data, "cpu_usage");
        if eligible.is_empty() {
            info!("no cpu_usage points present; cpu_spike is a no-op");
            return;
        }

        let epicenters = sample_epicenters(rng, &eligible, settings.probability);
        let window = Duration::minutes(settings.duration_minutes as i64);

        for &epicenter in &epicenters {
            let (start, service, host) = {
                let m = &data.metrics[epicenter];
                (
                    m.timestamp,
                    m.labels.get("service").cloned(),
                    m.labels.get("host").cloned(),
                )
            };
            let end = start + window;

            for &i in &eligible {
                let m = &mut data.metrics[i];
                if m.timestamp >= start
                    && m.timestamp <= end
                    && m.labels.get("service") == service.as_ref()
                    && m.labels.get("host") == host.as_ref()
                {
                    m.value = (m.value * settings.intensity).min(100.0);
                    m.anomaly = true;
                }
            }
        }

        info!(windows = epicenters.len(), "injected cpu spikes");
    }

    fn inject_service_outage(&self, rng: &mut StdRng, data: &mut MeltDataset) {
        let settings = &self.config.service_outage;
        if settings.affected_services.is_empty() || data.metrics.is_empty() {
            info!("no candidate services or metrics present; service_outage is a no-op");
            return;
        }

        // One candidate subset and one window per call, then an independent
        // probability gate per service. Every gate may fail; that yields an
        // unchanged dataset and is a legitimate outcome, not an error.
        let subset_len = rng.random_range(1..=settings.affected_services.len());
        let targets: Vec<String> = settings
            .affected_services
            .choose_multiple(rng, subset_len)
            .cloned()
            .collect();

        let epicenter = rng.random_range(0..data.metrics.len());
        let start = data.metrics[epicenter].timestamp;
        let end = start + Duration::minutes(settings.duration_minutes as i64);

        let mut applied = Vec::new();

        for service in &targets {
            if rng.random::<f64>() > settings.probability {
                continue;
            }
            applied.push(service.clone());

            for m in &mut data.metrics {
                if m.timestamp >= start
                    && m.timestamp <= end
                    && m.labels.get("service") == Some(service)
                {
                    match m.metric_name.as_str() {
                        "cpu_usage" => m.value = (m.value * 0.1).max(0.0),
                        "error_rate" => m.value = (m.value * 10.0).min(1.0),
                        "response_time" => m.value *= 20.0,
                        _ => {}
                    }
                    m.anomaly = true;
                }
            }

            for log in &mut data.logs {
                if log.timestamp >= start
                    && log.timestamp <= end
                    && log.service == *service
                    && rng.random_bool(0.7)
                {
                    log.level = LogLevel::Error;
                    log.message = format!("Service {service} is unavailable - {}", log.message);
                }
            }

            for span in &mut data.traces {
                if span.start_time >= start
                    && span.start_time <= end
                    && span.service == *service
                    && rng.random_bool(0.8)
                {
                    span.status = SpanStatus::Error;
                    span.duration = span.duration.saturating_mul(3);
                }
            }
        }

        if applied.is_empty() {
            debug!("service_outage probability gates all failed; dataset unchanged");
        } else {
            info!(services = ?applied, %start, %end, "injected service outage");
        }
    }

    fn inject_latency_spike(&self, rng: &mut StdRng, data: &mut MeltDataset) {
        let settings = &self.config.latency_spike;
        let eligible = metric_indices(data, "response_time");
        if eligible.is_empty() {
            info!("no response_time points present; latency_spike is a no-op");
            return;
        }

        let epicenters = sample_epicenters(rng, &eligible, settings.probability);
        let window = Duration::minutes(settings.duration_minutes as i64);

        for &epicenter in &epicenters {
            let (start, service) = {
                let m = &data.metrics[epicenter];
                (m.timestamp, m.labels.get("service").cloned())
            };
            let end = start + window;

            for &i in &eligible {
                let m = &mut data.metrics[i];
                if m.timestamp >= start
                    && m.timestamp <= end
                    && m.labels.get("service") == service.as_ref()
                {
                    m.value *= settings.multiplier;
                    m.anomaly = true;
                }
            }

            for span in &mut data.traces {
                if span.start_time >= start
                    && span.start_time <= end
                    && Some(&span.service) == service.as_ref()
                {
                    span.duration = (span.duration as f64 * settings.multiplier) as u64;
                    if span.duration > TIMEOUT_THRESHOLD_US {
                        span.status = SpanStatus::Timeout;
                    }
                }
            }
        }

        info!(windows = epicenters.len(), "injected latency spikes");
    }

    fn inject_error_burst(&self, rng: &mut StdRng, data: &mut MeltDataset) {
        let settings = &self.config.error_burst;
        let eligible = metric_indices(data, "error_rate");
        if eligible.is_empty() {
            info!("no error_rate points present; error_burst is a no-op");
            return;
        }

        let epicenters = sample_epicenters(rng, &eligible, settings.probability);
        let window = Duration::minutes(settings.duration_minutes as i64);
        let burst_rate = settings.error_rate.clamp(0.0, 1.0);

        for &epicenter in &epicenters {
            let (start, service) = {
                let m = &data.metrics[epicenter];
                (m.timestamp, m.labels.get("service").cloned())
            };
            let end = start + window;

            for &i in &eligible {
                let m = &mut data.metrics[i];
                if m.timestamp >= start
                    && m.timestamp <= end
                    && m.labels.get("service") == service.as_ref()
                {
                    m.value = burst_rate;
                    m.anomaly = true;
                }
            }

            for log in &mut data.logs {
                if log.timestamp >= start
                    && log.timestamp <= end
                    && Some(&log.service) == service.as_ref()
                    && rng.random_bool(burst_rate)
                {
                    log.level = LogLevel::Error;
                    log.message = format!("Error burst: {}", log.message);
                }
            }

            for span in &mut data.traces {
                if span.start_time >= start
                    && span.start_time <= end
                    && Some(&span.service) == service.as_ref()
                    && rng.random_bool(burst_rate)
                {
                    span.status = SpanStatus::Error;
                }
            }
        }

        info!(windows = epicenters.len(), "injected error bursts");
    }
}

/// Indices of metric points with the given name.
fn metric_indices(data: &MeltDataset, name: &str) -> Vec<usize> {
    data.metrics
        .iter()
        .enumerate()
        .filter(|(_, m)| m.metric_name == name)
        .map(|(i, _)| i)
        .collect()
}

/// Sample `floor(len * probability)` epicenters without replacement.
fn sample_epicenters(rng: &mut StdRng, eligible: &[usize], probability: f64) -> Vec<usize> {
    let amount = ((eligible.len() as f64 * probability) as usize).min(eligible.len());
    rand::seq::index::sample(rng, eligible.len(), amount)
        .into_iter()
        .map(|i| eligible[i])
        .collect()
}
