//! Operational event generator.
//!
//! Severity is drawn from a per-type weight row, so an `incident` skews
//! toward error/critical while a `deployment` stays informational, and each
//! type attaches its own metadata keys.

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use rand::distr::Distribution;
use rand::distr::weighted::WeightedIndex;
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use std::collections::BTreeMap;

use crate::config::GenerationConfig;
use crate::generators::random_hex;
use crate::model::{EventRecord, EventSeverity};
use crate::pools::EntityPools;

pub const EVENT_TYPES: [&str; 10] = [
    "deployment",
    "scaling",
    "alert",
    "incident",
    "maintenance",
    "security",
    "backup",
    "configuration",
    "network",
    "performance",
];

pub const EVENT_SOURCES: [&str; 6] = [
    "ci-cd-pipeline",
    "monitoring-system",
    "auto-scaler",
    "security-scanner",
    "backup-service",
    "load-balancer",
];

/// Weight rows are [debug, info, warn, error, critical].
fn severity_weights(event_type: &str) -> [f64; 5] {
    match event_type {
        "deployment" => [0.1, 0.8, 0.1, 0.0, 0.0],
        "scaling" => [0.0, 0.9, 0.1, 0.0, 0.0],
        "alert" => [0.0, 0.2, 0.5, 0.3, 0.0],
        "incident" => [0.0, 0.0, 0.3, 0.5, 0.2],
        "maintenance" => [0.0, 0.9, 0.1, 0.0, 0.0],
        "security" => [0.0, 0.3, 0.4, 0.2, 0.1],
        "backup" => [0.1, 0.8, 0.1, 0.0, 0.0],
        "configuration" => [0.1, 0.7, 0.2, 0.0, 0.0],
        "network" => [0.0, 0.4, 0.4, 0.2, 0.0],
        "performance" => [0.0, 0.3, 0.5, 0.2, 0.0],
        _ => [0.2, 0.6, 0.2, 0.0, 0.0],
    }
}

pub struct EventsGenerator {
    cursor: DateTime<Utc>,
    max_interval_seconds: u32,
}

impl EventsGenerator {
    pub fn new(config: &GenerationConfig) -> Self {
        Self {
            cursor: config.start_time,
            max_interval_seconds: config.events_frequency_seconds,
        }
    }

    pub fn generate(
        &mut self,
        rng: &mut StdRng,
        pools: &EntityPools,
        count: usize,
    ) -> Vec<EventRecord> {
        let mut out = Vec::with_capacity(count);

        for _ in 0..count {
            let event_type = *EVENT_TYPES.choose(rng).unwrap_or(&EVENT_TYPES[0]);
            let severity = choose_severity(rng, event_type);
            let source = *EVENT_SOURCES.choose(rng).unwrap_or(&EVENT_SOURCES[0]);
            let service = pools.service(rng).to_string();

            let message = build_message(rng, event_type, &service);

            let mut metadata = BTreeMap::new();
            metadata.insert("service".to_string(), service.into());
            metadata.insert("host".to_string(), pools.host(rng).to_string().into());
            metadata.insert(
                "environment".to_string(),
                pools.environment(rng).to_string().into(),
            );
            metadata.insert(
                "event_id".to_string(),
                format!("evt_{}", random_hex(rng, 8)).into(),
            );
            metadata.insert(
                "correlation_id".to_string(),
                format!("corr_{}", random_hex(rng, 8)).into(),
            );

            match event_type {
                "deployment" => {
                    metadata.insert("version".to_string(), EntityPools::version_tag(rng).into());
                    metadata.insert(
                        "deployment_id".to_string(),
                        format!("dep_{}", random_hex(rng, 8)).into(),
                    );
                }
                "scaling" => {
                    metadata.insert(
                        "instance_count".to_string(),
                        rng.random_range(2..=10i64).into(),
                    );
                }
                "alert" => {
                    let rule = ["high_cpu", "high_memory", "error_rate"]
                        .choose(rng)
                        .copied()
                        .unwrap_or("high_cpu");
                    metadata.insert("alert_rule".to_string(), rule.into());
                }
                _ => {}
            }

            out.push(EventRecord {
                timestamp: self.cursor,
                event_type: event_type.to_string(),
                severity,
                source: source.to_string(),
                message,
                metadata,
            });

            // Events arrive irregularly; jitter the gap instead of a fixed
            // cadence, bounded by the configured frequency.
            let gap = rng.random_range(10..=self.max_interval_seconds.max(10));
            self.cursor += Duration::seconds(i64::from(gap));
        }

        out
    }

    pub fn cursor(&self) -> DateTime<Utc> {
        self.cursor
    }
}

fn choose_severity(rng: &mut StdRng, event_type: &str) -> EventSeverity {
    let weights = severity_weights(event_type);
    match WeightedIndex::new(weights) {
        Ok(index) => EventSeverity::ALL[index.sample(rng)],
        Err(_) => EventSeverity::Info,
    }
}

fn build_message(rng: &mut StdRng, event_type: &str, service: &str) -> String {
    match event_type {
        "deployment" => {
            let choice = rng.random_range(0..3);
            match choice {
                0 => format!(
                    "Service {service} version {} deployed successfully",
                    EntityPools::version_tag(rng)
                ),
                1 => format!(
                    "Deployment of {service} completed in {}s",
                    rng.random_range(30..=300)
                ),
                _ => format!("Rolling update of {service} started"),
            }
        }
        "scaling" => {
            let choice = rng.random_range(0..3);
            match choice {
                0 => format!(
                    "Auto-scaling {service} from {} to {} instances",
                    rng.random_range(2..=8),
                    rng.random_range(2..=12)
                ),
                1 => format!("Scaling event triggered for {service}"),
                _ => format!("Instance count adjusted for {service}"),
            }
        }
        "alert" => {
            let choice = rng.random_range(0..3);
            match choice {
                0 => format!("Alert triggered: High CPU usage on {service}"),
                1 => format!("Memory threshold exceeded for {service}"),
                _ => format!("Error rate spike detected in {service}"),
            }
        }
        "incident" => {
            let choice = rng.random_range(0..3);
            match choice {
                0 => format!("Service {service} experiencing degraded performance"),
                1 => format!("Incident detected: {service} unavailable"),
                _ => format!("Critical issue affecting {service}"),
            }
        }
        _ => {
            let choice = rng.random_range(0..3);
            match choice {
                0 => format!("Event occurred in {service}"),
                1 => format!("Operational event for {service}"),
                _ => format!("{event_type} event triggered"),
            }
        }
    }
}
