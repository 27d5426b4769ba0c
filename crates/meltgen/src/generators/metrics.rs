//! Metric sample generator.

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use std::collections::BTreeMap;

use crate::config::GenerationConfig;
use crate::model::MetricPoint;
use crate::pools::EntityPools;

/// Plausible-range row for one metric kind.
#[derive(Debug, Clone, Copy)]
pub struct MetricType {
    pub name: &'static str,
    pub unit: &'static str,
    pub min: f64,
    pub normal_max: f64,
    pub spike_max: f64,
}

/// Fixed catalog of metric kinds and their plausible ranges. `spike_max` is
/// the ceiling anomaly injection may push a value toward.
pub const METRIC_TYPES: [MetricType; 6] = [
    MetricType { name: "cpu_usage", unit: "percent", min: 5.0, normal_max: 80.0, spike_max: 95.0 },
    MetricType { name: "memory_usage", unit: "percent", min: 10.0, normal_max: 75.0, spike_max: 95.0 },
    MetricType { name: "disk_usage", unit: "percent", min: 20.0, normal_max: 85.0, spike_max: 98.0 },
    MetricType { name: "response_time", unit: "ms", min: 10.0, normal_max: 200.0, spike_max: 2000.0 },
    MetricType { name: "request_rate", unit: "req/s", min: 1.0, normal_max: 100.0, spike_max: 500.0 },
    MetricType { name: "error_rate", unit: "percent", min: 0.0, normal_max: 5.0, spike_max: 25.0 },
];

pub struct MetricsGenerator {
    cursor: DateTime<Utc>,
    interval: Duration,
}

impl MetricsGenerator {
    pub fn new(config: &GenerationConfig) -> Self {
        Self {
            cursor: config.start_time,
            interval: Duration::seconds(i64::from(config.metrics_frequency_seconds)),
        }
    }

    /// Produce `count` samples, advancing the cursor once per sample. A zero
    /// count returns an empty vec.
    pub fn generate(
        &mut self,
        rng: &mut StdRng,
        pools: &EntityPools,
        count: usize,
    ) -> Vec<MetricPoint> {
        let mut out = Vec::with_capacity(count);

        for _ in 0..count {
            // Catalog is a non-empty const table.
            let metric = METRIC_TYPES.choose(rng).copied().unwrap_or(METRIC_TYPES[0]);

            let base = rng.random_range(metric.min..=metric.normal_max);
            let noise = rng.random_range(-0.1..0.1) * base;
            let value = (base + noise).max(metric.min);

            let mut labels = BTreeMap::new();
            labels.insert("service".to_string(), pools.service(rng).to_string());
            labels.insert("host".to_string(), pools.host(rng).to_string());
            labels.insert("environment".to_string(), pools.environment(rng).to_string());
            labels.insert("unit".to_string(), metric.unit.to_string());

            out.push(MetricPoint {
                timestamp: self.cursor,
                metric_name: metric.name.to_string(),
                value: round2(value),
                labels,
                anomaly: false,
            });

            self.cursor += self.interval;
        }

        out
    }

    pub fn cursor(&self) -> DateTime<Utc> {
        self.cursor
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn test_zero_count_is_empty() {
        let config = GenerationConfig::default();
        let pools = EntityPools::from_config(&config);
        let mut generator = MetricsGenerator::new(&config);
        let mut rng = StdRng::seed_from_u64(1);
        assert!(generator.generate(&mut rng, &pools, 0).is_empty());
    }

    #[test]
    fn test_values_stay_in_plausible_range() {
        let config = GenerationConfig::default();
        let pools = EntityPools::from_config(&config);
        let mut generator = MetricsGenerator::new(&config);
        let mut rng = StdRng::seed_from_u64(7);

        for point in generator.generate(&mut rng, &pools, 500) {
            let row = METRIC_TYPES
                .iter()
                .find(|m| m.name == point.metric_name)
                .expect("known metric name");
            assert!(!point.anomaly);
            assert!(point.value >= row.min, "{} below min", point.metric_name);
            // Uniform base plus at most +10% multiplicative noise.
            assert!(point.value <= row.normal_max * 1.1 + 0.01);
            assert_eq!(point.labels.get("unit"), Some(&row.unit.to_string()));
        }
    }

    #[test]
    fn test_cursor_advances_by_frequency() {
        let config = GenerationConfig::default();
        let pools = EntityPools::from_config(&config);
        let mut generator = MetricsGenerator::new(&config);
        let mut rng = StdRng::seed_from_u64(1);

        let points = generator.generate(&mut rng, &pools, 3);
        let step = Duration::seconds(i64::from(config.metrics_frequency_seconds));
        assert_eq!(points[0].timestamp, config.start_time);
        assert_eq!(points[1].timestamp, config.start_time + step);
        assert_eq!(points[2].timestamp, config.start_time + step + step);
        assert_eq!(generator.cursor(), config.start_time + step * 3);
    }
}
