//! Benchmark suite for the meltgen generator.
//!
//! Times `generate` end-to-end across a matrix of target sizes, samples
//! process memory before and after each run, and aggregates avg/min/max per
//! size. Results serialize to JSON for tracking across revisions.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Instant;

use meltgen::config::{AnomalyConfig, GenerationConfig};
use meltgen::generator::MeltGenerator;

/// Benchmark configuration
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct BenchmarkConfig {
    pub sizes: Vec<String>,
    pub iterations: u32,
    pub seed: u64,
}

impl Default for BenchmarkConfig {
    fn default() -> Self {
        Self {
            sizes: vec!["10MB".to_string(), "50MB".to_string(), "100MB".to_string()],
            iterations: 3,
            seed: 42,
        }
    }
}

/// One timed generation run.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct RunSample {
    pub generation_time_seconds: f64,
    pub memory_delta_mb: f64,
    pub total_records: u64,
    pub records_per_second: f64,
    pub metrics_count: u64,
    pub logs_count: u64,
    pub traces_count: u64,
    pub events_count: u64,
}

/// avg/min/max over a set of samples.
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct Aggregate {
    pub avg: f64,
    pub min: f64,
    pub max: f64,
}

impl Aggregate {
    fn from_values(values: &[f64]) -> Self {
        if values.is_empty() {
            return Self::default();
        }
        Self {
            avg: values.iter().sum::<f64>() / values.len() as f64,
            min: values.iter().cloned().fold(f64::INFINITY, f64::min),
            max: values.iter().cloned().fold(f64::NEG_INFINITY, f64::max),
        }
    }
}

/// Aggregated results for one size.
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct SizeSummary {
    pub generation_time_seconds: Aggregate,
    pub memory_delta_mb: Aggregate,
    pub total_records: Aggregate,
    pub records_per_second: Aggregate,
    pub samples: Vec<RunSample>,
}

pub struct BenchmarkRunner {
    config: BenchmarkConfig,
}

impl BenchmarkRunner {
    pub fn new(config: BenchmarkConfig) -> Self {
        Self { config }
    }

    /// Run the full matrix. Keys of the result map are the size strings.
    pub fn run(&self) -> anyhow::Result<BTreeMap<String, SizeSummary>> {
        let mut results = BTreeMap::new();

        for size in &self.config.sizes {
            eprintln!("Benchmarking {size}...");
            let mut samples = Vec::with_capacity(self.config.iterations as usize);

            for iteration in 0..self.config.iterations {
                eprintln!("  Iteration {}/{}", iteration + 1, self.config.iterations);
                samples.push(self.single_run(size)?);
            }

            results.insert(size.clone(), summarize(samples));
        }

        Ok(results)
    }

    fn single_run(&self, size: &str) -> anyhow::Result<RunSample> {
        let config = GenerationConfig {
            seed: self.config.seed,
            duration_hours: 1.0,
            ..GenerationConfig::default()
        };
        let generator = MeltGenerator::new(config, AnomalyConfig::default())?;

        let rss_before = process_rss_mb();
        let started = Instant::now();

        let data = generator.generate(size, &[])?;

        let elapsed = started.elapsed().as_secs_f64();
        let rss_after = process_rss_mb();
        let total_records = data.total_records() as u64;

        Ok(RunSample {
            generation_time_seconds: elapsed,
            memory_delta_mb: (rss_after - rss_before).max(0.0),
            total_records,
            records_per_second: if elapsed > 0.0 {
                total_records as f64 / elapsed
            } else {
                0.0
            },
            metrics_count: data.metrics.len() as u64,
            logs_count: data.logs.len() as u64,
            traces_count: data.traces.len() as u64,
            events_count: data.events.len() as u64,
        })
    }
}

fn summarize(samples: Vec<RunSample>) -> SizeSummary {
    let collect = |f: fn(&RunSample) -> f64| -> Vec<f64> { samples.iter().map(f).collect() };

    SizeSummary {
        generation_time_seconds: Aggregate::from_values(&collect(|s| s.generation_time_seconds)),
        memory_delta_mb: Aggregate::from_values(&collect(|s| s.memory_delta_mb)),
        total_records: Aggregate::from_values(&collect(|s| s.total_records as f64)),
        records_per_second: Aggregate::from_values(&collect(|s| s.records_per_second)),
        samples,
    }
}

/// Resident set size of this process in MB. Reads `/proc/self/status` on
/// Linux; returns 0 where that is unavailable.
pub fn process_rss_mb() -> f64 {
    #[cfg(target_os = "linux")]
    {
        if let Ok(status) = std::fs::read_to_string("/proc/self/status") {
            for line in status.lines() {
                if let Some(rest) = line.strip_prefix("VmRSS:") {
                    let kb: f64 = rest
                        .trim()
                        .trim_end_matches("kB")
                        .trim()
                        .parse()
                        .unwrap_or(0.0);
                    return kb / 1024.0;
                }
            }
        }
    }
    0.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aggregate_math() {
        let agg = Aggregate::from_values(&[1.0, 2.0, 3.0]);
        assert_eq!(agg.avg, 2.0);
        assert_eq!(agg.min, 1.0);
        assert_eq!(agg.max, 3.0);

        let empty = Aggregate::from_values(&[]);
        assert_eq!(empty.avg, 0.0);
    }

    #[test]
    fn test_small_benchmark_runs() {
        let runner = BenchmarkRunner::new(BenchmarkConfig {
            sizes: vec!["64KB".to_string()],
            iterations: 2,
            seed: 42,
        });
        let results = runner.run().unwrap();
        let summary = &results["64KB"];
        assert_eq!(summary.samples.len(), 2);
        assert!(summary.total_records.avg > 0.0);
        // Same seed and size: record counts match across iterations.
        assert_eq!(summary.total_records.min, summary.total_records.max);
    }
}
