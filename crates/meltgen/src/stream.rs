//! Bounded-memory chunked generation.
//!
//! One chunk at a time: generate, inject, persist, accumulate. Generators are
//! created once per run and keep their time cursors across chunks, so stream
//! timestamps advance monotonically across chunk boundaries instead of
//! resetting. Each chunk gets its own rng derived from the global seed and
//! the chunk index, which keeps runs reproducible and leaves the door open to
//! generating independent chunks on worker threads.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::info;
use xxhash_rust::xxh3::xxh3_64;

use crate::config::{AnomalyConfig, GenerationConfig, AVG_RECORD_BYTES, parse_size};
use crate::error::Result;
use crate::generators::{EventsGenerator, LogsGenerator, MetricsGenerator, TraceTreeBuilder};
use crate::inject::{AnomalyInjector, AnomalyKind};
use crate::model::MeltDataset;
use crate::pools::EntityPools;
use crate::sink::ChunkSink;

pub const DEFAULT_CHUNK_SIZE_MB: u64 = 100;

/// Per-family share of a chunk's record budget.
const METRICS_SHARE: f64 = 0.40;
const LOGS_SHARE: f64 = 0.35;
const TRACES_SHARE: f64 = 0.15;
const EVENTS_SHARE: f64 = 0.10;

// ============================================================================
// Record budget
// ============================================================================

/// Record counts for one generation unit, derived from a byte budget via the
/// average-record-size heuristic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordBudget {
    pub metrics: usize,
    pub logs: usize,
    pub traces: usize,
    pub events: usize,
}

impl RecordBudget {
    pub fn from_bytes(bytes: u64) -> Self {
        let total = (bytes / AVG_RECORD_BYTES) as f64;
        Self {
            metrics: (total * METRICS_SHARE) as usize,
            logs: (total * LOGS_SHARE) as usize,
            traces: (total * TRACES_SHARE) as usize,
            events: (total * EVENTS_SHARE) as usize,
        }
    }

    pub fn total(&self) -> usize {
        self.metrics + self.logs + self.traces + self.events
    }
}

/// Sub-seed for one chunk: hash of the global seed and the chunk index.
/// Workers generating disjoint chunks never share a random source.
pub(crate) fn chunk_rng(seed: u64, chunk_index: u64) -> StdRng {
    let mut key = [0u8; 16];
    key[..8].copy_from_slice(&seed.to_le_bytes());
    key[8..].copy_from_slice(&chunk_index.to_le_bytes());
    StdRng::seed_from_u64(xxh3_64(&key))
}

// ============================================================================
// Statistics accumulator
// ============================================================================

/// Running totals folded in under a single-writer discipline: only the
/// orchestrator updates them, once per chunk.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenerationStats {
    pub total_records: u64,
    pub metrics_count: u64,
    pub logs_count: u64,
    pub traces_count: u64,
    pub events_count: u64,
    pub chunks: u64,
    pub generation_time_seconds: f64,
    pub output_size_mb: f64,
}

impl GenerationStats {
    pub fn accumulate(&mut self, chunk: &MeltDataset) {
        self.metrics_count += chunk.metrics.len() as u64;
        self.logs_count += chunk.logs.len() as u64;
        self.traces_count += chunk.traces.len() as u64;
        self.events_count += chunk.events.len() as u64;
        self.total_records += chunk.total_records() as u64;
        self.chunks += 1;
    }

    pub fn records_per_second(&self) -> f64 {
        if self.generation_time_seconds > 0.0 {
            self.total_records as f64 / self.generation_time_seconds
        } else {
            0.0
        }
    }
}

// ============================================================================
// Chunked orchestrator
// ============================================================================

pub struct ChunkedGenerator {
    config: GenerationConfig,
    anomaly_config: AnomalyConfig,
    chunk_bytes: u64,
    cancel: Option<Arc<AtomicBool>>,
}

impl ChunkedGenerator {
    /// Validates both configs up front; nothing is generated on error.
    pub fn new(config: GenerationConfig, anomaly_config: AnomalyConfig) -> Result<Self> {
        config.validate()?;
        anomaly_config.validate()?;
        Ok(Self {
            config,
            anomaly_config,
            chunk_bytes: DEFAULT_CHUNK_SIZE_MB * 1024 * 1024,
            cancel: None,
        })
    }

    pub fn with_chunk_size_mb(mut self, chunk_size_mb: u64) -> Self {
        self.chunk_bytes = chunk_size_mb.max(1) * 1024 * 1024;
        self
    }

    /// Cooperative cancellation, honored at chunk boundaries only.
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    /// Generate `size` worth of records chunk by chunk into `sink`. The
    /// emitted total lands within one chunk's record budget of the request.
    pub fn run(
        &self,
        size: &str,
        kinds: &[AnomalyKind],
        sink: &mut dyn ChunkSink,
    ) -> Result<GenerationStats> {
        let total_bytes = parse_size(size)?;
        let chunk_bytes = self.chunk_bytes.min(total_bytes).max(AVG_RECORD_BYTES);
        let num_chunks = (total_bytes / chunk_bytes).max(1);
        let budget = RecordBudget::from_bytes(chunk_bytes);

        info!(
            size,
            total_bytes,
            num_chunks,
            chunk_records = budget.total(),
            "starting chunked generation"
        );

        let pools = EntityPools::from_config(&self.config);
        let injector = AnomalyInjector::new(&self.anomaly_config);

        let mut metrics = MetricsGenerator::new(&self.config);
        let mut logs = LogsGenerator::new(&self.config);
        let mut traces = TraceTreeBuilder::new(&self.config);
        let mut events = EventsGenerator::new(&self.config);

        let mut stats = GenerationStats::default();
        let started = Instant::now();

        for chunk_index in 0..num_chunks {
            if let Some(flag) = &self.cancel {
                if flag.load(Ordering::Relaxed) {
                    info!(chunk_index, "cancellation requested; stopping at chunk boundary");
                    break;
                }
            }

            let mut rng = chunk_rng(self.config.seed, chunk_index);

            let mut chunk = MeltDataset {
                metrics: metrics.generate(&mut rng, &pools, budget.metrics),
                logs: logs.generate(&mut rng, &pools, budget.logs),
                traces: traces.generate(&mut rng, &pools, budget.traces),
                events: events.generate(&mut rng, &pools, budget.events),
            };

            injector.inject(&mut rng, &mut chunk, kinds);

            sink.write_chunk(&chunk)?;
            stats.accumulate(&chunk);

            info!(
                chunk = chunk_index + 1,
                total = num_chunks,
                records = stats.total_records,
                "chunk persisted"
            );
        }

        stats.generation_time_seconds = started.elapsed().as_secs_f64();
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct CollectingSink {
        chunks: Vec<MeltDataset>,
    }

    impl ChunkSink for CollectingSink {
        fn write_chunk(&mut self, chunk: &MeltDataset) -> Result<()> {
            self.chunks.push(chunk.clone());
            Ok(())
        }
    }

    #[test]
    fn test_budget_shares_sum_close_to_total() {
        let budget = RecordBudget::from_bytes(1024 * 1024);
        let expected_total = (1024 * 1024) / AVG_RECORD_BYTES;
        assert!(budget.total() <= expected_total as usize);
        // Flooring each share loses at most 4 records.
        assert!(budget.total() + 4 >= expected_total as usize);
        assert!(budget.metrics > budget.logs);
        assert!(budget.logs > budget.traces);
        assert!(budget.traces > budget.events);
    }

    #[test]
    fn test_chunk_rng_is_deterministic_and_distinct() {
        use rand::Rng;
        let mut a = chunk_rng(42, 0);
        let mut b = chunk_rng(42, 0);
        let mut c = chunk_rng(42, 1);
        let x: u64 = a.random();
        assert_eq!(x, b.random::<u64>());
        assert_ne!(x, c.random::<u64>());
    }

    #[test]
    fn test_count_conservation_across_chunks() {
        let generator = ChunkedGenerator::new(
            GenerationConfig::default(),
            AnomalyConfig::default(),
        )
        .unwrap()
        .with_chunk_size_mb(1);

        let mut sink = CollectingSink { chunks: Vec::new() };
        let stats = generator.run("3MB", &[], &mut sink).unwrap();

        assert_eq!(sink.chunks.len(), 3);
        assert_eq!(stats.chunks, 3);
        assert_eq!(
            stats.total_records,
            stats.metrics_count + stats.logs_count + stats.traces_count + stats.events_count
        );

        // Within one chunk's record budget of the request. Trace trees may
        // overshoot a chunk's span target slightly, never undershoot.
        let requested = (3 * 1024 * 1024) / AVG_RECORD_BYTES;
        let chunk_budget = RecordBudget::from_bytes(1024 * 1024).total() as u64;
        assert!(stats.total_records + chunk_budget >= requested);
        assert!(stats.total_records <= requested + chunk_budget);
    }

    #[test]
    fn test_timestamps_monotonic_across_chunks() {
        let generator = ChunkedGenerator::new(
            GenerationConfig::default(),
            AnomalyConfig::default(),
        )
        .unwrap()
        .with_chunk_size_mb(1);

        let mut sink = CollectingSink { chunks: Vec::new() };
        generator.run("2MB", &[], &mut sink).unwrap();

        let [first, second] = &sink.chunks[..] else {
            panic!("expected two chunks");
        };
        let last_metric = first.metrics.last().expect("chunk has metrics");
        let next_metric = second.metrics.first().expect("chunk has metrics");
        assert!(last_metric.timestamp < next_metric.timestamp);

        let last_log = first.logs.last().expect("chunk has logs");
        let next_log = second.logs.first().expect("chunk has logs");
        assert!(last_log.timestamp < next_log.timestamp);
    }

    #[test]
    fn test_cancellation_at_chunk_boundary() {
        let generator = ChunkedGenerator::new(
            GenerationConfig::default(),
            AnomalyConfig::default(),
        )
        .unwrap()
        .with_chunk_size_mb(1);

        let flag = Arc::new(AtomicBool::new(true));
        let generator = generator.with_cancel_flag(flag);

        let mut sink = CollectingSink { chunks: Vec::new() };
        let stats = generator.run("5MB", &[], &mut sink).unwrap();

        // Pre-set flag: not a single chunk is generated.
        assert_eq!(stats.chunks, 0);
        assert!(sink.chunks.is_empty());
    }

    #[test]
    fn test_invalid_config_rejected_before_generation() {
        let mut config = GenerationConfig::default();
        config.error_rate = 2.0;
        assert!(ChunkedGenerator::new(config, AnomalyConfig::default()).is_err());
    }
}
