//! One-shot generation: materialize a whole dataset in memory, inject, then
//! persist. The chunked orchestrator in `stream` is the bounded-memory path;
//! this one exists for dataset sizes that comfortably fit in RAM and for
//! library callers that want the records themselves.

use std::path::Path;
use std::time::Instant;

use tracing::info;

use crate::config::{AnomalyConfig, GenerationConfig, parse_size};
use crate::error::Result;
use crate::generators::{EventsGenerator, LogsGenerator, MetricsGenerator, TraceTreeBuilder};
use crate::inject::{AnomalyInjector, AnomalyKind};
use crate::model::MeltDataset;
use crate::pools::EntityPools;
use crate::sink::{ChunkSink, JsonlSink, write_reports};
use crate::stream::{GenerationStats, RecordBudget, chunk_rng};

pub struct MeltGenerator {
    config: GenerationConfig,
    anomaly_config: AnomalyConfig,
}

impl MeltGenerator {
    /// Validates both configs up front; nothing is generated on error.
    pub fn new(config: GenerationConfig, anomaly_config: AnomalyConfig) -> Result<Self> {
        config.validate()?;
        anomaly_config.validate()?;
        Ok(Self {
            config,
            anomaly_config,
        })
    }

    pub fn config(&self) -> &GenerationConfig {
        &self.config
    }

    pub fn anomaly_config(&self) -> &AnomalyConfig {
        &self.anomaly_config
    }

    /// Materialize one dataset of roughly `size` bytes and run the requested
    /// anomaly kinds over it.
    pub fn generate(&self, size: &str, kinds: &[AnomalyKind]) -> Result<MeltDataset> {
        let total_bytes = parse_size(size)?;
        let budget = RecordBudget::from_bytes(total_bytes);

        info!(
            size,
            metrics = budget.metrics,
            logs = budget.logs,
            traces = budget.traces,
            events = budget.events,
            "generating dataset"
        );

        let pools = EntityPools::from_config(&self.config);
        let mut rng = chunk_rng(self.config.seed, 0);

        let mut data = MeltDataset {
            metrics: MetricsGenerator::new(&self.config).generate(&mut rng, &pools, budget.metrics),
            logs: LogsGenerator::new(&self.config).generate(&mut rng, &pools, budget.logs),
            traces: TraceTreeBuilder::new(&self.config).generate(&mut rng, &pools, budget.traces),
            events: EventsGenerator::new(&self.config).generate(&mut rng, &pools, budget.events),
        };

        AnomalyInjector::new(&self.anomaly_config).inject(&mut rng, &mut data, kinds);

        Ok(data)
    }

    /// Persist a materialized dataset plus `metadata.json`/`statistics.json`.
    pub fn save(
        &self,
        data: &MeltDataset,
        dir: &Path,
        kinds: &[AnomalyKind],
    ) -> Result<GenerationStats> {
        let started = Instant::now();

        let mut sink = JsonlSink::create(dir)?;
        sink.write_chunk(data)?;
        sink.finish()?;

        let mut stats = GenerationStats::default();
        stats.accumulate(data);
        stats.generation_time_seconds = started.elapsed().as_secs_f64();

        write_reports(
            dir,
            &self.config,
            &self.anomaly_config,
            kinds,
            &mut stats,
            "standard",
        )?;

        info!(
            dir = %dir.display(),
            records = stats.total_records,
            "dataset saved"
        );
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inject::AnomalyKind;

    #[test]
    fn test_generate_is_deterministic() {
        let make = || {
            MeltGenerator::new(GenerationConfig::default(), AnomalyConfig::default())
                .unwrap()
                .generate("256KB", &[AnomalyKind::CpuSpike])
                .unwrap()
        };
        assert_eq!(make(), make());
    }

    #[test]
    fn test_seed_changes_output() {
        let mut other = GenerationConfig::default();
        other.seed = 43;

        let a = MeltGenerator::new(GenerationConfig::default(), AnomalyConfig::default())
            .unwrap()
            .generate("64KB", &[])
            .unwrap();
        let b = MeltGenerator::new(other, AnomalyConfig::default())
            .unwrap()
            .generate("64KB", &[])
            .unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_total_records_matches_families() {
        let data = MeltGenerator::new(GenerationConfig::default(), AnomalyConfig::default())
            .unwrap()
            .generate("128KB", &[])
            .unwrap();
        assert_eq!(
            data.total_records(),
            data.metrics.len() + data.logs.len() + data.traces.len() + data.events.len()
        );
        assert!(data.total_records() > 0);
    }

    #[test]
    fn test_save_writes_reports() {
        let dir = tempfile::tempdir().unwrap();
        let generator =
            MeltGenerator::new(GenerationConfig::default(), AnomalyConfig::default()).unwrap();
        let data = generator.generate("64KB", &[]).unwrap();
        let stats = generator.save(&data, dir.path(), &[]).unwrap();

        assert_eq!(stats.total_records, data.total_records() as u64);
        assert!(dir.path().join("metadata.json").exists());
        assert!(dir.path().join("statistics.json").exists());

        let metadata: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(dir.path().join("metadata.json")).unwrap())
                .unwrap();
        assert_eq!(metadata["generation_config"]["seed"], 42);
        assert!(metadata["data_types"].as_array().unwrap().len() == 4);
    }
}
