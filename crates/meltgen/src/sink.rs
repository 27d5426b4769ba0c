//! Persistence: append-only JSONL files plus the run reports.
//!
//! One newline-delimited JSON file per non-empty family; files are opened
//! lazily on the first record so an empty family leaves no file behind. I/O
//! failures abort the current chunk and leave partial files in place —
//! callers needing atomicity write to a temporary directory and rename.

use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::Serialize;
use serde_json::json;
use tracing::debug;

use crate::config::{AnomalyConfig, GenerationConfig};
use crate::error::{MeltError, Result};
use crate::inject::AnomalyKind;
use crate::model::{Family, MeltDataset};
use crate::stream::GenerationStats;

pub const METADATA_FILE: &str = "metadata.json";
pub const STATISTICS_FILE: &str = "statistics.json";

/// Receives one materialized chunk at a time.
pub trait ChunkSink {
    fn write_chunk(&mut self, chunk: &MeltDataset) -> Result<()>;
}

/// Append-only JSONL sink, one writer per family.
pub struct JsonlSink {
    dir: PathBuf,
    writers: HashMap<Family, BufWriter<File>>,
}

impl JsonlSink {
    pub fn create(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).map_err(|e| MeltError::persistence(&dir, e))?;
        Ok(Self {
            dir,
            writers: HashMap::new(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn writer(&mut self, family: Family) -> Result<&mut BufWriter<File>> {
        if !self.writers.contains_key(&family) {
            let path = self.dir.join(family.file_name());
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .map_err(|e| MeltError::persistence(&path, e))?;
            debug!(path = %path.display(), "opened family file");
            self.writers.insert(family, BufWriter::new(file));
        }
        // Entry was just inserted above if missing.
        self.writers
            .get_mut(&family)
            .ok_or_else(|| MeltError::Generation("writer map corrupted".to_string()))
    }

    fn write_lines<T: Serialize>(&mut self, family: Family, records: &[T]) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }
        let path = self.dir.join(family.file_name());
        let writer = self.writer(family)?;
        for record in records {
            let line = serde_json::to_string(record)
                .map_err(|e| MeltError::persistence(&path, std::io::Error::other(e)))?;
            writer
                .write_all(line.as_bytes())
                .and_then(|()| writer.write_all(b"\n"))
                .map_err(|e| MeltError::persistence(&path, e))?;
        }
        Ok(())
    }

    /// Flush all buffered writers. Call once after the last chunk.
    pub fn finish(&mut self) -> Result<()> {
        for (family, writer) in &mut self.writers {
            writer
                .flush()
                .map_err(|e| MeltError::persistence(self.dir.join(family.file_name()), e))?;
        }
        Ok(())
    }
}

impl ChunkSink for JsonlSink {
    fn write_chunk(&mut self, chunk: &MeltDataset) -> Result<()> {
        self.write_lines(Family::Metrics, &chunk.metrics)?;
        self.write_lines(Family::Logs, &chunk.logs)?;
        self.write_lines(Family::Traces, &chunk.traces)?;
        self.write_lines(Family::Events, &chunk.events)?;
        Ok(())
    }
}

// ============================================================================
// Run reports
// ============================================================================

/// Sum the on-disk family file sizes, skipping files that do not exist (an
/// empty family never created one).
pub fn output_size_bytes(dir: &Path) -> u64 {
    Family::ALL
        .iter()
        .filter_map(|family| std::fs::metadata(dir.join(family.file_name())).ok())
        .map(|meta| meta.len())
        .sum()
}

/// Per-family `{size_bytes, size_mb}` map for metadata.json.
fn file_sizes(dir: &Path) -> serde_json::Value {
    let mut sizes = serde_json::Map::new();
    for family in Family::ALL {
        if let Ok(meta) = std::fs::metadata(dir.join(family.file_name())) {
            let bytes = meta.len();
            sizes.insert(
                family.name().to_string(),
                json!({
                    "size_bytes": bytes,
                    "size_mb": round2(bytes as f64 / (1024.0 * 1024.0)),
                }),
            );
        }
    }
    serde_json::Value::Object(sizes)
}

/// Write `metadata.json` and `statistics.json` for a finished run and fold
/// the measured output size back into the stats.
pub fn write_reports(
    dir: &Path,
    config: &GenerationConfig,
    anomaly_config: &AnomalyConfig,
    kinds: &[AnomalyKind],
    stats: &mut GenerationStats,
    mode: &str,
) -> Result<()> {
    stats.output_size_mb = round2(output_size_bytes(dir) as f64 / (1024.0 * 1024.0));

    let data_types: Vec<&str> = [
        (Family::Metrics, stats.metrics_count),
        (Family::Logs, stats.logs_count),
        (Family::Traces, stats.traces_count),
        (Family::Events, stats.events_count),
    ]
    .into_iter()
    .filter(|(_, count)| *count > 0)
    .map(|(family, _)| family.name())
    .collect();

    let anomalies: Vec<&str> = kinds.iter().map(|k| k.as_str()).collect();

    let metadata = json!({
        "generated_at": Utc::now().to_rfc3339(),
        "generator_version": env!("CARGO_PKG_VERSION"),
        "generation_mode": mode,
        "data_types": data_types,
        "total_records": stats.total_records,
        "total_size_mb": stats.output_size_mb,
        "generation_time_seconds": round2(stats.generation_time_seconds),
        "records_per_second": stats.records_per_second().round(),
        "file_sizes": file_sizes(dir),
        "anomalies_injected": anomalies,
        "generation_config": config,
        "anomaly_config": anomaly_config,
    });

    let statistics = json!({
        "total_records": stats.total_records,
        "metrics_count": stats.metrics_count,
        "events_count": stats.events_count,
        "logs_count": stats.logs_count,
        "traces_count": stats.traces_count,
        "generation_time_seconds": stats.generation_time_seconds,
        "output_size_mb": stats.output_size_mb,
    });

    write_json(&dir.join(METADATA_FILE), &metadata)?;
    write_json(&dir.join(STATISTICS_FILE), &statistics)?;
    Ok(())
}

fn write_json(path: &Path, value: &serde_json::Value) -> Result<()> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|e| MeltError::persistence(path, std::io::Error::other(e)))?;
    std::fs::write(path, text).map_err(|e| MeltError::persistence(path, e))
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{MetricPoint, MeltDataset};
    use std::collections::BTreeMap;

    fn sample_chunk() -> MeltDataset {
        let mut data = MeltDataset::default();
        data.metrics.push(MetricPoint {
            timestamp: Utc::now(),
            metric_name: "cpu_usage".to_string(),
            value: 55.5,
            labels: BTreeMap::new(),
            anomaly: false,
        });
        data
    }

    #[test]
    fn test_only_non_empty_families_create_files() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = JsonlSink::create(dir.path()).unwrap();
        sink.write_chunk(&sample_chunk()).unwrap();
        sink.finish().unwrap();

        assert!(dir.path().join("metrics.jsonl").exists());
        assert!(!dir.path().join("logs.jsonl").exists());
        assert!(!dir.path().join("traces.jsonl").exists());
        assert!(!dir.path().join("events.jsonl").exists());
    }

    #[test]
    fn test_chunks_append() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = JsonlSink::create(dir.path()).unwrap();
        sink.write_chunk(&sample_chunk()).unwrap();
        sink.write_chunk(&sample_chunk()).unwrap();
        sink.finish().unwrap();

        let text = std::fs::read_to_string(dir.path().join("metrics.jsonl")).unwrap();
        assert_eq!(text.lines().count(), 2);
        for line in text.lines() {
            let value: serde_json::Value = serde_json::from_str(line).unwrap();
            assert_eq!(value["metric_name"], "cpu_usage");
        }
    }

    #[test]
    fn test_output_size_skips_missing_files() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(output_size_bytes(dir.path()), 0);

        let mut sink = JsonlSink::create(dir.path()).unwrap();
        sink.write_chunk(&sample_chunk()).unwrap();
        sink.finish().unwrap();
        assert!(output_size_bytes(dir.path()) > 0);
    }
}
