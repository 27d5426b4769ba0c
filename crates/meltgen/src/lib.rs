//! # meltgen - Synthetic MELT Data Generator
//!
//! Reproducible synthetic observability datasets — metrics, events, logs,
//! and distributed-trace spans — with controlled cross-stream anomaly
//! injection, for exercising anomaly-detection and root-cause-analysis
//! tooling.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────────┐
//! │                             meltgen                                  │
//! │                                                                      │
//! │  EntityPools ──► RecordGenerators ──► MeltDataset (one chunk)        │
//! │  (services,      (metrics, logs,          │                          │
//! │   hosts, envs)    events, trace trees)    ▼                          │
//! │                                      AnomalyInjector                 │
//! │                                      (cross-stream, windowed)        │
//! │                                           │                          │
//! │                                           ▼                          │
//! │   statistics accumulator ◄──── JsonlSink (append-only, per family)   │
//! │            │                                                         │
//! │            ▼                                                         │
//! │   metadata.json / statistics.json                                    │
//! └──────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Key Design Principles
//!
//! 1. **Reproducibility** - every random draw flows through an explicit
//!    `StdRng` seeded from the configured seed (per-chunk sub-seeds are
//!    hashed from seed and chunk index). Same seed, config, size, and
//!    anomaly list → byte-identical output files.
//!
//! 2. **Cross-stream consistency** - one simulated incident leaves matching
//!    fingerprints in metric values, log severities, and span statuses
//!    within the same time window and service/host scope.
//!
//! 3. **Bounded memory** - the chunked orchestrator generates, injects, and
//!    flushes one chunk at a time; only time cursors and running statistics
//!    cross chunk boundaries.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use meltgen::config::{AnomalyConfig, GenerationConfig};
//! use meltgen::generator::MeltGenerator;
//! use meltgen::inject::AnomalyKind;
//!
//! let generator =
//!     MeltGenerator::new(GenerationConfig::default(), AnomalyConfig::default()).unwrap();
//! let data = generator.generate("100MB", &[AnomalyKind::CpuSpike]).unwrap();
//! generator.save(&data, "./output".as_ref(), &[AnomalyKind::CpuSpike]).unwrap();
//! ```

pub mod config;
pub mod detect;
pub mod error;
pub mod generator;
pub mod generators;
pub mod inject;
pub mod model;
pub mod pools;
pub mod sink;
pub mod stream;
pub mod validate;

// Re-exports for convenience
pub use config::{AnomalyConfig, GenerationConfig, Settings, parse_size};
pub use error::{MeltError, Result};
pub use generator::MeltGenerator;
pub use inject::{AnomalyInjector, AnomalyKind, parse_kinds};
pub use model::{
    EventRecord, EventSeverity, Family, LogLevel, LogRecord, MeltDataset, MetricPoint, SpanStatus,
    TraceSpan,
};
pub use sink::{ChunkSink, JsonlSink};
pub use stream::{ChunkedGenerator, GenerationStats, RecordBudget};
pub use validate::validate_directory;
