//! Error taxonomy for the generator pipeline.
//!
//! Every failure names its stage so the CLI can report where a run died:
//! config parse, generation, injection, or persistence. Degenerate cases
//! (no eligible records for an anomaly kind) are logged no-ops, not errors.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MeltError {
    /// Rejected before any generation starts.
    #[error("config parse: {0}")]
    Config(String),

    #[error("generation: {0}")]
    Generation(String),

    #[error("injection: {0}")]
    Injection(String),

    /// I/O failure while writing a chunk or report. Partially written files
    /// are left in place; callers needing atomicity should write to a
    /// temporary location and rename on success.
    #[error("persistence: {path}: {source}")]
    Persistence {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl MeltError {
    pub fn persistence(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Persistence {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, MeltError>;
