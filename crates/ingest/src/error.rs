//! Error types for the fetch pipeline.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Errors surfaced by the ingestion pipeline.
///
/// Per-record fetch failures never appear here: they are absorbed into the
/// job's aggregate counters. The only fatal, caller-visible failure is a
/// discovery phase that produced no usable data.
#[derive(Error, Debug)]
pub enum IngestError {
    /// Discovery found no match ids (or no record fetch succeeded).
    #[error("Ingestion failed for player {player_id}: {message}")]
    JobFailed { player_id: String, message: String },

    /// The primary phase did not finish within the caller's deadline.
    #[error("Timed out after {timeout:?} waiting for the primary phase")]
    WaitTimeout { timeout: Duration },

    /// The job's worker task disappeared without reaching a terminal state.
    #[error("Ingestion job was abandoned before completing")]
    JobAbandoned,

    /// Artifact file IO failed.
    #[error("Artifact IO error at {path}: {source}")]
    ArtifactIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Artifact (de)serialization failed.
    #[error("Artifact serialization error: {0}")]
    ArtifactFormat(#[from] serde_json::Error),
}
