//! Fetch pipeline orchestrator for the matchfeed ingestion core.
//!
//! Given a player id, the [`IngestService`] discovers that player's match
//! ids across every category, fetches the match payloads in bounded
//! concurrency batches through the rate-governed client, persists them with
//! a never-regress merge, and then enriches them with timelines in a
//! detached background continuation. Callers get an [`IngestJob`] handle
//! immediately and can wait on the primary phase, poll status, or read
//! records once ready.

pub mod error;
pub mod job;
pub mod persist;
mod pipeline;
pub mod records;

pub use error::IngestError;
pub use job::{EnrichmentStatus, IngestJob, JobSnapshot, JobStatus};
pub use persist::{ArtifactStore, MatchArtifact, MatchRecord, StoreOutcome, TimelineArtifact};
pub use pipeline::IngestService;
pub use records::{MatchCategory, payload_mentions_player};
