//! Ingestion job state.
//!
//! One [`IngestJob`] tracks one ingestion run for one player. The job is
//! mutated only by the pipeline's own worker and background continuation;
//! external callers observe it through snapshots, the blocking
//! [`IngestJob::wait_primary`], and the non-blocking [`IngestJob::records`].
//!
//! # Invariants
//! - Status moves `NotStarted → DiscoveringIds → FetchingMatches →
//!   Completed | Failed`; terminal states never change.
//! - Enrichment is a separate phase field that advances in the background
//!   after the job is already `Completed`; its failure never un-completes
//!   the primary result.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde_json::Value;
use tokio::sync::watch;

use crate::error::IngestError;

/// Primary phase state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    NotStarted,
    DiscoveringIds,
    FetchingMatches,
    Completed,
    Failed,
}

impl JobStatus {
    /// Terminal states never change.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    /// Returns the string label for this status.
    pub const fn as_str(&self) -> &'static str {
        match self {
            JobStatus::NotStarted => "not_started",
            JobStatus::DiscoveringIds => "discovering_ids",
            JobStatus::FetchingMatches => "fetching_matches",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }
}

/// Background enrichment phase state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnrichmentStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl EnrichmentStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, EnrichmentStatus::Completed | EnrichmentStatus::Failed)
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            EnrichmentStatus::Pending => "pending",
            EnrichmentStatus::Running => "running",
            EnrichmentStatus::Completed => "completed",
            EnrichmentStatus::Failed => "failed",
        }
    }
}

/// Point-in-time view of a job, safe to hand to external callers.
#[derive(Debug, Clone)]
pub struct JobSnapshot {
    pub status: JobStatus,
    /// Fraction of discovered ids whose fetch has resolved, in `0.0..=1.0`.
    pub progress: f64,
    pub error: Option<String>,
    pub discovered: usize,
    pub fetched: usize,
    pub failed: usize,
    pub not_found: usize,
    pub enrichment: EnrichmentStatus,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug)]
struct JobInner {
    status: JobStatus,
    progress: f64,
    error: Option<String>,
    discovered: usize,
    fetched: usize,
    failed: usize,
    not_found: usize,
    enrichment: EnrichmentStatus,
    completed_at: Option<DateTime<Utc>>,
    records: HashMap<String, Value>,
}

/// One ingestion run for one player.
#[derive(Debug)]
pub struct IngestJob {
    player_id: String,
    started_at: DateTime<Utc>,
    inner: Mutex<JobInner>,
    status_tx: watch::Sender<JobStatus>,
}

impl IngestJob {
    pub(crate) fn new(player_id: &str) -> Self {
        let (status_tx, _) = watch::channel(JobStatus::NotStarted);
        Self {
            player_id: player_id.to_string(),
            started_at: Utc::now(),
            inner: Mutex::new(JobInner {
                status: JobStatus::NotStarted,
                progress: 0.0,
                error: None,
                discovered: 0,
                fetched: 0,
                failed: 0,
                not_found: 0,
                enrichment: EnrichmentStatus::Pending,
                completed_at: None,
                records: HashMap::new(),
            }),
            status_tx,
        }
    }

    /// The player this job ingests.
    pub fn player_id(&self) -> &str {
        &self.player_id
    }

    /// Current status, progress, error, and aggregate counters.
    pub fn snapshot(&self) -> JobSnapshot {
        let inner = self.inner.lock().unwrap();
        JobSnapshot {
            status: inner.status,
            progress: inner.progress,
            error: inner.error.clone(),
            discovered: inner.discovered,
            fetched: inner.fetched,
            failed: inner.failed,
            not_found: inner.not_found,
            enrichment: inner.enrichment,
            started_at: self.started_at,
            completed_at: inner.completed_at,
        }
    }

    /// Non-blocking record access: `Some` once the primary phase completed.
    ///
    /// The result is an unordered collection keyed by remote match id.
    pub fn records(&self) -> Option<HashMap<String, Value>> {
        let inner = self.inner.lock().unwrap();
        if inner.status == JobStatus::Completed {
            Some(inner.records.clone())
        } else {
            None
        }
    }

    /// Block until the primary phase reaches a terminal state.
    ///
    /// # Errors
    ///
    /// Returns [`IngestError::WaitTimeout`] if the deadline passes first,
    /// and [`IngestError::JobFailed`] if the job failed at discovery.
    pub async fn wait_primary(&self, timeout: Duration) -> Result<(), IngestError> {
        let mut rx = self.status_tx.subscribe();
        let status = tokio::time::timeout(timeout, rx.wait_for(|s| s.is_terminal()))
            .await
            .map_err(|_| IngestError::WaitTimeout { timeout })?
            .map(|status| *status)
            .map_err(|_| IngestError::JobAbandoned)?;

        match status {
            JobStatus::Failed => Err(IngestError::JobFailed {
                player_id: self.player_id.clone(),
                message: self
                    .snapshot()
                    .error
                    .unwrap_or_else(|| "unknown failure".to_string()),
            }),
            _ => Ok(()),
        }
    }

    /// Whether this completed job is still reusable as a cache.
    pub fn is_fresh(&self, freshness: Duration) -> bool {
        let inner = self.inner.lock().unwrap();
        if inner.status != JobStatus::Completed {
            return false;
        }
        match inner.completed_at {
            Some(completed_at) => {
                let age = Utc::now().signed_duration_since(completed_at);
                age.to_std().map(|age| age < freshness).unwrap_or(true)
            }
            None => false,
        }
    }

    pub(crate) fn set_status(&self, status: JobStatus) {
        {
            let mut inner = self.inner.lock().unwrap();
            inner.status = status;
        }
        self.status_tx.send_replace(status);
    }

    pub(crate) fn set_discovered(&self, discovered: usize) {
        let mut inner = self.inner.lock().unwrap();
        inner.discovered = discovered;
    }

    pub(crate) fn set_progress(&self, progress: f64) {
        let mut inner = self.inner.lock().unwrap();
        inner.progress = progress.clamp(0.0, 1.0);
    }

    pub(crate) fn count_fetched(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.fetched += 1;
    }

    pub(crate) fn count_failure(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.failed += 1;
    }

    pub(crate) fn count_not_found(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.not_found += 1;
    }

    pub(crate) fn set_enrichment(&self, enrichment: EnrichmentStatus) {
        let mut inner = self.inner.lock().unwrap();
        inner.enrichment = enrichment;
    }

    /// Finish the primary phase with the accumulated records and wake
    /// waiters.
    pub(crate) fn complete(&self, records: HashMap<String, Value>) {
        {
            let mut inner = self.inner.lock().unwrap();
            inner.records = records;
            inner.progress = 1.0;
            inner.completed_at = Some(Utc::now());
            inner.status = JobStatus::Completed;
        }
        self.status_tx.send_replace(JobStatus::Completed);
    }

    /// Fail the job terminally and wake waiters.
    pub(crate) fn fail(&self, message: String) {
        {
            let mut inner = self.inner.lock().unwrap();
            inner.error = Some(message);
            inner.completed_at = Some(Utc::now());
            inner.status = JobStatus::Failed;
        }
        self.status_tx.send_replace(JobStatus::Failed);
    }
}
