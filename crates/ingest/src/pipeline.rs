//! The fetch pipeline orchestrator.
//!
//! # What this module handles:
//! - Request coalescing and freshness-cached job reuse per player
//! - Phase 1: serial per-category match-id discovery
//! - Phase 2: batched, semaphore-bounded match fetches with skip-on-failure
//! - Phase 3: detached background timeline enrichment
//!
//! # What this module does NOT handle:
//! - Quota and credential handling (inside [`MatchApiClient`])
//! - Artifact layout and merge rules (inside [`crate::persist`])
//!
//! # Invariants
//! - A job for a player is only replaced once it is terminal and stale.
//! - Individual record failures never fail a job; only zero usable data
//!   does.
//! - The fetch semaphore permit spans exactly one record fetch, so one slow
//!   id never starves a batch.

use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use futures::future::join_all;
use serde_json::Value;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use matchfeed_client::{Fetch, MatchApiClient};
use matchfeed_config::IngestConfig;

use crate::job::{EnrichmentStatus, IngestJob, JobStatus};
use crate::persist::{ArtifactStore, StoreOutcome};
use crate::records::{MatchCategory, payload_mentions_player};

/// Metric name for per-record fetch failures (skipped, not fatal).
pub const METRIC_FETCH_FAILURES: &str = "matchfeed_ingest_fetch_failures_total";

/// Metric name for finished jobs, labeled by outcome.
pub const METRIC_JOBS_TOTAL: &str = "matchfeed_ingest_jobs_total";

/// Entry point for downstream consumers: starts, coalesces, and tracks
/// ingestion jobs.
#[derive(Debug, Clone)]
pub struct IngestService {
    inner: Arc<ServiceInner>,
}

#[derive(Debug)]
struct ServiceInner {
    client: Arc<MatchApiClient>,
    store: ArtifactStore,
    config: IngestConfig,
    jobs: Mutex<HashMap<String, Arc<IngestJob>>>,
    fetch_permits: Arc<Semaphore>,
}

impl IngestService {
    /// Build a service around a configured client. Constructed once per
    /// process; jobs and limiter state live for its lifetime.
    pub fn new(client: Arc<MatchApiClient>, config: IngestConfig) -> Self {
        let fetch_permits = Arc::new(Semaphore::new(config.max_concurrent_fetches.max(1)));
        let store = ArtifactStore::new(config.data_dir.clone());
        Self {
            inner: Arc::new(ServiceInner {
                client,
                store,
                config,
                jobs: Mutex::new(HashMap::new()),
                fetch_permits,
            }),
        }
    }

    /// Begin ingestion for a player, or reuse existing work.
    ///
    /// Returns the in-flight job unchanged if one exists, and a completed
    /// job as a cache hit while it is still fresh. Otherwise spawns a new
    /// run and returns its handle immediately.
    pub fn ingest(&self, player_id: &str) -> Arc<IngestJob> {
        let mut jobs = self.inner.jobs.lock().unwrap();

        if let Some(job) = jobs.get(player_id) {
            let status = job.snapshot().status;
            if !status.is_terminal() {
                debug!(player_id, "coalescing onto in-flight job");
                return job.clone();
            }
            if status == JobStatus::Completed && job.is_fresh(self.inner.config.freshness) {
                debug!(player_id, "reusing fresh completed job");
                return job.clone();
            }
        }

        let job = Arc::new(IngestJob::new(player_id));
        jobs.insert(player_id.to_string(), job.clone());
        info!(player_id, "starting ingestion job");
        tokio::spawn(run_job(self.inner.clone(), job.clone()));
        job
    }

    /// Look up the current job for a player, if any.
    pub fn job(&self, player_id: &str) -> Option<Arc<IngestJob>> {
        self.inner.jobs.lock().unwrap().get(player_id).cloned()
    }

    /// On-disk artifact directory for a player (meaningful once a job for
    /// that player completed).
    pub fn artifact_dir(&self, player_id: &str) -> PathBuf {
        self.inner.store.player_dir(player_id)
    }

    /// The underlying artifact store, for consumers reading persisted data.
    pub fn store(&self) -> &ArtifactStore {
        &self.inner.store
    }
}

/// Drive one job through discovery, primary fetch, persistence, and the
/// detached enrichment continuation.
async fn run_job(inner: Arc<ServiceInner>, job: Arc<IngestJob>) {
    job.set_status(JobStatus::DiscoveringIds);
    let discovered = discover_ids(&inner, &job).await;

    if discovered.is_empty() {
        warn!(player_id = job.player_id(), "discovery produced no match ids");
        metrics::counter!(METRIC_JOBS_TOTAL, "outcome" => "failed").increment(1);
        job.fail(format!(
            "no match ids discovered for player {} in any category",
            job.player_id()
        ));
        return;
    }

    job.set_discovered(discovered.len());
    job.set_status(JobStatus::FetchingMatches);
    let kept = fetch_matches(&inner, &job, &discovered).await;

    if kept.is_empty() {
        warn!(
            player_id = job.player_id(),
            discovered = discovered.len(),
            "every record fetch failed"
        );
        metrics::counter!(METRIC_JOBS_TOTAL, "outcome" => "failed").increment(1);
        job.fail(format!(
            "all {} record fetches failed for player {}",
            discovered.len(),
            job.player_id()
        ));
        return;
    }

    persist_matches(&inner, &job, &kept).await;

    let records: HashMap<String, Value> = kept
        .iter()
        .map(|(_, match_id, payload)| (match_id.clone(), payload.clone()))
        .collect();
    let snapshot = job.snapshot();
    info!(
        player_id = job.player_id(),
        discovered = discovered.len(),
        fetched = records.len(),
        failed = snapshot.failed,
        not_found = snapshot.not_found,
        "primary phase complete"
    );
    metrics::counter!(METRIC_JOBS_TOTAL, "outcome" => "completed").increment(1);
    job.complete(records);

    // Detached continuation: nobody awaits it, consumers observe it through
    // the job's enrichment field and the timeline artifact.
    let match_ids: Vec<String> = kept
        .iter()
        .map(|(_, match_id, _)| match_id.clone())
        .collect();
    tokio::spawn(enrich_timelines(inner, job, match_ids));
}

/// Phase 1: page through every category serially, accumulating ids until a
/// short or empty page ends that category's history.
async fn discover_ids(
    inner: &Arc<ServiceInner>,
    job: &Arc<IngestJob>,
) -> Vec<(MatchCategory, String)> {
    let page_size = inner.config.id_page_size.max(1);
    let mut discovered = Vec::new();

    for category in MatchCategory::ALL {
        let mut start = 0usize;
        loop {
            let page = match inner
                .client
                .list_match_ids(job.player_id(), category.as_str(), start, page_size)
                .await
            {
                Ok(page) => page,
                Err(e) => {
                    warn!(
                        player_id = job.player_id(),
                        category = category.as_str(),
                        error = %e,
                        "match id discovery failed for category, skipping it"
                    );
                    break;
                }
            };

            let fetched = page.len();
            discovered.extend(page.into_iter().map(|id| (category, id)));
            debug!(
                player_id = job.player_id(),
                category = category.as_str(),
                start,
                fetched,
                "discovered id page"
            );

            if fetched < page_size {
                break;
            }
            start += fetched;
        }
    }

    discovered
}

/// Phase 2: fetch match payloads in batches; concurrency inside a batch is
/// bounded by the global semaphore. Failures and identity mismatches are
/// counted and skipped.
async fn fetch_matches(
    inner: &Arc<ServiceInner>,
    job: &Arc<IngestJob>,
    discovered: &[(MatchCategory, String)],
) -> Vec<(MatchCategory, String, Value)> {
    let total = discovered.len();
    let mut kept = Vec::new();
    let mut resolved = 0usize;

    for batch in discovered.chunks(inner.config.batch_size.max(1)) {
        let fetches = batch.iter().map(|(category, match_id)| {
            let inner = inner.clone();
            let job = job.clone();
            let category = *category;
            let match_id = match_id.clone();
            async move {
                let _permit = inner
                    .fetch_permits
                    .clone()
                    .acquire_owned()
                    .await
                    .expect("fetch semaphore never closes");

                match inner.client.get_match(&match_id).await {
                    Ok(Fetch::Found(payload)) => {
                        if payload_mentions_player(&payload, job.player_id()) {
                            job.count_fetched();
                            Some((category, match_id, payload))
                        } else {
                            warn!(
                                player_id = job.player_id(),
                                match_id = %match_id,
                                "payload does not mention target player, discarding"
                            );
                            metrics::counter!(METRIC_FETCH_FAILURES, "reason" => "identity_mismatch")
                                .increment(1);
                            job.count_failure();
                            None
                        }
                    }
                    Ok(Fetch::NotFound) => {
                        debug!(match_id = %match_id, "match id not found upstream");
                        job.count_not_found();
                        None
                    }
                    Err(e) => {
                        warn!(match_id = %match_id, error = %e, "match fetch failed, skipping");
                        metrics::counter!(METRIC_FETCH_FAILURES, "reason" => "fetch_error")
                            .increment(1);
                        job.count_failure();
                        None
                    }
                }
            }
        });

        let results = join_all(fetches).await;
        resolved += batch.len();
        job.set_progress(resolved as f64 / total as f64);
        kept.extend(results.into_iter().flatten());
    }

    kept
}

/// Persist fetched records grouped per category. Persistence problems are
/// logged, not fatal: the in-memory result is still served.
async fn persist_matches(
    inner: &Arc<ServiceInner>,
    job: &Arc<IngestJob>,
    kept: &[(MatchCategory, String, Value)],
) {
    let mut by_category: HashMap<MatchCategory, BTreeMap<String, Value>> = HashMap::new();
    for (category, match_id, payload) in kept {
        by_category
            .entry(*category)
            .or_default()
            .insert(match_id.clone(), payload.clone());
    }

    for (category, payloads) in by_category {
        let count = payloads.len();
        match inner
            .store
            .store_matches(job.player_id(), category, payloads)
            .await
        {
            Ok(StoreOutcome::Written(written)) => {
                debug!(
                    player_id = job.player_id(),
                    category = category.as_str(),
                    written,
                    "persisted match artifact"
                );
            }
            Ok(StoreOutcome::KeptExisting(existing)) => {
                info!(
                    player_id = job.player_id(),
                    category = category.as_str(),
                    existing,
                    incoming = count,
                    "kept larger existing match artifact"
                );
            }
            Err(e) => {
                warn!(
                    player_id = job.player_id(),
                    category = category.as_str(),
                    error = %e,
                    "failed to persist match artifact"
                );
            }
        }
    }
}

/// Phase 3: fetch timelines for the fetched id set and fold them into the
/// persisted artifacts. Runs detached; the primary job is already complete.
async fn enrich_timelines(inner: Arc<ServiceInner>, job: Arc<IngestJob>, match_ids: Vec<String>) {
    job.set_enrichment(EnrichmentStatus::Running);
    let mut timelines = BTreeMap::new();

    for batch in match_ids.chunks(inner.config.batch_size.max(1)) {
        let fetches = batch.iter().map(|match_id| {
            let inner = inner.clone();
            let job = job.clone();
            let match_id = match_id.clone();
            async move {
                let _permit = inner
                    .fetch_permits
                    .clone()
                    .acquire_owned()
                    .await
                    .expect("fetch semaphore never closes");

                match inner.client.get_timeline(&match_id).await {
                    Ok(Fetch::Found(payload)) => {
                        if payload_mentions_player(&payload, job.player_id()) {
                            Some((match_id, payload))
                        } else {
                            warn!(
                                player_id = job.player_id(),
                                match_id = %match_id,
                                "timeline does not mention target player, discarding"
                            );
                            metrics::counter!(METRIC_FETCH_FAILURES, "reason" => "identity_mismatch")
                                .increment(1);
                            None
                        }
                    }
                    Ok(Fetch::NotFound) => None,
                    Err(e) => {
                        warn!(match_id = %match_id, error = %e, "timeline fetch failed, skipping");
                        metrics::counter!(METRIC_FETCH_FAILURES, "reason" => "fetch_error")
                            .increment(1);
                        None
                    }
                }
            }
        });

        let results = join_all(fetches).await;
        timelines.extend(results.into_iter().flatten());
    }

    let fetched = timelines.len();
    match inner.store.store_timelines(job.player_id(), timelines).await {
        Ok(outcome) => {
            info!(
                player_id = job.player_id(),
                fetched,
                ?outcome,
                "enrichment phase complete"
            );
            job.set_enrichment(EnrichmentStatus::Completed);
        }
        Err(e) => {
            warn!(
                player_id = job.player_id(),
                error = %e,
                "failed to persist timeline artifact"
            );
            job.set_enrichment(EnrichmentStatus::Failed);
        }
    }
}
