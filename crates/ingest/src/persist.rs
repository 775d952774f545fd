//! Artifact persistence with never-regress merging.
//!
//! Artifacts live under `<root>/players/<player_id>/`: one
//! `<category>/matches.json` per category plus one `timelines.json`. Writes
//! are temp-file-plus-rename, and every read-compare-write sequence runs
//! under a per-player async mutex so two concurrent completions for the
//! same player cannot interleave. Cross-player operations never contend.
//!
//! # Invariants
//! - Never-regress: an artifact is only replaced by one with at least as
//!   many records. The comparison is by record count only; equal-count
//!   re-fetches with changed content do overwrite, smaller ones never do.
//! - Callers are responsible for identity-checking payloads before handing
//!   them to the store.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::error::IngestError;
use crate::records::MatchCategory;

/// One persisted match record plus pipeline-derived fields.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MatchRecord {
    /// Set by the enrichment phase once a timeline for this match landed.
    pub timeline_linked: bool,
    /// The opaque upstream payload.
    pub payload: Value,
}

/// Persisted match set for one player+category.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchArtifact {
    pub player_id: String,
    pub category: String,
    pub updated_at: DateTime<Utc>,
    pub records: BTreeMap<String, MatchRecord>,
}

/// Persisted timeline set for one player.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimelineArtifact {
    pub player_id: String,
    pub updated_at: DateTime<Utc>,
    pub records: BTreeMap<String, Value>,
}

/// What a store call did, so callers can log regressions it refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOutcome {
    /// The artifact was (re)written with this many records.
    Written(usize),
    /// The existing artifact had more records; the write was skipped.
    KeptExisting(usize),
}

/// On-disk artifact store with per-player write serialization.
#[derive(Debug)]
pub struct ArtifactStore {
    root: PathBuf,
    locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl ArtifactStore {
    pub fn new(root: PathBuf) -> Self {
        Self {
            root,
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Artifact directory for one player.
    pub fn player_dir(&self, player_id: &str) -> PathBuf {
        self.root.join("players").join(player_id)
    }

    fn matches_path(&self, player_id: &str, category: MatchCategory) -> PathBuf {
        self.player_dir(player_id)
            .join(category.as_str())
            .join("matches.json")
    }

    fn timelines_path(&self, player_id: &str) -> PathBuf {
        self.player_dir(player_id).join("timelines.json")
    }

    fn player_lock(&self, player_id: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.locks.lock().unwrap();
        locks.entry(player_id.to_string()).or_default().clone()
    }

    /// Persist identity-checked match payloads for one player+category,
    /// refusing to shrink an existing artifact.
    pub async fn store_matches(
        &self,
        player_id: &str,
        category: MatchCategory,
        payloads: BTreeMap<String, Value>,
    ) -> Result<StoreOutcome, IngestError> {
        let lock = self.player_lock(player_id);
        let _guard = lock.lock().await;

        let path = self.matches_path(player_id, category);
        let existing: Option<MatchArtifact> = read_json(&path)?;

        if let Some(existing) = &existing
            && existing.records.len() > payloads.len()
        {
            debug!(
                player_id,
                category = category.as_str(),
                existing = existing.records.len(),
                incoming = payloads.len(),
                "refusing to shrink match artifact"
            );
            return Ok(StoreOutcome::KeptExisting(existing.records.len()));
        }

        // Carry timeline links forward for records that already existed.
        let records: BTreeMap<String, MatchRecord> = payloads
            .into_iter()
            .map(|(match_id, payload)| {
                let timeline_linked = existing
                    .as_ref()
                    .and_then(|artifact| artifact.records.get(&match_id))
                    .map(|record| record.timeline_linked)
                    .unwrap_or(false);
                (
                    match_id,
                    MatchRecord {
                        timeline_linked,
                        payload,
                    },
                )
            })
            .collect();

        let count = records.len();
        let artifact = MatchArtifact {
            player_id: player_id.to_string(),
            category: category.as_str().to_string(),
            updated_at: Utc::now(),
            records,
        };
        write_json_atomic(&path, &artifact)?;
        Ok(StoreOutcome::Written(count))
    }

    /// Persist identity-checked timelines for one player and mark the
    /// matching records in every category artifact as linked.
    pub async fn store_timelines(
        &self,
        player_id: &str,
        timelines: BTreeMap<String, Value>,
    ) -> Result<StoreOutcome, IngestError> {
        let lock = self.player_lock(player_id);
        let _guard = lock.lock().await;

        let path = self.timelines_path(player_id);
        let existing: Option<TimelineArtifact> = read_json(&path)?;

        if let Some(existing) = &existing
            && existing.records.len() > timelines.len()
        {
            debug!(
                player_id,
                existing = existing.records.len(),
                incoming = timelines.len(),
                "refusing to shrink timeline artifact"
            );
            return Ok(StoreOutcome::KeptExisting(existing.records.len()));
        }

        let count = timelines.len();
        let artifact = TimelineArtifact {
            player_id: player_id.to_string(),
            updated_at: Utc::now(),
            records: timelines,
        };
        write_json_atomic(&path, &artifact)?;

        // Update derived fields on the already-persisted match records.
        for category in MatchCategory::ALL {
            let matches_path = self.matches_path(player_id, category);
            let Some(mut matches) = read_json::<MatchArtifact>(&matches_path)? else {
                continue;
            };
            let mut changed = false;
            for (match_id, record) in matches.records.iter_mut() {
                if !record.timeline_linked && artifact.records.contains_key(match_id) {
                    record.timeline_linked = true;
                    changed = true;
                }
            }
            if changed {
                matches.updated_at = Utc::now();
                write_json_atomic(&matches_path, &matches)?;
            }
        }

        Ok(StoreOutcome::Written(count))
    }

    /// Read the persisted match artifact for one player+category.
    pub async fn load_matches(
        &self,
        player_id: &str,
        category: MatchCategory,
    ) -> Result<Option<MatchArtifact>, IngestError> {
        let lock = self.player_lock(player_id);
        let _guard = lock.lock().await;
        read_json(&self.matches_path(player_id, category))
    }

    /// Read the persisted timeline artifact for one player.
    pub async fn load_timelines(
        &self,
        player_id: &str,
    ) -> Result<Option<TimelineArtifact>, IngestError> {
        let lock = self.player_lock(player_id);
        let _guard = lock.lock().await;
        read_json(&self.timelines_path(player_id))
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Option<T>, IngestError> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(Some(serde_json::from_str(&content)?)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(IngestError::ArtifactIo {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}

fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<(), IngestError> {
    let io_err = |source: std::io::Error| IngestError::ArtifactIo {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(io_err)?;
    }
    let body = serde_json::to_vec_pretty(value)?;
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, body).map_err(io_err)?;
    std::fs::rename(&tmp, path).map_err(io_err)?;
    Ok(())
}
