//! Configuration types for the matchfeed ingestion core.

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_FETCH_BATCH_SIZE, DEFAULT_ID_PAGE_SIZE, DEFAULT_JOB_FRESHNESS_SECS,
    DEFAULT_MAX_CONCURRENT_FETCHES, DEFAULT_TIMEOUT_SECS, GET_MATCH_MAX, GET_MATCH_WINDOW_SECS,
    GET_TIMELINE_LONG_MAX, GET_TIMELINE_LONG_WINDOW_SECS, GET_TIMELINE_SHORT_MAX,
    GET_TIMELINE_SHORT_WINDOW_SECS, LIST_IDS_LONG_MAX, LIST_IDS_LONG_WINDOW_SECS,
    LIST_IDS_SHORT_MAX, LIST_IDS_SHORT_WINDOW_SECS,
};

/// Module for serializing a list of `SecretString` values as plain strings.
mod secret_strings {
    use secrecy::{ExposeSecret, SecretString};
    use serde::ser::SerializeSeq;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(secrets: &[SecretString], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut seq = serializer.serialize_seq(Some(secrets.len()))?;
        for secret in secrets {
            seq.serialize_element(secret.expose_secret())?;
        }
        seq.end()
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<SecretString>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Vec::<String>::deserialize(deserializer)?;
        Ok(raw.into_iter().map(|s| SecretString::new(s.into())).collect())
    }
}

/// Module for serializing Duration as seconds (integer).
mod duration_seconds {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.as_secs().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

/// One sliding-window rule: at most `max_requests` per `window_secs`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct RateWindowRule {
    pub max_requests: u32,
    pub window_secs: u64,
}

impl RateWindowRule {
    pub const fn new(max_requests: u32, window_secs: u64) -> Self {
        Self {
            max_requests,
            window_secs,
        }
    }

    /// Window length as a `Duration`.
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }
}

/// Window rules attached to one endpoint pattern. All rules must admit a
/// request for it to proceed.
pub type PatternLimits = Vec<RateWindowRule>;

/// Rate-limit window shapes per endpoint pattern.
///
/// `get_match_per_key` applies to each credential slot independently; the
/// other shapes are shared across all credentials.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    pub list_ids: PatternLimits,
    pub get_match_per_key: PatternLimits,
    pub get_timeline: PatternLimits,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            list_ids: vec![
                RateWindowRule::new(LIST_IDS_SHORT_MAX, LIST_IDS_SHORT_WINDOW_SECS),
                RateWindowRule::new(LIST_IDS_LONG_MAX, LIST_IDS_LONG_WINDOW_SECS),
            ],
            get_match_per_key: vec![RateWindowRule::new(GET_MATCH_MAX, GET_MATCH_WINDOW_SECS)],
            get_timeline: vec![
                RateWindowRule::new(GET_TIMELINE_SHORT_MAX, GET_TIMELINE_SHORT_WINDOW_SECS),
                RateWindowRule::new(GET_TIMELINE_LONG_MAX, GET_TIMELINE_LONG_WINDOW_SECS),
            ],
        }
    }
}

/// Upstream connection configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the upstream match API (e.g. https://api.example.com).
    pub base_url: String,
    /// API keys. The first key is the primary (identity-bound) credential;
    /// all keys serve rotatable calls.
    #[serde(with = "secret_strings")]
    pub api_keys: Vec<SecretString>,
    /// Request timeout (serialized as seconds).
    #[serde(with = "duration_seconds")]
    pub timeout: Duration,
    /// Rate-limit window shapes.
    #[serde(default)]
    pub rate_limits: RateLimitConfig,
}

/// Fetch pipeline tunables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    /// Root directory for persisted match/timeline artifacts.
    pub data_dir: PathBuf,
    /// Page size for match-id discovery requests.
    pub id_page_size: usize,
    /// Number of record fetches grouped into one batch.
    pub batch_size: usize,
    /// Global cap on simultaneously outstanding record fetches.
    pub max_concurrent_fetches: usize,
    /// How long a completed job stays reusable as a cache (serialized as seconds).
    #[serde(with = "duration_seconds")]
    pub freshness: Duration,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            id_page_size: DEFAULT_ID_PAGE_SIZE,
            batch_size: DEFAULT_FETCH_BATCH_SIZE,
            max_concurrent_fetches: DEFAULT_MAX_CONCURRENT_FETCHES,
            freshness: Duration::from_secs(DEFAULT_JOB_FRESHNESS_SECS),
        }
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Upstream connection settings.
    pub api: ApiConfig,
    /// Pipeline settings.
    #[serde(default)]
    pub ingest: IngestConfig,
}

impl Config {
    /// Build a configuration with default tunables for the given upstream.
    ///
    /// Useful in tests and thin callers; production setups go through
    /// [`crate::ConfigLoader`].
    pub fn new(base_url: String, api_keys: Vec<SecretString>) -> Self {
        Self {
            api: ApiConfig {
                base_url,
                api_keys,
                timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
                rate_limits: RateLimitConfig::default(),
            },
            ingest: IngestConfig::default(),
        }
    }
}

/// Default artifact root: the platform data directory, falling back to a
/// relative path when no home directory is available (e.g. containers).
pub fn default_data_dir() -> PathBuf {
    directories::ProjectDirs::from("io", "matchfeed", "matchfeed")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("matchfeed-data"))
}
