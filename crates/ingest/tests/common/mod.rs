//! Common test utilities for pipeline integration tests.
//!
//! # Invariants
//! - Test services use wide-open rate windows: these tests exercise the
//!   orchestrator, not the limiter (which has its own unit tests).
//! - Every mocked match payload names its participants explicitly, because
//!   the pipeline discards payloads that do not mention the target player.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use secrecy::SecretString;
use serde_json::{Value, json};

use matchfeed_client::MatchApiClient;
use matchfeed_config::{IngestConfig, RateLimitConfig, RateWindowRule};
use matchfeed_ingest::{IngestJob, IngestService};

// Re-export commonly used types for test convenience
#[allow(unused_imports)]
pub use matchfeed_client::testing::load_fixture;
#[allow(unused_imports)]
pub use wiremock::{Mock, MockServer, ResponseTemplate};

/// Window shapes wide enough that no test request is ever throttled.
pub fn wide_open_limits() -> RateLimitConfig {
    RateLimitConfig {
        list_ids: vec![RateWindowRule::new(100_000, 1)],
        get_match_per_key: vec![RateWindowRule::new(100_000, 1)],
        get_timeline: vec![RateWindowRule::new(100_000, 1)],
    }
}

/// Build a service against a mock server, persisting under `data_dir`.
#[allow(dead_code)]
pub fn test_service(base_url: &str, data_dir: &Path) -> IngestService {
    let client = MatchApiClient::builder()
        .base_url(base_url.to_string())
        .api_keys(vec![
            SecretString::new("key-0".to_string().into()),
            SecretString::new("key-1".to_string().into()),
        ])
        .rate_limits(wide_open_limits())
        .build()
        .expect("test client builds");

    let config = IngestConfig {
        data_dir: data_dir.to_path_buf(),
        id_page_size: 100,
        batch_size: 20,
        max_concurrent_fetches: 8,
        freshness: Duration::from_secs(300),
    };

    IngestService::new(Arc::new(client), config)
}

/// A match payload naming `player_id` among its participants.
#[allow(dead_code)]
pub fn match_payload(player_id: &str, match_id: &str) -> Value {
    json!({
        "metadata": {
            "match_id": match_id,
            "participants": [player_id, "PLAYER_BRAVO", "PLAYER_CHARLIE"]
        },
        "info": { "category": "ranked", "duration_secs": 1500 }
    })
}

/// A timeline payload naming `player_id` among its participants.
#[allow(dead_code)]
pub fn timeline_payload(player_id: &str, match_id: &str) -> Value {
    json!({
        "metadata": {
            "match_id": match_id,
            "participants": [player_id, "PLAYER_BRAVO"]
        },
        "info": { "frame_interval_ms": 60000, "frames": [] }
    })
}

/// Sequential match ids `M_0000..M_<count>`.
#[allow(dead_code)]
pub fn match_ids(count: usize) -> Vec<String> {
    (0..count).map(|i| format!("M_{i:04}")).collect()
}

/// Count received requests whose path starts with `prefix`.
#[allow(dead_code)]
pub async fn requests_with_prefix(server: &MockServer, prefix: &str) -> usize {
    server
        .received_requests()
        .await
        .expect("request recording enabled")
        .iter()
        .filter(|request| request.url.path().starts_with(prefix))
        .count()
}

/// Poll until the background enrichment phase reaches a terminal state.
#[allow(dead_code)]
pub async fn wait_for_enrichment(job: &IngestJob, timeout: Duration) {
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if job.snapshot().enrichment.is_terminal() {
            return;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "enrichment did not finish within {timeout:?}"
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
