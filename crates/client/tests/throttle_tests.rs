//! Upstream throttling (429) recovery tests.
//!
//! # Invariants
//! - A 429 response is retried after exactly the server-provided delay
//! - A 429 without `Retry-After` falls back to the default delay
//! - Every retry is a fresh request attempt (visible to the mock server)
//!
//! # What this does NOT handle
//! - Limiter window behavior (unit-tested in `limiter.rs`)

mod common;

use common::*;
use wiremock::matchers::{method, path};

#[tokio::test]
async fn test_429_retried_after_server_delay() {
    let mock_server = MockServer::start().await;
    let fixture = load_fixture("matches/match_found.json");

    Mock::given(method("GET"))
        .and(path("/match/v1/matches/M_1001"))
        .respond_with(
            ResponseTemplate::new(429)
                .insert_header("Retry-After", "1")
                .set_body_json(serde_json::json!({"status": "rate limit exceeded"})),
        )
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/match/v1/matches/M_1001"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&fixture))
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server.uri(), 1);
    let started = std::time::Instant::now();
    let result = client.get_match("M_1001").await.expect("fetch succeeds");

    assert!(
        started.elapsed() >= std::time::Duration::from_secs(1),
        "retry must honor the Retry-After delay"
    );
    let body = result.found().expect("match found after retry");
    assert_eq!(body["metadata"]["match_id"], "M_1001");

    // The 429 attempt and the successful retry are both real requests.
    let requests = mock_server
        .received_requests()
        .await
        .expect("request recording enabled");
    assert_eq!(requests.len(), 2);
}

#[tokio::test]
async fn test_429_without_retry_after_uses_default_delay() {
    let mock_server = MockServer::start().await;
    let fixture = load_fixture("matches/match_found.json");

    Mock::given(method("GET"))
        .and(path("/match/v1/matches/M_1001"))
        .respond_with(ResponseTemplate::new(429))
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/match/v1/matches/M_1001"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&fixture))
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server.uri(), 1);
    let result = client.get_match("M_1001").await.expect("fetch succeeds");
    assert!(result.found().is_some());
}

#[tokio::test]
async fn test_repeated_429_keeps_retrying() {
    let mock_server = MockServer::start().await;
    let fixture = load_fixture("matches/match_found.json");

    // Two consecutive throttles before success; each one re-enters the full
    // acquire/select path.
    Mock::given(method("GET"))
        .and(path("/match/v1/matches/M_1001"))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "1"))
        .up_to_n_times(2)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/match/v1/matches/M_1001"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&fixture))
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server.uri(), 1);
    let result = client.get_match("M_1001").await.expect("fetch succeeds");
    assert!(result.found().is_some());

    let requests = mock_server
        .received_requests()
        .await
        .expect("request recording enabled");
    assert_eq!(requests.len(), 3);
}
