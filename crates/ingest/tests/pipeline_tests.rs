//! End-to-end pipeline tests against a mocked upstream.
//!
//! # Invariants
//! - Discovery pages serially per category and stops at the first short page
//! - Per-record failures are skipped, counted, and never fail the job
//! - Identity-mismatched payloads are discarded before persistence
//! - Coalescing returns existing jobs without new network calls
//!
//! # What this does NOT handle
//! - Rate limiter behavior (unit-tested in the client crate)
//! - Artifact merge details (unit-tested in `persist.rs`)

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::*;
use matchfeed_ingest::{EnrichmentStatus, IngestError, JobStatus, MatchCategory};
use wiremock::matchers::{method, path, path_regex, query_param};

const PLAYER: &str = "PLAYER_ALPHA";
const WAIT: Duration = Duration::from_secs(30);

/// Mount one discovery page for a category.
async fn mount_id_page(server: &MockServer, category: &str, start: usize, ids: &[String]) {
    Mock::given(method("GET"))
        .and(path(format!("/match/v1/ids/by-player/{PLAYER}")))
        .and(query_param("category", category))
        .and(query_param("start", start.to_string()))
        .respond_with(ResponseTemplate::new(200).set_body_json(ids))
        .mount(server)
        .await;
}

/// Mount empty discovery pages for every category except `active`.
async fn mount_other_categories_empty(server: &MockServer, active: &str) {
    for category in ["ranked", "casual", "arena"] {
        if category != active {
            Mock::given(method("GET"))
                .and(path(format!("/match/v1/ids/by-player/{PLAYER}")))
                .and(query_param("category", category))
                .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
                .mount(server)
                .await;
        }
    }
}

/// Mount a match payload mentioning the target player for every match id.
async fn mount_all_matches_ok(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path_regex(r"^/match/v1/matches/.*$"))
        .respond_with(ResponseTemplate::new(200).set_body_json(match_payload(PLAYER, "M_ANY")))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_discovery_stops_after_short_page() {
    let server = MockServer::start().await;
    let data_dir = tempfile::tempdir().unwrap();

    let ids = match_ids(237);
    mount_id_page(&server, "ranked", 0, &ids[0..100]).await;
    mount_id_page(&server, "ranked", 100, &ids[100..200]).await;
    mount_id_page(&server, "ranked", 200, &ids[200..237]).await;
    mount_other_categories_empty(&server, "ranked").await;
    mount_all_matches_ok(&server).await;

    let service = test_service(&server.uri(), data_dir.path());
    let job = service.ingest(PLAYER);
    job.wait_primary(WAIT).await.expect("primary phase");

    let snapshot = job.snapshot();
    assert_eq!(snapshot.status, JobStatus::Completed);
    assert_eq!(snapshot.discovered, 237);
    assert_eq!(snapshot.progress, 1.0);

    let records = job.records().expect("records ready");
    assert_eq!(records.len(), 237);

    // Three ranked pages plus one empty page per other category; the short
    // page (37 < 100) must end paging with no extra request.
    let id_requests = requests_with_prefix(&server, "/match/v1/ids/").await;
    assert_eq!(id_requests, 5);
}

#[tokio::test]
async fn test_partial_batch_failures_are_skipped() {
    let server = MockServer::start().await;
    let data_dir = tempfile::tempdir().unwrap();

    let ids = match_ids(50);
    mount_id_page(&server, "ranked", 0, &ids).await;
    mount_other_categories_empty(&server, "ranked").await;

    let failing = ["M_0003", "M_0011", "M_0024", "M_0037", "M_0049"];
    for id in failing {
        Mock::given(method("GET"))
            .and(path(format!("/match/v1/matches/{id}")))
            .respond_with(ResponseTemplate::new(500).set_body_string("upstream exploded"))
            .mount(&server)
            .await;
    }
    mount_all_matches_ok(&server).await;

    let service = test_service(&server.uri(), data_dir.path());
    let job = service.ingest(PLAYER);
    job.wait_primary(WAIT).await.expect("primary phase");

    let snapshot = job.snapshot();
    assert_eq!(snapshot.status, JobStatus::Completed);
    assert_eq!(snapshot.fetched, 45);
    assert_eq!(snapshot.failed, 5);

    let records = job.records().expect("records ready");
    assert_eq!(records.len(), 45);
    for id in failing {
        assert!(!records.contains_key(id));
    }

    let artifact = service
        .store()
        .load_matches(PLAYER, MatchCategory::Ranked)
        .await
        .unwrap()
        .expect("artifact persisted");
    assert_eq!(artifact.records.len(), 45);
}

#[tokio::test]
async fn test_identity_mismatch_discarded() {
    let server = MockServer::start().await;
    let data_dir = tempfile::tempdir().unwrap();

    let ids = match_ids(3);
    mount_id_page(&server, "ranked", 0, &ids).await;
    mount_other_categories_empty(&server, "ranked").await;

    // M_0001 resolves, but its payload belongs to a different player.
    Mock::given(method("GET"))
        .and(path("/match/v1/matches/M_0001"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(load_fixture("matches/match_wrong_player.json")),
        )
        .mount(&server)
        .await;
    mount_all_matches_ok(&server).await;

    let service = test_service(&server.uri(), data_dir.path());
    let job = service.ingest(PLAYER);
    job.wait_primary(WAIT).await.expect("primary phase");

    let snapshot = job.snapshot();
    assert_eq!(snapshot.status, JobStatus::Completed);
    assert_eq!(snapshot.fetched, 2);
    assert_eq!(snapshot.failed, 1);

    let artifact = service
        .store()
        .load_matches(PLAYER, MatchCategory::Ranked)
        .await
        .unwrap()
        .expect("artifact persisted");
    assert_eq!(artifact.records.len(), 2);
    assert!(
        !artifact.records.contains_key("M_0001"),
        "a payload for another player must never be persisted under this player"
    );
}

#[tokio::test]
async fn test_empty_discovery_fails_job() {
    let server = MockServer::start().await;
    let data_dir = tempfile::tempdir().unwrap();

    mount_other_categories_empty(&server, "none").await;

    let service = test_service(&server.uri(), data_dir.path());
    let job = service.ingest(PLAYER);
    let err = job.wait_primary(WAIT).await.unwrap_err();

    match err {
        IngestError::JobFailed { player_id, message } => {
            assert_eq!(player_id, PLAYER);
            assert!(message.contains("no match ids"));
        }
        other => panic!("expected JobFailed, got {other:?}"),
    }
    assert_eq!(job.snapshot().status, JobStatus::Failed);
    assert!(job.records().is_none());
}

#[tokio::test]
async fn test_coalescing_reuses_jobs_without_network_calls() {
    let server = MockServer::start().await;
    let data_dir = tempfile::tempdir().unwrap();

    let ids = match_ids(2);
    mount_id_page(&server, "ranked", 0, &ids).await;
    mount_other_categories_empty(&server, "ranked").await;
    mount_all_matches_ok(&server).await;
    Mock::given(method("GET"))
        .and(path_regex(r"^/match/v1/timelines/.*$"))
        .respond_with(ResponseTemplate::new(200).set_body_json(timeline_payload(PLAYER, "M_ANY")))
        .mount(&server)
        .await;

    let service = test_service(&server.uri(), data_dir.path());
    let job = service.ingest(PLAYER);
    let coalesced = service.ingest(PLAYER);
    assert!(
        Arc::ptr_eq(&job, &coalesced),
        "a second request while in flight must return the same job"
    );

    job.wait_primary(WAIT).await.expect("primary phase");
    wait_for_enrichment(&job, WAIT).await;

    let before = server
        .received_requests()
        .await
        .expect("request recording enabled")
        .len();

    let cached = service.ingest(PLAYER);
    assert!(
        Arc::ptr_eq(&job, &cached),
        "a fresh completed job must be reused as a cache hit"
    );
    tokio::time::sleep(Duration::from_millis(100)).await;

    let after = server
        .received_requests()
        .await
        .expect("request recording enabled")
        .len();
    assert_eq!(before, after, "cache hits must not issue network calls");
}

#[tokio::test]
async fn test_enrichment_writes_timelines_and_links_matches() {
    let server = MockServer::start().await;
    let data_dir = tempfile::tempdir().unwrap();

    let ids = match_ids(3);
    mount_id_page(&server, "ranked", 0, &ids).await;
    mount_other_categories_empty(&server, "ranked").await;
    mount_all_matches_ok(&server).await;
    Mock::given(method("GET"))
        .and(path_regex(r"^/match/v1/timelines/.*$"))
        .respond_with(ResponseTemplate::new(200).set_body_json(timeline_payload(PLAYER, "M_ANY")))
        .mount(&server)
        .await;

    let service = test_service(&server.uri(), data_dir.path());
    let job = service.ingest(PLAYER);

    // The primary phase unblocks before enrichment has run.
    job.wait_primary(WAIT).await.expect("primary phase");
    assert_eq!(job.snapshot().status, JobStatus::Completed);

    wait_for_enrichment(&job, WAIT).await;
    assert_eq!(job.snapshot().enrichment, EnrichmentStatus::Completed);

    let timelines = service
        .store()
        .load_timelines(PLAYER)
        .await
        .unwrap()
        .expect("timeline artifact persisted");
    assert_eq!(timelines.records.len(), 3);

    let matches = service
        .store()
        .load_matches(PLAYER, MatchCategory::Ranked)
        .await
        .unwrap()
        .expect("match artifact persisted");
    assert!(matches.records.values().all(|record| record.timeline_linked));

    let dir = service.artifact_dir(PLAYER);
    assert!(dir.ends_with(format!("players/{PLAYER}")));
    assert!(dir.join("timelines.json").exists());
}
