//! Common test utilities for client integration tests.
//!
//! # Invariants
//! - Test clients use wide-open rate windows so tests exercise HTTP
//!   behavior, not limiter behavior (the limiter has its own unit tests).

use secrecy::SecretString;

use matchfeed_client::MatchApiClient;
use matchfeed_config::{RateLimitConfig, RateWindowRule};

// Re-export test utilities from matchfeed-client
#[allow(unused_imports)]
pub use matchfeed_client::testing::load_fixture;

// Re-export commonly used types for test convenience
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

/// Build a client against a mock server with `key_count` keys named
/// `key-0`, `key-1`, ...
#[allow(dead_code)]
pub fn test_client(base_url: &str, key_count: usize) -> MatchApiClient {
    let keys = (0..key_count)
        .map(|i| SecretString::new(format!("key-{i}").into()))
        .collect();

    MatchApiClient::builder()
        .base_url(base_url.to_string())
        .api_keys(keys)
        .rate_limits(wide_open_limits())
        .build()
        .expect("test client builds")
}
