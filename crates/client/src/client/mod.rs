//! Credentialed match API client.
//!
//! This module provides the primary [`MatchApiClient`]. Every outbound call
//! is classified into an endpoint pattern, admitted through the rate
//! limiter, and issued with a per-call credential header.
//!
//! # Submodules
//! - [`builder`]: Client construction and configuration
//! - `matches`: Typed match API methods
//!
//! # What this module does NOT handle:
//! - Window bookkeeping (delegated to [`crate::limiter::RateLimiter`])
//! - Pipeline orchestration (lives in the `matchfeed-ingest` crate)
//!
//! # Invariants
//! - Credentials are attached per request, never at connection-pool level,
//!   because the key varies per call under rotation.
//! - Every attempt consumes one unit of limiter quota, including retries
//!   after an upstream 429.
//! - HTTP 429 is the only retried status; the retry honors the upstream's
//!   `Retry-After` delay and re-runs the full acquire/select path.

pub mod builder;
mod matches;

use std::time::Duration;

use reqwest::Method;
use secrecy::ExposeSecret;
use serde_json::Value;
use tracing::debug;

use matchfeed_config::constants::DEFAULT_RETRY_AFTER_SECS;

use crate::error::{ClientError, Result};
use crate::keys::KeyRing;
use crate::limiter::RateLimiter;
use crate::metrics::MetricsCollector;

/// Request header carrying the API credential.
pub const API_KEY_HEADER: &str = "X-Api-Key";

/// Outcome of a fetch: absent resources are a routine result, not an error.
#[derive(Debug, Clone, PartialEq)]
pub enum Fetch<T> {
    /// The resource exists; here is its decoded body.
    Found(T),
    /// The upstream answered 404 for this id.
    NotFound,
}

impl<T> Fetch<T> {
    /// Unwrap into `Some(body)` for found resources.
    pub fn found(self) -> Option<T> {
        match self {
            Fetch::Found(body) => Some(body),
            Fetch::NotFound => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Fetch::NotFound)
    }
}

/// Rate-governed, multi-credential client for the upstream match API.
#[derive(Debug)]
pub struct MatchApiClient {
    pub(crate) http: reqwest::Client,
    pub(crate) base_url: String,
    pub(crate) keys: KeyRing,
    pub(crate) limiter: RateLimiter,
    pub(crate) metrics: Option<MetricsCollector>,
}

impl MatchApiClient {
    /// Create a new client builder.
    pub fn builder() -> builder::MatchApiClientBuilder {
        builder::MatchApiClientBuilder::new()
    }

    /// Get the base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Number of configured credentials.
    pub fn key_count(&self) -> usize {
        self.keys.len()
    }

    /// Issue one credentialed request and decode the JSON body.
    ///
    /// Classifies `url`, acquires limiter quota, then selects a credential:
    /// the primary key for identity-bound calls, the granted slot's key for
    /// sharded calls, otherwise round-robin.
    pub(crate) async fn request_json(
        &self,
        method: Method,
        url: String,
        identity_bound: bool,
    ) -> Result<Fetch<Value>> {
        let pattern = self.limiter.classify(&url);

        loop {
            let grant = self.limiter.acquire(pattern).await;
            let key = if identity_bound {
                self.keys.primary()
            } else if let Some(slot) = grant.slot {
                self.keys.slot(slot)
            } else {
                self.keys.next_rotating()
            };

            if let Some(m) = &self.metrics {
                m.record_request(pattern.as_str(), method.as_str());
            }

            let started = std::time::Instant::now();
            let response = match self
                .http
                .request(method.clone(), url.as_str())
                .header(API_KEY_HEADER, key.expose_secret())
                .send()
                .await
            {
                Ok(response) => response,
                Err(e) => {
                    let err = ClientError::from(e);
                    if let Some(m) = &self.metrics {
                        m.record_request_duration(
                            pattern.as_str(),
                            method.as_str(),
                            started.elapsed(),
                            None,
                        );
                        m.record_client_error(pattern.as_str(), method.as_str(), &err);
                    }
                    return Err(err);
                }
            };

            let status = response.status();
            if let Some(m) = &self.metrics {
                m.record_request_duration(
                    pattern.as_str(),
                    method.as_str(),
                    started.elapsed(),
                    Some(status.as_u16()),
                );
            }

            if status.as_u16() == 429 {
                let delay = retry_after(response.headers())
                    .unwrap_or(Duration::from_secs(DEFAULT_RETRY_AFTER_SECS));
                debug!(
                    pattern = pattern.as_str(),
                    delay_secs = delay.as_secs(),
                    "upstream throttled (HTTP 429), honoring Retry-After"
                );
                if let Some(m) = &self.metrics {
                    m.record_upstream_throttle(pattern.as_str());
                }
                tokio::time::sleep(delay).await;
                continue;
            }

            if status.as_u16() == 404 {
                return Ok(Fetch::NotFound);
            }

            if status.is_success() {
                let body = response.json::<Value>().await?;
                return Ok(Fetch::Found(body));
            }

            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "could not read error response body".to_string());
            let err = ClientError::ApiError {
                status: status.as_u16(),
                url: url.clone(),
                message,
            };
            if let Some(m) = &self.metrics {
                m.record_client_error(pattern.as_str(), method.as_str(), &err);
            }
            return Err(err);
        }
    }
}

/// Parse the `Retry-After` header as delta-seconds.
fn retry_after(headers: &reqwest::header::HeaderMap) -> Option<Duration> {
    headers
        .get(reqwest::header::RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::{HeaderMap, HeaderValue, RETRY_AFTER};

    #[test]
    fn test_retry_after_parses_delta_seconds() {
        let mut headers = HeaderMap::new();
        headers.insert(RETRY_AFTER, HeaderValue::from_static("7"));
        assert_eq!(retry_after(&headers), Some(Duration::from_secs(7)));
    }

    #[test]
    fn test_retry_after_missing_or_malformed() {
        let headers = HeaderMap::new();
        assert_eq!(retry_after(&headers), None);

        let mut headers = HeaderMap::new();
        headers.insert(RETRY_AFTER, HeaderValue::from_static("soon"));
        assert_eq!(retry_after(&headers), None);
    }

    #[test]
    fn test_fetch_found_accessor() {
        let fetch = Fetch::Found(1u32);
        assert_eq!(fetch.found(), Some(1));

        let fetch: Fetch<u32> = Fetch::NotFound;
        assert!(fetch.is_not_found());
        assert_eq!(fetch.found(), None);
    }
}
