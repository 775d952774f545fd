//! Client builder for constructing [`MatchApiClient`] instances.
//!
//! This module is responsible for:
//! - Providing a fluent builder API for client configuration
//! - Validating required configuration (base_url, api_keys)
//! - Normalizing the base URL (removing trailing slashes)
//! - Configuring the underlying HTTP client (timeout, redirects)
//!
//! # What this module does NOT handle:
//! - Actual API calls (handled by [`MatchApiClient`] methods)
//! - Quota bookkeeping (handled by [`crate::limiter::RateLimiter`])
//!
//! # Invariants
//! - `base_url` and at least one API key must be provided before `build()`
//! - The base URL is always normalized to have no trailing slashes
//! - The limiter is sized to the number of keys, so sharded quota and
//!   credential rotation stay aligned

use std::time::Duration;

use secrecy::SecretString;

use matchfeed_config::constants::{DEFAULT_MAX_REDIRECTS, DEFAULT_TIMEOUT_SECS};
use matchfeed_config::{ApiConfig, RateLimitConfig};

use crate::client::MatchApiClient;
use crate::error::{ClientError, Result};
use crate::keys::KeyRing;
use crate::limiter::RateLimiter;
use crate::metrics::MetricsCollector;

/// Builder for creating a new [`MatchApiClient`].
pub struct MatchApiClientBuilder {
    base_url: Option<String>,
    api_keys: Vec<SecretString>,
    timeout: Duration,
    rate_limits: RateLimitConfig,
    metrics: Option<MetricsCollector>,
}

impl Default for MatchApiClientBuilder {
    fn default() -> Self {
        Self {
            base_url: None,
            api_keys: Vec::new(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            rate_limits: RateLimitConfig::default(),
            metrics: None,
        }
    }
}

impl MatchApiClientBuilder {
    /// Create a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the base URL of the upstream match API.
    ///
    /// Trailing slashes are removed automatically.
    pub fn base_url(mut self, url: String) -> Self {
        self.base_url = Some(url);
        self
    }

    /// Set the API keys. The first key becomes the primary (identity-bound)
    /// credential.
    pub fn api_keys(mut self, keys: Vec<SecretString>) -> Self {
        self.api_keys = keys;
        self
    }

    /// Set the request timeout. Default is 30 seconds.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the rate-limit window shapes.
    pub fn rate_limits(mut self, limits: RateLimitConfig) -> Self {
        self.rate_limits = limits;
        self
    }

    /// Set the metrics collector for API call performance tracking.
    pub fn metrics(mut self, metrics: MetricsCollector) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Pre-configure the builder from loaded configuration.
    pub fn from_config(mut self, config: &ApiConfig) -> Self {
        self.base_url = Some(config.base_url.clone());
        self.api_keys = config.api_keys.clone();
        self.timeout = config.timeout;
        self.rate_limits = config.rate_limits.clone();
        self
    }

    /// Normalize a base URL by removing trailing slashes.
    ///
    /// This prevents double slashes when concatenating with endpoint paths.
    fn normalize_base_url(url: String) -> String {
        url.trim_end_matches('/').to_string()
    }

    /// Build the [`MatchApiClient`] with the configured options.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidUrl`] if `base_url` was not provided.
    /// Returns [`ClientError::NoApiKeys`] if no keys were provided.
    /// Returns `ClientError::HttpError` if the HTTP client fails to build.
    pub fn build(self) -> Result<MatchApiClient> {
        let base_url = self
            .base_url
            .ok_or_else(|| ClientError::InvalidUrl("base_url is required".to_string()))?;
        let base_url = Self::normalize_base_url(base_url);

        let keys = KeyRing::new(self.api_keys)?;

        let mut limiter = RateLimiter::new(&self.rate_limits, keys.len());
        if let Some(metrics) = &self.metrics {
            limiter = limiter.with_metrics(metrics.clone());
        }

        let http = reqwest::Client::builder()
            .timeout(self.timeout)
            .redirect(reqwest::redirect::Policy::limited(DEFAULT_MAX_REDIRECTS))
            .build()?;

        Ok(MatchApiClient {
            http,
            base_url,
            keys,
            limiter,
            metrics: self.metrics,
        })
    }
}
