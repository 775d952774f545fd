//! Credentialed, rate-governed client for the upstream match API.
//!
//! This crate provides the two lower layers of the ingestion core: a
//! sliding-window endpoint rate limiter (with per-credential sharding for
//! the busiest endpoint class) and an HTTP client that classifies every
//! outbound URL, acquires quota, selects a credential, and recovers from
//! upstream throttling.

pub mod client;
pub mod error;
mod keys;
pub mod limiter;
pub mod metrics;
pub mod metrics_exporter;
pub mod pattern;

#[cfg(any(feature = "test-utils", test))]
pub mod testing;

pub use client::builder::MatchApiClientBuilder;
pub use client::{Fetch, MatchApiClient};
pub use error::{ClientError, Result};
pub use keys::KeyRing;
pub use limiter::{Grant, RateLimiter};
pub use metrics::{ErrorCategory, MetricsCollector};
pub use metrics_exporter::MetricsExporter;
pub use pattern::EndpointPattern;
