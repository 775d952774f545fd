//! Metrics collection for upstream API calls.
//!
//! A lightweight wrapper around the `metrics` crate macros with consistent
//! label names (`pattern`, `method`, `status`, `error_category`).
//!
//! # What this module does NOT handle:
//! - Metrics exposition/export (see [`crate::metrics_exporter`])
//! - Persistent storage of metrics
//!
//! # Invariants
//! - Metric recording is infallible and zero-cost when no recorder is
//!   installed.

use std::time::Duration;

use crate::error::ClientError;

/// Metric name for request duration histogram.
pub const METRIC_REQUEST_DURATION: &str = "matchfeed_api_request_duration_seconds";

/// Metric name for total request counter.
pub const METRIC_REQUESTS_TOTAL: &str = "matchfeed_api_requests_total";

/// Metric name for upstream 429 counter.
pub const METRIC_UPSTREAM_THROTTLES: &str = "matchfeed_api_upstream_throttles_total";

/// Metric name for limiter wait-time histogram.
pub const METRIC_THROTTLE_WAIT: &str = "matchfeed_limiter_wait_seconds";

/// Metric name for error counter.
pub const METRIC_ERRORS_TOTAL: &str = "matchfeed_api_errors_total";

/// Error categories for metrics labeling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Transport-level errors (connection refused, DNS, timeouts).
    Transport,
    /// HTTP 4xx client errors.
    Http4xx,
    /// HTTP 5xx server errors.
    Http5xx,
    /// Response decoding failures.
    Decode,
    /// Unknown/unclassified errors.
    Unknown,
}

impl ErrorCategory {
    /// Returns the string label for this error category.
    pub const fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::Transport => "transport",
            ErrorCategory::Http4xx => "http_4xx",
            ErrorCategory::Http5xx => "http_5xx",
            ErrorCategory::Decode => "decode",
            ErrorCategory::Unknown => "unknown",
        }
    }
}

impl From<&ClientError> for ErrorCategory {
    fn from(error: &ClientError) -> Self {
        match error {
            ClientError::ApiError { status, .. } => {
                if (400..500).contains(status) {
                    ErrorCategory::Http4xx
                } else if (500..600).contains(status) {
                    ErrorCategory::Http5xx
                } else {
                    ErrorCategory::Unknown
                }
            }
            ClientError::HttpError(_) => ErrorCategory::Transport,
            ClientError::InvalidResponse(_) => ErrorCategory::Decode,
            _ => ErrorCategory::Unknown,
        }
    }
}

/// Metrics collector for match API calls.
#[derive(Debug, Clone, Default)]
pub struct MetricsCollector {
    enabled: bool,
}

impl MetricsCollector {
    /// Create an enabled metrics collector.
    pub fn new() -> Self {
        Self { enabled: true }
    }

    /// Create a disabled collector that records nothing.
    pub fn disabled() -> Self {
        Self { enabled: false }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Record one request attempt (retries after 429 count again).
    pub fn record_request(&self, pattern: &str, method: &str) {
        if !self.enabled {
            return;
        }
        metrics::counter!(METRIC_REQUESTS_TOTAL,
            "pattern" => pattern.to_string(),
            "method" => method.to_string(),
        )
        .increment(1);
    }

    /// Record the duration of one request attempt.
    pub fn record_request_duration(
        &self,
        pattern: &str,
        method: &str,
        duration: Duration,
        status: Option<u16>,
    ) {
        if !self.enabled {
            return;
        }
        let status_label = status.map_or("error".to_string(), |s| s.to_string());
        metrics::histogram!(METRIC_REQUEST_DURATION,
            "pattern" => pattern.to_string(),
            "method" => method.to_string(),
            "status" => status_label,
        )
        .record(duration.as_secs_f64());
    }

    /// Record an upstream 429 on the given pattern.
    pub fn record_upstream_throttle(&self, pattern: &str) {
        if !self.enabled {
            return;
        }
        metrics::counter!(METRIC_UPSTREAM_THROTTLES,
            "pattern" => pattern.to_string(),
        )
        .increment(1);
    }

    /// Record time spent waiting inside the rate limiter.
    pub fn record_throttle_wait(&self, pattern: &str, wait: Duration) {
        if !self.enabled {
            return;
        }
        metrics::histogram!(METRIC_THROTTLE_WAIT,
            "pattern" => pattern.to_string(),
        )
        .record(wait.as_secs_f64());
    }

    /// Record an error, categorized automatically.
    pub fn record_client_error(&self, pattern: &str, method: &str, error: &ClientError) {
        if !self.enabled {
            return;
        }
        metrics::counter!(METRIC_ERRORS_TOTAL,
            "pattern" => pattern.to_string(),
            "method" => method.to_string(),
            "error_category" => ErrorCategory::from(error).as_str(),
        )
        .increment(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_category_as_str() {
        assert_eq!(ErrorCategory::Transport.as_str(), "transport");
        assert_eq!(ErrorCategory::Http4xx.as_str(), "http_4xx");
        assert_eq!(ErrorCategory::Http5xx.as_str(), "http_5xx");
        assert_eq!(ErrorCategory::Decode.as_str(), "decode");
        assert_eq!(ErrorCategory::Unknown.as_str(), "unknown");
    }

    #[test]
    fn test_error_categorization() {
        let api_404 = ClientError::ApiError {
            status: 404,
            url: "u".to_string(),
            message: "m".to_string(),
        };
        assert_eq!(ErrorCategory::from(&api_404), ErrorCategory::Http4xx);

        let api_503 = ClientError::ApiError {
            status: 503,
            url: "u".to_string(),
            message: "m".to_string(),
        };
        assert_eq!(ErrorCategory::from(&api_503), ErrorCategory::Http5xx);

        let decode = ClientError::InvalidResponse("bad shape".to_string());
        assert_eq!(ErrorCategory::from(&decode), ErrorCategory::Decode);
    }

    #[test]
    fn test_collector_enabled_toggle() {
        assert!(MetricsCollector::new().is_enabled());
        assert!(!MetricsCollector::disabled().is_enabled());
    }
}
