//! Prometheus metrics exporter for production observability.
//!
//! Serves metrics collected through the `metrics` crate in Prometheus text
//! format at `/metrics`, via `metrics-exporter-prometheus`.

use std::net::SocketAddr;

use metrics_exporter_prometheus::PrometheusBuilder;
use tracing::info;

use crate::metrics::{METRIC_REQUEST_DURATION, METRIC_THROTTLE_WAIT};

/// Metrics exporter for Prometheus scraping.
///
/// When created, this installs a global recorder and starts an HTTP server
/// on the specified bind address serving `/metrics`. The exporter runs
/// until dropped.
pub struct MetricsExporter {
    bind_addr: SocketAddr,
}

impl MetricsExporter {
    /// Install the Prometheus exporter as the global metrics recorder.
    ///
    /// # Errors
    /// Returns an error if the bind address is invalid, another recorder is
    /// already installed, or the HTTP server fails to start.
    pub fn install(bind_addr: &str) -> Result<Self, MetricsExporterError> {
        let addr: SocketAddr = bind_addr
            .parse()
            .map_err(|e| MetricsExporterError::InvalidBindAddress(bind_addr.to_string(), e))?;

        PrometheusBuilder::new()
            .set_buckets_for_metric(
                metrics_exporter_prometheus::Matcher::Full(METRIC_REQUEST_DURATION.to_string()),
                &[
                    0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
                ],
            )?
            .set_buckets_for_metric(
                metrics_exporter_prometheus::Matcher::Full(METRIC_THROTTLE_WAIT.to_string()),
                &[0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 10.0, 30.0, 60.0, 300.0],
            )?
            .with_http_listener(addr)
            .install_recorder()
            .map_err(|_| MetricsExporterError::RecorderAlreadyInstalled)?;

        info!(
            "Prometheus metrics exporter started on http://{}/metrics",
            addr
        );

        Ok(Self { bind_addr: addr })
    }

    /// The address the exporter is bound to.
    pub fn bind_addr(&self) -> SocketAddr {
        self.bind_addr
    }
}

/// Errors that can occur when installing the metrics exporter.
#[derive(Debug, thiserror::Error)]
pub enum MetricsExporterError {
    #[error("Invalid bind address '{0}': {1}")]
    InvalidBindAddress(String, std::net::AddrParseError),

    #[error("Failed to configure histogram buckets: {0}")]
    BuildError(#[from] metrics_exporter_prometheus::BuildError),

    #[error("A metrics recorder is already installed")]
    RecorderAlreadyInstalled,
}
