//! Matchfeed CLI - run one ingestion job from the command line.
//!
//! Responsibilities:
//! - Parse command-line arguments and environment variables.
//! - Initialize tracing and the optional Prometheus exporter.
//! - Run (or reuse) an ingestion job via the shared pipeline crates and
//!   print its summary as JSON.
//!
//! Does NOT handle:
//! - Rate limiting, credential selection, or fetch orchestration (see
//!   `crates/client` and `crates/ingest`).
//!
//! Invariants:
//! - `load_dotenv()` is called BEFORE CLI parsing so `.env` can provide
//!   clap env defaults.

mod args;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use secrecy::SecretString;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use args::Cli;
use matchfeed_client::{MatchApiClient, MetricsCollector, MetricsExporter};
use matchfeed_config::ConfigLoader;
use matchfeed_ingest::IngestService;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env BEFORE CLI parsing so clap env defaults can read .env values
    ConfigLoader::new()
        .load_dotenv()
        .context("failed to load environment")?;

    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(fmt::layer())
        .init();

    let _metrics_exporter = match &cli.metrics_bind {
        Some(bind_addr) => {
            let exporter = MetricsExporter::install(bind_addr)
                .context("failed to start metrics exporter")?;
            Some(exporter)
        }
        None => None,
    };

    let mut loader = ConfigLoader::new();
    if let Some(url) = cli.base_url {
        loader = loader.base_url(url);
    }
    if let Some(raw) = cli.api_keys {
        let keys: Vec<SecretString> = raw
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| SecretString::new(s.to_string().into()))
            .collect();
        loader = loader.api_keys(keys);
    }
    if let Some(dir) = cli.data_dir {
        loader = loader.data_dir(dir);
    }
    let config = loader.load().context("failed to load configuration")?;

    let client = MatchApiClient::builder()
        .from_config(&config.api)
        .metrics(MetricsCollector::new())
        .build()
        .context("failed to build match API client")?;
    let service = IngestService::new(Arc::new(client), config.ingest);

    info!(player_id = %cli.player_id, "starting ingestion");
    let job = service.ingest(&cli.player_id);
    job.wait_primary(Duration::from_secs(cli.wait_secs)).await?;

    if cli.wait_enrichment {
        while !job.snapshot().enrichment.is_terminal() {
            tokio::time::sleep(Duration::from_millis(200)).await;
        }
    }

    let snapshot = job.snapshot();
    let summary = serde_json::json!({
        "player_id": job.player_id(),
        "status": snapshot.status.as_str(),
        "progress": snapshot.progress,
        "discovered": snapshot.discovered,
        "fetched": snapshot.fetched,
        "failed": snapshot.failed,
        "not_found": snapshot.not_found,
        "enrichment": snapshot.enrichment.as_str(),
        "artifact_dir": service.artifact_dir(job.player_id()).display().to_string(),
    });
    println!("{}", serde_json::to_string_pretty(&summary)?);

    Ok(())
}
