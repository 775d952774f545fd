//! Command-line arguments for the matchfeed binary.

use std::path::PathBuf;

use clap::Parser;

use matchfeed_config::constants::DEFAULT_PRIMARY_WAIT_SECS;

/// Run one ingestion for a player and print a job summary.
#[derive(Parser, Debug)]
#[command(
    name = "matchfeed",
    version,
    about = "Rate-governed match-history ingestion"
)]
pub struct Cli {
    /// Player id to ingest.
    pub player_id: String,

    /// Upstream match API base URL.
    #[arg(long, env = "MATCHFEED_BASE_URL")]
    pub base_url: Option<String>,

    /// Comma-separated API keys; the first is the identity-bound primary.
    #[arg(long, env = "MATCHFEED_API_KEYS", hide_env_values = true)]
    pub api_keys: Option<String>,

    /// Artifact root directory.
    #[arg(long, env = "MATCHFEED_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Seconds to wait for the primary phase to complete.
    #[arg(long, default_value_t = DEFAULT_PRIMARY_WAIT_SECS)]
    pub wait_secs: u64,

    /// Also block until the background timeline enrichment finishes.
    #[arg(long)]
    pub wait_enrichment: bool,

    /// Serve Prometheus metrics on this address (e.g. 127.0.0.1:9184).
    #[arg(long)]
    pub metrics_bind: Option<String>,
}
