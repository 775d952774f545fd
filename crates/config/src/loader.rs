//! Configuration loader for environment variables and `.env` files.
//!
//! Responsibilities:
//! - Load configuration from `.env` files and environment variables.
//! - Provide a builder-pattern `ConfigLoader` so callers (the CLI) can layer
//!   explicit overrides on top of the environment.
//! - Enforce the `DOTENV_DISABLED` gate to prevent accidental dotenv loading
//!   in tests.
//!
//! Does NOT handle:
//! - Persisting configuration back to disk.
//! - Rate-limit window shapes (those default from `constants` and are only
//!   overridden programmatically).
//!
//! Invariants / Assumptions:
//! - Explicit overrides take precedence over environment variables.
//! - `load_dotenv()` must be called explicitly to enable `.env` file loading.

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;

use crate::constants::DEFAULT_TIMEOUT_SECS;
use crate::types::{ApiConfig, Config, IngestConfig, RateLimitConfig};

/// Environment variable holding the upstream base URL.
pub const ENV_BASE_URL: &str = "MATCHFEED_BASE_URL";
/// Environment variable holding the comma-separated API key list.
pub const ENV_API_KEYS: &str = "MATCHFEED_API_KEYS";
/// Environment variable overriding the artifact root directory.
pub const ENV_DATA_DIR: &str = "MATCHFEED_DATA_DIR";
/// Environment variable overriding the request timeout (seconds).
pub const ENV_TIMEOUT_SECS: &str = "MATCHFEED_TIMEOUT_SECS";

/// Errors that can occur during configuration loading.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid value for {var}: {message}")]
    InvalidValue { var: String, message: String },

    #[error("Base URL is required")]
    MissingBaseUrl,

    #[error("At least one API key is required")]
    MissingApiKeys,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration loader that builds config from environment variables with
/// optional explicit overrides.
#[derive(Default)]
pub struct ConfigLoader {
    base_url: Option<String>,
    api_keys: Option<Vec<SecretString>>,
    data_dir: Option<PathBuf>,
    timeout: Option<Duration>,
    rate_limits: Option<RateLimitConfig>,
}

impl ConfigLoader {
    /// Create a new configuration loader.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load `.env` into the process environment, unless `DOTENV_DISABLED`
    /// is set. Missing `.env` files are not an error.
    pub fn load_dotenv(&self) -> Result<(), ConfigError> {
        if std::env::var("DOTENV_DISABLED").is_ok() {
            tracing::debug!("DOTENV_DISABLED set, skipping .env loading");
            return Ok(());
        }
        dotenvy::dotenv().ok();
        Ok(())
    }

    /// Override the upstream base URL.
    pub fn base_url(mut self, url: String) -> Self {
        self.base_url = Some(url);
        self
    }

    /// Override the API key list.
    pub fn api_keys(mut self, keys: Vec<SecretString>) -> Self {
        self.api_keys = Some(keys);
        self
    }

    /// Override the artifact root directory.
    pub fn data_dir(mut self, dir: PathBuf) -> Self {
        self.data_dir = Some(dir);
        self
    }

    /// Override the request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Override the rate-limit window shapes.
    pub fn rate_limits(mut self, limits: RateLimitConfig) -> Self {
        self.rate_limits = Some(limits);
        self
    }

    /// Resolve the final configuration from overrides and the environment.
    pub fn load(self) -> Result<Config, ConfigError> {
        let base_url = match self.base_url {
            Some(url) => url,
            None => std::env::var(ENV_BASE_URL)
                .map_err(|_| ConfigError::MissingEnvVar(ENV_BASE_URL.to_string()))?,
        };
        if base_url.trim().is_empty() {
            return Err(ConfigError::MissingBaseUrl);
        }

        let api_keys = match self.api_keys {
            Some(keys) => keys,
            None => {
                let raw = std::env::var(ENV_API_KEYS)
                    .map_err(|_| ConfigError::MissingEnvVar(ENV_API_KEYS.to_string()))?;
                parse_key_list(&raw)
            }
        };
        if api_keys.is_empty() {
            return Err(ConfigError::MissingApiKeys);
        }

        let timeout = match self.timeout {
            Some(t) => t,
            None => match std::env::var(ENV_TIMEOUT_SECS) {
                Ok(raw) => {
                    let secs: u64 = raw.parse().map_err(|_| ConfigError::InvalidValue {
                        var: ENV_TIMEOUT_SECS.to_string(),
                        message: format!("expected integer seconds, got '{raw}'"),
                    })?;
                    Duration::from_secs(secs)
                }
                Err(_) => Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            },
        };

        let mut ingest = IngestConfig::default();
        if let Some(dir) = self.data_dir {
            ingest.data_dir = dir;
        } else if let Ok(dir) = std::env::var(ENV_DATA_DIR) {
            ingest.data_dir = PathBuf::from(dir);
        }

        Ok(Config {
            api: ApiConfig {
                base_url,
                api_keys,
                timeout,
                rate_limits: self.rate_limits.unwrap_or_default(),
            },
            ingest,
        })
    }
}

/// Split a comma-separated key list, dropping empty segments.
fn parse_key_list(raw: &str) -> Vec<SecretString> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| SecretString::new(s.to_string().into()))
        .collect()
}
