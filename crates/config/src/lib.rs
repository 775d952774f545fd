//! Configuration management for the matchfeed ingestion core.
//!
//! This crate provides types and loaders for the upstream connection,
//! credential set, rate-limit windows, and pipeline tunables, loaded from
//! environment variables and `.env` files.

pub mod constants;
mod loader;
pub mod types;

pub use loader::{ConfigError, ConfigLoader};
pub use types::{
    ApiConfig, Config, IngestConfig, PatternLimits, RateLimitConfig, RateWindowRule,
};
