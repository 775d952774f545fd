//! Centralized constants for the matchfeed workspace.
//!
//! This module contains default values used across crates to avoid
//! magic number duplication and improve maintainability.

// =============================================================================
// Connection & Timeout Defaults
// =============================================================================

/// Default HTTP request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Default maximum number of HTTP redirects to follow.
pub const DEFAULT_MAX_REDIRECTS: usize = 5;

/// Default delay applied to a throttled (429) request when the upstream
/// omits the `Retry-After` header.
pub const DEFAULT_RETRY_AFTER_SECS: u64 = 1;

// =============================================================================
// Rate Limit Window Defaults
// =============================================================================
//
// Window shapes mirror the upstream's published per-method quotas. The
// match-by-id class is sharded per credential; its shape applies to each
// credential slot independently.

/// Match-id listing: short-window cap (requests per 10 seconds).
pub const LIST_IDS_SHORT_MAX: u32 = 100;
/// Match-id listing: short-window length in seconds.
pub const LIST_IDS_SHORT_WINDOW_SECS: u64 = 10;
/// Match-id listing: long-window cap (requests per 10 minutes).
pub const LIST_IDS_LONG_MAX: u32 = 1_200;
/// Match-id listing: long-window length in seconds.
pub const LIST_IDS_LONG_WINDOW_SECS: u64 = 600;

/// Match fetch (per credential slot): window cap.
pub const GET_MATCH_MAX: u32 = 250;
/// Match fetch (per credential slot): window length in seconds.
pub const GET_MATCH_WINDOW_SECS: u64 = 10;

/// Timeline fetch: short-window cap.
pub const GET_TIMELINE_SHORT_MAX: u32 = 50;
/// Timeline fetch: short-window length in seconds.
pub const GET_TIMELINE_SHORT_WINDOW_SECS: u64 = 10;
/// Timeline fetch: long-window cap.
pub const GET_TIMELINE_LONG_MAX: u32 = 500;
/// Timeline fetch: long-window length in seconds.
pub const GET_TIMELINE_LONG_WINDOW_SECS: u64 = 600;

// =============================================================================
// Pipeline Defaults
// =============================================================================

/// Default page size for match-id discovery requests.
pub const DEFAULT_ID_PAGE_SIZE: usize = 100;

/// Default number of record fetches grouped into one batch.
pub const DEFAULT_FETCH_BATCH_SIZE: usize = 20;

/// Default global cap on simultaneously outstanding record fetches.
///
/// Sized well below aggregate rate capacity so queued requests do not
/// accumulate unbounded memory and connections ahead of the limiter.
pub const DEFAULT_MAX_CONCURRENT_FETCHES: usize = 16;

/// Default freshness window for reusing a completed job, in seconds.
pub const DEFAULT_JOB_FRESHNESS_SECS: u64 = 300;

/// Default wait for the primary phase in the CLI, in seconds.
pub const DEFAULT_PRIMARY_WAIT_SECS: u64 = 600;
