//! Endpoint patterns and URL classification.
//!
//! Every concrete request URL maps to exactly one [`EndpointPattern`] via an
//! ordered list of path-prefix matchers checked in a fixed, deterministic
//! order. URLs that match nothing classify as the most conservative known
//! pattern, never as "unlimited": silently exceeding upstream quota is worse
//! than over-throttling an unrecognized call.

use matchfeed_config::{PatternLimits, RateLimitConfig};

/// One logical remote operation type, independent of the concrete ids in a
/// given call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EndpointPattern {
    /// Page of match ids for a player (identity-bound).
    ListMatchIds,
    /// One match payload by id. The busiest class; its quota is sharded
    /// across credential slots.
    GetMatch,
    /// One timeline payload by id.
    GetTimeline,
}

impl EndpointPattern {
    /// Returns the string label for this pattern, used in logs and metrics.
    pub const fn as_str(&self) -> &'static str {
        match self {
            EndpointPattern::ListMatchIds => "list_match_ids",
            EndpointPattern::GetMatch => "get_match",
            EndpointPattern::GetTimeline => "get_timeline",
        }
    }
}

/// Path-prefix matchers, checked in order. First match wins.
const MATCHERS: &[(&str, EndpointPattern)] = &[
    ("/match/v1/ids/", EndpointPattern::ListMatchIds),
    ("/match/v1/matches/", EndpointPattern::GetMatch),
    ("/match/v1/timelines/", EndpointPattern::GetTimeline),
];

/// Classify a URL path. Returns `None` for unmatched paths; callers decide
/// the fallback (see [`conservative_pattern`]).
pub fn classify_path(path: &str) -> Option<EndpointPattern> {
    MATCHERS
        .iter()
        .find(|(prefix, _)| path.starts_with(prefix))
        .map(|(_, pattern)| *pattern)
}

/// Classify a full URL by its path component. Unparseable URLs classify as
/// unmatched.
pub fn classify_url(url: &str) -> Option<EndpointPattern> {
    let parsed = url::Url::parse(url).ok()?;
    classify_path(parsed.path())
}

/// Lowest sustained requests-per-second across a pattern's window rules.
fn sustained_rate(limits: &PatternLimits) -> f64 {
    limits
        .iter()
        .map(|rule| rule.max_requests as f64 / rule.window_secs.max(1) as f64)
        .fold(f64::INFINITY, f64::min)
}

/// The most conservative configured pattern: the one whose tightest window
/// admits the fewest requests per second. Unmatched URLs are throttled as
/// this pattern.
pub fn conservative_pattern(config: &RateLimitConfig) -> EndpointPattern {
    let candidates = [
        (EndpointPattern::ListMatchIds, &config.list_ids),
        (EndpointPattern::GetMatch, &config.get_match_per_key),
        (EndpointPattern::GetTimeline, &config.get_timeline),
    ];

    let mut best = EndpointPattern::ListMatchIds;
    let mut best_rate = f64::INFINITY;
    for (pattern, limits) in candidates {
        let rate = sustained_rate(limits);
        if rate < best_rate {
            best = pattern;
            best_rate = rate;
        }
    }
    best
}
