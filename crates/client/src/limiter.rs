//! Sliding-window endpoint rate limiter.
//!
//! Tracks request quotas per [`EndpointPattern`] and blocks callers until a
//! request would not exceed any configured window. The busiest pattern
//! ([`EndpointPattern::GetMatch`]) has its quota sharded across credential
//! slots, each owning an independent window set, so aggregate throughput
//! scales linearly with the number of credentials.
//!
//! # Invariants
//! - `acquire` has no error outcomes, only latency.
//! - The internal mutex is held only for the check-and-record step, never
//!   across a sleep; concurrent callers against saturated patterns wait on
//!   timers, not on each other's locks.
//! - Unmatched URLs classify as the most conservative configured pattern.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use tokio::time::Instant;
use tracing::trace;

use matchfeed_config::{RateLimitConfig, RateWindowRule};

use crate::metrics::MetricsCollector;
use crate::pattern::{EndpointPattern, classify_url, conservative_pattern};

/// Admission token returned by [`RateLimiter::acquire`].
///
/// For the sharded pattern, `slot` names the credential slot whose window
/// admitted the request; the caller must bind the HTTP call to that
/// credential so quota accounting and key usage stay aligned.
#[derive(Debug, Clone, Copy)]
pub struct Grant {
    pub slot: Option<usize>,
}

/// One sliding window: an ordered sequence of request instants, lazily
/// evicted on each check.
#[derive(Debug)]
struct SlidingWindow {
    max_requests: u32,
    window: Duration,
    timestamps: VecDeque<Instant>,
}

impl SlidingWindow {
    fn new(rule: &RateWindowRule) -> Self {
        Self {
            max_requests: rule.max_requests,
            window: rule.window(),
            timestamps: VecDeque::new(),
        }
    }

    fn evict(&mut self, now: Instant) {
        while let Some(oldest) = self.timestamps.front() {
            if now.duration_since(*oldest) >= self.window {
                self.timestamps.pop_front();
            } else {
                break;
            }
        }
    }

    /// Time until this window can admit one more request, or `None` if it
    /// already can. Assumes `evict` has run for `now`.
    fn wait_needed(&self, now: Instant) -> Option<Duration> {
        if (self.timestamps.len() as u32) < self.max_requests {
            return None;
        }
        match self.timestamps.front() {
            Some(oldest) => Some((*oldest + self.window).saturating_duration_since(now)),
            // max_requests == 0 never admits; retry after a full window.
            None => Some(self.window),
        }
    }
}

/// All windows attached to one pattern (or one credential slot of the
/// sharded pattern). A request is admitted only when every window admits it.
#[derive(Debug)]
struct WindowSet {
    windows: Vec<SlidingWindow>,
}

impl WindowSet {
    fn new(rules: &[RateWindowRule]) -> Self {
        Self {
            windows: rules.iter().map(SlidingWindow::new).collect(),
        }
    }

    /// Check all windows and, if every one admits, record the request in
    /// each atomically. On refusal returns the sleep needed before the
    /// tightest window frees a slot.
    fn try_admit(&mut self, now: Instant) -> Result<(), Duration> {
        let mut wait: Option<Duration> = None;
        for window in &mut self.windows {
            window.evict(now);
            if let Some(needed) = window.wait_needed(now) {
                wait = Some(wait.map_or(needed, |w: Duration| w.max(needed)));
            }
        }
        match wait {
            Some(needed) => Err(needed),
            None => {
                for window in &mut self.windows {
                    window.timestamps.push_back(now);
                }
                Ok(())
            }
        }
    }
}

/// Endpoint rate limiter with per-credential sharding for the busiest
/// pattern. Constructed once per process and alive for its lifetime.
#[derive(Debug)]
pub struct RateLimiter {
    shared: Mutex<HashMap<EndpointPattern, WindowSet>>,
    slots: Vec<Mutex<WindowSet>>,
    cursor: AtomicUsize,
    fallback: EndpointPattern,
    metrics: Option<MetricsCollector>,
}

/// The pattern whose quota is sharded per credential slot.
const SHARDED_PATTERN: EndpointPattern = EndpointPattern::GetMatch;

impl RateLimiter {
    /// Build a limiter from the configured window shapes and the number of
    /// credential slots available for the sharded pattern.
    pub fn new(config: &RateLimitConfig, key_count: usize) -> Self {
        let mut shared = HashMap::new();
        shared.insert(
            EndpointPattern::ListMatchIds,
            WindowSet::new(&config.list_ids),
        );
        shared.insert(
            EndpointPattern::GetTimeline,
            WindowSet::new(&config.get_timeline),
        );

        let slots = (0..key_count.max(1))
            .map(|_| Mutex::new(WindowSet::new(&config.get_match_per_key)))
            .collect();

        Self {
            shared: Mutex::new(shared),
            slots,
            cursor: AtomicUsize::new(0),
            fallback: conservative_pattern(config),
            metrics: None,
        }
    }

    /// Attach a metrics collector recording throttle-wait durations.
    pub fn with_metrics(mut self, metrics: MetricsCollector) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Classify a URL into its pattern, defaulting unmatched URLs to the
    /// most conservative configured pattern.
    pub fn classify(&self, url: &str) -> EndpointPattern {
        classify_url(url).unwrap_or(self.fallback)
    }

    /// Block until one request against `pattern` fits inside every
    /// configured window, record it, and return the admission grant.
    pub async fn acquire(&self, pattern: EndpointPattern) -> Grant {
        if pattern == SHARDED_PATTERN {
            return self.acquire_sharded().await;
        }

        loop {
            // Lock scope covers exactly the check-and-record step.
            let wait = {
                let mut shared = self.shared.lock().unwrap();
                let set = shared
                    .get_mut(&pattern)
                    .expect("every non-sharded pattern has a configured window set");
                match set.try_admit(Instant::now()) {
                    Ok(()) => None,
                    Err(needed) => Some(needed),
                }
            };

            match wait {
                None => return Grant { slot: None },
                Some(needed) => {
                    trace!(pattern = pattern.as_str(), wait_ms = needed.as_millis() as u64, "pattern saturated, waiting");
                    if let Some(m) = &self.metrics {
                        m.record_throttle_wait(pattern.as_str(), needed);
                    }
                    tokio::time::sleep(needed).await;
                }
            }
        }
    }

    /// Round-robin over credential slots; sleep only once every slot has
    /// refused, for the minimum remaining time across slots.
    async fn acquire_sharded(&self) -> Grant {
        loop {
            let start = self.cursor.fetch_add(1, Ordering::Relaxed);
            let mut min_wait: Option<Duration> = None;

            for probe in 0..self.slots.len() {
                let idx = (start + probe) % self.slots.len();
                let attempt = {
                    let mut slot = self.slots[idx].lock().unwrap();
                    slot.try_admit(Instant::now())
                };
                match attempt {
                    Ok(()) => return Grant { slot: Some(idx) },
                    Err(needed) => {
                        min_wait = Some(min_wait.map_or(needed, |w: Duration| w.min(needed)));
                    }
                }
            }

            let needed = min_wait.unwrap_or_else(|| Duration::from_millis(1));
            trace!(
                pattern = SHARDED_PATTERN.as_str(),
                wait_ms = needed.as_millis() as u64,
                "all credential slots saturated, waiting"
            );
            if let Some(m) = &self.metrics {
                m.record_throttle_wait(SHARDED_PATTERN.as_str(), needed);
            }
            tokio::time::sleep(needed).await;
        }
    }

    /// Number of credential slots backing the sharded pattern.
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }
}
