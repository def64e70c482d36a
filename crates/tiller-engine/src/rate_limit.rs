//! Fixed-window request counting keyed by caller identity.
//!
//! Simpler and burstier than a sliding window: the counter resets at fixed
//! boundaries relative to the first request of each window. State is
//! in-memory only and lost on restart; that loss is an accepted weakness of
//! the design, not persisted away.

use std::time::{Duration, Instant};

use dashmap::DashMap;
use tracing::warn;

#[derive(Debug, Clone, Copy)]
pub struct RateLimitConfig {
    pub window: Duration,
    pub max_requests: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            window: Duration::from_secs(60),
            max_requests: 100,
        }
    }
}

#[derive(Debug)]
struct Window {
    started: Instant,
    count: u32,
}

/// Per-identity fixed-window admission control.
///
/// Concurrent `admit` calls for different identities never block each
/// other; calls for the same identity serialize on the map entry, so two
/// racing callers cannot both take the last slot.
#[derive(Debug)]
pub struct FixedWindowLimiter {
    config: RateLimitConfig,
    windows: DashMap<String, Window>,
}

impl FixedWindowLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            windows: DashMap::new(),
        }
    }

    /// Admit or reject a request for `identity`.
    ///
    /// First request for an identity, or any request after its window has
    /// elapsed, resets the window and admits. Within a window, admits while
    /// the count is below the cap; past the cap the count is left untouched.
    pub fn admit(&self, identity: &str) -> bool {
        let mut window = self
            .windows
            .entry(identity.to_string())
            .or_insert_with(|| Window {
                started: Instant::now(),
                count: 0,
            });

        if window.started.elapsed() >= self.config.window {
            window.started = Instant::now();
            window.count = 1;
            return true;
        }
        if window.count < self.config.max_requests {
            window.count += 1;
            return true;
        }
        warn!(identity, max = self.config.max_requests, "rate limit exceeded");
        false
    }

    /// Time until the current window for `identity` expires. Zero when no
    /// window is open.
    pub fn retry_after(&self, identity: &str) -> Duration {
        match self.windows.get(identity) {
            Some(window) => self.config.window.saturating_sub(window.started.elapsed()),
            None => Duration::ZERO,
        }
    }

    /// Slots left in the current window for `identity`.
    pub fn remaining(&self, identity: &str) -> u32 {
        match self.windows.get(identity) {
            Some(window) if window.started.elapsed() < self.config.window => {
                self.config.max_requests.saturating_sub(window.count)
            }
            _ => self.config.max_requests,
        }
    }
}
