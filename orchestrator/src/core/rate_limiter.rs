//! Rolling 60-second request/token window for one job's current provider

use std::collections::VecDeque;
use std::time::Duration;
use tokio::time::Instant;

use shared::RateLimits;

pub const WINDOW: Duration = Duration::from_secs(60);

#[derive(Debug)]
pub struct RateWindow {
    limits: RateLimits,
    calls: VecDeque<(Instant, u64)>,
}

impl RateWindow {
    pub fn new(limits: RateLimits) -> Self {
        Self {
            limits,
            calls: VecDeque::new(),
        }
    }

    pub fn limits(&self) -> RateLimits {
        self.limits
    }

    /// Switch to another provider's limits and start a fresh window
    pub fn reconfigure(&mut self, limits: RateLimits) {
        self.limits = limits;
        self.calls.clear();
    }

    fn evict(&mut self, now: Instant) {
        while let Some((at, _)) = self.calls.front() {
            if now.duration_since(*at) >= WINDOW {
                self.calls.pop_front();
            } else {
                break;
            }
        }
    }

    pub fn requests_in_window(&mut self, now: Instant) -> usize {
        self.evict(now);
        self.calls.len()
    }

    pub fn tokens_in_window(&mut self, now: Instant) -> u64 {
        self.evict(now);
        self.calls.iter().map(|(_, tokens)| tokens).sum()
    }

    /// How long to wait before another call fits in the window; `None` if it fits now
    ///
    /// Never longer than the window itself.
    pub fn wait_time(&mut self, now: Instant) -> Option<Duration> {
        self.evict(now);
        let requests_full = self.limits.requests_per_minute > 0
            && self.calls.len() >= self.limits.requests_per_minute as usize;
        let tokens_full =
            self.limits.tokens_per_minute > 0 && self.tokens_in_window(now) >= self.limits.tokens_per_minute;

        if !requests_full && !tokens_full {
            return None;
        }

        let oldest = self.calls.front()?.0;
        let reopen = oldest + WINDOW;
        Some(reopen.saturating_duration_since(now))
    }

    /// Count one call made at `at`; tokens are attributed once known
    pub fn record(&mut self, at: Instant, tokens: u64) {
        self.calls.push_back((at, tokens));
    }
}
