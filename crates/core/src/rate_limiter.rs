//! Per-provider request budgets.
//!
//! Each provider gets an independent sliding window: at most `max_requests`
//! calls may be recorded within any `window`. Queries never block; callers
//! decide what to do when a provider is limited.

use serde::Serialize;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use tokio::time::{Duration, Instant};

use crate::config::RateLimitConfig;
use crate::subtitle::ProviderId;

/// Snapshot of a provider's rate limit state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RateLimitStatus {
    pub provider: ProviderId,
    pub requests_remaining: u32,
    /// Milliseconds until the oldest request in the window expires (0 if none).
    pub reset_time_ms: u64,
    pub is_limited: bool,
}

/// Request budget for one provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateBudget {
    pub max_requests: u32,
    pub window: Duration,
}

impl RateBudget {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            max_requests,
            window,
        }
    }
}

/// Sliding log of recent requests for a single provider.
#[derive(Debug)]
struct RequestWindow {
    budget: RateBudget,
    requests: VecDeque<Instant>,
}

impl RequestWindow {
    fn new(budget: RateBudget) -> Self {
        Self {
            budget,
            requests: VecDeque::new(),
        }
    }

    fn in_window(&self, now: Instant) -> impl Iterator<Item = &Instant> {
        let window = self.budget.window;
        self.requests
            .iter()
            .filter(move |t| now.duration_since(**t) < window)
    }

    fn used(&self, now: Instant) -> u32 {
        self.in_window(now).count() as u32
    }

    fn remaining(&self, now: Instant) -> u32 {
        self.budget.max_requests.saturating_sub(self.used(now))
    }

    fn reset_in(&self, now: Instant) -> Duration {
        self.in_window(now)
            .min()
            .map(|oldest| self.budget.window.saturating_sub(now.duration_since(*oldest)))
            .unwrap_or(Duration::ZERO)
    }

    fn record(&mut self, now: Instant) {
        while let Some(front) = self.requests.front() {
            if now.duration_since(*front) >= self.budget.window {
                self.requests.pop_front();
            } else {
                break;
            }
        }
        self.requests.push_back(now);
    }

    fn status(&self, provider: &ProviderId, now: Instant) -> RateLimitStatus {
        let remaining = self.remaining(now);
        RateLimitStatus {
            provider: provider.clone(),
            requests_remaining: remaining,
            reset_time_ms: self.reset_in(now).as_millis() as u64,
            is_limited: remaining == 0,
        }
    }
}

/// Rate limiter shared by all operations of the orchestrator.
///
/// Providers without an explicit budget use the default one, created lazily
/// on first use.
pub struct RateLimiter {
    default_budget: RateBudget,
    windows: Mutex<HashMap<ProviderId, RequestWindow>>,
}

impl RateLimiter {
    /// Create a limiter where every provider uses `default_budget`.
    pub fn new(default_budget: RateBudget) -> Self {
        Self {
            default_budget,
            windows: Mutex::new(HashMap::new()),
        }
    }

    /// Create a limiter from configuration, including per-provider overrides.
    pub fn from_config(config: &RateLimitConfig) -> Self {
        let limiter = Self::new(RateBudget::new(
            config.default_requests,
            Duration::from_secs(config.default_window_secs),
        ));
        for provider in &config.providers {
            limiter.set_budget(
                provider.provider.clone(),
                RateBudget::new(provider.requests, Duration::from_secs(provider.window_secs)),
            );
        }
        limiter
    }

    /// Set the budget for a provider, keeping its request history.
    pub fn set_budget(&self, provider: ProviderId, budget: RateBudget) {
        let mut windows = self.windows.lock().unwrap();
        windows
            .entry(provider)
            .and_modify(|w| w.budget = budget)
            .or_insert_with(|| RequestWindow::new(budget));
    }

    /// Whether a request to `provider` would fit in its current window.
    pub fn can_make_request(&self, provider: &ProviderId) -> bool {
        let now = Instant::now();
        let windows = self.windows.lock().unwrap();
        match windows.get(provider) {
            Some(window) => window.remaining(now) > 0,
            None => self.default_budget.max_requests > 0,
        }
    }

    /// Record a request dispatched to `provider`.
    pub fn record_request(&self, provider: &ProviderId) {
        let now = Instant::now();
        let mut windows = self.windows.lock().unwrap();
        windows
            .entry(provider.clone())
            .or_insert_with(|| RequestWindow::new(self.default_budget))
            .record(now);
    }

    /// Current status for `provider`.
    pub fn get_status(&self, provider: &ProviderId) -> RateLimitStatus {
        let now = Instant::now();
        let windows = self.windows.lock().unwrap();
        match windows.get(provider) {
            Some(window) => window.status(provider, now),
            None => RequestWindow::new(self.default_budget).status(provider, now),
        }
    }

    /// Status of every provider seen so far.
    pub fn all_status(&self) -> Vec<RateLimitStatus> {
        let now = Instant::now();
        let windows = self.windows.lock().unwrap();
        windows
            .iter()
            .map(|(provider, window)| window.status(provider, now))
            .collect()
    }
}
