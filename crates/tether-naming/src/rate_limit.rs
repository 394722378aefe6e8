//! Client-side request pacing for naming services.
//!
//! Naming services accept a bounded number of requests per window. The
//! limiter is a governor quota of `max_requests` per `window`, with the whole
//! window's allowance available as a burst.

use std::fmt;
use std::num::NonZeroU32;
use std::time::Duration;

use governor::{Quota, RateLimiter as GovernorRateLimiter};

type DirectLimiter = GovernorRateLimiter<
    governor::state::direct::NotKeyed,
    governor::state::InMemoryState,
    governor::clock::DefaultClock,
>;

/// At most `max_requests` per `window`.
pub struct RateLimiter {
    max_requests: NonZeroU32,
    window: Duration,
    limiter: DirectLimiter,
}

impl RateLimiter {
    pub fn new(max_requests: usize, window: Duration) -> Self {
        let max_requests = u32::try_from(max_requests)
            .ok()
            .and_then(NonZeroU32::new)
            .unwrap_or(NonZeroU32::MIN);
        let quota = Quota::with_period(window / max_requests.get())
            .unwrap_or_else(|| Quota::per_second(max_requests))
            .allow_burst(max_requests);
        Self {
            max_requests,
            window,
            limiter: GovernorRateLimiter::direct(quota),
        }
    }

    pub fn max_requests(&self) -> usize {
        self.max_requests.get() as usize
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Wait until a request may be sent.
    pub async fn acquire(&self) {
        if self.limiter.check().is_ok() {
            return;
        }
        tracing::debug!(
            max_requests = self.max_requests.get(),
            window_ms = self.window.as_millis() as u64,
            "rate limit reached, waiting"
        );
        self.limiter.until_ready().await;
    }
}

impl fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RateLimiter")
            .field("max_requests", &self.max_requests)
            .field("window", &self.window)
            .finish()
    }
}

impl Default for RateLimiter {
    /// 30 requests per 10 seconds.
    fn default() -> Self {
        Self::new(30, Duration::from_secs(10))
    }
}
