// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Token-bucket rate limiting in front of the HTTP surface, keyed globally
//! (one bucket per process — this bridge serves a single operator).

use std::num::NonZeroU32;

use governor::clock::{Clock, DefaultClock};
use governor::{Quota, RateLimiter};

use crate::error::{BridgeError, ErrorCode};

type Limiter = RateLimiter<governor::state::NotKeyed, governor::state::InMemoryState, DefaultClock>;

/// Wraps a `governor` token bucket with `rpm`/`burst` parameters and maps
/// denial into a `BridgeError` carrying a rounded-up `retry_after_sec`.
pub struct RateLimit {
    limiter: Limiter,
    clock: DefaultClock,
}

impl RateLimit {
    pub fn new(rpm: u32, burst: u32) -> Self {
        let rpm = NonZeroU32::new(rpm.max(1)).unwrap_or(NonZeroU32::MIN);
        let burst = NonZeroU32::new(burst.max(1)).unwrap_or(NonZeroU32::MIN);
        let quota = Quota::per_minute(rpm).allow_burst(burst);
        Self { limiter: RateLimiter::direct(quota), clock: DefaultClock::default() }
    }

    /// Attempt to consume one token. On denial, returns a `BridgeError` with
    /// `retry_after_sec` rounded up from the reported wait time.
    ///
    /// This is the bridge's own ingress throttle, distinct from ChatGPT
    /// rate-limiting detected in scraped UI text (`rate_limited_by_chatgpt`).
    /// The closed error taxonomy has no dedicated code for it, so it is
    /// mapped to `queue_full` — the same "too much work right now, retry
    /// later" 429 semantics as the admission/FIFO refusals.
    pub fn check(&self) -> Result<(), BridgeError> {
        self.limiter.check().map_err(|not_until| {
            let wait = not_until.wait_time_from(self.clock.now());
            let retry_after_sec = wait.as_secs().max(1) + u64::from(wait.subsec_nanos() > 0 && wait.as_secs() == 0);
            BridgeError::new(ErrorCode::QueueFull, "request rate limit exceeded")
                .with_retry_after_sec(retry_after_sec.max(1))
        })
    }
}

#[cfg(test)]
#[path = "limiter_tests.rs"]
mod tests;
