//! Rate limiting primitives for the credential endpoints.

use anyhow::Context;
use governor::{
    clock::{Clock, DefaultClock},
    middleware::NoOpMiddleware,
    state::keyed::DashMapStateStore,
    Quota,
};
use std::{num::NonZeroU32, time::Duration};
use tracing::debug;

pub const DEFAULT_WINDOW_SECONDS: u64 = 60;
pub const DEFAULT_MAX_REQUESTS: u32 = 100;

/// Tracked keys before idle buckets are swept.
const SWEEP_THRESHOLD: usize = 10_000;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RateLimitAction {
    Register,
    Login,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RateLimitDecision {
    Allowed,
    Limited,
}

pub trait RateLimiter: Send + Sync {
    fn check_ip(&self, ip: Option<&str>, action: RateLimitAction) -> RateLimitDecision;
}

#[derive(Clone, Debug)]
pub struct NoopRateLimiter;

impl RateLimiter for NoopRateLimiter {
    fn check_ip(&self, _ip: Option<&str>, _action: RateLimitAction) -> RateLimitDecision {
        RateLimitDecision::Allowed
    }
}

type LimitKey = (String, RateLimitAction);

/// Per client IP and action budget of `max_requests` per `window`.
///
/// Backed by a keyed GCRA limiter: the full budget is available as a burst
/// and refills evenly over the window. Requests without a resolvable IP share
/// the `unknown` bucket.
pub struct IpRateLimiter<C: Clock = DefaultClock> {
    limiter: governor::RateLimiter<LimitKey, DashMapStateStore<LimitKey>, C, NoOpMiddleware<C::Instant>>,
}

fn quota(window: Duration, max_requests: u32) -> anyhow::Result<Quota> {
    let burst = NonZeroU32::new(max_requests).context("rate limit must allow at least one request")?;
    let quota = Quota::with_period(window / max_requests)
        .context("rate limit window is too short for the request budget")?;
    Ok(quota.allow_burst(burst))
}

impl IpRateLimiter {
    /// # Errors
    /// Returns an error if `max_requests` is zero or the window is too short.
    pub fn new(window: Duration, max_requests: u32) -> anyhow::Result<Self> {
        Self::with_clock(window, max_requests, DefaultClock::default())
    }
}

impl<C: Clock> IpRateLimiter<C> {
    /// # Errors
    /// Returns an error if `max_requests` is zero or the window is too short.
    pub fn with_clock(window: Duration, max_requests: u32, clock: C) -> anyhow::Result<Self> {
        Ok(Self {
            limiter: governor::RateLimiter::dashmap_with_clock(
                quota(window, max_requests)?,
                clock,
            ),
        })
    }
}

impl<C: Clock> std::fmt::Debug for IpRateLimiter<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IpRateLimiter")
            .field("tracked", &self.limiter.len())
            .finish()
    }
}

impl<C> RateLimiter for IpRateLimiter<C>
where
    C: Clock + Send + Sync,
{
    fn check_ip(&self, ip: Option<&str>, action: RateLimitAction) -> RateLimitDecision {
        if self.limiter.len() > SWEEP_THRESHOLD {
            self.limiter.retain_recent();
            self.limiter.shrink_to_fit();
        }

        let key = (ip.unwrap_or("unknown").to_string(), action);
        if self.limiter.check_key(&key).is_ok() {
            RateLimitDecision::Allowed
        } else {
            debug!(ip = %key.0, ?action, "rate limited");
            RateLimitDecision::Limited
        }
    }
}
