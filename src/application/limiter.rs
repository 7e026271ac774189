//! Admission control for endpoints.
//!
//! `RateLimiter` is a shared token bucket. `RateLimited` wraps any endpoint
//! and rejects calls immediately with `EndpointError::RateLimitExceeded` when
//! the bucket is empty. Rejected calls are never queued, delayed or retried.

use crate::application::config::BuildError;
use crate::application::endpoint::{Context, Endpoint};
use crate::application::metrics::AdmissionMetrics;
use crate::application::ports::Clock;
use crate::domain::error::EndpointError;
use crate::domain::token_bucket::{AdmissionDecision, TokenBucket};
use crate::infrastructure::clock::SystemClock;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

const DEFAULT_CAPACITY: u32 = 3;
const DEFAULT_REFILL_AMOUNT: u32 = 1;
const DEFAULT_REFILL_INTERVAL: Duration = Duration::from_secs(4);

/// Token bucket shared by every endpoint it guards.
///
/// Cloning is cheap; all clones draw from the same bucket. The
/// read-check-decrement on the bucket happens under one mutex, so concurrent
/// callers can never spend the same token twice. The lock is held only for
/// the token accounting, never across the guarded call.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    inner: Arc<LimiterInner>,
}

#[derive(Debug)]
struct LimiterInner {
    bucket: Mutex<TokenBucket>,
    clock: Arc<dyn Clock>,
    metrics: AdmissionMetrics,
}

/// Builder for `RateLimiter`.
#[derive(Debug)]
pub struct RateLimiterBuilder {
    capacity: u32,
    refill_amount: u32,
    refill_interval: Duration,
    clock: Option<Arc<dyn Clock>>,
}

impl RateLimiterBuilder {
    /// Set the bucket capacity, which is also the initial burst.
    pub fn with_capacity(mut self, capacity: u32) -> Self {
        self.capacity = capacity;
        self
    }

    /// Set how many tokens each refill adds.
    pub fn with_refill_amount(mut self, amount: u32) -> Self {
        self.refill_amount = amount;
        self
    }

    /// Set the length of one refill interval.
    pub fn with_refill_interval(mut self, interval: Duration) -> Self {
        self.refill_interval = interval;
        self
    }

    /// Set a custom clock (for testing).
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Build the limiter with a full bucket.
    ///
    /// # Errors
    /// Returns `BuildError::TokenBucket` if capacity, refill amount or refill
    /// interval is zero.
    pub fn build(self) -> Result<RateLimiter, BuildError> {
        let clock = self
            .clock
            .unwrap_or_else(|| Arc::new(SystemClock::new()));
        let bucket = TokenBucket::new(
            self.capacity,
            self.refill_amount,
            self.refill_interval,
            clock.now(),
        )?;
        Ok(RateLimiter {
            inner: Arc::new(LimiterInner {
                bucket: Mutex::new(bucket),
                clock,
                metrics: AdmissionMetrics::new(),
            }),
        })
    }
}

impl RateLimiter {
    /// Create a builder with the reference defaults: capacity 3, one token
    /// every 4 seconds.
    pub fn builder() -> RateLimiterBuilder {
        RateLimiterBuilder {
            capacity: DEFAULT_CAPACITY,
            refill_amount: DEFAULT_REFILL_AMOUNT,
            refill_interval: DEFAULT_REFILL_INTERVAL,
            clock: None,
        }
    }

    /// Try to take one token. Never blocks on token availability.
    pub fn try_acquire(&self) -> bool {
        let decision = {
            let mut bucket = self.lock();
            let now = self.inner.clock.now();
            bucket.try_acquire(now)
        };

        match decision {
            AdmissionDecision::Admit => {
                self.inner.metrics.record_admitted();
                true
            }
            AdmissionDecision::Reject => {
                self.inner.metrics.record_rejected();
                tracing::debug!(
                    retry_after = ?self.time_until_refill(),
                    "rate limit exceeded"
                );
                false
            }
        }
    }

    /// Wrap `endpoint` so every call must first acquire a token.
    pub fn wrap<E>(&self, endpoint: E) -> RateLimited<E> {
        RateLimited {
            inner: endpoint,
            limiter: self.clone(),
        }
    }

    /// Tokens currently available.
    pub fn available(&self) -> u32 {
        let now = self.inner.clock.now();
        self.lock().available(now)
    }

    /// Time until the next token lands; zero if one is available now.
    pub fn time_until_refill(&self) -> Duration {
        let now = self.inner.clock.now();
        self.lock().time_until_refill(now)
    }

    pub fn capacity(&self) -> u32 {
        self.lock().capacity()
    }

    pub fn refill_interval(&self) -> Duration {
        self.lock().refill_interval()
    }

    /// Admission counters for this limiter.
    pub fn metrics(&self) -> &AdmissionMetrics {
        &self.inner.metrics
    }

    /// Refill the bucket to capacity.
    pub fn reset(&self) {
        let now = self.inner.clock.now();
        self.lock().reset(now);
    }

    /// Whether two handles share one bucket.
    pub fn ptr_eq(&self, other: &RateLimiter) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    fn lock(&self) -> MutexGuard<'_, TokenBucket> {
        // Bucket updates cannot panic midway, so a poisoned lock still holds
        // consistent state.
        self.inner
            .bucket
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Endpoint decorator enforcing a `RateLimiter`.
#[derive(Debug, Clone)]
pub struct RateLimited<E> {
    inner: E,
    limiter: RateLimiter,
}

impl<E> RateLimited<E> {
    pub fn new(inner: E, limiter: RateLimiter) -> Self {
        Self { inner, limiter }
    }

    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    pub fn into_inner(self) -> E {
        self.inner
    }
}

impl<Req, Resp, E> Endpoint<Req, Resp> for RateLimited<E>
where
    E: Endpoint<Req, Resp>,
{
    fn call(&self, ctx: &Context, request: Req) -> Result<Resp, EndpointError> {
        if !self.limiter.try_acquire() {
            return Err(EndpointError::RateLimitExceeded);
        }
        self.inner.call(ctx, request)
    }
}
