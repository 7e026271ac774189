//! Token bucket accounting for admission control.
//!
//! The bucket itself is plain data: callers supply the current instant and
//! provide their own synchronization. See `RateLimiter` for the shared,
//! thread-safe wrapper.

use std::fmt;
use std::time::{Duration, Instant};

/// Decision made by the token bucket for one invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdmissionDecision {
    /// A token was consumed; the invocation may proceed
    Admit,
    /// No token was available; the invocation is rejected
    Reject,
}

impl AdmissionDecision {
    /// Check if this decision is Admit.
    pub fn is_admit(&self) -> bool {
        matches!(self, AdmissionDecision::Admit)
    }

    /// Check if this decision is Reject.
    pub fn is_reject(&self) -> bool {
        matches!(self, AdmissionDecision::Reject)
    }
}

/// Error returned when token bucket parameters are invalid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenBucketError {
    /// Capacity must be greater than zero
    ZeroCapacity,
    /// Refill amount must be greater than zero
    ZeroRefillAmount,
    /// Refill interval must be greater than zero
    ZeroRefillInterval,
    /// Refill interval must fit in `u64` nanoseconds
    RefillIntervalTooLong,
}

impl fmt::Display for TokenBucketError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenBucketError::ZeroCapacity => write!(f, "capacity must be greater than 0"),
            TokenBucketError::ZeroRefillAmount => {
                write!(f, "refill amount must be greater than 0")
            }
            TokenBucketError::ZeroRefillInterval => {
                write!(f, "refill interval must be greater than 0")
            }
            TokenBucketError::RefillIntervalTooLong => {
                write!(f, "refill interval must not exceed {} ns", u64::MAX)
            }
        }
    }
}

impl std::error::Error for TokenBucketError {}

/// Token bucket with discrete refills.
///
/// Starts full with `capacity` tokens. Every whole `refill_interval` that
/// elapses adds `refill_amount` tokens, never exceeding `capacity`. Partial
/// intervals carry over while the bucket is below capacity; once it is full
/// the refill schedule restarts from the moment of the next refill check. The
/// number of admissions in any window of length `t`, wherever it starts, is
/// bounded by `capacity + floor(t / refill_interval) * refill_amount`.
///
/// # Example
/// ```
/// use arithmetic_service::TokenBucket;
/// use std::time::{Duration, Instant};
///
/// let start = Instant::now();
/// let mut bucket = TokenBucket::new(3, 1, Duration::from_secs(4), start).unwrap();
///
/// assert!(bucket.try_acquire(start).is_admit());
/// assert!(bucket.try_acquire(start).is_admit());
/// assert!(bucket.try_acquire(start).is_admit());
/// assert!(bucket.try_acquire(start).is_reject());
///
/// // One interval later a single token is back
/// let later = start + Duration::from_secs(4);
/// assert!(bucket.try_acquire(later).is_admit());
/// assert!(bucket.try_acquire(later).is_reject());
/// ```
#[derive(Debug, Clone)]
pub struct TokenBucket {
    capacity: u32,
    refill_amount: u32,
    refill_interval: Duration,
    tokens: u32,
    last_refill: Instant,
}

impl TokenBucket {
    /// Create a full bucket.
    ///
    /// # Arguments
    /// * `capacity` - Maximum tokens held, and the initial burst size
    /// * `refill_amount` - Tokens added per elapsed interval
    /// * `refill_interval` - Length of one refill interval
    /// * `now` - Instant the refill schedule starts from
    ///
    /// # Errors
    /// Returns `TokenBucketError` if any parameter is zero.
    pub fn new(
        capacity: u32,
        refill_amount: u32,
        refill_interval: Duration,
        now: Instant,
    ) -> Result<Self, TokenBucketError> {
        if capacity == 0 {
            return Err(TokenBucketError::ZeroCapacity);
        }
        if refill_amount == 0 {
            return Err(TokenBucketError::ZeroRefillAmount);
        }
        if refill_interval.is_zero() {
            return Err(TokenBucketError::ZeroRefillInterval);
        }
        if u64::try_from(refill_interval.as_nanos()).is_err() {
            return Err(TokenBucketError::RefillIntervalTooLong);
        }
        Ok(Self {
            capacity,
            refill_amount,
            refill_interval,
            tokens: capacity,
            last_refill: now,
        })
    }

    /// Try to consume one token at `now`. Never blocks.
    pub fn try_acquire(&mut self, now: Instant) -> AdmissionDecision {
        self.refill(now);
        if self.tokens > 0 {
            self.tokens -= 1;
            AdmissionDecision::Admit
        } else {
            AdmissionDecision::Reject
        }
    }

    /// Tokens available at `now`.
    pub fn available(&mut self, now: Instant) -> u32 {
        self.refill(now);
        self.tokens
    }

    /// Time from `now` until the next refill lands.
    ///
    /// Zero when a token is already available.
    pub fn time_until_refill(&mut self, now: Instant) -> Duration {
        self.refill(now);
        if self.tokens > 0 {
            return Duration::ZERO;
        }
        let elapsed = now.saturating_duration_since(self.last_refill);
        self.refill_interval.saturating_sub(elapsed)
    }

    /// Restore the bucket to full capacity and restart the refill schedule.
    pub fn reset(&mut self, now: Instant) {
        self.tokens = self.capacity;
        self.last_refill = now;
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    pub fn refill_amount(&self) -> u32 {
        self.refill_amount
    }

    pub fn refill_interval(&self) -> Duration {
        self.refill_interval
    }

    fn refill(&mut self, now: Instant) {
        // A full bucket banks no time toward the next refill.
        if self.tokens >= self.capacity {
            self.last_refill = self.last_refill.max(now);
            return;
        }

        let elapsed = now.saturating_duration_since(self.last_refill);
        let interval_nanos = self.refill_interval.as_nanos();
        let intervals = elapsed.as_nanos() / interval_nanos;
        if intervals == 0 {
            return;
        }

        let added = intervals.saturating_mul(u128::from(self.refill_amount));
        let total = u128::from(self.tokens).saturating_add(added);
        if total >= u128::from(self.capacity) {
            self.tokens = self.capacity;
            self.last_refill = now;
            return;
        }
        self.tokens = total as u32;

        // Advance by whole intervals only; the remainder counts toward the next refill.
        let remainder = elapsed.as_nanos() % interval_nanos;
        let remainder = u64::try_from(remainder).unwrap_or(u64::MAX);
        self.last_refill = now - Duration::from_nanos(remainder);
    }
}
