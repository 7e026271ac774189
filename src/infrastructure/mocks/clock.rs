//! Manually driven clock.

use crate::application::ports::Clock;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

/// Clock that only moves when told to.
///
/// Clones share one time value, so a test can hand a clone to a limiter or
/// middleware and advance it from outside.
///
/// ```
/// use arithmetic_service::application::ports::Clock;
/// use arithmetic_service::infrastructure::mocks::MockClock;
/// use std::time::{Duration, Instant};
///
/// let start = Instant::now();
/// let clock = MockClock::new(start);
/// let shared = clock.clone();
///
/// shared.advance(Duration::from_secs(4));
/// assert_eq!(clock.now(), start + Duration::from_secs(4));
/// ```
#[derive(Debug, Clone)]
pub struct MockClock {
    current_time: Arc<Mutex<Instant>>,
}

impl MockClock {
    pub fn new(start: Instant) -> Self {
        Self {
            current_time: Arc::new(Mutex::new(start)),
        }
    }

    /// Move time forward by `duration`.
    pub fn advance(&self, duration: Duration) {
        *self.time() += duration;
    }

    /// Jump to `instant`.
    pub fn set(&self, instant: Instant) {
        *self.time() = instant;
    }

    fn time(&self) -> MutexGuard<'_, Instant> {
        self.current_time
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Clock for MockClock {
    fn now(&self) -> Instant {
        *self.time()
    }
}
