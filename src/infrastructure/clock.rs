//! Wall-clock adapter for the `Clock` port.
//!
//! `MockClock` (in `crate::infrastructure::mocks`) replaces it in tests and is
//! available to integration tests through the `test-helpers` feature.

use crate::application::ports::Clock;
use std::time::Instant;

/// Monotonic clock backed by `Instant::now()`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl SystemClock {
    pub fn new() -> Self {
        Self
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}
