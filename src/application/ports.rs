//! Ports (interfaces) for the application layer.
//!
//! In hexagonal architecture, ports define the interfaces that the application
//! layer needs. Infrastructure adapters implement these ports.
//!
//! The credential store port lives next to the service contract that consumes
//! it, in `crate::domain::service`.

use std::fmt::Debug;
use std::time::Instant;

/// Port for obtaining current time.
///
/// This abstraction lets the rate limiter and the instrumentation middleware
/// work with time without depending on the system clock directly.
/// Infrastructure provides concrete implementations (SystemClock, MockClock).
pub trait Clock: Send + Sync + Debug {
    /// Get the current instant.
    fn now(&self) -> Instant;
}

