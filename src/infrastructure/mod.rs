//! Infrastructure layer: adapters for time, credentials and the wire.

pub mod clock;
pub mod credentials;
pub mod transport;

/// Test doubles for the clock and the log sink.
///
/// Available in test builds and with the `test-helpers` feature:
/// ```toml
/// [dev-dependencies]
/// arithmetic-service = { version = "*", features = ["test-helpers"] }
/// ```
#[cfg(any(test, feature = "test-helpers"))]
pub mod mocks;
