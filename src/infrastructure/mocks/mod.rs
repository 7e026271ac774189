//! Test doubles for the clock and the log sink.

pub mod clock;
pub mod layer;

pub use clock::MockClock;
pub use layer::{CapturedEvent, MockCaptureLayer};
