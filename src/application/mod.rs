//! Application layer: composition around the domain service.
//!
//! - Service middleware (logging, metrics) and the builder that orders it
//! - Endpoint adapters and the shared rate limiter in front of them
//! - Metrics registry and pipeline assembly
//!
//! ## Ports
//!
//! `ports` holds the traits infrastructure adapters implement, so this layer
//! never names a concrete clock.

pub mod config;
pub mod endpoint;
pub mod limiter;
pub mod metrics;
pub mod middleware;
pub mod pipeline;
pub mod ports;
