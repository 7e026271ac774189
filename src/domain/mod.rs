//! Domain layer - pure business logic with no infrastructure dependencies.
//!
//! This layer contains the core concepts of the service:
//! - The capability contract (`Service`) and its base arithmetic implementation
//! - Operation discriminants
//! - The business and dispatch error taxonomy
//! - Token bucket accounting used for admission control
//!
//! All types in this layer are pure and easily testable.

pub mod error;
pub mod operation;
pub mod service;
pub mod token_bucket;
