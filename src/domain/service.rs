//! The capability contract and its base implementation.

use crate::domain::error::{AuthError, ServiceError};
use crate::domain::operation::Operation;
use std::sync::Arc;

/// The business operations served by the pipeline.
///
/// Every middleware implements this trait in full and forwards each method to
/// the service it wraps. Adding a method here means adding it to every
/// middleware as well.
pub trait Service: Send + Sync {
    /// Sum of `a` and `b`.
    fn add(&self, a: i64, b: i64) -> i64;

    /// Difference `a - b`.
    fn subtract(&self, a: i64, b: i64) -> i64;

    /// Product of `a` and `b`.
    fn multiply(&self, a: i64, b: i64) -> i64;

    /// Quotient `a / b`, truncated toward zero.
    ///
    /// # Errors
    /// Returns `ServiceError::DivisionByZero` when `b == 0`.
    fn divide(&self, a: i64, b: i64) -> Result<i64, ServiceError>;

    /// Liveness signal.
    fn health_check(&self) -> bool;

    /// Validate credentials and issue an opaque session token.
    ///
    /// # Errors
    /// Returns an `AuthError` when the credentials are rejected.
    fn authenticate(&self, name: &str, secret: &str) -> Result<String, AuthError>;

    /// Run an arithmetic operation selected by discriminant.
    ///
    /// Only `divide` can fail; the other operations always return `Ok`.
    fn calculate(&self, op: Operation, a: i64, b: i64) -> Result<i64, ServiceError> {
        match op {
            Operation::Add => Ok(self.add(a, b)),
            Operation::Subtract => Ok(self.subtract(a, b)),
            Operation::Multiply => Ok(self.multiply(a, b)),
            Operation::Divide => self.divide(a, b),
        }
    }
}

impl<T: Service + ?Sized> Service for Arc<T> {
    fn add(&self, a: i64, b: i64) -> i64 {
        (**self).add(a, b)
    }

    fn subtract(&self, a: i64, b: i64) -> i64 {
        (**self).subtract(a, b)
    }

    fn multiply(&self, a: i64, b: i64) -> i64 {
        (**self).multiply(a, b)
    }

    fn divide(&self, a: i64, b: i64) -> Result<i64, ServiceError> {
        (**self).divide(a, b)
    }

    fn health_check(&self) -> bool {
        (**self).health_check()
    }

    fn authenticate(&self, name: &str, secret: &str) -> Result<String, AuthError> {
        (**self).authenticate(name, secret)
    }
}

/// Source of truth for credentials consulted by `authenticate`.
pub trait CredentialStore: Send + Sync {
    /// Check whether `secret` is valid for `name`.
    fn verify(&self, name: &str, secret: &str) -> bool;

    /// Issue a fresh session token for an already verified `name`.
    fn issue_token(&self, name: &str) -> String;
}

/// Base, undecorated service.
///
/// Integer arithmetic wraps on overflow rather than panicking, so every input
/// pair has a defined result.
#[derive(Debug, Clone)]
pub struct ArithmeticService<C> {
    credentials: C,
}

impl<C: CredentialStore> ArithmeticService<C> {
    /// Create a service that authenticates against `credentials`.
    pub fn new(credentials: C) -> Self {
        Self { credentials }
    }
}

impl<C: CredentialStore> Service for ArithmeticService<C> {
    fn add(&self, a: i64, b: i64) -> i64 {
        a.wrapping_add(b)
    }

    fn subtract(&self, a: i64, b: i64) -> i64 {
        a.wrapping_sub(b)
    }

    fn multiply(&self, a: i64, b: i64) -> i64 {
        a.wrapping_mul(b)
    }

    fn divide(&self, a: i64, b: i64) -> Result<i64, ServiceError> {
        if b == 0 {
            return Err(ServiceError::DivisionByZero);
        }
        Ok(a.wrapping_div(b))
    }

    fn health_check(&self) -> bool {
        true
    }

    fn authenticate(&self, name: &str, secret: &str) -> Result<String, AuthError> {
        if name.is_empty() || secret.is_empty() {
            return Err(AuthError::MissingCredentials);
        }
        if !self.credentials.verify(name, secret) {
            return Err(AuthError::InvalidCredentials);
        }
        Ok(self.credentials.issue_token(name))
    }
}
