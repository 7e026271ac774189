//! Error taxonomy.
//!
//! Business errors (`ServiceError`, `AuthError`) are expected outcomes and ride
//! inside successful endpoint responses. `EndpointError` is what an endpoint
//! call itself fails with: dispatch, admission and decode failures.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Business error from an arithmetic operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ServiceError {
    /// The divisor was zero
    DivisionByZero,
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceError::DivisionByZero => write!(f, "the divisor can not be zero"),
        }
    }
}

impl std::error::Error for ServiceError {}

/// Business error from the authentication operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuthError {
    /// Name or secret was empty
    MissingCredentials,
    /// Name unknown or secret mismatched
    InvalidCredentials,
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthError::MissingCredentials => write!(f, "name and password are required"),
            AuthError::InvalidCredentials => write!(f, "invalid name or password"),
        }
    }
}

impl std::error::Error for AuthError {}

/// Failure of an endpoint invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EndpointError {
    /// The operation discriminant matched no known operation
    InvalidRequestType(String),
    /// The admission controller had no token available
    RateLimitExceeded,
    /// Wire input could not be decoded into a typed request
    MalformedRequest(String),
}

impl fmt::Display for EndpointError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EndpointError::InvalidRequestType(kind) => {
                write!(f, "invalid request type: {:?}", kind)
            }
            EndpointError::RateLimitExceeded => write!(f, "rate limit exceeded"),
            EndpointError::MalformedRequest(reason) => {
                write!(f, "malformed request: {}", reason)
            }
        }
    }
}

impl std::error::Error for EndpointError {}

impl From<serde_json::Error> for EndpointError {
    fn from(e: serde_json::Error) -> Self {
        EndpointError::MalformedRequest(e.to_string())
    }
}

impl From<std::num::ParseIntError> for EndpointError {
    fn from(e: std::num::ParseIntError) -> Self {
        EndpointError::MalformedRequest(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        assert_eq!(
            ServiceError::DivisionByZero.to_string(),
            "the divisor can not be zero"
        );
        assert_eq!(
            EndpointError::InvalidRequestType("power".into()).to_string(),
            "invalid request type: \"power\""
        );
        assert_eq!(
            EndpointError::RateLimitExceeded.to_string(),
            "rate limit exceeded"
        );
    }

    #[test]
    fn test_parse_int_error_becomes_malformed() {
        let err: EndpointError = "x1".parse::<i64>().unwrap_err().into();
        assert!(matches!(err, EndpointError::MalformedRequest(_)));
    }
}
