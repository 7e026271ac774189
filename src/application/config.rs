//! Pipeline configuration and build errors.

use crate::domain::token_bucket::TokenBucketError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Error returned when building a limiter, registry or pipeline fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildError {
    /// Token bucket parameters were rejected
    TokenBucket(TokenBucketError),
    /// Metric namespace or subsystem is not a valid Prometheus name component
    InvalidMetricName(String),
    /// Metric collectors could not be created or registered
    Metrics(String),
}

impl fmt::Display for BuildError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildError::TokenBucket(e) => write!(f, "token bucket configuration error: {}", e),
            BuildError::InvalidMetricName(name) => {
                write!(f, "invalid metric name component: {:?}", name)
            }
            BuildError::Metrics(msg) => write!(f, "metrics registration error: {}", msg),
        }
    }
}

impl std::error::Error for BuildError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            BuildError::TokenBucket(e) => Some(e),
            BuildError::InvalidMetricName(_) | BuildError::Metrics(_) => None,
        }
    }
}

impl From<TokenBucketError> for BuildError {
    fn from(e: TokenBucketError) -> Self {
        BuildError::TokenBucket(e)
    }
}

impl From<prometheus::Error> for BuildError {
    fn from(e: prometheus::Error) -> Self {
        BuildError::Metrics(e.to_string())
    }
}

/// Settings for assembling a `Pipeline`.
///
/// Every field has a default, so a partial document such as
/// `{"capacity": 10}` is valid.
///
/// # Example
/// ```
/// use arithmetic_service::PipelineConfig;
/// use std::time::Duration;
///
/// let config = PipelineConfig::from_json(r#"{"capacity": 10, "refill_interval_ms": 500}"#).unwrap();
/// assert_eq!(config.capacity, 10);
/// assert_eq!(config.refill_amount, 1);
/// assert_eq!(config.refill_interval(), Duration::from_millis(500));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Token bucket capacity (burst size)
    pub capacity: u32,
    /// Tokens added per refill interval
    pub refill_amount: u32,
    /// Refill interval in milliseconds
    pub refill_interval_ms: u64,
    /// Metric name namespace
    pub namespace: String,
    /// Metric name subsystem
    pub subsystem: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            capacity: 3,
            refill_amount: 1,
            refill_interval_ms: 4_000,
            namespace: "arithmetic".to_string(),
            subsystem: "service".to_string(),
        }
    }
}

impl PipelineConfig {
    /// Parse a JSON configuration document.
    pub fn from_json(input: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(input)
    }

    pub fn refill_interval(&self) -> Duration {
        Duration::from_millis(self.refill_interval_ms)
    }
}
