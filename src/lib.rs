//! # arithmetic-service
//!
//! A small arithmetic and authentication service wrapped in composable
//! cross-cutting layers: structured access logging, per-operation metrics,
//! and a shared token-bucket rate limiter in front of its endpoints.
//!
//! ## Quick Start
//!
//! ```rust
//! use arithmetic_service::{
//!     ArithmeticRequest, ArithmeticService, Context, Pipeline, PipelineConfig, Response,
//!     StaticCredentialStore,
//! };
//!
//! let credentials = StaticCredentialStore::from_pairs([("alice", "s3cret")]);
//! let pipeline = Pipeline::new(ArithmeticService::new(credentials), &PipelineConfig::default())
//!     .expect("valid config");
//!
//! let response = pipeline
//!     .call(&Context::background(), ArithmeticRequest::new("Add", 2, 3))
//!     .unwrap();
//! match response {
//!     Response::Arithmetic(r) => assert_eq!(r.result, 5),
//!     other => panic!("unexpected {:?}", other),
//! }
//! assert_eq!(pipeline.metrics().request_count("add"), 1);
//! ```
//!
//! ## Layers
//!
//! ```text
//! wire request → decode → RateLimited endpoint → metrics → logging → service
//! ```
//!
//! - **Service** (`Service`, `ArithmeticService`): add, subtract, multiply,
//!   divide, health check and authenticate. Division by zero and bad
//!   credentials are business errors, not endpoint failures.
//! - **Middleware** (`LoggingMiddleware`, `MetricsMiddleware`): decorators with
//!   the same interface as the service. Each records exactly one observation
//!   per call, including calls that fail or panic. `ServiceBuilder` orders
//!   them; the first layer added is the outermost.
//! - **Endpoints** (`ArithmeticEndpoint`, `HealthEndpoint`, `AuthEndpoint`):
//!   uniform `call(&Context, Request) -> Result<Response, EndpointError>`.
//!   Unknown operation names fail with `EndpointError::InvalidRequestType`.
//! - **Rate limiting** (`RateLimiter`, `RateLimited`): one token bucket shared
//!   by every endpoint it wraps. Calls beyond the budget fail immediately with
//!   `EndpointError::RateLimitExceeded`; nothing is queued or retried.
//! - **Transport** (`infrastructure::transport`): an `axum` router for the
//!   `/calculate/{type}/{a}/{b}`, `/health`, `/login` and `/metrics` routes.
//!
//! ## Custom composition
//!
//! ```rust
//! use arithmetic_service::{
//!     ArithmeticEndpoint, ArithmeticRequest, ArithmeticService, Context, Endpoint,
//!     EndpointError, LoggingLayer, MetricsLayer, MetricsRegistry, RateLimiter,
//!     ServiceBuilder, StaticCredentialStore,
//! };
//! use std::time::Duration;
//!
//! let registry = MetricsRegistry::new();
//! let service = ServiceBuilder::new()
//!     .layer(MetricsLayer::new(registry.clone()))
//!     .layer(LoggingLayer::new())
//!     .service(ArithmeticService::new(StaticCredentialStore::new()));
//!
//! let limiter = RateLimiter::builder()
//!     .with_capacity(1)
//!     .with_refill_interval(Duration::from_secs(60))
//!     .build()
//!     .expect("valid limiter");
//! let endpoint = limiter.wrap(ArithmeticEndpoint::new(service));
//!
//! let ctx = Context::background();
//! assert!(endpoint.call(&ctx, ArithmeticRequest::new("multiply", 6, 7)).is_ok());
//! assert_eq!(
//!     endpoint.call(&ctx, ArithmeticRequest::new("multiply", 6, 7)),
//!     Err(EndpointError::RateLimitExceeded)
//! );
//! ```
//!
//! ## Logging
//!
//! Access records are `tracing` events on the `arithmetic_service::access`
//! target. Install any subscriber to see them:
//!
//! ```rust,no_run
//! tracing_subscriber::fmt()
//!     .with_max_level(tracing::Level::DEBUG)
//!     .init();
//! ```

// Domain layer - pure business logic
pub mod domain;

// Application layer - composition
pub mod application;

// Infrastructure layer - external adapters
pub mod infrastructure;

pub use domain::{
    error::{AuthError, EndpointError, ServiceError},
    operation::Operation,
    service::{ArithmeticService, CredentialStore, Service},
    token_bucket::{AdmissionDecision, TokenBucket, TokenBucketError},
};

pub use application::{
    config::{BuildError, PipelineConfig},
    endpoint::{
        ArithmeticEndpoint, ArithmeticRequest, ArithmeticResponse, AuthEndpoint, AuthRequest,
        AuthResponse, BoxEndpoint, Context, Endpoint, Endpoints, HealthEndpoint, HealthRequest,
        HealthResponse, Request, Response,
    },
    limiter::{RateLimited, RateLimiter, RateLimiterBuilder},
    metrics::{
        AdmissionMetrics, AdmissionSnapshot, LatencySummary, MetricsRegistry,
        MetricsRegistryBuilder, MetricsSnapshot,
    },
    middleware::{
        BoxService, LoggingLayer, LoggingMiddleware, MetricsLayer, MetricsMiddleware, Middleware,
        ServiceBuilder, ACCESS_TARGET,
    },
    pipeline::{Pipeline, PipelineBuilder},
    ports::Clock,
};

pub use infrastructure::{
    clock::SystemClock,
    credentials::StaticCredentialStore,
    transport::router,
};
