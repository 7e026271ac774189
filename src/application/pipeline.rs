//! Assembly of the reference topology.
//!
//! ```text
//! arithmetic ─┐
//!             ├─ RateLimited (one shared bucket) ─┐
//! auth ───────┘                                   ├─ metrics → logging → base
//! health ─────────────────────────────────────────┘
//! ```

use crate::application::config::{BuildError, PipelineConfig};
use crate::application::endpoint::{
    ArithmeticEndpoint, AuthEndpoint, Context, Endpoint, Endpoints, HealthEndpoint, Request,
    Response,
};
use crate::application::limiter::RateLimiter;
use crate::application::metrics::MetricsRegistry;
use crate::application::middleware::{BoxService, LoggingLayer, MetricsLayer, ServiceBuilder};
use crate::application::ports::Clock;
use crate::domain::error::EndpointError;
use crate::domain::service::Service;
use crate::infrastructure::clock::SystemClock;
use std::fmt;
use std::sync::Arc;
use tracing::Dispatch;

/// A decorated service with its endpoints, limiter and metrics.
///
/// # Example
/// ```
/// use arithmetic_service::{
///     ArithmeticRequest, ArithmeticService, Context, EndpointError, Pipeline,
///     PipelineConfig, Response, StaticCredentialStore,
/// };
///
/// let pipeline = Pipeline::new(
///     ArithmeticService::new(StaticCredentialStore::new()),
///     &PipelineConfig::default(),
/// )
/// .unwrap();
/// let ctx = Context::background();
///
/// for _ in 0..3 {
///     assert!(pipeline.call(&ctx, ArithmeticRequest::new("add", 2, 3)).is_ok());
/// }
/// assert_eq!(
///     pipeline.call(&ctx, ArithmeticRequest::new("add", 2, 3)),
///     Err(EndpointError::RateLimitExceeded)
/// );
/// ```
#[derive(Clone)]
pub struct Pipeline {
    service: BoxService,
    endpoints: Endpoints,
    metrics: MetricsRegistry,
    limiter: RateLimiter,
}

/// Builder for `Pipeline`.
#[derive(Debug, Clone)]
pub struct PipelineBuilder {
    config: PipelineConfig,
    clock: Option<Arc<dyn Clock>>,
    dispatch: Option<Dispatch>,
}

impl PipelineBuilder {
    /// Drive the limiter and both latency measurements from `clock`.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Send access log records to `dispatch`.
    pub fn with_dispatch(mut self, dispatch: Dispatch) -> Self {
        self.dispatch = Some(dispatch);
        self
    }

    /// Wrap `base` and build the endpoints.
    ///
    /// # Errors
    /// Returns `BuildError` if the limiter or metric names are invalid.
    pub fn build<S: Service + 'static>(self, base: S) -> Result<Pipeline, BuildError> {
        let config = self.config;
        let clock = self
            .clock
            .unwrap_or_else(|| Arc::new(SystemClock::new()));

        let metrics = MetricsRegistry::builder()
            .with_namespace(config.namespace.clone())
            .with_subsystem(config.subsystem.clone())
            .build()?;

        let limiter = RateLimiter::builder()
            .with_capacity(config.capacity)
            .with_refill_amount(config.refill_amount)
            .with_refill_interval(config.refill_interval())
            .with_clock(clock.clone())
            .build()?;

        let mut logging = LoggingLayer::new().with_clock(clock.clone());
        if let Some(dispatch) = self.dispatch {
            logging = logging.with_dispatch(dispatch);
        }

        let service = ServiceBuilder::new()
            .layer(MetricsLayer::new(metrics.clone()).with_clock(clock))
            .layer(logging)
            .service(base);

        let endpoints = Endpoints {
            arithmetic: Arc::new(limiter.wrap(ArithmeticEndpoint::new(service.clone()))),
            health: Arc::new(HealthEndpoint::new(service.clone())),
            auth: Arc::new(limiter.wrap(AuthEndpoint::new(service.clone()))),
        };

        tracing::debug!(
            capacity = config.capacity,
            refill_amount = config.refill_amount,
            refill_interval = ?config.refill_interval(),
            "pipeline assembled"
        );

        Ok(Pipeline {
            service,
            endpoints,
            metrics,
            limiter,
        })
    }
}

impl Pipeline {
    /// Build the reference topology around `base`.
    pub fn new<S: Service + 'static>(base: S, config: &PipelineConfig) -> Result<Self, BuildError> {
        Self::builder(config.clone()).build(base)
    }

    pub fn builder(config: PipelineConfig) -> PipelineBuilder {
        PipelineBuilder {
            config,
            clock: None,
            dispatch: None,
        }
    }

    /// Dispatch a request to its endpoint.
    pub fn call(&self, ctx: &Context, request: impl Into<Request>) -> Result<Response, EndpointError> {
        self.endpoints.call(ctx, request.into())
    }

    /// The decorated service, bypassing endpoints and the limiter.
    pub fn service(&self) -> &BoxService {
        &self.service
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    pub fn metrics(&self) -> &MetricsRegistry {
        &self.metrics
    }

    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("metrics", &self.metrics)
            .field("limiter", &self.limiter)
            .finish_non_exhaustive()
    }
}
