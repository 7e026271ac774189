//! Service middleware: same-interface decorators with observable side effects.
//!
//! A middleware owns the next service in the chain and implements every
//! `Service` method by forwarding to it. Around each forwarded call it records
//! one observation: a structured log record (`LoggingMiddleware`) or a counter
//! increment plus latency sample (`MetricsMiddleware`).
//!
//! The observation is emitted from a drop guard, so it happens on every exit
//! path: normal return, business error, or panic unwinding through the call.
//! Results and errors are returned untouched.
//!
//! ## Ordering
//!
//! `ServiceBuilder` folds middlewares around a base service. The first layer
//! added is the outermost and runs first. Each layer's measured latency
//! includes every layer inside it plus the base call, so the reference chain
//!
//! ```text
//! metrics → logging → base service
//! ```
//!
//! reports metrics latency that covers logging, and log latency that covers
//! only the base service.

use crate::application::metrics::MetricsRegistry;
use crate::application::ports::Clock;
use crate::domain::error::{AuthError, ServiceError};
use crate::domain::service::Service;
use crate::infrastructure::clock::SystemClock;
use std::fmt::Display;
use std::sync::Arc;
use std::time::Instant;
use tracing::Dispatch;

/// Tracing target for access records emitted by `LoggingMiddleware`.
pub const ACCESS_TARGET: &str = "arithmetic_service::access";

/// Type-erased service, the unit `ServiceBuilder` composes.
pub type BoxService = Arc<dyn Service>;

/// A decorator factory: wraps one service in another.
pub trait Middleware: Send + Sync {
    /// Wrap `inner`, returning the decorated service.
    fn wrap(&self, inner: BoxService) -> BoxService;
}

impl<F> Middleware for F
where
    F: Fn(BoxService) -> BoxService + Send + Sync,
{
    fn wrap(&self, inner: BoxService) -> BoxService {
        self(inner)
    }
}

/// Builds a decorated service from an ordered list of middlewares.
///
/// # Example
/// ```
/// use arithmetic_service::{
///     ArithmeticService, LoggingLayer, MetricsLayer, MetricsRegistry, Service,
///     ServiceBuilder, StaticCredentialStore,
/// };
///
/// let registry = MetricsRegistry::new();
/// let svc = ServiceBuilder::new()
///     .layer(MetricsLayer::new(registry.clone())) // outermost
///     .layer(LoggingLayer::new())
///     .service(ArithmeticService::new(StaticCredentialStore::new()));
///
/// assert_eq!(svc.add(2, 3), 5);
/// assert_eq!(registry.request_count("add"), 1);
/// ```
#[derive(Default)]
pub struct ServiceBuilder {
    layers: Vec<Box<dyn Middleware>>,
}

impl ServiceBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a middleware. Earlier layers wrap later ones.
    pub fn layer(mut self, middleware: impl Middleware + 'static) -> Self {
        self.layers.push(Box::new(middleware));
        self
    }

    /// Number of layers added so far.
    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Fold the layers around `base`, innermost last.
    pub fn service<S: Service + 'static>(self, base: S) -> BoxService {
        self.layers
            .iter()
            .rev()
            .fold(Arc::new(base) as BoxService, |inner, layer| layer.wrap(inner))
    }
}

/// Operands recorded in an access log entry.
#[derive(Debug, Clone)]
enum Operands<'a> {
    Pair(i64, i64),
    Credentials(&'a str),
    Nothing,
}

/// Outcome rendered for an access log entry. `None` means the call unwound.
type Outcome = Option<Result<String, String>>;

macro_rules! access_log {
    ($outcome:expr, $took:expr, $($field:tt)*) => {
        match $outcome {
            Some(Ok(result)) => tracing::info!(
                target: ACCESS_TARGET, $($field)*, result = %result, took = ?$took, "call completed"
            ),
            Some(Err(error)) => tracing::warn!(
                target: ACCESS_TARGET, $($field)*, error = %error, took = ?$took, "call failed"
            ),
            None => tracing::error!(
                target: ACCESS_TARGET, $($field)*, took = ?$took, "call panicked"
            ),
        }
    };
}

/// Emits one access log record when dropped.
struct AccessRecord<'a> {
    operation: &'static str,
    operands: Operands<'a>,
    started: Instant,
    clock: &'a dyn Clock,
    dispatch: Option<&'a Dispatch>,
    outcome: Outcome,
}

impl AccessRecord<'_> {
    fn ok(&mut self, result: impl Display) {
        self.outcome = Some(Ok(result.to_string()));
    }

    fn finish<T: Display, E: Display>(&mut self, result: &Result<T, E>) {
        self.outcome = Some(match result {
            Ok(value) => Ok(value.to_string()),
            Err(e) => Err(e.to_string()),
        });
    }

    fn emit(&self) {
        let took = self.clock.now().saturating_duration_since(self.started);
        let operation = self.operation;
        match self.operands {
            Operands::Pair(a, b) => {
                access_log!(&self.outcome, took, operation, a, b)
            }
            Operands::Credentials(name) => {
                access_log!(&self.outcome, took, operation, name)
            }
            Operands::Nothing => access_log!(&self.outcome, took, operation),
        }
    }
}

impl Drop for AccessRecord<'_> {
    fn drop(&mut self) {
        match self.dispatch {
            Some(dispatch) => tracing::dispatcher::with_default(dispatch, || self.emit()),
            None => self.emit(),
        }
    }
}

/// Middleware that writes one structured log record per call.
///
/// Records go to the `arithmetic_service::access` target with fields
/// `operation`, the operands (`a`/`b`, or `name` for authentication),
/// `result` or `error`, and `took`. Successful calls log at INFO, business
/// errors at WARN, and calls that unwind at ERROR. Session tokens are never
/// logged.
#[derive(Debug, Clone)]
pub struct LoggingMiddleware<S> {
    inner: S,
    clock: Arc<dyn Clock>,
    dispatch: Option<Dispatch>,
}

impl<S: Service> LoggingMiddleware<S> {
    /// Log through the thread's current default subscriber.
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            clock: Arc::new(SystemClock::new()),
            dispatch: None,
        }
    }

    /// Measure elapsed time with `clock`.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Send every record to `dispatch` instead of the thread's default subscriber.
    pub fn with_dispatch(mut self, dispatch: Dispatch) -> Self {
        self.dispatch = Some(dispatch);
        self
    }

    fn record<'a>(&'a self, operation: &'static str, operands: Operands<'a>) -> AccessRecord<'a> {
        AccessRecord {
            operation,
            operands,
            started: self.clock.now(),
            clock: self.clock.as_ref(),
            dispatch: self.dispatch.as_ref(),
            outcome: None,
        }
    }
}

impl<S: Service> Service for LoggingMiddleware<S> {
    fn add(&self, a: i64, b: i64) -> i64 {
        let mut record = self.record("add", Operands::Pair(a, b));
        let result = self.inner.add(a, b);
        record.ok(result);
        result
    }

    fn subtract(&self, a: i64, b: i64) -> i64 {
        let mut record = self.record("subtract", Operands::Pair(a, b));
        let result = self.inner.subtract(a, b);
        record.ok(result);
        result
    }

    fn multiply(&self, a: i64, b: i64) -> i64 {
        let mut record = self.record("multiply", Operands::Pair(a, b));
        let result = self.inner.multiply(a, b);
        record.ok(result);
        result
    }

    fn divide(&self, a: i64, b: i64) -> Result<i64, ServiceError> {
        let mut record = self.record("divide", Operands::Pair(a, b));
        let result = self.inner.divide(a, b);
        record.finish(&result);
        result
    }

    fn health_check(&self) -> bool {
        let mut record = self.record("health_check", Operands::Nothing);
        let result = self.inner.health_check();
        record.ok(result);
        result
    }

    fn authenticate(&self, name: &str, secret: &str) -> Result<String, AuthError> {
        let mut record = self.record("authenticate", Operands::Credentials(name));
        let result = self.inner.authenticate(name, secret);
        record.finish(&result.as_ref().map(|_| "authenticated"));
        result
    }
}

/// Records one latency sample into the registry when dropped.
struct LatencyRecord<'a> {
    operation: &'static str,
    started: Instant,
    clock: &'a dyn Clock,
    registry: &'a MetricsRegistry,
}

impl Drop for LatencyRecord<'_> {
    fn drop(&mut self) {
        let elapsed = self.clock.now().saturating_duration_since(self.started);
        self.registry.observe(self.operation, elapsed);
    }
}

/// Middleware that counts requests and records latency per operation.
///
/// Failed calls are counted exactly like successful ones.
#[derive(Debug, Clone)]
pub struct MetricsMiddleware<S> {
    inner: S,
    registry: MetricsRegistry,
    clock: Arc<dyn Clock>,
}

impl<S: Service> MetricsMiddleware<S> {
    pub fn new(inner: S, registry: MetricsRegistry) -> Self {
        Self {
            inner,
            registry,
            clock: Arc::new(SystemClock::new()),
        }
    }

    /// Measure elapsed time with `clock`.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    fn record(&self, operation: &'static str) -> LatencyRecord<'_> {
        LatencyRecord {
            operation,
            started: self.clock.now(),
            clock: self.clock.as_ref(),
            registry: &self.registry,
        }
    }
}

impl<S: Service> Service for MetricsMiddleware<S> {
    fn add(&self, a: i64, b: i64) -> i64 {
        let _record = self.record("add");
        self.inner.add(a, b)
    }

    fn subtract(&self, a: i64, b: i64) -> i64 {
        let _record = self.record("subtract");
        self.inner.subtract(a, b)
    }

    fn multiply(&self, a: i64, b: i64) -> i64 {
        let _record = self.record("multiply");
        self.inner.multiply(a, b)
    }

    fn divide(&self, a: i64, b: i64) -> Result<i64, ServiceError> {
        let _record = self.record("divide");
        self.inner.divide(a, b)
    }

    fn health_check(&self) -> bool {
        let _record = self.record("health_check");
        self.inner.health_check()
    }

    fn authenticate(&self, name: &str, secret: &str) -> Result<String, AuthError> {
        let _record = self.record("authenticate");
        self.inner.authenticate(name, secret)
    }
}

/// Factory for `LoggingMiddleware`.
#[derive(Debug, Clone)]
pub struct LoggingLayer {
    clock: Arc<dyn Clock>,
    dispatch: Option<Dispatch>,
}

impl LoggingLayer {
    pub fn new() -> Self {
        Self {
            clock: Arc::new(SystemClock::new()),
            dispatch: None,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_dispatch(mut self, dispatch: Dispatch) -> Self {
        self.dispatch = Some(dispatch);
        self
    }
}

impl Default for LoggingLayer {
    fn default() -> Self {
        Self::new()
    }
}

impl Middleware for LoggingLayer {
    fn wrap(&self, inner: BoxService) -> BoxService {
        let mut middleware = LoggingMiddleware::new(inner).with_clock(self.clock.clone());
        if let Some(dispatch) = &self.dispatch {
            middleware = middleware.with_dispatch(dispatch.clone());
        }
        Arc::new(middleware)
    }
}

/// Factory for `MetricsMiddleware`.
#[derive(Debug, Clone)]
pub struct MetricsLayer {
    registry: MetricsRegistry,
    clock: Arc<dyn Clock>,
}

impl MetricsLayer {
    pub fn new(registry: MetricsRegistry) -> Self {
        Self {
            registry,
            clock: Arc::new(SystemClock::new()),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }
}

impl Middleware for MetricsLayer {
    fn wrap(&self, inner: BoxService) -> BoxService {
        Arc::new(MetricsMiddleware::new(inner, self.registry.clone()).with_clock(self.clock.clone()))
    }
}
