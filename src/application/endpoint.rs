//! Endpoint adapters: one uniform call shape per endpoint family.
//!
//! An endpoint turns `(context, request)` into `Result<response, EndpointError>`
//! by dispatching to a `Service`. Dispatch failures (an unknown operation
//! discriminant) fail the call. Business failures (division by zero, rejected
//! credentials) succeed at the endpoint level and are reported inside the
//! response payload, so transport error handlers and response encoders each
//! see exactly one kind of failure.

use crate::domain::error::{EndpointError, ServiceError};
use crate::domain::operation::Operation;
use crate::domain::service::Service;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Per-call context supplied by the transport.
///
/// The deadline is advisory: endpoints and services never check it, but a
/// transport may use `is_expired` to abandon a response.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Context {
    deadline: Option<Instant>,
}

impl Context {
    /// Context with no deadline.
    pub fn background() -> Self {
        Self::default()
    }

    pub fn with_deadline(deadline: Instant) -> Self {
        Self {
            deadline: Some(deadline),
        }
    }

    /// Context whose deadline is `timeout` from now.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self::with_deadline(Instant::now() + timeout)
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Whether the deadline, if any, has passed at `now`.
    pub fn is_expired_at(&self, now: Instant) -> bool {
        self.deadline.is_some_and(|deadline| now >= deadline)
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Instant::now())
    }
}

/// The uniform invocation signature.
pub trait Endpoint<Req, Resp>: Send + Sync {
    /// Handle one request.
    ///
    /// # Errors
    /// Returns an `EndpointError` for dispatch and admission failures. Business
    /// errors are reported inside `Resp`.
    fn call(&self, ctx: &Context, request: Req) -> Result<Resp, EndpointError>;
}

impl<Req, Resp, F> Endpoint<Req, Resp> for F
where
    F: Fn(&Context, Req) -> Result<Resp, EndpointError> + Send + Sync,
{
    fn call(&self, ctx: &Context, request: Req) -> Result<Resp, EndpointError> {
        self(ctx, request)
    }
}

/// Shared, type-erased endpoint.
pub type BoxEndpoint<Req, Resp> = Arc<dyn Endpoint<Req, Resp>>;

/// Arithmetic request: operation discriminant plus two operands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArithmeticRequest {
    /// Case-insensitive operation name: add, subtract, multiply or divide
    pub request_type: String,
    pub a: i64,
    pub b: i64,
}

impl ArithmeticRequest {
    pub fn new(request_type: impl Into<String>, a: i64, b: i64) -> Self {
        Self {
            request_type: request_type.into(),
            a,
            b,
        }
    }
}

/// Arithmetic response. `error` carries business failures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArithmeticResponse {
    #[serde(rename = "Result")]
    pub result: i64,
    pub error: Option<ServiceError>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthRequest;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: bool,
}

/// Login request as sent on the wire.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthRequest {
    pub name: String,
    pub pwd: String,
}

impl AuthRequest {
    pub fn new(name: impl Into<String>, pwd: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            pwd: pwd.into(),
        }
    }
}

impl std::fmt::Debug for AuthRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthRequest")
            .field("name", &self.name)
            .field("pwd", &"<redacted>")
            .finish()
    }
}

/// Login response. On failure `success` is false and `error` holds the reason;
/// on success `token` holds the session token and `error` is empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthResponse {
    pub success: bool,
    #[serde(default)]
    pub token: String,
    #[serde(default)]
    pub error: String,
}

/// Dispatches arithmetic requests by discriminant.
#[derive(Debug, Clone)]
pub struct ArithmeticEndpoint<S> {
    service: S,
}

impl<S: Service> ArithmeticEndpoint<S> {
    pub fn new(service: S) -> Self {
        Self { service }
    }
}

impl<S: Service> Endpoint<ArithmeticRequest, ArithmeticResponse> for ArithmeticEndpoint<S> {
    fn call(
        &self,
        _ctx: &Context,
        request: ArithmeticRequest,
    ) -> Result<ArithmeticResponse, EndpointError> {
        let op: Operation = request.request_type.parse()?;
        let response = match self.service.calculate(op, request.a, request.b) {
            Ok(result) => ArithmeticResponse {
                result,
                error: None,
            },
            Err(e) => ArithmeticResponse {
                result: 0,
                error: Some(e),
            },
        };
        Ok(response)
    }
}

/// Fixed binding to `Service::health_check`.
#[derive(Debug, Clone)]
pub struct HealthEndpoint<S> {
    service: S,
}

impl<S: Service> HealthEndpoint<S> {
    pub fn new(service: S) -> Self {
        Self { service }
    }
}

impl<S: Service> Endpoint<HealthRequest, HealthResponse> for HealthEndpoint<S> {
    fn call(&self, _ctx: &Context, _request: HealthRequest) -> Result<HealthResponse, EndpointError> {
        Ok(HealthResponse {
            status: self.service.health_check(),
        })
    }
}

/// Fixed binding to `Service::authenticate`.
#[derive(Debug, Clone)]
pub struct AuthEndpoint<S> {
    service: S,
}

impl<S: Service> AuthEndpoint<S> {
    pub fn new(service: S) -> Self {
        Self { service }
    }
}

impl<S: Service> Endpoint<AuthRequest, AuthResponse> for AuthEndpoint<S> {
    fn call(&self, _ctx: &Context, request: AuthRequest) -> Result<AuthResponse, EndpointError> {
        let response = match self.service.authenticate(&request.name, &request.pwd) {
            Ok(token) => AuthResponse {
                success: true,
                token,
                error: String::new(),
            },
            Err(e) => AuthResponse {
                success: false,
                token: String::new(),
                error: e.to_string(),
            },
        };
        Ok(response)
    }
}

/// A request for any endpoint family.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    Arithmetic(ArithmeticRequest),
    Health(HealthRequest),
    Auth(AuthRequest),
}

/// A response from any endpoint family. Serializes as the inner payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Response {
    Arithmetic(ArithmeticResponse),
    Health(HealthResponse),
    Auth(AuthResponse),
}

impl From<ArithmeticRequest> for Request {
    fn from(request: ArithmeticRequest) -> Self {
        Request::Arithmetic(request)
    }
}

impl From<HealthRequest> for Request {
    fn from(request: HealthRequest) -> Self {
        Request::Health(request)
    }
}

impl From<AuthRequest> for Request {
    fn from(request: AuthRequest) -> Self {
        Request::Auth(request)
    }
}

/// The endpoint set served by a transport.
#[derive(Clone)]
pub struct Endpoints {
    pub arithmetic: BoxEndpoint<ArithmeticRequest, ArithmeticResponse>,
    pub health: BoxEndpoint<HealthRequest, HealthResponse>,
    pub auth: BoxEndpoint<AuthRequest, AuthResponse>,
}

impl Endpoints {
    /// Unlimited endpoints bound directly to `service`.
    pub fn new<S: Service + Clone + 'static>(service: S) -> Self {
        Self {
            arithmetic: Arc::new(ArithmeticEndpoint::new(service.clone())),
            health: Arc::new(HealthEndpoint::new(service.clone())),
            auth: Arc::new(AuthEndpoint::new(service)),
        }
    }
}

impl std::fmt::Debug for Endpoints {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Endpoints").finish_non_exhaustive()
    }
}

impl Endpoint<Request, Response> for Endpoints {
    fn call(&self, ctx: &Context, request: Request) -> Result<Response, EndpointError> {
        match request {
            Request::Arithmetic(req) => self.arithmetic.call(ctx, req).map(Response::Arithmetic),
            Request::Health(req) => self.health.call(ctx, req).map(Response::Health),
            Request::Auth(req) => self.auth.call(ctx, req).map(Response::Auth),
        }
    }
}
