//! HTTP transport built on `axum`.
//!
//! `router` binds the reference routes to a `Pipeline`:
//!
//! ```text
//! POST /calculate/{type}/{a}/{b}   -> Request::Arithmetic
//! GET  /health                     -> Request::Health
//! POST /login   {"name","pwd"}     -> Request::Auth
//! GET  /metrics                    -> Prometheus text exposition
//! ```
//!
//! Operands and login bodies that fail to decode surface as
//! `EndpointError::MalformedRequest`. The operation discriminant is passed
//! through untouched; an unknown one is rejected later by the arithmetic
//! endpoint with `InvalidRequestType`. `/metrics` is neither rate limited nor
//! counted.

use crate::application::endpoint::{
    ArithmeticRequest, AuthRequest, Context, HealthRequest, Response,
};
use crate::application::pipeline::Pipeline;
use crate::domain::error::EndpointError;
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response as HttpResponse};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;

/// Build the router for `pipeline`.
///
/// # Example
/// ```no_run
/// use arithmetic_service::infrastructure::transport::router;
/// use arithmetic_service::{ArithmeticService, Pipeline, PipelineConfig, StaticCredentialStore};
///
/// # async fn run() -> std::io::Result<()> {
/// let pipeline = Pipeline::new(
///     ArithmeticService::new(StaticCredentialStore::new()),
///     &PipelineConfig::default(),
/// )
/// .expect("valid config");
/// let listener = tokio::net::TcpListener::bind("127.0.0.1:8080").await?;
/// axum::serve(listener, router(pipeline)).await
/// # }
/// ```
pub fn router(pipeline: Pipeline) -> Router {
    Router::new()
        .route("/calculate/{type}/{a}/{b}", post(calculate))
        .route("/health", get(health))
        .route("/login", post(login))
        .route("/metrics", get(metrics))
        .with_state(pipeline)
}

/// Decode the `{type}`, `{a}` and `{b}` path segments into an arithmetic request.
///
/// # Example
/// ```
/// use arithmetic_service::infrastructure::transport::decode_calculate;
///
/// let request = decode_calculate("Add", "2", "-3").unwrap();
/// assert_eq!(request.request_type, "Add");
/// assert_eq!((request.a, request.b), (2, -3));
/// ```
pub fn decode_calculate(kind: &str, a: &str, b: &str) -> Result<ArithmeticRequest, EndpointError> {
    if kind.is_empty() {
        return Err(EndpointError::MalformedRequest(
            "missing request type".to_string(),
        ));
    }
    let a = parse_operand("a", a)?;
    let b = parse_operand("b", b)?;
    Ok(ArithmeticRequest::new(kind, a, b))
}

/// Decode a JSON login body `{"name": ..., "pwd": ...}`.
pub fn decode_login_body(body: &[u8]) -> Result<AuthRequest, EndpointError> {
    Ok(serde_json::from_slice(body)?)
}

/// HTTP status for an endpoint failure.
pub fn status_code(error: &EndpointError) -> StatusCode {
    match error {
        EndpointError::InvalidRequestType(_) | EndpointError::MalformedRequest(_) => {
            StatusCode::BAD_REQUEST
        }
        EndpointError::RateLimitExceeded => StatusCode::TOO_MANY_REQUESTS,
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for EndpointError {
    fn into_response(self) -> HttpResponse {
        tracing::debug!(error = %self, "request failed");
        let body = ErrorBody {
            error: self.to_string(),
        };
        (status_code(&self), Json(body)).into_response()
    }
}

async fn calculate(
    State(pipeline): State<Pipeline>,
    Path((kind, a, b)): Path<(String, String, String)>,
) -> Result<Json<Response>, EndpointError> {
    let request = decode_calculate(&kind, &a, &b)?;
    pipeline.call(&Context::background(), request).map(Json)
}

async fn health(State(pipeline): State<Pipeline>) -> Result<Json<Response>, EndpointError> {
    pipeline.call(&Context::background(), HealthRequest).map(Json)
}

async fn login(
    State(pipeline): State<Pipeline>,
    body: Bytes,
) -> Result<Json<Response>, EndpointError> {
    let request = decode_login_body(&body)?;
    pipeline.call(&Context::background(), request).map(Json)
}

async fn metrics(State(pipeline): State<Pipeline>) -> HttpResponse {
    match pipeline.metrics().render() {
        Ok(text) => ([(header::CONTENT_TYPE, prometheus::TEXT_FORMAT)], text).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "failed to encode metrics");
            let body = ErrorBody {
                error: e.to_string(),
            };
            (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
        }
    }
}

fn parse_operand(name: &str, raw: &str) -> Result<i64, EndpointError> {
    raw.parse::<i64>().map_err(|e| {
        EndpointError::MalformedRequest(format!("operand {} ({:?}): {}", name, raw, e))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::config::PipelineConfig;
    use crate::domain::service::ArithmeticService;
    use crate::infrastructure::credentials::StaticCredentialStore;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    fn is_malformed<T: std::fmt::Debug>(result: Result<T, EndpointError>) -> bool {
        matches!(result, Err(EndpointError::MalformedRequest(_)))
    }

    fn app() -> Router {
        let pipeline = Pipeline::new(
            ArithmeticService::new(StaticCredentialStore::from_pairs([("alice", "s3cret")])),
            &PipelineConfig::default(),
        )
        .unwrap();
        router(pipeline)
    }

    async fn send(app: &Router, method: &str, uri: &str, body: &'static str) -> (StatusCode, String) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::from(body))
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    #[test]
    fn test_decode_calculate() {
        assert_eq!(
            decode_calculate("divide", "-10", "3").unwrap(),
            ArithmeticRequest::new("divide", -10, 3)
        );
        // Unknown discriminants are left to the endpoint.
        assert_eq!(decode_calculate("power", "2", "8").unwrap().request_type, "power");
    }

    #[test]
    fn test_decode_calculate_rejects_bad_operands() {
        assert!(is_malformed(decode_calculate("add", "two", "3")));
        assert!(is_malformed(decode_calculate("add", "2", "1.5")));
        assert!(is_malformed(decode_calculate("add", "", "3")));
        assert!(is_malformed(decode_calculate("", "2", "3")));
        assert!(is_malformed(decode_calculate("add", "99999999999999999999", "1")));
    }

    #[test]
    fn test_decode_login_body() {
        let request = decode_login_body(br#"{"name":"alice","pwd":"s3cret"}"#).unwrap();
        assert_eq!(request, AuthRequest::new("alice", "s3cret"));

        assert!(is_malformed(decode_login_body(b"{\"name\":\"alice\"}")));
        assert!(is_malformed(decode_login_body(b"not json")));
    }

    #[test]
    fn test_status_code() {
        assert_eq!(
            status_code(&EndpointError::RateLimitExceeded),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            status_code(&EndpointError::InvalidRequestType("power".into())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_code(&EndpointError::MalformedRequest("bad".into())),
            StatusCode::BAD_REQUEST
        );
    }

    #[tokio::test]
    async fn test_router_round_trip() {
        let app = app();

        let (status, body) = send(&app, "POST", "/calculate/add/2/3", "").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, r#"{"Result":5,"error":null}"#);

        let (status, body) =
            send(&app, "POST", "/login", r#"{"name":"alice","pwd":"s3cret"}"#).await;
        assert_eq!(status, StatusCode::OK);
        let value: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(value["success"], true);
        assert!(!value["token"].as_str().unwrap().is_empty());

        // Decode failures are rejected before the limiter.
        let (status, _) = send(&app, "POST", "/calculate/add/x/3", "").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = send(&app, "POST", "/calculate/power/2/3", "").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body.contains("power"));

        // add, login and power used the three tokens
        let (status, body) = send(&app, "POST", "/calculate/add/2/3", "").await;
        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(body, r#"{"error":"rate limit exceeded"}"#);

        let (status, body) = send(&app, "GET", "/health", "").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, r#"{"status":true}"#);
    }

    #[tokio::test]
    async fn test_metrics_route() {
        let app = app();
        send(&app, "POST", "/calculate/add/2/3", "").await;

        let response = app
            .clone()
            .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            prometheus::TEXT_FORMAT
        );
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let text = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(text.contains("arithmetic_service_request_count{method=\"add\"} 1"));
    }

    #[tokio::test]
    async fn test_unknown_routes() {
        let app = app();
        let (status, _) = send(&app, "GET", "/calculate/add/2/3", "").await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);

        let (status, _) = send(&app, "POST", "/calculate/add/2", "").await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = send(&app, "GET", "/metrics/extra", "").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
