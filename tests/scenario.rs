//! End-to-end behavior of the assembled pipeline.

use arithmetic_service::infrastructure::mocks::MockClock;
use arithmetic_service::{
    ArithmeticRequest, ArithmeticResponse, ArithmeticService, AuthRequest, AuthResponse, Context,
    EndpointError, HealthRequest, Pipeline, PipelineConfig, Response, ServiceError,
    StaticCredentialStore,
};
use std::sync::Arc;
use std::time::{Duration, Instant};

fn pipeline_with(config: PipelineConfig, clock: &MockClock) -> Pipeline {
    let credentials = StaticCredentialStore::from_pairs([("alice", "s3cret")]);
    Pipeline::builder(config)
        .with_clock(Arc::new(clock.clone()))
        .build(ArithmeticService::new(credentials))
        .unwrap()
}

fn calc(pipeline: &Pipeline, kind: &str, a: i64, b: i64) -> Result<ArithmeticResponse, EndpointError> {
    match pipeline.call(&Context::background(), ArithmeticRequest::new(kind, a, b))? {
        Response::Arithmetic(response) => Ok(response),
        other => panic!("expected arithmetic response, got {:?}", other),
    }
}

fn login(pipeline: &Pipeline, name: &str, pwd: &str) -> Result<AuthResponse, EndpointError> {
    match pipeline.call(&Context::background(), AuthRequest::new(name, pwd))? {
        Response::Auth(response) => Ok(response),
        other => panic!("expected auth response, got {:?}", other),
    }
}

#[test]
fn test_reference_scenario() {
    let clock = MockClock::new(Instant::now());
    let config = PipelineConfig {
        capacity: 10,
        ..PipelineConfig::default()
    };
    let pipeline = pipeline_with(config, &clock);

    assert_eq!(calc(&pipeline, "add", 2, 3).unwrap().result, 5);
    assert_eq!(calc(&pipeline, "divide", 10, 2).unwrap().result, 5);

    let by_zero = calc(&pipeline, "divide", 5, 0).unwrap();
    assert_eq!(by_zero.result, 0);
    assert_eq!(by_zero.error, Some(ServiceError::DivisionByZero));

    assert_eq!(
        calc(&pipeline, "power", 2, 8),
        Err(EndpointError::InvalidRequestType("power".to_string()))
    );
}

#[test]
fn test_discriminants_are_case_insensitive() {
    let clock = MockClock::new(Instant::now());
    let config = PipelineConfig {
        capacity: 100,
        ..PipelineConfig::default()
    };
    let pipeline = pipeline_with(config, &clock);

    for kind in ["add", "Add", "ADD", "aDd"] {
        assert_eq!(calc(&pipeline, kind, 4, 2).unwrap().result, 6);
    }
    for kind in ["subtract", "Subtract", "SUBTRACT"] {
        assert_eq!(calc(&pipeline, kind, 4, 2).unwrap().result, 2);
    }
    for kind in ["multiply", "Multiply"] {
        assert_eq!(calc(&pipeline, kind, 4, 2).unwrap().result, 8);
    }
    for kind in ["divide", "DIVIDE"] {
        assert_eq!(calc(&pipeline, kind, 7, -2).unwrap().result, -3);
    }
    for kind in ["", "sum", "substract", "add "] {
        assert!(matches!(
            calc(&pipeline, kind, 1, 1),
            Err(EndpointError::InvalidRequestType(_))
        ));
    }
}

#[test]
fn test_four_rapid_calls_with_capacity_three() {
    let clock = MockClock::new(Instant::now());
    let pipeline = pipeline_with(PipelineConfig::default(), &clock);

    assert!(calc(&pipeline, "add", 1, 1).is_ok());
    assert!(calc(&pipeline, "add", 1, 1).is_ok());
    assert!(calc(&pipeline, "add", 1, 1).is_ok());
    assert_eq!(
        calc(&pipeline, "add", 1, 1),
        Err(EndpointError::RateLimitExceeded)
    );

    // Still inside the first interval
    clock.advance(Duration::from_millis(3_999));
    assert_eq!(
        calc(&pipeline, "add", 1, 1),
        Err(EndpointError::RateLimitExceeded)
    );

    clock.advance(Duration::from_millis(1));
    assert!(calc(&pipeline, "add", 1, 1).is_ok());
    assert_eq!(
        calc(&pipeline, "add", 1, 1),
        Err(EndpointError::RateLimitExceeded)
    );
}

#[test]
fn test_refill_never_exceeds_capacity() {
    let clock = MockClock::new(Instant::now());
    let pipeline = pipeline_with(PipelineConfig::default(), &clock);

    clock.advance(Duration::from_secs(3600));
    let admitted = (0..10)
        .filter(|_| calc(&pipeline, "multiply", 2, 2).is_ok())
        .count();
    assert_eq!(admitted, 3);
}

#[test]
fn test_login_flow() {
    let clock = MockClock::new(Instant::now());
    let pipeline = pipeline_with(PipelineConfig::default(), &clock);

    let ok = login(&pipeline, "alice", "s3cret").unwrap();
    assert!(ok.success);
    assert!(!ok.token.is_empty());
    assert!(ok.error.is_empty());

    let bad = login(&pipeline, "alice", "guess").unwrap();
    assert!(!bad.success);
    assert!(bad.token.is_empty());
    assert_eq!(bad.error, "invalid name or password");

    let empty = login(&pipeline, "", "").unwrap();
    assert!(!empty.success);
    assert_eq!(empty.error, "name and password are required");

    assert_eq!(
        login(&pipeline, "alice", "s3cret"),
        Err(EndpointError::RateLimitExceeded)
    );
}

#[test]
fn test_health_stays_available_while_limited() {
    let clock = MockClock::new(Instant::now());
    let pipeline = pipeline_with(PipelineConfig::default(), &clock);

    while calc(&pipeline, "add", 1, 1).is_ok() {}

    let health = pipeline
        .call(&Context::background(), HealthRequest)
        .unwrap();
    assert_eq!(health, Response::Health(arithmetic_service::HealthResponse { status: true }));
}

#[test]
fn test_metrics_exposition() {
    let clock = MockClock::new(Instant::now());
    let config = PipelineConfig::from_json(r#"{"namespace": "raysonxin", "subsystem": "arithmetic_service"}"#)
        .unwrap();
    let pipeline = pipeline_with(config, &clock);

    calc(&pipeline, "add", 1, 2).unwrap();
    calc(&pipeline, "add", 3, 4).unwrap();
    calc(&pipeline, "divide", 1, 0).unwrap();

    let text = pipeline.metrics().render().unwrap();
    assert!(text.contains("# TYPE raysonxin_arithmetic_service_request_latency_seconds histogram"));
    assert!(text.contains("# TYPE raysonxin_arithmetic_service_request_count counter"));
    assert!(text.contains("raysonxin_arithmetic_service_request_count{method=\"add\"} 2"));
    assert!(text.contains("raysonxin_arithmetic_service_request_count{method=\"divide\"} 1"));
    assert!(text.contains(
        "raysonxin_arithmetic_service_request_latency_seconds_count{method=\"add\"} 2"
    ));

    let snapshot = pipeline.metrics().snapshot();
    assert_eq!(snapshot.total_requests(), 3);
    assert_eq!(snapshot.get("add").map(|s| s.count), Some(2));
}
