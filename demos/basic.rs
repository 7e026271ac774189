//! Drives the reference pipeline through its HTTP router.
//!
//! Sends a handful of requests, including a burst that runs into the rate
//! limit, then prints the Prometheus metrics page. Access records go to stdout
//! through the `fmt` subscriber.

use arithmetic_service::infrastructure::transport::router;
use arithmetic_service::{ArithmeticService, Pipeline, PipelineConfig, StaticCredentialStore};
use axum::body::Body;
use axum::http::Request;
use axum::Router;
use tower::ServiceExt;
use tracing_subscriber::prelude::*;

async fn send(app: &Router, method: &str, uri: &str, body: &'static str) -> String {
    let request = match Request::builder().method(method).uri(uri).body(Body::from(body)) {
        Ok(request) => request,
        Err(e) => return format!("bad request: {}", e),
    };
    let response = match app.clone().oneshot(request).await {
        Ok(response) => response,
        Err(e) => match e {},
    };
    let status = response.status();
    match axum::body::to_bytes(response.into_body(), usize::MAX).await {
        Ok(bytes) => format!("{} {}", status.as_u16(), String::from_utf8_lossy(&bytes)),
        Err(e) => format!("{} <unreadable body: {}>", status.as_u16(), e),
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .init();

    let credentials = StaticCredentialStore::from_pairs([("alice", "s3cret")]);
    let pipeline = match Pipeline::new(ArithmeticService::new(credentials), &PipelineConfig::default()) {
        Ok(pipeline) => pipeline,
        Err(e) => {
            eprintln!("invalid configuration: {}", e);
            std::process::exit(1);
        }
    };
    let app = router(pipeline.clone());

    println!("=== Arithmetic Service Example ===\n");
    println!("Limiter: 3 requests burst, then 1 every 4s (shared by /calculate and /login)\n");

    let requests: [(&str, &str, &'static str); 7] = [
        ("GET", "/health", ""),
        ("POST", "/calculate/add/2/3", ""),
        ("POST", "/calculate/Divide/5/0", ""),
        ("POST", "/login", r#"{"name":"alice","pwd":"s3cret"}"#),
        ("POST", "/calculate/multiply/6/7", ""),
        ("POST", "/calculate/power/2/8", ""),
        ("GET", "/health", ""),
    ];

    for (method, path, body) in requests {
        println!("{} {} -> {}", method, path, send(&app, method, path, body).await);
    }

    println!("\n--- /metrics ---\n{}", send(&app, "GET", "/metrics", "").await);

    let admission = pipeline.limiter().metrics().snapshot();
    println!(
        "admitted: {}, rejected: {} ({:.0}% rejected)",
        admission.admitted,
        admission.rejected,
        admission.rejection_rate() * 100.0
    );
}
