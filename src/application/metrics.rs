//! Observability metrics.
//!
//! Two kinds of metrics live here:
//! - `MetricsRegistry`: per-operation request counters and latency histograms,
//!   fed by `MetricsMiddleware` and exposed in the Prometheus text format
//! - `AdmissionMetrics`: admitted/rejected counters for a `RateLimiter`

use crate::application::config::BuildError;
use dashmap::DashMap;
use prometheus::{HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

const DEFAULT_NAMESPACE: &str = "arithmetic";
const DEFAULT_SUBSYSTEM: &str = "service";
const METHOD_LABEL: &str = "method";

/// Registry of request counters and latency histograms, labelled by operation.
///
/// Every observation lands in two places: a `prometheus::Registry` holding
/// `<ns>_<sub>_request_count` and `<ns>_<sub>_request_latency_seconds` for
/// exposition, and an in-process table of count/sum/min/max used by
/// `snapshot()` and `latency()`. Both are safe to update from many threads.
/// Cloning is cheap and every clone shares the same underlying metrics.
#[derive(Clone)]
pub struct MetricsRegistry {
    inner: Arc<RegistryInner>,
}

struct RegistryInner {
    namespace: String,
    subsystem: String,
    operations: DashMap<&'static str, OperationStats>,
    registry: Registry,
    requests: IntCounterVec,
    latency: HistogramVec,
}

#[derive(Debug)]
struct OperationStats {
    count: AtomicU64,
    sum_nanos: AtomicU64,
    min_nanos: AtomicU64,
    max_nanos: AtomicU64,
}

impl Default for OperationStats {
    fn default() -> Self {
        Self {
            count: AtomicU64::new(0),
            sum_nanos: AtomicU64::new(0),
            min_nanos: AtomicU64::new(u64::MAX),
            max_nanos: AtomicU64::new(0),
        }
    }
}

impl OperationStats {
    fn observe(&self, nanos: u64) {
        self.count.fetch_add(1, Ordering::Relaxed);
        self.sum_nanos.fetch_add(nanos, Ordering::Relaxed);
        self.min_nanos.fetch_min(nanos, Ordering::Relaxed);
        self.max_nanos.fetch_max(nanos, Ordering::Relaxed);
    }

    fn summary(&self) -> LatencySummary {
        let count = self.count.load(Ordering::Relaxed);
        let min = self.min_nanos.load(Ordering::Relaxed);
        LatencySummary {
            count,
            sum: Duration::from_nanos(self.sum_nanos.load(Ordering::Relaxed)),
            min: if count == 0 {
                Duration::ZERO
            } else {
                Duration::from_nanos(min)
            },
            max: Duration::from_nanos(self.max_nanos.load(Ordering::Relaxed)),
        }
    }
}

/// Builder for `MetricsRegistry`.
#[derive(Debug, Clone)]
pub struct MetricsRegistryBuilder {
    namespace: String,
    subsystem: String,
}

impl MetricsRegistryBuilder {
    /// Set the metric name namespace (first name component).
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    /// Set the metric name subsystem (second name component).
    pub fn with_subsystem(mut self, subsystem: impl Into<String>) -> Self {
        self.subsystem = subsystem.into();
        self
    }

    /// Build the registry and register its collectors.
    ///
    /// # Errors
    /// Returns `BuildError::InvalidMetricName` if the namespace or subsystem is
    /// not a valid Prometheus name component, or `BuildError::Metrics` if the
    /// collectors cannot be registered.
    pub fn build(self) -> Result<MetricsRegistry, BuildError> {
        for part in [&self.namespace, &self.subsystem] {
            if !is_valid_name_part(part) {
                return Err(BuildError::InvalidMetricName(part.clone()));
            }
        }

        let requests = IntCounterVec::new(
            Opts::new("request_count", "Number of requests received.")
                .namespace(self.namespace.clone())
                .subsystem(self.subsystem.clone()),
            &[METHOD_LABEL],
        )?;
        let latency = HistogramVec::new(
            HistogramOpts::new(
                "request_latency_seconds",
                "Total duration of requests in seconds.",
            )
            .namespace(self.namespace.clone())
            .subsystem(self.subsystem.clone()),
            &[METHOD_LABEL],
        )?;

        let registry = Registry::new();
        registry.register(Box::new(requests.clone()))?;
        registry.register(Box::new(latency.clone()))?;

        Ok(MetricsRegistry {
            inner: Arc::new(RegistryInner {
                namespace: self.namespace,
                subsystem: self.subsystem,
                operations: DashMap::new(),
                registry,
                requests,
                latency,
            }),
        })
    }
}

fn is_valid_name_part(part: &str) -> bool {
    let mut chars = part.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

impl MetricsRegistry {
    /// Create a registry with the default `arithmetic_service` name prefix.
    pub fn new() -> Self {
        Self::builder()
            .build()
            .expect("default metric names are always valid")
    }

    /// Create a builder for configuring the registry.
    pub fn builder() -> MetricsRegistryBuilder {
        MetricsRegistryBuilder {
            namespace: DEFAULT_NAMESPACE.to_string(),
            subsystem: DEFAULT_SUBSYSTEM.to_string(),
        }
    }

    /// Count one request for `operation` and record its latency.
    pub fn observe(&self, operation: &'static str, elapsed: Duration) {
        self.inner
            .requests
            .with_label_values(&[operation])
            .inc();
        self.inner
            .latency
            .with_label_values(&[operation])
            .observe(elapsed.as_secs_f64());

        let nanos = u64::try_from(elapsed.as_nanos()).unwrap_or(u64::MAX);

        // Fast path: shared shard lock only
        if let Some(stats) = self.inner.operations.get(operation) {
            stats.observe(nanos);
            return;
        }

        self.inner
            .operations
            .entry(operation)
            .or_default()
            .observe(nanos);
    }

    /// Number of requests recorded for `operation`.
    pub fn request_count(&self, operation: &str) -> u64 {
        self.inner
            .operations
            .get(operation)
            .map(|stats| stats.count.load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    /// Latency summary for `operation`, if it has been observed.
    pub fn latency(&self, operation: &str) -> Option<LatencySummary> {
        self.inner
            .operations
            .get(operation)
            .map(|stats| stats.summary())
    }

    /// Get a point-in-time snapshot of every observed operation.
    pub fn snapshot(&self) -> MetricsSnapshot {
        let operations = self
            .inner
            .operations
            .iter()
            .map(|entry| (entry.key().to_string(), entry.value().summary()))
            .collect();
        MetricsSnapshot { operations }
    }

    /// Total requests recorded across all operations.
    pub fn total_requests(&self) -> u64 {
        self.inner
            .operations
            .iter()
            .map(|entry| entry.value().count.load(Ordering::Relaxed))
            .sum()
    }

    /// Reset all metrics.
    ///
    /// Useful for testing or when starting a new monitoring period.
    pub fn reset(&self) {
        self.inner.operations.clear();
        self.inner.requests.reset();
        self.inner.latency.reset();
    }

    /// Fully qualified counter name, e.g. `arithmetic_service_request_count`.
    pub fn counter_name(&self) -> String {
        format!(
            "{}_{}_request_count",
            self.inner.namespace, self.inner.subsystem
        )
    }

    /// Fully qualified histogram name, e.g. `arithmetic_service_request_latency_seconds`.
    pub fn latency_name(&self) -> String {
        format!(
            "{}_{}_request_latency_seconds",
            self.inner.namespace, self.inner.subsystem
        )
    }

    /// The underlying Prometheus registry, for merging into a larger exporter.
    pub fn prometheus(&self) -> &Registry {
        &self.inner.registry
    }

    /// Render all metrics in the Prometheus text exposition format.
    pub fn render(&self) -> prometheus::Result<String> {
        TextEncoder::new().encode_to_string(&self.inner.registry.gather())
    }
}

impl fmt::Debug for MetricsRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetricsRegistry")
            .field("namespace", &self.inner.namespace)
            .field("subsystem", &self.inner.subsystem)
            .field("operations", &self.inner.operations.len())
            .finish()
    }
}

impl Default for MetricsRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Latency statistics for one operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LatencySummary {
    /// Number of observations
    pub count: u64,
    /// Sum of all observed durations
    pub sum: Duration,
    /// Shortest observed duration (zero when empty)
    pub min: Duration,
    /// Longest observed duration
    pub max: Duration,
}

impl LatencySummary {
    /// Mean latency, or zero if nothing was observed.
    pub fn mean(&self) -> Duration {
        if self.count == 0 {
            return Duration::ZERO;
        }
        let nanos = self.sum.as_nanos() / u128::from(self.count);
        Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX))
    }
}

/// A point-in-time snapshot of the registry, keyed by operation name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub operations: BTreeMap<String, LatencySummary>,
}

impl MetricsSnapshot {
    /// Summary for a single operation.
    pub fn get(&self, operation: &str) -> Option<&LatencySummary> {
        self.operations.get(operation)
    }

    /// Total requests across all operations.
    pub fn total_requests(&self) -> u64 {
        self.operations.values().map(|s| s.count).sum()
    }
}

/// Admission counters for a rate limiter.
///
/// All metrics use atomic operations for thread-safe updates and reads.
#[derive(Debug, Clone)]
pub struct AdmissionMetrics {
    inner: Arc<AdmissionInner>,
}

#[derive(Debug)]
struct AdmissionInner {
    /// Total number of invocations admitted
    admitted: AtomicU64,
    /// Total number of invocations rejected
    rejected: AtomicU64,
}

impl AdmissionMetrics {
    /// Create a new admission tracker.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(AdmissionInner {
                admitted: AtomicU64::new(0),
                rejected: AtomicU64::new(0),
            }),
        }
    }

    pub(crate) fn record_admitted(&self) {
        self.inner.admitted.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_rejected(&self) {
        self.inner.rejected.fetch_add(1, Ordering::Relaxed);
    }

    /// Get the total number of invocations admitted.
    pub fn admitted(&self) -> u64 {
        self.inner.admitted.load(Ordering::Relaxed)
    }

    /// Get the total number of invocations rejected.
    pub fn rejected(&self) -> u64 {
        self.inner.rejected.load(Ordering::Relaxed)
    }

    /// Get a snapshot of both counters.
    pub fn snapshot(&self) -> AdmissionSnapshot {
        AdmissionSnapshot {
            admitted: self.admitted(),
            rejected: self.rejected(),
        }
    }

    /// Reset both counters to zero.
    pub fn reset(&self) {
        self.inner.admitted.store(0, Ordering::Relaxed);
        self.inner.rejected.store(0, Ordering::Relaxed);
    }
}

impl Default for AdmissionMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// A point-in-time snapshot of admission counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdmissionSnapshot {
    pub admitted: u64,
    pub rejected: u64,
}

impl AdmissionSnapshot {
    /// Ratio of rejected invocations to all invocations (0.0 to 1.0).
    ///
    /// Returns 0.0 if nothing has been checked.
    pub fn rejection_rate(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            0.0
        } else {
            self.rejected as f64 / total as f64
        }
    }

    /// Get the total number of invocations checked.
    pub fn total(&self) -> u64 {
        self.admitted.saturating_add(self.rejected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_registry_initial_state() {
        let registry = MetricsRegistry::new();
        assert_eq!(registry.request_count("add"), 0);
        assert!(registry.latency("add").is_none());
        assert_eq!(registry.total_requests(), 0);
    }

    #[test]
    fn test_observe_updates_count_and_latency() {
        let registry = MetricsRegistry::new();
        registry.observe("add", Duration::from_millis(2));
        registry.observe("add", Duration::from_millis(4));
        registry.observe("divide", Duration::from_millis(1));

        assert_eq!(registry.request_count("add"), 2);
        assert_eq!(registry.request_count("divide"), 1);

        let add = registry.latency("add").unwrap();
        assert_eq!(add.count, 2);
        assert_eq!(add.sum, Duration::from_millis(6));
        assert_eq!(add.min, Duration::from_millis(2));
        assert_eq!(add.max, Duration::from_millis(4));
        assert_eq!(add.mean(), Duration::from_millis(3));
    }

    #[test]
    fn test_snapshot() {
        let registry = MetricsRegistry::new();
        registry.observe("multiply", Duration::from_micros(10));
        registry.observe("health_check", Duration::from_micros(1));

        let snapshot = registry.snapshot();
        assert_eq!(snapshot.operations.len(), 2);
        assert_eq!(snapshot.get("multiply").unwrap().count, 1);
        assert_eq!(snapshot.total_requests(), 2);
    }

    #[test]
    fn test_clones_share_state() {
        let r1 = MetricsRegistry::new();
        let r2 = r1.clone();
        r1.observe("add", Duration::ZERO);
        r2.observe("add", Duration::ZERO);
        assert_eq!(r1.request_count("add"), 2);
        assert_eq!(r2.request_count("add"), 2);
    }

    #[test]
    fn test_reset() {
        let registry = MetricsRegistry::new();
        registry.observe("add", Duration::from_millis(1));
        registry.reset();
        assert_eq!(registry.request_count("add"), 0);
        assert!(registry.snapshot().operations.is_empty());
    }

    #[test]
    fn test_render_prometheus_text() {
        let registry = MetricsRegistry::builder()
            .with_namespace("calc")
            .with_subsystem("api")
            .build()
            .unwrap();
        registry.observe("subtract", Duration::from_millis(500));
        registry.observe("add", Duration::from_secs(1));
        registry.observe("add", Duration::from_secs(2));

        let text = registry.render().unwrap();
        assert!(text.contains("# TYPE calc_api_request_count counter"));
        assert!(text.contains("calc_api_request_count{method=\"add\"} 2"));
        assert!(text.contains("calc_api_request_count{method=\"subtract\"} 1"));
        assert!(text.contains("# TYPE calc_api_request_latency_seconds histogram"));
        assert!(text.contains("calc_api_request_latency_seconds_sum{method=\"subtract\"} 0.5"));
        assert!(text.contains("calc_api_request_latency_seconds_count{method=\"add\"} 2"));
    }

    #[test]
    fn test_render_empty_and_after_reset() {
        let registry = MetricsRegistry::new();
        assert!(!registry.render().unwrap().contains("method="));

        registry.observe("divide", Duration::from_millis(1));
        assert!(registry
            .render()
            .unwrap()
            .contains("arithmetic_service_request_count{method=\"divide\"} 1"));

        registry.reset();
        assert!(!registry.render().unwrap().contains("method=\"divide\""));
    }

    #[test]
    fn test_prometheus_registry_gathers_both_families() {
        let registry = MetricsRegistry::new();
        registry.observe("multiply", Duration::from_micros(5));

        let names: Vec<String> = registry
            .prometheus()
            .gather()
            .iter()
            .map(|family| family.get_name().to_string())
            .collect();
        assert!(names.contains(&registry.counter_name()));
        assert!(names.contains(&registry.latency_name()));
    }

    #[test]
    fn test_builder_rejects_invalid_names() {
        for bad in ["", "1abc", "has-dash", "has space"] {
            let result = MetricsRegistry::builder().with_namespace(bad).build();
            assert_eq!(
                result.unwrap_err(),
                BuildError::InvalidMetricName(bad.to_string())
            );
        }
        assert!(MetricsRegistry::builder()
            .with_subsystem("_ok_9")
            .build()
            .is_ok());
    }

    #[test]
    fn test_concurrent_observations() {
        let registry = MetricsRegistry::new();
        let mut handles = vec![];

        for _ in 0..10 {
            let r = registry.clone();
            handles.push(thread::spawn(move || {
                for _ in 0..100 {
                    r.observe("add", Duration::from_nanos(10));
                    r.observe("divide", Duration::from_nanos(10));
                }
            }));
        }

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(registry.request_count("add"), 1000);
        assert_eq!(registry.request_count("divide"), 1000);
        assert_eq!(
            registry.latency("add").unwrap().sum,
            Duration::from_nanos(10_000)
        );
    }

    #[test]
    fn test_admission_metrics() {
        let metrics = AdmissionMetrics::new();
        assert_eq!(metrics.snapshot().rejection_rate(), 0.0);

        metrics.record_admitted();
        metrics.record_admitted();
        metrics.record_admitted();
        metrics.record_rejected();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.admitted, 3);
        assert_eq!(snapshot.rejected, 1);
        assert_eq!(snapshot.total(), 4);
        assert!((snapshot.rejection_rate() - 0.25).abs() < f64::EPSILON);

        metrics.reset();
        assert_eq!(metrics.admitted(), 0);
        assert_eq!(metrics.rejected(), 0);
    }
}
