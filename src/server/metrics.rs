use axum::{http::StatusCode, response::IntoResponse};
use lazy_static::lazy_static;
use prometheus::{Counter, CounterVec, Encoder, HistogramOpts, HistogramVec, Opts, Registry, TextEncoder};
use std::time::Duration;

/// Metric name prefix for all media-server metrics
const PREFIX: &str = "watchlist_media";

lazy_static! {
    // Global Prometheus registry
    pub static ref REGISTRY: Registry = Registry::new();

    // HTTP Request Metrics
    pub static ref HTTP_REQUESTS_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_http_requests_total"), "Total number of HTTP requests"),
        &["method", "path", "status"]
    ).expect("Failed to create http_requests_total metric");

    pub static ref HTTP_REQUEST_DURATION_SECONDS: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            format!("{PREFIX}_http_request_duration_seconds"),
            "HTTP request duration in seconds"
        )
        .buckets(vec![0.001, 0.01, 0.05, 0.1, 0.5, 1.0, 2.0, 5.0, 10.0]),
        &["method", "path"]
    ).expect("Failed to create http_request_duration_seconds metric");

    // Catalog Client Metrics
    pub static ref CATALOG_SEARCH_FAILURES_TOTAL: Counter = Counter::new(
        format!("{PREFIX}_catalog_search_failures_total"),
        "Catalog searches that failed and degraded a lookup to local results"
    ).expect("Failed to create catalog_search_failures_total metric");

    // Reconciliation Metrics
    pub static ref RECONCILE_OUTCOMES_TOTAL: CounterVec = CounterVec::new(
        Opts::new(
            format!("{PREFIX}_reconcile_outcomes_total"),
            "Per-record reconcile outcomes by action"
        ),
        &["action"]
    ).expect("Failed to create reconcile_outcomes_total metric");

    pub static ref RECONCILE_DROPPED_TOTAL: Counter = Counter::new(
        format!("{PREFIX}_reconcile_dropped_total"),
        "Reconcile snapshots dropped because the queue was full"
    ).expect("Failed to create reconcile_dropped_total metric");
}

/// Initialize all metrics and register them with the Prometheus registry
pub fn init_metrics() {
    // Register all metrics - ignore errors if already registered (for tests)
    let _ = REGISTRY.register(Box::new(HTTP_REQUESTS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(HTTP_REQUEST_DURATION_SECONDS.clone()));
    let _ = REGISTRY.register(Box::new(CATALOG_SEARCH_FAILURES_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(RECONCILE_OUTCOMES_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(RECONCILE_DROPPED_TOTAL.clone()));

    tracing::info!("Metrics system initialized successfully");
}

/// Record an HTTP request
pub fn record_http_request(method: &str, path: &str, status: u16, duration: Duration) {
    HTTP_REQUESTS_TOTAL
        .with_label_values(&[method, path, &status.to_string()])
        .inc();

    HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&[method, path])
        .observe(duration.as_secs_f64());
}

/// Record a failed catalog search that was recovered locally
pub fn record_catalog_search_failure() {
    CATALOG_SEARCH_FAILURES_TOTAL.inc();
}

/// Record one reconcile outcome
pub fn record_reconcile_outcome(action: &str) {
    RECONCILE_OUTCOMES_TOTAL.with_label_values(&[action]).inc();
}

/// Record a reconcile snapshot dropped on a full queue
pub fn record_reconcile_dropped() {
    RECONCILE_DROPPED_TOTAL.inc();
}

/// Handler for the /metrics endpoint
pub async fn metrics_handler() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();

    let mut buffer = vec![];
    match encoder.encode(&metric_families, &mut buffer) {
        Ok(()) => {
            let response = String::from_utf8(buffer).unwrap_or_else(|_| String::from(""));
            (StatusCode::OK, response)
        }
        Err(e) => {
            tracing::error!("Failed to encode metrics: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to encode metrics: {}", e),
            )
        }
    }
}
