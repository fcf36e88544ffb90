/// Metrics and telemetry for the document registry
///
/// Provides Prometheus-compatible metrics for monitoring:
/// - HTTP request counts and latencies
/// - Alias resolutions by winning strategy
/// - Self-healing cache writes
/// - Uploads and background repair runs

use lazy_static::lazy_static;
use prometheus::{
    register_histogram_vec, register_int_counter_vec, register_int_gauge, Encoder, HistogramVec,
    IntCounterVec, IntGauge, TextEncoder,
};

lazy_static! {
    // ========== HTTP Metrics ==========

    /// Total HTTP requests by method, route, and status
    pub static ref HTTP_REQUESTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "http_requests_total",
        "Total number of HTTP requests",
        &["method", "path", "status"]
    )
    .unwrap();

    /// HTTP request duration in seconds
    pub static ref HTTP_REQUEST_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "http_request_duration_seconds",
        "HTTP request latencies in seconds",
        &["method", "path"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0]
    )
    .unwrap();

    // ========== Resolution Metrics ==========

    /// Alias resolutions by strategy and outcome
    pub static ref RESOLUTIONS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "document_resolutions_total",
        "Total number of alias resolutions",
        &["strategy", "outcome"]
    )
    .unwrap();

    /// Advisory cache writes made while resolving
    pub static ref SELF_HEAL_WRITES_TOTAL: IntCounterVec = register_int_counter_vec!(
        "self_heal_writes_total",
        "Total number of self-healing writes",
        &["target", "status"]
    )
    .unwrap();

    /// Number of entries in the mapping table
    pub static ref MAPPING_ENTRIES: IntGauge = register_int_gauge!(
        "mapping_entries",
        "Number of alias entries in the mapping table"
    )
    .unwrap();

    // ========== Storage Metrics ==========

    /// Uploads by kind (signed / unsigned)
    pub static ref UPLOADS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "document_uploads_total",
        "Total number of document uploads",
        &["kind"]
    )
    .unwrap();

    // ========== Background Job Metrics ==========

    /// Background job executions by job type and status
    pub static ref BACKGROUND_JOBS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "background_jobs_total",
        "Total number of background job executions",
        &["job_type", "status"]
    )
    .unwrap();
}

/// Render metrics in Prometheus text format
pub fn render_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::warn!("Failed to encode metrics: {}", e);
    }
    String::from_utf8_lossy(&buffer).into_owned()
}

/// Record an HTTP request
pub fn record_http_request(method: &str, path: &str, status: u16, duration: f64) {
    HTTP_REQUESTS_TOTAL
        .with_label_values(&[method, path, &status.to_string()])
        .inc();
    HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&[method, path])
        .observe(duration);
}

/// Record the outcome of one resolution
pub fn record_resolution(strategy: &str, found: bool) {
    RESOLUTIONS_TOTAL
        .with_label_values(&[strategy, if found { "found" } else { "not_found" }])
        .inc();
}

/// Record an advisory write (mapping entry, proxy record, synthesized metadata)
pub fn record_self_heal(target: &str, ok: bool) {
    SELF_HEAL_WRITES_TOTAL
        .with_label_values(&[target, if ok { "ok" } else { "error" }])
        .inc();
}

/// Record a document upload
pub fn record_upload(kind: &str) {
    UPLOADS_TOTAL.with_label_values(&[kind]).inc();
}

/// Record a background job execution
pub fn record_background_job(job_type: &str, status: &str) {
    BACKGROUND_JOBS_TOTAL
        .with_label_values(&[job_type, status])
        .inc();
}
