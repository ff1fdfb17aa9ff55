use axum::{http::StatusCode, response::IntoResponse};
use lazy_static::lazy_static;
use prometheus::{
    CounterVec, Encoder, Gauge, Histogram, HistogramOpts, HistogramVec, Opts, Registry,
    TextEncoder,
};
use std::time::Duration;

/// Metric name prefix for all stats server metrics
const PREFIX: &str = "stats";

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

    // Authentication Metrics
    pub static ref AUTH_LOGIN_ATTEMPTS_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_auth_login_attempts_total"), "Total login attempts"),
        &["status"]
    ).expect("Failed to create auth_login_attempts_total metric");

    pub static ref AUTH_LOGIN_DURATION_SECONDS: Histogram = Histogram::with_opts(
        HistogramOpts::new(
            format!("{PREFIX}_auth_login_duration_seconds"),
            "Login request duration in seconds"
        )
        .buckets(vec![0.1, 0.5, 1.0, 2.0, 5.0, 10.0])
    ).expect("Failed to create auth_login_duration_seconds metric");

    // Event Ingestion Metrics
    pub static ref PLAYBACKS_RECORDED_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_playbacks_recorded_total"), "Playback events recorded"),
        &["validity"]
    ).expect("Failed to create playbacks_recorded_total metric");

    pub static ref ALBUM_SALES_RECORDED_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_album_sales_recorded_total"), "Album sale events recorded"),
        &["currency"]
    ).expect("Failed to create album_sales_recorded_total metric");

    pub static ref RATINGS_UPSERTED_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_ratings_upserted_total"), "Song ratings created or updated"),
        &["outcome"]
    ).expect("Failed to create ratings_upserted_total metric");

    // Catalog Client Metrics
    pub static ref CATALOG_LOOKUPS_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_catalog_lookups_total"), "Catalog lookups by endpoint and outcome"),
        &["endpoint", "outcome"]
    ).expect("Failed to create catalog_lookups_total metric");

    // Error Metrics
    pub static ref ERRORS_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_errors_total"), "Total errors by type and endpoint"),
        &["error_type", "endpoint"]
    ).expect("Failed to create errors_total metric");

    // Process Metrics (memory/CPU will be added later if needed)
    pub static ref PROCESS_MEMORY_BYTES: Gauge = Gauge::new(
        format!("{PREFIX}_process_memory_bytes"),
        "Process memory usage in bytes"
    ).expect("Failed to create process_memory_bytes metric");
}

/// Initialize all metrics and register them with the Prometheus registry
pub fn init_metrics() {
    // Register all metrics - ignore errors if already registered (for tests)
    let _ = REGISTRY.register(Box::new(HTTP_REQUESTS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(HTTP_REQUEST_DURATION_SECONDS.clone()));
    let _ = REGISTRY.register(Box::new(AUTH_LOGIN_ATTEMPTS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(AUTH_LOGIN_DURATION_SECONDS.clone()));
    let _ = REGISTRY.register(Box::new(PLAYBACKS_RECORDED_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(ALBUM_SALES_RECORDED_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(RATINGS_UPSERTED_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(CATALOG_LOOKUPS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(ERRORS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(PROCESS_MEMORY_BYTES.clone()));

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

/// Record a login attempt
pub fn record_login_attempt(status: &str, duration: Duration) {
    AUTH_LOGIN_ATTEMPTS_TOTAL
        .with_label_values(&[status])
        .inc();

    AUTH_LOGIN_DURATION_SECONDS.observe(duration.as_secs_f64());
}

/// Record playback events, split by whether they counted as valid plays
pub fn record_playbacks(valid: bool, count: u64) {
    let validity = if valid { "valid" } else { "invalid" };
    PLAYBACKS_RECORDED_TOTAL
        .with_label_values(&[validity])
        .inc_by(count as f64);
}

/// Record an album sale event
pub fn record_album_sale(currency: &str) {
    ALBUM_SALES_RECORDED_TOTAL
        .with_label_values(&[currency])
        .inc();
}

/// Record a rating upsert, split by insert vs. update of an existing rating
pub fn record_rating_upsert(created: bool) {
    let outcome = if created { "created" } else { "updated" };
    RATINGS_UPSERTED_TOTAL.with_label_values(&[outcome]).inc();
}

/// Record a catalog lookup outcome
pub fn record_catalog_lookup(endpoint: &str, success: bool) {
    let outcome = if success { "success" } else { "failure" };
    CATALOG_LOOKUPS_TOTAL
        .with_label_values(&[endpoint, outcome])
        .inc();
}

/// Record an error
pub fn record_error(error_type: &str, endpoint: &str) {
    ERRORS_TOTAL
        .with_label_values(&[error_type, endpoint])
        .inc();
}

/// Update process memory usage
pub fn update_memory_usage() {
    // Get current process memory usage
    #[cfg(target_os = "linux")]
    {
        if let Ok(status) = std::fs::read_to_string("/proc/self/status") {
            for line in status.lines() {
                if line.starts_with("VmRSS:") {
                    // Parse the RSS (Resident Set Size) in kB
                    if let Some(kb_str) = line.split_whitespace().nth(1) {
                        if let Ok(kb) = kb_str.parse::<f64>() {
                            // Convert kB to bytes
                            PROCESS_MEMORY_BYTES.set(kb * 1024.0);
                            return;
                        }
                    }
                }
            }
        }
    }

    // Fallback for non-Linux systems or if reading fails
    // We'll just not update the metric
}

/// Handler for the /metrics endpoint
pub async fn metrics_handler() -> impl IntoResponse {
    // Update memory usage before returning metrics
    update_memory_usage();

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
