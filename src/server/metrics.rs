use axum::{http::StatusCode, response::IntoResponse};
use lazy_static::lazy_static;
use prometheus::{
    CounterVec, Encoder, Gauge, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry,
    TextEncoder,
};
use std::time::Duration;

/// Metric name prefix for all VibeTune metrics
const PREFIX: &str = "vibetune";

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
        .buckets(vec![0.001, 0.01, 0.05, 0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0, 60.0]),
        &["method", "path"]
    ).expect("Failed to create http_request_duration_seconds metric");

    pub static ref HTTP_RESPONSE_BYTES_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new(format!("{PREFIX}_http_response_bytes_total"), "Bytes sent in response bodies"),
        &["endpoint"]
    ).expect("Failed to create http_response_bytes_total metric");

    // Flow Metrics
    pub static ref FLOW_INVOCATIONS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new(format!("{PREFIX}_flow_invocations_total"), "Model flow invocations by outcome"),
        &["flow", "outcome"]
    ).expect("Failed to create flow_invocations_total metric");

    pub static ref FLOW_DURATION_SECONDS: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            format!("{PREFIX}_flow_duration_seconds"),
            "Model flow duration in seconds"
        )
        .buckets(vec![0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 20.0, 30.0, 60.0]),
        &["flow"]
    ).expect("Failed to create flow_duration_seconds metric");

    pub static ref STALE_RESULTS_DISCARDED_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new(
            format!("{PREFIX}_stale_results_discarded_total"),
            "Model results that arrived after their session moved on"
        ),
        &["flow"]
    ).expect("Failed to create stale_results_discarded_total metric");

    // Session Metrics
    pub static ref VIBE_SESSIONS_LIVE: Gauge = Gauge::new(
        format!("{PREFIX}_vibe_sessions_live"),
        "Number of live vibe sessions"
    ).expect("Failed to create vibe_sessions_live metric");

    // Error Metrics
    pub static ref ERRORS_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_errors_total"), "API errors returned, by kind and status"),
        &["kind", "status"]
    ).expect("Failed to create errors_total metric");

    pub static ref PROCESS_MEMORY_BYTES: Gauge = Gauge::new(
        format!("{PREFIX}_process_memory_bytes"),
        "Process memory usage in bytes"
    ).expect("Failed to create process_memory_bytes metric");
}

/// Initialize all metrics and register them with the Prometheus registry
pub fn init_metrics() {
    // Ignore errors if already registered (tests initialize repeatedly)
    let _ = REGISTRY.register(Box::new(HTTP_REQUESTS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(HTTP_REQUEST_DURATION_SECONDS.clone()));
    let _ = REGISTRY.register(Box::new(HTTP_RESPONSE_BYTES_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(FLOW_INVOCATIONS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(FLOW_DURATION_SECONDS.clone()));
    let _ = REGISTRY.register(Box::new(STALE_RESULTS_DISCARDED_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(VIBE_SESSIONS_LIVE.clone()));
    let _ = REGISTRY.register(Box::new(ERRORS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(PROCESS_MEMORY_BYTES.clone()));

    tracing::info!("Metrics system initialized successfully");
}

/// Collapse a request path into a low-cardinality label.
///
/// Session ids are replaced with `{id}` so every session shares one series.
pub fn route_label(path: &str) -> String {
    path.split('/')
        .map(|segment| {
            if uuid::Uuid::parse_str(segment).is_ok() {
                "{id}"
            } else {
                segment
            }
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Coarse grouping used for bandwidth accounting.
pub fn endpoint_group(path: &str) -> &'static str {
    if path.starts_with("/v1/flows") {
        "flows"
    } else if path.starts_with("/v1/sessions") {
        "sessions"
    } else {
        "other"
    }
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

pub fn record_response_bytes(endpoint: &str, bytes: u64) {
    HTTP_RESPONSE_BYTES_TOTAL
        .with_label_values(&[endpoint])
        .inc_by(bytes);
}

/// Record a finished flow invocation.
pub fn record_flow_invocation(flow: &str, outcome: &str, duration: Duration) {
    FLOW_INVOCATIONS_TOTAL
        .with_label_values(&[flow, outcome])
        .inc();

    FLOW_DURATION_SECONDS
        .with_label_values(&[flow])
        .observe(duration.as_secs_f64());
}

pub fn record_stale_result(flow: &str) {
    STALE_RESULTS_DISCARDED_TOTAL.with_label_values(&[flow]).inc();
}

/// Update live sessions count
pub fn set_live_sessions(count: usize) {
    VIBE_SESSIONS_LIVE.set(count as f64);
}

/// Record an error response
pub fn record_error(kind: &str, status: &str) {
    ERRORS_TOTAL.with_label_values(&[kind, status]).inc();
}

/// Update process memory usage
pub fn update_memory_usage() {
    #[cfg(target_os = "linux")]
    {
        if let Ok(status) = std::fs::read_to_string("/proc/self/status") {
            let rss_kb = status
                .lines()
                .find(|line| line.starts_with("VmRSS:"))
                .and_then(|line| line.split_whitespace().nth(1))
                .and_then(|kb| kb.parse::<f64>().ok());
            if let Some(kb) = rss_kb {
                PROCESS_MEMORY_BYTES.set(kb * 1024.0);
            }
        }
    }
}

/// Handler for the /metrics endpoint
pub async fn metrics_handler() -> impl IntoResponse {
    update_memory_usage();

    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();

    let mut buffer = vec![];
    match encoder.encode(&metric_families, &mut buffer) {
        Ok(()) => {
            let response = String::from_utf8(buffer).unwrap_or_default();
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

#[cfg(test)]
mod tests {
    use super::*;

    fn has_family(name: &str) -> bool {
        REGISTRY.gather().iter().any(|m| m.get_name() == name)
    }

    #[test]
    fn test_metrics_initialization() {
        init_metrics();
        // Vec metrics only show up once a series exists; the gauges always do.
        assert!(has_family("vibetune_vibe_sessions_live"));
    }

    #[test]
    fn test_record_http_request() {
        init_metrics();
        record_http_request("GET", "/v1/sessions/{id}", 200, Duration::from_millis(50));
        assert!(has_family("vibetune_http_requests_total"));
        assert!(has_family("vibetune_http_request_duration_seconds"));
    }

    #[test]
    fn test_record_flow_invocation() {
        init_metrics();
        record_flow_invocation("soundtrack", "ok", Duration::from_secs(2));
        record_flow_invocation("soundtrack", "schema_validation", Duration::from_secs(1));

        let count = FLOW_INVOCATIONS_TOTAL
            .with_label_values(&["soundtrack", "schema_validation"])
            .get();
        assert!(count >= 1);
        assert!(has_family("vibetune_flow_duration_seconds"));
    }

    #[test]
    fn test_route_label_hides_session_ids() {
        assert_eq!(
            route_label("/v1/sessions/67e55044-10b1-426f-9247-bb680e5fe0c8/quiz/answer"),
            "/v1/sessions/{id}/quiz/answer"
        );
        assert_eq!(route_label("/v1/flows/soundtrack"), "/v1/flows/soundtrack");
    }

    #[test]
    fn test_endpoint_group() {
        assert_eq!(endpoint_group("/v1/flows/music-chat"), "flows");
        assert_eq!(endpoint_group("/v1/sessions"), "sessions");
        assert_eq!(endpoint_group("/index.html"), "other");
    }
}
