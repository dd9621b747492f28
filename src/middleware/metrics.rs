// ============================================================================
// Prometheus Metrics
// ============================================================================
//
// ## HTTP metrics:
//
// - passport_http_request_duration_seconds (histogram; method, path, status)
// - passport_http_requests_total            (counter;   method, path, status)
// - passport_auth_failures_total            (counter;   reason)
//
// ## Inquiry metrics:
//
// - passport_inquiries_created_total            (counter)
// - passport_inquiry_messages_total             (counter; message_type)
// - passport_inquiry_status_transitions_total   (counter; from, to, path)
//   path is "explicit" (status endpoint), "message" (message side effect)
//   or "expiry" (background sweep)
//
// Scrape endpoint: GET /metrics
//
// ============================================================================

use axum::{
    extract::Request,
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use lazy_static::lazy_static;
use prometheus::{
    register_counter, register_counter_vec, register_histogram_vec, Counter, CounterVec,
    Encoder, HistogramVec, TextEncoder,
};
use std::time::Instant;

use crate::models::{InquiryStatus, MessageType};

lazy_static! {
    pub static ref HTTP_REQUEST_DURATION: HistogramVec = register_histogram_vec!(
        "passport_http_request_duration_seconds",
        "HTTP request latency in seconds",
        &["method", "path", "status"],
        vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0]
    )
    .expect("register http duration histogram");

    pub static ref HTTP_REQUESTS_TOTAL: CounterVec = register_counter_vec!(
        "passport_http_requests_total",
        "Total number of HTTP requests",
        &["method", "path", "status"]
    )
    .expect("register http request counter");

    pub static ref AUTH_FAILURES_TOTAL: CounterVec = register_counter_vec!(
        "passport_auth_failures_total",
        "Total number of authentication failures",
        &["reason"]
    )
    .expect("register auth failure counter");

    pub static ref INQUIRIES_CREATED_TOTAL: Counter = register_counter!(
        "passport_inquiries_created_total",
        "Total number of inquiries created"
    )
    .expect("register inquiry counter");

    pub static ref INQUIRY_MESSAGES_TOTAL: CounterVec = register_counter_vec!(
        "passport_inquiry_messages_total",
        "Total number of inquiry messages sent",
        &["message_type"]
    )
    .expect("register inquiry message counter");

    pub static ref INQUIRY_STATUS_TRANSITIONS_TOTAL: CounterVec = register_counter_vec!(
        "passport_inquiry_status_transitions_total",
        "Inquiry status transitions by origin",
        &["from", "to", "path"]
    )
    .expect("register status transition counter");
}

/// /api/inquiries/6f1c...-.../status -> /api/inquiries/:id/status
fn normalize_path(path: &str) -> String {
    let normalized: Vec<&str> = path
        .split('/')
        .filter(|segment| !segment.is_empty())
        .map(|segment| {
            if uuid::Uuid::parse_str(segment).is_ok() || segment.parse::<i64>().is_ok() {
                ":id"
            } else {
                segment
            }
        })
        .collect();

    format!("/{}", normalized.join("/"))
}

pub async fn metrics_middleware(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let path = normalize_path(request.uri().path());

    let response = next.run(request).await;

    let duration = start.elapsed();
    let status = response.status().as_u16().to_string();

    HTTP_REQUEST_DURATION
        .with_label_values(&[method.as_str(), &path, &status])
        .observe(duration.as_secs_f64());
    HTTP_REQUESTS_TOTAL
        .with_label_values(&[method.as_str(), &path, &status])
        .inc();

    tracing::debug!(
        target: "metrics",
        method = %method,
        path = %path,
        status = %status,
        duration_ms = %duration.as_millis(),
        "HTTP request completed"
    );

    response
}

pub async fn metrics_handler() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = vec![];

    match encoder.encode(&metric_families, &mut buffer) {
        Ok(_) => (
            StatusCode::OK,
            [(axum::http::header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            buffer,
        ),
        Err(e) => {
            tracing::error!("Failed to encode metrics: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                [(axum::http::header::CONTENT_TYPE, "text/plain; version=0.0.4")],
                format!("Failed to encode metrics: {}", e).into_bytes(),
            )
        }
    }
}

pub fn record_auth_failure(reason: &str) {
    AUTH_FAILURES_TOTAL.with_label_values(&[reason]).inc();
    tracing::warn!(target: "security", reason = %reason, "Authentication failure recorded");
}

pub fn record_inquiry_created() {
    INQUIRIES_CREATED_TOTAL.inc();
}

pub fn record_message_sent(message_type: MessageType) {
    INQUIRY_MESSAGES_TOTAL
        .with_label_values(&[message_type.as_str()])
        .inc();
}

pub fn record_status_transition(from: InquiryStatus, to: InquiryStatus, path: &str) {
    INQUIRY_STATUS_TRANSITIONS_TOTAL
        .with_label_values(&[from.as_str(), to.as_str(), path])
        .inc();
}
