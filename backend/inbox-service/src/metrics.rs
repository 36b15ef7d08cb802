use std::time::Instant;

use axum::{
    body::Body,
    extract::MatchedPath,
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use once_cell::sync::Lazy;
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts, TextEncoder,
};

static HTTP_REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    let counter = IntCounterVec::new(
        Opts::new(
            "inbox_service_http_requests_total",
            "Total HTTP requests handled by inbox-service",
        ),
        &["method", "path", "status"],
    )
    .expect("failed to create inbox_service_http_requests_total");
    prometheus::default_registry()
        .register(Box::new(counter.clone()))
        .expect("failed to register inbox_service_http_requests_total");
    counter
});

static HTTP_REQUEST_DURATION_SECONDS: Lazy<HistogramVec> = Lazy::new(|| {
    let histogram = HistogramVec::new(
        HistogramOpts::new(
            "inbox_service_http_request_duration_seconds",
            "HTTP request latencies for inbox-service",
        )
        .buckets(vec![
            0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5,
        ]),
        &["method", "path", "status"],
    )
    .expect("failed to create inbox_service_http_request_duration_seconds");
    prometheus::default_registry()
        .register(Box::new(histogram.clone()))
        .expect("failed to register inbox_service_http_request_duration_seconds");
    histogram
});

static MESSAGES_SENT_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    let counter = IntCounter::new(
        "inbox_service_messages_sent_total",
        "Messages accepted by the send pipeline",
    )
    .expect("failed to create inbox_service_messages_sent_total");
    prometheus::default_registry()
        .register(Box::new(counter.clone()))
        .expect("failed to register inbox_service_messages_sent_total");
    counter
});

static NOTIFICATIONS_CREATED_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    let counter = IntCounter::new(
        "inbox_service_notifications_created_total",
        "Notifications stored after dedup",
    )
    .expect("failed to create inbox_service_notifications_created_total");
    prometheus::default_registry()
        .register(Box::new(counter.clone()))
        .expect("failed to register inbox_service_notifications_created_total");
    counter
});

static NOTIFICATIONS_DEDUPLICATED_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    let counter = IntCounter::new(
        "inbox_service_notifications_deduplicated_total",
        "Notification creates collapsed into an existing record",
    )
    .expect("failed to create inbox_service_notifications_deduplicated_total");
    prometheus::default_registry()
        .register(Box::new(counter.clone()))
        .expect("failed to register inbox_service_notifications_deduplicated_total");
    counter
});

static STORIES_SWEPT_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    let counter = IntCounter::new(
        "inbox_service_stories_swept_total",
        "Stories deactivated by the expiry sweep",
    )
    .expect("failed to create inbox_service_stories_swept_total");
    prometheus::default_registry()
        .register(Box::new(counter.clone()))
        .expect("failed to register inbox_service_stories_swept_total");
    counter
});

static LIVE_SESSIONS: Lazy<IntGauge> = Lazy::new(|| {
    let gauge = IntGauge::new(
        "inbox_service_live_sessions",
        "Currently connected real-time sessions",
    )
    .expect("failed to create inbox_service_live_sessions");
    prometheus::default_registry()
        .register(Box::new(gauge.clone()))
        .expect("failed to register inbox_service_live_sessions");
    gauge
});

pub fn record_message_sent() {
    MESSAGES_SENT_TOTAL.inc();
}

pub fn record_notification_created() {
    NOTIFICATIONS_CREATED_TOTAL.inc();
}

pub fn record_notification_deduplicated() {
    NOTIFICATIONS_DEDUPLICATED_TOTAL.inc();
}

pub fn record_stories_swept(count: u64) {
    STORIES_SWEPT_TOTAL.inc_by(count);
}

pub fn set_live_sessions(count: i64) {
    LIVE_SESSIONS.set(count);
}

pub async fn track_http_metrics(req: Request<Body>, next: Next) -> Response {
    let method = req.method().as_str().to_string();
    let path = req
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| req.uri().path().to_string());
    let start = Instant::now();

    let response = next.run(req).await;
    let status = response.status().as_u16().to_string();
    HTTP_REQUESTS_TOTAL
        .with_label_values(&[&method, &path, &status])
        .inc();
    HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&[&method, &path, &status])
        .observe(start.elapsed().as_secs_f64());

    response
}

pub async fn metrics_handler() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();

    let mut buffer = Vec::new();
    if let Err(err) = encoder.encode(&metric_families, &mut buffer) {
        return (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()).into_response();
    }

    (
        StatusCode::OK,
        [(axum::http::header::CONTENT_TYPE, encoder.format_type())],
        buffer,
    )
        .into_response()
}
