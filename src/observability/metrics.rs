//! Prometheus counters for issuance and check-in.

use axum::{
    body::Body,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use lazy_static::lazy_static;
use prometheus::{register_int_counter_vec, Encoder, IntCounterVec, TextEncoder};

lazy_static! {
    pub static ref PASSES_ISSUED_TOTAL: IntCounterVec = register_int_counter_vec!(
        "epass_passes_issued_total",
        "Passes issued, labeled by pass type",
        &["pass_type"]
    )
    .expect("metric registers once at startup");
    pub static ref SCANS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "epass_scans_total",
        "Scan attempts, labeled by outcome",
        &["outcome"]
    )
    .expect("metric registers once at startup");
}

pub fn record_pass_issued(pass_type: &str) {
    PASSES_ISSUED_TOTAL.with_label_values(&[pass_type]).inc();
}

/// outcome: "success" | "already_scanned" | "rejected" | "not_found"
pub fn record_scan(outcome: &str) {
    SCANS_TOTAL.with_label_values(&[outcome]).inc();
}

/// Render the default registry in Prometheus text format.
pub async fn metrics_handler() -> Response {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!("failed to encode metrics: {}", e);
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, encoder.format_type())
        .body(Body::from(buffer))
        .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
}
