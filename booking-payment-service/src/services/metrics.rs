//! Prometheus metrics for booking-payment-service.
//!
//! HTTP request metrics go through the `metrics` facade (see
//! `service_core::middleware::metrics`) and are rendered by the exporter
//! handle; service metrics below live in the default prometheus registry.

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::Lazy;
use prometheus::{
    register_histogram_vec, register_int_counter_vec, Encoder, HistogramVec, IntCounterVec,
    TextEncoder,
};
use std::sync::OnceLock;

pub static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Payments created, labelled by the initial status id.
pub static PAYMENTS_CREATED_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "booking_payments_created_total",
        "Total number of payments created",
        &["status"]
    )
    .expect("Failed to register booking_payments_created_total")
});

/// Status updates, labelled by the transition rule that fired ("none" when
/// the requested status was stored as is).
pub static STATUS_UPDATES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "booking_payment_status_updates_total",
        "Total number of payment status updates",
        &["rule"]
    )
    .expect("Failed to register booking_payment_status_updates_total")
});

/// Failed write operations, by operation.
pub static PAYMENT_FAILURES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "booking_payment_failures_total",
        "Total number of payment operations rolled back",
        &["operation"]
    )
    .expect("Failed to register booking_payment_failures_total")
});

pub static DB_QUERY_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "booking_payment_db_query_duration_seconds",
        "Database query duration in seconds",
        &["operation"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0]
    )
    .expect("Failed to register booking_payment_db_query_duration_seconds")
});

/// Install the HTTP metrics recorder and force registration of the service
/// metrics. Call once, from `main`.
pub fn init_metrics() {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .expect("failed to install Prometheus recorder");

    if METRICS_HANDLE.set(handle).is_err() {
        panic!("failed to set metrics handle: already initialized");
    }

    Lazy::force(&PAYMENTS_CREATED_TOTAL);
    Lazy::force(&STATUS_UPDATES_TOTAL);
    Lazy::force(&PAYMENT_FAILURES_TOTAL);
    Lazy::force(&DB_QUERY_DURATION);
}

/// Get metrics in Prometheus text format.
pub fn get_metrics() -> String {
    let mut output = METRICS_HANDLE
        .get()
        .map(|handle| handle.render())
        .unwrap_or_default();

    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    encoder.encode(&prometheus::gather(), &mut buffer).ok();
    if let Ok(custom_metrics) = String::from_utf8(buffer) {
        output.push_str(&custom_metrics);
    }

    output
}
