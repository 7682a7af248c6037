pub mod config;
pub mod dtos;
pub mod handlers;
pub mod models;
pub mod pricing;
pub mod report;
pub mod services;
pub mod startup;
pub mod status;

use std::sync::Arc;

use axum::middleware::from_fn;
use axum::{routing::get, Router};
use service_core::middleware::{
    metrics::metrics_middleware,
    tracing::{request_id, request_id_middleware},
};
use tower_http::trace::TraceLayer;

use services::{PaymentManager, PaymentStore, RevenueReporter};

pub use startup::Application;

/// Shared handler state. Every component reads through the same store.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn PaymentStore>,
    pub payments: PaymentManager,
    pub reports: RevenueReporter,
}

impl AppState {
    pub fn new(store: Arc<dyn PaymentStore>) -> Self {
        Self {
            payments: PaymentManager::new(store.clone()),
            reports: RevenueReporter::new(store.clone()),
            store,
        }
    }
}

/// HTTP routes with the request-id, metrics and trace layers applied.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        .route("/metrics", get(handlers::metrics_endpoint))
        .route(
            "/payments",
            axum::routing::post(handlers::payments::create_payment),
        )
        .route("/payments/chart", get(handlers::reports::revenue_chart))
        .route("/payments/summary", get(handlers::payments::payment_summary))
        .route(
            "/payments/:id",
            get(handlers::payments::get_payment)
                .put(handlers::payments::update_payment_status)
                .delete(handlers::payments::delete_payment),
        )
        .route(
            "/users/:user_id/payments",
            get(handlers::payments::list_user_payments),
        )
        .route("/bookings/:id/quote", get(handlers::bookings::quote_booking))
        .route("/payment-statuses", get(handlers::reference::list_statuses))
        .route("/paymethods", get(handlers::reference::list_paymethods))
        .layer(from_fn(metrics_middleware))
        .layer(from_fn(request_id_middleware))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                let request_id = request_id(request.headers()).unwrap_or("-");

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri(),
                    version = ?request.version(),
                )
            }),
        )
        .with_state(state)
}
