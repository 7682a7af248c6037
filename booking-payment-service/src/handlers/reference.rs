use axum::{extract::State, Json};
use service_core::error::AppError;

use crate::models::{PaymentMethod, PaymentStatus};
use crate::AppState;

/// GET /payment-statuses
pub async fn list_statuses(
    State(state): State<AppState>,
) -> Result<Json<Vec<PaymentStatus>>, AppError> {
    Ok(Json(state.payments.list_statuses().await?))
}

/// GET /paymethods
pub async fn list_paymethods(
    State(state): State<AppState>,
) -> Result<Json<Vec<PaymentMethod>>, AppError> {
    Ok(Json(state.payments.list_paymethods().await?))
}
