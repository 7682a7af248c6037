//! Payment endpoints.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use service_core::error::AppError;
use service_core::extract::{CommandJson, FormJson};

use crate::dtos::{
    CreatePaymentRequest, CreatePaymentResponse, MessageResponse, PaymentDetailResponse,
    PaymentSummaryResponse, UpdatePaymentStatusRequest, UpdatePaymentStatusResponse,
    UserPaymentsResponse,
};
use crate::AppState;

/// Check out a booking.
///
/// POST /payments
pub async fn create_payment(
    State(state): State<AppState>,
    FormJson(payload): FormJson<CreatePaymentRequest>,
) -> Result<(StatusCode, Json<CreatePaymentResponse>), AppError> {
    let created = state.payments.create(payload).await?;

    Ok((
        StatusCode::CREATED,
        Json(CreatePaymentResponse {
            status: "Payment recorded successfully".to_string(),
            payment_id: created.payment.id,
            total_amount: created.payment.total_amount,
        }),
    ))
}

/// Payment receipt.
///
/// GET /payments/:id
pub async fn get_payment(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<PaymentDetailResponse>, AppError> {
    let payment = state.payments.show(id).await?;
    Ok(Json(PaymentDetailResponse { payment }))
}

/// A user's payment history.
///
/// GET /users/:user_id/payments
pub async fn list_user_payments(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
) -> Result<Json<UserPaymentsResponse>, AppError> {
    let data = state.payments.list_for_user(user_id).await?;
    Ok(Json(UserPaymentsResponse { status: true, data }))
}

/// Change a payment's status.
///
/// PUT /payments/:id
pub async fn update_payment_status(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    CommandJson(payload): CommandJson<UpdatePaymentStatusRequest>,
) -> Result<Json<UpdatePaymentStatusResponse>, AppError> {
    let update = state.payments.update_status(id, payload).await?;

    Ok(Json(UpdatePaymentStatusResponse {
        message: "Payment status updated".to_string(),
        payment: update.payment,
        status_payment: update.status,
    }))
}

/// Soft delete a payment.
///
/// DELETE /payments/:id
pub async fn delete_payment(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<MessageResponse>, AppError> {
    state.payments.delete(id).await?;
    Ok(Json(MessageResponse {
        message: "Payment deleted".to_string(),
    }))
}

/// Subtotals summed over every active payment.
///
/// GET /payments/summary
pub async fn payment_summary(
    State(state): State<AppState>,
) -> Result<Json<PaymentSummaryResponse>, AppError> {
    let summary = state.payments.summary().await?;
    Ok(Json(PaymentSummaryResponse {
        quote: summary.quote,
        payments: summary.payments,
        payment_method: summary.latest_method,
    }))
}
