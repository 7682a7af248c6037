//! Pre-checkout pricing.

use axum::{
    extract::{Path, State},
    Json,
};
use service_core::error::AppError;

use crate::dtos::QuoteResponse;
use crate::pricing;
use crate::AppState;

/// Price a booking without creating a payment.
///
/// GET /bookings/:id/quote
pub async fn quote_booking(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<QuoteResponse>, AppError> {
    let detail = state.payments.quote_booking(id).await?;
    let booking = &detail.booking;

    Ok(Json(QuoteResponse {
        booking_id: booking.id,
        start_date: booking.start_date,
        end_date: booking.end_date,
        days: pricing::stay_days(booking.start_date, booking.end_date),
        quote: pricing::quote(&detail)?,
    }))
}
