//! Storage seam between the payment logic and the relational tables.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use service_core::error::{AppError, FieldErrors};

use crate::models::{
    Booking, BookingDetail, NewPayment, Payment, PaymentMethod, PaymentStatus, RevenueRow, Room,
};
use crate::pricing::Quote;
use crate::status::Transition;

/// Everything the payment service reads or writes.
///
/// Reads exclude soft-deleted payments unless stated otherwise. Write
/// operations are atomic: either every row they touch is committed or none is.
#[async_trait]
pub trait PaymentStore: Send + Sync + 'static {
    async fn health_check(&self) -> Result<(), AppError>;

    async fn booking_exists(&self, id: i64) -> Result<bool, AppError>;
    async fn user_exists(&self, id: i64) -> Result<bool, AppError>;
    async fn find_paymethod(&self, id: i64) -> Result<Option<PaymentMethod>, AppError>;
    async fn find_status(&self, id: i64) -> Result<Option<PaymentStatus>, AppError>;
    async fn list_paymethods(&self) -> Result<Vec<PaymentMethod>, AppError>;
    async fn list_statuses(&self) -> Result<Vec<PaymentStatus>, AppError>;

    /// Bookings with room, size, services and voucher. Unknown ids are skipped.
    async fn load_bookings(&self, ids: &[i64]) -> Result<Vec<BookingDetail>, AppError>;
    async fn bookings_by_ids(&self, ids: &[i64]) -> Result<Vec<Booking>, AppError>;
    async fn rooms_by_ids(&self, ids: &[i64]) -> Result<Vec<Room>, AppError>;

    /// Load the booking, price it with [`crate::pricing::quote`] and insert the
    /// payment with that frozen total, all in one transaction.
    async fn create_payment(&self, input: NewPayment) -> Result<(Payment, Quote), AppError>;

    async fn get_payment(&self, id: i64) -> Result<Option<Payment>, AppError>;

    /// A user's payments, newest first.
    async fn list_user_payments(&self, user_id: i64) -> Result<Vec<Payment>, AppError>;

    /// Every payment, newest first.
    async fn list_active_payments(&self) -> Result<Vec<Payment>, AppError>;

    /// In one transaction: reject with a validation error when
    /// `transition.requested` is not a known status, then store
    /// `transition.effective`. `None` when the payment does not exist.
    async fn apply_status(
        &self,
        id: i64,
        transition: Transition,
    ) -> Result<Option<Payment>, AppError>;

    /// Mark the payment deleted. `false` when it was missing or already deleted.
    async fn soft_delete_payment(&self, id: i64) -> Result<bool, AppError>;

    /// Totals of payments created in `[from, until)`, excluding cancelled ones.
    async fn revenue_rows(
        &self,
        from: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<Vec<RevenueRow>, AppError>;
}

pub(crate) fn unknown_status(id: i64) -> AppError {
    AppError::ValidationError(FieldErrors::single(
        "status_id",
        format!("Payment status {} does not exist", id),
    ))
}
