//! Payment record management: checkout, receipts, history, status updates
//! and soft deletion.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use service_core::error::AppError;
use tracing::{error, info, instrument, warn};
use validator::{Validate, ValidationError, ValidationErrors};

use crate::dtos::{
    BookingWithRoom, CreatePaymentRequest, PaymentDetail, PaymentListItem,
    UpdatePaymentStatusRequest, UserPayments,
};
use crate::models::{BookingDetail, Payment, PaymentMethod, PaymentStatus};
use crate::pricing::{self, Quote};
use crate::services::metrics::{
    PAYMENTS_CREATED_TOTAL, PAYMENT_FAILURES_TOTAL, STATUS_UPDATES_TOTAL,
};
use crate::services::store::PaymentStore;
use crate::status::{self, Transition};

/// Result of a successful checkout.
#[derive(Debug, Clone)]
pub struct CreatedPayment {
    pub payment: Payment,
    pub quote: Quote,
}

/// Aggregate quote over every active payment, for the dashboard.
#[derive(Debug, Clone)]
pub struct PaymentSummary {
    pub quote: Quote,
    pub payments: usize,
    pub latest_method: Option<PaymentMethod>,
}

#[derive(Debug, Clone)]
pub struct StatusUpdate {
    pub payment: Payment,
    pub status: Option<PaymentStatus>,
    pub transition: Transition,
}

#[derive(Clone)]
pub struct PaymentManager {
    store: Arc<dyn PaymentStore>,
}

fn exists_error(message: &'static str) -> ValidationError {
    ValidationError::new("exists").with_message(message.into())
}

fn processing_failure() -> AppError {
    AppError::InternalError(anyhow::anyhow!(
        "The payment could not be processed, please try again"
    ))
}

impl PaymentManager {
    pub fn new(store: Arc<dyn PaymentStore>) -> Self {
        Self { store }
    }

    /// Validate the checkout form, price the booking and persist the payment
    /// with its frozen total.
    ///
    /// Field problems, including references to rows that do not exist, come
    /// back as [`AppError::InvalidInput`] before anything is written.
    #[instrument(skip(self, request), fields(booking_id = ?request.booking_id, user_id = ?request.user_id))]
    pub async fn create(&self, request: CreatePaymentRequest) -> Result<CreatedPayment, AppError> {
        let mut errors = match request.validate() {
            Ok(()) => ValidationErrors::new(),
            Err(errors) => errors,
        };

        if let Some(id) = request.booking_id {
            if !self.store.booking_exists(id).await? {
                errors.add("booking_id", exists_error("Booking does not exist"));
            }
        }
        if let Some(id) = request.user_id {
            if !self.store.user_exists(id).await? {
                errors.add("user_id", exists_error("User does not exist"));
            }
        }
        if let Some(id) = request.paymethod_id {
            if self.store.find_paymethod(id).await?.is_none() {
                errors.add("paymethod_id", exists_error("Payment method does not exist"));
            }
        }
        if let Some(id) = request.status_id {
            if self.store.find_status(id).await?.is_none() {
                errors.add("status_id", exists_error("Payment status does not exist"));
            }
        }

        if !errors.errors().is_empty() {
            return Err(AppError::InvalidInput(errors.into()));
        }

        let new_payment = request
            .into_new_payment(status::PENDING)
            .ok_or_else(|| AppError::BadRequest(anyhow::anyhow!("Incomplete checkout form")))?;
        let booking_id = new_payment.booking_id;

        let (payment, quote) = self.store.create_payment(new_payment).await.map_err(|e| {
            error!(booking_id, error = %e, "Payment creation rolled back");
            PAYMENT_FAILURES_TOTAL
                .with_label_values(&["create_payment"])
                .inc();
            processing_failure()
        })?;

        PAYMENTS_CREATED_TOTAL
            .with_label_values(&[&payment.status_id.to_string()])
            .inc();
        info!(
            payment_id = payment.id,
            total_amount = %payment.total_amount,
            status_id = payment.status_id,
            "Payment recorded"
        );

        Ok(CreatedPayment { payment, quote })
    }

    /// Receipt view of one payment.
    #[instrument(skip(self))]
    pub async fn show(&self, id: i64) -> Result<PaymentDetail, AppError> {
        let payment = self.find_active(id).await?;

        let detail = self
            .store
            .load_bookings(&[payment.booking_id])
            .await?
            .pop()
            .ok_or_else(|| {
                AppError::InternalError(anyhow::anyhow!(
                    "Booking {} referenced by payment {} is missing",
                    payment.booking_id,
                    payment.id
                ))
            })?;

        let payment_method = self
            .store
            .find_paymethod(payment.paymethod_id)
            .await?
            .map(|m| m.name);
        let status = self
            .store
            .find_status(payment.status_id)
            .await?
            .map(|s| s.status_name);

        let BookingDetail {
            booking,
            room,
            size,
            services,
            ..
        } = detail;

        Ok(PaymentDetail {
            payment,
            room,
            service: services,
            booking,
            payment_method,
            status,
            size: size.map(|s| s.name),
        })
    }

    /// A user's payment history, newest first, with the bookings and rooms it
    /// references flattened alongside.
    #[instrument(skip(self))]
    pub async fn list_for_user(&self, user_id: i64) -> Result<UserPayments, AppError> {
        let payments = self.store.list_user_payments(user_id).await?;

        let booking_ids: Vec<i64> = payments
            .iter()
            .map(|p| p.booking_id)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let bookings: HashMap<i64, _> = self
            .store
            .bookings_by_ids(&booking_ids)
            .await?
            .into_iter()
            .map(|b| (b.id, b))
            .collect();

        let room_ids: Vec<i64> = bookings
            .values()
            .map(|b| b.room_id)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let rooms: HashMap<i64, _> = self
            .store
            .rooms_by_ids(&room_ids)
            .await?
            .into_iter()
            .map(|r| (r.id, r))
            .collect();

        let statuses: HashMap<i64, PaymentStatus> = self
            .store
            .list_statuses()
            .await?
            .into_iter()
            .map(|s| (s.id, s))
            .collect();

        let mut flat_bookings = Vec::new();
        let mut flat_rooms = Vec::new();
        let items = payments
            .into_iter()
            .map(|payment| {
                let booking = bookings.get(&payment.booking_id).cloned().map(|booking| {
                    let room = rooms.get(&booking.room_id).cloned();
                    flat_bookings.push(booking.clone());
                    if let Some(room) = &room {
                        flat_rooms.push(room.clone());
                    }
                    BookingWithRoom { booking, room }
                });
                PaymentListItem {
                    status: statuses.get(&payment.status_id).cloned(),
                    payment,
                    booking,
                }
            })
            .collect::<Vec<_>>();

        let user = items.first().map(|item| item.payment.user_id);

        Ok(UserPayments {
            payment: items,
            user,
            booking: flat_bookings,
            room: flat_rooms,
        })
    }

    /// Move a payment to a new status through the transition rules.
    ///
    /// The payment must exist (not found otherwise); the requested status must
    /// be a known one (validation error otherwise, nothing written).
    #[instrument(skip(self))]
    pub async fn update_status(
        &self,
        id: i64,
        request: UpdatePaymentStatusRequest,
    ) -> Result<StatusUpdate, AppError> {
        self.find_active(id).await?;

        request.validate()?;
        let requested = request
            .status_id
            .ok_or_else(|| AppError::BadRequest(anyhow::anyhow!("Status is required")))?;

        let transition = status::resolve(requested);
        if let Some(rule) = transition.rule {
            warn!(
                payment_id = id,
                requested = transition.requested,
                effective = transition.effective,
                rule,
                "Requested status rewritten by transition rule"
            );
        }

        let payment = match self.store.apply_status(id, transition).await {
            Ok(Some(payment)) => payment,
            Ok(None) => {
                return Err(AppError::NotFound(anyhow::anyhow!("Payment not found")));
            }
            Err(e @ AppError::ValidationError(_)) => return Err(e),
            Err(e) => {
                error!(payment_id = id, error = %e, "Status update rolled back");
                PAYMENT_FAILURES_TOTAL
                    .with_label_values(&["update_status"])
                    .inc();
                return Err(AppError::InternalError(anyhow::anyhow!(
                    "The status could not be updated, please try again"
                )));
            }
        };

        STATUS_UPDATES_TOTAL
            .with_label_values(&[transition.rule.unwrap_or("none")])
            .inc();

        let status = self.store.find_status(payment.status_id).await?;

        Ok(StatusUpdate {
            payment,
            status,
            transition,
        })
    }

    /// Soft delete. Financial records are never physically removed.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: i64) -> Result<(), AppError> {
        if !self.store.soft_delete_payment(id).await? {
            return Err(AppError::NotFound(anyhow::anyhow!("Payment not found")));
        }
        info!(payment_id = id, "Payment soft-deleted");
        Ok(())
    }

    /// Quote a booking before checkout. Nothing is written.
    #[instrument(skip(self))]
    pub async fn quote_booking(&self, booking_id: i64) -> Result<BookingDetail, AppError> {
        self.store
            .load_bookings(&[booking_id])
            .await?
            .pop()
            .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Booking not found")))
    }

    /// Sum the quote of every active payment's booking.
    ///
    /// Bookings are re-priced from their current rows here; the stored
    /// `total_amount` of each payment is left untouched.
    #[instrument(skip(self))]
    pub async fn summary(&self) -> Result<PaymentSummary, AppError> {
        let payments = self.store.list_active_payments().await?;

        let booking_ids: Vec<i64> = payments.iter().map(|p| p.booking_id).collect();
        let details: HashMap<i64, BookingDetail> = self
            .store
            .load_bookings(&booking_ids)
            .await?
            .into_iter()
            .map(|d| (d.booking.id, d))
            .collect();

        // One quote per payment, so a booking paid twice counts twice.
        let quote =
            pricing::summarize(payments.iter().filter_map(|p| details.get(&p.booking_id)))?;

        let latest_method = match payments.first() {
            Some(latest) => self.store.find_paymethod(latest.paymethod_id).await?,
            None => None,
        };

        Ok(PaymentSummary {
            quote,
            payments: payments.len(),
            latest_method,
        })
    }

    pub async fn list_statuses(&self) -> Result<Vec<PaymentStatus>, AppError> {
        self.store.list_statuses().await
    }

    pub async fn list_paymethods(&self) -> Result<Vec<PaymentMethod>, AppError> {
        self.store.list_paymethods().await
    }

    async fn find_active(&self, id: i64) -> Result<Payment, AppError> {
        self.store
            .get_payment(id)
            .await?
            .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Payment not found")))
    }
}
