//! In-process [`PaymentStore`] used by handler tests and fixtures.
//!
//! One lock guards every table, so each trait method is atomic the same way a
//! single database transaction is.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use service_core::error::AppError;
use tokio::sync::RwLock;

use crate::models::{
    BookedService, Booking, BookingDetail, NewPayment, Payment, PaymentMethod, PaymentStatus,
    RevenueRow, Room, Size, Voucher,
};
use crate::pricing::{self, Quote};
use crate::services::store::{unknown_status, PaymentStore};
use crate::status::{Transition, CANCELLED, PAID, PENDING};

#[derive(Default)]
struct Tables {
    users: BTreeMap<i64, String>,
    sizes: BTreeMap<i64, Size>,
    rooms: BTreeMap<i64, Room>,
    services: BTreeMap<i64, (String, rust_decimal::Decimal)>,
    vouchers: BTreeMap<i64, Voucher>,
    bookings: BTreeMap<i64, Booking>,
    /// booking id -> (service id, quantity)
    booking_services: BTreeMap<i64, Vec<(i64, i32)>>,
    paymethods: BTreeMap<i64, PaymentMethod>,
    statuses: BTreeMap<i64, PaymentStatus>,
    payments: BTreeMap<i64, Payment>,
    next_payment_id: i64,
    fail_next_insert: bool,
}

impl Tables {
    fn detail(&self, booking_id: i64) -> Option<BookingDetail> {
        let booking = self.bookings.get(&booking_id)?.clone();
        let room = self.rooms.get(&booking.room_id)?.clone();
        let size = room.size_id.and_then(|id| self.sizes.get(&id).cloned());
        let voucher = booking
            .voucher_id
            .and_then(|id| self.vouchers.get(&id).cloned());
        let services = self
            .booking_services
            .get(&booking_id)
            .map(|lines| {
                lines
                    .iter()
                    .filter_map(|(service_id, quantity)| {
                        self.services
                            .get(service_id)
                            .map(|(name, price)| BookedService {
                                id: *service_id,
                                name: name.clone(),
                                price: *price,
                                quantity: *quantity,
                            })
                    })
                    .collect()
            })
            .unwrap_or_default();

        Some(BookingDetail {
            booking,
            room,
            size,
            services,
            voucher,
        })
    }

    fn active_payments(&self) -> impl DoubleEndedIterator<Item = &Payment> {
        self.payments.values().filter(|p| !p.is_deleted())
    }
}

#[derive(Clone, Default)]
pub struct InMemoryPaymentStore {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryPaymentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store seeded with the same statuses and payment methods as the
    /// reference-data migration.
    pub async fn with_reference_data() -> Self {
        let store = Self::new();
        for (id, name) in [(PENDING, "Pending"), (PAID, "Paid"), (CANCELLED, "Cancelled")] {
            store.insert_status(id, name).await;
        }
        store.insert_paymethod(1, "Cash at check-in").await;
        store.insert_paymethod(2, "Bank transfer").await;
        store
    }

    pub async fn insert_user(&self, id: i64, name: &str) {
        self.tables.write().await.users.insert(id, name.to_string());
    }

    pub async fn insert_size(&self, size: Size) {
        self.tables.write().await.sizes.insert(size.id, size);
    }

    pub async fn insert_room(&self, room: Room) {
        self.tables.write().await.rooms.insert(room.id, room);
    }

    pub async fn insert_service(&self, id: i64, name: &str, price: rust_decimal::Decimal) {
        self.tables
            .write()
            .await
            .services
            .insert(id, (name.to_string(), price));
    }

    pub async fn insert_voucher(&self, voucher: Voucher) {
        self.tables.write().await.vouchers.insert(voucher.id, voucher);
    }

    /// Insert a booking with its `(service id, quantity)` lines.
    pub async fn insert_booking(&self, booking: Booking, services: Vec<(i64, i32)>) {
        let mut tables = self.tables.write().await;
        tables.booking_services.insert(booking.id, services);
        tables.bookings.insert(booking.id, booking);
    }

    pub async fn insert_paymethod(&self, id: i64, name: &str) {
        self.tables.write().await.paymethods.insert(
            id,
            PaymentMethod {
                id,
                name: name.to_string(),
            },
        );
    }

    pub async fn insert_status(&self, id: i64, name: &str) {
        self.tables.write().await.statuses.insert(
            id,
            PaymentStatus {
                id,
                status_name: name.to_string(),
            },
        );
    }

    /// Change a room's rate after the fact, as an admin edit would.
    pub async fn set_room_price(&self, room_id: i64, price: rust_decimal::Decimal) {
        if let Some(room) = self.tables.write().await.rooms.get_mut(&room_id) {
            room.price = price;
        }
    }

    /// Move a payment's creation time, for report fixtures.
    pub async fn set_payment_created_at(&self, payment_id: i64, at: DateTime<Utc>) {
        if let Some(payment) = self.tables.write().await.payments.get_mut(&payment_id) {
            payment.created_at = at;
        }
    }

    /// Make the next payment insert fail after pricing, to exercise rollback.
    pub async fn fail_next_insert(&self) {
        self.tables.write().await.fail_next_insert = true;
    }

    /// Raw row lookup, including soft-deleted payments.
    pub async fn raw_payment(&self, id: i64) -> Option<Payment> {
        self.tables.read().await.payments.get(&id).cloned()
    }

    pub async fn payment_count(&self) -> usize {
        self.tables.read().await.payments.len()
    }
}

#[async_trait]
impl PaymentStore for InMemoryPaymentStore {
    async fn health_check(&self) -> Result<(), AppError> {
        Ok(())
    }

    async fn booking_exists(&self, id: i64) -> Result<bool, AppError> {
        Ok(self.tables.read().await.bookings.contains_key(&id))
    }

    async fn user_exists(&self, id: i64) -> Result<bool, AppError> {
        Ok(self.tables.read().await.users.contains_key(&id))
    }

    async fn find_paymethod(&self, id: i64) -> Result<Option<PaymentMethod>, AppError> {
        Ok(self.tables.read().await.paymethods.get(&id).cloned())
    }

    async fn find_status(&self, id: i64) -> Result<Option<PaymentStatus>, AppError> {
        Ok(self.tables.read().await.statuses.get(&id).cloned())
    }

    async fn list_paymethods(&self) -> Result<Vec<PaymentMethod>, AppError> {
        Ok(self.tables.read().await.paymethods.values().cloned().collect())
    }

    async fn list_statuses(&self) -> Result<Vec<PaymentStatus>, AppError> {
        Ok(self.tables.read().await.statuses.values().cloned().collect())
    }

    async fn load_bookings(&self, ids: &[i64]) -> Result<Vec<BookingDetail>, AppError> {
        let tables = self.tables.read().await;
        let mut ids = ids.to_vec();
        ids.sort_unstable();
        ids.dedup();
        Ok(ids.into_iter().filter_map(|id| tables.detail(id)).collect())
    }

    async fn bookings_by_ids(&self, ids: &[i64]) -> Result<Vec<Booking>, AppError> {
        let tables = self.tables.read().await;
        Ok(tables
            .bookings
            .values()
            .filter(|b| ids.contains(&b.id))
            .cloned()
            .collect())
    }

    async fn rooms_by_ids(&self, ids: &[i64]) -> Result<Vec<Room>, AppError> {
        let tables = self.tables.read().await;
        Ok(tables
            .rooms
            .values()
            .filter(|r| ids.contains(&r.id))
            .cloned()
            .collect())
    }

    async fn create_payment(&self, input: NewPayment) -> Result<(Payment, Quote), AppError> {
        let mut tables = self.tables.write().await;

        let detail = tables.detail(input.booking_id).ok_or_else(|| {
            AppError::NotFound(anyhow::anyhow!("Booking {} not found", input.booking_id))
        })?;
        let quote = pricing::quote(&detail)?;

        if std::mem::take(&mut tables.fail_next_insert) {
            return Err(AppError::DatabaseError(anyhow::anyhow!(
                "insert into payments failed"
            )));
        }

        tables.next_payment_id += 1;
        let now = Utc::now();
        let payment = Payment {
            id: tables.next_payment_id,
            booking_id: input.booking_id,
            user_id: input.user_id,
            paymethod_id: input.paymethod_id,
            status_id: input.status_id,
            pet_name: input.pet_name,
            pet_type: input.pet_type,
            pet_description: input.pet_description,
            pet_health: input.pet_health,
            user_name: input.user_name,
            user_address: input.user_address,
            user_email: input.user_email,
            user_phone: input.user_phone,
            total_amount: quote.total_amount,
            deleted_at: None,
            created_at: now,
            updated_at: now,
        };
        tables.payments.insert(payment.id, payment.clone());

        Ok((payment, quote))
    }

    async fn get_payment(&self, id: i64) -> Result<Option<Payment>, AppError> {
        Ok(self
            .tables
            .read()
            .await
            .payments
            .get(&id)
            .filter(|p| !p.is_deleted())
            .cloned())
    }

    async fn list_user_payments(&self, user_id: i64) -> Result<Vec<Payment>, AppError> {
        let tables = self.tables.read().await;
        Ok(tables
            .active_payments()
            .rev()
            .filter(|p| p.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn list_active_payments(&self) -> Result<Vec<Payment>, AppError> {
        let tables = self.tables.read().await;
        Ok(tables.active_payments().rev().cloned().collect())
    }

    async fn apply_status(
        &self,
        id: i64,
        transition: Transition,
    ) -> Result<Option<Payment>, AppError> {
        let mut tables = self.tables.write().await;

        if !tables.statuses.contains_key(&transition.requested) {
            return Err(unknown_status(transition.requested));
        }

        Ok(tables
            .payments
            .get_mut(&id)
            .filter(|p| !p.is_deleted())
            .map(|payment| {
                payment.status_id = transition.effective;
                payment.updated_at = Utc::now();
                payment.clone()
            }))
    }

    async fn soft_delete_payment(&self, id: i64) -> Result<bool, AppError> {
        let mut tables = self.tables.write().await;
        match tables.payments.get_mut(&id) {
            Some(payment) if !payment.is_deleted() => {
                let now = Utc::now();
                payment.deleted_at = Some(now);
                payment.updated_at = now;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn revenue_rows(
        &self,
        from: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<Vec<RevenueRow>, AppError> {
        let tables = self.tables.read().await;
        let mut rows: Vec<RevenueRow> = tables
            .active_payments()
            .filter(|p| p.status_id != CANCELLED)
            .filter(|p| p.created_at >= from && p.created_at < until)
            .map(|p| RevenueRow {
                created_at: p.created_at,
                total_amount: p.total_amount,
            })
            .collect();
        rows.sort_by_key(|r| r.created_at);
        Ok(rows)
    }
}
