//! PostgreSQL-backed [`PaymentStore`].

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use service_core::error::AppError;
use sqlx::postgres::{PgConnection, PgPool, PgPoolOptions};
use sqlx::FromRow;
use tracing::{info, instrument};

use crate::models::{
    BookedService, Booking, BookingDetail, NewPayment, Payment, PaymentMethod, PaymentStatus,
    RevenueRow, Room, Size, Voucher,
};
use crate::pricing::{self, Quote};
use crate::services::metrics::DB_QUERY_DURATION;
use crate::services::store::{unknown_status, PaymentStore};
use crate::status::{Transition, CANCELLED};

const PAYMENT_COLUMNS: &str = "id, booking_id, user_id, paymethod_id, status_id, \
     pet_name, pet_type, pet_description, pet_health, \
     user_name, user_address, user_email, user_phone, \
     total_amount, deleted_at, created_at, updated_at";

fn db_error(context: &'static str) -> impl Fn(sqlx::Error) -> AppError {
    move |e| AppError::DatabaseError(anyhow::anyhow!("{}: {}", context, e))
}

/// Connection pool wrapper implementing the payment store.
#[derive(Clone)]
pub struct PgPaymentStore {
    pool: PgPool,
}

impl PgPaymentStore {
    #[instrument(skip(database_url), fields(service = "booking-payment-service"))]
    pub async fn connect(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self, AppError> {
        info!(
            max_connections = max_connections,
            min_connections = min_connections,
            "Connecting to PostgreSQL"
        );

        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(Duration::from_secs(30))
            .idle_timeout(Duration::from_secs(600))
            .connect(database_url)
            .await
            .map_err(db_error("Failed to connect"))?;

        info!("PostgreSQL connection pool established");

        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    #[instrument(skip(self))]
    pub async fn run_migrations(&self) -> Result<(), AppError> {
        info!("Running database migrations");
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Migration failed: {}", e)))?;
        info!("Database migrations completed");
        Ok(())
    }

    async fn exists(&self, sql: &'static str, id: i64) -> Result<bool, AppError> {
        let found: Option<i64> = sqlx::query_scalar(sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("Failed to check reference"))?;
        Ok(found.is_some())
    }
}

#[derive(FromRow)]
struct ServiceLine {
    booking_id: i64,
    #[sqlx(flatten)]
    service: BookedService,
}

/// Load bookings with their relations on one connection, so the same code
/// serves plain reads and the payment-creation transaction.
async fn fetch_booking_details(
    conn: &mut PgConnection,
    ids: &[i64],
) -> Result<Vec<BookingDetail>, sqlx::Error> {
    let bookings = sqlx::query_as::<_, Booking>(
        r#"
        SELECT id, room_id, voucher_id, start_date, end_date, created_at
        FROM bookings
        WHERE id = ANY($1)
        ORDER BY id
        "#,
    )
    .bind(ids)
    .fetch_all(&mut *conn)
    .await?;

    if bookings.is_empty() {
        return Ok(Vec::new());
    }

    let room_ids: Vec<i64> = bookings.iter().map(|b| b.room_id).collect();
    let voucher_ids: Vec<i64> = bookings.iter().filter_map(|b| b.voucher_id).collect();
    let booking_ids: Vec<i64> = bookings.iter().map(|b| b.id).collect();

    let rooms: HashMap<i64, Room> = sqlx::query_as::<_, Room>(
        "SELECT id, name, price, size_id, quantity, status FROM rooms WHERE id = ANY($1)",
    )
    .bind(&room_ids)
    .fetch_all(&mut *conn)
    .await?
    .into_iter()
    .map(|r| (r.id, r))
    .collect();

    let size_ids: Vec<i64> = rooms.values().filter_map(|r| r.size_id).collect();
    let sizes: HashMap<i64, Size> =
        sqlx::query_as::<_, Size>("SELECT id, name FROM sizes WHERE id = ANY($1)")
            .bind(&size_ids)
            .fetch_all(&mut *conn)
            .await?
            .into_iter()
            .map(|s| (s.id, s))
            .collect();

    let vouchers: HashMap<i64, Voucher> =
        sqlx::query_as::<_, Voucher>("SELECT id, code, discount FROM vouchers WHERE id = ANY($1)")
            .bind(&voucher_ids)
            .fetch_all(&mut *conn)
            .await?
            .into_iter()
            .map(|v| (v.id, v))
            .collect();

    let mut services: HashMap<i64, Vec<BookedService>> = HashMap::new();
    let lines = sqlx::query_as::<_, ServiceLine>(
        r#"
        SELECT bs.booking_id, s.id, s.name, s.price, bs.quantity
        FROM booking_services bs
        JOIN services s ON s.id = bs.service_id
        WHERE bs.booking_id = ANY($1)
        ORDER BY s.id
        "#,
    )
    .bind(&booking_ids)
    .fetch_all(&mut *conn)
    .await?;
    for line in lines {
        services.entry(line.booking_id).or_default().push(line.service);
    }

    Ok(bookings
        .into_iter()
        .filter_map(|booking| {
            let room = rooms.get(&booking.room_id)?.clone();
            let size = room.size_id.and_then(|id| sizes.get(&id).cloned());
            let voucher = booking.voucher_id.and_then(|id| vouchers.get(&id).cloned());
            let services = services.remove(&booking.id).unwrap_or_default();
            Some(BookingDetail {
                booking,
                room,
                size,
                services,
                voucher,
            })
        })
        .collect())
}

#[async_trait]
impl PaymentStore for PgPaymentStore {
    #[instrument(skip(self))]
    async fn health_check(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(db_error("Health check failed"))?;
        Ok(())
    }

    async fn booking_exists(&self, id: i64) -> Result<bool, AppError> {
        self.exists("SELECT id FROM bookings WHERE id = $1", id).await
    }

    async fn user_exists(&self, id: i64) -> Result<bool, AppError> {
        self.exists("SELECT id FROM users WHERE id = $1", id).await
    }

    async fn find_paymethod(&self, id: i64) -> Result<Option<PaymentMethod>, AppError> {
        sqlx::query_as::<_, PaymentMethod>("SELECT id, name FROM paymethods WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("Failed to get payment method"))
    }

    async fn find_status(&self, id: i64) -> Result<Option<PaymentStatus>, AppError> {
        sqlx::query_as::<_, PaymentStatus>(
            "SELECT id, status_name FROM payment_statuses WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("Failed to get payment status"))
    }

    async fn list_paymethods(&self) -> Result<Vec<PaymentMethod>, AppError> {
        sqlx::query_as::<_, PaymentMethod>("SELECT id, name FROM paymethods ORDER BY id")
            .fetch_all(&self.pool)
            .await
            .map_err(db_error("Failed to list payment methods"))
    }

    async fn list_statuses(&self) -> Result<Vec<PaymentStatus>, AppError> {
        sqlx::query_as::<_, PaymentStatus>(
            "SELECT id, status_name FROM payment_statuses ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("Failed to list payment statuses"))
    }

    #[instrument(skip(self), fields(count = ids.len()))]
    async fn load_bookings(&self, ids: &[i64]) -> Result<Vec<BookingDetail>, AppError> {
        let _timer = DB_QUERY_DURATION
            .with_label_values(&["load_bookings"])
            .start_timer();

        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(db_error("Failed to acquire connection"))?;
        fetch_booking_details(&mut *conn, ids)
            .await
            .map_err(db_error("Failed to load bookings"))
    }

    async fn bookings_by_ids(&self, ids: &[i64]) -> Result<Vec<Booking>, AppError> {
        sqlx::query_as::<_, Booking>(
            r#"
            SELECT id, room_id, voucher_id, start_date, end_date, created_at
            FROM bookings
            WHERE id = ANY($1)
            "#,
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("Failed to get bookings"))
    }

    async fn rooms_by_ids(&self, ids: &[i64]) -> Result<Vec<Room>, AppError> {
        sqlx::query_as::<_, Room>(
            "SELECT id, name, price, size_id, quantity, status FROM rooms WHERE id = ANY($1)",
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("Failed to get rooms"))
    }

    #[instrument(skip(self, input), fields(booking_id = input.booking_id, user_id = input.user_id))]
    async fn create_payment(&self, input: NewPayment) -> Result<(Payment, Quote), AppError> {
        let _timer = DB_QUERY_DURATION
            .with_label_values(&["create_payment"])
            .start_timer();

        // Dropping `tx` on any early return rolls the insert back.
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(db_error("Failed to begin transaction"))?;

        let detail = fetch_booking_details(&mut *tx, &[input.booking_id])
            .await
            .map_err(db_error("Failed to load booking"))?
            .pop()
            .ok_or_else(|| {
                AppError::NotFound(anyhow::anyhow!("Booking {} not found", input.booking_id))
            })?;

        let quote = pricing::quote(&detail)?;

        let sql = format!(
            r#"
            INSERT INTO payments (
                booking_id, user_id, paymethod_id, status_id,
                pet_name, pet_type, pet_description, pet_health,
                user_name, user_address, user_email, user_phone,
                total_amount
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            RETURNING {}
            "#,
            PAYMENT_COLUMNS
        );
        let payment = sqlx::query_as::<_, Payment>(&sql)
            .bind(input.booking_id)
            .bind(input.user_id)
            .bind(input.paymethod_id)
            .bind(input.status_id)
            .bind(&input.pet_name)
            .bind(&input.pet_type)
            .bind(&input.pet_description)
            .bind(&input.pet_health)
            .bind(&input.user_name)
            .bind(&input.user_address)
            .bind(&input.user_email)
            .bind(&input.user_phone)
            .bind(quote.total_amount)
            .fetch_one(&mut *tx)
            .await
            .map_err(db_error("Failed to insert payment"))?;

        tx.commit()
            .await
            .map_err(db_error("Failed to commit payment"))?;

        info!(payment_id = payment.id, total_amount = %payment.total_amount, "Payment created");

        Ok((payment, quote))
    }

    async fn get_payment(&self, id: i64) -> Result<Option<Payment>, AppError> {
        let sql = format!(
            "SELECT {} FROM payments WHERE id = $1 AND deleted_at IS NULL",
            PAYMENT_COLUMNS
        );
        sqlx::query_as::<_, Payment>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("Failed to get payment"))
    }

    #[instrument(skip(self))]
    async fn list_user_payments(&self, user_id: i64) -> Result<Vec<Payment>, AppError> {
        let _timer = DB_QUERY_DURATION
            .with_label_values(&["list_user_payments"])
            .start_timer();

        let sql = format!(
            "SELECT {} FROM payments WHERE user_id = $1 AND deleted_at IS NULL ORDER BY id DESC",
            PAYMENT_COLUMNS
        );
        sqlx::query_as::<_, Payment>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await
            .map_err(db_error("Failed to list payments"))
    }

    async fn list_active_payments(&self) -> Result<Vec<Payment>, AppError> {
        let sql = format!(
            "SELECT {} FROM payments WHERE deleted_at IS NULL ORDER BY id DESC",
            PAYMENT_COLUMNS
        );
        sqlx::query_as::<_, Payment>(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(db_error("Failed to list payments"))
    }

    #[instrument(skip(self), fields(requested = transition.requested, effective = transition.effective))]
    async fn apply_status(
        &self,
        id: i64,
        transition: Transition,
    ) -> Result<Option<Payment>, AppError> {
        let _timer = DB_QUERY_DURATION
            .with_label_values(&["apply_status"])
            .start_timer();

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(db_error("Failed to begin transaction"))?;

        let known: Option<i64> =
            sqlx::query_scalar("SELECT id FROM payment_statuses WHERE id = $1")
                .bind(transition.requested)
                .fetch_optional(&mut *tx)
                .await
                .map_err(db_error("Failed to check payment status"))?;
        if known.is_none() {
            return Err(unknown_status(transition.requested));
        }

        let sql = format!(
            r#"
            UPDATE payments
            SET status_id = $2, updated_at = NOW()
            WHERE id = $1 AND deleted_at IS NULL
            RETURNING {}
            "#,
            PAYMENT_COLUMNS
        );
        let payment = sqlx::query_as::<_, Payment>(&sql)
            .bind(id)
            .bind(transition.effective)
            .fetch_optional(&mut *tx)
            .await
            .map_err(db_error("Failed to update payment status"))?;

        tx.commit()
            .await
            .map_err(db_error("Failed to commit status update"))?;

        Ok(payment)
    }

    #[instrument(skip(self))]
    async fn soft_delete_payment(&self, id: i64) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE payments
            SET deleted_at = NOW(), updated_at = NOW()
            WHERE id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(db_error("Failed to delete payment"))?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self))]
    async fn revenue_rows(
        &self,
        from: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<Vec<RevenueRow>, AppError> {
        let _timer = DB_QUERY_DURATION
            .with_label_values(&["revenue_rows"])
            .start_timer();

        sqlx::query_as::<_, RevenueRow>(
            r#"
            SELECT created_at, total_amount
            FROM payments
            WHERE deleted_at IS NULL
              AND status_id <> $3
              AND created_at >= $1
              AND created_at < $2
            ORDER BY created_at
            "#,
        )
        .bind(from)
        .bind(until)
        .bind(CANCELLED)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("Failed to load revenue"))
    }
}
