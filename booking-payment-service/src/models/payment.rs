//! Payment records and their reference tables.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// One checkout attempt for a booking.
///
/// `total_amount` is written once at creation and never recomputed, so later
/// price changes on rooms, services or vouchers do not rewrite history.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, PartialEq)]
pub struct Payment {
    pub id: i64,
    pub booking_id: i64,
    pub user_id: i64,
    pub paymethod_id: i64,
    pub status_id: i64,
    pub pet_name: String,
    pub pet_type: String,
    pub pet_description: String,
    pub pet_health: String,
    pub user_name: String,
    pub user_address: String,
    pub user_email: String,
    pub user_phone: String,
    pub total_amount: Decimal,
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Payment {
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

/// Validated input for inserting a payment. The total is priced inside the
/// store transaction.
#[derive(Debug, Clone)]
pub struct NewPayment {
    pub booking_id: i64,
    pub user_id: i64,
    pub paymethod_id: i64,
    pub status_id: i64,
    pub pet_name: String,
    pub pet_type: String,
    pub pet_description: String,
    pub pet_health: String,
    pub user_name: String,
    pub user_address: String,
    pub user_email: String,
    pub user_phone: String,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, PartialEq)]
pub struct PaymentStatus {
    pub id: i64,
    pub status_name: String,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, PartialEq)]
pub struct PaymentMethod {
    pub id: i64,
    pub name: String,
}

/// Minimal projection of a payment used by revenue reports.
#[derive(Debug, Clone, FromRow, PartialEq)]
pub struct RevenueRow {
    pub created_at: DateTime<Utc>,
    pub total_amount: Decimal,
}
