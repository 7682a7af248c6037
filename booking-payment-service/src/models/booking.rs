//! Reservation records written by the public booking flow.
//!
//! Nothing here carries a price total; totals are derived by
//! [`crate::pricing`] and only frozen once a payment is created.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Room category (small, medium, large, ...).
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, PartialEq)]
pub struct Size {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, PartialEq)]
pub struct Room {
    pub id: i64,
    pub name: String,
    /// Rate per day.
    pub price: Decimal,
    pub size_id: Option<i64>,
    pub quantity: i32,
    pub status: String,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, PartialEq)]
pub struct Voucher {
    pub id: i64,
    pub code: String,
    /// Flat amount taken off the booking.
    pub discount: Decimal,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, PartialEq)]
pub struct Booking {
    pub id: i64,
    pub room_id: i64,
    pub voucher_id: Option<i64>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub created_at: DateTime<Utc>,
}

/// A service line on a booking: the service row joined with the pivot quantity.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, PartialEq)]
pub struct BookedService {
    pub id: i64,
    pub name: String,
    /// Price per unit.
    pub price: Decimal,
    pub quantity: i32,
}

impl BookedService {
    /// Price times quantity, `None` on overflow.
    pub fn line_total(&self) -> Option<Decimal> {
        self.price.checked_mul(Decimal::from(self.quantity))
    }
}

/// A booking with every relation the pricing calculator needs.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct BookingDetail {
    pub booking: Booking,
    pub room: Room,
    pub size: Option<Size>,
    pub services: Vec<BookedService>,
    pub voucher: Option<Voucher>,
}
