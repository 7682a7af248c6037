//! Booking cost computation.
//!
//! A quote is derived from a [`BookingDetail`] alone: room rate times the
//! stay length, plus every service line, minus a flat voucher discount.
//! Nothing here touches storage, so the same code serves pre-checkout quotes
//! and the frozen total written when a payment is created.
//!
//! All arithmetic is checked. An amount that does not fit a `Decimal` is a
//! [`PricingError`], never a panic.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use service_core::error::AppError;
use thiserror::Error;

use crate::models::BookingDetail;

#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum PricingError {
    #[error("{0} amount is out of range")]
    Overflow(&'static str),
}

impl From<PricingError> for AppError {
    fn from(err: PricingError) -> Self {
        AppError::InternalError(anyhow::Error::new(err))
    }
}

/// Per-category subtotals and the resulting amount due.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote {
    #[serde(rename = "subTotal_room")]
    pub sub_total_room: Decimal,
    #[serde(rename = "subTotal_service")]
    pub sub_total_service: Decimal,
    #[serde(rename = "subTotal_voucher")]
    pub sub_total_voucher: Decimal,
    #[serde(rename = "totalAmount")]
    pub total_amount: Decimal,
}

impl Quote {
    /// Build a quote from subtotals. The total never drops below zero, even
    /// when the voucher is worth more than the room and services together.
    pub fn from_subtotals(
        room: Decimal,
        service: Decimal,
        voucher: Decimal,
    ) -> Result<Self, PricingError> {
        let total = room
            .checked_add(service)
            .and_then(|gross| gross.checked_sub(voucher))
            .ok_or(PricingError::Overflow("total"))?
            .max(Decimal::ZERO);
        Ok(Self {
            sub_total_room: room,
            sub_total_service: service,
            sub_total_voucher: voucher,
            total_amount: total,
        })
    }

    /// Field-wise sum of two quotes.
    pub fn checked_add(self, rhs: Quote) -> Result<Quote, PricingError> {
        let field =
            |a: Decimal, b: Decimal, name| a.checked_add(b).ok_or(PricingError::Overflow(name));
        Ok(Quote {
            sub_total_room: field(self.sub_total_room, rhs.sub_total_room, "room")?,
            sub_total_service: field(self.sub_total_service, rhs.sub_total_service, "service")?,
            sub_total_voucher: field(self.sub_total_voucher, rhs.sub_total_voucher, "voucher")?,
            total_amount: field(self.total_amount, rhs.total_amount, "total")?,
        })
    }
}

/// Whole days between check-in and check-out, billed as at least one day.
///
/// Same-day stays and inverted ranges are clamped rather than rejected.
pub fn stay_days(start: NaiveDate, end: NaiveDate) -> i64 {
    (end - start).num_days().max(1)
}

pub fn room_subtotal(detail: &BookingDetail) -> Result<Decimal, PricingError> {
    let days = stay_days(detail.booking.start_date, detail.booking.end_date);
    detail
        .room
        .price
        .checked_mul(Decimal::from(days))
        .ok_or(PricingError::Overflow("room"))
}

pub fn service_subtotal(detail: &BookingDetail) -> Result<Decimal, PricingError> {
    detail
        .services
        .iter()
        .try_fold(Decimal::ZERO, |acc, service| {
            service.line_total().and_then(|line| acc.checked_add(line))
        })
        .ok_or(PricingError::Overflow("service"))
}

pub fn voucher_subtotal(detail: &BookingDetail) -> Decimal {
    detail
        .voucher
        .as_ref()
        .map(|v| v.discount)
        .unwrap_or(Decimal::ZERO)
}

pub fn quote(detail: &BookingDetail) -> Result<Quote, PricingError> {
    Quote::from_subtotals(
        room_subtotal(detail)?,
        service_subtotal(detail)?,
        voucher_subtotal(detail),
    )
}

/// Dashboard view: the same per-booking formula, reduced with addition.
pub fn summarize<'a, I>(details: I) -> Result<Quote, PricingError>
where
    I: IntoIterator<Item = &'a BookingDetail>,
{
    details
        .into_iter()
        .try_fold(Quote::default(), |acc, detail| acc.checked_add(quote(detail)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BookedService, Booking, Room, Voucher};
    use chrono::Utc;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn detail(price: i64, start: &str, end: &str) -> BookingDetail {
        BookingDetail {
            booking: Booking {
                id: 1,
                room_id: 1,
                voucher_id: None,
                start_date: date(start),
                end_date: date(end),
                created_at: Utc::now(),
            },
            room: Room {
                id: 1,
                name: "Garden suite".to_string(),
                price: Decimal::from(price),
                size_id: None,
                quantity: 3,
                status: "available".to_string(),
            },
            size: None,
            services: Vec::new(),
            voucher: None,
        }
    }

    fn service(id: i64, price: i64, quantity: i32) -> BookedService {
        BookedService {
            id,
            name: format!("service-{}", id),
            price: Decimal::from(price),
            quantity,
        }
    }

    fn voucher(discount: i64) -> Voucher {
        Voucher {
            id: 9,
            code: "WELCOME".to_string(),
            discount: Decimal::from(discount),
        }
    }

    #[test]
    fn same_day_stay_bills_one_day() {
        assert_eq!(stay_days(date("2024-05-10"), date("2024-05-10")), 1);

        let quote = quote(&detail(150_000, "2024-05-10", "2024-05-10")).unwrap();
        assert_eq!(quote.sub_total_room, Decimal::from(150_000));
        assert_eq!(quote.total_amount, Decimal::from(150_000));
    }

    #[test]
    fn inverted_range_is_clamped_to_one_day() {
        assert_eq!(stay_days(date("2024-05-12"), date("2024-05-10")), 1);
    }

    #[test]
    fn room_subtotal_scales_with_stay_length() {
        for nights in 1..=14 {
            let start = date("2024-02-25");
            let end = start + chrono::Duration::days(nights);
            let mut d = detail(80_000, "2024-02-25", "2024-02-25");
            d.booking.end_date = end;
            assert_eq!(room_subtotal(&d).unwrap(), Decimal::from(80_000 * nights));
        }
    }

    #[test]
    fn services_sum_price_times_quantity() {
        let mut d = detail(100_000, "2024-01-01", "2024-01-02");
        assert_eq!(service_subtotal(&d).unwrap(), Decimal::ZERO);

        d.services = vec![service(1, 50_000, 2), service(2, 25_000, 3), service(3, 10_000, 0)];
        assert_eq!(service_subtotal(&d).unwrap(), Decimal::from(175_000));
    }

    #[test]
    fn full_booking_example() {
        let mut d = detail(200_000, "2024-01-01", "2024-01-03");
        d.services = vec![service(1, 50_000, 2)];
        d.voucher = Some(voucher(30_000));

        let quote = quote(&d).unwrap();
        assert_eq!(quote.sub_total_room, Decimal::from(400_000));
        assert_eq!(quote.sub_total_service, Decimal::from(100_000));
        assert_eq!(quote.sub_total_voucher, Decimal::from(30_000));
        assert_eq!(quote.total_amount, Decimal::from(470_000));
        assert_eq!(
            quote.total_amount,
            quote.sub_total_room + quote.sub_total_service - quote.sub_total_voucher
        );
    }

    #[test]
    fn oversized_voucher_floors_total_at_zero() {
        let mut d = detail(50_000, "2024-01-01", "2024-01-01");
        d.voucher = Some(voucher(80_000));

        let quote = quote(&d).unwrap();
        assert_eq!(quote.sub_total_voucher, Decimal::from(80_000));
        assert_eq!(quote.total_amount, Decimal::ZERO);
    }

    #[test]
    fn summary_adds_quotes_across_bookings() {
        let mut first = detail(200_000, "2024-01-01", "2024-01-03");
        first.services = vec![service(1, 50_000, 2)];
        first.voucher = Some(voucher(30_000));
        let second = detail(150_000, "2024-02-01", "2024-02-01");

        let total = summarize([&first, &second]).unwrap();
        assert_eq!(total.sub_total_room, Decimal::from(550_000));
        assert_eq!(total.sub_total_service, Decimal::from(100_000));
        assert_eq!(total.sub_total_voucher, Decimal::from(30_000));
        assert_eq!(total.total_amount, Decimal::from(620_000));
    }

    #[test]
    fn summary_of_nothing_is_zero() {
        assert_eq!(summarize(std::iter::empty()).unwrap(), Quote::default());
    }

    #[test]
    fn quote_serializes_with_dashboard_keys() {
        let json = serde_json::to_value(Quote::from_subtotals(
            Decimal::from(10),
            Decimal::from(5),
            Decimal::from(3),
        )
        .unwrap())
        .unwrap();
        assert_eq!(json["subTotal_room"], "10");
        assert_eq!(json["totalAmount"], "12");
    }

    #[test]
    fn oversized_amounts_are_errors_not_panics() {
        let mut room = detail(0, "2024-01-01", "2024-01-03");
        room.room.price = Decimal::MAX;
        assert_eq!(room_subtotal(&room), Err(PricingError::Overflow("room")));
        assert_eq!(quote(&room), Err(PricingError::Overflow("room")));

        let mut services = detail(100, "2024-01-01", "2024-01-02");
        services.services = vec![service(1, 1, 1), service(2, 1, 1)];
        services.services[0].price = Decimal::MAX;
        assert_eq!(service_subtotal(&services), Err(PricingError::Overflow("service")));

        let mut big = detail(0, "2024-01-01", "2024-01-02");
        big.room.price = Decimal::MAX;
        assert_eq!(
            summarize([&big, &big]),
            Err(PricingError::Overflow("room"))
        );
    }

    #[test]
    fn overflowing_total_is_reported() {
        assert_eq!(
            Quote::from_subtotals(Decimal::MAX, Decimal::MAX, Decimal::ZERO),
            Err(PricingError::Overflow("total"))
        );
    }
}
