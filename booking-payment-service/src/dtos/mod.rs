//! Request and response bodies for the HTTP API.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::{
    BookedService, Booking, NewPayment, Payment, PaymentMethod, PaymentStatus, Room,
};
use crate::pricing::Quote;
use crate::report::RevenueBucket;

/// Checkout form. Every field is optional at the serde level so that a
/// missing field is reported per field instead of as a parse failure.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct CreatePaymentRequest {
    #[validate(
        required(message = "Pet name is required"),
        length(min = 1, max = 255, message = "Pet name must be 1 to 255 characters")
    )]
    pub pet_name: Option<String>,

    #[validate(
        required(message = "Pet type is required"),
        length(min = 1, max = 255, message = "Pet type must be 1 to 255 characters")
    )]
    pub pet_type: Option<String>,

    #[validate(
        required(message = "Pet description is required"),
        length(min = 1, message = "Pet description must not be empty")
    )]
    pub pet_description: Option<String>,

    #[validate(
        required(message = "Pet health is required"),
        length(min = 1, message = "Pet health must not be empty")
    )]
    pub pet_health: Option<String>,

    #[validate(
        required(message = "Name is required"),
        length(min = 1, max = 255, message = "Name must be 1 to 255 characters")
    )]
    pub user_name: Option<String>,

    #[validate(
        required(message = "Address is required"),
        length(min = 1, max = 255, message = "Address must be 1 to 255 characters")
    )]
    pub user_address: Option<String>,

    #[validate(
        required(message = "Email is required"),
        email(message = "Email is not a valid address"),
        length(max = 255, message = "Email must not exceed 255 characters")
    )]
    pub user_email: Option<String>,

    #[validate(
        required(message = "Phone number is required"),
        length(min = 1, max = 15, message = "Phone number must be 1 to 15 characters")
    )]
    pub user_phone: Option<String>,

    #[validate(required(message = "Booking is required"))]
    pub booking_id: Option<i64>,

    #[validate(required(message = "User is required"))]
    pub user_id: Option<i64>,

    #[validate(required(message = "Payment method is required"))]
    pub paymethod_id: Option<i64>,

    pub status_id: Option<i64>,
}

impl CreatePaymentRequest {
    /// Convert a request that passed validation. `None` if a required field is
    /// absent, which validation already rules out.
    pub fn into_new_payment(self, default_status: i64) -> Option<NewPayment> {
        Some(NewPayment {
            booking_id: self.booking_id?,
            user_id: self.user_id?,
            paymethod_id: self.paymethod_id?,
            status_id: self.status_id.unwrap_or(default_status),
            pet_name: self.pet_name?,
            pet_type: self.pet_type?,
            pet_description: self.pet_description?,
            pet_health: self.pet_health?,
            user_name: self.user_name?,
            user_address: self.user_address?,
            user_email: self.user_email?,
            user_phone: self.user_phone?,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct CreatePaymentResponse {
    pub status: String,
    pub payment_id: i64,
    pub total_amount: Decimal,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdatePaymentStatusRequest {
    #[validate(required(message = "Status is required"))]
    pub status_id: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct UpdatePaymentStatusResponse {
    pub message: String,
    pub payment: Payment,
    pub status_payment: Option<PaymentStatus>,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Show view: the payment plus the names a receipt needs.
#[derive(Debug, Serialize)]
pub struct PaymentDetail {
    pub payment: Payment,
    pub room: Room,
    pub service: Vec<BookedService>,
    pub booking: Booking,
    #[serde(rename = "paymentMethod")]
    pub payment_method: Option<String>,
    pub status: Option<String>,
    pub size: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PaymentDetailResponse {
    pub payment: PaymentDetail,
}

#[derive(Debug, Clone, Serialize)]
pub struct BookingWithRoom {
    #[serde(flatten)]
    pub booking: Booking,
    pub room: Option<Room>,
}

/// A payment in the user history, with status and booking attached.
#[derive(Debug, Clone, Serialize)]
pub struct PaymentListItem {
    #[serde(flatten)]
    pub payment: Payment,
    pub status: Option<PaymentStatus>,
    pub booking: Option<BookingWithRoom>,
}

#[derive(Debug, Serialize)]
pub struct UserPayments {
    pub payment: Vec<PaymentListItem>,
    /// The user id, or `null` when the user has no payments.
    pub user: Option<i64>,
    pub booking: Vec<Booking>,
    pub room: Vec<Room>,
}

#[derive(Debug, Serialize)]
pub struct UserPaymentsResponse {
    pub status: bool,
    pub data: UserPayments,
}

#[derive(Debug, Serialize)]
pub struct QuoteResponse {
    pub booking_id: i64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub days: i64,
    #[serde(flatten)]
    pub quote: Quote,
}

#[derive(Debug, Serialize)]
pub struct PaymentSummaryResponse {
    #[serde(flatten)]
    pub quote: Quote,
    pub payments: usize,
    /// Method used by the most recent payment.
    pub payment_method: Option<PaymentMethod>,
}

#[derive(Debug, Serialize)]
pub struct ChartResponse {
    pub status: bool,
    pub data: Vec<RevenueBucket>,
}

#[derive(Debug, Serialize)]
pub struct NoDataResponse {
    pub status: bool,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_request() -> CreatePaymentRequest {
        CreatePaymentRequest {
            pet_name: Some("Miso".to_string()),
            pet_type: Some("Shiba Inu".to_string()),
            pet_description: Some("Red coat, very vocal".to_string()),
            pet_health: Some("Vaccinated".to_string()),
            user_name: Some("Linh Tran".to_string()),
            user_address: Some("12 Hang Bac, Hanoi".to_string()),
            user_email: Some("linh@example.com".to_string()),
            user_phone: Some("0901234567".to_string()),
            booking_id: Some(1),
            user_id: Some(1),
            paymethod_id: Some(1),
            status_id: None,
        }
    }

    #[test]
    fn valid_request_passes() {
        assert!(valid_request().validate().is_ok());
    }

    #[test]
    fn missing_fields_are_reported_per_field() {
        let errors = CreatePaymentRequest::default().validate().unwrap_err();
        let fields = errors.field_errors();
        for field in [
            "pet_name",
            "pet_type",
            "pet_description",
            "pet_health",
            "user_name",
            "user_address",
            "user_email",
            "user_phone",
            "booking_id",
            "user_id",
            "paymethod_id",
        ] {
            assert!(fields.contains_key(field), "{} should be required", field);
        }
        assert!(!fields.contains_key("status_id"));
    }

    #[test]
    fn length_and_format_limits() {
        let request = CreatePaymentRequest {
            pet_name: Some("x".repeat(256)),
            user_email: Some("not-an-email".to_string()),
            user_phone: Some("0".repeat(16)),
            pet_health: Some(String::new()),
            ..valid_request()
        };
        let errors = request.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("pet_name"));
        assert!(fields.contains_key("user_email"));
        assert!(fields.contains_key("user_phone"));
        assert!(fields.contains_key("pet_health"));
        assert!(!fields.contains_key("pet_type"));
    }

    #[test]
    fn status_defaults_when_absent() {
        let payment = valid_request().into_new_payment(1).unwrap();
        assert_eq!(payment.status_id, 1);

        let explicit = CreatePaymentRequest {
            status_id: Some(2),
            ..valid_request()
        };
        assert_eq!(explicit.into_new_payment(1).unwrap().status_id, 2);
    }

    #[test]
    fn update_requires_status() {
        assert!(UpdatePaymentStatusRequest::default().validate().is_err());
        assert!(UpdatePaymentStatusRequest { status_id: Some(3) }
            .validate()
            .is_ok());
    }
}
