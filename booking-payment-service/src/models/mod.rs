//! Domain models for booking-payment-service.

mod booking;
mod payment;

pub use booking::{BookedService, Booking, BookingDetail, Room, Size, Voucher};
pub use payment::{NewPayment, Payment, PaymentMethod, PaymentStatus, RevenueRow};
