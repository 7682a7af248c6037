//! Common test utilities for booking-payment-service integration tests.
#![allow(dead_code)]

use std::str::FromStr;
use std::sync::{Arc, Once};

use axum::body::Body;
use axum::http::{self, Method, StatusCode};
use axum::Router;
use booking_payment_service::models::{Booking, Room, Size, Voucher};
use booking_payment_service::services::InMemoryPaymentStore;
use booking_payment_service::{router, AppState};
use chrono::{NaiveDate, Utc};
use http_body_util::BodyExt;
use rust_decimal::Decimal;
use serde_json::{json, Value};
use tower::ServiceExt;

static INIT: Once = Once::new();

/// Initialize tracing for tests (only once).
pub fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter("info,booking_payment_service=debug")
            .with_test_writer()
            .try_init()
            .ok();
    });
}

/// Booking priced at 470000: two days at 200000, a 50000 service twice and
/// a 30000 voucher.
pub const SUITE_BOOKING: i64 = 1;
/// Booking priced at 120000: one day at 100000 and a 20000 service.
pub const SINGLE_BOOKING: i64 = 2;
/// Booking whose voucher exceeds everything else.
pub const OVERDISCOUNTED_BOOKING: i64 = 3;

pub const GUEST: i64 = 1;
pub const OTHER_GUEST: i64 = 2;

pub struct TestApp {
    pub store: InMemoryPaymentStore,
    pub router: Router,
}

fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

fn booking(id: i64, room_id: i64, voucher_id: Option<i64>, start: &str, end: &str) -> Booking {
    Booking {
        id,
        room_id,
        voucher_id,
        start_date: date(start),
        end_date: date(end),
        created_at: Utc::now(),
    }
}

/// Build the router over an in-memory store seeded with a small hotel.
pub async fn spawn_app() -> TestApp {
    init_tracing();

    let store = InMemoryPaymentStore::with_reference_data().await;

    store.insert_user(GUEST, "Linh Tran").await;
    store.insert_user(OTHER_GUEST, "Minh Pham").await;

    store
        .insert_size(Size {
            id: 1,
            name: "Medium".to_string(),
        })
        .await;
    store
        .insert_room(Room {
            id: 1,
            name: "Garden suite".to_string(),
            price: Decimal::from(200_000),
            size_id: Some(1),
            quantity: 2,
            status: "available".to_string(),
        })
        .await;
    store
        .insert_room(Room {
            id: 2,
            name: "Cosy box".to_string(),
            price: Decimal::from(100_000),
            size_id: None,
            quantity: 5,
            status: "available".to_string(),
        })
        .await;

    store.insert_service(1, "Bath", Decimal::from(50_000)).await;
    store.insert_service(2, "Nail trim", Decimal::from(20_000)).await;

    store
        .insert_voucher(Voucher {
            id: 1,
            code: "WELCOME".to_string(),
            discount: Decimal::from(30_000),
        })
        .await;
    store
        .insert_voucher(Voucher {
            id: 2,
            code: "STAFF".to_string(),
            discount: Decimal::from(1_000_000),
        })
        .await;

    store
        .insert_booking(
            booking(SUITE_BOOKING, 1, Some(1), "2024-01-01", "2024-01-03"),
            vec![(1, 2)],
        )
        .await;
    store
        .insert_booking(
            booking(SINGLE_BOOKING, 2, None, "2024-02-10", "2024-02-11"),
            vec![(2, 1)],
        )
        .await;
    store
        .insert_booking(
            booking(OVERDISCOUNTED_BOOKING, 2, Some(2), "2024-03-01", "2024-03-02"),
            Vec::new(),
        )
        .await;

    let router = router(AppState::new(Arc::new(store.clone())));
    TestApp { store, router }
}

impl TestApp {
    /// Send one request through the router and decode the JSON reply.
    pub async fn request(&self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = http::Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header(http::header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };
        (status, json)
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.request(Method::GET, uri, None).await
    }

    pub async fn post(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.request(Method::POST, uri, Some(body)).await
    }

    pub async fn put(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.request(Method::PUT, uri, Some(body)).await
    }

    pub async fn delete(&self, uri: &str) -> (StatusCode, Value) {
        self.request(Method::DELETE, uri, None).await
    }

    /// Check out a booking and return the new payment id.
    pub async fn checkout(&self, booking_id: i64, user_id: i64) -> i64 {
        let (status, body) = self
            .post("/payments", checkout_body(booking_id, user_id))
            .await;
        assert_eq!(status, StatusCode::CREATED, "checkout failed: {}", body);
        body["payment_id"].as_i64().unwrap()
    }
}

/// A complete, valid checkout form.
pub fn checkout_body(booking_id: i64, user_id: i64) -> Value {
    json!({
        "pet_name": "Miso",
        "pet_type": "Shiba Inu",
        "pet_description": "Red coat, very vocal",
        "pet_health": "Vaccinated",
        "user_name": "Linh Tran",
        "user_address": "12 Hang Bac, Hanoi",
        "user_email": "linh@example.com",
        "user_phone": "0901234567",
        "booking_id": booking_id,
        "user_id": user_id,
        "paymethod_id": 1
    })
}

/// Money fields serialize as strings; accept numbers too.
pub fn decimal(value: &Value) -> Decimal {
    match value {
        Value::String(s) => Decimal::from_str(s).unwrap(),
        Value::Number(n) => Decimal::from_str(&n.to_string()).unwrap(),
        other => panic!("expected a decimal, got {}", other),
    }
}
