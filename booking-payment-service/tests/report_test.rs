//! Revenue chart endpoint.

mod common;

use axum::http::StatusCode;
use chrono::{NaiveDate, TimeZone, Utc};
use common::{decimal, spawn_app, TestApp, GUEST, SINGLE_BOOKING, SUITE_BOOKING};
use rust_decimal::Decimal;
use serde_json::json;

/// Check out a booking and backdate the payment.
async fn paid_on(app: &TestApp, booking_id: i64, y: i32, m: u32, d: u32) -> i64 {
    let id = app.checkout(booking_id, GUEST).await;
    app.store
        .set_payment_created_at(id, Utc.with_ymd_and_hms(y, m, d, 9, 0, 0).unwrap())
        .await;
    id
}

#[tokio::test]
async fn empty_month_is_no_data() {
    let app = spawn_app().await;
    paid_on(&app, SUITE_BOOKING, 2024, 1, 5).await;

    let (status, body) = app.get("/payments/chart?year=2024&month=2").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["status"], false);
    assert!(body["message"].is_string());
}

#[tokio::test]
async fn month_is_bucketed_by_day() {
    let app = spawn_app().await;
    paid_on(&app, SUITE_BOOKING, 2024, 3, 2).await;
    paid_on(&app, SINGLE_BOOKING, 2024, 3, 2).await;
    paid_on(&app, SINGLE_BOOKING, 2024, 3, 20).await;
    paid_on(&app, SUITE_BOOKING, 2024, 4, 1).await;

    let (status, body) = app.get("/payments/chart?year=2024&month=3").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], true);
    let data = body["data"].as_array().unwrap();
    assert_eq!(data.len(), 2);
    assert_eq!(data[0]["label"], "2024-03-02");
    assert_eq!(decimal(&data[0]["revenue"]), Decimal::from(590_000));
    assert_eq!(data[0]["payments"], 2);
    assert_eq!(data[1]["label"], "2024-03-20");
    assert_eq!(decimal(&data[1]["revenue"]), Decimal::from(120_000));
}

#[tokio::test]
async fn year_is_bucketed_by_month() {
    let app = spawn_app().await;
    paid_on(&app, SUITE_BOOKING, 2024, 1, 15).await;
    paid_on(&app, SINGLE_BOOKING, 2024, 1, 31).await;
    paid_on(&app, SINGLE_BOOKING, 2024, 11, 3).await;
    paid_on(&app, SUITE_BOOKING, 2023, 12, 31).await;

    let (status, body) = app.get("/payments/chart?year=2024").await;

    assert_eq!(status, StatusCode::OK);
    let labels: Vec<&str> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|b| b["label"].as_str().unwrap())
        .collect();
    assert_eq!(labels, vec!["2024-01", "2024-11"]);
    assert_eq!(decimal(&body["data"][0]["revenue"]), Decimal::from(590_000));
}

#[tokio::test]
async fn range_includes_both_ends_and_honours_type() {
    let app = spawn_app().await;
    paid_on(&app, SUITE_BOOKING, 2024, 5, 1).await;
    paid_on(&app, SINGLE_BOOKING, 2024, 5, 31).await;
    paid_on(&app, SINGLE_BOOKING, 2024, 6, 1).await;

    let (status, body) = app
        .get("/payments/chart?start=2024-05-01&end=2024-05-31&type=monthly")
        .await;

    assert_eq!(status, StatusCode::OK);
    let data = body["data"].as_array().unwrap();
    assert_eq!(data.len(), 1);
    assert_eq!(data[0]["label"], "2024-05");
    assert_eq!(data[0]["payments"], 2);
}

#[tokio::test]
async fn cancelled_and_deleted_payments_are_not_revenue() {
    let app = spawn_app().await;
    let kept = paid_on(&app, SUITE_BOOKING, 2024, 7, 1).await;
    let cancelled = paid_on(&app, SINGLE_BOOKING, 2024, 7, 1).await;
    let deleted = paid_on(&app, SINGLE_BOOKING, 2024, 7, 1).await;

    app.put(&format!("/payments/{}", cancelled), json!({ "status_id": 3 }))
        .await;
    app.delete(&format!("/payments/{}", deleted)).await;

    let (status, body) = app.get("/payments/chart?year=2024&month=7").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"][0]["payments"], 1);
    assert_eq!(decimal(&body["data"][0]["revenue"]), Decimal::from(470_000));
    assert!(app.store.raw_payment(kept).await.is_some());
}

#[tokio::test]
async fn revenue_uses_frozen_totals() {
    let app = spawn_app().await;
    paid_on(&app, SUITE_BOOKING, 2024, 8, 8).await;
    app.store.set_room_price(1, Decimal::from(1)).await;

    let (_, body) = app.get("/payments/chart?year=2024&month=8").await;

    assert_eq!(decimal(&body["data"][0]["revenue"]), Decimal::from(470_000));
}

#[tokio::test]
async fn unusable_windows_are_rejected() {
    let app = spawn_app().await;

    for uri in [
        "/payments/chart",
        "/payments/chart?month=3",
        "/payments/chart?year=2024&month=13",
        "/payments/chart?start=2024-01-01",
        "/payments/chart?start=2024-02-01&end=2024-01-01",
        "/payments/chart?year=2024&type=hourly",
    ] {
        let (status, body) = app.get(uri).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY, "{}", uri);
        assert!(body["fields"].is_object(), "{}", uri);
    }
}

#[tokio::test]
async fn undecodable_parameters_name_their_field() {
    let app = spawn_app().await;

    for (uri, field) in [
        ("/payments/chart?start=foo&end=2024-01-31", "start"),
        ("/payments/chart?year=2024&month=-1", "month"),
        ("/payments/chart?year=twenty", "year"),
    ] {
        let (status, body) = app.get(uri).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY, "{}", uri);
        assert!(body["fields"][field].is_array(), "{}: {}", uri, body);
    }
}

#[tokio::test]
async fn range_ending_on_last_calendar_day_is_rejected() {
    let app = spawn_app().await;
    paid_on(&app, SUITE_BOOKING, 2024, 1, 10).await;

    let end = NaiveDate::MAX.to_string().replace('+', "%2B");
    let (status, body) = app
        .get(&format!("/payments/chart?start=2024-01-01&end={}", end))
        .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["fields"]["end"].is_array());
}
