//! Status updates through the transition rules.

mod common;

use axum::http::StatusCode;
use common::{spawn_app, GUEST, SUITE_BOOKING};
use serde_json::json;

#[tokio::test]
async fn paid_is_stored_as_requested() {
    let app = spawn_app().await;
    let id = app.checkout(SUITE_BOOKING, GUEST).await;

    let (status, body) = app
        .put(&format!("/payments/{}", id), json!({ "status_id": 2 }))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["payment"]["status_id"], 2);
    assert_eq!(body["status_payment"]["status_name"], "Paid");
    assert_eq!(app.store.raw_payment(id).await.unwrap().status_id, 2);
}

#[tokio::test]
async fn requesting_pending_cancels() {
    let app = spawn_app().await;
    let id = app.checkout(SUITE_BOOKING, GUEST).await;

    let (status, body) = app
        .put(&format!("/payments/{}", id), json!({ "status_id": 1 }))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["payment"]["status_id"], 3);
    assert_eq!(body["status_payment"]["status_name"], "Cancelled");
    assert_eq!(app.store.raw_payment(id).await.unwrap().status_id, 3);
}

#[tokio::test]
async fn status_update_keeps_frozen_total() {
    let app = spawn_app().await;
    let id = app.checkout(SUITE_BOOKING, GUEST).await;
    let before = app.store.raw_payment(id).await.unwrap();

    app.put(&format!("/payments/{}", id), json!({ "status_id": 2 }))
        .await;

    let after = app.store.raw_payment(id).await.unwrap();
    assert_eq!(after.total_amount, before.total_amount);
    assert!(after.updated_at >= before.updated_at);
}

#[tokio::test]
async fn unknown_status_is_rejected_without_change() {
    let app = spawn_app().await;
    let id = app.checkout(SUITE_BOOKING, GUEST).await;

    let (status, body) = app
        .put(&format!("/payments/{}", id), json!({ "status_id": 99 }))
        .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["fields"]["status_id"].is_array());
    assert_eq!(app.store.raw_payment(id).await.unwrap().status_id, 1);
}

#[tokio::test]
async fn missing_status_is_rejected() {
    let app = spawn_app().await;
    let id = app.checkout(SUITE_BOOKING, GUEST).await;

    let (status, body) = app.put(&format!("/payments/{}", id), json!({})).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["fields"]["status_id"].is_array());
}

#[tokio::test]
async fn mistyped_status_is_unprocessable() {
    let app = spawn_app().await;
    let id = app.checkout(SUITE_BOOKING, GUEST).await;

    let (status, body) = app
        .put(&format!("/payments/{}", id), json!({ "status_id": "paid" }))
        .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["fields"]["status_id"].is_array());
    assert_eq!(app.store.raw_payment(id).await.unwrap().status_id, 1);
}

#[tokio::test]
async fn missing_payment_is_not_found() {
    let app = spawn_app().await;

    let (status, _) = app.put("/payments/404", json!({ "status_id": 2 })).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn deleted_payment_cannot_be_updated() {
    let app = spawn_app().await;
    let id = app.checkout(SUITE_BOOKING, GUEST).await;
    app.delete(&format!("/payments/{}", id)).await;

    let (status, _) = app
        .put(&format!("/payments/{}", id), json!({ "status_id": 2 }))
        .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(app.store.raw_payment(id).await.unwrap().status_id, 1);
}
