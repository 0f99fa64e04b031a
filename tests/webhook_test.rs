mod common;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use common::{balance_of, create_user, dec, insert_top_up, is_paid, setup_db, stub_gateway, SERVER_KEY};
use costume_payments::gateway::expected_signature;
use costume_payments::{create_app, AppState};
use serde_json::{json, Value};
use sqlx::PgPool;
use tower::ServiceExt;

fn app(pool: &PgPool) -> Router {
    create_app(AppState::new(
        pool.clone(),
        stub_gateway(),
        SERVER_KEY.to_string(),
        "Costume Rental".to_string(),
    ))
}

fn notification(order_id: &str, gross_amount: &str, transaction_status: &str) -> Value {
    json!({
        "order_id": order_id,
        "gross_amount": gross_amount,
        "status_code": "200",
        "transaction_status": transaction_status,
        "transaction_id": "9aed5972-5b6a-401e-894b-a32c91ed1a3a",
        "payment_type": "bank_transfer",
        "signature_key": expected_signature(order_id, "200", gross_amount, SERVER_KEY),
    })
}

async fn post_callback(app: Router, body: Value) -> (StatusCode, Value) {
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/payments/callback")
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn test_settlement_callback_credits_top_up() {
    let (pool, _container) = setup_db().await;
    let user = create_user(&pool, "Rina", "0").await;
    insert_top_up(&pool, "topup-hook", user, "50000").await;

    let (status, body) = post_callback(app(&pool), notification("topup-hook", "50000.00", "settlement")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["outcome"], "top_up_settled");
    assert_eq!(balance_of(&pool, user).await, dec("50000"));
    assert!(is_paid(&pool, "top_up_orders", "topup-hook").await);
}

#[tokio::test]
async fn test_invalid_signature_is_rejected() {
    let (pool, _container) = setup_db().await;
    let user = create_user(&pool, "Rina", "0").await;
    insert_top_up(&pool, "topup-forged", user, "50000").await;

    let mut body = notification("topup-forged", "50000.00", "settlement");
    body["signature_key"] = json!(expected_signature("topup-forged", "200", "50000.00", "wrong-key"));

    let (status, response) = post_callback(app(&pool), body).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(response["status"], 401);
    assert_eq!(balance_of(&pool, user).await, dec("0"));
    assert!(!is_paid(&pool, "top_up_orders", "topup-forged").await);
}

#[tokio::test]
async fn test_pending_status_is_acknowledged_without_settling() {
    let (pool, _container) = setup_db().await;
    let user = create_user(&pool, "Rina", "0").await;
    insert_top_up(&pool, "topup-pending", user, "50000").await;

    let (status, body) = post_callback(app(&pool), notification("topup-pending", "50000.00", "pending")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["outcome"], "ignored");
    assert!(!is_paid(&pool, "top_up_orders", "topup-pending").await);
}

#[tokio::test]
async fn test_unknown_order_id_is_acknowledged() {
    let (pool, _container) = setup_db().await;

    let (status, body) = post_callback(app(&pool), notification("nonexistent-id", "1000.00", "settlement")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["outcome"], "unknown");
}

#[tokio::test]
async fn test_unparseable_amount_is_bad_request() {
    let (pool, _container) = setup_db().await;

    let (status, _) = post_callback(app(&pool), notification("topup-x", "abc", "settlement")).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_balance_endpoint() {
    let (pool, _container) = setup_db().await;
    let user = create_user(&pool, "Rina", "1500.50").await;

    let response = app(&pool)
        .oneshot(
            Request::builder()
                .uri(format!("/users/{}/balance", user))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["user_id"], user.to_string());
}

#[tokio::test]
async fn test_health_reports_connected_database() {
    let (pool, _container) = setup_db().await;

    let response = app(&pool)
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["db"], "connected");
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_malformed_order_id_is_acknowledged() {
    let (pool, _container) = setup_db().await;
    let long_id = "x".repeat(65);

    let (status, body) = post_callback(app(&pool), notification(&long_id, "1000.00", "settlement")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["outcome"], "unknown");
}
