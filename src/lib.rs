pub mod cli;
pub mod config;
pub mod db;
pub mod error;
pub mod gateway;
pub mod handlers;
pub mod middleware;
pub mod services;
pub mod utils;
pub mod validation;

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use sqlx::PgPool;

use crate::gateway::PaymentGateway;
use crate::services::{CheckoutService, TransactionResolver};

#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub checkout: CheckoutService,
    pub resolver: TransactionResolver,
    /// Shared secret for verifying gateway notification signatures.
    pub server_key: String,
}

impl AppState {
    pub fn new(
        db: PgPool,
        gateway: Arc<dyn PaymentGateway>,
        server_key: String,
        merchant_name: String,
    ) -> Self {
        Self {
            checkout: CheckoutService::new(db.clone(), gateway, merchant_name),
            resolver: TransactionResolver::new(db.clone()),
            db,
            server_key,
        }
    }
}

pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/orders", post(handlers::checkout::create_order))
        .route("/orders/:id", get(handlers::checkout::get_order))
        .route("/topups", post(handlers::checkout::create_top_up))
        .route("/topups/:id", get(handlers::checkout::get_top_up))
        .route("/users/:id/balance", get(handlers::checkout::get_balance))
        .route(
            "/users/:id/balance-check",
            get(handlers::checkout::balance_check),
        )
        .route("/payments/callback", post(handlers::webhook::payment_callback))
        .layer(axum::middleware::from_fn(
            middleware::request_logger::request_logger_middleware,
        ))
        .with_state(state)
}
