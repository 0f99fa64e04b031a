pub mod checkout;
pub mod webhook;

use crate::AppState;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub version: String,
    pub db: String,
    pub db_pool: DbPoolStats,
    pub payment_gateway: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DbPoolStats {
    pub active_connections: u32,
    pub idle_connections: u32,
    pub max_connections: u32,
    pub usage_percent: f32,
}

pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let db_connected = sqlx::query("SELECT 1").execute(&state.db).await.is_ok();

    let pool = &state.db;
    let active_connections = pool.size();
    let max_connections = pool.options().get_max_connections();
    let usage_percent = (active_connections as f32 / max_connections as f32) * 100.0;

    let payment_gateway = state.checkout.gateway().circuit_state();

    // An open gateway circuit degrades checkout but callbacks still settle.
    let status = if !db_connected {
        "unhealthy"
    } else if payment_gateway != "closed" {
        "degraded"
    } else {
        "healthy"
    };

    let health_response = HealthStatus {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        db: if db_connected { "connected" } else { "disconnected" }.to_string(),
        db_pool: DbPoolStats {
            active_connections,
            idle_connections: pool.num_idle() as u32,
            max_connections,
            usage_percent,
        },
        payment_gateway,
    };

    let status_code = if db_connected {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(health_response))
}
