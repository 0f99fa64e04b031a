use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;

use crate::error::AppError;
use crate::gateway::PaymentNotification;
use crate::AppState;

/// Gateway payment notification endpoint.
///
/// Any 2xx tells the gateway to stop redelivering, so only failures worth
/// retrying (persistence, integrity) produce a 5xx.
pub async fn payment_callback(
    State(state): State<AppState>,
    Json(payload): Json<PaymentNotification>,
) -> Result<impl IntoResponse, AppError> {
    if !payload.has_valid_signature(&state.server_key) {
        tracing::warn!(
            order_id = %payload.order_id,
            transaction_id = ?payload.transaction_id,
            "Rejected payment notification with invalid signature"
        );
        return Err(AppError::Unauthorized("invalid signature_key".to_string()));
    }

    if !payload.is_settlement() {
        tracing::info!(
            order_id = %payload.order_id,
            transaction_status = %payload.transaction_status,
            payment_type = ?payload.payment_type,
            "Payment notification acknowledged without settlement"
        );
        return Ok((
            StatusCode::OK,
            Json(json!({
                "outcome": "ignored",
                "order_id": payload.order_id,
                "transaction_status": payload.transaction_status,
            })),
        ));
    }

    let resolution = state
        .resolver
        .resolve(&payload.order_id, &payload.gross_amount)
        .await?;

    Ok((StatusCode::OK, Json(json!(resolution))))
}
