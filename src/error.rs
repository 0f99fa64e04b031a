use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::gateway::GatewayError;
use crate::validation::ValidationError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Insufficient balance: {0}")]
    InsufficientBalance(String),

    #[error("Payment gateway error: {0}")]
    Gateway(#[from] GatewayError),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Data integrity violation: {0}")]
    Integrity(String),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::InsufficientBalance(_) => StatusCode::PAYMENT_REQUIRED,
            AppError::Gateway(_) => StatusCode::BAD_GATEWAY,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Integrity(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Maps `RowNotFound` to a typed `NotFound`; other driver errors stay persistence errors.
    pub fn from_lookup(err: sqlx::Error, what: impl FnOnce() -> String) -> Self {
        match err {
            sqlx::Error::RowNotFound => AppError::NotFound(what()),
            other => AppError::Database(other),
        }
    }
}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        AppError::Validation(err.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // Driver messages stay in the logs.
        let message = match &self {
            AppError::Database(e) => {
                tracing::error!(error = %e, "database error while handling request");
                "Internal server error".to_string()
            }
            AppError::Integrity(msg) => {
                tracing::error!(reason = %msg, "data integrity violation");
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };

        let body = Json(json!({
            "error": message,
            "status": status.as_u16(),
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_status_code() {
        let error = AppError::Validation("amount must be positive".to_string());
        assert_eq!(error.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_not_found_error_status_code() {
        let error = AppError::NotFound("User not found".to_string());
        assert_eq!(error.status_code(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_insufficient_balance_status_code() {
        let error = AppError::InsufficientBalance("balance 1000 <= 1000".to_string());
        assert_eq!(error.status_code(), StatusCode::PAYMENT_REQUIRED);
    }

    #[test]
    fn test_gateway_error_status_code() {
        let error = AppError::Gateway(GatewayError::InvalidResponse("empty token".to_string()));
        assert_eq!(error.status_code(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn test_integrity_error_status_code() {
        let error = AppError::Integrity("id in both tables".to_string());
        assert_eq!(error.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_database_error_status_code() {
        let error = AppError::Database(sqlx::Error::PoolTimedOut);
        assert_eq!(error.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_from_lookup_maps_row_not_found() {
        let error = AppError::from_lookup(sqlx::Error::RowNotFound, || "order ord-1".to_string());
        assert!(matches!(error, AppError::NotFound(ref msg) if msg == "order ord-1"));

        let error = AppError::from_lookup(sqlx::Error::PoolTimedOut, || unreachable!());
        assert!(matches!(error, AppError::Database(_)));
    }

    #[test]
    fn test_validation_error_conversion() {
        let error: AppError = ValidationError::new("amount", "must be positive").into();
        assert_eq!(error.to_string(), "Validation error: amount: must be positive");
    }

    #[tokio::test]
    async fn test_unauthorized_error_response() {
        let error = AppError::Unauthorized("invalid signature".to_string());
        let response = error.into_response();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_database_error_response_hides_driver_message() {
        let error = AppError::Database(sqlx::Error::PoolTimedOut);
        let response = error.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"], "Internal server error");
        assert_eq!(body["status"], 500);
    }
}
