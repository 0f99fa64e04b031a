//! Hosted-checkout payment gateway: outbound session creation and inbound
//! notification handling.

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod client;
pub mod signature;

pub use client::SnapClient;
pub use signature::{expected_signature, verify_signature};

/// The only `transaction_status` that settles a pending transaction.
pub const SETTLEMENT_STATUS: &str = "settlement";

#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),
    #[error("Gateway rejected the request with status {status}: {message}")]
    Rejected { status: u16, message: String },
    #[error("Request not accepted by gateway contract: {0}")]
    InvalidRequest(String),
    #[error("Invalid response from gateway: {0}")]
    InvalidResponse(String),
    #[error("Circuit breaker open: {0}")]
    CircuitBreakerOpen(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Customer {
    pub name: String,
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    pub id: String,
    pub name: String,
    pub price: BigDecimal,
    pub quantity: u32,
    pub category: String,
    pub merchant_name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CheckoutRequest {
    pub order_id: String,
    pub gross_amount: BigDecimal,
    pub customer: Customer,
    pub items: Vec<LineItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckoutSession {
    pub token: String,
    pub redirect_url: String,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_checkout_session(
        &self,
        request: CheckoutRequest,
    ) -> Result<CheckoutSession, GatewayError>;

    /// "closed" while calls are permitted, "open" while the breaker rejects them.
    fn circuit_state(&self) -> String {
        "closed".to_string()
    }
}

/// Server-to-server payment notification posted by the gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentNotification {
    pub order_id: String,
    pub gross_amount: String,
    pub status_code: String,
    pub signature_key: String,
    pub transaction_status: String,
    #[serde(default)]
    pub transaction_id: Option<String>,
    #[serde(default)]
    pub payment_type: Option<String>,
    #[serde(default)]
    pub transaction_time: Option<String>,
    #[serde(default)]
    pub fraud_status: Option<String>,
}

impl PaymentNotification {
    pub fn is_settlement(&self) -> bool {
        self.transaction_status == SETTLEMENT_STATUS
    }

    pub fn has_valid_signature(&self, server_key: &str) -> bool {
        verify_signature(
            &self.order_id,
            &self.status_code,
            &self.gross_amount,
            server_key,
            &self.signature_key,
        )
    }
}
