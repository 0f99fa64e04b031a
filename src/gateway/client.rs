use async_trait::async_trait;
use bigdecimal::{BigDecimal, ToPrimitive};
use failsafe::futures::CircuitBreaker as FuturesCircuitBreaker;
use failsafe::{backoff, failure_policy, Config, Error as FailsafeError, StateMachine};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;

use super::{CheckoutRequest, CheckoutSession, GatewayError, LineItem, PaymentGateway};
use crate::config::GatewayConfig;

const TRANSACTIONS_PATH: &str = "/snap/v1/transactions";
/// The gateway truncates longer item names and then fails the amount check.
const ITEM_NAME_MAX_LEN: usize = 50;

#[derive(Debug, Serialize)]
struct SnapTransactionRequest<'a> {
    transaction_details: TransactionDetails<'a>,
    customer_details: CustomerDetails<'a>,
    item_details: Vec<ItemDetails>,
}

#[derive(Debug, Serialize)]
struct TransactionDetails<'a> {
    order_id: &'a str,
    gross_amount: Value,
}

#[derive(Debug, Serialize)]
struct CustomerDetails<'a> {
    first_name: &'a str,
    email: &'a str,
}

#[derive(Debug, Serialize)]
struct ItemDetails {
    id: String,
    price: Value,
    quantity: u32,
    name: String,
    category: String,
    merchant_name: String,
}

impl TryFrom<&LineItem> for ItemDetails {
    type Error = GatewayError;

    fn try_from(item: &LineItem) -> Result<Self, Self::Error> {
        Ok(Self {
            id: item.id.clone(),
            price: amount_json(&item.price)?,
            quantity: item.quantity,
            name: item.name.chars().take(ITEM_NAME_MAX_LEN).collect(),
            category: item.category.clone(),
            merchant_name: item.merchant_name.clone(),
        })
    }
}

#[derive(Debug, Deserialize)]
struct SnapErrorResponse {
    #[serde(default)]
    error_messages: Vec<String>,
}

/// Snap charges whole currency units and reads amounts as JSON integers.
fn amount_json(amount: &BigDecimal) -> Result<Value, GatewayError> {
    amount
        .is_integer()
        .then(|| amount.to_i64())
        .flatten()
        .map(|whole| json!(whole))
        .ok_or_else(|| {
            GatewayError::InvalidRequest(format!("amount {} is not a whole currency amount", amount))
        })
}

/// HTTP client for the gateway's hosted-checkout (Snap) API
#[derive(Clone)]
pub struct SnapClient {
    client: Client,
    base_url: String,
    server_key: String,
    circuit_breaker: StateMachine<failure_policy::ConsecutiveFailures<backoff::EqualJittered>, ()>,
}

impl SnapClient {
    pub fn new(base_url: String, server_key: String) -> Self {
        Self::with_circuit_breaker(base_url, server_key, Duration::from_secs(30), 3, 60)
    }

    pub fn from_config(config: &GatewayConfig) -> Self {
        Self::with_circuit_breaker(
            config.base_url.clone(),
            config.server_key.clone(),
            Duration::from_secs(config.timeout_secs),
            config.failure_threshold,
            config.reset_timeout_secs,
        )
    }

    pub fn with_circuit_breaker(
        base_url: String,
        server_key: String,
        timeout: Duration,
        failure_threshold: u32,
        reset_timeout_secs: u64,
    ) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_default();

        let backoff = backoff::equal_jittered(
            Duration::from_secs(reset_timeout_secs),
            Duration::from_secs(reset_timeout_secs * 2),
        );
        let policy = failure_policy::consecutive_failures(failure_threshold, backoff);
        let circuit_breaker = Config::new().failure_policy(policy).build();

        SnapClient {
            client,
            base_url,
            server_key,
            circuit_breaker,
        }
    }

    fn transactions_url(&self) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), TRANSACTIONS_PATH)
    }
}

#[async_trait]
impl PaymentGateway for SnapClient {
    async fn create_checkout_session(
        &self,
        request: CheckoutRequest,
    ) -> Result<CheckoutSession, GatewayError> {
        let item_details = request
            .items
            .iter()
            .map(ItemDetails::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        let body = serde_json::to_value(SnapTransactionRequest {
            transaction_details: TransactionDetails {
                order_id: &request.order_id,
                gross_amount: amount_json(&request.gross_amount)?,
            },
            customer_details: CustomerDetails {
                first_name: &request.customer.name,
                email: &request.customer.email,
            },
            item_details,
        })
        .map_err(|e| GatewayError::InvalidRequest(format!("unserializable request: {}", e)))?;

        let client = self.client.clone();
        let url = self.transactions_url();
        let server_key = self.server_key.clone();

        tracing::debug!(order_id = %request.order_id, "Requesting checkout session");

        let result = self
            .circuit_breaker
            .call(async move {
                let response = client
                    .post(&url)
                    .basic_auth(server_key, Some(""))
                    .header("Accept", "application/json")
                    .json(&body)
                    .send()
                    .await?;

                let status = response.status();
                if !status.is_success() {
                    let text = response.text().await.unwrap_or_default();
                    let message = serde_json::from_str::<SnapErrorResponse>(&text)
                        .ok()
                        .filter(|e| !e.error_messages.is_empty())
                        .map(|e| e.error_messages.join("; "))
                        .unwrap_or(text);

                    return Err(GatewayError::Rejected {
                        status: status.as_u16(),
                        message,
                    });
                }

                let session = response
                    .json::<CheckoutSession>()
                    .await
                    .map_err(|e| GatewayError::InvalidResponse(e.to_string()))?;

                if session.token.is_empty() {
                    return Err(GatewayError::InvalidResponse("empty checkout token".to_string()));
                }

                Ok(session)
            })
            .await;

        match result {
            Ok(session) => Ok(session),
            Err(FailsafeError::Rejected) => Err(GatewayError::CircuitBreakerOpen(
                "payment gateway circuit breaker is open".to_string(),
            )),
            Err(FailsafeError::Inner(e)) => {
                tracing::warn!(order_id = %request.order_id, error = %e, "Checkout session request failed");
                Err(e)
            }
        }
    }

    fn circuit_state(&self) -> String {
        if self.circuit_breaker.is_call_permitted() {
            "closed".to_string()
        } else {
            "open".to_string()
        }
    }
}
