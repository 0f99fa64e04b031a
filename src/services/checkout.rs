use bigdecimal::{BigDecimal, Zero};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;

use crate::db::models::{CostumeListing, Order, TopUpOrder};
use crate::db::{self, ledger, lookups, pending};
use crate::error::AppError;
use crate::gateway::{CheckoutRequest, Customer, LineItem, PaymentGateway};
use crate::validation::{
    sanitize_string, validate_max_len, validate_positive_amount, ValidationError,
    DESCRIPTION_MAX_LEN,
};

const TAX_ITEM_ID: &str = "tax";
const TOP_UP_ITEM_ID: &str = "top-up";

#[derive(Debug, Clone, Deserialize)]
pub struct CreateOrderInput {
    pub buyer_id: Uuid,
    pub seller_id: Uuid,
    pub costume_id: Uuid,
    pub total_amount: BigDecimal,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateTopUpInput {
    pub user_id: Uuid,
    pub amount: BigDecimal,
}

/// Where to send the payer next.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckoutResponse {
    pub order_id: String,
    pub token: String,
    pub redirect_url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BalanceCheck {
    pub user_id: Uuid,
    pub balance: BigDecimal,
    pub order_amount: BigDecimal,
    pub sufficient: bool,
}

/// Creates pending orders and top-ups and opens a gateway checkout for each.
///
/// The pending row is committed before the gateway is called. If the gateway
/// then fails, the row stays unpaid and inert: no callback will ever settle it.
#[derive(Clone)]
pub struct CheckoutService {
    pool: PgPool,
    gateway: Arc<dyn PaymentGateway>,
    merchant_name: String,
}

impl CheckoutService {
    pub fn new(pool: PgPool, gateway: Arc<dyn PaymentGateway>, merchant_name: String) -> Self {
        Self {
            pool,
            gateway,
            merchant_name,
        }
    }

    pub fn gateway(&self) -> &Arc<dyn PaymentGateway> {
        &self.gateway
    }

    pub async fn create_order(&self, input: CreateOrderInput) -> Result<CheckoutResponse, AppError> {
        validate_positive_amount("total_amount", &input.total_amount)?;
        if input.buyer_id == input.seller_id {
            return Err(ValidationError::new("seller_id", "buyer cannot purchase from themselves").into());
        }
        let description = match input.description.as_deref().map(sanitize_string) {
            Some(text) if !text.is_empty() => {
                validate_max_len("description", &text, DESCRIPTION_MAX_LEN)?;
                Some(text)
            }
            _ => None,
        };

        let merchant_name = self.merchant_name.clone();
        let (order, buyer, items) = db::with_transaction(&self.pool, move |conn| {
            Box::pin(async move {
                let buyer = lookups::find_user(conn, input.buyer_id).await?;
                let listing = lookups::find_costume_listing(conn, input.costume_id).await?;

                if listing.seller_id != input.seller_id {
                    return Err(ValidationError::new("seller_id", "does not own the costume").into());
                }

                let items = order_line_items(
                    &listing,
                    &input.total_amount,
                    description.as_deref(),
                    &merchant_name,
                )?;

                let order = Order::new(
                    input.buyer_id,
                    input.seller_id,
                    input.costume_id,
                    input.total_amount,
                );
                let order = pending::insert_order(conn, &order).await?;

                Ok::<_, AppError>((order, buyer, items))
            })
        })
        .await?;

        tracing::info!(
            order_id = %order.id,
            buyer_id = %order.buyer_id,
            seller_id = %order.seller_id,
            amount = %order.total_amount,
            "Pending order created"
        );

        let session = self
            .gateway
            .create_checkout_session(CheckoutRequest {
                order_id: order.id.clone(),
                gross_amount: order.total_amount.clone(),
                customer: Customer {
                    name: buyer.name,
                    email: buyer.email,
                },
                items,
            })
            .await
            .map_err(|e| {
                tracing::error!(order_id = %order.id, error = %e, "Checkout session for order failed");
                AppError::Gateway(e)
            })?;

        Ok(CheckoutResponse {
            order_id: order.id,
            token: session.token,
            redirect_url: session.redirect_url,
        })
    }

    pub async fn create_top_up(&self, input: CreateTopUpInput) -> Result<CheckoutResponse, AppError> {
        validate_positive_amount("amount", &input.amount)?;

        let (top_up, user) = db::with_transaction(&self.pool, move |conn| {
            Box::pin(async move {
                let user = lookups::find_user(conn, input.user_id).await?;
                let top_up = TopUpOrder::new(input.user_id, input.amount);
                let top_up = pending::insert_top_up(conn, &top_up).await?;

                Ok::<_, AppError>((top_up, user))
            })
        })
        .await?;

        tracing::info!(
            order_id = %top_up.id,
            user_id = %top_up.user_id,
            amount = %top_up.amount,
            "Pending top-up created"
        );

        let items = vec![LineItem {
            id: TOP_UP_ITEM_ID.to_string(),
            name: "Wallet top-up".to_string(),
            price: top_up.amount.clone(),
            quantity: 1,
            category: "Top Up".to_string(),
            merchant_name: self.merchant_name.clone(),
        }];

        let session = self
            .gateway
            .create_checkout_session(CheckoutRequest {
                order_id: top_up.id.clone(),
                gross_amount: top_up.amount.clone(),
                customer: Customer {
                    name: user.name,
                    email: user.email,
                },
                items,
            })
            .await
            .map_err(|e| {
                tracing::error!(order_id = %top_up.id, error = %e, "Checkout session for top-up failed");
                AppError::Gateway(e)
            })?;

        Ok(CheckoutResponse {
            order_id: top_up.id,
            token: session.token,
            redirect_url: session.redirect_url,
        })
    }

    /// Answers "can this user afford an order of `amount`" without creating anything.
    pub async fn check_balance_with_order_amount(
        &self,
        user_id: Uuid,
        amount: BigDecimal,
    ) -> Result<BalanceCheck, AppError> {
        validate_positive_amount("amount", &amount)?;

        let mut conn = self.pool.acquire().await?;
        let balance = ledger::get_balance(&mut conn, user_id).await?;
        ledger::ensure_sufficient(&balance.emoney_amount, &amount)?;

        Ok(BalanceCheck {
            user_id,
            balance: balance.emoney_amount,
            order_amount: amount,
            sufficient: true,
        })
    }
}

/// The costume line plus a tax line for whatever the total adds on top of the
/// listed price. Line prices always sum to `total`.
pub fn order_line_items(
    listing: &CostumeListing,
    total: &BigDecimal,
    description: Option<&str>,
    merchant_name: &str,
) -> Result<Vec<LineItem>, AppError> {
    let tax = total - &listing.price;
    if tax < BigDecimal::zero() {
        return Err(ValidationError::new(
            "total_amount",
            format!("must not be below the costume price {}", listing.price),
        )
        .into());
    }

    let mut items = vec![LineItem {
        id: listing.id.to_string(),
        name: description.unwrap_or(listing.name.as_str()).to_string(),
        price: listing.price.clone(),
        quantity: 1,
        category: listing.category.clone(),
        merchant_name: merchant_name.to_string(),
    }];

    if !tax.is_zero() {
        items.push(LineItem {
            id: TAX_ITEM_ID.to_string(),
            name: "Tax".to_string(),
            price: tax,
            quantity: 1,
            category: "Tax".to_string(),
            merchant_name: merchant_name.to_string(),
        });
    }

    Ok(items)
}
