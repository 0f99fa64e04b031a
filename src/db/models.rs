use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::BigDecimal;
use sqlx::FromRow;
use uuid::Uuid;

/// Fresh identifier for a pending transaction. Orders and top-ups draw from the
/// same 128-bit random space because the gateway echoes a single `order_id`.
pub fn new_transaction_id() -> String {
    Uuid::new_v4().to_string()
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub emoney_amount: BigDecimal,
    pub emoney_updated_at: DateTime<Utc>,
}

/// Wallet view of a user.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Balance {
    pub user_id: Uuid,
    pub emoney_amount: BigDecimal,
    pub emoney_updated_at: DateTime<Utc>,
}

/// Listing details needed to describe an order to the gateway.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct CostumeListing {
    pub id: Uuid,
    pub seller_id: Uuid,
    pub name: String,
    pub category: String,
    pub price: BigDecimal,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Order {
    pub id: String,
    pub buyer_id: Uuid,
    pub seller_id: Uuid,
    pub costume_id: Uuid,
    pub total_amount: BigDecimal,
    pub paid: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    pub fn new(
        buyer_id: Uuid,
        seller_id: Uuid,
        costume_id: Uuid,
        total_amount: BigDecimal,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: new_transaction_id(),
            buyer_id,
            seller_id,
            costume_id,
            total_amount,
            paid: false,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct TopUpOrder {
    pub id: String,
    pub user_id: Uuid,
    pub amount: BigDecimal,
    pub paid: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TopUpOrder {
    pub fn new(user_id: Uuid, amount: BigDecimal) -> Self {
        let now = Utc::now();
        Self {
            id: new_transaction_id(),
            user_id,
            amount,
            paid: false,
            created_at: now,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_new_order_is_unpaid() {
        let order = Order::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            Uuid::new_v4(),
            BigDecimal::from(30000),
        );
        assert!(!order.paid);
        assert_eq!(order.created_at, order.updated_at);
        assert!(Uuid::parse_str(&order.id).is_ok());
    }

    #[test]
    fn test_transaction_ids_do_not_repeat_across_kinds() {
        let user = Uuid::new_v4();
        let mut seen = HashSet::new();

        for _ in 0..5_000 {
            let order = Order::new(user, Uuid::new_v4(), Uuid::new_v4(), BigDecimal::from(1));
            let top_up = TopUpOrder::new(user, BigDecimal::from(1));
            assert!(seen.insert(order.id));
            assert!(seen.insert(top_up.id));
        }

        assert_eq!(seen.len(), 10_000);
    }
}
