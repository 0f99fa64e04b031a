//! Wallet balances on the `users` table.
//!
//! `emoney_amount` is only written through this module. After a pending
//! transaction has been created, the transaction resolver is the only caller of
//! [`credit`] and [`debit`].

use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use sqlx::PgConnection;
use uuid::Uuid;

use crate::db::models::Balance;
use crate::error::AppError;

pub async fn get_balance(conn: &mut PgConnection, user_id: Uuid) -> Result<Balance, AppError> {
    sqlx::query_as::<_, Balance>(
        "SELECT id AS user_id, emoney_amount, emoney_updated_at FROM users WHERE id = $1",
    )
    .bind(user_id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("User {} not found", user_id)))
}

pub async fn credit(
    conn: &mut PgConnection,
    user_id: Uuid,
    amount: &BigDecimal,
    when: DateTime<Utc>,
) -> Result<(), AppError> {
    let result = sqlx::query(
        r#"
        UPDATE users
        SET emoney_amount = emoney_amount + $2, emoney_updated_at = $3
        WHERE id = $1
        "#,
    )
    .bind(user_id)
    .bind(amount)
    .bind(when)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound(format!("User {} not found", user_id)));
    }

    tracing::debug!(user_id = %user_id, amount = %amount, "Wallet credited");
    Ok(())
}

/// Decreases the balance. The guarded update never drives a balance below zero.
pub async fn debit(
    conn: &mut PgConnection,
    user_id: Uuid,
    amount: &BigDecimal,
    when: DateTime<Utc>,
) -> Result<(), AppError> {
    let result = sqlx::query(
        r#"
        UPDATE users
        SET emoney_amount = emoney_amount - $2, emoney_updated_at = $3
        WHERE id = $1 AND emoney_amount >= $2
        "#,
    )
    .bind(user_id)
    .bind(amount)
    .bind(when)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE id = $1)")
            .bind(user_id)
            .fetch_one(&mut *conn)
            .await?;

        return Err(if exists {
            AppError::InsufficientBalance(format!(
                "User {} cannot cover a debit of {}",
                user_id, amount
            ))
        } else {
            AppError::NotFound(format!("User {} not found", user_id))
        });
    }

    tracing::debug!(user_id = %user_id, amount = %amount, "Wallet debited");
    Ok(())
}

/// A balance only covers an order when it is strictly greater than the amount.
pub fn ensure_sufficient(balance: &BigDecimal, amount: &BigDecimal) -> Result<(), AppError> {
    if balance <= amount {
        return Err(AppError::InsufficientBalance(format!(
            "balance {} does not exceed order amount {}",
            balance, amount
        )));
    }

    Ok(())
}
