//! Reads from tables owned by the account and catalogue modules.

use sqlx::PgConnection;
use uuid::Uuid;

use crate::db::models::{CostumeListing, User};
use crate::error::AppError;

pub async fn find_user(conn: &mut PgConnection, user_id: Uuid) -> Result<User, AppError> {
    sqlx::query_as::<_, User>(
        "SELECT id, name, email, emoney_amount, emoney_updated_at FROM users WHERE id = $1",
    )
    .bind(user_id)
    .fetch_one(&mut *conn)
    .await
    .map_err(|e| AppError::from_lookup(e, || format!("User {} not found", user_id)))
}

/// Share-locks the costume row so its owner and price cannot change before the
/// surrounding transaction commits.
pub async fn find_costume_listing(
    conn: &mut PgConnection,
    costume_id: Uuid,
) -> Result<CostumeListing, AppError> {
    sqlx::query_as::<_, CostumeListing>(
        r#"
        SELECT c.id, c.user_id AS seller_id, c.name, cat.name AS category, c.price
        FROM costumes c
        JOIN categories cat ON cat.id = c.category_id
        WHERE c.id = $1
        FOR SHARE OF c
        "#,
    )
    .bind(costume_id)
    .fetch_one(&mut *conn)
    .await
    .map_err(|e| AppError::from_lookup(e, || format!("Costume {} not found", costume_id)))
}
