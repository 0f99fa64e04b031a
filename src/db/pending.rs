//! Pending transaction stores: purchase orders and wallet top-ups.
//!
//! Both tables share one shape (id, owning party, amount, paid flag), so the
//! lookups the resolver needs are written once over [`PendingKind`]. Inserts and
//! the order-only party lookups are per table.
//!
//! Settlement reads the owner through [`lock`], which takes the row lock.
//! [`find_owner_user_id`], [`find_buyer_id`] and [`find_seller_id`] are plain
//! reads for callers that do not mutate the row. The resolver calls
//! [`find_seller_id`] only after taking the lock.

use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{FromRow, PgConnection};
use uuid::Uuid;

use crate::db::models::{Order, TopUpOrder};
use crate::error::AppError;

pub trait PendingKind {
    /// Human-readable name used in errors and logs.
    const LABEL: &'static str;
    const TABLE: &'static str;
    /// The user whose wallet this transaction debits (orders) or credits (top-ups).
    const OWNER_COLUMN: &'static str;
    const AMOUNT_COLUMN: &'static str;

    type Row: for<'r> FromRow<'r, PgRow> + Send + Unpin;
}

pub struct Orders;

impl PendingKind for Orders {
    const LABEL: &'static str = "order";
    const TABLE: &'static str = "orders";
    const OWNER_COLUMN: &'static str = "buyer_id";
    const AMOUNT_COLUMN: &'static str = "total_amount";

    type Row = Order;
}

pub struct TopUps;

impl PendingKind for TopUps {
    const LABEL: &'static str = "top-up";
    const TABLE: &'static str = "top_up_orders";
    const OWNER_COLUMN: &'static str = "user_id";
    const AMOUNT_COLUMN: &'static str = "amount";

    type Row = TopUpOrder;
}

/// The columns the resolver reads while classifying a callback.
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct PendingRow {
    pub owner_id: Uuid,
    pub amount: BigDecimal,
    pub paid: bool,
}

fn not_found<K: PendingKind>(id: &str) -> AppError {
    AppError::NotFound(format!("{} {} not found", K::LABEL, id))
}

pub async fn insert_order(conn: &mut PgConnection, order: &Order) -> Result<Order, AppError> {
    let inserted = sqlx::query_as::<_, Order>(
        r#"
        INSERT INTO orders (
            id, buyer_id, seller_id, costume_id, total_amount, paid, created_at, updated_at
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING *
        "#,
    )
    .bind(&order.id)
    .bind(order.buyer_id)
    .bind(order.seller_id)
    .bind(order.costume_id)
    .bind(&order.total_amount)
    .bind(order.paid)
    .bind(order.created_at)
    .bind(order.updated_at)
    .fetch_one(&mut *conn)
    .await?;

    Ok(inserted)
}

pub async fn insert_top_up(
    conn: &mut PgConnection,
    top_up: &TopUpOrder,
) -> Result<TopUpOrder, AppError> {
    let inserted = sqlx::query_as::<_, TopUpOrder>(
        r#"
        INSERT INTO top_up_orders (id, user_id, amount, paid, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING *
        "#,
    )
    .bind(&top_up.id)
    .bind(top_up.user_id)
    .bind(&top_up.amount)
    .bind(top_up.paid)
    .bind(top_up.created_at)
    .bind(top_up.updated_at)
    .fetch_one(&mut *conn)
    .await?;

    Ok(inserted)
}

pub async fn find<K: PendingKind>(conn: &mut PgConnection, id: &str) -> Result<K::Row, AppError> {
    let sql = format!("SELECT * FROM {} WHERE id = $1", K::TABLE);

    sqlx::query_as::<_, K::Row>(&sql)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| not_found::<K>(id))
}

/// Reads the row under `FOR UPDATE`, so concurrent callbacks for the same id
/// queue behind the first one until its transaction ends.
pub async fn lock<K: PendingKind>(
    conn: &mut PgConnection,
    id: &str,
) -> Result<Option<PendingRow>, AppError> {
    let sql = format!(
        "SELECT {} AS owner_id, {} AS amount, paid FROM {} WHERE id = $1 FOR UPDATE",
        K::OWNER_COLUMN,
        K::AMOUNT_COLUMN,
        K::TABLE
    );

    let row = sqlx::query_as::<_, PendingRow>(&sql)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

    Ok(row)
}

pub async fn find_owner_user_id<K: PendingKind>(
    conn: &mut PgConnection,
    id: &str,
) -> Result<Uuid, AppError> {
    let sql = format!("SELECT {} FROM {} WHERE id = $1", K::OWNER_COLUMN, K::TABLE);

    sqlx::query_scalar::<_, Uuid>(&sql)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| not_found::<K>(id))
}

/// Flips `paid` to true. Returns `false` when the row was already paid, which
/// is how callers tell a first settlement from a redelivered callback.
pub async fn mark_paid<K: PendingKind>(
    conn: &mut PgConnection,
    id: &str,
    when: DateTime<Utc>,
) -> Result<bool, AppError> {
    let sql = format!(
        "UPDATE {} SET paid = TRUE, updated_at = $2 WHERE id = $1 AND paid = FALSE",
        K::TABLE
    );

    let result = sqlx::query(&sql)
        .bind(id)
        .bind(when)
        .execute(&mut *conn)
        .await?;

    Ok(result.rows_affected() == 1)
}

pub async fn find_buyer_id(conn: &mut PgConnection, order_id: &str) -> Result<Uuid, AppError> {
    find_owner_user_id::<Orders>(conn, order_id).await
}

pub async fn find_seller_id(conn: &mut PgConnection, order_id: &str) -> Result<Uuid, AppError> {
    sqlx::query_scalar::<_, Uuid>("SELECT seller_id FROM orders WHERE id = $1")
        .bind(order_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| not_found::<Orders>(order_id))
}
