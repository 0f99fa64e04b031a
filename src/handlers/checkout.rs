use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::db::{ledger, pending};
use crate::error::AppError;
use crate::services::checkout::{CreateOrderInput, CreateTopUpInput};
use crate::validation::parse_decimal;
use crate::AppState;

#[derive(Deserialize)]
pub struct BalanceCheckQuery {
    pub amount: String,
}

pub async fn create_order(
    State(state): State<AppState>,
    Json(input): Json<CreateOrderInput>,
) -> Result<impl IntoResponse, AppError> {
    let checkout = state.checkout.create_order(input).await?;
    Ok((StatusCode::CREATED, Json(checkout)))
}

pub async fn create_top_up(
    State(state): State<AppState>,
    Json(input): Json<CreateTopUpInput>,
) -> Result<impl IntoResponse, AppError> {
    let checkout = state.checkout.create_top_up(input).await?;
    Ok((StatusCode::CREATED, Json(checkout)))
}

pub async fn get_order(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let mut conn = state.db.acquire().await?;
    let order = pending::find::<pending::Orders>(&mut conn, &id).await?;
    Ok(Json(order))
}

pub async fn get_top_up(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let mut conn = state.db.acquire().await?;
    let top_up = pending::find::<pending::TopUps>(&mut conn, &id).await?;
    Ok(Json(top_up))
}

pub async fn get_balance(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let mut conn = state.db.acquire().await?;
    let balance = ledger::get_balance(&mut conn, user_id).await?;
    Ok(Json(balance))
}

pub async fn balance_check(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Query(query): Query<BalanceCheckQuery>,
) -> Result<impl IntoResponse, AppError> {
    let amount = parse_decimal("amount", &query.amount)?;
    let check = state
        .checkout
        .check_balance_with_order_amount(user_id, amount)
        .await?;
    Ok(Json(check))
}
