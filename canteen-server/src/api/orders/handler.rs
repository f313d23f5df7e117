//! Order API Handlers

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;

use crate::auth::CurrentUser;
use crate::core::ServerState;
use crate::db::models::{
    CreateOrderRequest, Order, OrderStatus, TokenView, UpdateStatusRequest,
};
use crate::db::repository::OrderRepository;
use crate::utils::{AppError, AppResult};

/// Query params for listing orders
#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub canteen: Option<String>,
    pub status: Option<OrderStatus>,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_limit() -> i64 {
    50
}

/// POST /api/orders - checkout
pub async fn create(
    State(state): State<ServerState>,
    user: CurrentUser,
    Json(payload): Json<CreateOrderRequest>,
) -> AppResult<Json<Order>> {
    let order = state.lifecycle.create_order(&user, payload).await?;
    Ok(Json(order))
}

/// GET /api/orders - list orders (most recent first)
pub async fn list(
    State(state): State<ServerState>,
    Query(query): Query<ListQuery>,
) -> AppResult<Json<Vec<Order>>> {
    let repo = OrderRepository::new(state.db.clone());
    let orders = repo
        .find_all(query.canteen, query.status, query.limit)
        .await?;
    Ok(Json(orders))
}

/// GET /api/orders/{id} - get order by id
pub async fn get_by_id(
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> AppResult<Json<Order>> {
    let repo = OrderRepository::new(state.db.clone());
    let order = repo
        .find_by_id(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Order {} not found", id)))?;
    Ok(Json(order))
}

/// PATCH /api/orders/{id}/status - admin status transition
pub async fn update_status(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(id): Path<String>,
    Json(payload): Json<UpdateStatusRequest>,
) -> AppResult<Json<Order>> {
    let order = state.lifecycle.update_status(&user, &id, payload).await?;
    Ok(Json(order))
}

/// POST /api/orders/{id}/cancel - owner cancellation
pub async fn cancel(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> AppResult<Json<Order>> {
    let order = state.lifecycle.cancel_order(&user, &id).await?;
    Ok(Json(order))
}

/// GET /api/orders/{id}/token - pickup token for display
pub async fn token_view(
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> AppResult<Json<TokenView>> {
    let repo = OrderRepository::new(state.db.clone());
    let order = repo
        .find_by_id(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Order {} not found", id)))?;

    let order_id = order.id_string();
    Ok(Json(TokenView {
        pickup_code: format!("canteen://pickup/{}?token={}", order_id, order.token_number),
        order_id,
        token_number: order.token_number,
    }))
}
