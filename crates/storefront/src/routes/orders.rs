//! Order handlers: checkout, history, detail and admin status changes.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;

use bramble_core::checkout::{self, CheckoutDetails};
use bramble_core::models::{Order, OrderWithItems};
use bramble_core::{OrderId, OrderStatus, Pagination};

use crate::error::{ApiJson, AppError, Result, add_breadcrumb};
use crate::middleware::{RequireAdmin, RequireUser};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub status: OrderStatus,
}

/// Check out the caller's cart.
pub async fn create(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    ApiJson(details): ApiJson<CheckoutDetails>,
) -> Result<(StatusCode, Json<OrderWithItems>)> {
    let placed = checkout::place_order(state.storage(), user.id, details).await?;

    add_breadcrumb(
        "checkout",
        "Order placed",
        &[
            ("order_id", placed.order.id.to_string()),
            ("total", placed.order.total.to_string()),
        ],
    );

    Ok((StatusCode::CREATED, Json(placed)))
}

/// The caller's orders. Admins see every order.
pub async fn index(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Query(page): Query<Pagination>,
) -> Result<Json<Vec<Order>>> {
    let owner = (!user.role.is_admin()).then_some(user.id);
    Ok(Json(state.storage().list_orders(owner, page).await?))
}

/// One order with its lines.
///
/// Another customer's order answers 404, the same as a missing one.
pub async fn show(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Path(id): Path<OrderId>,
) -> Result<Json<OrderWithItems>> {
    let order = state
        .storage()
        .get_order(id)
        .await?
        .filter(|order| user.role.is_admin() || order.user_id == user.id)
        .ok_or_else(|| AppError::NotFound("Order".to_string()))?;

    let items = state.storage().list_order_items(order.id).await?;
    Ok(Json(OrderWithItems { order, items }))
}

#[tracing::instrument(skip(state, admin), fields(admin_id = %admin.0.id))]
pub async fn update_status(
    State(state): State<AppState>,
    admin: RequireAdmin,
    Path(id): Path<OrderId>,
    ApiJson(body): ApiJson<StatusRequest>,
) -> Result<Json<Order>> {
    let order = state
        .storage()
        .update_order_status(id, body.status)
        .await?
        .ok_or_else(|| AppError::NotFound("Order".to_string()))?;

    tracing::info!(order_id = %order.id, status = %order.status, "order status changed");
    Ok(Json(order))
}
