//! Product catalog handlers.
//!
//! Reads are public. Writes need an admin session.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde_json::json;

use bramble_core::models::{NewProduct, Product, ProductUpdate};
use bramble_core::{Pagination, ProductId};

use crate::error::{ApiJson, AppError, Result};
use crate::middleware::RequireAdmin;
use crate::state::AppState;

/// List products in creation order.
pub async fn index(
    State(state): State<AppState>,
    Query(page): Query<Pagination>,
) -> Result<Json<Vec<Product>>> {
    Ok(Json(state.storage().list_products(page).await?))
}

/// Product detail.
pub async fn show(
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
) -> Result<Json<Product>> {
    state
        .storage()
        .get_product(id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound("Product".to_string()))
}

#[tracing::instrument(skip(state, admin), fields(admin_id = %admin.0.id))]
pub async fn create(
    State(state): State<AppState>,
    admin: RequireAdmin,
    ApiJson(body): ApiJson<NewProduct>,
) -> Result<(StatusCode, Json<Product>)> {
    body.validate()?;
    let product = state.storage().create_product(body).await?;
    tracing::info!(product_id = %product.id, "product created");
    Ok((StatusCode::CREATED, Json(product)))
}

#[tracing::instrument(skip(state, admin), fields(admin_id = %admin.0.id))]
pub async fn update(
    State(state): State<AppState>,
    admin: RequireAdmin,
    Path(id): Path<ProductId>,
    ApiJson(body): ApiJson<ProductUpdate>,
) -> Result<Json<Product>> {
    body.validate()?;
    state
        .storage()
        .update_product(id, body)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound("Product".to_string()))
}

#[tracing::instrument(skip(state, admin), fields(admin_id = %admin.0.id))]
pub async fn delete(
    State(state): State<AppState>,
    admin: RequireAdmin,
    Path(id): Path<ProductId>,
) -> Result<Json<serde_json::Value>> {
    if state.storage().delete_product(id).await? {
        tracing::info!(product_id = %id, "product deleted");
        Ok(Json(json!({ "message": "Product deleted" })))
    } else {
        Err(AppError::NotFound("Product".to_string()))
    }
}
