//! Cart handlers. Every route acts on the caller's own cart.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::Deserialize;
use serde_json::json;

use bramble_core::cart::{self, CartContents};
use bramble_core::models::CartItem;
use bramble_core::{CartItemId, ProductId};

use crate::error::{ApiJson, Result, add_breadcrumb};
use crate::middleware::RequireUser;
use crate::state::AppState;

const fn default_quantity() -> i32 {
    1
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddItemRequest {
    pub product_id: ProductId,
    #[serde(default = "default_quantity")]
    pub quantity: i32,
}

#[derive(Debug, Deserialize)]
pub struct UpdateItemRequest {
    pub quantity: i32,
}

/// The caller's cart and its lines, created on first access.
pub async fn show(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
) -> Result<Json<CartContents>> {
    Ok(Json(cart::load(state.storage(), user.id).await?))
}

/// Add a product, merging into an existing line for the same product.
///
/// Responds 201 for a new line and 200 when an existing line grew.
pub async fn add_item(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    ApiJson(body): ApiJson<AddItemRequest>,
) -> Result<(StatusCode, Json<CartItem>)> {
    let merged = cart::add_to_cart(state.storage(), user.id, body.product_id, body.quantity).await?;

    add_breadcrumb(
        "cart",
        "Added to cart",
        &[
            ("product_id", body.product_id.to_string()),
            ("quantity", body.quantity.to_string()),
        ],
    );

    let status = if merged.created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(merged.item)))
}

pub async fn update_item(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Path(id): Path<CartItemId>,
    ApiJson(body): ApiJson<UpdateItemRequest>,
) -> Result<Json<CartItem>> {
    let item = cart::update_quantity(state.storage(), user.id, id, body.quantity).await?;
    Ok(Json(item))
}

pub async fn remove_item(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Path(id): Path<CartItemId>,
) -> Result<Json<serde_json::Value>> {
    cart::remove_item(state.storage(), user.id, id).await?;
    Ok(Json(json!({ "message": "Item removed from cart" })))
}
