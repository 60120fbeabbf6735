//! Cart endpoints for the authenticated user.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use common::{LineId, ProductId};
use doc_store::DocumentStore;
use domain::{Cart, DomainError, Money, Order, ResolvedLine};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{AppState, Envelope, parse_param};
use crate::auth::CurrentUser;
use crate::error::ApiError;
use crate::extract::ApiJson;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddItemBody {
    pub product_id: ProductId,
    pub quantity: u32,
}

#[derive(Debug, Deserialize)]
pub struct UpdateQuantityBody {
    pub quantity: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutBody {
    #[serde(default)]
    pub shipping_info: Value,
    pub email: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatedCart {
    pub cart: Cart,
    pub items_count: u32,
}

#[derive(Debug, Serialize)]
pub struct CartTotal {
    pub total: Money,
    pub display: String,
}

/// GET /cart
#[tracing::instrument(skip(state), fields(user_id = %user.id))]
pub async fn items<S: DocumentStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    user: CurrentUser,
) -> Result<Json<Envelope<Vec<ResolvedLine>>>, ApiError> {
    let items = state.carts.find_items(user.id).await?;
    Ok(Json(Envelope::new("Cart items retrieved successfully", items)))
}

/// POST /cart/items
#[tracing::instrument(skip(state), fields(user_id = %user.id))]
pub async fn add_item<S: DocumentStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    user: CurrentUser,
    ApiJson(body): ApiJson<AddItemBody>,
) -> Result<(StatusCode, Json<Envelope<Cart>>), ApiError> {
    let cart = state
        .carts
        .add_product(user.id, body.product_id, body.quantity)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(Envelope::new("Product added to cart", cart)),
    ))
}

/// PUT /cart/items/{lineId}
#[tracing::instrument(skip(state), fields(user_id = %user.id))]
pub async fn update_item<S: DocumentStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    user: CurrentUser,
    Path(line_id): Path<String>,
    ApiJson(body): ApiJson<UpdateQuantityBody>,
) -> Result<Json<Envelope<UpdatedCart>>, ApiError> {
    let line_id: LineId = parse_param(&line_id, "line id")?;
    let (cart, items_count) = state
        .carts
        .update_line_quantity(user.id, line_id, body.quantity)
        .await?;
    Ok(Json(Envelope::new(
        "Cart updated successfully",
        UpdatedCart { cart, items_count },
    )))
}

/// DELETE /cart/items/{lineId}
#[tracing::instrument(skip(state), fields(user_id = %user.id))]
pub async fn remove_item<S: DocumentStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    user: CurrentUser,
    Path(line_id): Path<String>,
) -> Result<Json<Envelope<Cart>>, ApiError> {
    let line_id: LineId = parse_param(&line_id, "line id")?;
    let cart = state.carts.remove_line(user.id, line_id).await?;
    Ok(Json(Envelope::new("Item removed from cart", cart)))
}

/// GET /cart/total
#[tracing::instrument(skip(state), fields(user_id = %user.id))]
pub async fn total<S: DocumentStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    user: CurrentUser,
) -> Result<Json<Envelope<CartTotal>>, ApiError> {
    let cart = state
        .carts
        .find_cart(user.id)
        .await?
        .ok_or(DomainError::CartNotFound(user.id))?;
    let total = state.carts.total_price(&cart).await;
    Ok(Json(Envelope::new(
        "Cart total calculated",
        CartTotal {
            total,
            display: total.to_string(),
        },
    )))
}

/// POST /cart/checkout
#[tracing::instrument(skip(state, body), fields(user_id = %user.id))]
pub async fn checkout<S: DocumentStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    user: CurrentUser,
    ApiJson(body): ApiJson<CheckoutBody>,
) -> Result<(StatusCode, Json<Envelope<Order>>), ApiError> {
    let order = state
        .checkout
        .checkout(user.id, body.shipping_info, body.email.or(user.email))
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(Envelope::new("Order has been created successfully", order)),
    ))
}
