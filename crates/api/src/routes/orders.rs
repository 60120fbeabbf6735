//! Order endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use common::{OrderId, ProductId, UserId};
use doc_store::DocumentStore;
use domain::{Order, OrderFilter, OrderRequest, OrderStatus, RequestedLine};
use serde::Deserialize;
use serde_json::Value;

use super::{AppState, Envelope, PageEnvelope, parse_param};
use crate::auth::CurrentUser;
use crate::error::ApiError;
use crate::extract::{ApiJson, ApiQuery};

// -- Request types --

/// Query string for `GET /orders`.
///
/// `pageNumber` is accepted as an alias of `page`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListOrdersQuery {
    pub page: Option<usize>,
    pub page_number: Option<usize>,
    pub limit: Option<usize>,
    pub user: Option<String>,
    pub status: Option<String>,
}

impl ListOrdersQuery {
    fn into_filter(self) -> Result<OrderFilter, ApiError> {
        let user = self
            .user
            .as_deref()
            .map(|raw| parse_param::<UserId>(raw, "user"))
            .transpose()?;
        let status = self
            .status
            .as_deref()
            .map(|raw| parse_param::<OrderStatus>(raw, "status"))
            .transpose()?;

        Ok(OrderFilter {
            page: self.page.or(self.page_number),
            limit: self.limit,
            user,
            status,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemBody {
    pub product_id: ProductId,
    pub quantity: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderBody {
    pub items: Vec<OrderItemBody>,
    #[serde(default)]
    pub shipping_info: Value,
    pub order_status: Option<OrderStatus>,
    pub order_date: Option<DateTime<Utc>>,
    pub email: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStatusBody {
    pub order_status: OrderStatus,
}

// -- Handlers --

/// GET /orders
#[tracing::instrument(skip(state))]
pub async fn list<S: DocumentStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    ApiQuery(query): ApiQuery<ListOrdersQuery>,
) -> Result<Json<PageEnvelope<Vec<Order>>>, ApiError> {
    let page = state.orders.find_all(query.into_filter()?).await?;

    Ok(Json(PageEnvelope {
        message: "Orders retrieved successfully",
        payload: page.orders,
        total_pages: page.total_pages,
        current_page: page.current_page,
    }))
}

/// POST /orders
#[tracing::instrument(skip(state, body), fields(user_id = %user.id))]
pub async fn create<S: DocumentStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    user: CurrentUser,
    ApiJson(body): ApiJson<CreateOrderBody>,
) -> Result<(StatusCode, Json<Envelope<Order>>), ApiError> {
    let request = OrderRequest {
        user_id: user.id,
        order_date: body.order_date,
        lines: body
            .items
            .into_iter()
            .map(|item| RequestedLine {
                product_id: item.product_id,
                quantity: item.quantity,
            })
            .collect(),
        shipping_info: body.shipping_info,
        status: body.order_status,
        contact_email: body.email.or(user.email),
    };

    let order = state.orders.create_from_request(request).await?;
    Ok((
        StatusCode::CREATED,
        Json(Envelope::new("Order has been created successfully", order)),
    ))
}

/// GET /orders/history
#[tracing::instrument(skip(state), fields(user_id = %user.id))]
pub async fn history<S: DocumentStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    user: CurrentUser,
) -> Result<Json<Envelope<Vec<Order>>>, ApiError> {
    let orders = state.orders.history(user.id).await?;
    Ok(Json(Envelope::new("Order history retrieved successfully", orders)))
}

/// GET /orders/{id}
#[tracing::instrument(skip(state))]
pub async fn get<S: DocumentStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<Envelope<Order>>, ApiError> {
    let order_id: OrderId = parse_param(&id, "order id")?;
    let order = state.orders.find_by_id(order_id).await?;
    Ok(Json(Envelope::new("Order retrieved successfully", order)))
}

/// PUT /orders/{id}
#[tracing::instrument(skip(state))]
pub async fn update_status<S: DocumentStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<UpdateStatusBody>,
) -> Result<Json<Envelope<Order>>, ApiError> {
    let order_id: OrderId = parse_param(&id, "order id")?;
    let order = state.orders.set_status(order_id, body.order_status).await?;
    Ok(Json(Envelope::new("Order status updated successfully", order)))
}

/// DELETE /orders/{id}
#[tracing::instrument(skip(state))]
pub async fn remove<S: DocumentStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<Envelope<Order>>, ApiError> {
    let order_id: OrderId = parse_param(&id, "order id")?;
    let order = state.orders.remove(order_id).await?;
    Ok(Json(Envelope::new("Order has been deleted successfully", order)))
}

/// POST /orders/{id}/return
#[tracing::instrument(skip(state))]
pub async fn request_return<S: DocumentStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<Envelope<Order>>, ApiError> {
    let order_id: OrderId = parse_param(&id, "order id")?;
    let order = state.orders.request_return(order_id).await?;
    Ok(Json(Envelope::new("Order has been returned successfully", order)))
}
