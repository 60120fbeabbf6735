//! Product registration and lookup.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use common::ProductId;
use doc_store::DocumentStore;
use domain::{DomainError, Money, NewProduct, Product, ProductCatalog};
use serde::Deserialize;

use super::{AppState, Envelope, parse_param};
use crate::error::ApiError;
use crate::extract::ApiJson;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProductBody {
    pub name: String,
    pub price_cents: i64,
    pub quantity_in_stock: u32,
}

/// POST /products
#[tracing::instrument(skip(state, body), fields(name = %body.name))]
pub async fn create<S: DocumentStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    ApiJson(body): ApiJson<CreateProductBody>,
) -> Result<(StatusCode, Json<Envelope<Product>>), ApiError> {
    let product = state
        .catalog
        .register(NewProduct {
            name: body.name,
            price: Money::from_cents(body.price_cents),
            quantity_in_stock: body.quantity_in_stock,
        })
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(Envelope::new("Product has been created successfully", product)),
    ))
}

/// GET /products/{id}
#[tracing::instrument(skip(state))]
pub async fn get<S: DocumentStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<Envelope<Product>>, ApiError> {
    let product_id: ProductId = parse_param(&id, "product id")?;
    let product = state
        .catalog
        .product(product_id)
        .await?
        .ok_or(DomainError::ProductNotFound(product_id))?;
    Ok(Json(Envelope::new("Product retrieved successfully", product)))
}
