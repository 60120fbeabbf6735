//! HTTP handlers and the shared state they run against.

pub mod carts;
pub mod orders;
pub mod products;
pub mod system;

use std::str::FromStr;

use doc_store::DocumentStore;
use domain::{CartService, CheckoutService, OrderService, StoreProductCatalog};
use serde::Serialize;

use crate::error::ApiError;

/// Shared application state accessible from all handlers.
pub struct AppState<S: DocumentStore + Clone> {
    pub catalog: StoreProductCatalog<S>,
    pub carts: CartService<S>,
    pub orders: OrderService<S>,
    pub checkout: CheckoutService<S>,
}

/// Response body: `{ "message": ..., "payload": ... }`.
#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    pub message: &'static str,
    pub payload: T,
}

impl<T> Envelope<T> {
    pub fn new(message: &'static str, payload: T) -> Self {
        Self { message, payload }
    }
}

/// Envelope for a page of results.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageEnvelope<T> {
    pub message: &'static str,
    pub payload: T,
    pub total_pages: u64,
    pub current_page: usize,
}

/// Parses a path or query identifier, reporting which one was malformed.
pub(crate) fn parse_param<T: FromStr>(raw: &str, name: &str) -> Result<T, ApiError> {
    raw.parse()
        .map_err(|_| ApiError::BadRequest(format!("invalid {name}: {raw}")))
}
