//! Domain error types.

use common::{LineId, OrderId, ProductId, UserId};
use doc_store::StoreError;
use thiserror::Error;

use crate::order::OrderError;

/// Errors that can occur during domain operations.
#[derive(Debug, Error)]
pub enum DomainError {
    /// No product with this id.
    #[error("Product not found: {0}")]
    ProductNotFound(ProductId),

    /// No order with this id.
    #[error("Order not found with the ID: {0}")]
    OrderNotFound(OrderId),

    /// The user has no cart.
    #[error("Cart not found with userId: {0}")]
    CartNotFound(UserId),

    /// The user has no cart, or the cart has no such line.
    #[error("Cart or item not found: line {line_id} for user {user_id}")]
    CartOrItemNotFound { user_id: UserId, line_id: LineId },

    /// The product has no stock left.
    #[error("Product {product_id} is currently out of stock")]
    OutOfStock { product_id: ProductId },

    /// The requested quantity exceeds the available stock.
    #[error(
        "Quantity requested ({requested}) exceeds quantity available in stock ({available}) for product {product_id}"
    )]
    InsufficientStock {
        product_id: ProductId,
        requested: u32,
        available: u32,
    },

    /// An error in the order state machine.
    #[error("Order error: {0}")]
    Order(#[from] OrderError),

    /// The request payload is malformed.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// The document store failed.
    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl DomainError {
    /// Returns true for the not-found family of errors.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            DomainError::ProductNotFound(_)
                | DomainError::OrderNotFound(_)
                | DomainError::CartNotFound(_)
                | DomainError::CartOrItemNotFound { .. }
        )
    }
}

/// Result type for domain operations.
pub type Result<T> = std::result::Result<T, DomainError>;
