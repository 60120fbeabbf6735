//! Product lookup.
//!
//! Products are owned by the catalog service; this core only reads their
//! current price and stock, and writes stock through the [`StockLedger`].
//!
//! [`StockLedger`]: crate::StockLedger

use async_trait::async_trait;
use common::ProductId;
use doc_store::{DocumentStore, DocumentStoreExt};
use serde::{Deserialize, Serialize};

use crate::collections::PRODUCTS;
use crate::{DomainError, Money, Result};

/// A catalog product as seen by the order core.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub price: Money,
    pub quantity_in_stock: u32,
}

/// Data for registering a product.
#[derive(Debug, Clone, Deserialize)]
pub struct NewProduct {
    pub name: String,
    pub price: Money,
    pub quantity_in_stock: u32,
}

/// Looks up products by id.
#[async_trait]
pub trait ProductCatalog: Send + Sync {
    /// Returns the product's current state, or None if it doesn't exist.
    async fn product(&self, id: ProductId) -> Result<Option<Product>>;
}

/// Catalog reading products from the document store.
#[derive(Clone)]
pub struct StoreProductCatalog<S: DocumentStore> {
    store: S,
}

impl<S: DocumentStore> StoreProductCatalog<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Registers a product.
    #[tracing::instrument(skip(self, new), fields(name = %new.name))]
    pub async fn register(&self, new: NewProduct) -> Result<Product> {
        if new.name.trim().is_empty() {
            return Err(DomainError::Validation(
                "product name is required".to_string(),
            ));
        }
        if new.price.is_negative() {
            return Err(DomainError::Validation(
                "product price must not be negative".to_string(),
            ));
        }

        let product = Product {
            id: ProductId::new(),
            name: new.name,
            price: new.price,
            quantity_in_stock: new.quantity_in_stock,
        };
        self.store
            .insert_value(PRODUCTS, product.id.into(), &product)
            .await?;

        tracing::info!(product_id = %product.id, "product registered");
        Ok(product)
    }
}

#[async_trait]
impl<S: DocumentStore> ProductCatalog for StoreProductCatalog<S> {
    async fn product(&self, id: ProductId) -> Result<Option<Product>> {
        Ok(self.store.get_value(PRODUCTS, id.into()).await?)
    }
}
