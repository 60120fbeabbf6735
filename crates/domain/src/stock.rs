//! Stock ledger: availability checks and purchase decrements.

use common::ProductId;
use doc_store::{DocumentStore, StoreError, Update};

use crate::collections::PRODUCTS;
use crate::{DomainError, Product, Result};

const STOCK_FIELD: &str = "quantity_in_stock";

/// How much stock a purchase consumes.
///
/// Each decrement removes `purchased + reserve_margin` units. A margin of 1
/// reproduces the storefront's historical behavior of taking one extra unit
/// per purchase.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StockPolicy {
    pub reserve_margin: u32,
}

impl StockPolicy {
    pub fn with_reserve_margin(reserve_margin: u32) -> Self {
        Self { reserve_margin }
    }

    /// Units removed from stock when `purchased` units are bought.
    pub fn decrement_amount(&self, purchased: u32) -> u32 {
        purchased.saturating_add(self.reserve_margin)
    }
}

/// Authority for available-quantity checks and decrements.
#[derive(Clone)]
pub struct StockLedger<S: DocumentStore> {
    store: S,
    policy: StockPolicy,
}

impl<S: DocumentStore> StockLedger<S> {
    pub fn new(store: S, policy: StockPolicy) -> Self {
        Self { store, policy }
    }

    pub fn policy(&self) -> StockPolicy {
        self.policy
    }

    /// Checks that `requested` units of `product` are available.
    ///
    /// Has no side effects.
    pub fn validate(&self, product: &Product, requested: u32) -> Result<()> {
        if product.quantity_in_stock == 0 {
            return Err(DomainError::OutOfStock {
                product_id: product.id,
            });
        }
        if requested > product.quantity_in_stock {
            return Err(DomainError::InsufficientStock {
                product_id: product.id,
                requested,
                available: product.quantity_in_stock,
            });
        }
        Ok(())
    }

    /// Removes stock for a purchase of `purchased` units.
    ///
    /// The decrement is a single conditional update: it fails with
    /// `InsufficientStock` instead of taking stock below zero. Returns the
    /// number of units removed.
    #[tracing::instrument(skip(self))]
    pub async fn decrement(&self, product_id: ProductId, purchased: u32) -> Result<u32> {
        let amount = self.policy.decrement_amount(purchased);
        let update = Update::Increment {
            field: STOCK_FIELD.to_string(),
            by: -i64::from(amount),
            min: Some(0),
        };

        match self.store.update(PRODUCTS, product_id.into(), update).await {
            Ok(Some(_)) => {
                metrics::counter!("stock_decrements_total").increment(1);
                tracing::info!(%product_id, amount, "stock decremented");
                Ok(amount)
            }
            Ok(None) => Err(DomainError::ProductNotFound(product_id)),
            Err(StoreError::ConditionFailed { .. }) => {
                let available = self.available(product_id).await?;
                Err(DomainError::InsufficientStock {
                    product_id,
                    requested: amount,
                    available,
                })
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Puts units back into stock, undoing a decrement.
    #[tracing::instrument(skip(self))]
    pub async fn restock(&self, product_id: ProductId, amount: u32) -> Result<()> {
        let update = Update::Increment {
            field: STOCK_FIELD.to_string(),
            by: i64::from(amount),
            min: None,
        };
        self.store
            .update(PRODUCTS, product_id.into(), update)
            .await?
            .ok_or(DomainError::ProductNotFound(product_id))?;
        Ok(())
    }

    async fn available(&self, product_id: ProductId) -> Result<u32> {
        let doc = self
            .store
            .find_by_id(PRODUCTS, product_id.into())
            .await?
            .ok_or(DomainError::ProductNotFound(product_id))?;
        let product: Product = doc.into_decoded()?;
        Ok(product.quantity_in_stock)
    }
}
