//! Cart service: lookups and atomic line mutations.

use std::sync::Arc;

use common::{LineId, ProductId, UserId};
use doc_store::{Document, DocumentStore, DocumentStoreExt, Filter, StoreError, Update};
use futures_util::future::join_all;
use serde_json::Value;

use crate::collections::CARTS;
use crate::{
    Cart, CartLine, DomainError, Money, Product, ProductCatalog, ResolvedLine, Result, StockLedger,
    StockPolicy,
};

const LINES: &str = "lines";

/// Service for managing carts.
///
/// Every line mutation is a single atomic update on the cart document, so
/// concurrent adds for the same product never lose quantity.
#[derive(Clone)]
pub struct CartService<S: DocumentStore + Clone> {
    store: S,
    catalog: Arc<dyn ProductCatalog>,
    ledger: StockLedger<S>,
}

impl<S: DocumentStore + Clone> CartService<S> {
    pub fn new(store: S, catalog: Arc<dyn ProductCatalog>) -> Self {
        let ledger = StockLedger::new(store.clone(), StockPolicy::default());
        Self {
            store,
            catalog,
            ledger,
        }
    }

    /// Returns the user's cart, creating an empty one if none exists.
    ///
    /// Concurrent calls for the same user yield the same cart.
    #[tracing::instrument(skip(self))]
    pub async fn get_or_create(&self, user_id: UserId) -> Result<Cart> {
        let cart = Cart::empty(user_id);
        let body = serde_json::to_value(&cart)?;
        let doc = self
            .store
            .find_or_insert(CARTS, &user_filter(user_id), cart.id().into(), body)
            .await?;
        Ok(doc.into_decoded()?)
    }

    /// Returns the user's cart if one exists.
    pub async fn find_cart(&self, user_id: UserId) -> Result<Option<Cart>> {
        let doc = self.store.find_one(CARTS, user_filter(user_id)).await?;
        Ok(doc.map(Document::into_decoded).transpose()?)
    }

    /// Adds `quantity` of a product to the cart.
    ///
    /// A line for the same product is merged by summing quantities. Callers
    /// validate stock first; see [`CartService::add_product`].
    #[tracing::instrument(
        skip(self, cart, product),
        fields(cart_id = %cart.id(), product_id = %product.id)
    )]
    pub async fn add_item(&self, cart: &Cart, product: &Product, quantity: u32) -> Result<Cart> {
        let line = CartLine::new(product.id, quantity);
        let update = Update::IncrementElementOrPush {
            array: LINES.to_string(),
            match_field: "product_id".to_string(),
            match_value: Value::String(product.id.to_string()),
            field: "quantity".to_string(),
            by: i64::from(quantity),
            element: serde_json::to_value(&line)?,
        };

        let doc = self
            .store
            .update(CARTS, cart.id().into(), update)
            .await?
            .ok_or(DomainError::CartNotFound(cart.user_id()))?;

        metrics::counter!("cart_items_added_total").increment(u64::from(quantity));
        tracing::debug!(quantity, "item added to cart");
        Ok(doc.into_decoded()?)
    }

    /// Looks up a product, checks its stock and adds it to the user's cart.
    #[tracing::instrument(skip(self))]
    pub async fn add_product(
        &self,
        user_id: UserId,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<Cart> {
        if quantity == 0 {
            return Err(DomainError::Validation(
                "quantity must be greater than 0".to_string(),
            ));
        }

        let product = self
            .catalog
            .product(product_id)
            .await?
            .ok_or(DomainError::ProductNotFound(product_id))?;

        let cart = self.get_or_create(user_id).await?;
        let already_in_cart = cart
            .line_for_product(product_id)
            .map(|l| l.quantity)
            .unwrap_or(0);
        self.ledger
            .validate(&product, already_in_cart.saturating_add(quantity))?;

        self.add_item(&cart, &product, quantity).await
    }

    /// Sums `price * quantity` over the cart's lines at current prices.
    ///
    /// Lookups run concurrently. A line whose product lookup fails or finds
    /// nothing contributes zero.
    #[tracing::instrument(skip(self, cart), fields(cart_id = %cart.id()))]
    pub async fn total_price(&self, cart: &Cart) -> Money {
        let lookups = cart.lines().iter().map(|line| async move {
            match self.catalog.product(line.product_id).await {
                Ok(Some(product)) => product.price.multiply(line.quantity),
                Ok(None) => {
                    tracing::warn!(
                        product_id = %line.product_id,
                        "product missing, line priced at zero"
                    );
                    Money::zero()
                }
                Err(e) => {
                    tracing::warn!(
                        product_id = %line.product_id,
                        error = %e,
                        "price lookup failed, line priced at zero"
                    );
                    Money::zero()
                }
            }
        });

        join_all(lookups).await.into_iter().sum()
    }

    /// Sets the quantity of one line. Returns the cart and its new item count.
    #[tracing::instrument(skip(self))]
    pub async fn update_line_quantity(
        &self,
        user_id: UserId,
        line_id: LineId,
        quantity: u32,
    ) -> Result<(Cart, u32)> {
        if quantity == 0 {
            return Err(DomainError::Validation(
                "quantity must be greater than 0".to_string(),
            ));
        }

        let update = Update::SetElementField {
            array: LINES.to_string(),
            element_id: Value::String(line_id.to_string()),
            field: "quantity".to_string(),
            value: Value::from(quantity),
        };
        let cart = self.update_line(user_id, line_id, update).await?;
        let count = cart.item_count();
        Ok((cart, count))
    }

    /// Removes one line from the user's cart.
    #[tracing::instrument(skip(self))]
    pub async fn remove_line(&self, user_id: UserId, line_id: LineId) -> Result<Cart> {
        let update = Update::RemoveElement {
            array: LINES.to_string(),
            element_id: Value::String(line_id.to_string()),
        };
        self.update_line(user_id, line_id, update).await
    }

    /// Returns the cart's lines joined with current product details.
    #[tracing::instrument(skip(self))]
    pub async fn find_items(&self, user_id: UserId) -> Result<Vec<ResolvedLine>> {
        let cart = self
            .find_cart(user_id)
            .await?
            .ok_or(DomainError::CartNotFound(user_id))?;

        let lookups = cart.lines().iter().map(|line| async move {
            let product = self.catalog.product(line.product_id).await?;
            Ok::<_, DomainError>(ResolvedLine {
                line_id: line.id,
                product,
                quantity: line.quantity,
            })
        });

        join_all(lookups).await.into_iter().collect()
    }

    /// Takes purchased quantities out of the cart.
    ///
    /// Each `(line, quantity)` pair lowers that line by `quantity` and drops
    /// it at zero, in one atomic update. Quantity added after the purchase
    /// was read stays in the cart; lines removed meanwhile are skipped.
    #[tracing::instrument(skip(self, cart, purchased), fields(cart_id = %cart.id()))]
    pub async fn remove_purchased(&self, cart: &Cart, purchased: &[(LineId, u32)]) -> Result<Cart> {
        let update = Update::Many(
            purchased
                .iter()
                .map(|(line_id, quantity)| Update::DecrementElementOrRemove {
                    array: LINES.to_string(),
                    element_id: Value::String(line_id.to_string()),
                    field: "quantity".to_string(),
                    by: i64::from(*quantity),
                })
                .collect(),
        );
        let doc = self
            .store
            .update(CARTS, cart.id().into(), update)
            .await?
            .ok_or(DomainError::CartNotFound(cart.user_id()))?;
        Ok(doc.into_decoded()?)
    }

    async fn update_line(&self, user_id: UserId, line_id: LineId, update: Update) -> Result<Cart> {
        let not_found = || DomainError::CartOrItemNotFound { user_id, line_id };

        let cart = self.find_cart(user_id).await?.ok_or_else(not_found)?;
        match self.store.update(CARTS, cart.id().into(), update).await {
            Ok(Some(doc)) => Ok(doc.into_decoded()?),
            Ok(None) | Err(StoreError::ElementNotFound { .. }) => Err(not_found()),
            Err(e) => Err(e.into()),
        }
    }
}

fn user_filter(user_id: UserId) -> Filter {
    Filter::new().eq("user_id", user_id.to_string())
}
