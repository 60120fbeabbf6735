//! Checkout: turning a cart into an order.
//!
//! Checkout runs as a short saga. Stock is validated for every line before
//! anything is written; stock is then decremented line by line and, should a
//! later step fail, the lines already decremented are restocked in reverse
//! order. Only the purchased quantities leave the cart, so items added while
//! checkout runs stay there.

use std::sync::Arc;
use std::time::Instant;

use common::{LineId, ProductId, UserId};
use doc_store::DocumentStore;
use futures_util::future::try_join_all;
use serde_json::Value;

use crate::{
    CartService, DomainError, NewOrder, Order, OrderLine, OrderService, ProductCatalog, Result,
    StockLedger,
};

/// Coordinates the cart, stock ledger and order service at checkout.
#[derive(Clone)]
pub struct CheckoutService<S: DocumentStore + Clone> {
    carts: CartService<S>,
    orders: OrderService<S>,
    ledger: StockLedger<S>,
    catalog: Arc<dyn ProductCatalog>,
}

impl<S: DocumentStore + Clone> CheckoutService<S> {
    pub fn new(
        carts: CartService<S>,
        orders: OrderService<S>,
        ledger: StockLedger<S>,
        catalog: Arc<dyn ProductCatalog>,
    ) -> Self {
        Self {
            carts,
            orders,
            ledger,
            catalog,
        }
    }

    /// Places an order for everything in the user's cart.
    ///
    /// On success the purchased lines are taken out of the cart; the cart
    /// itself is kept.
    #[tracing::instrument(skip(self, shipping_info, contact_email))]
    pub async fn checkout(
        &self,
        user_id: UserId,
        shipping_info: Value,
        contact_email: Option<String>,
    ) -> Result<Order> {
        let started = Instant::now();

        let cart = self
            .carts
            .find_cart(user_id)
            .await?
            .ok_or(DomainError::CartNotFound(user_id))?;
        if cart.is_empty() {
            return Err(DomainError::Validation("cart is empty".to_string()));
        }
        let purchased: Vec<(LineId, u32)> =
            cart.lines().iter().map(|l| (l.id, l.quantity)).collect();

        // 1. Resolve and validate every line; nothing is written yet
        let lookups = cart.lines().iter().map(|line| async move {
            let product = self
                .catalog
                .product(line.product_id)
                .await?
                .ok_or(DomainError::ProductNotFound(line.product_id))?;
            self.ledger.validate(&product, line.quantity)?;
            Ok::<_, DomainError>(OrderLine {
                product_id: product.id,
                product_name: product.name,
                quantity: line.quantity,
                unit_price: product.price,
            })
        });
        let lines = try_join_all(lookups).await?;

        // 2. Decrement stock
        let mut decremented: Vec<(ProductId, u32)> = Vec::with_capacity(lines.len());
        for line in &lines {
            match self.ledger.decrement(line.product_id, line.quantity).await {
                Ok(amount) => decremented.push((line.product_id, amount)),
                Err(e) => {
                    self.restock(&decremented).await;
                    return Err(e);
                }
            }
        }

        // 3. Create the order
        let order = match self
            .orders
            .create(NewOrder {
                user_id,
                order_date: None,
                lines,
                shipping_info,
                status: None,
                contact_email,
            })
            .await
        {
            Ok(order) => order,
            Err(e) => {
                self.restock(&decremented).await;
                return Err(e);
            }
        };

        // 4. Take the purchased lines out of the cart
        if let Err(e) = self.carts.remove_purchased(&cart, &purchased).await {
            tracing::error!(
                order_id = %order.id(),
                error = %e,
                "order placed but purchased lines left in cart"
            );
        }

        let duration = started.elapsed().as_secs_f64();
        metrics::histogram!("checkout_duration_seconds").record(duration);
        tracing::info!(order_id = %order.id(), duration, "checkout completed");
        Ok(order)
    }

    /// Puts back stock taken by a failed checkout, newest first.
    async fn restock(&self, decremented: &[(ProductId, u32)]) {
        for (product_id, amount) in decremented.iter().rev() {
            if let Err(e) = self.ledger.restock(*product_id, *amount).await {
                tracing::error!(
                    %product_id,
                    amount,
                    error = %e,
                    "failed to restock after checkout failure"
                );
            }
        }
    }
}
