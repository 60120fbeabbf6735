//! Domain layer for the storefront order core.
//!
//! This crate provides:
//! - Product catalog lookup and the stock ledger
//! - Cart aggregate with atomic line mutations
//! - Order aggregate with its status state machine and return window
//! - Checkout, turning a cart into an order
//! - Order events published to an outbound sink

pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod clock;
pub mod collections;
pub mod error;
pub mod money;
pub mod order;
pub mod stock;

pub use cart::{Cart, CartLine, CartService, ResolvedLine};
pub use catalog::{NewProduct, Product, ProductCatalog, StoreProductCatalog};
pub use checkout::CheckoutService;
pub use clock::{Clock, FixedClock, SystemClock};
pub use error::{DomainError, Result};
pub use money::Money;
pub use order::{
    EventPublisher, InMemoryEventPublisher, NewOrder, NoopEventPublisher, Order, OrderError,
    OrderEvent, OrderFilter, OrderLine, OrderPage, OrderPlacedData, OrderPolicy, OrderRequest,
    OrderReturnedData, OrderService, OrderStatus, ParseStatusError, PublishError, RequestedLine,
    StatusChange, TransitionRule, TransitionTable,
};
pub use stock::{StockLedger, StockPolicy};
