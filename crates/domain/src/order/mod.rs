//! Order aggregate, status state machine and order events.

mod aggregate;
mod events;
mod service;
mod state;
mod transitions;

pub use aggregate::{
    NewOrder, Order, OrderLine, OrderPolicy, OrderRequest, RequestedLine, StatusChange,
};
pub use events::{
    EventPublisher, InMemoryEventPublisher, NoopEventPublisher, OrderEvent, OrderPlacedData,
    OrderReturnedData, PublishError,
};
pub use service::{OrderFilter, OrderPage, OrderService};
pub use state::{OrderStatus, ParseStatusError};
pub use transitions::{TransitionRule, TransitionTable};

use chrono::{DateTime, Utc};
use common::OrderId;
use thiserror::Error;

/// Errors raised by the order status state machine.
#[derive(Debug, Error)]
pub enum OrderError {
    /// Returns are only accepted for delivered orders.
    #[error("Order {order_id} cannot be returned: status is {status}, not Delivered")]
    NotDelivered {
        order_id: OrderId,
        status: OrderStatus,
    },

    /// The return window has closed.
    #[error("Return period has expired for order {order_id} (deadline was {deadline})")]
    ReturnWindowExpired {
        order_id: OrderId,
        deadline: DateTime<Utc>,
    },

    /// The transition table denies this status change.
    #[error("Transition from {from} to {to} is not allowed")]
    TransitionDenied { from: OrderStatus, to: OrderStatus },

    /// The status changed between read and write.
    #[error("Order {order_id} status was changed concurrently")]
    ConcurrentStatusChange { order_id: OrderId },
}
