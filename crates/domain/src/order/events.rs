//! Order events and the outbound event sink.

use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{OrderId, UserId};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{Order, OrderLine};
use crate::Money;

/// Events emitted by the order service after a write succeeds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum OrderEvent {
    /// An order was created.
    OrderPlaced(OrderPlacedData),

    /// A return was accepted.
    OrderReturned(OrderReturnedData),
}

impl OrderEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            OrderEvent::OrderPlaced(_) => "OrderPlaced",
            OrderEvent::OrderReturned(_) => "OrderReturned",
        }
    }

    pub fn order_id(&self) -> OrderId {
        match self {
            OrderEvent::OrderPlaced(data) => data.order_id,
            OrderEvent::OrderReturned(data) => data.order_id,
        }
    }

    pub(crate) fn placed(order: &Order) -> Self {
        OrderEvent::OrderPlaced(OrderPlacedData {
            order_id: order.id(),
            user_id: order.user_id(),
            contact_email: order.contact_email().map(str::to_string),
            lines: order.lines().to_vec(),
            total: order.total_amount(),
            placed_at: order.order_date(),
        })
    }

    pub(crate) fn returned(order: &Order, at: DateTime<Utc>) -> Self {
        OrderEvent::OrderReturned(OrderReturnedData {
            order_id: order.id(),
            user_id: order.user_id(),
            contact_email: order.contact_email().map(str::to_string),
            returned_at: at,
        })
    }
}

/// Data for OrderPlaced event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderPlacedData {
    pub order_id: OrderId,
    pub user_id: UserId,
    /// Where the confirmation goes; None when the buyer left no address.
    pub contact_email: Option<String>,
    pub lines: Vec<OrderLine>,
    pub total: Money,
    pub placed_at: DateTime<Utc>,
}

/// Data for OrderReturned event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderReturnedData {
    pub order_id: OrderId,
    pub user_id: UserId,
    pub contact_email: Option<String>,
    pub returned_at: DateTime<Utc>,
}

/// Errors raised by an event sink.
#[derive(Debug, Error)]
pub enum PublishError {
    #[error("event sink is full")]
    Full,

    #[error("event sink is closed")]
    Closed,

    #[error("publish failed: {0}")]
    Other(String),
}

/// Outbound sink for order events.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, event: OrderEvent) -> Result<(), PublishError>;
}

/// Sink that drops every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopEventPublisher;

#[async_trait]
impl EventPublisher for NoopEventPublisher {
    async fn publish(&self, _event: OrderEvent) -> Result<(), PublishError> {
        Ok(())
    }
}

#[derive(Debug, Default)]
struct InMemoryPublisherState {
    events: Vec<OrderEvent>,
    fail_on_publish: bool,
}

/// Sink that records events, for tests.
#[derive(Debug, Clone, Default)]
pub struct InMemoryEventPublisher {
    state: Arc<Mutex<InMemoryPublisherState>>,
}

impl InMemoryEventPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes subsequent publishes fail.
    pub fn set_fail_on_publish(&self, fail: bool) {
        self.lock().fail_on_publish = fail;
    }

    /// Returns the recorded events.
    pub fn events(&self) -> Vec<OrderEvent> {
        self.lock().events.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, InMemoryPublisherState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl EventPublisher for InMemoryEventPublisher {
    async fn publish(&self, event: OrderEvent) -> Result<(), PublishError> {
        let mut state = self.lock();
        if state.fail_on_publish {
            return Err(PublishError::Other("sink unavailable".to_string()));
        }
        state.events.push(event);
        Ok(())
    }
}
