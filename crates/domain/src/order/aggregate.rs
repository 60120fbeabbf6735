//! Order aggregate.

use chrono::{DateTime, Duration, Utc};
use common::{OrderId, ProductId, UserId};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{OrderError, OrderStatus};
use crate::{DomainError, Money, Result};

/// A purchased line, copied from the product at purchase time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    pub product_id: ProductId,
    pub product_name: String,
    pub quantity: u32,
    pub unit_price: Money,
}

impl OrderLine {
    pub fn subtotal(&self) -> Money {
        self.unit_price.multiply(self.quantity)
    }
}

/// One applied status change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusChange {
    pub from: OrderStatus,
    pub to: OrderStatus,
    pub at: DateTime<Utc>,
}

/// Return window and related order rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderPolicy {
    /// How long after the order date a return is honored.
    pub return_window: Duration,
}

impl OrderPolicy {
    pub fn with_return_window_days(days: u32) -> Self {
        Self {
            return_window: Duration::try_days(i64::from(days)).unwrap_or(Duration::MAX),
        }
    }
}

impl Default for OrderPolicy {
    fn default() -> Self {
        Self::with_return_window_days(7)
    }
}

/// Data for creating an order from already-resolved lines.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub user_id: UserId,
    /// Defaults to now.
    pub order_date: Option<DateTime<Utc>>,
    pub lines: Vec<OrderLine>,
    pub shipping_info: Value,
    /// Defaults to `Pending`.
    pub status: Option<OrderStatus>,
    pub contact_email: Option<String>,
}

/// A requested line, before product details are resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestedLine {
    pub product_id: ProductId,
    pub quantity: u32,
}

/// An order-request payload naming products by id.
#[derive(Debug, Clone)]
pub struct OrderRequest {
    pub user_id: UserId,
    pub order_date: Option<DateTime<Utc>>,
    pub lines: Vec<RequestedLine>,
    pub shipping_info: Value,
    pub status: Option<OrderStatus>,
    pub contact_email: Option<String>,
}

/// A placed order.
///
/// Everything but the status is fixed at creation. Status changes are
/// recorded in `status_history`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    id: OrderId,
    user_id: UserId,
    order_date: DateTime<Utc>,
    lines: Vec<OrderLine>,
    shipping_info: Value,
    status: OrderStatus,
    #[serde(default)]
    status_history: Vec<StatusChange>,
    #[serde(default)]
    contact_email: Option<String>,
}

impl Order {
    /// Builds an order from a payload, validating its lines.
    pub fn place(new: NewOrder, now: DateTime<Utc>) -> Result<Self> {
        if new.lines.is_empty() {
            return Err(DomainError::Validation(
                "an order needs at least one line".to_string(),
            ));
        }
        if let Some(line) = new.lines.iter().find(|l| l.quantity == 0) {
            return Err(DomainError::Validation(format!(
                "quantity for product {} must be greater than 0",
                line.product_id
            )));
        }
        if let Some(line) = new.lines.iter().find(|l| l.unit_price.is_negative()) {
            return Err(DomainError::Validation(format!(
                "price for product {} must not be negative",
                line.product_id
            )));
        }

        Ok(Self {
            id: OrderId::new(),
            user_id: new.user_id,
            order_date: new.order_date.unwrap_or(now),
            lines: new.lines,
            shipping_info: new.shipping_info,
            status: new.status.unwrap_or_default(),
            status_history: Vec::new(),
            contact_email: new.contact_email,
        })
    }

    pub fn id(&self) -> OrderId {
        self.id
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn order_date(&self) -> DateTime<Utc> {
        self.order_date
    }

    pub fn lines(&self) -> &[OrderLine] {
        &self.lines
    }

    pub fn shipping_info(&self) -> &Value {
        &self.shipping_info
    }

    pub fn status(&self) -> OrderStatus {
        self.status
    }

    pub fn status_history(&self) -> &[StatusChange] {
        &self.status_history
    }

    pub fn contact_email(&self) -> Option<&str> {
        self.contact_email.as_deref()
    }

    pub fn total_amount(&self) -> Money {
        self.lines.iter().map(OrderLine::subtotal).sum()
    }

    /// Last moment a return is honored.
    ///
    /// None when the deadline lies beyond the representable date range, in
    /// which case the window never closes.
    pub fn return_deadline(&self, policy: &OrderPolicy) -> Option<DateTime<Utc>> {
        self.order_date.checked_add_signed(policy.return_window)
    }

    /// Checks whether a return may be requested at `now`.
    ///
    /// The order must be exactly `Delivered`, and `now` must not be after
    /// the return deadline.
    pub fn check_return(
        &self,
        now: DateTime<Utc>,
        policy: &OrderPolicy,
    ) -> std::result::Result<(), OrderError> {
        if self.status != OrderStatus::Delivered {
            return Err(OrderError::NotDelivered {
                order_id: self.id,
                status: self.status,
            });
        }

        if let Some(deadline) = self.return_deadline(policy)
            && now > deadline
        {
            return Err(OrderError::ReturnWindowExpired {
                order_id: self.id,
                deadline,
            });
        }

        Ok(())
    }
}
