//! Order status.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The status of an order in its lifecycle.
///
/// The usual progression:
/// ```text
/// Pending ──► Processing ──► Shipped ──► Delivered ──┬──► Returned
///                                                    └──► Partially Returned
/// ```
/// Which moves are actually permitted is decided by the
/// [`TransitionTable`](super::TransitionTable).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum OrderStatus {
    #[default]
    Pending,
    Processing,
    Shipped,
    Delivered,
    Returned,
    #[serde(rename = "Partially Returned")]
    PartiallyReturned,
}

impl OrderStatus {
    /// Every status, in lifecycle order.
    pub fn all() -> [OrderStatus; 6] {
        [
            OrderStatus::Pending,
            OrderStatus::Processing,
            OrderStatus::Shipped,
            OrderStatus::Delivered,
            OrderStatus::Returned,
            OrderStatus::PartiallyReturned,
        ]
    }

    /// Display name, identical to the serialized form.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "Pending",
            OrderStatus::Processing => "Processing",
            OrderStatus::Shipped => "Shipped",
            OrderStatus::Delivered => "Delivered",
            OrderStatus::Returned => "Returned",
            OrderStatus::PartiallyReturned => "Partially Returned",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a string names no order status.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown order status: {0}")]
pub struct ParseStatusError(pub String);

impl FromStr for OrderStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        OrderStatus::all()
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s))
            .or_else(|| {
                s.eq_ignore_ascii_case("PartiallyReturned")
                    .then_some(OrderStatus::PartiallyReturned)
            })
            .ok_or_else(|| ParseStatusError(s.to_string()))
    }
}
