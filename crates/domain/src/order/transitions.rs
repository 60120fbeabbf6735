//! Order status transition table.

use std::collections::HashMap;

use super::{OrderError, OrderStatus};

/// Whether a status change is permitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionRule {
    Allow,
    Deny,
}

/// Map of (from, to) status pairs to allow/deny rules.
///
/// Pairs without an explicit entry fall back to the table's default rule.
/// The permissive table allows every change; tighten it with [`deny`], or
/// start from [`lifecycle`] which only allows forward moves.
///
/// [`deny`]: TransitionTable::deny
/// [`lifecycle`]: TransitionTable::lifecycle
#[derive(Debug, Clone)]
pub struct TransitionTable {
    rules: HashMap<(OrderStatus, OrderStatus), TransitionRule>,
    fallback: TransitionRule,
}

impl TransitionTable {
    /// A table allowing every status change.
    pub fn permissive() -> Self {
        Self {
            rules: HashMap::new(),
            fallback: TransitionRule::Allow,
        }
    }

    /// A table allowing only the forward lifecycle.
    pub fn lifecycle() -> Self {
        use OrderStatus::*;

        Self {
            rules: HashMap::new(),
            fallback: TransitionRule::Deny,
        }
        .allow(Pending, Processing)
        .allow(Processing, Shipped)
        .allow(Shipped, Delivered)
        .allow(Delivered, Returned)
        .allow(Delivered, PartiallyReturned)
        .allow(PartiallyReturned, Returned)
    }

    pub fn allow(mut self, from: OrderStatus, to: OrderStatus) -> Self {
        self.rules.insert((from, to), TransitionRule::Allow);
        self
    }

    pub fn deny(mut self, from: OrderStatus, to: OrderStatus) -> Self {
        self.rules.insert((from, to), TransitionRule::Deny);
        self
    }

    pub fn rule(&self, from: OrderStatus, to: OrderStatus) -> TransitionRule {
        self.rules
            .get(&(from, to))
            .copied()
            .unwrap_or(self.fallback)
    }

    /// Fails with `TransitionDenied` unless the change is allowed.
    pub fn check(&self, from: OrderStatus, to: OrderStatus) -> Result<(), OrderError> {
        match self.rule(from, to) {
            TransitionRule::Allow => Ok(()),
            TransitionRule::Deny => Err(OrderError::TransitionDenied { from, to }),
        }
    }
}

impl Default for TransitionTable {
    fn default() -> Self {
        Self::permissive()
    }
}
