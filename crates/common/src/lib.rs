//! Shared types for the storefront order core.

pub mod types;

pub use types::{CartId, DocumentId, LineId, OrderId, ProductId, UserId};
