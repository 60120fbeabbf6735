//! Cart aggregate and service.

mod aggregate;
mod service;

pub use aggregate::{Cart, CartLine, ResolvedLine};
pub use service::CartService;
