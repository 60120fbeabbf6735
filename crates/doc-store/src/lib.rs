//! Document store for the storefront order core.
//!
//! Products, carts and orders are stored as JSON documents grouped into
//! collections. Every single-document write is atomic; multi-document
//! transactions are not offered.

pub mod document;
pub mod error;
pub mod memory;
pub mod postgres;
pub mod query;
pub mod store;
pub mod update;

pub use common::DocumentId;
pub use document::Document;
pub use error::{Result, StoreError};
pub use memory::InMemoryDocumentStore;
pub use postgres::PostgresDocumentStore;
pub use query::{Filter, FindQuery};
pub use store::{DocumentStore, DocumentStoreExt};
pub use update::Update;
