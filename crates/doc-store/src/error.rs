use thiserror::Error;

use crate::DocumentId;

/// Errors that can occur when interacting with the document store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A document with this id already exists in the collection.
    #[error("Duplicate document {id} in collection {collection}")]
    DuplicateId { collection: String, id: DocumentId },

    /// An array update referenced an element that is not present.
    #[error("No element {element} in array {array}")]
    ElementNotFound { array: String, element: String },

    /// A conditional update was rejected because its condition did not hold.
    #[error("Condition failed on {field}: {reason}")]
    ConditionFailed { field: String, reason: String },

    /// The stored document does not have the shape an update expects.
    #[error("Invalid document: {0}")]
    InvalidDocument(String),

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for document store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
