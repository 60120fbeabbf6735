use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::{Document, DocumentId, Filter, FindQuery, Result, Update};

/// Core trait for document store implementations.
///
/// All implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Inserts a new document.
    ///
    /// Fails with `DuplicateId` if the id is already used in the collection.
    async fn insert(
        &self,
        collection: &str,
        id: DocumentId,
        body: serde_json::Value,
    ) -> Result<Document>;

    /// Retrieves a document by id.
    async fn find_by_id(&self, collection: &str, id: DocumentId) -> Result<Option<Document>>;

    /// Retrieves documents matching a query, in insertion order.
    async fn find(&self, collection: &str, query: FindQuery) -> Result<Vec<Document>>;

    /// Counts documents matching a filter.
    async fn count(&self, collection: &str, filter: &Filter) -> Result<u64>;

    /// Returns the first document matching `filter`, inserting `body` under
    /// `id` if none matches. The lookup and the insert happen atomically.
    async fn find_or_insert(
        &self,
        collection: &str,
        filter: &Filter,
        id: DocumentId,
        body: serde_json::Value,
    ) -> Result<Document>;

    /// Atomically applies an update to a document.
    ///
    /// Returns the updated document, or None if it doesn't exist. A failed
    /// update leaves the stored document unchanged.
    async fn update(
        &self,
        collection: &str,
        id: DocumentId,
        update: Update,
    ) -> Result<Option<Document>>;

    /// Deletes a document, returning it if it existed.
    async fn delete(&self, collection: &str, id: DocumentId) -> Result<Option<Document>>;
}

/// Extension trait providing typed convenience methods for document stores.
#[async_trait]
pub trait DocumentStoreExt: DocumentStore {
    /// Serializes and inserts a value.
    async fn insert_value<T: Serialize + Sync>(
        &self,
        collection: &str,
        id: DocumentId,
        value: &T,
    ) -> Result<Document> {
        let body = serde_json::to_value(value)?;
        self.insert(collection, id, body).await
    }

    /// Retrieves and deserializes a document by id.
    async fn get_value<T: DeserializeOwned + Send>(
        &self,
        collection: &str,
        id: DocumentId,
    ) -> Result<Option<T>> {
        match self.find_by_id(collection, id).await? {
            Some(doc) => Ok(Some(doc.into_decoded()?)),
            None => Ok(None),
        }
    }

    /// Returns the first document matching a filter.
    async fn find_one(&self, collection: &str, filter: Filter) -> Result<Option<Document>> {
        let mut docs = self
            .find(collection, FindQuery::filtered(filter).limit(1))
            .await?;
        Ok(docs.pop())
    }

    /// Checks if a document exists.
    async fn exists(&self, collection: &str, id: DocumentId) -> Result<bool> {
        Ok(self.find_by_id(collection, id).await?.is_some())
    }
}

// Blanket implementation for all DocumentStore implementations
impl<T: DocumentStore + ?Sized> DocumentStoreExt for T {}

pub(crate) fn record_operation(collection: &str, operation: &'static str) {
    metrics::counter!(
        "store_operations_total",
        "collection" => collection.to_string(),
        "operation" => operation
    )
    .increment(1);
}
