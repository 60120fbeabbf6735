use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::store::record_operation;
use crate::{
    Document, DocumentId, DocumentStore, Filter, FindQuery, Result, StoreError, Update,
};

#[derive(Default)]
struct MemoryState {
    // Each collection is kept in insertion order.
    collections: HashMap<String, Vec<Document>>,
    next_seq: i64,
}

impl MemoryState {
    fn collection(&self, name: &str) -> &[Document] {
        self.collections.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    fn insert(&mut self, collection: &str, id: DocumentId, body: serde_json::Value) -> Document {
        self.next_seq += 1;
        let doc = Document {
            id,
            seq: self.next_seq,
            created_at: Utc::now(),
            body,
        };
        self.collections
            .entry(collection.to_string())
            .or_default()
            .push(doc.clone());
        doc
    }
}

/// In-memory document store implementation.
///
/// Provides the same interface and atomicity as the PostgreSQL
/// implementation; every write holds the store-wide write lock.
#[derive(Clone, Default)]
pub struct InMemoryDocumentStore {
    state: Arc<RwLock<MemoryState>>,
}

impl InMemoryDocumentStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of documents in a collection.
    pub async fn document_count(&self, collection: &str) -> usize {
        self.state.read().await.collection(collection).len()
    }

    /// Clears all collections.
    pub async fn clear(&self) {
        self.state.write().await.collections.clear();
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn insert(
        &self,
        collection: &str,
        id: DocumentId,
        body: serde_json::Value,
    ) -> Result<Document> {
        record_operation(collection, "insert");
        let mut state = self.state.write().await;

        if state.collection(collection).iter().any(|d| d.id == id) {
            return Err(StoreError::DuplicateId {
                collection: collection.to_string(),
                id,
            });
        }

        Ok(state.insert(collection, id, body))
    }

    async fn find_by_id(&self, collection: &str, id: DocumentId) -> Result<Option<Document>> {
        record_operation(collection, "find_by_id");
        let state = self.state.read().await;
        Ok(state.collection(collection).iter().find(|d| d.id == id).cloned())
    }

    async fn find(&self, collection: &str, query: FindQuery) -> Result<Vec<Document>> {
        record_operation(collection, "find");
        let state = self.state.read().await;

        let matching = state
            .collection(collection)
            .iter()
            .filter(|d| query.filter.matches(&d.body))
            .skip(query.offset.unwrap_or(0));

        let docs = match query.limit {
            Some(limit) => matching.take(limit).cloned().collect(),
            None => matching.cloned().collect(),
        };
        Ok(docs)
    }

    async fn count(&self, collection: &str, filter: &Filter) -> Result<u64> {
        record_operation(collection, "count");
        let state = self.state.read().await;
        let count = state
            .collection(collection)
            .iter()
            .filter(|d| filter.matches(&d.body))
            .count();
        Ok(count as u64)
    }

    async fn find_or_insert(
        &self,
        collection: &str,
        filter: &Filter,
        id: DocumentId,
        body: serde_json::Value,
    ) -> Result<Document> {
        record_operation(collection, "find_or_insert");
        let mut state = self.state.write().await;

        if let Some(existing) = state
            .collection(collection)
            .iter()
            .find(|d| filter.matches(&d.body))
        {
            return Ok(existing.clone());
        }

        Ok(state.insert(collection, id, body))
    }

    async fn update(
        &self,
        collection: &str,
        id: DocumentId,
        update: Update,
    ) -> Result<Option<Document>> {
        record_operation(collection, update.kind());
        let mut state = self.state.write().await;

        let Some(doc) = state
            .collections
            .get_mut(collection)
            .and_then(|docs| docs.iter_mut().find(|d| d.id == id))
        else {
            return Ok(None);
        };

        let mut body = doc.body.clone();
        if let Err(e) = update.apply(&mut body) {
            tracing::debug!(collection, %id, kind = update.kind(), error = %e, "update rejected");
            return Err(e);
        }
        doc.body = body;

        Ok(Some(doc.clone()))
    }

    async fn delete(&self, collection: &str, id: DocumentId) -> Result<Option<Document>> {
        record_operation(collection, "delete");
        let mut state = self.state.write().await;

        let Some(docs) = state.collections.get_mut(collection) else {
            return Ok(None);
        };
        let removed = docs
            .iter()
            .position(|d| d.id == id)
            .map(|position| docs.remove(position));
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DocumentStoreExt;
    use serde_json::json;

    const ORDERS: &str = "orders";

    #[tokio::test]
    async fn insert_and_find_by_id() {
        let store = InMemoryDocumentStore::new();
        let id = DocumentId::new();

        let doc = store
            .insert(ORDERS, id, json!({"status": "Pending"}))
            .await
            .unwrap();
        assert_eq!(doc.id, id);

        let found = store.find_by_id(ORDERS, id).await.unwrap().unwrap();
        assert_eq!(found.body["status"], "Pending");
        assert!(store.find_by_id("carts", id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn duplicate_id_is_rejected() {
        let store = InMemoryDocumentStore::new();
        let id = DocumentId::new();

        store.insert(ORDERS, id, json!({})).await.unwrap();
        let result = store.insert(ORDERS, id, json!({})).await;

        assert!(matches!(result, Err(StoreError::DuplicateId { .. })));
        assert_eq!(store.document_count(ORDERS).await, 1);
    }

    #[tokio::test]
    async fn seq_increases_across_collections() {
        let store = InMemoryDocumentStore::new();

        let a = store.insert(ORDERS, DocumentId::new(), json!({})).await.unwrap();
        let b = store.insert("carts", DocumentId::new(), json!({})).await.unwrap();
        let c = store.insert(ORDERS, DocumentId::new(), json!({})).await.unwrap();

        assert!(a.seq < b.seq && b.seq < c.seq);
    }

    #[tokio::test]
    async fn find_paginates_in_insertion_order() {
        let store = InMemoryDocumentStore::new();
        for n in 0..7 {
            store
                .insert(ORDERS, DocumentId::new(), json!({"n": n, "user": n % 2}))
                .await
                .unwrap();
        }

        let page = store
            .find(ORDERS, FindQuery::new().page(2, 3))
            .await
            .unwrap();
        let numbers: Vec<_> = page.iter().map(|d| d.body["n"].as_i64().unwrap()).collect();
        assert_eq!(numbers, vec![3, 4, 5]);

        let filter = Filter::new().eq("user", 1);
        let odd = store
            .find(ORDERS, FindQuery::filtered(filter.clone()))
            .await
            .unwrap();
        assert_eq!(odd.len(), 3);
        assert_eq!(store.count(ORDERS, &filter).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn find_or_insert_returns_existing() {
        let store = InMemoryDocumentStore::new();
        let filter = Filter::new().eq("user_id", "u1");

        let first = store
            .find_or_insert("carts", &filter, DocumentId::new(), json!({"user_id": "u1"}))
            .await
            .unwrap();
        let second = store
            .find_or_insert("carts", &filter, DocumentId::new(), json!({"user_id": "u1"}))
            .await
            .unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(store.document_count("carts").await, 1);
    }

    #[tokio::test]
    async fn failed_update_leaves_document_unchanged() {
        let store = InMemoryDocumentStore::new();
        let id = DocumentId::new();
        store
            .insert("products", id, json!({"stock": 1}))
            .await
            .unwrap();

        let result = store
            .update(
                "products",
                id,
                Update::Increment {
                    field: "stock".to_string(),
                    by: -2,
                    min: Some(0),
                },
            )
            .await;

        assert!(matches!(result, Err(StoreError::ConditionFailed { .. })));
        let doc = store.find_by_id("products", id).await.unwrap().unwrap();
        assert_eq!(doc.body["stock"], 1);
    }

    #[tokio::test]
    async fn update_missing_document_returns_none() {
        let store = InMemoryDocumentStore::new();
        let result = store
            .update(ORDERS, DocumentId::new(), Update::set("status", "Shipped"))
            .await
            .unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn concurrent_increments_are_not_lost() {
        let store = InMemoryDocumentStore::new();
        let id = DocumentId::new();
        store
            .insert("carts", id, json!({"lines": []}))
            .await
            .unwrap();

        let mut handles = Vec::new();
        for _ in 0..20 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store
                    .update(
                        "carts",
                        id,
                        Update::IncrementElementOrPush {
                            array: "lines".to_string(),
                            match_field: "product_id".to_string(),
                            match_value: json!("p1"),
                            field: "quantity".to_string(),
                            by: 1,
                            element: json!({"id": "l1", "product_id": "p1", "quantity": 1}),
                        },
                    )
                    .await
                    .unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let doc = store.find_by_id("carts", id).await.unwrap().unwrap();
        assert_eq!(doc.body["lines"][0]["quantity"], 20);
    }

    #[tokio::test]
    async fn delete_removes_document() {
        let store = InMemoryDocumentStore::new();
        let id = DocumentId::new();
        store.insert(ORDERS, id, json!({})).await.unwrap();

        assert!(store.delete(ORDERS, id).await.unwrap().is_some());
        assert!(store.delete(ORDERS, id).await.unwrap().is_none());
        assert!(!store.exists(ORDERS, id).await.unwrap());
    }
}
