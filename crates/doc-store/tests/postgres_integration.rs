//! PostgreSQL integration tests
//!
//! These tests use a shared PostgreSQL container for efficiency.
//! Run with:
//!
//! ```bash
//! cargo test -p doc-store --test postgres_integration -- --test-threads=1
//! ```

use std::sync::Arc;

use doc_store::{
    DocumentId, DocumentStore, DocumentStoreExt, Filter, FindQuery, PostgresDocumentStore,
    StoreError, Update,
};
use serde_json::json;
use sqlx::PgPool;
use testcontainers::{ContainerAsync, runners::AsyncRunner};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;

/// Shared container info - container stays alive for all tests
struct ContainerInfo {
    #[allow(dead_code)] // Container must stay alive for tests
    container: ContainerAsync<Postgres>,
    connection_string: String,
}

/// Global shared container
static CONTAINER: OnceCell<Arc<ContainerInfo>> = OnceCell::const_new();

async fn get_container_info() -> Arc<ContainerInfo> {
    CONTAINER
        .get_or_init(|| async {
            let container = Postgres::default().start().await.unwrap();

            let host = container.get_host().await.unwrap();
            let port = container.get_host_port_ipv4(5432).await.unwrap();

            let connection_string =
                format!("postgres://postgres:postgres@{}:{}/postgres", host, port);

            let temp_pool = PgPool::connect(&connection_string).await.unwrap();
            sqlx::raw_sql(include_str!(
                "../../../migrations/001_create_documents_table.sql"
            ))
            .execute(&temp_pool)
            .await
            .unwrap();
            temp_pool.close().await;

            Arc::new(ContainerInfo {
                container,
                connection_string,
            })
        })
        .await
        .clone()
}

/// Get a fresh store with its own pool and a cleared table
async fn get_test_store() -> PostgresDocumentStore {
    let info = get_container_info().await;

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(&info.connection_string)
        .await
        .unwrap();

    sqlx::query("TRUNCATE TABLE documents")
        .execute(&pool)
        .await
        .unwrap();

    PostgresDocumentStore::new(pool)
}

#[tokio::test]
async fn insert_and_find_by_id() {
    let store = get_test_store().await;
    let id = DocumentId::new();

    store
        .insert("orders", id, json!({"status": "Pending"}))
        .await
        .unwrap();

    let doc = store.find_by_id("orders", id).await.unwrap().unwrap();
    assert_eq!(doc.id, id);
    assert_eq!(doc.body["status"], "Pending");
    assert!(store.find_by_id("carts", id).await.unwrap().is_none());
}

#[tokio::test]
async fn duplicate_insert_is_rejected() {
    let store = get_test_store().await;
    let id = DocumentId::new();

    store.insert("orders", id, json!({})).await.unwrap();
    let result = store.insert("orders", id, json!({})).await;

    assert!(matches!(result, Err(StoreError::DuplicateId { .. })));
}

#[tokio::test]
async fn filtered_pagination_is_stable() {
    let store = get_test_store().await;
    for n in 0..25 {
        store
            .insert(
                "orders",
                DocumentId::new(),
                json!({"n": n, "user_id": if n % 5 == 0 { "a" } else { "b" }}),
            )
            .await
            .unwrap();
    }

    let mut seen = Vec::new();
    for page in 1..=3 {
        let docs = store
            .find("orders", FindQuery::new().page(page, 10))
            .await
            .unwrap();
        seen.extend(docs.into_iter().map(|d| d.body["n"].as_i64().unwrap()));
    }
    assert_eq!(seen, (0..25).collect::<Vec<_>>());

    let filter = Filter::new().eq("user_id", "a");
    assert_eq!(store.count("orders", &filter).await.unwrap(), 5);
    let only_a = store
        .find("orders", FindQuery::filtered(filter))
        .await
        .unwrap();
    assert_eq!(only_a.len(), 5);
}

#[tokio::test]
async fn conditional_increment_rolls_back() {
    let store = get_test_store().await;
    let id = DocumentId::new();
    store
        .insert("products", id, json!({"stock": 2}))
        .await
        .unwrap();

    let result = store
        .update(
            "products",
            id,
            Update::Increment {
                field: "stock".to_string(),
                by: -3,
                min: Some(0),
            },
        )
        .await;
    assert!(matches!(result, Err(StoreError::ConditionFailed { .. })));

    let doc = store.find_by_id("products", id).await.unwrap().unwrap();
    assert_eq!(doc.body["stock"], 2);
}

#[tokio::test]
async fn concurrent_element_increments_are_serialized() {
    let store = get_test_store().await;
    let id = DocumentId::new();
    store
        .insert("carts", id, json!({"lines": []}))
        .await
        .unwrap();

    let mut handles = Vec::new();
    for _ in 0..10 {
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
    assert_eq!(doc.body["lines"].as_array().unwrap().len(), 1);
    assert_eq!(doc.body["lines"][0]["quantity"], 10);
}

#[tokio::test]
async fn find_or_insert_creates_once() {
    let store = get_test_store().await;
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
    assert_eq!(store.count("carts", &filter).await.unwrap(), 1);
}

#[tokio::test]
async fn delete_returns_removed_document() {
    let store = get_test_store().await;
    let id = DocumentId::new();
    store.insert("orders", id, json!({"a": 1})).await.unwrap();

    let removed = store.delete("orders", id).await.unwrap().unwrap();
    assert_eq!(removed.body["a"], 1);
    assert!(store.delete("orders", id).await.unwrap().is_none());
    assert!(!store.exists("orders", id).await.unwrap());
}
