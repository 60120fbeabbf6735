use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Row, Transaction, postgres::PgRow};
use uuid::Uuid;

use crate::store::record_operation;
use crate::{
    Document, DocumentId, DocumentStore, Filter, FindQuery, Result, StoreError, Update,
};

/// PostgreSQL-backed document store.
///
/// Documents live in a single `documents` table keyed by id, with the body
/// in a JSONB column. Filters use JSONB containment; single-document updates
/// run in a transaction holding the row lock.
#[derive(Clone)]
pub struct PostgresDocumentStore {
    pool: PgPool,
}

impl PostgresDocumentStore {
    /// Creates a new PostgreSQL document store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connects to the database at `url`.
    pub async fn connect(url: &str) -> Result<Self> {
        let pool = PgPool::connect(url).await?;
        Ok(Self::new(pool))
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> std::result::Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("../../migrations").run(&self.pool).await
    }

    fn row_to_document(row: PgRow) -> Result<Document> {
        Ok(Document {
            id: DocumentId::from_uuid(row.try_get::<Uuid, _>("id")?),
            seq: row.try_get("seq")?,
            created_at: row.try_get("created_at")?,
            body: row.try_get("body")?,
        })
    }

    async fn insert_in(
        tx: &mut Transaction<'_, Postgres>,
        collection: &str,
        id: DocumentId,
        body: serde_json::Value,
    ) -> Result<Document> {
        let row = sqlx::query(
            r#"
            INSERT INTO documents (id, collection, body)
            VALUES ($1, $2, $3)
            RETURNING id, seq, created_at, body
            "#,
        )
        .bind(id.as_uuid())
        .bind(collection)
        .bind(&body)
        .fetch_one(&mut **tx)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.constraint() == Some("documents_pkey")
            {
                return StoreError::DuplicateId {
                    collection: collection.to_string(),
                    id,
                };
            }
            StoreError::Database(e)
        })?;

        Self::row_to_document(row)
    }
}

#[async_trait]
impl DocumentStore for PostgresDocumentStore {
    async fn insert(
        &self,
        collection: &str,
        id: DocumentId,
        body: serde_json::Value,
    ) -> Result<Document> {
        record_operation(collection, "insert");
        let mut tx = self.pool.begin().await?;
        let doc = Self::insert_in(&mut tx, collection, id, body).await?;
        tx.commit().await?;
        Ok(doc)
    }

    async fn find_by_id(&self, collection: &str, id: DocumentId) -> Result<Option<Document>> {
        record_operation(collection, "find_by_id");
        let row = sqlx::query(
            r#"
            SELECT id, seq, created_at, body
            FROM documents
            WHERE collection = $1 AND id = $2
            "#,
        )
        .bind(collection)
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_document).transpose()
    }

    async fn find(&self, collection: &str, query: FindQuery) -> Result<Vec<Document>> {
        record_operation(collection, "find");
        // LIMIT NULL means no limit in PostgreSQL.
        let rows = sqlx::query(
            r#"
            SELECT id, seq, created_at, body
            FROM documents
            WHERE collection = $1 AND body @> $2
            ORDER BY seq ASC
            LIMIT $3 OFFSET $4
            "#,
        )
        .bind(collection)
        .bind(query.filter.to_json())
        .bind(query.limit.map(clamp_to_i64))
        .bind(clamp_to_i64(query.offset.unwrap_or(0)))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_document).collect()
    }

    async fn count(&self, collection: &str, filter: &Filter) -> Result<u64> {
        record_operation(collection, "count");
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM documents WHERE collection = $1 AND body @> $2",
        )
        .bind(collection)
        .bind(filter.to_json())
        .fetch_one(&self.pool)
        .await?;

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
        let filter_json = filter.to_json();
        let mut tx = self.pool.begin().await?;

        // Serializes concurrent find-or-insert calls for the same filter.
        sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1 || $2::text))")
            .bind(collection)
            .bind(&filter_json)
            .execute(&mut *tx)
            .await?;

        let existing = sqlx::query(
            r#"
            SELECT id, seq, created_at, body
            FROM documents
            WHERE collection = $1 AND body @> $2
            ORDER BY seq ASC
            LIMIT 1
            "#,
        )
        .bind(collection)
        .bind(&filter_json)
        .fetch_optional(&mut *tx)
        .await?;

        let doc = match existing {
            Some(row) => Self::row_to_document(row)?,
            None => {
                tracing::debug!(collection, %id, "no match, inserting");
                Self::insert_in(&mut tx, collection, id, body).await?
            }
        };

        tx.commit().await?;
        Ok(doc)
    }

    async fn update(
        &self,
        collection: &str,
        id: DocumentId,
        update: Update,
    ) -> Result<Option<Document>> {
        record_operation(collection, update.kind());
        let mut tx = self.pool.begin().await?;

        let current: Option<serde_json::Value> = sqlx::query_scalar(
            "SELECT body FROM documents WHERE collection = $1 AND id = $2 FOR UPDATE",
        )
        .bind(collection)
        .bind(id.as_uuid())
        .fetch_optional(&mut *tx)
        .await?;

        let Some(mut body) = current else {
            return Ok(None);
        };

        // Dropping the transaction on error rolls back and releases the lock.
        if let Err(e) = update.apply(&mut body) {
            tracing::debug!(collection, %id, kind = update.kind(), error = %e, "update rejected");
            return Err(e);
        }

        let row = sqlx::query(
            r#"
            UPDATE documents SET body = $3
            WHERE collection = $1 AND id = $2
            RETURNING id, seq, created_at, body
            "#,
        )
        .bind(collection)
        .bind(id.as_uuid())
        .bind(&body)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(Some(Self::row_to_document(row)?))
    }

    async fn delete(&self, collection: &str, id: DocumentId) -> Result<Option<Document>> {
        record_operation(collection, "delete");
        let row = sqlx::query(
            r#"
            DELETE FROM documents
            WHERE collection = $1 AND id = $2
            RETURNING id, seq, created_at, body
            "#,
        )
        .bind(collection)
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_document).transpose()
    }
}

fn clamp_to_i64(n: usize) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}
