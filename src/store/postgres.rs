//! PostgreSQL document store: one table per collection, `(id UUID PRIMARY KEY, body JSONB)`.
//! Tables live in the schema named by `DOCUMENT_SCHEMA` env (default `documents`).

use super::{
    Document, DocumentCursor, DocumentId, DocumentStore, InsertOneResult, ReplaceOneResult,
    SortOrder, DEFAULT_ID_FIELD,
};
use crate::error::StoreError;
use crate::sql::{self, OrderKey};
use async_trait::async_trait;
use serde_json::Value;
use sqlx::PgPool;
use uuid::Uuid;

/// Schema name for collection tables. From env `DOCUMENT_SCHEMA`, default `documents`.
pub fn document_schema() -> String {
    std::env::var("DOCUMENT_SCHEMA").unwrap_or_else(|_| "documents".into())
}

#[derive(Clone)]
pub struct PgDocumentStore {
    pool: PgPool,
    table: String,
}

impl PgDocumentStore {
    /// Handle for an existing collection table.
    pub fn new(pool: PgPool, collection: &str) -> Self {
        Self {
            pool,
            table: sql::qualified_table(&document_schema(), collection),
        }
    }

    /// Create the schema and collection table if missing, then return the handle.
    pub async fn ensure_collection(pool: PgPool, collection: &str) -> Result<Self, StoreError> {
        let schema_q = sql::create_schema(&document_schema());
        tracing::debug!(sql = %schema_q.sql, "query");
        sqlx::query(&schema_q.sql).execute(&pool).await?;
        let store = Self::new(pool, collection);
        let table_q = sql::create_table(&store.table);
        tracing::debug!(sql = %table_q.sql, "query");
        sqlx::query(&table_q.sql).execute(&store.pool).await?;
        tracing::info!(table = %store.table, "collection table ready");
        Ok(store)
    }

    pub fn table(&self) -> &str {
        &self.table
    }
}

/// Malformed ids cannot name a row.
fn parse_id(id: &DocumentId) -> Option<Uuid> {
    Uuid::parse_str(id.as_str()).ok()
}

fn row_to_document(id: Uuid, body: Value) -> Document {
    let mut doc = match body {
        Value::Object(map) => map,
        other => {
            let mut map = Document::new();
            map.insert("value".into(), other);
            map
        }
    };
    doc.insert(DEFAULT_ID_FIELD.into(), Value::String(id.to_string()));
    doc
}

fn body_without_id(mut document: Document) -> Value {
    document.remove(DEFAULT_ID_FIELD);
    Value::Object(document)
}

#[async_trait]
impl DocumentStore for PgDocumentStore {
    async fn find_all(&self) -> Result<Box<dyn DocumentCursor>, StoreError> {
        Ok(Box::new(PgCursor {
            pool: self.pool.clone(),
            table: self.table.clone(),
            order_key: OrderKey::Id,
            order: SortOrder::Ascending,
            skip: 0,
            limit: None,
        }))
    }

    async fn find_one_by_id(&self, id: &DocumentId) -> Result<Option<Document>, StoreError> {
        let Some(uuid) = parse_id(id) else {
            return Ok(None);
        };
        let q = sql::select_by_id(&self.table);
        tracing::debug!(sql = %q.sql, id = %uuid, "query");
        let row: Option<(Uuid, Value)> = sqlx::query_as(&q.sql)
            .bind(uuid)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|(id, body)| row_to_document(id, body)))
    }

    async fn insert_one(&self, document: Document) -> Result<InsertOneResult, StoreError> {
        let uuid = Uuid::new_v4();
        let q = sql::insert(&self.table);
        tracing::debug!(sql = %q.sql, id = %uuid, "query");
        sqlx::query(&q.sql)
            .bind(uuid)
            .bind(body_without_id(document))
            .execute(&self.pool)
            .await?;
        Ok(InsertOneResult {
            inserted_id: Value::String(uuid.to_string()),
        })
    }

    async fn replace_one_by_id(
        &self,
        id: &DocumentId,
        document: Document,
    ) -> Result<ReplaceOneResult, StoreError> {
        let Some(uuid) = parse_id(id) else {
            return Ok(ReplaceOneResult { matched_count: 0 });
        };
        let q = sql::replace_by_id(&self.table);
        tracing::debug!(sql = %q.sql, id = %uuid, "query");
        let result = sqlx::query(&q.sql)
            .bind(uuid)
            .bind(body_without_id(document))
            .execute(&self.pool)
            .await?;
        Ok(ReplaceOneResult {
            matched_count: result.rows_affected(),
        })
    }

    async fn delete_one_by_id(&self, id: &DocumentId) -> Result<Option<Document>, StoreError> {
        let Some(uuid) = parse_id(id) else {
            return Ok(None);
        };
        let q = sql::delete_by_id(&self.table);
        tracing::debug!(sql = %q.sql, id = %uuid, "query");
        let row: Option<(Uuid, Value)> = sqlx::query_as(&q.sql)
            .bind(uuid)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|(id, body)| row_to_document(id, body)))
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").fetch_optional(&self.pool).await?;
        Ok(())
    }
}

/// Values `to_vec` binds: the sort field when ordering by body, the offset, then the limit if any.
fn page_bind_count(order_key: &OrderKey, limit: Option<u64>) -> u32 {
    let field = matches!(order_key, OrderKey::BodyField(_)) as u32;
    field + 1 + limit.is_some() as u32
}

struct PgCursor {
    pool: PgPool,
    table: String,
    order_key: OrderKey,
    order: SortOrder,
    skip: u64,
    limit: Option<u64>,
}

#[async_trait]
impl DocumentCursor for PgCursor {
    async fn count(&self) -> Result<u64, StoreError> {
        let q = sql::count_all(&self.table);
        tracing::debug!(sql = %q.sql, "query");
        let n: i64 = sqlx::query_scalar(&q.sql).fetch_one(&self.pool).await?;
        Ok(u64::try_from(n).unwrap_or(0))
    }

    fn sort(&mut self, field: &str, order: SortOrder) {
        self.order_key = if field == DEFAULT_ID_FIELD {
            OrderKey::Id
        } else {
            OrderKey::BodyField(field.to_string())
        };
        self.order = order;
    }

    fn skip(&mut self, n: u64) {
        self.skip = n;
    }

    fn limit(&mut self, n: u64) {
        self.limit = Some(n);
    }

    async fn to_vec(self: Box<Self>) -> Result<Vec<Document>, StoreError> {
        let q = sql::select_page(&self.table, &self.order_key, self.order, self.limit.is_some());
        tracing::debug!(sql = %q.sql, skip = self.skip, limit = ?self.limit, "query");
        let mut query = sqlx::query_as::<_, (Uuid, Value)>(&q.sql);
        debug_assert_eq!(
            page_bind_count(&self.order_key, self.limit),
            q.param_count,
            "bind count mismatch for {}",
            q.sql
        );
        if let OrderKey::BodyField(field) = &self.order_key {
            query = query.bind(field.clone());
        }
        query = query.bind(i64::try_from(self.skip).unwrap_or(i64::MAX));
        if let Some(limit) = self.limit {
            query = query.bind(i64::try_from(limit).unwrap_or(i64::MAX));
        }
        let rows = query.fetch_all(&self.pool).await?;
        Ok(rows
            .into_iter()
            .map(|(id, body)| row_to_document(id, body))
            .collect())
    }
}
