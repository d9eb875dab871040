//! Document store capability set consumed by the controller and the pagination engine.

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::{document_schema, PgDocumentStore};

use crate::error::StoreError;
use async_trait::async_trait;
use serde_json::Value;
use std::fmt;

/// One stored record. The identifier lives under the store's `id_field()`.
pub type Document = serde_json::Map<String, Value>;

/// Store-native identifier field used by the bundled adapters.
pub const DEFAULT_ID_FIELD: &str = "_id";

/// Identifier as received on the item route. Adapters decide how to interpret it;
/// one that cannot be parsed simply matches nothing.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct DocumentId(pub String);

impl DocumentId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DocumentId {
    fn from(s: &str) -> Self {
        DocumentId(s.to_string())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

#[derive(Clone, Debug, PartialEq)]
pub struct InsertOneResult {
    pub inserted_id: Value,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReplaceOneResult {
    pub matched_count: u64,
}

/// A pending query over the full matching set. `count` ignores skip and limit.
#[async_trait]
pub trait DocumentCursor: Send {
    async fn count(&self) -> Result<u64, StoreError>;
    fn sort(&mut self, field: &str, order: SortOrder);
    fn skip(&mut self, n: u64);
    fn limit(&mut self, n: u64);
    /// Materialize the sorted, sliced result in order.
    async fn to_vec(self: Box<Self>) -> Result<Vec<Document>, StoreError>;
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    fn id_field(&self) -> &str {
        DEFAULT_ID_FIELD
    }

    async fn find_all(&self) -> Result<Box<dyn DocumentCursor>, StoreError>;
    async fn find_one_by_id(&self, id: &DocumentId) -> Result<Option<Document>, StoreError>;
    async fn insert_one(&self, document: Document) -> Result<InsertOneResult, StoreError>;
    async fn replace_one_by_id(
        &self,
        id: &DocumentId,
        document: Document,
    ) -> Result<ReplaceOneResult, StoreError>;
    /// Returns the deleted document, or None when nothing matched.
    async fn delete_one_by_id(&self, id: &DocumentId) -> Result<Option<Document>, StoreError>;

    /// Readiness probe.
    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
