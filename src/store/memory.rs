//! In-process document store. Used by tests and by servers started without a database.

use super::{
    Document, DocumentCursor, DocumentId, DocumentStore, InsertOneResult, ReplaceOneResult,
    SortOrder, DEFAULT_ID_FIELD,
};
use crate::error::StoreError;
use crate::response::canonical_id;
use async_trait::async_trait;
use serde_json::Value;
use std::cmp::Ordering;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

struct Inner {
    next_id: u64,
    documents: Vec<Document>,
}

/// Documents kept in insertion order; ids are 24-hex-digit counters so they sort by age.
pub struct MemoryStore {
    id_field: String,
    inner: RwLock<Inner>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_id_field(DEFAULT_ID_FIELD)
    }

    pub fn with_id_field(id_field: &str) -> Self {
        Self {
            id_field: id_field.to_string(),
            inner: RwLock::new(Inner {
                next_id: 1,
                documents: Vec::new(),
            }),
        }
    }

    /// Seed documents as-is. Ones without an identifier get a fresh one.
    pub fn with_documents(documents: impl IntoIterator<Item = Document>) -> Self {
        let store = Self::new();
        if let Ok(mut inner) = store.inner.write() {
            for mut doc in documents {
                match doc.get(&store.id_field) {
                    Some(id) => reserve_id(&mut inner, id),
                    None => {
                        let id = mint_id(&mut inner);
                        doc.insert(store.id_field.clone(), id);
                    }
                }
                inner.documents.push(doc);
            }
        }
        store
    }

    pub fn len(&self) -> usize {
        self.read().map(|inner| inner.documents.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Inner>, StoreError> {
        self.inner
            .read()
            .map_err(|_| StoreError::Backend("memory store lock poisoned".into()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Inner>, StoreError> {
        self.inner
            .write()
            .map_err(|_| StoreError::Backend("memory store lock poisoned".into()))
    }

    fn position(&self, documents: &[Document], id: &DocumentId) -> Option<usize> {
        documents.iter().position(|doc| {
            doc.get(&self.id_field)
                .map(|v| canonical_id(v) == id.as_str())
                .unwrap_or(false)
        })
    }
}

/// Keep the counter ahead of any counter-shaped id stored from outside.
fn reserve_id(inner: &mut Inner, id: &Value) {
    let id = canonical_id(id);
    if id.len() != 24 {
        return;
    }
    if let Ok(n) = u64::from_str_radix(&id, 16) {
        inner.next_id = inner.next_id.max(n.saturating_add(1));
    }
}

fn mint_id(inner: &mut Inner) -> Value {
    let id = format!("{:024x}", inner.next_id);
    inner.next_id += 1;
    Value::String(id)
}

#[async_trait]
impl DocumentStore for MemoryStore {
    fn id_field(&self) -> &str {
        &self.id_field
    }

    async fn find_all(&self) -> Result<Box<dyn DocumentCursor>, StoreError> {
        let documents = self.read()?.documents.clone();
        Ok(Box::new(MemoryCursor {
            documents,
            sort: None,
            skip: 0,
            limit: None,
        }))
    }

    async fn find_one_by_id(&self, id: &DocumentId) -> Result<Option<Document>, StoreError> {
        let inner = self.read()?;
        Ok(self
            .position(&inner.documents, id)
            .map(|i| inner.documents[i].clone()))
    }

    async fn insert_one(&self, mut document: Document) -> Result<InsertOneResult, StoreError> {
        let mut inner = self.write()?;
        let id = match document.get(&self.id_field) {
            Some(id) => {
                reserve_id(&mut inner, id);
                id.clone()
            }
            None => {
                let id = mint_id(&mut inner);
                document.insert(self.id_field.clone(), id.clone());
                id
            }
        };
        inner.documents.push(document);
        Ok(InsertOneResult { inserted_id: id })
    }

    async fn replace_one_by_id(
        &self,
        id: &DocumentId,
        document: Document,
    ) -> Result<ReplaceOneResult, StoreError> {
        let mut inner = self.write()?;
        match self.position(&inner.documents, id) {
            Some(i) => {
                let original_id = inner.documents[i].get(&self.id_field).cloned();
                let mut document = document;
                if let Some(original_id) = original_id {
                    document.insert(self.id_field.clone(), original_id);
                }
                inner.documents[i] = document;
                Ok(ReplaceOneResult { matched_count: 1 })
            }
            None => Ok(ReplaceOneResult { matched_count: 0 }),
        }
    }

    async fn delete_one_by_id(&self, id: &DocumentId) -> Result<Option<Document>, StoreError> {
        let mut inner = self.write()?;
        Ok(self
            .position(&inner.documents, id)
            .map(|i| inner.documents.remove(i)))
    }
}

/// Snapshot of the collection taken at `find_all`.
struct MemoryCursor {
    documents: Vec<Document>,
    sort: Option<(String, SortOrder)>,
    skip: u64,
    limit: Option<u64>,
}

#[async_trait]
impl DocumentCursor for MemoryCursor {
    async fn count(&self) -> Result<u64, StoreError> {
        Ok(self.documents.len() as u64)
    }

    fn sort(&mut self, field: &str, order: SortOrder) {
        self.sort = Some((field.to_string(), order));
    }

    fn skip(&mut self, n: u64) {
        self.skip = n;
    }

    fn limit(&mut self, n: u64) {
        self.limit = Some(n);
    }

    async fn to_vec(self: Box<Self>) -> Result<Vec<Document>, StoreError> {
        let MemoryCursor {
            mut documents,
            sort,
            skip,
            limit,
        } = *self;
        if let Some((field, order)) = sort {
            // sort_by is stable: ties keep insertion order in both directions.
            documents.sort_by(|a, b| {
                let ord = compare_values(a.get(&field), b.get(&field));
                match order {
                    SortOrder::Ascending => ord,
                    SortOrder::Descending => ord.reverse(),
                }
            });
        }
        let skip = usize::try_from(skip).unwrap_or(usize::MAX);
        let page = documents.into_iter().skip(skip);
        Ok(match limit {
            Some(n) => page.take(usize::try_from(n).unwrap_or(usize::MAX)).collect(),
            None => page.collect(),
        })
    }
}

/// Cross-type order: missing/null < numbers < strings < objects < arrays < booleans.
fn type_rank(v: Option<&Value>) -> u8 {
    match v {
        None | Some(Value::Null) => 0,
        Some(Value::Number(_)) => 1,
        Some(Value::String(_)) => 2,
        Some(Value::Object(_)) => 3,
        Some(Value::Array(_)) => 4,
        Some(Value::Bool(_)) => 5,
    }
}

fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (Some(x @ Value::Object(_)), Some(y @ Value::Object(_)))
        | (Some(x @ Value::Array(_)), Some(y @ Value::Array(_))) => x.to_string().cmp(&y.to_string()),
        _ => type_rank(a).cmp(&type_rank(b)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(v: Value) -> Document {
        match v {
            Value::Object(m) => m,
            _ => panic!("not an object"),
        }
    }

    #[tokio::test]
    async fn insert_assigns_increasing_ids() {
        let store = MemoryStore::new();
        let a = store.insert_one(doc(json!({"name": "a"}))).await.unwrap();
        let b = store.insert_one(doc(json!({"name": "b"}))).await.unwrap();
        assert_eq!(a.inserted_id, json!("000000000000000000000001"));
        assert!(canonical_id(&a.inserted_id) < canonical_id(&b.inserted_id));
        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn minted_ids_skip_past_seeded_ones() {
        let store = MemoryStore::with_documents(vec![
            doc(json!({"_id": "000000000000000000000001", "name": "a"})),
            doc(json!({"_id": {"$oid": "00000000000000000000000a"}, "name": "b"})),
            doc(json!({"_id": "not-a-counter", "name": "c"})),
        ]);
        let minted = store.insert_one(doc(json!({"name": "d"}))).await.unwrap();
        assert_eq!(minted.inserted_id, json!("00000000000000000000000b"));

        store
            .insert_one(doc(json!({"_id": "000000000000000000000020"})))
            .await
            .unwrap();
        let next = store.insert_one(doc(json!({}))).await.unwrap();
        assert_eq!(next.inserted_id, json!("000000000000000000000021"));

        let ids: Vec<String> = store
            .find_all()
            .await
            .unwrap()
            .to_vec()
            .await
            .unwrap()
            .iter()
            .map(|d| canonical_id(&d["_id"]))
            .collect();
        let mut unique = ids.clone();
        unique.sort();
        unique.dedup();
        assert_eq!(unique.len(), ids.len());
    }

    #[tokio::test]
    async fn replace_and_delete_report_misses() {
        let store = MemoryStore::new();
        let missing = DocumentId::from("nope");
        let replaced = store
            .replace_one_by_id(&missing, doc(json!({"name": "x"})))
            .await
            .unwrap();
        assert_eq!(replaced.matched_count, 0);
        assert!(store.delete_one_by_id(&missing).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn replace_keeps_the_original_identifier() {
        let store = MemoryStore::new();
        let id = store.insert_one(doc(json!({"name": "a"}))).await.unwrap().inserted_id;
        let id = DocumentId(canonical_id(&id));
        let result = store
            .replace_one_by_id(&id, doc(json!({"name": "b"})))
            .await
            .unwrap();
        assert_eq!(result.matched_count, 1);
        let stored = store.find_one_by_id(&id).await.unwrap().unwrap();
        assert_eq!(stored.get("name"), Some(&json!("b")));
        assert_eq!(stored.get("_id"), Some(&json!(id.as_str())));
    }

    #[tokio::test]
    async fn cursor_sorts_stably_then_slices() {
        let store = MemoryStore::with_documents(vec![
            doc(json!({"n": 2, "tag": "first"})),
            doc(json!({"n": 1})),
            doc(json!({"n": 2, "tag": "second"})),
            doc(json!({})),
        ]);
        let mut cursor = store.find_all().await.unwrap();
        assert_eq!(cursor.count().await.unwrap(), 4);
        cursor.sort("n", SortOrder::Descending);
        cursor.skip(0);
        cursor.limit(3);
        let items = cursor.to_vec().await.unwrap();
        let tags: Vec<_> = items.iter().map(|d| d.get("tag").cloned()).collect();
        assert_eq!(tags, vec![Some(json!("first")), Some(json!("second")), None]);
        assert_eq!(items[2].get("n"), Some(&json!(1)));
    }

    #[test]
    fn missing_sorts_before_values() {
        assert_eq!(compare_values(None, Some(&json!(0))), Ordering::Less);
        assert_eq!(compare_values(Some(&json!("a")), Some(&json!(5))), Ordering::Greater);
        assert_eq!(compare_values(Some(&json!(1.5)), Some(&json!(2))), Ordering::Less);
    }
}
