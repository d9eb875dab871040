//! Page arithmetic, page-number validation and the list envelope.

use crate::config::ResourceOptions;
use crate::error::ApiError;
use crate::response::public_document;
use crate::store::{DocumentCursor, SortOrder};
use serde::{Serialize, Serializer};
use serde_json::Value;
use std::collections::HashMap;

/// Public sort key that aliases the store-native identifier field.
pub const PUBLIC_ID: &str = "id";

/// Pagination arguments for one list request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PageRequest {
    pub page: i64,
    pub per_page: u64,
    /// Sort key as the client named it.
    pub sort_by: String,
    /// Field the store sorts on (`id` resolved to the native identifier field).
    pub sort_field: String,
    pub order: SortOrder,
}

impl PageRequest {
    /// Read `page`, `per_page`, `sort_by` and `order` from query parameters.
    /// `order=1` means descending (backbone.paginator convention); any other value ascends.
    /// An absent `order` defaults to `1`.
    pub fn from_query(
        query: &HashMap<String, String>,
        options: &ResourceOptions,
        id_field: &str,
    ) -> Result<Self, ApiError> {
        let page = match query.get("page") {
            Some(v) => v
                .trim()
                .parse::<i64>()
                .map_err(|_| ApiError::InvalidPagination(format!("page must be an integer (got '{}')", v)))?,
            None => 1,
        };
        let per_page = match query.get("per_page") {
            Some(v) => v.trim().parse::<u64>().map_err(|_| {
                ApiError::InvalidPagination(format!("per_page must be a positive integer (got '{}')", v))
            })?,
            None => options.default_per_page,
        };
        if per_page == 0 {
            return Err(ApiError::InvalidPagination("per_page must be at least 1".into()));
        }
        if per_page > options.max_per_page {
            return Err(ApiError::InvalidPagination(format!(
                "per_page cannot be greater than {}",
                options.max_per_page
            )));
        }
        let sort_by = query
            .get("sort_by")
            .cloned()
            .unwrap_or_else(|| PUBLIC_ID.to_string());
        let sort_field = if sort_by == PUBLIC_ID {
            id_field.to_string()
        } else {
            sort_by.clone()
        };
        let order = match query.get("order").map(|s| s.trim()) {
            Some("1") | None => SortOrder::Descending,
            Some(_) => SortOrder::Ascending,
        };
        Ok(Self {
            page,
            per_page,
            sort_by,
            sort_field,
            order,
        })
    }
}

/// One page of public documents plus its bounds.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PageEnvelope {
    pub page: i64,
    pub per_page: u64,
    pub total_pages: u64,
    pub total_entries: u64,
    pub sort_by: String,
    #[serde(serialize_with = "serialize_order")]
    pub order: SortOrder,
    pub items: Vec<Value>,
}

/// Echo order in the request convention: 1 descending, -1 ascending.
fn serialize_order<S: Serializer>(order: &SortOrder, s: S) -> Result<S::Ok, S::Error> {
    match order {
        SortOrder::Descending => s.serialize_i8(1),
        SortOrder::Ascending => s.serialize_i8(-1),
    }
}

/// `max(1, ceil(total_entries / per_page))`.
pub fn total_pages(total_entries: u64, per_page: u64) -> u64 {
    total_entries.div_ceil(per_page.max(1)).max(1)
}

/// Page 1 of an empty collection is always valid.
pub fn check_page(page: i64, total_entries: u64, total_pages: u64) -> Result<(), ApiError> {
    if total_entries == 0 && page == 1 {
        return Ok(());
    }
    if page < 1 || page as u64 > total_pages {
        return Err(ApiError::InvalidPage(page));
    }
    Ok(())
}

/// Count the full set, validate the page, then sort/skip/limit and shape each item.
pub async fn paginate(
    mut cursor: Box<dyn DocumentCursor>,
    request: &PageRequest,
    id_field: &str,
) -> Result<PageEnvelope, ApiError> {
    let total_entries = cursor.count().await?;
    let total_pages = total_pages(total_entries, request.per_page);
    check_page(request.page, total_entries, total_pages)?;

    let skip = request.per_page * (request.page as u64 - 1);
    cursor.sort(&request.sort_field, request.order);
    cursor.skip(skip);
    cursor.limit(request.per_page);
    let items = cursor
        .to_vec()
        .await?
        .into_iter()
        .map(|doc| public_document(doc, id_field))
        .collect();

    Ok(PageEnvelope {
        page: request.page,
        per_page: request.per_page,
        total_pages,
        total_entries,
        sort_by: request.sort_by.clone(),
        order: request.order,
        items,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use crate::store::{Document, DocumentStore, MemoryStore};
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::{Arc, Mutex};

    #[derive(Default, Debug)]
    struct Calls {
        sort: Option<(String, SortOrder)>,
        skip: Option<u64>,
        limit: Option<u64>,
        materialized: bool,
    }

    /// Reports a fixed count and records what the pagination engine asked for.
    struct RecordingCursor {
        total: u64,
        items: Vec<Document>,
        calls: Arc<Mutex<Calls>>,
    }

    #[async_trait]
    impl DocumentCursor for RecordingCursor {
        async fn count(&self) -> Result<u64, StoreError> {
            Ok(self.total)
        }
        fn sort(&mut self, field: &str, order: SortOrder) {
            self.calls.lock().unwrap().sort = Some((field.to_string(), order));
        }
        fn skip(&mut self, n: u64) {
            self.calls.lock().unwrap().skip = Some(n);
        }
        fn limit(&mut self, n: u64) {
            self.calls.lock().unwrap().limit = Some(n);
        }
        async fn to_vec(self: Box<Self>) -> Result<Vec<Document>, StoreError> {
            self.calls.lock().unwrap().materialized = true;
            Ok(self.items)
        }
    }

    fn recording(total: u64) -> (Box<dyn DocumentCursor>, Arc<Mutex<Calls>>) {
        let calls = Arc::new(Mutex::new(Calls::default()));
        let cursor = RecordingCursor {
            total,
            items: Vec::new(),
            calls: calls.clone(),
        };
        (Box::new(cursor), calls)
    }

    fn request(page: i64, per_page: u64) -> PageRequest {
        PageRequest {
            page,
            per_page,
            sort_by: "id".into(),
            sort_field: "_id".into(),
            order: SortOrder::Ascending,
        }
    }

    fn query(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn total_pages_is_ceiling_with_floor_of_one() {
        for total in 0..=120u64 {
            for per_page in 1..=30u64 {
                let expected = std::cmp::max(1, (total + per_page - 1) / per_page);
                assert_eq!(total_pages(total, per_page), expected, "{} / {}", total, per_page);
            }
        }
    }

    #[tokio::test]
    async fn empty_collection_answers_page_one() {
        let (cursor, _) = recording(0);
        let page = paginate(cursor, &request(1, 25), "_id").await.unwrap();
        assert_eq!(page.total_pages, 1);
        assert_eq!(page.total_entries, 0);
        assert!(page.items.is_empty());

        let (cursor, calls) = recording(0);
        let err = paginate(cursor, &request(2, 25), "_id").await.unwrap_err();
        assert!(matches!(err, ApiError::InvalidPage(2)));
        assert!(!calls.lock().unwrap().materialized);
    }

    #[tokio::test]
    async fn out_of_range_pages_are_rejected() {
        let (cursor, _) = recording(40);
        let err = paginate(cursor, &request(3, 25), "_id").await.unwrap_err();
        assert!(matches!(err, ApiError::InvalidPage(3)));

        for bad in [0, -1] {
            let (cursor, _) = recording(40);
            let err = paginate(cursor, &request(bad, 25), "_id").await.unwrap_err();
            assert!(matches!(err, ApiError::InvalidPage(p) if p == bad));
        }
    }

    #[tokio::test]
    async fn second_page_skips_one_page() {
        let (cursor, calls) = recording(40);
        let page = paginate(cursor, &request(2, 25), "_id").await.unwrap();
        assert_eq!(page.total_pages, 2);
        let calls = calls.lock().unwrap();
        assert_eq!(calls.skip, Some(25));
        assert_eq!(calls.limit, Some(25));
        assert_eq!(calls.sort, Some(("_id".to_string(), SortOrder::Ascending)));
    }

    #[tokio::test]
    async fn pages_concatenate_to_the_full_sorted_set() {
        let docs = (0..23).map(|i| {
            let mut d = Document::new();
            d.insert("rank".into(), json!(i % 5));
            d.insert("n".into(), json!(i));
            d
        });
        let store = MemoryStore::with_documents(docs);
        let mut seen = Vec::new();
        let mut req = PageRequest {
            page: 1,
            per_page: 4,
            sort_by: "rank".into(),
            sort_field: "rank".into(),
            order: SortOrder::Descending,
        };
        loop {
            let page = paginate(store.find_all().await.unwrap(), &req, "_id").await.unwrap();
            assert!(page.items.len() as u64 <= req.per_page);
            seen.extend(page.items.iter().map(|d| d["n"].as_i64().unwrap()));
            if req.page as u64 == page.total_pages {
                break;
            }
            req.page += 1;
        }
        assert_eq!(seen.len(), 23);
        let mut unique = seen.clone();
        unique.sort();
        unique.dedup();
        assert_eq!(unique.len(), 23);
        let ranks: Vec<i64> = seen.iter().map(|n| n % 5).collect();
        assert!(ranks.windows(2).all(|w| w[0] >= w[1]));
    }

    #[tokio::test]
    async fn items_use_the_public_identifier() {
        let mut doc = Document::new();
        doc.insert("_id".into(), json!({"$oid": "64b7f0c2a1"}));
        doc.insert("breed".into(), json!("tabby"));
        let store = MemoryStore::with_documents(vec![doc]);
        let page = paginate(store.find_all().await.unwrap(), &request(1, 25), "_id")
            .await
            .unwrap();
        assert_eq!(page.items, vec![json!({"id": "64b7f0c2a1", "breed": "tabby"})]);
    }

    #[test]
    fn query_defaults() {
        let req = PageRequest::from_query(&query(&[]), &ResourceOptions::default(), "_id").unwrap();
        assert_eq!(req.page, 1);
        assert_eq!(req.per_page, 25);
        assert_eq!(req.sort_by, "id");
        assert_eq!(req.sort_field, "_id");
        assert_eq!(req.order, SortOrder::Descending);
    }

    #[test]
    fn order_one_descends_anything_else_ascends() {
        let opts = ResourceOptions::default();
        let desc = PageRequest::from_query(&query(&[("order", "1")]), &opts, "_id").unwrap();
        assert_eq!(desc.order, SortOrder::Descending);
        for other in ["-1", "0", "asc", ""] {
            let req = PageRequest::from_query(&query(&[("order", other)]), &opts, "_id").unwrap();
            assert_eq!(req.order, SortOrder::Ascending, "{}", other);
        }
    }

    #[test]
    fn per_page_above_ceiling_fails() {
        let opts = ResourceOptions::default();
        let err = PageRequest::from_query(&query(&[("per_page", "101")]), &opts, "_id").unwrap_err();
        assert!(matches!(err, ApiError::InvalidPagination(_)));
        let ok = PageRequest::from_query(&query(&[("per_page", "100")]), &opts, "_id").unwrap();
        assert_eq!(ok.per_page, 100);
        for bad in ["0", "-5", "ten"] {
            let err = PageRequest::from_query(&query(&[("per_page", bad)]), &opts, "_id").unwrap_err();
            assert!(matches!(err, ApiError::InvalidPagination(_)), "{}", bad);
        }
    }

    #[test]
    fn custom_sort_field_passes_through() {
        let req = PageRequest::from_query(
            &query(&[("sort_by", "name"), ("page", "3")]),
            &ResourceOptions::default(),
            "_id",
        )
        .unwrap();
        assert_eq!(req.sort_field, "name");
        assert_eq!(req.page, 3);
    }

    #[test]
    fn envelope_serializes_order_convention() {
        let env = PageEnvelope {
            page: 1,
            per_page: 25,
            total_pages: 1,
            total_entries: 0,
            sort_by: "id".into(),
            order: SortOrder::Descending,
            items: vec![],
        };
        assert_eq!(
            serde_json::to_value(&env).unwrap(),
            json!({
                "page": 1, "per_page": 25, "total_pages": 1, "total_entries": 0,
                "sort_by": "id", "order": 1, "items": []
            })
        );
    }
}
