//! In-memory store backends.
//!
//! Used by tests and by the server when no database is configured. Both
//! stores support fault injection so callers can exercise failure paths.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;
use tracing::debug;
use uuid::Uuid;

use super::{
    compare_values, Direction, Document, DocumentStore, ObjectHandle, ObjectStore, Query,
    QueryResult, StoredDocument,
};
use crate::encoding::EncodedImage;
use crate::error::{AetheriaError, Result};

/// Base of the retrieval addresses handed out by [`MemoryObjectStore`].
const MEMORY_BASE_URL: &str = "memory://objects";

/// Object store backed by a concurrent map.
#[derive(Default)]
pub struct MemoryObjectStore {
    objects: DashMap<String, EncodedImage>,
    fail_puts: AtomicBool,
    fail_gets: AtomicBool,
    puts: AtomicUsize,
    /// Successful puts allowed before every later put fails; 0 means no limit.
    put_budget: AtomicUsize,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent `put_object` fail.
    pub fn set_fail_puts(&self, fail: bool) {
        self.fail_puts.store(fail, Ordering::SeqCst);
    }

    /// Make every subsequent `get_object` fail.
    pub fn set_fail_gets(&self, fail: bool) {
        self.fail_gets.store(fail, Ordering::SeqCst);
    }

    /// Let `count` more writes succeed, then fail every write after them.
    pub fn fail_puts_after(&self, count: usize) {
        self.put_budget
            .store(self.put_count() + count + 1, Ordering::SeqCst);
    }

    /// Number of successful writes.
    pub fn put_count(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn put_object(&self, path: &str, image: &EncodedImage) -> Result<ObjectHandle> {
        let budget = self.put_budget.load(Ordering::SeqCst);
        if self.fail_puts.load(Ordering::SeqCst) || (budget > 0 && self.put_count() + 1 >= budget)
        {
            return Err(AetheriaError::ObjectStore(format!(
                "simulated write failure for '{path}'"
            )));
        }

        match self.objects.entry(path.to_string()) {
            dashmap::mapref::entry::Entry::Occupied(_) => Err(AetheriaError::ObjectStore(
                format!("object already exists at '{path}'"),
            )),
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(image.clone());
                self.puts.fetch_add(1, Ordering::SeqCst);
                debug!(path, bytes = image.len(), "Stored object in memory");
                Ok(ObjectHandle {
                    path: path.to_string(),
                })
            }
        }
    }

    fn public_url(&self, handle: &ObjectHandle) -> String {
        format!("{MEMORY_BASE_URL}/{}", handle.path)
    }

    async fn get_object(&self, path: &str) -> Result<Option<EncodedImage>> {
        if self.fail_gets.load(Ordering::SeqCst) {
            return Err(AetheriaError::ObjectStore(format!(
                "simulated read failure for '{path}'"
            )));
        }
        Ok(self.objects.get(path).map(|entry| entry.value().clone()))
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

/// Document store backed by a concurrent map of collections.
///
/// Ordering is only honored when every filter is on the ordering field
/// (or there are no filters). Any other combination returns documents in
/// insertion order with `ordered = false`, the way hosted document stores
/// behave when a composite index is missing.
#[derive(Default)]
pub struct MemoryDocumentStore {
    collections: DashMap<String, Vec<StoredDocument>>,
    sequence: AtomicU64,
    fail_inserts: AtomicBool,
    fail_queries: AtomicBool,
    inserts: AtomicUsize,
    /// Successful inserts allowed before every later insert fails; 0 means no limit.
    insert_budget: AtomicUsize,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent `insert` fail.
    pub fn set_fail_inserts(&self, fail: bool) {
        self.fail_inserts.store(fail, Ordering::SeqCst);
    }

    /// Let `count` more inserts succeed, then fail every insert after them.
    pub fn fail_inserts_after(&self, count: usize) {
        self.insert_budget
            .store(self.insert_count() + count + 1, Ordering::SeqCst);
    }

    /// Make every subsequent `query` and `get` fail.
    pub fn set_fail_queries(&self, fail: bool) {
        self.fail_queries.store(fail, Ordering::SeqCst);
    }

    /// Number of successful inserts across all collections.
    pub fn insert_count(&self) -> usize {
        self.inserts.load(Ordering::SeqCst)
    }

    /// Number of documents in one collection.
    pub fn collection_len(&self, collection: &str) -> usize {
        self.collections
            .get(collection)
            .map(|docs| docs.len())
            .unwrap_or(0)
    }

    fn check_reads(&self) -> Result<()> {
        if self.fail_queries.load(Ordering::SeqCst) {
            return Err(AetheriaError::MetadataStore(
                "simulated read failure".into(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn insert(&self, collection: &str, fields: Document) -> Result<String> {
        let budget = self.insert_budget.load(Ordering::SeqCst);
        if self.fail_inserts.load(Ordering::SeqCst)
            || (budget > 0 && self.insert_count() + 1 >= budget)
        {
            return Err(AetheriaError::MetadataStore(format!(
                "simulated write failure for collection '{collection}'"
            )));
        }

        let id = Uuid::new_v4().to_string();
        let sequence = self.sequence.fetch_add(1, Ordering::SeqCst) + 1;
        self.collections
            .entry(collection.to_string())
            .or_default()
            .push(StoredDocument {
                id: id.clone(),
                sequence,
                fields,
            });
        self.inserts.fetch_add(1, Ordering::SeqCst);
        debug!(collection, id = %id, sequence, "Inserted document");
        Ok(id)
    }

    async fn query(&self, collection: &str, query: &Query) -> Result<QueryResult> {
        self.check_reads()?;

        let mut documents: Vec<StoredDocument> = self
            .collections
            .get(collection)
            .map(|docs| {
                docs.iter()
                    .filter(|doc| query.matches(&doc.fields))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        let ordered = match &query.order_by {
            None => true,
            Some(order) if query.filters.iter().all(|f| f.field == order.field) => {
                documents.sort_by(|a, b| {
                    let by_field =
                        compare_values(a.fields.get(&order.field), b.fields.get(&order.field));
                    let by_field = match order.direction {
                        Direction::Ascending => by_field,
                        Direction::Descending => by_field.reverse(),
                    };
                    by_field.then(a.sequence.cmp(&b.sequence))
                });
                true
            }
            Some(order) => {
                debug!(
                    collection,
                    order_field = %order.field,
                    "No index for filter and order combination, returning unordered"
                );
                false
            }
        };

        Ok(QueryResult { documents, ordered })
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<StoredDocument>> {
        self.check_reads()?;
        Ok(self
            .collections
            .get(collection)
            .and_then(|docs| docs.iter().find(|doc| doc.id == id).cloned()))
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(pairs: &[(&str, serde_json::Value)]) -> Document {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[tokio::test]
    async fn test_object_store_put_get() {
        let store = MemoryObjectStore::new();
        let image = EncodedImage::new("image/png", vec![1, 2]);

        let handle = store.put_object("users/u1/a.png", &image).await.unwrap();
        assert_eq!(store.public_url(&handle), "memory://objects/users/u1/a.png");
        assert_eq!(
            store.get_object("users/u1/a.png").await.unwrap(),
            Some(image.clone())
        );
        assert_eq!(store.get_object("missing").await.unwrap(), None);

        assert!(store.put_object("users/u1/a.png", &image).await.is_err());
        assert_eq!(store.put_count(), 1);
    }

    #[tokio::test]
    async fn test_object_store_fault_injection() {
        let store = MemoryObjectStore::new();
        store.set_fail_puts(true);
        let err = store
            .put_object("p", &EncodedImage::new("image/png", vec![]))
            .await
            .unwrap_err();
        assert!(matches!(err, AetheriaError::ObjectStore(_)));
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_object_store_fails_after_budget() {
        let store = MemoryObjectStore::new();
        let image = EncodedImage::new("image/png", vec![1]);
        store.put_object("before", &image).await.unwrap();

        store.fail_puts_after(1);
        store.put_object("a", &image).await.unwrap();
        assert!(store.put_object("b", &image).await.is_err());
        assert!(store.put_object("c", &image).await.is_err());
        assert_eq!(store.put_count(), 2);
    }

    #[tokio::test]
    async fn test_filter_and_order_on_different_fields_is_unordered() {
        let store = MemoryDocumentStore::new();
        store
            .insert("c", doc(&[("owner", json!("a")), ("ts", json!(1))]))
            .await
            .unwrap();
        store
            .insert("c", doc(&[("owner", json!("b")), ("ts", json!(3))]))
            .await
            .unwrap();
        store
            .insert("c", doc(&[("owner", json!("a")), ("ts", json!(2))]))
            .await
            .unwrap();

        let query = Query::new()
            .filter("owner", "a")
            .order_by("ts", Direction::Descending);
        let result = store.query("c", &query).await.unwrap();
        assert!(!result.ordered);
        assert_eq!(result.documents.len(), 2);
        // insertion order
        assert_eq!(result.documents[0].fields["ts"], json!(1));

        let query = Query::new().order_by("ts", Direction::Descending);
        let result = store.query("c", &query).await.unwrap();
        assert!(result.ordered);
        let ts: Vec<_> = result.documents.iter().map(|d| d.fields["ts"].clone()).collect();
        assert_eq!(ts, vec![json!(3), json!(2), json!(1)]);
    }

    #[tokio::test]
    async fn test_document_store_get_and_counts() {
        let store = MemoryDocumentStore::new();
        let id = store.insert("c", doc(&[("k", json!("v"))])).await.unwrap();

        let found = store.get("c", &id).await.unwrap().unwrap();
        assert_eq!(found.fields["k"], json!("v"));
        assert!(store.get("c", "nope").await.unwrap().is_none());
        assert!(store.get("other", &id).await.unwrap().is_none());
        assert_eq!(store.insert_count(), 1);
        assert_eq!(store.collection_len("c"), 1);

        store.set_fail_inserts(true);
        assert!(matches!(
            store.insert("c", Document::new()).await,
            Err(AetheriaError::MetadataStore(_))
        ));
        assert_eq!(store.insert_count(), 1);
    }

    #[tokio::test]
    async fn test_document_store_fails_after_budget() {
        let store = MemoryDocumentStore::new();
        store.insert("c", Document::new()).await.unwrap();

        store.fail_inserts_after(0);
        assert!(store.insert("c", Document::new()).await.is_err());
        assert_eq!(store.collection_len("c"), 1);
    }
}
