//! Durable storage capabilities.
//!
//! Two narrow interfaces stand in for the managed storage services:
//!
//! - [`ObjectStore`] holds image bytes under a path and hands out a public
//!   retrieval address for each stored object.
//! - [`DocumentStore`] holds immutable metadata documents in named
//!   collections and answers simple equality queries with best-effort
//!   ordering.
//!
//! [`DurableStore`] wraps both and enforces the write ordering used by the
//! pipeline: object first, metadata second.

mod adapter;
mod local;
mod memory;

pub use adapter::{DurableStore, StoredObject};
pub use local::LocalObjectStore;
pub use memory::{MemoryDocumentStore, MemoryObjectStore};

use std::cmp::Ordering;

use async_trait::async_trait;
use serde_json::Value;

use crate::encoding::EncodedImage;
use crate::error::Result;

/// Field map of one metadata document.
pub type Document = serde_json::Map<String, Value>;

/// A document as returned by a [`DocumentStore`].
#[derive(Debug, Clone, PartialEq)]
pub struct StoredDocument {
    pub id: String,
    /// Store-assigned insertion sequence, increasing across the store.
    pub sequence: u64,
    pub fields: Document,
}

/// Equality filter on one top-level field.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub field: String,
    pub value: Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderBy {
    pub field: String,
    pub direction: Direction,
}

/// A document query: all filters must match.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    pub filters: Vec<Filter>,
    pub order_by: Option<OrderBy>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filters.push(Filter {
            field: field.into(),
            value: value.into(),
        });
        self
    }

    pub fn order_by(mut self, field: impl Into<String>, direction: Direction) -> Self {
        self.order_by = Some(OrderBy {
            field: field.into(),
            direction,
        });
        self
    }

    /// True when `fields` satisfies every filter.
    pub fn matches(&self, fields: &Document) -> bool {
        self.filters
            .iter()
            .all(|filter| fields.get(&filter.field) == Some(&filter.value))
    }
}

/// Query output.
#[derive(Debug, Clone, Default)]
pub struct QueryResult {
    pub documents: Vec<StoredDocument>,
    /// False when the store could not honor the requested order and the
    /// documents are in an unspecified order.
    pub ordered: bool,
}

/// Handle to a stored object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectHandle {
    pub path: String,
}

/// Content storage for image bytes.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store `image` at `path`. Writing to an existing path is an error.
    async fn put_object(&self, path: &str, image: &EncodedImage) -> Result<ObjectHandle>;

    /// Public retrieval address for a stored object.
    fn public_url(&self, handle: &ObjectHandle) -> String;

    /// Fetch a stored object, `None` if nothing is stored at `path`.
    async fn get_object(&self, path: &str) -> Result<Option<EncodedImage>>;

    /// Short backend name for logs and health output.
    fn backend_name(&self) -> &'static str;
}

/// Metadata storage for immutable documents.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Insert a document and return its generated id.
    async fn insert(&self, collection: &str, fields: Document) -> Result<String>;

    /// Run a query against one collection.
    async fn query(&self, collection: &str, query: &Query) -> Result<QueryResult>;

    /// Fetch a document by id.
    async fn get(&self, collection: &str, id: &str) -> Result<Option<StoredDocument>>;

    fn backend_name(&self) -> &'static str;
}

/// Total order over JSON field values used for sorting documents.
///
/// Missing and null sort first, then booleans, numbers, strings. Arrays and
/// objects compare equal to each other.
pub fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    fn rank(value: Option<&Value>) -> u8 {
        match value {
            None | Some(Value::Null) => 0,
            Some(Value::Bool(_)) => 1,
            Some(Value::Number(_)) => 2,
            Some(Value::String(_)) => 3,
            Some(Value::Array(_)) | Some(Value::Object(_)) => 4,
        }
    }

    match (a, b) {
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (Some(Value::Number(x)), Some(Value::Number(y))) => {
            let x = x.as_f64().unwrap_or(f64::NAN);
            let y = y.as_f64().unwrap_or(f64::NAN);
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        _ => rank(a).cmp(&rank(b)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_query_matches_all_filters() {
        let query = Query::new().filter("userId", "u1").filter("kind", "a");
        let mut fields = Document::new();
        fields.insert("userId".into(), json!("u1"));
        assert!(!query.matches(&fields));
        fields.insert("kind".into(), json!("a"));
        assert!(query.matches(&fields));
    }

    #[test]
    fn test_compare_values() {
        assert_eq!(
            compare_values(Some(&json!(1)), Some(&json!(2.5))),
            Ordering::Less
        );
        assert_eq!(
            compare_values(Some(&json!("2026-01-02")), Some(&json!("2026-01-01"))),
            Ordering::Greater
        );
        assert_eq!(compare_values(None, Some(&json!("x"))), Ordering::Less);
    }
}
