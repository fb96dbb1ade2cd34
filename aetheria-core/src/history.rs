//! History assembly.
//!
//! Reads metadata records back for an owner or a parent image and returns
//! them newest first. Stores that cannot order a filtered query report the
//! result as unordered and the assembler sorts it locally: creation time
//! descending, ties kept in insertion order.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, instrument};

use crate::error::{AetheriaError, Result};
use crate::records::{
    from_document, DerivedKind, DerivedRecord, EnhancementRecord, ImageRecord, VariationRecord,
    IMAGE_RECORDS, OWNER_FIELD, PARENT_FIELD, TIMESTAMP_FIELD,
};
use crate::store::{Direction, DocumentStore, Query, QueryResult};

/// One uploaded image with everything derived from it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GalleryEntry {
    pub record: ImageRecord,
    pub enhancements: Vec<EnhancementRecord>,
    pub variations: Vec<VariationRecord>,
}

/// Sort `(created_at, sequence, item)` newest first, ties by sequence.
fn newest_first<T>(mut items: Vec<(DateTime<Utc>, u64, T)>) -> Vec<T> {
    items.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));
    items.into_iter().map(|(_, _, item)| item).collect()
}

#[derive(Clone)]
pub struct HistoryAssembler {
    documents: Arc<dyn DocumentStore>,
}

impl HistoryAssembler {
    pub fn new(documents: Arc<dyn DocumentStore>) -> Self {
        Self { documents }
    }

    async fn run(&self, collection: &str, query: &Query) -> Result<QueryResult> {
        self.documents
            .query(collection, query)
            .await
            .map_err(|e| match e {
                AetheriaError::MetadataStore(_) => e,
                other => AetheriaError::MetadataStore(other.to_string()),
            })
    }

    /// Image records owned by `owner`, newest first.
    #[instrument(level = "debug", skip(self))]
    pub async fn list(&self, owner: &str) -> Result<Vec<ImageRecord>> {
        let query = Query::new()
            .filter(OWNER_FIELD, owner)
            .order_by(TIMESTAMP_FIELD, Direction::Descending);
        let result = self.run(IMAGE_RECORDS, &query).await?;
        let ordered = result.ordered;

        let records = result
            .documents
            .into_iter()
            .map(|doc| {
                let sequence = doc.sequence;
                from_document::<ImageRecord>(doc).map(|r| (r.created_at, sequence, r))
            })
            .collect::<Result<Vec<_>>>()?;

        debug!(count = records.len(), ordered, "Listed image records");
        Ok(if ordered {
            records.into_iter().map(|(_, _, r)| r).collect()
        } else {
            newest_first(records)
        })
    }

    /// One image record, only if it belongs to `owner`.
    pub async fn get(&self, owner: &str, id: &str) -> Result<Option<ImageRecord>> {
        let doc = self
            .documents
            .get(IMAGE_RECORDS, id)
            .await
            .map_err(|e| match e {
                AetheriaError::MetadataStore(_) => e,
                other => AetheriaError::MetadataStore(other.to_string()),
            })?;

        match doc {
            Some(doc) => {
                let record: ImageRecord = from_document(doc)?;
                Ok((record.user_id == owner).then_some(record))
            }
            None => Ok(None),
        }
    }

    /// Derived records of one kind whose parent is `parent_id`, newest first.
    #[instrument(level = "debug", skip(self))]
    pub async fn list_children(
        &self,
        parent_id: &str,
        kind: DerivedKind,
    ) -> Result<Vec<DerivedRecord>> {
        let query = Query::new()
            .filter(PARENT_FIELD, parent_id)
            .order_by(TIMESTAMP_FIELD, Direction::Descending);
        let result = self.run(kind.collection(), &query).await?;
        let ordered = result.ordered;

        let records = result
            .documents
            .into_iter()
            .map(|doc| {
                let sequence = doc.sequence;
                DerivedRecord::from_document(kind, doc).map(|r| (r.created_at(), sequence, r))
            })
            .collect::<Result<Vec<_>>>()?;

        debug!(count = records.len(), ordered, "Listed derived records");
        Ok(if ordered {
            records.into_iter().map(|(_, _, r)| r).collect()
        } else {
            newest_first(records)
        })
    }

    pub async fn enhancements(&self, parent_id: &str) -> Result<Vec<EnhancementRecord>> {
        Ok(self
            .list_children(parent_id, DerivedKind::Enhancements)
            .await?
            .into_iter()
            .filter_map(|r| match r {
                DerivedRecord::Enhancement(e) => Some(e),
                DerivedRecord::Variation(_) => None,
            })
            .collect())
    }

    pub async fn variations(&self, parent_id: &str) -> Result<Vec<VariationRecord>> {
        Ok(self
            .list_children(parent_id, DerivedKind::Variations)
            .await?
            .into_iter()
            .filter_map(|r| match r {
                DerivedRecord::Variation(v) => Some(v),
                DerivedRecord::Enhancement(_) => None,
            })
            .collect())
    }

    /// Every image of `owner` with its derived records.
    pub async fn gallery(&self, owner: &str) -> Result<Vec<GalleryEntry>> {
        let records = self.list(owner).await?;
        let mut entries = Vec::with_capacity(records.len());
        for record in records {
            let enhancements = self.enhancements(&record.id).await?;
            let variations = self.variations(&record.id).await?;
            entries.push(GalleryEntry {
                record,
                enhancements,
                variations,
            });
        }
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::to_fields;
    use crate::store::MemoryDocumentStore;
    use chrono::TimeZone;

    fn image(owner: &str, name: &str, secs: u32) -> ImageRecord {
        ImageRecord {
            id: String::new(),
            user_id: owner.into(),
            original_image_url: format!("memory://objects/{name}"),
            storage_path: name.into(),
            original_file_name: name.into(),
            media_type: "image/png".into(),
            transformed_image_url: None,
            transformed_storage_path: None,
            created_at: Utc.with_ymd_and_hms(2026, 5, 1, 10, 0, secs).unwrap(),
        }
    }

    async fn seed(store: &MemoryDocumentStore, record: &ImageRecord) -> String {
        store
            .insert(IMAGE_RECORDS, to_fields(record).unwrap())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_list_sorts_unordered_results() {
        let store = Arc::new(MemoryDocumentStore::new());
        seed(&store, &image("u1", "old.png", 1)).await;
        seed(&store, &image("u2", "other.png", 5)).await;
        seed(&store, &image("u1", "new.png", 9)).await;
        seed(&store, &image("u1", "tie-a.png", 4)).await;
        seed(&store, &image("u1", "tie-b.png", 4)).await;

        let history = HistoryAssembler::new(store);
        let names: Vec<_> = history
            .list("u1")
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.original_file_name)
            .collect();
        assert_eq!(names, vec!["new.png", "tie-a.png", "tie-b.png", "old.png"]);
    }

    #[tokio::test]
    async fn test_list_empty_owner_is_ok() {
        let history = HistoryAssembler::new(Arc::new(MemoryDocumentStore::new()));
        assert!(history.list("nobody").await.unwrap().is_empty());
        assert!(history.gallery("nobody").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_get_is_owner_scoped() {
        let store = Arc::new(MemoryDocumentStore::new());
        let id = seed(&store, &image("u1", "a.png", 1)).await;
        let history = HistoryAssembler::new(store);

        assert_eq!(history.get("u1", &id).await.unwrap().unwrap().id, id);
        assert!(history.get("u2", &id).await.unwrap().is_none());
        assert!(history.get("u1", "missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_read_failure_is_metadata_error() {
        let store = Arc::new(MemoryDocumentStore::new());
        store.set_fail_queries(true);
        let history = HistoryAssembler::new(store);
        assert!(matches!(
            history.list("u1").await,
            Err(AetheriaError::MetadataStore(_))
        ));
    }
}
