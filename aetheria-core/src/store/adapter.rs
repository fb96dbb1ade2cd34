//! Durable store adapter.
//!
//! Builds collision-free object paths and keeps object-store failures
//! distinct from metadata-store failures, so a caller knows whether the
//! object itself made it to storage.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, instrument, warn};

use super::{Document, DocumentStore, ObjectStore};
use crate::encoding::EncodedImage;
use crate::error::{AetheriaError, Result};

/// Last timestamp component handed out, shared by every adapter in the
/// process so that two adapters over the same store never collide.
static LAST_STAMP: AtomicU64 = AtomicU64::new(0);

/// Strictly increasing nanosecond timestamp.
fn next_stamp() -> u64 {
    let now = Utc::now()
        .timestamp_nanos_opt()
        .map(|nanos| nanos.max(0) as u64)
        .unwrap_or(0);

    let mut last = LAST_STAMP.load(Ordering::SeqCst);
    loop {
        let candidate = now.max(last + 1);
        match LAST_STAMP.compare_exchange_weak(last, candidate, Ordering::SeqCst, Ordering::SeqCst)
        {
            Ok(_) => return candidate,
            Err(actual) => last = actual,
        }
    }
}

/// Replace characters that could change the meaning of a path segment.
fn sanitize_segment(segment: &str) -> String {
    let cleaned: String = segment
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '@') {
                c
            } else {
                '_'
            }
        })
        .collect();

    if cleaned.chars().all(|c| c == '.') {
        "_".repeat(cleaned.len().max(1))
    } else {
        cleaned
    }
}

/// Where an object ended up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredObject {
    /// Path inside the object store.
    pub storage_path: String,
    /// Public retrieval address.
    pub url: String,
}

/// Object store and document store behind one adapter.
#[derive(Clone)]
pub struct DurableStore {
    objects: Arc<dyn ObjectStore>,
    documents: Arc<dyn DocumentStore>,
}

impl DurableStore {
    pub fn new(objects: Arc<dyn ObjectStore>, documents: Arc<dyn DocumentStore>) -> Self {
        Self { objects, documents }
    }

    pub fn objects(&self) -> &Arc<dyn ObjectStore> {
        &self.objects
    }

    pub fn documents(&self) -> &Arc<dyn DocumentStore> {
        &self.documents
    }

    /// Object path for an upload: `users/{owner}/{hint}/{stamp}.{ext}`.
    ///
    /// `path_hint` may contain `/`-separated segments; each is sanitized.
    pub fn object_path(owner: &str, path_hint: &str, image: &EncodedImage) -> String {
        let hint: Vec<String> = path_hint
            .split('/')
            .filter(|segment| !segment.is_empty())
            .map(sanitize_segment)
            .collect();

        let mut path = format!("users/{}", sanitize_segment(owner));
        for segment in hint {
            path.push('/');
            path.push_str(&segment);
        }
        format!("{path}/{}.{}", next_stamp(), image.extension())
    }

    /// Persist an image and return its retrieval address.
    #[instrument(level = "debug", skip(self, image), fields(bytes = image.len()))]
    pub async fn store(
        &self,
        image: &EncodedImage,
        owner: &str,
        path_hint: &str,
    ) -> Result<StoredObject> {
        if owner.trim().is_empty() {
            return Err(AetheriaError::Validation("owner is required".into()));
        }

        let path = Self::object_path(owner, path_hint, image);
        let handle = self
            .objects
            .put_object(&path, image)
            .await
            .map_err(|e| match e {
                AetheriaError::ObjectStore(_) => e,
                other => AetheriaError::ObjectStore(other.to_string()),
            })?;

        let url = self.objects.public_url(&handle);
        debug!(path = %handle.path, url = %url, "Object stored");
        Ok(StoredObject {
            storage_path: handle.path,
            url,
        })
    }

    /// Write one immutable metadata document.
    #[instrument(level = "debug", skip(self, fields))]
    pub async fn record_metadata(&self, collection: &str, fields: Document) -> Result<String> {
        self.documents
            .insert(collection, fields)
            .await
            .map_err(|e| {
                warn!(collection, error = %e, "Metadata write failed");
                match e {
                    AetheriaError::MetadataStore(_) => e,
                    other => AetheriaError::MetadataStore(other.to_string()),
                }
            })
    }

    /// Read back a stored object by its storage path.
    pub async fn load(&self, storage_path: &str) -> Result<EncodedImage> {
        self.objects
            .get_object(storage_path)
            .await
            .map_err(|e| match e {
                AetheriaError::ObjectStore(_) => e,
                other => AetheriaError::ObjectStore(other.to_string()),
            })?
            .ok_or_else(|| {
                AetheriaError::ObjectStore(format!("no object stored at '{storage_path}'"))
            })
    }
}
