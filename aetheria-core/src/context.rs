//! Capability bundle.
//!
//! Platform handles are built once at startup and passed explicitly to the
//! components that need them, so tests can substitute fakes.

use std::sync::Arc;

use crate::model::{GenerativeModel, MockModel};
use crate::store::{DocumentStore, MemoryDocumentStore, MemoryObjectStore, ObjectStore};

#[derive(Clone)]
pub struct Capabilities {
    pub objects: Arc<dyn ObjectStore>,
    pub documents: Arc<dyn DocumentStore>,
    pub model: Arc<dyn GenerativeModel>,
}

impl Capabilities {
    pub fn new(
        objects: Arc<dyn ObjectStore>,
        documents: Arc<dyn DocumentStore>,
        model: Arc<dyn GenerativeModel>,
    ) -> Self {
        Self {
            objects,
            documents,
            model,
        }
    }

    /// In-memory stores around the given model.
    pub fn in_memory(model: Arc<dyn GenerativeModel>) -> Self {
        Self::new(
            Arc::new(MemoryObjectStore::new()),
            Arc::new(MemoryDocumentStore::new()),
            model,
        )
    }

    /// In-memory stores and an echoing mock model.
    pub fn mock() -> Self {
        Self::in_memory(Arc::new(MockModel::new()))
    }
}

impl std::fmt::Debug for Capabilities {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Capabilities")
            .field("objects", &self.objects.backend_name())
            .field("documents", &self.documents.backend_name())
            .field("model", &self.model.source_id())
            .finish()
    }
}
