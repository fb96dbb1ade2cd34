//! Application state module
//!
//! Defines shared state accessible across all request handlers.

use std::sync::Arc;

use aetheria_core::store::ObjectStore;
use aetheria_core::{Capabilities, ImagePipeline, ModelSource};

use crate::config::Config;

/// Application state containing shared resources.
#[derive(Clone)]
pub struct AppState {
    /// Upload, transform and history pipeline
    pub pipeline: Arc<ImagePipeline>,
    /// Object store, read directly when serving stored objects
    pub objects: Arc<dyn ObjectStore>,
    /// Which model backend answers transform requests
    pub model_source: ModelSource,
    /// Document store backend name, for readiness output
    pub document_backend: &'static str,
    /// Maximum file size per upload in bytes
    pub max_file_size: usize,
}

impl AppState {
    pub fn from_capabilities(capabilities: &Capabilities, config: &Config) -> Self {
        let pipeline =
            ImagePipeline::new(capabilities).with_variation_count(config.variation_count);
        Self {
            pipeline: Arc::new(pipeline),
            objects: capabilities.objects.clone(),
            model_source: capabilities.model.source_id(),
            document_backend: capabilities.documents.backend_name(),
            max_file_size: config.max_file_size_mb * 1024 * 1024,
        }
    }

    /// In-memory stores and the echoing mock model.
    pub fn for_testing() -> Self {
        Self::from_capabilities(&Capabilities::mock(), &Config::default())
    }
}
