//! Aetheria Core - upload, transform and history pipeline for an image workspace
//!
//! A user uploads a photo, optionally asks a hosted generative model to
//! enhance it or to produce stylistic variations, and browses the results
//! alongside a personal history.
//!
//! # Features
//!
//! - Data-URI transfer encoding (`data:<mediaType>;base64,<payload>`)
//! - Local raster transforms: channel-mean desaturation and aspect-preserving resize
//! - Hosted model client (Gemini) behind a mockable trait
//! - Object and document store capabilities with in-memory and filesystem backends
//! - History assembly with client-side ordering fallback
//! - Single-operation workspace session with user notifications
//!
//! # Example
//!
//! ```no_run
//! use aetheria_core::{Capabilities, EncodedImage, ImagePipeline};
//!
//! # async fn example() -> aetheria_core::Result<()> {
//! // In-memory stores and a mock model; production wires real backends.
//! let capabilities = Capabilities::mock();
//! let pipeline = ImagePipeline::new(&capabilities);
//!
//! let image = aetheria_core::encode_path(std::path::Path::new("A.png"))?;
//! let record = pipeline.upload("u1", "A.png", image.clone(), false).await?;
//!
//! let enhancement = pipeline.enhance(&record, &image).await?;
//! let variations = pipeline.stylize(&record, &image, "vaporwave").await?;
//! println!("{} -> {} (+{} variations)", record.id, enhancement.id, variations.len());
//!
//! for record in pipeline.history().list("u1").await? {
//!     println!("{} {}", record.original_file_name, record.original_image_url);
//! }
//! # Ok(())
//! # }
//! ```

pub mod encoding;
pub mod error;
#[cfg(feature = "raster")]
pub mod raster;

#[cfg(feature = "network")]
pub mod context;
#[cfg(feature = "network")]
pub mod dispatch;
#[cfg(feature = "network")]
pub mod history;
#[cfg(feature = "network")]
pub mod model;
#[cfg(feature = "network")]
pub mod pipeline;
#[cfg(feature = "network")]
pub mod records;
#[cfg(feature = "network")]
pub mod session;
#[cfg(feature = "network")]
pub mod store;

// Re-export main types for convenience
pub use encoding::{encode, encode_path, media_type_for_path, EncodedImage};
pub use error::{AetheriaError, Result};

#[cfg(feature = "network")]
pub use context::Capabilities;
#[cfg(feature = "network")]
pub use dispatch::{
    TransformDispatcher, TransformOp, TransformRequest, ENHANCE_INSTRUCTION, VARIATION_COUNT,
};
#[cfg(feature = "network")]
pub use history::{GalleryEntry, HistoryAssembler};
#[cfg(feature = "network")]
pub use model::{
    GeminiConfig, GeminiModel, GenerativeModel, MockModel, MockOutcome, ModelProviderConfig,
    ModelProviderFactory, ModelSource,
};
#[cfg(feature = "network")]
pub use pipeline::{Enhancement, ImagePipeline, Upload, Variation};
#[cfg(feature = "network")]
pub use records::{
    DerivedKind, DerivedRecord, EnhancementRecord, ImageRecord, VariationRecord, IMAGE_RECORDS,
};
#[cfg(feature = "network")]
pub use session::{
    Notification, NotificationLevel, OperationKind, SessionState, ViewState, Workspace,
};
#[cfg(feature = "network")]
pub use store::{
    DocumentStore, DurableStore, LocalObjectStore, MemoryDocumentStore, MemoryObjectStore,
    ObjectStore,
};

#[cfg(all(test, feature = "network"))]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn sample_png() -> EncodedImage {
        let pixels = image::RgbaImage::from_fn(8, 6, |x, y| {
            image::Rgba([(x * 30) as u8, (y * 40) as u8, 90, 255])
        });
        raster::encode_png(&image::DynamicImage::ImageRgba8(pixels)).expect("encode png")
    }

    /// Upload, enhance and stylize, then read everything back through history.
    #[tokio::test]
    async fn test_full_workflow() {
        let model = Arc::new(MockModel::with_script([
            MockOutcome::Image,
            MockOutcome::Image,
            MockOutcome::Empty,
            MockOutcome::Image,
        ]));
        let capabilities = Capabilities::in_memory(model.clone());
        let pipeline = ImagePipeline::new(&capabilities);
        let image = sample_png();

        let record = pipeline
            .upload("u1", "A.png", image.clone(), false)
            .await
            .expect("upload");
        let enhancement = pipeline.enhance(&record, &image).await.expect("enhance");
        let variations = pipeline
            .stylize(&record, &image, "ukiyo-e")
            .await
            .expect("stylize");

        assert_eq!(variations.len(), 2);
        assert_eq!(model.call_count(), 4);

        let gallery = pipeline.history().gallery("u1").await.expect("gallery");
        assert_eq!(gallery.len(), 1);
        assert_eq!(gallery[0].record, record);
        assert_eq!(gallery[0].enhancements, vec![enhancement]);
        assert_eq!(gallery[0].variations.len(), 2);
    }

    /// Data URIs survive the trip through JSON unchanged.
    #[test]
    fn test_data_uri_in_json_body() {
        let image = sample_png();
        let body = serde_json::json!({ "photoDataUri": image.to_data_uri() });
        let uri = body["photoDataUri"].as_str().expect("string");
        assert_eq!(EncodedImage::from_data_uri(uri).expect("parse"), image);
    }
}
