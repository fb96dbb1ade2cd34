//! Upload, transform and record.
//!
//! Every operation that persists anything writes the object first and the
//! metadata document second. If the object write fails no document is
//! created; if the document write fails the object stays in storage and the
//! error says so.
//!
//! Stylize stores every output object before it writes any metadata, so an
//! object-store failure leaves history untouched. Once one variation has
//! been recorded the operation can no longer fail: a later metadata failure
//! skips that variation, the same way a failed model call does.

use tracing::{info, instrument, warn};

use crate::context::Capabilities;
use crate::dispatch::{TransformDispatcher, TransformOp, TransformRequest};
use crate::encoding::EncodedImage;
use crate::error::{AetheriaError, Result};
use crate::history::HistoryAssembler;
use crate::records::{
    self, to_fields, DerivedKind, EnhancementRecord, ImageRecord, VariationRecord, IMAGE_RECORDS,
};
use crate::store::DurableStore;

/// Path hint for uploaded originals.
const UPLOADS: &str = "uploads";
/// Path hint for upload-time black-and-white renditions.
const TRANSFORMED: &str = "transformed";

/// Result of an upload.
#[derive(Debug, Clone)]
pub struct Upload {
    pub record: ImageRecord,
    /// Black-and-white rendition, when one was requested.
    pub transformed: Option<EncodedImage>,
}

/// A recorded enhancement together with the image it describes.
#[derive(Debug, Clone)]
pub struct Enhancement {
    pub record: EnhancementRecord,
    pub image: EncodedImage,
}

/// A recorded variation together with the image it describes.
#[derive(Debug, Clone)]
pub struct Variation {
    pub record: VariationRecord,
    pub image: EncodedImage,
}

#[derive(Clone)]
pub struct ImagePipeline {
    store: DurableStore,
    history: HistoryAssembler,
    dispatcher: TransformDispatcher,
}

impl ImagePipeline {
    pub fn new(capabilities: &Capabilities) -> Self {
        Self {
            store: DurableStore::new(
                capabilities.objects.clone(),
                capabilities.documents.clone(),
            ),
            history: HistoryAssembler::new(capabilities.documents.clone()),
            dispatcher: TransformDispatcher::new(capabilities.model.clone()),
        }
    }

    pub fn with_variation_count(mut self, count: usize) -> Self {
        self.dispatcher = self.dispatcher.with_variation_count(count);
        self
    }

    pub fn store(&self) -> &DurableStore {
        &self.store
    }

    pub fn history(&self) -> &HistoryAssembler {
        &self.history
    }

    pub fn dispatcher(&self) -> &TransformDispatcher {
        &self.dispatcher
    }

    /// Store an uploaded image and record it.
    ///
    /// With `desaturate`, a black-and-white rendition is computed before
    /// anything is written and stored alongside the original.
    pub async fn upload(
        &self,
        owner: &str,
        file_name: &str,
        image: EncodedImage,
        desaturate: bool,
    ) -> Result<ImageRecord> {
        Ok(self
            .upload_with_output(owner, file_name, image, desaturate)
            .await?
            .record)
    }

    /// Like [`upload`](Self::upload), also handing back the rendition.
    #[instrument(level = "info", skip(self, image), fields(bytes = image.len(), media_type = %image.media_type()))]
    pub async fn upload_with_output(
        &self,
        owner: &str,
        file_name: &str,
        image: EncodedImage,
        desaturate: bool,
    ) -> Result<Upload> {
        if image.is_empty() {
            return Err(AetheriaError::Validation("No image data provided.".into()));
        }
        if file_name.trim().is_empty() {
            return Err(AetheriaError::Validation("A file name is required.".into()));
        }

        let transformed = if desaturate {
            let request = TransformRequest::new(TransformOp::Desaturate, image.clone(), owner);
            self.dispatcher.apply(&request).await?.into_iter().next()
        } else {
            None
        };

        let original = self.store.store(&image, owner, UPLOADS).await?;
        let stored_transform = match &transformed {
            Some(output) => Some(self.store.store(output, owner, TRANSFORMED).await?),
            None => None,
        };

        let mut record = ImageRecord {
            id: String::new(),
            user_id: owner.to_string(),
            original_image_url: original.url,
            storage_path: original.storage_path,
            original_file_name: file_name.to_string(),
            media_type: image.media_type().to_string(),
            transformed_image_url: stored_transform.as_ref().map(|t| t.url.clone()),
            transformed_storage_path: stored_transform.map(|t| t.storage_path),
            created_at: records::now(),
        };
        record.id = self
            .store
            .record_metadata(IMAGE_RECORDS, to_fields(&record)?)
            .await?;

        info!(id = %record.id, path = %record.storage_path, "Image uploaded");
        Ok(Upload {
            record,
            transformed,
        })
    }

    /// Read back the original bytes of a record.
    pub async fn load_source(&self, record: &ImageRecord) -> Result<EncodedImage> {
        self.store.load(&record.storage_path).await
    }

    /// Enhance `source` and record the single output under `parent`.
    pub async fn enhance(
        &self,
        parent: &ImageRecord,
        source: &EncodedImage,
    ) -> Result<EnhancementRecord> {
        Ok(self.enhance_with_output(parent, source).await?.record)
    }

    /// Like [`enhance`](Self::enhance), also handing back the output image.
    #[instrument(level = "info", skip(self, parent, source), fields(parent = %parent.id))]
    pub async fn enhance_with_output(
        &self,
        parent: &ImageRecord,
        source: &EncodedImage,
    ) -> Result<Enhancement> {
        let request = TransformRequest::new(TransformOp::Enhance, source.clone(), &parent.user_id);
        let output = self
            .dispatcher
            .apply(&request)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| AetheriaError::Transform("the model returned no image".into()))?;

        let hint = format!("{}/{}", DerivedKind::Enhancements, parent.id);
        let stored = self.store.store(&output, &parent.user_id, &hint).await?;

        let mut record = EnhancementRecord {
            id: String::new(),
            image_record_id: parent.id.clone(),
            user_id: parent.user_id.clone(),
            enhanced_image_url: stored.url,
            storage_path: stored.storage_path,
            media_type: output.media_type().to_string(),
            created_at: records::now(),
        };
        record.id = self
            .store
            .record_metadata(DerivedKind::Enhancements.collection(), to_fields(&record)?)
            .await?;

        info!(id = %record.id, "Enhancement recorded");
        Ok(Enhancement {
            record,
            image: output,
        })
    }

    /// Generate stylistic variations of `source` and record each one that
    /// the model produced.
    pub async fn stylize(
        &self,
        parent: &ImageRecord,
        source: &EncodedImage,
        prompt: &str,
    ) -> Result<Vec<VariationRecord>> {
        Ok(self
            .stylize_with_output(parent, source, prompt)
            .await?
            .into_iter()
            .map(|variation| variation.record)
            .collect())
    }

    /// Like [`stylize`](Self::stylize), also handing back the output images.
    #[instrument(level = "info", skip(self, parent, source), fields(parent = %parent.id))]
    pub async fn stylize_with_output(
        &self,
        parent: &ImageRecord,
        source: &EncodedImage,
        prompt: &str,
    ) -> Result<Vec<Variation>> {
        let request = TransformRequest::new(
            TransformOp::Stylize {
                prompt: prompt.to_string(),
            },
            source.clone(),
            &parent.user_id,
        );
        let outputs = self.dispatcher.apply(&request).await?;

        let hint = format!("{}/{}", DerivedKind::Variations, parent.id);
        let mut stored = Vec::with_capacity(outputs.len());
        for output in outputs {
            let object = self.store.store(&output, &parent.user_id, &hint).await?;
            stored.push((object, output));
        }

        let mut recorded: Vec<Variation> = Vec::with_capacity(stored.len());
        for (object, output) in stored {
            let mut record = VariationRecord {
                id: String::new(),
                image_record_id: parent.id.clone(),
                user_id: parent.user_id.clone(),
                variation_image_url: object.url,
                storage_path: object.storage_path,
                media_type: output.media_type().to_string(),
                style_name: prompt.to_string(),
                created_at: records::now(),
            };
            let fields = to_fields(&record)?;
            match self
                .store
                .record_metadata(DerivedKind::Variations.collection(), fields)
                .await
            {
                Ok(id) => record.id = id,
                Err(e) if recorded.is_empty() => return Err(e),
                Err(e) => {
                    warn!(path = %record.storage_path, error = %e, "Variation not recorded, skipping");
                    continue;
                }
            }
            recorded.push(Variation {
                record,
                image: output,
            });
        }

        info!(count = recorded.len(), "Variations recorded");
        Ok(recorded)
    }

    /// Apply a local transform without persisting anything.
    pub async fn preview(
        &self,
        operation: TransformOp,
        source: EncodedImage,
        owner: &str,
    ) -> Result<EncodedImage> {
        if operation.is_remote() {
            return Err(AetheriaError::Validation(format!(
                "'{operation}' is not a local transform"
            )));
        }
        let request = TransformRequest::new(operation, source, owner);
        self.dispatcher
            .apply(&request)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| AetheriaError::Transform("local transform produced no output".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{MockModel, MockOutcome};
    use crate::raster;
    use crate::store::{MemoryDocumentStore, MemoryObjectStore};
    use std::sync::Arc;

    struct Fixture {
        pipeline: ImagePipeline,
        objects: Arc<MemoryObjectStore>,
        documents: Arc<MemoryDocumentStore>,
    }

    fn fixture(model: MockModel) -> Fixture {
        let objects = Arc::new(MemoryObjectStore::new());
        let documents = Arc::new(MemoryDocumentStore::new());
        let capabilities = Capabilities::new(objects.clone(), documents.clone(), Arc::new(model));
        Fixture {
            pipeline: ImagePipeline::new(&capabilities),
            objects,
            documents,
        }
    }

    fn png() -> EncodedImage {
        let pixels = image::RgbaImage::from_pixel(4, 3, image::Rgba([200, 10, 30, 255]));
        raster::encode_png(&image::DynamicImage::ImageRgba8(pixels)).unwrap()
    }

    #[tokio::test]
    async fn test_upload_with_desaturate_stores_both() {
        let f = fixture(MockModel::new());
        let record = f.pipeline.upload("u1", "A.png", png(), true).await.unwrap();

        assert_eq!(f.objects.put_count(), 2);
        assert_eq!(f.documents.insert_count(), 1);
        assert!(record.transformed_image_url.is_some());
        let transformed_path = record.transformed_storage_path.clone().unwrap();
        assert!(transformed_path.starts_with("users/u1/transformed/"));
        assert_ne!(transformed_path, record.storage_path);
    }

    #[tokio::test]
    async fn test_upload_undecodable_with_desaturate_writes_nothing() {
        let f = fixture(MockModel::new());
        let garbage = EncodedImage::new("image/png", b"not an image".to_vec());
        let err = f.pipeline.upload("u1", "x.png", garbage, true).await.unwrap_err();

        assert!(matches!(err, AetheriaError::Decode(_)));
        assert_eq!(f.objects.put_count(), 0);
        assert_eq!(f.documents.insert_count(), 0);
    }

    #[tokio::test]
    async fn test_metadata_failure_leaves_object_stored() {
        let f = fixture(MockModel::new());
        f.documents.set_fail_inserts(true);
        let err = f.pipeline.upload("u1", "A.png", png(), false).await.unwrap_err();

        assert!(matches!(err, AetheriaError::MetadataStore(_)));
        assert_eq!(f.objects.put_count(), 1);
    }

    #[tokio::test]
    async fn test_enhance_failure_records_nothing() {
        let f = fixture(MockModel::with_script([MockOutcome::Image, MockOutcome::Fail]));
        let record = f.pipeline.upload("u1", "A.png", png(), false).await.unwrap();
        let source = f.pipeline.load_source(&record).await.unwrap();

        f.pipeline.enhance(&record, &source).await.unwrap();
        assert!(f.pipeline.enhance(&record, &source).await.is_err());
        assert_eq!(f.documents.collection_len("enhancements"), 1);
    }

    #[tokio::test]
    async fn test_stylize_outputs_match_stored_objects() {
        let f = fixture(MockModel::new());
        let record = f.pipeline.upload("u1", "A.png", png(), false).await.unwrap();

        let variations = f
            .pipeline
            .stylize_with_output(&record, &png(), "noir")
            .await
            .unwrap();
        assert_eq!(variations.len(), 3);
        for variation in &variations {
            let stored = f.pipeline.store().load(&variation.record.storage_path).await.unwrap();
            assert_eq!(stored, variation.image);
        }
    }

    #[tokio::test]
    async fn test_stylize_metadata_failure_before_any_record_fails() {
        let f = fixture(MockModel::new());
        let record = f.pipeline.upload("u1", "A.png", png(), false).await.unwrap();
        f.documents.set_fail_inserts(true);

        let err = f.pipeline.stylize(&record, &png(), "noir").await.unwrap_err();
        assert!(matches!(err, AetheriaError::MetadataStore(_)));
        assert_eq!(f.documents.collection_len("variations"), 0);
    }

    #[tokio::test]
    async fn test_preview_rejects_remote_ops() {
        let f = fixture(MockModel::new());
        assert!(f.pipeline.preview(TransformOp::Enhance, png(), "u1").await.is_err());
        let gray = f.pipeline.preview(TransformOp::Desaturate, png(), "u1").await.unwrap();
        assert_eq!(gray.media_type(), "image/png");
        assert_eq!(f.objects.put_count(), 0);
    }
}
