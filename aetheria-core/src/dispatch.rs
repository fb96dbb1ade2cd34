//! Transform dispatch.
//!
//! A [`TransformRequest`] names one operation and carries the source image.
//! The [`TransformDispatcher`] routes it to the hosted model (`enhance`,
//! `stylize`) or to a local raster transform (`desaturate`, `identity`,
//! `resize`) and returns the outputs.
//!
//! The two remote operations have different failure policies:
//!
//! - `enhance` is all-or-nothing. A failed call or an imageless answer is a
//!   [`AetheriaError::Transform`].
//! - `stylize` is best effort. Each of the independent calls that fails or
//!   answers without an image is skipped, so the result holds between zero
//!   and `variation_count` images.

use std::fmt;
use std::sync::Arc;

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::encoding::EncodedImage;
use crate::error::{AetheriaError, Result};
use crate::model::GenerativeModel;
use crate::raster;

/// Instruction sent with every enhancement call.
pub const ENHANCE_INSTRUCTION: &str = "enhance this image, upscale it and denoise it";

/// Number of stylistic variations requested per stylize call.
pub const VARIATION_COUNT: usize = 3;

/// Max width used by the `identity` passthrough.
pub const DEFAULT_MAX_WIDTH: u32 = 1024;

/// Instruction sent with each stylize call.
pub fn stylize_instruction(prompt: &str) -> String {
    format!("Generate an image of this character in the style of: {prompt}")
}

/// A requested transform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "operation", rename_all = "camelCase")]
pub enum TransformOp {
    /// Upscale and denoise through the hosted model.
    Enhance,
    /// Generate stylistic variations from a free-text prompt.
    Stylize { prompt: String },
    /// Average the color channels locally.
    Desaturate,
    /// Passthrough, scaled down to [`DEFAULT_MAX_WIDTH`].
    Identity,
    /// Scale down to at most `max_width` pixels wide.
    #[serde(rename_all = "camelCase")]
    Resize { max_width: u32 },
}

impl TransformOp {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Enhance => "enhance",
            Self::Stylize { .. } => "stylize",
            Self::Desaturate => "desaturate",
            Self::Identity => "identity",
            Self::Resize { .. } => "resize",
        }
    }

    /// True for operations that call the hosted model.
    pub fn is_remote(&self) -> bool {
        matches!(self, Self::Enhance | Self::Stylize { .. })
    }
}

impl fmt::Display for TransformOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One transform to apply. Not persisted.
#[derive(Debug, Clone)]
pub struct TransformRequest {
    pub operation: TransformOp,
    pub source: Option<EncodedImage>,
    pub requested_by: String,
}

impl TransformRequest {
    pub fn new(
        operation: TransformOp,
        source: EncodedImage,
        requested_by: impl Into<String>,
    ) -> Self {
        Self {
            operation,
            source: Some(source),
            requested_by: requested_by.into(),
        }
    }

    fn source(&self) -> Result<&EncodedImage> {
        self.source
            .as_ref()
            .ok_or_else(|| AetheriaError::Validation("No image data provided.".into()))
    }
}

/// Routes transform requests to the hosted model or to local raster code.
#[derive(Clone)]
pub struct TransformDispatcher {
    model: Arc<dyn GenerativeModel>,
    variation_count: usize,
}

impl TransformDispatcher {
    pub fn new(model: Arc<dyn GenerativeModel>) -> Self {
        Self {
            model,
            variation_count: VARIATION_COUNT,
        }
    }

    /// Override how many variations a stylize request asks for.
    pub fn with_variation_count(mut self, count: usize) -> Self {
        self.variation_count = count;
        self
    }

    pub fn variation_count(&self) -> usize {
        self.variation_count
    }

    pub fn model(&self) -> &Arc<dyn GenerativeModel> {
        &self.model
    }

    /// Apply the requested operation and return its outputs.
    #[instrument(level = "info", skip_all, fields(
        operation = %request.operation,
        requested_by = %request.requested_by
    ))]
    pub async fn apply(&self, request: &TransformRequest) -> Result<Vec<EncodedImage>> {
        match &request.operation {
            TransformOp::Enhance => {
                let source = request.source()?;
                Ok(vec![self.enhance(source).await?])
            }
            TransformOp::Stylize { prompt } => {
                if prompt.trim().is_empty() {
                    return Err(AetheriaError::Validation(
                        "A prompt is required to generate variations.".into(),
                    ));
                }
                let source = request.source()?;
                self.stylize(source, prompt).await
            }
            TransformOp::Desaturate => {
                let source = request.source()?.clone();
                Ok(vec![run_local(move || raster::desaturate(&source)).await?])
            }
            TransformOp::Identity => {
                let source = request.source()?.clone();
                Ok(vec![
                    run_local(move || raster::resize_to_width(&source, DEFAULT_MAX_WIDTH)).await?,
                ])
            }
            TransformOp::Resize { max_width } => {
                let max_width = *max_width;
                let source = request.source()?.clone();
                Ok(vec![
                    run_local(move || raster::resize_to_width(&source, max_width)).await?,
                ])
            }
        }
    }

    async fn enhance(&self, source: &EncodedImage) -> Result<EncodedImage> {
        match self.model.generate(source, ENHANCE_INSTRUCTION).await? {
            Some(image) => {
                info!(output_bytes = image.len(), "Enhancement produced an image");
                Ok(image)
            }
            None => {
                warn!(model = %self.model.source_id(), "Enhancement returned no image");
                Err(AetheriaError::Transform(
                    "the model returned no image".into(),
                ))
            }
        }
    }

    async fn stylize(&self, source: &EncodedImage, prompt: &str) -> Result<Vec<EncodedImage>> {
        let instruction = stylize_instruction(prompt);
        let calls = (0..self.variation_count).map(|_| self.model.generate(source, &instruction));

        let mut outputs = Vec::with_capacity(self.variation_count);
        for (index, outcome) in join_all(calls).await.into_iter().enumerate() {
            match outcome {
                Ok(Some(image)) => outputs.push(image),
                Ok(None) => debug!(index, "Variation call returned no image, skipping"),
                Err(e) => warn!(index, error = %e, "Variation call failed, skipping"),
            }
        }

        if outputs.is_empty() {
            warn!(
                requested = self.variation_count,
                "No stylistic variations could be generated"
            );
        } else {
            info!(
                requested = self.variation_count,
                generated = outputs.len(),
                "Stylistic variations generated"
            );
        }
        Ok(outputs)
    }
}

/// Run a CPU-bound raster transform off the async workers.
async fn run_local<F>(transform: F) -> Result<EncodedImage>
where
    F: FnOnce() -> Result<EncodedImage> + Send + 'static,
{
    tokio::task::spawn_blocking(transform)
        .await
        .map_err(|e| AetheriaError::Transform(format!("local transform task failed: {e}")))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{MockModel, MockOutcome};

    fn source() -> EncodedImage {
        EncodedImage::new("image/png", vec![1, 2, 3])
    }

    fn dispatcher(model: MockModel) -> (TransformDispatcher, Arc<MockModel>) {
        let model = Arc::new(model);
        (TransformDispatcher::new(model.clone()), model)
    }

    #[tokio::test]
    async fn test_enhance_uses_fixed_instruction() {
        let (dispatcher, model) = dispatcher(MockModel::new());
        let request = TransformRequest::new(TransformOp::Enhance, source(), "u1");

        let outputs = dispatcher.apply(&request).await.unwrap();
        assert_eq!(outputs.len(), 1);
        assert_eq!(model.instructions(), vec![ENHANCE_INSTRUCTION.to_string()]);
    }

    #[tokio::test]
    async fn test_enhance_without_image_is_failure() {
        let (dispatcher, _) = dispatcher(MockModel::with_script([MockOutcome::Empty]));
        let request = TransformRequest::new(TransformOp::Enhance, source(), "u1");
        assert!(matches!(
            dispatcher.apply(&request).await,
            Err(AetheriaError::Transform(_))
        ));
    }

    #[tokio::test]
    async fn test_stylize_skips_failed_calls() {
        let (dispatcher, model) = dispatcher(MockModel::with_script([
            MockOutcome::Image,
            MockOutcome::Empty,
            MockOutcome::Image,
        ]));
        let request = TransformRequest::new(
            TransformOp::Stylize {
                prompt: "watercolor".into(),
            },
            source(),
            "u1",
        );

        let outputs = dispatcher.apply(&request).await.unwrap();
        assert_eq!(outputs.len(), 2);
        assert_eq!(model.call_count(), 3);
        assert!(model
            .instructions()
            .iter()
            .all(|i| i == "Generate an image of this character in the style of: watercolor"));
    }

    #[tokio::test]
    async fn test_stylize_requires_prompt_and_source() {
        let (dispatcher, model) = dispatcher(MockModel::new());

        let blank = TransformRequest::new(
            TransformOp::Stylize { prompt: "  ".into() },
            source(),
            "u1",
        );
        let err = dispatcher.apply(&blank).await.unwrap_err();
        assert!(err.to_string().contains("A prompt is required"));

        let no_source = TransformRequest {
            operation: TransformOp::Stylize {
                prompt: "noir".into(),
            },
            source: None,
            requested_by: "u1".into(),
        };
        let err = dispatcher.apply(&no_source).await.unwrap_err();
        assert!(matches!(err, AetheriaError::Validation(_)));
        assert_eq!(model.call_count(), 0);
    }

    #[tokio::test]
    async fn test_custom_variation_count() {
        let model = Arc::new(MockModel::new());
        let dispatcher = TransformDispatcher::new(model.clone()).with_variation_count(5);
        let request = TransformRequest::new(
            TransformOp::Stylize {
                prompt: "noir".into(),
            },
            source(),
            "u1",
        );
        assert_eq!(dispatcher.apply(&request).await.unwrap().len(), 5);
    }

    #[tokio::test]
    async fn test_desaturate_never_calls_model() {
        let (dispatcher, model) = dispatcher(MockModel::new());
        let garbage = EncodedImage::new("image/png", b"nope".to_vec());
        let request = TransformRequest::new(TransformOp::Desaturate, garbage, "u1");

        assert!(matches!(
            dispatcher.apply(&request).await,
            Err(AetheriaError::Decode(_))
        ));
        assert_eq!(model.call_count(), 0);
    }

    #[test]
    fn test_op_serde() {
        let op: TransformOp =
            serde_json::from_str(r#"{"operation":"resize","maxWidth":640}"#).unwrap();
        assert_eq!(op, TransformOp::Resize { max_width: 640 });
        let op: TransformOp = serde_json::from_str(r#"{"operation":"desaturate"}"#).unwrap();
        assert_eq!(op, TransformOp::Desaturate);
        assert!(TransformOp::Enhance.is_remote());
        assert!(!TransformOp::Identity.is_remote());
    }
}
