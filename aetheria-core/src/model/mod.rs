//! Hosted generative image models.
//!
//! A model is an opaque, possibly-empty function `image + instruction → image`.
//! It is reached over the network in production and replaced by a scripted
//! mock in tests.
//!
//! ## Providers
//!
//! - **Gemini** - Google's hosted image model via `generateContent`
//! - **Mock** - Deterministic echo model with scripted failures (testing only)
//!
//! ## Quick Start
//!
//! ```no_run
//! use aetheria_core::model::{ModelProviderConfig, ModelProviderFactory};
//! use aetheria_core::EncodedImage;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let model = ModelProviderFactory::create(ModelProviderConfig::Auto)?;
//! let source = EncodedImage::from_data_uri("data:image/png;base64,iVBORw0KGgo=")?;
//! let output = model.generate(&source, "enhance this image").await?;
//! # Ok(())
//! # }
//! ```

mod gemini;
mod mock;
mod provider;

pub use gemini::{GeminiConfig, GeminiModel};
pub use mock::{MockModel, MockOutcome};
pub use provider::{ModelProviderConfig, ModelProviderFactory};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::encoding::EncodedImage;
use crate::error::Result;

/// A generative image model.
///
/// Implementations must be thread-safe (`Send + Sync`) and must not retry:
/// every failure is terminal for the call that produced it.
#[async_trait]
pub trait GenerativeModel: Send + Sync {
    /// Generate one image from `source` guided by `instruction`.
    ///
    /// `Ok(None)` means the model answered but produced no image. Callers
    /// decide whether that is a failure.
    async fn generate(&self, source: &EncodedImage, instruction: &str)
        -> Result<Option<EncodedImage>>;

    /// Identifies which backend produced an output.
    fn source_id(&self) -> ModelSource;
}

/// Identifies the model backend behind a [`GenerativeModel`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModelSource {
    /// Google Gemini hosted model
    Gemini { model: String },
    /// Mock model for testing only
    Mock,
}

impl std::fmt::Display for ModelSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Gemini { model } => write!(f, "Gemini ({model})"),
            Self::Mock => write!(f, "Mock (testing only)"),
        }
    }
}
