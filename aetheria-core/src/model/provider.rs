//! Model provider selection.

use std::sync::Arc;

use tracing::{info, warn};

use super::{GeminiConfig, GeminiModel, GenerativeModel, MockModel};
use crate::error::{AetheriaError, Result};

/// Which generative model backend to use.
#[derive(Debug, Clone, Default)]
pub enum ModelProviderConfig {
    /// Google Gemini with explicit configuration
    Gemini(GeminiConfig),

    /// Mock model that echoes its input (testing only)
    Mock,

    /// Gemini configured from the environment
    #[default]
    Auto,
}

/// Factory for creating generative model providers.
pub struct ModelProviderFactory;

impl ModelProviderFactory {
    /// Create a model provider from configuration.
    pub fn create(config: ModelProviderConfig) -> Result<Arc<dyn GenerativeModel>> {
        match config {
            ModelProviderConfig::Gemini(gemini_config) => {
                let model = GeminiModel::new(gemini_config)?;
                Ok(Arc::new(model))
            }
            ModelProviderConfig::Mock => Ok(Self::create_mock()),
            ModelProviderConfig::Auto => Self::create_auto(),
        }
    }

    /// Use Gemini when an API key is present in the environment.
    ///
    /// There is no silent fallback to the mock: a missing key is an error.
    fn create_auto() -> Result<Arc<dyn GenerativeModel>> {
        match GeminiConfig::from_env() {
            Ok(config) => {
                info!(model = %config.model, "Using Gemini image model");
                let model = GeminiModel::new(config)?;
                Ok(Arc::new(model))
            }
            Err(e) => {
                warn!(error = %e, "No generative model configured");
                Err(AetheriaError::Validation(
                    "no generative model configured: set GEMINI_API_KEY".into(),
                ))
            }
        }
    }

    /// Create a mock model for testing.
    pub fn create_mock() -> Arc<dyn GenerativeModel> {
        Arc::new(MockModel::new())
    }
}
