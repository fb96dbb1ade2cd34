//! Google Gemini hosted image model.
//!
//! Calls `POST {api_url}/models/{model}:generateContent` with the source image
//! as an inline part followed by the instruction text, asking for both text
//! and image response modalities (image-only requests are rejected by the
//! image preview models).
//!
//! ## Features
//!
//! - Single attempt per call; failures are surfaced, never retried
//! - Configurable endpoint, model name and timeout
//! - API key redacted from `Debug` output
//! - Tracing instrumentation with latency on every call

use std::time::{Duration, Instant};

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use super::{GenerativeModel, ModelSource};
use crate::encoding::EncodedImage;
use crate::error::{AetheriaError, Result};

/// Default API base URL.
const DEFAULT_API_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Default image-capable model.
const DEFAULT_MODEL: &str = "gemini-2.5-flash-image-preview";

/// Image generation is slow; allow a generous per-call timeout.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Longest error body excerpt kept in error messages.
const MAX_ERROR_BODY: usize = 200;

/// Configuration for the Gemini client.
#[derive(Clone)]
pub struct GeminiConfig {
    /// API base URL
    pub api_url: String,
    /// API key sent as `x-goog-api-key`
    pub api_key: String,
    /// Model name, e.g. `gemini-2.5-flash-image-preview`
    pub model: String,
    /// Request timeout
    pub timeout: Duration,
}

impl std::fmt::Debug for GeminiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiConfig")
            .field("api_url", &self.api_url)
            .field("api_key", &"[REDACTED]")
            .field("model", &self.model)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl GeminiConfig {
    /// Create configuration with the default endpoint and model.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Create configuration from environment variables.
    ///
    /// Required: `GEMINI_API_KEY` (or `GOOGLE_API_KEY`)
    /// Optional: `GEMINI_MODEL`, `GEMINI_API_URL`, `GEMINI_TIMEOUT_SECS`
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("GEMINI_API_KEY")
            .or_else(|_| std::env::var("GOOGLE_API_KEY"))
            .ok()
            .filter(|key| !key.is_empty())
            .ok_or_else(|| {
                AetheriaError::Validation("GEMINI_API_KEY environment variable not set".into())
            })?;

        let mut config = Self::new(api_key);
        if let Ok(model) = std::env::var("GEMINI_MODEL") {
            config.model = model;
        }
        if let Ok(api_url) = std::env::var("GEMINI_API_URL") {
            config.api_url = api_url;
        }
        if let Some(secs) = std::env::var("GEMINI_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
        {
            config.timeout = Duration::from_secs(secs);
        }
        Ok(config)
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.api_url.trim_end_matches('/'),
            self.model
        )
    }
}

/// `generateContent` request body.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    inline_data: Option<InlineData>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_modalities: Vec<&'static str>,
}

/// `generateContent` response body (fields we use).
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

fn build_request(source: &EncodedImage, instruction: &str) -> GenerateRequest {
    GenerateRequest {
        contents: vec![Content {
            role: Some("user".to_string()),
            parts: vec![
                Part {
                    inline_data: Some(InlineData {
                        mime_type: source.media_type().to_string(),
                        data: BASE64.encode(source.bytes()),
                    }),
                    ..Part::default()
                },
                Part {
                    text: Some(instruction.to_string()),
                    ..Part::default()
                },
            ],
        }],
        generation_config: GenerationConfig {
            response_modalities: vec!["TEXT", "IMAGE"],
        },
    }
}

/// Pull the first inline image out of the first candidate.
///
/// Later candidates are ignored even when the first one carries no image.
fn extract_image(response: GenerateResponse) -> Result<Option<EncodedImage>> {
    if let Some(reason) = response
        .prompt_feedback
        .as_ref()
        .and_then(|feedback| feedback.block_reason.as_deref())
    {
        warn!(block_reason = reason, "Prompt was blocked by the model");
    }

    let inline = response
        .candidates
        .into_iter()
        .next()
        .inspect(|candidate| {
            if let Some(reason) = &candidate.finish_reason {
                debug!(finish_reason = %reason, "Candidate finished");
            }
        })
        .and_then(|candidate| candidate.content)
        .and_then(|content| content.parts.into_iter().find_map(|part| part.inline_data));

    match inline {
        Some(data) => {
            let bytes = BASE64.decode(data.data.as_bytes()).map_err(|e| {
                AetheriaError::Transform(format!("model returned invalid base64 image: {e}"))
            })?;
            Ok(Some(EncodedImage::new(data.mime_type, bytes)))
        }
        None => Ok(None),
    }
}

fn truncate_body(body: &str) -> &str {
    match body.char_indices().nth(MAX_ERROR_BODY) {
        Some((idx, _)) => &body[..idx],
        None => body,
    }
}

/// Gemini client implementing [`GenerativeModel`].
pub struct GeminiModel {
    client: Client,
    config: GeminiConfig,
}

impl GeminiModel {
    /// Create a new Gemini client.
    #[instrument(level = "debug", skip_all, fields(
        api_url = %config.api_url,
        model = %config.model,
        timeout_ms = config.timeout.as_millis() as u64
    ))]
    pub fn new(config: GeminiConfig) -> Result<Self> {
        debug!("Creating Gemini client");

        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| {
                warn!(error = %e, "Failed to create HTTP client");
                AetheriaError::Transform(format!("Failed to create HTTP client: {e}"))
            })?;

        info!("Gemini client created successfully");
        Ok(Self { client, config })
    }

    /// Create a client from `GEMINI_*` environment variables.
    pub fn from_env() -> Result<Self> {
        Self::new(GeminiConfig::from_env()?)
    }

    pub fn config(&self) -> &GeminiConfig {
        &self.config
    }
}

#[async_trait]
impl GenerativeModel for GeminiModel {
    #[instrument(level = "info", skip_all, fields(
        model = %self.config.model,
        source_bytes = source.len(),
        media_type = %source.media_type()
    ))]
    async fn generate(
        &self,
        source: &EncodedImage,
        instruction: &str,
    ) -> Result<Option<EncodedImage>> {
        let start = Instant::now();
        let request = build_request(source, instruction);

        let response = self
            .client
            .post(self.config.endpoint())
            .header("x-goog-api-key", &self.config.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                let latency_ms = start.elapsed().as_millis() as u64;
                warn!(error = %e, latency_ms, timeout = e.is_timeout(), "Gemini request failed");
                AetheriaError::Transform(format!("Gemini request failed: {e}"))
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let latency_ms = start.elapsed().as_millis() as u64;
            warn!(status = %status, latency_ms, "Gemini API returned an error status");
            return Err(AetheriaError::Transform(format!(
                "Gemini API returned status {status}: {}",
                truncate_body(&body)
            )));
        }

        let parsed: GenerateResponse = response.json().await.map_err(|e| {
            warn!(error = %e, "Failed to parse Gemini response");
            AetheriaError::Transform(format!("Failed to parse Gemini response: {e}"))
        })?;

        let output = extract_image(parsed)?;
        let latency_ms = start.elapsed().as_millis() as u64;
        debug!(
            latency_ms,
            has_image = output.is_some(),
            "Gemini request completed"
        );
        Ok(output)
    }

    fn source_id(&self) -> ModelSource {
        ModelSource::Gemini {
            model: self.config.model.clone(),
        }
    }
}
