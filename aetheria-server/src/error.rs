//! API error handling module
//!
//! Provides a unified error type for all API endpoints with structured error variants.

use aetheria_core::AetheriaError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

/// API error type with structured variants for different error categories
#[derive(Debug, Error)]
pub enum ApiError {
    /// Bad request - client provided invalid input
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Unauthorized - missing owner identity
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Not found - requested resource does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Internal server error - unexpected server-side failure
    #[error("Internal error: {0}")]
    Internal(String),

    /// Pipeline error, tagged with the operation that failed
    #[error("Failed to {action}: {source}")]
    Operation {
        action: &'static str,
        #[source]
        source: AetheriaError,
    },
}

impl From<AetheriaError> for ApiError {
    fn from(source: AetheriaError) -> Self {
        Self::Operation {
            action: "process request",
            source,
        }
    }
}

/// Attach the failed operation to a pipeline error.
pub trait During<T> {
    fn during(self, action: &'static str) -> Result<T, ApiError>;
}

impl<T> During<T> for Result<T, AetheriaError> {
    fn during(self, action: &'static str) -> Result<T, ApiError> {
        self.map_err(|source| ApiError::Operation { action, source })
    }
}

impl ApiError {
    /// Create a bad request error
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    /// Create an unauthorized error
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized(message.into())
    }

    /// Create a not found error
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    /// Create an internal server error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Operation { source, .. } => match source {
                // Client-provided invalid input → 400
                AetheriaError::Validation(_)
                | AetheriaError::InvalidDataUri(_)
                | AetheriaError::Decode(_)
                | AetheriaError::Read(_) => StatusCode::BAD_REQUEST,

                // Model failures → 502
                AetheriaError::Transform(_) => StatusCode::BAD_GATEWAY,

                // Storage backends → 503
                AetheriaError::ObjectStore(_) | AetheriaError::MetadataStore(_) => {
                    StatusCode::SERVICE_UNAVAILABLE
                }

                AetheriaError::Busy(_) => StatusCode::CONFLICT,
            },
        }
    }

    /// Get the error code for programmatic error handling
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::BadRequest(_) => "INVALID_INPUT",
            Self::Unauthorized(_) => "UNAUTHORIZED",
            Self::NotFound(_) => "NOT_FOUND",
            Self::Internal(_) => "INTERNAL_ERROR",
            Self::Operation { source, .. } => match source {
                AetheriaError::Validation(_) => "VALIDATION_ERROR",
                AetheriaError::InvalidDataUri(_) => "INVALID_DATA_URI",
                AetheriaError::Decode(_) => "DECODE_ERROR",
                AetheriaError::Read(_) => "READ_ERROR",
                AetheriaError::Transform(_) => "TRANSFORM_FAILED",
                AetheriaError::ObjectStore(_) => "OBJECT_STORE_ERROR",
                AetheriaError::MetadataStore(_) => "METADATA_STORE_ERROR",
                AetheriaError::Busy(_) => "BUSY",
            },
        }
    }

    /// Get sanitized error message for client response
    fn client_message(&self) -> String {
        match self {
            Self::Operation { action, source } => {
                let detail = match source {
                    // Input problems are safe to echo back
                    AetheriaError::Validation(m)
                    | AetheriaError::InvalidDataUri(m)
                    | AetheriaError::Decode(m)
                    | AetheriaError::Read(m) => m.clone(),
                    AetheriaError::Transform(_) => {
                        "the image model did not return a result".to_string()
                    }
                    AetheriaError::ObjectStore(_) => "object storage is unavailable".to_string(),
                    AetheriaError::MetadataStore(_) => {
                        "metadata storage is unavailable".to_string()
                    }
                    AetheriaError::Busy(_) => "another operation is in progress".to_string(),
                };
                format!("Failed to {}: {}", action, detail)
            }
            _ => self.to_string(),
        }
    }

    /// Get the error category for logging
    fn error_category(&self) -> &'static str {
        match self {
            Self::BadRequest(_) => "bad_request",
            Self::Unauthorized(_) => "unauthorized",
            Self::NotFound(_) => "not_found",
            Self::Internal(_) => "internal",
            Self::Operation { .. } => "pipeline",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let category = self.error_category();
        let code = self.error_code();
        let internal_message = self.to_string();
        let client_message = self.client_message();

        // Log based on severity, always including internal details
        if status.is_server_error() {
            tracing::error!(
                status = %status,
                category = category,
                code = code,
                error = %internal_message,
                client_message = %client_message,
                "Server error"
            );
        } else if matches!(self, Self::Unauthorized(_)) {
            tracing::warn!(
                status = %status,
                category = category,
                code = code,
                error = %internal_message,
                "Authentication error"
            );
        } else {
            tracing::warn!(
                status = %status,
                category = category,
                code = code,
                error = %internal_message,
                "Client error"
            );
        }

        let body = serde_json::json!({
            "error": client_message,
            "code": code,
        });

        (status, Json(body)).into_response()
    }
}
