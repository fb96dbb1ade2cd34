//! Health check handlers
//!
//! Provides health and readiness endpoints for monitoring and orchestration.

use aetheria_core::ModelSource;
use axum::{extract::State, Json};
use serde::Serialize;
use utoipa::ToSchema;

use crate::state::AppState;

/// Health check response
#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    /// Service status: "healthy" or "degraded"
    #[schema(example = "healthy")]
    pub status: &'static str,
    /// Server version from Cargo.toml
    #[schema(example = "0.1.0")]
    pub version: &'static str,
    /// Service name
    #[schema(example = "aetheria-server")]
    pub service: &'static str,
    /// Model backend answering transform requests
    #[schema(example = "Gemini (gemini-2.5-flash-image-preview)")]
    pub model: String,
    /// Object store backend
    #[schema(example = "filesystem")]
    pub object_store: &'static str,
    /// Document store backend
    #[schema(example = "postgres")]
    pub document_store: &'static str,
}

/// Service health
///
/// Reports "degraded" while the mock model stands in for the hosted one.
#[utoipa::path(
    get,
    path = "/health",
    tag = "Health",
    responses(
        (status = 200, description = "Service health", body = HealthResponse)
    )
)]
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let status = match state.model_source {
        ModelSource::Mock => "degraded",
        ModelSource::Gemini { .. } => "healthy",
    };

    Json(HealthResponse {
        status,
        version: env!("CARGO_PKG_VERSION"),
        service: "aetheria-server",
        model: state.model_source.to_string(),
        object_store: state.objects.backend_name(),
        document_store: state.document_backend,
    })
}

/// Readiness response
#[derive(Serialize, ToSchema)]
pub struct ReadyResponse {
    /// Whether the service is ready to accept traffic
    pub ready: bool,
    /// Optional message explaining status
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'static str>,
}

/// Readiness check
///
/// Returns 200 once the stores and model are wired. Unlike /health,
/// this is a simple yes/no check.
#[utoipa::path(
    get,
    path = "/ready",
    tag = "Health",
    responses(
        (status = 200, description = "Service is ready", body = ReadyResponse)
    )
)]
pub async fn ready() -> Json<ReadyResponse> {
    Json(ReadyResponse {
        ready: true,
        message: None,
    })
}
