//! Stateless transform actions
//!
//! Data URI in, data URI(s) out. Nothing is stored or recorded.

use aetheria_core::dispatch::DEFAULT_MAX_WIDTH;
use aetheria_core::{EncodedImage, TransformOp, TransformRequest};
use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::{ApiError, During};
use crate::state::AppState;

/// Requester recorded on stateless transforms.
const ANONYMOUS: &str = "anonymous";

/// Request body for the enhance action
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EnhanceActionRequest {
    /// Source image as `data:<mediaType>;base64,<payload>`
    #[schema(example = "data:image/png;base64,iVBORw0KGgo...")]
    pub photo_data_uri: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EnhanceActionResponse {
    pub enhanced_photo_data_uri: String,
}

/// Request body for the variations action
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VariationsActionRequest {
    pub photo_data_uri: String,
    #[schema(example = "vaporwave")]
    pub prompt: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VariationsActionResponse {
    /// One data URI per successful model call
    pub stylistic_variations: Vec<String>,
}

/// Request body for a local transform
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TransformActionRequest {
    pub photo_data_uri: String,
    /// "desaturate", "identity" or "resize"
    #[schema(example = "desaturate")]
    pub operation: String,
    /// Target width for "resize" (defaults to 1024)
    #[serde(default)]
    pub max_width: Option<u32>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TransformActionResponse {
    pub operation: String,
    pub transformed_photo_data_uri: String,
}

fn parse_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload
        .map(|Json(body)| body)
        .map_err(|e| ApiError::bad_request(format!("Invalid request body: {}", e)))
}

fn local_operation(name: &str, max_width: Option<u32>) -> Result<TransformOp, ApiError> {
    match name.trim().to_lowercase().as_str() {
        "desaturate" => Ok(TransformOp::Desaturate),
        "identity" => Ok(TransformOp::Identity),
        "resize" => Ok(TransformOp::Resize {
            max_width: max_width.unwrap_or(DEFAULT_MAX_WIDTH),
        }),
        other => Err(ApiError::bad_request(format!(
            "Unsupported local operation '{}'. Allowed: desaturate, identity, resize",
            other
        ))),
    }
}

/// Enhance a data URI
#[utoipa::path(
    post,
    path = "/api/v1/actions/enhance",
    tag = "Actions",
    request_body = EnhanceActionRequest,
    responses(
        (status = 200, description = "Enhanced image", body = EnhanceActionResponse),
        (status = 400, description = "Missing or malformed data URI"),
        (status = 502, description = "The model failed or returned no image")
    )
)]
pub async fn enhance_action(
    State(state): State<AppState>,
    payload: Result<Json<EnhanceActionRequest>, JsonRejection>,
) -> Result<Json<EnhanceActionResponse>, ApiError> {
    let body = parse_body(payload)?;
    let image = EncodedImage::from_data_uri(&body.photo_data_uri).during("enhance image")?;

    let request = TransformRequest::new(TransformOp::Enhance, image, ANONYMOUS);
    let output = state
        .pipeline
        .dispatcher()
        .apply(&request)
        .await
        .during("enhance image")?
        .into_iter()
        .next()
        .ok_or_else(|| ApiError::internal("Enhancement produced no output"))?;

    Ok(Json(EnhanceActionResponse {
        enhanced_photo_data_uri: output.to_data_uri(),
    }))
}

/// Generate stylistic variations of a data URI
#[utoipa::path(
    post,
    path = "/api/v1/actions/variations",
    tag = "Actions",
    request_body = VariationsActionRequest,
    responses(
        (status = 200, description = "Zero or more variations", body = VariationsActionResponse),
        (status = 400, description = "Missing prompt or malformed data URI")
    )
)]
pub async fn variations_action(
    State(state): State<AppState>,
    payload: Result<Json<VariationsActionRequest>, JsonRejection>,
) -> Result<Json<VariationsActionResponse>, ApiError> {
    let body = parse_body(payload)?;
    let image =
        EncodedImage::from_data_uri(&body.photo_data_uri).during("generate variations")?;

    let request = TransformRequest::new(
        TransformOp::Stylize {
            prompt: body.prompt,
        },
        image,
        ANONYMOUS,
    );
    let outputs = state
        .pipeline
        .dispatcher()
        .apply(&request)
        .await
        .during("generate variations")?;

    Ok(Json(VariationsActionResponse {
        stylistic_variations: outputs.iter().map(EncodedImage::to_data_uri).collect(),
    }))
}

/// Apply a local transform to a data URI
#[utoipa::path(
    post,
    path = "/api/v1/actions/transform",
    tag = "Actions",
    request_body = TransformActionRequest,
    responses(
        (status = 200, description = "Transformed image", body = TransformActionResponse),
        (status = 400, description = "Unknown operation, malformed data URI or undecodable image")
    )
)]
pub async fn transform_action(
    State(state): State<AppState>,
    payload: Result<Json<TransformActionRequest>, JsonRejection>,
) -> Result<Json<TransformActionResponse>, ApiError> {
    let body = parse_body(payload)?;
    let operation = local_operation(&body.operation, body.max_width)?;
    let image = EncodedImage::from_data_uri(&body.photo_data_uri).during("transform image")?;

    let output = state
        .pipeline
        .preview(operation.clone(), image, ANONYMOUS)
        .await
        .during("transform image")?;

    Ok(Json(TransformActionResponse {
        operation: operation.name().to_string(),
        transformed_photo_data_uri: output.to_data_uri(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_operation_names() {
        assert_eq!(
            local_operation("Desaturate", None).unwrap(),
            TransformOp::Desaturate
        );
        assert_eq!(
            local_operation("resize", None).unwrap(),
            TransformOp::Resize {
                max_width: DEFAULT_MAX_WIDTH
            }
        );
        assert_eq!(
            local_operation("resize", Some(64)).unwrap(),
            TransformOp::Resize { max_width: 64 }
        );
        assert!(local_operation("enhance", None).is_err());
    }
}
