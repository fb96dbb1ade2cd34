//! Image record handlers
//!
//! Upload, history and persisted transforms, all scoped to the requesting owner.

use aetheria_core::{EnhancementRecord, GalleryEntry, ImageRecord, VariationRecord};
use axum::{
    extract::{rejection::JsonRejection, Multipart, Path, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::{ApiError, During};
use crate::multipart::MultipartFields;
use crate::owner::Owner;
use crate::state::AppState;

/// A stored source image
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ImageResponse {
    #[schema(example = "550e8400-e29b-41d4-a716-446655440000")]
    pub id: String,
    pub user_id: String,
    /// Retrieval address of the original
    pub original_image_url: String,
    #[schema(example = "users/u1/uploads/1767225600000000000.png")]
    pub storage_path: String,
    #[schema(example = "A.png")]
    pub original_file_name: String,
    #[schema(example = "image/png")]
    pub media_type: String,
    /// Black-and-white rendition, when requested at upload
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transformed_image_url: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl From<ImageRecord> for ImageResponse {
    fn from(record: ImageRecord) -> Self {
        Self {
            id: record.id,
            user_id: record.user_id,
            original_image_url: record.original_image_url,
            storage_path: record.storage_path,
            original_file_name: record.original_file_name,
            media_type: record.media_type,
            transformed_image_url: record.transformed_image_url,
            timestamp: record.created_at,
        }
    }
}

/// An enhancement output
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EnhancementResponse {
    pub id: String,
    /// Source image this enhancement belongs to
    pub image_record_id: String,
    pub enhanced_image_url: String,
    pub storage_path: String,
    pub media_type: String,
    pub timestamp: DateTime<Utc>,
}

impl From<EnhancementRecord> for EnhancementResponse {
    fn from(record: EnhancementRecord) -> Self {
        Self {
            id: record.id,
            image_record_id: record.image_record_id,
            enhanced_image_url: record.enhanced_image_url,
            storage_path: record.storage_path,
            media_type: record.media_type,
            timestamp: record.created_at,
        }
    }
}

/// A stylistic variation output
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VariationResponse {
    pub id: String,
    pub image_record_id: String,
    pub variation_image_url: String,
    pub storage_path: String,
    pub media_type: String,
    /// Prompt the variation was generated from
    #[schema(example = "vaporwave")]
    pub style_name: String,
    pub timestamp: DateTime<Utc>,
}

impl From<VariationRecord> for VariationResponse {
    fn from(record: VariationRecord) -> Self {
        Self {
            id: record.id,
            image_record_id: record.image_record_id,
            variation_image_url: record.variation_image_url,
            storage_path: record.storage_path,
            media_type: record.media_type,
            style_name: record.style_name,
            timestamp: record.created_at,
        }
    }
}

/// Owner history, newest first
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ImageListResponse {
    pub images: Vec<ImageResponse>,
    pub count: usize,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct EnhancementListResponse {
    pub enhancements: Vec<EnhancementResponse>,
    pub count: usize,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct VariationListResponse {
    pub variations: Vec<VariationResponse>,
    pub count: usize,
}

/// One source image with everything derived from it
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct GalleryEntryResponse {
    pub image: ImageResponse,
    pub enhancements: Vec<EnhancementResponse>,
    pub variations: Vec<VariationResponse>,
}

impl From<GalleryEntry> for GalleryEntryResponse {
    fn from(entry: GalleryEntry) -> Self {
        Self {
            image: entry.record.into(),
            enhancements: entry.enhancements.into_iter().map(Into::into).collect(),
            variations: entry.variations.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct GalleryResponse {
    pub entries: Vec<GalleryEntryResponse>,
}

/// Request body for generating variations
#[derive(Debug, Deserialize, ToSchema)]
pub struct VariationsRequest {
    /// Free-text style description
    #[schema(example = "vaporwave")]
    pub prompt: String,
}

/// Find an owner's record or answer 404.
async fn find_record(state: &AppState, owner: &Owner, id: &str) -> Result<ImageRecord, ApiError> {
    state
        .pipeline
        .history()
        .get(owner.as_str(), id)
        .await
        .during("load image record")?
        .ok_or_else(|| ApiError::not_found(format!("Image record '{}' not found", id)))
}

/// Upload an image
///
/// Accepts multipart/form-data with:
/// - **file** (required): PNG, JPEG, WebP or GIF image
/// - **transform** (optional): "desaturate" to also store a black-and-white rendition
#[utoipa::path(
    post,
    path = "/api/v1/images",
    tag = "Images",
    params(("x-user-id" = String, Header, description = "Owner of the record")),
    request_body(
        content_type = "multipart/form-data",
        description = "Image file with optional transform"
    ),
    responses(
        (status = 201, description = "Image stored and recorded", body = ImageResponse),
        (status = 400, description = "Missing file, unsupported type or undecodable image"),
        (status = 401, description = "Missing owner"),
        (status = 503, description = "Storage unavailable")
    )
)]
pub async fn upload_image(
    State(state): State<AppState>,
    owner: Owner,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<ImageResponse>), ApiError> {
    let fields = MultipartFields::parse(&mut multipart, true, state.max_file_size).await?;
    let file = fields.require_file()?;

    let desaturate = match fields.get_text("transform").map(str::trim) {
        None | Some("") | Some("none") => false,
        Some("desaturate") => true,
        Some(other) => {
            return Err(ApiError::bad_request(format!(
                "Unsupported upload transform '{}'. Allowed: desaturate",
                other
            )))
        }
    };

    let record = state
        .pipeline
        .upload(owner.as_str(), file.display_name(), file.to_image(), desaturate)
        .await
        .during("upload image")?;

    Ok((StatusCode::CREATED, Json(record.into())))
}

/// List the owner's images, newest first
#[utoipa::path(
    get,
    path = "/api/v1/images",
    tag = "Images",
    params(("x-user-id" = String, Header, description = "Owner of the records")),
    responses(
        (status = 200, description = "Owner history", body = ImageListResponse),
        (status = 401, description = "Missing owner")
    )
)]
pub async fn list_images(
    State(state): State<AppState>,
    owner: Owner,
) -> Result<Json<ImageListResponse>, ApiError> {
    let images: Vec<ImageResponse> = state
        .pipeline
        .history()
        .list(owner.as_str())
        .await
        .during("load history")?
        .into_iter()
        .map(Into::into)
        .collect();

    Ok(Json(ImageListResponse {
        count: images.len(),
        images,
    }))
}

/// Get one image record
#[utoipa::path(
    get,
    path = "/api/v1/images/{id}",
    tag = "Images",
    params(
        ("id" = String, Path, description = "Image record id"),
        ("x-user-id" = String, Header, description = "Owner of the record")
    ),
    responses(
        (status = 200, description = "Image record", body = ImageResponse),
        (status = 404, description = "No such record for this owner")
    )
)]
pub async fn get_image(
    State(state): State<AppState>,
    owner: Owner,
    Path(id): Path<String>,
) -> Result<Json<ImageResponse>, ApiError> {
    Ok(Json(find_record(&state, &owner, &id).await?.into()))
}

/// List enhancements of an image, newest first
#[utoipa::path(
    get,
    path = "/api/v1/images/{id}/enhancements",
    tag = "Images",
    params(
        ("id" = String, Path, description = "Image record id"),
        ("x-user-id" = String, Header, description = "Owner of the record")
    ),
    responses(
        (status = 200, description = "Enhancements", body = EnhancementListResponse),
        (status = 404, description = "No such record for this owner")
    )
)]
pub async fn list_enhancements(
    State(state): State<AppState>,
    owner: Owner,
    Path(id): Path<String>,
) -> Result<Json<EnhancementListResponse>, ApiError> {
    let record = find_record(&state, &owner, &id).await?;
    let enhancements: Vec<EnhancementResponse> = state
        .pipeline
        .history()
        .enhancements(&record.id)
        .await
        .during("load enhancements")?
        .into_iter()
        .map(Into::into)
        .collect();

    Ok(Json(EnhancementListResponse {
        count: enhancements.len(),
        enhancements,
    }))
}

/// List variations of an image, newest first
#[utoipa::path(
    get,
    path = "/api/v1/images/{id}/variations",
    tag = "Images",
    params(
        ("id" = String, Path, description = "Image record id"),
        ("x-user-id" = String, Header, description = "Owner of the record")
    ),
    responses(
        (status = 200, description = "Variations", body = VariationListResponse),
        (status = 404, description = "No such record for this owner")
    )
)]
pub async fn list_variations(
    State(state): State<AppState>,
    owner: Owner,
    Path(id): Path<String>,
) -> Result<Json<VariationListResponse>, ApiError> {
    let record = find_record(&state, &owner, &id).await?;
    let variations: Vec<VariationResponse> = state
        .pipeline
        .history()
        .variations(&record.id)
        .await
        .during("load variations")?
        .into_iter()
        .map(Into::into)
        .collect();

    Ok(Json(VariationListResponse {
        count: variations.len(),
        variations,
    }))
}

/// Enhance a stored image
///
/// Calls the hosted model once. Nothing is recorded unless the model
/// returns an image.
#[utoipa::path(
    post,
    path = "/api/v1/images/{id}/enhance",
    tag = "Transforms",
    params(
        ("id" = String, Path, description = "Image record id"),
        ("x-user-id" = String, Header, description = "Owner of the record")
    ),
    responses(
        (status = 201, description = "Enhancement stored and recorded", body = EnhancementResponse),
        (status = 404, description = "No such record for this owner"),
        (status = 502, description = "The model failed or returned no image"),
        (status = 503, description = "Storage unavailable")
    )
)]
pub async fn enhance_image(
    State(state): State<AppState>,
    owner: Owner,
    Path(id): Path<String>,
) -> Result<(StatusCode, Json<EnhancementResponse>), ApiError> {
    let record = find_record(&state, &owner, &id).await?;
    let source = state
        .pipeline
        .load_source(&record)
        .await
        .during("load image")?;
    let enhancement = state
        .pipeline
        .enhance(&record, &source)
        .await
        .during("enhance image")?;

    Ok((StatusCode::CREATED, Json(enhancement.into())))
}

/// Generate stylistic variations of a stored image
///
/// Each variation is an independent model call; failed calls are skipped,
/// so the response may hold fewer variations than requested, or none.
#[utoipa::path(
    post,
    path = "/api/v1/images/{id}/variations",
    tag = "Transforms",
    params(
        ("id" = String, Path, description = "Image record id"),
        ("x-user-id" = String, Header, description = "Owner of the record")
    ),
    request_body = VariationsRequest,
    responses(
        (status = 201, description = "Variations stored and recorded", body = VariationListResponse),
        (status = 400, description = "Missing prompt"),
        (status = 404, description = "No such record for this owner"),
        (status = 503, description = "Storage unavailable")
    )
)]
pub async fn generate_variations(
    State(state): State<AppState>,
    owner: Owner,
    Path(id): Path<String>,
    payload: Result<Json<VariationsRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<VariationListResponse>), ApiError> {
    let Json(request) =
        payload.map_err(|e| ApiError::bad_request(format!("Invalid request body: {}", e)))?;
    let record = find_record(&state, &owner, &id).await?;
    let source = state
        .pipeline
        .load_source(&record)
        .await
        .during("load image")?;
    let variations: Vec<VariationResponse> = state
        .pipeline
        .stylize(&record, &source, &request.prompt)
        .await
        .during("generate variations")?
        .into_iter()
        .map(Into::into)
        .collect();

    Ok((
        StatusCode::CREATED,
        Json(VariationListResponse {
            count: variations.len(),
            variations,
        }),
    ))
}

/// Gallery view: every image with its enhancements and variations
#[utoipa::path(
    get,
    path = "/api/v1/gallery",
    tag = "Images",
    params(("x-user-id" = String, Header, description = "Owner of the records")),
    responses(
        (status = 200, description = "Gallery", body = GalleryResponse),
        (status = 401, description = "Missing owner")
    )
)]
pub async fn gallery(
    State(state): State<AppState>,
    owner: Owner,
) -> Result<Json<GalleryResponse>, ApiError> {
    let entries = state
        .pipeline
        .history()
        .gallery(owner.as_str())
        .await
        .during("load gallery")?
        .into_iter()
        .map(Into::into)
        .collect();

    Ok(Json(GalleryResponse { entries }))
}
