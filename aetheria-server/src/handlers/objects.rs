//! Stored object retrieval
//!
//! Serves the bytes behind every retrieval address handed out by the
//! filesystem object store.

use axum::{
    extract::{Path, State},
    http::{header, HeaderValue},
    response::IntoResponse,
};

use crate::error::{ApiError, During};
use crate::state::AppState;

/// Stored objects never change once written.
const IMMUTABLE: &str = "public, max-age=31536000, immutable";

/// Fetch a stored object
#[utoipa::path(
    get,
    path = "/objects/{path}",
    tag = "Objects",
    params(("path" = String, Path, description = "Object path, e.g. users/u1/uploads/1767225600000000000.png")),
    responses(
        (status = 200, description = "Object bytes with their stored media type"),
        (status = 400, description = "Invalid object path"),
        (status = 404, description = "Nothing stored at this path")
    )
)]
pub async fn get_object(
    State(state): State<AppState>,
    Path(path): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    if path.is_empty() || path.split('/').any(|segment| segment == ".." || segment.is_empty()) {
        return Err(ApiError::bad_request("Invalid object path"));
    }

    let image = state
        .objects
        .get_object(&path)
        .await
        .during("load object")?
        .ok_or_else(|| ApiError::not_found(format!("No object at '{}'", path)))?;

    let content_type = HeaderValue::from_str(image.media_type())
        .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream"));

    Ok((
        [
            (header::CONTENT_TYPE, content_type),
            (header::CACHE_CONTROL, HeaderValue::from_static(IMMUTABLE)),
        ],
        image.into_bytes(),
    ))
}
