//! Upload validation module
//!
//! Provides validation utilities for multipart image uploads.

use crate::error::ApiError;

/// Media types accepted for uploads
pub const ALLOWED_MEDIA_TYPES: &[&str] = &["image/png", "image/jpeg", "image/webp", "image/gif"];

/// Default max file size in bytes (25 MB)
pub const DEFAULT_MAX_FILE_SIZE: usize = 25 * 1024 * 1024;

/// Validates the media type of an uploaded file
///
/// `media_type` is the part's Content-Type or, when the client sent none,
/// the type inferred from the file name. Parameters after `;` are ignored
/// and the comparison is case-insensitive.
pub fn validate_content_type(media_type: &str) -> Result<(), ApiError> {
    let essence = media_type.split(';').next().unwrap_or("").trim().to_lowercase();
    if ALLOWED_MEDIA_TYPES.contains(&essence.as_str()) {
        Ok(())
    } else {
        Err(ApiError::bad_request(format!(
            "Unsupported Content-Type: '{}'. Allowed types: {}",
            media_type,
            ALLOWED_MEDIA_TYPES.join(", ")
        )))
    }
}

/// Validates the size of an uploaded file
///
/// Returns an error if the file exceeds the maximum size.
pub fn validate_file_size(size: usize, max_size: usize) -> Result<(), ApiError> {
    if size > max_size {
        let max_mb = max_size / (1024 * 1024);
        let actual_mb = size / (1024 * 1024);
        Err(ApiError::bad_request(format!(
            "File too large: {} MB exceeds maximum of {} MB",
            actual_mb, max_mb
        )))
    } else {
        Ok(())
    }
}
