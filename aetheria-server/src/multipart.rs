//! Multipart form parsing helpers
//!
//! Collects the `file` part and any text parts of a multipart/form-data
//! upload, validating the file as it is read.

use std::collections::HashMap;
use std::path::Path;

use aetheria_core::{media_type_for_path, EncodedImage};
use axum::extract::Multipart;

use crate::error::ApiError;
use crate::validation::{validate_content_type, validate_file_size};

/// Represents a file uploaded via multipart form
#[derive(Debug, Clone)]
pub struct FileField {
    /// File data bytes
    pub data: Vec<u8>,
    /// Content-Type from the multipart field (if provided)
    pub content_type: Option<String>,
    /// Original filename from the multipart field (if provided)
    pub file_name: Option<String>,
}

impl FileField {
    /// Declared media type, falling back to the file name extension.
    pub fn media_type(&self) -> String {
        match &self.content_type {
            Some(ct) => ct.split(';').next().unwrap_or(ct).trim().to_lowercase(),
            None => media_type_for_path(Path::new(self.file_name.as_deref().unwrap_or("")))
                .to_string(),
        }
    }

    /// File name to record, `"upload"` when the client sent none.
    pub fn display_name(&self) -> &str {
        self.file_name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .unwrap_or("upload")
    }

    /// Transfer-encode the file as received.
    pub fn to_image(&self) -> EncodedImage {
        EncodedImage::new(self.media_type(), self.data.clone())
    }
}

/// Parsed multipart form fields
#[derive(Debug)]
pub struct MultipartFields {
    /// File field (named "file")
    file: Option<FileField>,
    /// Text fields indexed by name
    text_fields: HashMap<String, String>,
}

impl MultipartFields {
    /// Parse all fields from a multipart request
    ///
    /// # Arguments
    /// * `multipart` - The Axum multipart extractor
    /// * `validate_content_type` - Whether to check the file's media type against the allow-list
    /// * `max_file_size` - Maximum allowed file size in bytes
    pub async fn parse(
        multipart: &mut Multipart,
        validate_content_type_flag: bool,
        max_file_size: usize,
    ) -> Result<Self, ApiError> {
        let mut file: Option<FileField> = None;
        let mut text_fields = HashMap::new();

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| ApiError::bad_request(format!("Failed to parse multipart: {}", e)))?
        {
            let name = field.name().unwrap_or("").to_string();

            if name == "file" {
                let content_type = field.content_type().map(|s| s.to_string());
                let file_name = field.file_name().map(|s| s.to_string());

                let data = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::bad_request(format!("Failed to read file: {}", e)))?
                    .to_vec();

                validate_file_size(data.len(), max_file_size)?;

                let field = FileField {
                    data,
                    content_type,
                    file_name,
                };
                // Checked after the file-name fallback so untyped parts are
                // held to the same allow-list.
                if validate_content_type_flag {
                    validate_content_type(&field.media_type())?;
                }
                file = Some(field);
            } else {
                let value = field.text().await.map_err(|e| {
                    ApiError::bad_request(format!("Failed to read field '{}': {}", name, e))
                })?;
                text_fields.insert(name, value);
            }
        }

        Ok(Self { file, text_fields })
    }

    /// Get the file field (required)
    ///
    /// Returns an error if no file was uploaded or the file is empty.
    pub fn require_file(&self) -> Result<&FileField, ApiError> {
        match self.file.as_ref() {
            Some(file) if !file.data.is_empty() => Ok(file),
            Some(_) => Err(ApiError::bad_request("The uploaded file is empty.")),
            None => Err(ApiError::bad_request(
                "No file provided. Use 'file' field in multipart form.",
            )),
        }
    }

    /// Get the file field (optional)
    pub fn get_file(&self) -> Option<&FileField> {
        self.file.as_ref()
    }

    /// Get a text field value
    ///
    /// Returns `None` if the field is not present.
    pub fn get_text(&self, name: &str) -> Option<&str> {
        self.text_fields.get(name).map(|s| s.as_str())
    }

    /// Get a text field parsed as a boolean
    ///
    /// Returns `true` if the field value is "true" (case-insensitive), `false` otherwise.
    pub fn get_bool(&self, name: &str) -> bool {
        self.text_fields
            .get(name)
            .map(|s| s.to_lowercase() == "true")
            .unwrap_or(false)
    }
}
