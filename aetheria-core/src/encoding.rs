//! Transfer encoding for images crossing a process or network boundary.
//!
//! Every image travels as an [`EncodedImage`]: a byte payload plus the media
//! type it was declared with. Over a boundary it is rendered as a data URI of
//! the exact form `data:<mediaType>;base64,<payload>`.
//!
//! The declared media type is trusted as-is. Nothing in this module sniffs
//! the payload to check that it really is an image.

use std::fmt;
use std::io::Read;
use std::path::Path;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{AetheriaError, Result};

const DATA_URI_PREFIX: &str = "data:";
const BASE64_MARKER: &str = ";base64,";

/// Media type used when a file's type cannot be determined from its name.
pub const FALLBACK_MEDIA_TYPE: &str = "application/octet-stream";

/// A binary image payload together with its declared media type.
#[derive(Clone, PartialEq, Eq)]
pub struct EncodedImage {
    media_type: String,
    bytes: Vec<u8>,
}

impl EncodedImage {
    pub fn new(media_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            media_type: media_type.into(),
            bytes,
        }
    }

    pub fn media_type(&self) -> &str {
        &self.media_type
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Render as `data:<mediaType>;base64,<payload>`.
    pub fn to_data_uri(&self) -> String {
        format!(
            "{DATA_URI_PREFIX}{}{BASE64_MARKER}{}",
            self.media_type,
            BASE64.encode(&self.bytes)
        )
    }

    /// Parse the canonical `data:<mediaType>;base64,<payload>` form.
    ///
    /// Media type parameters other than the base64 marker (for example
    /// `;charset=`) are not accepted.
    pub fn from_data_uri(uri: &str) -> Result<Self> {
        let rest = uri
            .strip_prefix(DATA_URI_PREFIX)
            .ok_or_else(|| AetheriaError::InvalidDataUri("missing 'data:' prefix".into()))?;

        let (media_type, payload) = rest.split_once(BASE64_MARKER).ok_or_else(|| {
            AetheriaError::InvalidDataUri("missing ';base64,' marker".into())
        })?;

        if media_type.is_empty() {
            return Err(AetheriaError::InvalidDataUri("empty media type".into()));
        }
        if media_type.contains(';') || media_type.contains(',') {
            return Err(AetheriaError::InvalidDataUri(format!(
                "unsupported media type parameters in '{media_type}'"
            )));
        }

        let bytes = BASE64
            .decode(payload.trim_end())
            .map_err(|e| AetheriaError::InvalidDataUri(format!("invalid base64 payload: {e}")))?;

        Ok(Self::new(media_type, bytes))
    }

    /// File extension implied by the declared media type.
    pub fn extension(&self) -> &'static str {
        extension_for_media_type(&self.media_type)
    }
}

impl fmt::Debug for EncodedImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncodedImage")
            .field("media_type", &self.media_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

impl Serialize for EncodedImage {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_data_uri())
    }
}

impl<'de> Deserialize<'de> for EncodedImage {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let uri = String::deserialize(deserializer)?;
        Self::from_data_uri(&uri).map_err(serde::de::Error::custom)
    }
}

/// Read all bytes from `reader` and wrap them with the reported media type.
pub fn encode<R: Read>(mut reader: R, media_type: &str) -> Result<EncodedImage> {
    let mut bytes = Vec::new();
    reader
        .read_to_end(&mut bytes)
        .map_err(|e| AetheriaError::Read(e.to_string()))?;
    Ok(EncodedImage::new(media_type, bytes))
}

/// Encode a file on disk, taking its media type from the file extension.
pub fn encode_path(path: &Path) -> Result<EncodedImage> {
    let file = std::fs::File::open(path)
        .map_err(|e| AetheriaError::Read(format!("{}: {e}", path.display())))?;
    encode(file, media_type_for_path(path))
}

/// Media type reported for a file name, by extension.
pub fn media_type_for_path(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|s| s.to_lowercase())
        .as_deref()
    {
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("webp") => "image/webp",
        Some("gif") => "image/gif",
        Some("bmp") => "image/bmp",
        Some("tif" | "tiff") => "image/tiff",
        _ => FALLBACK_MEDIA_TYPE,
    }
}

/// File extension for a media type, used when building storage paths.
pub fn extension_for_media_type(media_type: &str) -> &'static str {
    match media_type.to_lowercase().as_str() {
        "image/png" => "png",
        "image/jpeg" | "image/jpg" => "jpg",
        "image/webp" => "webp",
        "image/gif" => "gif",
        "image/bmp" => "bmp",
        "image/tiff" => "tiff",
        _ => "bin",
    }
}
