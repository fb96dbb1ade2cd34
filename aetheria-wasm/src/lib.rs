//! WebAssembly bindings for Aetheria local image transforms.
//!
//! The browser can desaturate or shrink a photo before upload without a
//! round trip to the server. Images go in and come out as data URIs.

use aetheria_core::{raster, AetheriaError, EncodedImage};
use serde::{Deserialize, Serialize};
use wasm_bindgen::prelude::*;

/// Initialize panic hook for better error messages in browser console.
#[wasm_bindgen(start)]
pub fn init() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

/// Result of a local transform.
#[derive(Debug, Serialize, Deserialize)]
pub struct TransformResult {
    /// Whether the transform produced an image
    pub ok: bool,
    /// Operation that was applied
    pub operation: String,
    /// Output as a data URI, empty on failure
    pub data_uri: String,
    /// Output media type
    pub media_type: String,
    /// Output size in bytes
    pub size: usize,
    /// Error message if the transform failed
    pub error: Option<String>,
}

impl TransformResult {
    fn success(operation: &str, image: &EncodedImage) -> Self {
        Self {
            ok: true,
            operation: operation.to_string(),
            data_uri: image.to_data_uri(),
            media_type: image.media_type().to_string(),
            size: image.len(),
            error: None,
        }
    }

    fn failure(operation: &str, err: AetheriaError) -> Self {
        Self {
            ok: false,
            operation: operation.to_string(),
            data_uri: String::new(),
            media_type: String::new(),
            size: 0,
            error: Some(err.to_string()),
        }
    }

    fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|e| {
            format!(r#"{{"ok":false,"error":"Serialization error: {}"}}"#, e)
        })
    }
}

/// Convert a data-URI image to black and white.
///
/// # Returns
/// A JSON string containing the transform result
#[wasm_bindgen]
pub fn desaturate_data_uri(data_uri: &str) -> String {
    run("desaturate", desaturate_internal(data_uri)).to_json()
}

/// Scale a data-URI image down to at most `max_width` pixels wide.
///
/// Images already narrow enough come back unchanged.
#[wasm_bindgen]
pub fn resize_data_uri(data_uri: &str, max_width: u32) -> String {
    run("resize", resize_internal(data_uri, max_width)).to_json()
}

/// Media type declared by a data URI, or an empty string when it is malformed.
#[wasm_bindgen]
pub fn data_uri_media_type(data_uri: &str) -> String {
    EncodedImage::from_data_uri(data_uri)
        .map(|image| image.media_type().to_string())
        .unwrap_or_default()
}

/// Get the library version.
#[wasm_bindgen]
pub fn get_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

fn run(operation: &str, outcome: aetheria_core::Result<EncodedImage>) -> TransformResult {
    match outcome {
        Ok(image) => TransformResult::success(operation, &image),
        Err(e) => TransformResult::failure(operation, e),
    }
}

fn desaturate_internal(data_uri: &str) -> aetheria_core::Result<EncodedImage> {
    let source = EncodedImage::from_data_uri(data_uri)?;
    raster::desaturate(&source)
}

fn resize_internal(data_uri: &str, max_width: u32) -> aetheria_core::Result<EncodedImage> {
    let source = EncodedImage::from_data_uri(data_uri)?;
    raster::resize_to_width(&source, max_width)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn png_uri(width: u32, height: u32) -> String {
        let pixels = image::RgbaImage::from_fn(width, height, |x, _| {
            image::Rgba([(x * 40) as u8, 100, 200, 255])
        });
        raster::encode_png(&image::DynamicImage::ImageRgba8(pixels))
            .unwrap()
            .to_data_uri()
    }

    fn parse(json: &str) -> TransformResult {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_desaturate_returns_png_data_uri() {
        let result = parse(&desaturate_data_uri(&png_uri(3, 2)));
        assert!(result.ok);
        assert_eq!(result.operation, "desaturate");
        assert_eq!(result.media_type, "image/png");
        assert!(result.data_uri.starts_with("data:image/png;base64,"));

        let output = EncodedImage::from_data_uri(&result.data_uri).unwrap();
        let pixels = raster::decode(&output).unwrap().to_rgba8();
        assert!(pixels.pixels().all(|p| p[0] == p[1] && p[1] == p[2]));
        assert_eq!(result.size, output.len());
    }

    #[test]
    fn test_resize_scales_width() {
        let result = parse(&resize_data_uri(&png_uri(8, 4), 4));
        assert!(result.ok);

        let output = EncodedImage::from_data_uri(&result.data_uri).unwrap();
        let pixels = raster::decode(&output).unwrap();
        assert_eq!((pixels.width(), pixels.height()), (4, 2));
    }

    #[test]
    fn test_malformed_uri_reports_error() {
        let result = parse(&desaturate_data_uri("not a data uri"));
        assert!(!result.ok);
        assert!(result.data_uri.is_empty());
        assert!(result.error.unwrap().contains("Invalid data URI"));
    }

    #[test]
    fn test_zero_width_reports_error() {
        let result = parse(&resize_data_uri(&png_uri(2, 2), 0));
        assert!(!result.ok);
        assert_eq!(result.operation, "resize");
    }

    #[test]
    fn test_media_type_of_uri() {
        assert_eq!(data_uri_media_type(&png_uri(1, 1)), "image/png");
        assert_eq!(data_uri_media_type("garbage"), "");
    }

    #[test]
    fn test_get_version() {
        assert!(!get_version().is_empty());
    }
}
