//! Local pixel transforms that never touch the network.
//!
//! Sources are decoded using their *declared* media type. Outputs are always
//! PNG so that the alpha channel survives the round trip.

use std::io::Cursor;

use image::{imageops::FilterType, DynamicImage, GenericImageView, ImageFormat, RgbaImage};
use tracing::debug;

use crate::encoding::EncodedImage;
use crate::error::{AetheriaError, Result};

/// Media type of every raster transform output.
pub const OUTPUT_MEDIA_TYPE: &str = "image/png";

/// Decode an encoded image into pixels, trusting its declared media type.
pub fn decode(image: &EncodedImage) -> Result<DynamicImage> {
    let format = ImageFormat::from_mime_type(image.media_type()).ok_or_else(|| {
        AetheriaError::Decode(format!(
            "unsupported image media type '{}'",
            image.media_type()
        ))
    })?;

    image::load_from_memory_with_format(image.bytes(), format)
        .map_err(|e| AetheriaError::Decode(format!("failed to decode {}: {e}", image.media_type())))
}

/// Encode pixels as PNG.
pub fn encode_png(pixels: &DynamicImage) -> Result<EncodedImage> {
    let mut buffer = Cursor::new(Vec::new());
    pixels
        .write_to(&mut buffer, ImageFormat::Png)
        .map_err(|e| AetheriaError::Decode(format!("failed to encode PNG: {e}")))?;
    Ok(EncodedImage::new(OUTPUT_MEDIA_TYPE, buffer.into_inner()))
}

/// Replace R, G and B of every pixel with their arithmetic mean.
///
/// Alpha is left untouched. Gray pixels are fixed points, so applying this
/// twice yields the same pixels as applying it once.
pub fn desaturate_pixels(pixels: &mut RgbaImage) {
    for pixel in pixels.pixels_mut() {
        let [r, g, b, _] = pixel.0;
        let sum = u16::from(r) + u16::from(g) + u16::from(b);
        // Round half up: (sum + 1) / 3 == round(sum / 3) for integer sums.
        let mean = ((sum + 1) / 3) as u8;
        pixel.0[0] = mean;
        pixel.0[1] = mean;
        pixel.0[2] = mean;
    }
}

/// Decode, desaturate and re-encode as PNG.
pub fn desaturate(image: &EncodedImage) -> Result<EncodedImage> {
    let decoded = decode(image)?;
    let (width, height) = decoded.dimensions();
    let mut pixels = decoded.to_rgba8();
    desaturate_pixels(&mut pixels);
    debug!(width, height, "Desaturated image");
    encode_png(&DynamicImage::ImageRgba8(pixels))
}

/// Target dimensions when scaling `width`x`height` down to `max_width`.
///
/// Returns `None` when the image already fits.
pub fn scaled_dimensions(width: u32, height: u32, max_width: u32) -> Option<(u32, u32)> {
    if max_width == 0 || width <= max_width {
        return None;
    }
    let scaled_height = (u64::from(height) * u64::from(max_width) + u64::from(width) / 2)
        / u64::from(width);
    Some((max_width, scaled_height.max(1) as u32))
}

/// Scale the image down to at most `max_width` pixels wide, keeping the
/// aspect ratio, with a single triangle-filter resample.
///
/// An image that already fits is returned unchanged, in its original encoding.
pub fn resize_to_width(image: &EncodedImage, max_width: u32) -> Result<EncodedImage> {
    if max_width == 0 {
        return Err(AetheriaError::Validation(
            "max width must be greater than zero".into(),
        ));
    }

    let decoded = decode(image)?;
    let (width, height) = decoded.dimensions();

    match scaled_dimensions(width, height, max_width) {
        Some((new_width, new_height)) => {
            debug!(width, height, new_width, new_height, "Resizing image");
            let resized = decoded.resize_exact(new_width, new_height, FilterType::Triangle);
            encode_png(&resized)
        }
        None => Ok(image.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn sample_png(width: u32, height: u32) -> EncodedImage {
        let mut pixels = RgbaImage::new(width, height);
        for (x, y, pixel) in pixels.enumerate_pixels_mut() {
            *pixel = Rgba([(x * 40) as u8, (y * 60) as u8, 200, (x * 10 + y) as u8]);
        }
        encode_png(&DynamicImage::ImageRgba8(pixels)).unwrap()
    }

    #[test]
    fn test_desaturate_pixel_mean() {
        let mut pixels = RgbaImage::from_pixel(1, 1, Rgba([10, 20, 40, 77]));
        desaturate_pixels(&mut pixels);
        // (10 + 20 + 40) / 3 = 23.33 -> 23
        assert_eq!(pixels.get_pixel(0, 0).0, [23, 23, 23, 77]);

        let mut pixels = RgbaImage::from_pixel(1, 1, Rgba([255, 255, 254, 0]));
        desaturate_pixels(&mut pixels);
        // 764 / 3 = 254.67 -> 255
        assert_eq!(pixels.get_pixel(0, 0).0, [255, 255, 255, 0]);
    }

    #[test]
    fn test_desaturate_keeps_dimensions_and_alpha() {
        let source = sample_png(5, 4);
        let output = desaturate(&source).unwrap();
        assert_eq!(output.media_type(), OUTPUT_MEDIA_TYPE);

        let before = decode(&source).unwrap().to_rgba8();
        let after = decode(&output).unwrap().to_rgba8();
        assert_eq!(before.dimensions(), after.dimensions());
        for (a, b) in before.pixels().zip(after.pixels()) {
            assert_eq!(a.0[3], b.0[3]);
            assert_eq!(b.0[0], b.0[1]);
            assert_eq!(b.0[1], b.0[2]);
        }
    }

    #[test]
    fn test_desaturate_undecodable_is_decode_error() {
        let garbage = EncodedImage::new("image/png", b"not a png".to_vec());
        assert!(matches!(desaturate(&garbage), Err(AetheriaError::Decode(_))));

        let unknown = EncodedImage::new("application/octet-stream", vec![0; 8]);
        assert!(matches!(desaturate(&unknown), Err(AetheriaError::Decode(_))));
    }

    #[test]
    fn test_scaled_dimensions() {
        assert_eq!(scaled_dimensions(800, 600, 400), Some((400, 300)));
        assert_eq!(scaled_dimensions(1000, 333, 500), Some((500, 167)));
        assert_eq!(scaled_dimensions(300, 200, 400), None);
        assert_eq!(scaled_dimensions(4000, 1, 10), Some((10, 1)));
    }

    #[test]
    fn test_resize_to_width() {
        let source = sample_png(6, 4);
        let output = resize_to_width(&source, 3).unwrap();
        let decoded = decode(&output).unwrap();
        assert_eq!(decoded.dimensions(), (3, 2));

        let unchanged = resize_to_width(&source, 10).unwrap();
        assert_eq!(unchanged, source);
    }

    #[test]
    fn test_resize_zero_width_rejected() {
        let source = sample_png(2, 2);
        assert!(matches!(
            resize_to_width(&source, 0),
            Err(AetheriaError::Validation(_))
        ));
    }
}
