#![no_main]

//! Fuzz target for raster decoding and desaturation
//!
//! Arbitrary bytes declared as PNG must either fail to decode or desaturate
//! without panicking.
//!
//! Run with: cargo +nightly fuzz run fuzz_desaturate

use aetheria_core::{raster, EncodedImage};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let image = EncodedImage::new("image/png", data.to_vec());
    if let Ok(gray) = raster::desaturate(&image) {
        let _ = raster::desaturate(&gray);
    }
});
