#![no_main]

//! Fuzz target for EncodedImage::from_data_uri()
//!
//! Any string that parses must render back to a data URI that parses to
//! the same image.
//!
//! Run with: cargo +nightly fuzz run fuzz_data_uri

use aetheria_core::EncodedImage;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(input) = std::str::from_utf8(data) else {
        return;
    };

    if let Ok(image) = EncodedImage::from_data_uri(input) {
        let rendered = image.to_data_uri();
        let reparsed = EncodedImage::from_data_uri(&rendered)
            .expect("rendered data URI must parse");
        assert_eq!(reparsed, image);
    }
});
