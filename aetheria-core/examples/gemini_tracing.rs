//! Example demonstrating Gemini model tracing instrumentation.
//!
//! Run with: GEMINI_API_KEY=... cargo run -p aetheria-core --example gemini_tracing -- photo.png

use tracing_subscriber::{fmt, EnvFilter};
use aetheria_core::model::{GeminiConfig, GeminiModel, GenerativeModel};
use aetheria_core::{encode_path, ENHANCE_INSTRUCTION};

#[tokio::main]
async fn main() {
    fmt()
        .with_env_filter(EnvFilter::new("aetheria_core=debug,info"))
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();

    println!("=== Gemini Tracing Demo ===\n");

    let Some(path) = std::env::args().nth(1) else {
        eprintln!("Usage: gemini_tracing <image>");
        return;
    };

    let config = match GeminiConfig::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("{e}");
            return;
        }
    };
    println!("Config: {:?}\n", config);

    let model = match GeminiModel::new(config) {
        Ok(m) => m,
        Err(e) => {
            eprintln!("Failed to create client: {}", e);
            return;
        }
    };

    let source = match encode_path(std::path::Path::new(&path)) {
        Ok(image) => image,
        Err(e) => {
            eprintln!("{e}");
            return;
        }
    };

    println!("\nEnhancing {} ({} bytes)...\n", path, source.len());

    match model.generate(&source, ENHANCE_INSTRUCTION).await {
        Ok(Some(image)) => {
            println!("\n✅ Success!");
            println!("   Media type: {}", image.media_type());
            println!("   Bytes:      {}", image.len());
        }
        Ok(None) => println!("\n⚠️  The model answered without an image"),
        Err(e) => println!("\n❌ Failed: {}", e),
    }
}
