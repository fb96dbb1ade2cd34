//! Common utility functions shared across CLI commands.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use aetheria_core::{
    encode_path, EncodedImage, GenerativeModel, ModelProviderConfig, ModelProviderFactory,
};
use anyhow::{anyhow, Context, Result};
use colored::Colorize;
use tracing::{debug, warn};

/// Read an image file and transfer-encode it.
pub fn load_image(path: &Path) -> Result<EncodedImage> {
    let image =
        encode_path(path).with_context(|| format!("Failed to read file: {}", path.display()))?;
    debug!(path = %path.display(), bytes = image.len(), media_type = image.media_type(), "Read image");
    Ok(image)
}

/// Write an image's bytes to `path`.
pub fn write_image(path: &Path, image: &EncodedImage) -> Result<()> {
    std::fs::write(path, image.bytes())
        .with_context(|| format!("Failed to write {}", path.display()))?;
    debug!(path = %path.display(), bytes = image.len(), "Wrote image");
    Ok(())
}

/// Build `<dir>/<stem>.<suffix>.<ext>` next to `file`, or inside `dir` when given.
pub fn derived_path(file: &Path, dir: Option<&Path>, suffix: &str, ext: &str) -> PathBuf {
    let stem = file
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("image");
    let name = format!("{}.{}.{}", stem, suffix, ext);
    match dir.or_else(|| file.parent()) {
        Some(dir) => dir.join(name),
        None => PathBuf::from(name),
    }
}

/// Pick the model for a remote transform.
pub fn select_model(use_mock: bool, quiet: bool) -> Result<Arc<dyn GenerativeModel>> {
    if use_mock {
        warn!("Using MOCK model (outputs echo the input)");
        if !quiet {
            eprintln!("{}", "Using MOCK model (outputs echo the input)".yellow());
        }
        return Ok(ModelProviderFactory::create_mock());
    }

    // The library error is flattened so it classifies as an unavailable model.
    ModelProviderFactory::create(ModelProviderConfig::Auto)
        .map_err(|e| anyhow!("Model unavailable: {}", e))
}
