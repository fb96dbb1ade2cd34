//! Local transform commands: desaturate and resize.
//!
//! These never call the hosted model.

use std::path::{Path, PathBuf};

use aetheria_core::{raster, EncodedImage};
use anyhow::{Context, Result};
use colored::Colorize;
use tracing::info;

use crate::utils::{derived_path, load_image, write_image};

fn apply_local(
    file: &Path,
    name: &str,
    transform: impl FnOnce(&EncodedImage) -> aetheria_core::Result<EncodedImage>,
) -> Result<EncodedImage> {
    let source = load_image(file)?;
    transform(&source).with_context(|| format!("Failed to {} {}", name, file.display()))
}

fn report(label: &str, out: &Path, image: &EncodedImage, quiet: bool) {
    info!(path = %out.display(), bytes = image.len(), "Saved transform output");
    if !quiet {
        println!("{}", label.green().bold());
        println!("   {} {}", "Saved:".dimmed(), out.display());
        println!("   {} {} bytes", "Size:".dimmed(), image.len());
    }
}

/// Execute the desaturate command.
pub fn desaturate(file: PathBuf, out: Option<PathBuf>, quiet: bool) -> Result<()> {
    let output = apply_local(&file, "desaturate", raster::desaturate)?;
    let out = out.unwrap_or_else(|| derived_path(&file, None, "bw", output.extension()));
    write_image(&out, &output)?;
    report("Desaturated!", &out, &output, quiet);
    Ok(())
}

/// Execute the resize command.
pub fn resize(
    file: PathBuf,
    max_width: u32,
    out: Option<PathBuf>,
    quiet: bool,
) -> Result<()> {
    let output = apply_local(&file, "resize", |source| {
        raster::resize_to_width(source, max_width)
    })?;
    let out = out.unwrap_or_else(|| derived_path(&file, None, "resized", output.extension()));
    write_image(&out, &output)?;
    report("Resized!", &out, &output, quiet);
    Ok(())
}
