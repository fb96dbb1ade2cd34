//! Encode command implementation.

use std::path::PathBuf;

use anyhow::{Context, Result};
use colored::Colorize;
use tracing::info;

use crate::utils::load_image;

/// Execute the encode command.
pub fn execute(file: PathBuf, out: Option<PathBuf>, quiet: bool) -> Result<()> {
    let image = load_image(&file)?;
    let uri = image.to_data_uri();

    match out {
        Some(path) => {
            std::fs::write(&path, &uri)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            info!(path = %path.display(), chars = uri.len(), "Data URI saved");
            if !quiet {
                println!("{}", "Encoded!".green().bold());
                println!("   {} {}", "Media type:".dimmed(), image.media_type());
                println!("   {} {}", "Saved:".dimmed(), path.display());
            }
        }
        // The data URI itself is the output, so quiet does not suppress it.
        None => println!("{}", uri),
    }

    Ok(())
}
