//! Enhance command implementation.

use std::path::PathBuf;

use aetheria_core::{TransformDispatcher, TransformOp, TransformRequest};
use anyhow::{Context, Result};
use colored::Colorize;
use tracing::info;

use crate::utils::{derived_path, load_image, select_model, write_image};

/// Execute the enhance command.
pub async fn execute(file: PathBuf, out: Option<PathBuf>, use_mock: bool, quiet: bool) -> Result<()> {
    let source = load_image(&file)?;
    let model = select_model(use_mock, quiet)?;
    let model_name = model.source_id();
    let dispatcher = TransformDispatcher::new(model);

    let request = TransformRequest::new(TransformOp::Enhance, source, "cli");
    let output = dispatcher
        .apply(&request)
        .await
        .with_context(|| format!("Failed to enhance {}", file.display()))?
        .into_iter()
        .next()
        .with_context(|| format!("Failed to enhance {}: no output", file.display()))?;

    let out = out.unwrap_or_else(|| derived_path(&file, None, "enhanced", output.extension()));
    write_image(&out, &output)?;
    info!(path = %out.display(), model = %model_name, "Enhancement saved");

    if !quiet {
        println!("{}", "Image enhanced!".green().bold());
        println!("   {} {}", "Saved:".dimmed(), out.display());
        println!("   {} {}", "Model:".dimmed(), model_name);
    }

    Ok(())
}
