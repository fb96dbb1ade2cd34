//! Stylize command implementation.

use std::path::PathBuf;

use aetheria_core::{AetheriaError, TransformDispatcher, TransformOp, TransformRequest};
use anyhow::{Context, Result};
use colored::Colorize;
use tracing::{info, warn};

use crate::utils::{derived_path, load_image, select_model, write_image};

/// Execute the stylize command.
///
/// Failed model calls are skipped; getting no variations at all is reported
/// but is not an error.
pub async fn execute(
    file: PathBuf,
    prompt: String,
    count: usize,
    out_dir: Option<PathBuf>,
    use_mock: bool,
    quiet: bool,
) -> Result<()> {
    if count == 0 {
        return Err(AetheriaError::Validation("--count must be at least 1".into()).into());
    }

    let source = load_image(&file)?;
    let model = select_model(use_mock, quiet)?;
    let dispatcher = TransformDispatcher::new(model).with_variation_count(count);

    let request = TransformRequest::new(TransformOp::Stylize { prompt: prompt.clone() }, source, "cli");
    let outputs = dispatcher
        .apply(&request)
        .await
        .with_context(|| format!("Failed to generate variations of {}", file.display()))?;

    if let Some(dir) = &out_dir {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to write to directory {}", dir.display()))?;
    }

    let mut saved = Vec::with_capacity(outputs.len());
    for (index, output) in outputs.iter().enumerate() {
        let suffix = format!("variation-{}", index + 1);
        let path = derived_path(&file, out_dir.as_deref(), &suffix, output.extension());
        write_image(&path, output)?;
        saved.push(path);
    }

    if saved.is_empty() {
        warn!(requested = count, "No variations could be generated");
    } else {
        info!(requested = count, generated = saved.len(), "Variations saved");
    }

    if !quiet {
        if saved.is_empty() {
            println!("{}", "No variations could be generated.".yellow().bold());
        } else {
            println!(
                "{}",
                format!("{} of {} variations generated!", saved.len(), count)
                    .green()
                    .bold()
            );
        }
        println!("   {} {}", "Style:".dimmed(), prompt);
        for path in &saved {
            println!("   {} {}", "Saved:".dimmed(), path.display());
        }
    }

    Ok(())
}
