//! Exit codes following sysexits.h conventions.
//!
//! These codes provide semantic meaning for different failure modes,
//! enabling scripts and CI systems to handle errors appropriately.

use aetheria_core::AetheriaError;

/// General error (catch-all).
pub const GENERAL_ERROR: i32 = 1;

/// Command line usage error (missing prompt, invalid width).
/// Maps to EX_USAGE from sysexits.h.
pub const USAGE_ERROR: i32 = 64;

/// Data format error (undecodable image, malformed data URI).
/// Maps to EX_DATAERR from sysexits.h.
pub const DATA_ERROR: i32 = 65;

/// Cannot open input file.
/// Maps to EX_NOINPUT from sysexits.h.
pub const INPUT_ERROR: i32 = 66;

/// Image model unavailable or failed.
/// Maps to EX_UNAVAILABLE from sysexits.h.
pub const MODEL_UNAVAILABLE: i32 = 69;

/// I/O error (cannot write output file).
/// Maps to EX_IOERR from sysexits.h.
pub const IO_ERROR: i32 = 74;

/// Represents an exit code with optional error context.
pub struct ExitCode {
    pub code: i32,
    pub message: Option<String>,
}

impl ExitCode {
    pub fn from_anyhow(err: &anyhow::Error) -> Self {
        let message = format!("{err:#}");

        // Library errors carry their own classification
        let from_library = err
            .chain()
            .find_map(|cause| cause.downcast_ref::<AetheriaError>())
            .map(code_for);

        let code = from_library.unwrap_or_else(|| {
            if message.contains("Failed to read file") {
                INPUT_ERROR
            } else if message.contains("Model unavailable") {
                MODEL_UNAVAILABLE
            } else if message.contains("Failed to write") {
                IO_ERROR
            } else {
                GENERAL_ERROR
            }
        });

        Self {
            code,
            message: Some(message),
        }
    }
}

fn code_for(err: &AetheriaError) -> i32 {
    match err {
        AetheriaError::Validation(_) => USAGE_ERROR,
        AetheriaError::Decode(_) | AetheriaError::InvalidDataUri(_) => DATA_ERROR,
        AetheriaError::Read(_) => INPUT_ERROR,
        AetheriaError::Transform(_) => MODEL_UNAVAILABLE,
        AetheriaError::ObjectStore(_) | AetheriaError::MetadataStore(_) => IO_ERROR,
        AetheriaError::Busy(_) => GENERAL_ERROR,
    }
}
