//! Subcommand implementations.

pub mod encode;
pub mod enhance;
pub mod local;
pub mod stylize;
