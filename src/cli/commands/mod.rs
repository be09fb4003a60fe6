//! CLI command implementations
//!
//! This module contains all CLI command implementations and the helpers
//! they share for loading configuration and reading input.

pub mod anonymize;
pub mod detect;
pub mod init;
pub mod validate;

use crate::config::{default_config, load_config, ShroudConfig};
use crate::domain::ShroudError;
use anyhow::Context;
use std::io::Read;
use std::path::Path;

/// Configuration file used when `--config` is not given
pub const DEFAULT_CONFIG_PATH: &str = "shroud.toml";

/// Load the configuration for a command
///
/// A missing file at the default path means built-in defaults; a missing
/// file anywhere else is an error.
pub fn resolve_config(config_path: &str) -> crate::domain::Result<ShroudConfig> {
    if config_path == DEFAULT_CONFIG_PATH && !Path::new(config_path).exists() {
        tracing::debug!("No configuration file found, using built-in defaults");
        return default_config();
    }
    load_config(config_path)
}

/// Read command input from a file, or from stdin when `input` is `-`
pub fn read_input(input: &str) -> anyhow::Result<String> {
    if input == "-" {
        let mut buffer = String::new();
        std::io::stdin()
            .read_to_string(&mut buffer)
            .context("Failed to read from stdin")?;
        Ok(buffer)
    } else {
        std::fs::read_to_string(input).with_context(|| format!("Failed to read input file: {input}"))
    }
}

/// Exit code for a library error surfaced to the user
pub fn exit_code_for(error: &ShroudError) -> i32 {
    match error {
        ShroudError::Configuration(_)
        | ShroudError::Validation { .. }
        | ShroudError::UnsupportedMode { .. }
        | ShroudError::InvalidDetection { .. } => 2,
        _ => 5,
    }
}
