//! CLI interface and argument parsing
//!
//! This module provides the command-line interface for Shroud using clap.

pub mod commands;

use clap::{Parser, Subcommand};

/// Shroud - PII detection and anonymization
#[derive(Parser, Debug)]
#[command(name = "shroud")]
#[command(version, about, long_about = None)]
#[command(author = "Shroud Contributors")]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = commands::DEFAULT_CONFIG_PATH, env = "SHROUD_CONFIG")]
    pub config: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "SHROUD_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Detect and anonymize PII in a text
    Anonymize(commands::anonymize::AnonymizeArgs),

    /// Detect PII and print detections with a report
    Detect(commands::detect::DetectArgs),

    /// Validate configuration file
    ValidateConfig(commands::validate::ValidateArgs),

    /// Initialize a new configuration file
    Init(commands::init::InitArgs),
}

impl Cli {
    /// Execute the selected command, returning the process exit code
    pub fn execute(&self) -> anyhow::Result<i32> {
        match &self.command {
            Commands::Anonymize(args) => args.execute(&self.config),
            Commands::Detect(args) => args.execute(&self.config),
            Commands::ValidateConfig(args) => args.execute(&self.config),
            Commands::Init(args) => args.execute(),
        }
    }
}
