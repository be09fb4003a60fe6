// Shroud - Multi-detector PII detection and anonymization
// Copyright (c) 2025 Shroud Contributors
// Licensed under the MIT License

use clap::Parser;
use shroud::cli::commands::resolve_config;
use shroud::cli::Cli;
use shroud::config::LoggingConfig;
use shroud::logging::init_logging;
use std::process;

fn main() {
    // .env is optional
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    // File logging follows the configuration when it loads; a broken config
    // is reported by the command itself.
    let (config_level, logging_config) = match resolve_config(&cli.config) {
        Ok(config) => (Some(config.application.log_level), config.logging),
        Err(_) => (None, LoggingConfig::default()),
    };
    let log_level = cli
        .log_level
        .clone()
        .or(config_level)
        .unwrap_or_else(|| "info".to_string());

    let _guard = match init_logging(&log_level, &logging_config) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {e}");
            process::exit(5);
        }
    };

    tracing::debug!(version = env!("CARGO_PKG_VERSION"), "Shroud starting");

    let exit_code = match cli.execute() {
        Ok(code) => code,
        Err(e) => {
            tracing::error!(error = %e, "Command execution failed");
            eprintln!("Error: {e:#}");
            5
        }
    };

    // Flush file logs before exiting
    drop(_guard);
    process::exit(exit_code);
}
