//! Validate config command implementation
//!
//! This module implements the `validate-config` command for validating
//! the Shroud configuration file.

use crate::anonymization::config::DetectorKind;
use crate::anonymization::engine::build_ensemble;
use crate::anonymization::detector::PatternMatcher;
use crate::config::load_config;
use clap::Args;

/// Arguments for the validate-config command
#[derive(Args, Debug)]
pub struct ValidateArgs {}

impl ValidateArgs {
    /// Execute the validate-config command
    pub fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!(config_path = %config_path, "Validating configuration");

        println!("🔍 Validating configuration file: {config_path}");
        println!();

        // load_config validates every section
        let config = match load_config(config_path) {
            Ok(c) => {
                println!("✅ Configuration file loaded successfully");
                c
            }
            Err(e) => {
                println!("❌ Failed to load configuration file");
                println!("   Error: {e}");
                return Ok(2);
            }
        };

        // Patterns only fail when compiled
        if let Err(e) = PatternMatcher::from_configs(&config.custom_patterns) {
            println!("❌ Custom pattern compilation failed");
            println!("   Error: {e}");
            return Ok(2);
        }
        if config.detection.detector == DetectorKind::Ensemble {
            if let Err(e) = build_ensemble(&config) {
                println!("❌ Ensemble construction failed");
                println!("   Error: {e}");
                return Ok(2);
            }
        }

        println!("✅ Configuration is valid");
        println!();
        println!("Configuration Summary:");
        println!("  Log Level: {}", config.application.log_level);
        println!("  Detector: {:?}", config.detection.detector);
        println!("  Default Language: {}", config.detection.default_language);
        println!(
            "  Confidence Threshold: {}",
            config.detection.confidence_threshold
        );
        if config.detection.detector == DetectorKind::Ensemble {
            println!("  Ensemble Members: {:?}", config.ensemble.members);
            println!("  Voting Strategy: {}", config.ensemble.voting_strategy);
            println!("  Min Confidence: {}", config.ensemble.min_confidence);
            println!("  Min Votes: {}", config.ensemble.min_votes);
            println!("  Adaptive Weights: {}", config.ensemble.adaptive);
        } else {
            let models: Vec<&str> = config
                .detection
                .neural
                .models
                .iter()
                .map(|m| m.name.as_str())
                .collect();
            println!("  Neural Models: {models:?}");
            println!(
                "  Model Directory: {}",
                config.detection.neural.model_dir.display()
            );
        }
        println!("  Default Mode: {}", config.anonymization.default_mode);
        println!("  Custom Patterns: {}", config.custom_patterns.len());
        println!(
            "  Audit Log: {}",
            if config.audit.enabled {
                config.audit.log_path.display().to_string()
            } else {
                "disabled".to_string()
            }
        );
        println!();
        Ok(0)
    }
}
