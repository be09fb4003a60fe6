//! Init command implementation
//!
//! This module implements the `init` command for generating a sample
//! configuration file.

use clap::Args;
use std::fs;
use std::path::Path;

/// Arguments for the init command
#[derive(Args, Debug)]
pub struct InitArgs {
    /// Path where to create the configuration file
    #[arg(short, long, default_value = "shroud.toml")]
    pub output: String,

    /// Include every option with comments
    #[arg(long)]
    pub with_examples: bool,

    /// Overwrite existing file
    #[arg(long)]
    pub force: bool,
}

impl InitArgs {
    /// Execute the init command
    pub fn execute(&self) -> anyhow::Result<i32> {
        tracing::info!(output = %self.output, "Initializing configuration file");

        println!("📝 Initializing Shroud configuration");
        println!();

        if Path::new(&self.output).exists() && !self.force {
            println!("❌ Configuration file already exists: {}", self.output);
            println!("   Use --force to overwrite");
            return Ok(2);
        }

        let config_content = if self.with_examples {
            Self::generate_config_with_examples()
        } else {
            Self::generate_minimal_config()
        };

        match fs::write(&self.output, config_content) {
            Ok(_) => {
                println!("✅ Configuration file created: {}", self.output);
                println!();
                println!("Next steps:");
                println!("  1. Edit {} with your settings", self.output);
                println!("  2. Validate configuration: shroud validate-config");
                println!("  3. Try it: echo 'Contact john@test.com' | shroud anonymize");
                println!();
                Ok(0)
            }
            Err(e) => {
                println!("❌ Failed to write configuration file");
                println!("   Error: {e}");
                Ok(5)
            }
        }
    }

    /// Generate minimal configuration
    fn generate_minimal_config() -> String {
        r#"# Shroud Configuration File
# PII detection and anonymization

[application]
log_level = "info"

[detection]
detector = "neural"  # neural | statistical | ensemble
default_language = "it"

[anonymization]
default_mode = "redact"  # redact | substitute | visual_redact

[audit]
enabled = false
"#
        .to_string()
    }

    /// Generate configuration with examples and comments
    fn generate_config_with_examples() -> String {
        r#"# Shroud Configuration File
# PII detection and anonymization
#
# Every section is optional; missing values fall back to the defaults shown.
# Values may reference environment variables with ${VAR_NAME}.

# ============================================================================
# Application Settings
# ============================================================================
[application]
# Log level (trace, debug, info, warn, error)
log_level = "info"

# ============================================================================
# Logging Configuration
# ============================================================================
[logging]
# Write JSON logs to rotating files in addition to the console
local_enabled = false

# Log directory
local_path = "./logs"

# Rotation (daily, hourly, never)
local_rotation = "daily"

# ============================================================================
# Detection
# ============================================================================
[detection]
# Detector: "neural" (falls back to statistical), "statistical" or "ensemble"
detector = "neural"

# Language used when a request does not name one
default_language = "it"

# Maximum input length in characters
max_text_length = 10000000

# Detections below this confidence are dropped
confidence_threshold = 0.0

# Request language to analyzer locale
[detection.statistical.language_map]
it = "en"
en = "en"

[detection.neural]
# Directory holding <model>.toml gazetteer models
model_dir = "./models"

# Models run in order; a model with languages only serves those languages
[[detection.neural.models]]
name = "ner-multi"

[[detection.neural.models]]
name = "ner-english"
languages = ["en"]

# ============================================================================
# Ensemble (used when detection.detector = "ensemble")
# ============================================================================
[ensemble]
# Members: patterns, statistical, neural
members = ["statistical", "patterns"]

# unanimous | majority | any | weighted
voting_strategy = "weighted"

# Minimum aggregated confidence for a detection to survive
min_confidence = 0.5

# Minimum number of agreeing detectors
min_votes = 1

# Adapt detector weights from reported feedback
adaptive = false

# Feedback events a detector needs before its weight adapts
min_feedback = 10

# Accuracy estimate: lifetime hit ratio, or an exponential moving average
# decay_policy = { policy = "exponential_moving_average", alpha = 0.2 }
decay_policy = { policy = "cumulative" }

# Per-detector weight overrides
# [ensemble.weights]
# PatternMatcher = 0.8
# StatisticalDetector = 1.0
# NeuralDetector = 1.2

# ============================================================================
# Anonymization
# ============================================================================
[anonymization]
# redact | substitute | visual_redact
default_mode = "redact"

# Fill character for redact mode (length-preserving)
redaction_character = "█"

# Block written over each span in visual_redact mode
visual_block = "██████"

# Request language to fake-data locale (en, fr_fr)
[anonymization.faker_locales]
en = "en"
fr = "fr_fr"

# ============================================================================
# Audit Log
# ============================================================================
[audit]
# Append one entry per request; values are stored as SHA-256 hashes
enabled = false
log_path = "./audit/anonymization.log"
json_format = true

# ============================================================================
# Custom Patterns (pattern matcher ensemble member)
# ============================================================================
# [[custom_patterns]]
# name = "ORDER_ID"
# pattern = 'ORD-\d{5}'
# confidence = 0.95
# description = "Order number"
# case_insensitive = true
"#
        .to_string()
    }
}
