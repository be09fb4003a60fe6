//! Configuration schema types
//!
//! Every section carries defaults, so an empty file is a valid configuration.

use crate::anonymization::config::{
    AnonymizationConfig, AuditConfig, CustomPatternConfig, DetectionConfig, EnsembleConfig,
};
use serde::{Deserialize, Serialize};

/// Main Shroud configuration
///
/// This is the root configuration structure that maps to the TOML file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ShroudConfig {
    /// Application-level settings
    #[serde(default)]
    pub application: ApplicationConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Detector selection and detector settings
    #[serde(default)]
    pub detection: DetectionConfig,

    /// Ensemble settings (used when `detection.detector = "ensemble"`)
    #[serde(default)]
    pub ensemble: EnsembleConfig,

    /// Anonymization strategy settings
    #[serde(default)]
    pub anonymization: AnonymizationConfig,

    /// Audit log settings
    #[serde(default)]
    pub audit: AuditConfig,

    /// User-defined patterns for the ensemble pattern matcher
    #[serde(default)]
    pub custom_patterns: Vec<CustomPatternConfig>,
}

impl ShroudConfig {
    /// Validates the configuration
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid
    pub fn validate(&self) -> Result<(), String> {
        self.application.validate()?;
        self.logging.validate()?;
        self.detection
            .validate()
            .map_err(|e| format!("detection: {e}"))?;
        self.ensemble
            .validate()
            .map_err(|e| format!("ensemble: {e}"))?;
        self.anonymization
            .validate()
            .map_err(|e| format!("anonymization: {e}"))?;
        self.audit.validate().map_err(|e| format!("audit: {e}"))?;

        let mut seen: Vec<&str> = Vec::new();
        for pattern in &self.custom_patterns {
            if pattern.name.trim().is_empty() {
                return Err("custom_patterns: pattern name cannot be empty".to_string());
            }
            if seen.contains(&pattern.name.as_str()) {
                return Err(format!(
                    "custom_patterns: duplicate pattern name '{}'",
                    pattern.name
                ));
            }
            if !(0.0..=1.0).contains(&pattern.confidence) {
                return Err(format!(
                    "custom_patterns: confidence for '{}' must be between 0.0 and 1.0, got {}",
                    pattern.name, pattern.confidence
                ));
            }
            seen.push(&pattern.name);
        }

        Ok(())
    }
}

/// Application-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

impl ApplicationConfig {
    fn validate(&self) -> Result<(), String> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.log_level.as_str()) {
            return Err(format!(
                "Invalid log_level '{}'. Must be one of: {}",
                self.log_level,
                valid_levels.join(", ")
            ));
        }
        Ok(())
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Enable local JSON file logging
    #[serde(default)]
    pub local_enabled: bool,

    /// Local log directory
    #[serde(default = "default_local_path")]
    pub local_path: String,

    /// Log rotation strategy (daily, hourly, never)
    #[serde(default = "default_local_rotation")]
    pub local_rotation: String,
}

impl LoggingConfig {
    fn validate(&self) -> Result<(), String> {
        let valid_rotations = ["daily", "hourly", "never"];
        if !valid_rotations.contains(&self.local_rotation.as_str()) {
            return Err(format!(
                "Invalid logging.local_rotation '{}'. Must be one of: {}",
                self.local_rotation,
                valid_rotations.join(", ")
            ));
        }

        if self.local_enabled && self.local_path.trim().is_empty() {
            return Err("logging.local_path cannot be empty when local logging is enabled".to_string());
        }

        Ok(())
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            local_enabled: false,
            local_path: default_local_path(),
            local_rotation: default_local_rotation(),
        }
    }
}

// Default value functions
fn default_log_level() -> String {
    "info".to_string()
}

fn default_local_path() -> String {
    "./logs".to_string()
}

fn default_local_rotation() -> String {
    "daily".to_string()
}
