//! Domain error types
//!
//! This module defines the error hierarchy for Shroud. Configuration and
//! validation failures surface to the caller; detector failures are typed so
//! the ensemble can inspect, log and absorb them.

use serde_json::{json, Map, Value};
use thiserror::Error;

/// Main Shroud error type
///
/// This is the primary error type used throughout the library. Validation
/// errors carry a structured detail payload alongside the message.
#[derive(Debug, Error)]
pub enum ShroudError {
    /// Configuration-related errors (bad patterns, thresholds, detector sets)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Input validation errors raised before any detection work
    #[error("Validation error: {message}")]
    Validation {
        message: String,
        details: Map<String, Value>,
    },

    /// A detector failed and nothing absorbed the failure
    #[error("Detection error: {0}")]
    Detection(#[from] DetectorFailure),

    /// Requested anonymization mode does not exist
    #[error("Unsupported anonymization mode '{mode}' (available: {})", available.join(", "))]
    UnsupportedMode {
        mode: String,
        available: Vec<String>,
    },

    /// A detection handed to a strategy does not fit the text
    #[error("Invalid detection: {message}")]
    InvalidDetection {
        message: String,
        details: Map<String, Value>,
    },

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl ShroudError {
    /// Validation error without extra details
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            details: Map::new(),
        }
    }

    /// Validation error with a detail payload
    pub fn validation_with(message: impl Into<String>, details: Value) -> Self {
        Self::Validation {
            message: message.into(),
            details: into_map(details),
        }
    }

    /// Input text is empty or whitespace only
    pub fn empty_text() -> Self {
        Self::validation("Input text is empty or contains only whitespace")
    }

    /// Input text exceeds the configured maximum length
    pub fn text_too_long(text_length: usize, max_length: usize) -> Self {
        Self::validation_with(
            format!("Text too long: {text_length} characters (maximum {max_length})"),
            json!({ "text_length": text_length, "max_length": max_length }),
        )
    }

    /// Detection does not fit the text it is applied to
    pub fn invalid_detection(message: impl Into<String>, details: Value) -> Self {
        Self::InvalidDetection {
            message: message.into(),
            details: into_map(details),
        }
    }

    /// Structured detail payload for API layers
    pub fn details(&self) -> Value {
        match self {
            Self::Validation { details, .. } | Self::InvalidDetection { details, .. } => {
                Value::Object(details.clone())
            }
            Self::UnsupportedMode { mode, available } => {
                json!({ "mode": mode, "available_modes": available })
            }
            Self::Detection(failure) => failure.details(),
            _ => Value::Object(Map::new()),
        }
    }
}

fn into_map(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        Value::Null => Map::new(),
        other => {
            let mut map = Map::new();
            map.insert("detail".to_string(), other);
            map
        }
    }
}

/// Failure of a single detector during one `detect()` call
///
/// Detectors return this instead of panicking or raising so callers can decide
/// whether to degrade (the ensemble does) or to surface the failure.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum DetectorFailure {
    /// A configured model could not be loaded
    #[error("Failed to load model '{model}': {reason}")]
    ModelLoading { model: String, reason: String },

    /// None of the configured models loaded
    #[error("No models could be loaded (attempted: {})", attempted.join(", "))]
    NoModelsLoaded { attempted: Vec<String> },

    /// External entity analyzer failed
    #[error("Entity analyzer failed: {0}")]
    Analyzer(String),

    /// A loaded model failed during inference
    #[error("Inference failed for model '{model}': {reason}")]
    Inference { model: String, reason: String },

    /// Detector cannot run at all
    #[error("Detector unavailable: {0}")]
    Unavailable(String),
}

impl DetectorFailure {
    /// Structured detail payload
    pub fn details(&self) -> Value {
        match self {
            Self::ModelLoading { model, reason } | Self::Inference { model, reason } => {
                json!({ "model": model, "reason": reason })
            }
            Self::NoModelsLoaded { attempted } => json!({ "attempted": attempted }),
            Self::Analyzer(reason) | Self::Unavailable(reason) => json!({ "reason": reason }),
        }
    }
}

// Conversion from std::io::Error
impl From<std::io::Error> for ShroudError {
    fn from(err: std::io::Error) -> Self {
        ShroudError::Io(err.to_string())
    }
}

// Conversion from serde_json::Error
impl From<serde_json::Error> for ShroudError {
    fn from(err: serde_json::Error) -> Self {
        ShroudError::Serialization(err.to_string())
    }
}

// Conversion from toml parse errors
impl From<toml::de::Error> for ShroudError {
    fn from(err: toml::de::Error) -> Self {
        ShroudError::Configuration(format!("TOML parse error: {err}"))
    }
}
