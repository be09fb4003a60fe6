//! Integration tests for configuration loading and validation
//!
//! Note: Tests that modify environment variables hold ENV_MUTEX so they do not
//! interfere with each other.

use shroud::anonymization::config::{AnonymizationMode, DetectorKind, EnsembleMember};
use shroud::anonymization::ensemble::VotingStrategy;
use shroud::anonymization::AnonymizationEngine;
use shroud::config::{default_config, load_config, load_config_str};
use std::io::Write;
use std::sync::Mutex;
use tempfile::NamedTempFile;

// Mutex to serialize tests that modify environment variables
static ENV_MUTEX: Mutex<()> = Mutex::new(());

/// Helper function to clean up environment variables
fn cleanup_env_vars() {
    std::env::remove_var("SHROUD_APPLICATION_LOG_LEVEL");
    std::env::remove_var("SHROUD_DETECTION_DETECTOR");
    std::env::remove_var("SHROUD_DETECTION_DEFAULT_LANGUAGE");
    std::env::remove_var("SHROUD_DETECTION_CONFIDENCE_THRESHOLD");
    std::env::remove_var("SHROUD_ENSEMBLE_VOTING_STRATEGY");
    std::env::remove_var("SHROUD_ANONYMIZATION_DEFAULT_MODE");
    std::env::remove_var("SHROUD_AUDIT_ENABLED");
    std::env::remove_var("SHROUD_AUDIT_LOG_PATH");
    std::env::remove_var("TEST_SHROUD_AUDIT_DIR");
}

fn write_config(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

#[test]
fn test_load_complete_config() {
    let _lock = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    cleanup_env_vars();

    let toml_content = r#"
[application]
log_level = "debug"

[logging]
local_enabled = false
local_path = "/tmp/shroud"
local_rotation = "hourly"

[detection]
detector = "ensemble"
default_language = "en"
confidence_threshold = 0.6

[detection.statistical.language_map]
en = "en"
fr = "fr"

[ensemble]
members = ["statistical", "patterns"]
voting_strategy = "majority"
min_confidence = 0.7
min_votes = 1
adaptive = true

[ensemble.weights]
PatternMatcher = 1.5

[anonymization]
default_mode = "substitute"
redaction_character = "*"
visual_block = "[REDACTED]"

[anonymization.faker_locales]
en = "en"
fr = "fr_fr"

[audit]
enabled = false
json_format = false

[[custom_patterns]]
name = "EMPLOYEE_ID"
pattern = 'EMP-\d{7}'
confidence = 0.95
description = "Internal employee badge"
"#;

    let file = write_config(toml_content);
    let config = load_config(file.path()).unwrap();

    assert_eq!(config.application.log_level, "debug");
    assert_eq!(config.logging.local_rotation, "hourly");
    assert_eq!(config.detection.detector, DetectorKind::Ensemble);
    assert_eq!(config.detection.default_language, "en");
    assert_eq!(config.detection.confidence_threshold, 0.6);
    assert_eq!(
        config.ensemble.members,
        vec![EnsembleMember::Statistical, EnsembleMember::Patterns]
    );
    assert_eq!(config.ensemble.voting_strategy, VotingStrategy::Majority);
    assert_eq!(config.ensemble.weights["PatternMatcher"], 1.5);
    assert!(config.ensemble.adaptive);
    assert_eq!(config.anonymization.default_mode, AnonymizationMode::Substitute);
    assert_eq!(config.anonymization.redaction_character, '*');
    assert_eq!(config.custom_patterns.len(), 1);
    assert_eq!(config.custom_patterns[0].name, "EMPLOYEE_ID");
    assert!(config.custom_patterns[0].case_insensitive);

    cleanup_env_vars();
}

#[test]
fn test_empty_file_uses_defaults() {
    let _lock = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    cleanup_env_vars();

    let config = load_config_str("").unwrap();
    assert_eq!(config.application.log_level, "info");
    assert_eq!(config.detection.detector, DetectorKind::Neural);
    assert_eq!(config.detection.default_language, "it");
    assert_eq!(config.ensemble.voting_strategy, VotingStrategy::Weighted);
    assert_eq!(config.ensemble.min_votes, 1);
    assert_eq!(config.anonymization.default_mode, AnonymizationMode::Redact);
    assert!(!config.audit.enabled);
    assert!(config.custom_patterns.is_empty());
}

#[test]
fn test_missing_file_is_configuration_error() {
    let err = load_config("/nonexistent/shroud.toml").unwrap_err();
    assert!(err.to_string().contains("not found"));
}

#[test]
fn test_env_var_substitution() {
    let _lock = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    cleanup_env_vars();
    std::env::set_var("TEST_SHROUD_AUDIT_DIR", "/var/log/shroud");

    let toml_content = r#"
# Audit lives in ${TEST_SHROUD_UNSET_IN_COMMENT}
[audit]
enabled = false
log_path = "${TEST_SHROUD_AUDIT_DIR}/audit.log"
"#;

    let config = load_config_str(toml_content).unwrap();
    assert_eq!(
        config.audit.log_path.to_string_lossy(),
        "/var/log/shroud/audit.log"
    );

    cleanup_env_vars();
}

#[test]
fn test_missing_env_var_fails() {
    let _lock = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    cleanup_env_vars();

    let toml_content = r#"
[audit]
log_path = "${TEST_SHROUD_AUDIT_DIR}/audit.log"
"#;

    let err = load_config_str(toml_content).unwrap_err();
    assert!(err.to_string().contains("TEST_SHROUD_AUDIT_DIR"));
}

#[test]
fn test_env_overrides() {
    let _lock = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    cleanup_env_vars();

    std::env::set_var("SHROUD_APPLICATION_LOG_LEVEL", "WARN");
    std::env::set_var("SHROUD_DETECTION_DETECTOR", "statistical");
    std::env::set_var("SHROUD_DETECTION_DEFAULT_LANGUAGE", "en");
    std::env::set_var("SHROUD_DETECTION_CONFIDENCE_THRESHOLD", "0.8");
    std::env::set_var("SHROUD_ENSEMBLE_VOTING_STRATEGY", "unanimous");
    std::env::set_var("SHROUD_ANONYMIZATION_DEFAULT_MODE", "visual_redact");
    std::env::set_var("SHROUD_AUDIT_ENABLED", "true");
    std::env::set_var("SHROUD_AUDIT_LOG_PATH", "/tmp/shroud-audit.log");

    let config = load_config_str("[detection]\ndetector = \"neural\"\n").unwrap();

    assert_eq!(config.application.log_level, "warn");
    assert_eq!(config.detection.detector, DetectorKind::Statistical);
    assert_eq!(config.detection.default_language, "en");
    assert_eq!(config.detection.confidence_threshold, 0.8);
    assert_eq!(config.ensemble.voting_strategy, VotingStrategy::Unanimous);
    assert_eq!(config.anonymization.default_mode, AnonymizationMode::VisualRedact);
    assert!(config.audit.enabled);
    assert_eq!(config.audit.log_path.to_string_lossy(), "/tmp/shroud-audit.log");

    // Overrides also apply on top of built-in defaults
    let defaults = default_config().unwrap();
    assert_eq!(defaults.detection.detector, DetectorKind::Statistical);

    cleanup_env_vars();
}

#[test]
fn test_invalid_env_override_rejected() {
    let _lock = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    cleanup_env_vars();

    std::env::set_var("SHROUD_AUDIT_ENABLED", "sometimes");
    let err = load_config_str("").unwrap_err();
    assert!(err.to_string().contains("SHROUD_AUDIT_ENABLED"));
    cleanup_env_vars();

    std::env::set_var("SHROUD_ANONYMIZATION_DEFAULT_MODE", "encrypt");
    assert!(load_config_str("").is_err());
    cleanup_env_vars();
}

#[test]
fn test_validation_errors() {
    let _lock = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    cleanup_env_vars();

    let cases = [
        "[application]\nlog_level = \"verbose\"\n",
        "[logging]\nlocal_rotation = \"weekly\"\n",
        "[detection]\nconfidence_threshold = 1.5\n",
        "[ensemble]\nmin_votes = 0\n",
        "[ensemble]\nmembers = []\n",
        "[ensemble.weights]\nPatternMatcher = -1.0\n",
        "[anonymization]\nvisual_block = \"\"\n",
        "[[custom_patterns]]\nname = \"A\"\npattern = 'a'\n[[custom_patterns]]\nname = \"A\"\npattern = 'b'\n",
        "[[custom_patterns]]\nname = \"A\"\npattern = 'a'\nconfidence = 2.0\n",
    ];

    for toml_content in cases {
        let err = load_config_str(toml_content).unwrap_err();
        assert!(
            err.to_string().contains("validation failed"),
            "expected validation failure for {toml_content:?}, got {err}"
        );
    }
}

#[test]
fn test_engine_from_loaded_ensemble_config() {
    let _lock = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    cleanup_env_vars();

    let toml_content = r#"
[detection]
detector = "ensemble"
default_language = "en"

[ensemble]
members = ["patterns"]
voting_strategy = "any"

[[custom_patterns]]
name = "EMPLOYEE_ID"
pattern = 'EMP-\d{7}'
confidence = 0.95
"#;

    let config = load_config_str(toml_content).unwrap();
    let engine = AnonymizationEngine::from_config(&config).unwrap();
    assert_eq!(engine.detector_name(), "EnsembleDetector");

    let result = engine
        .anonymize(
            "Employee badge: EMP-1234567",
            Some(AnonymizationMode::Redact),
            None,
        )
        .unwrap();
    assert_eq!(result.anonymized_text, "Employee badge: ███████████");
    assert_eq!(result.detections[0].entity_type, "EMPLOYEE_ID");
    assert_eq!(result.detections[0].detectors, vec!["PatternMatcher"]);
}

#[test]
fn test_invalid_custom_pattern_fails_engine_construction() {
    let _lock = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    cleanup_env_vars();

    let toml_content = r#"
[detection]
detector = "ensemble"

[ensemble]
members = ["patterns"]

[[custom_patterns]]
name = "BROKEN"
pattern = '(unclosed'
"#;

    let config = load_config_str(toml_content).unwrap();
    assert!(AnonymizationEngine::from_config(&config).is_err());
}
