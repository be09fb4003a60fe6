//! Configuration loader with TOML parsing and environment variable overrides

use super::schema::ShroudConfig;
use crate::domain::errors::ShroudError;
use crate::domain::result::Result;
use regex::Regex;
use std::fs;
use std::path::Path;
use std::str::FromStr;

/// Loads configuration from a TOML file
///
/// This function:
/// 1. Reads the TOML file
/// 2. Performs environment variable substitution (${VAR} syntax)
/// 3. Parses the TOML into ShroudConfig
/// 4. Applies environment variable overrides (SHROUD_* prefix)
/// 5. Validates the configuration
///
/// # Errors
///
/// Returns an error if:
/// - File cannot be read
/// - TOML parsing fails
/// - A referenced environment variable is not set
/// - Configuration validation fails
///
/// # Examples
///
/// ```no_run
/// use shroud::config::loader::load_config;
///
/// let config = load_config("shroud.toml").expect("Failed to load config");
/// ```
pub fn load_config(path: impl AsRef<Path>) -> Result<ShroudConfig> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(ShroudError::Configuration(format!(
            "Configuration file not found: {}",
            path.display()
        )));
    }

    let contents = fs::read_to_string(path).map_err(|e| {
        ShroudError::Configuration(format!(
            "Failed to read configuration file {}: {}",
            path.display(),
            e
        ))
    })?;

    load_config_str(&contents)
}

/// Loads configuration from TOML text
pub fn load_config_str(contents: &str) -> Result<ShroudConfig> {
    let contents = substitute_env_vars(contents)?;

    let mut config: ShroudConfig = toml::from_str(&contents)
        .map_err(|e| ShroudError::Configuration(format!("Failed to parse TOML: {e}")))?;

    apply_env_overrides(&mut config)?;

    config.validate().map_err(|e| {
        ShroudError::Configuration(format!("Configuration validation failed: {e}"))
    })?;

    Ok(config)
}

/// Built-in defaults with environment overrides applied
pub fn default_config() -> Result<ShroudConfig> {
    let mut config = ShroudConfig::default();
    apply_env_overrides(&mut config)?;
    config.validate().map_err(|e| {
        ShroudError::Configuration(format!("Configuration validation failed: {e}"))
    })?;
    Ok(config)
}

/// Substitutes environment variables in the format ${VAR_NAME}
///
/// Comment lines are left untouched.
///
/// # Errors
///
/// Returns an error if a referenced environment variable is not set
fn substitute_env_vars(input: &str) -> Result<String> {
    let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}")
        .map_err(|e| ShroudError::Configuration(format!("Invalid placeholder pattern: {e}")))?;
    let mut lines = Vec::new();
    let mut missing_vars: Vec<String> = Vec::new();

    for line in input.lines() {
        if line.trim_start().starts_with('#') {
            lines.push(line.to_string());
            continue;
        }

        let mut processed_line = line.to_string();
        for cap in re.captures_iter(line) {
            let var_name = &cap[1];
            match std::env::var(var_name) {
                Ok(value) => {
                    processed_line = processed_line.replace(&format!("${{{var_name}}}"), &value);
                }
                Err(_) => {
                    if !missing_vars.iter().any(|v| v == var_name) {
                        missing_vars.push(var_name.to_string());
                    }
                }
            }
        }
        lines.push(processed_line);
    }

    if !missing_vars.is_empty() {
        return Err(ShroudError::Configuration(format!(
            "Missing required environment variables: {}",
            missing_vars.join(", ")
        )));
    }

    Ok(lines.join("\n"))
}

fn parse_env<T: FromStr>(name: &str, value: &str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    value
        .parse()
        .map_err(|e| ShroudError::Configuration(format!("Invalid value for {name}: {e}")))
}

/// Applies environment variable overrides using SHROUD_* prefix
///
/// Environment variables follow the pattern: SHROUD_<SECTION>_<KEY>
/// For example: SHROUD_DETECTION_DETECTOR, SHROUD_AUDIT_ENABLED
fn apply_env_overrides(config: &mut ShroudConfig) -> Result<()> {
    // Application overrides
    if let Ok(val) = std::env::var("SHROUD_APPLICATION_LOG_LEVEL") {
        config.application.log_level = val.to_lowercase();
    }

    // Detection overrides
    if let Ok(val) = std::env::var("SHROUD_DETECTION_DETECTOR") {
        config.detection.detector = parse_env("SHROUD_DETECTION_DETECTOR", &val)?;
    }
    if let Ok(val) = std::env::var("SHROUD_DETECTION_DEFAULT_LANGUAGE") {
        config.detection.default_language = val;
    }
    if let Ok(val) = std::env::var("SHROUD_DETECTION_CONFIDENCE_THRESHOLD") {
        config.detection.confidence_threshold =
            parse_env("SHROUD_DETECTION_CONFIDENCE_THRESHOLD", &val)?;
    }
    if let Ok(val) = std::env::var("SHROUD_DETECTION_MODEL_DIR") {
        config.detection.neural.model_dir = val.into();
    }

    // Ensemble overrides
    if let Ok(val) = std::env::var("SHROUD_ENSEMBLE_VOTING_STRATEGY") {
        config.ensemble.voting_strategy = val.into();
    }

    // Anonymization overrides
    if let Ok(val) = std::env::var("SHROUD_ANONYMIZATION_DEFAULT_MODE") {
        config.anonymization.default_mode = val.parse()?;
    }

    // Audit overrides
    if let Ok(val) = std::env::var("SHROUD_AUDIT_ENABLED") {
        config.audit.enabled = parse_env("SHROUD_AUDIT_ENABLED", &val)?;
    }
    if let Ok(val) = std::env::var("SHROUD_AUDIT_LOG_PATH") {
        config.audit.log_path = val.into();
    }

    // Logging overrides
    if let Ok(val) = std::env::var("SHROUD_LOGGING_LOCAL_ENABLED") {
        config.logging.local_enabled = parse_env("SHROUD_LOGGING_LOCAL_ENABLED", &val)?;
    }
    if let Ok(val) = std::env::var("SHROUD_LOGGING_LOCAL_PATH") {
        config.logging.local_path = val;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_substitute_env_vars() {
        std::env::set_var("SHROUD_TEST_SUBST_VAR", "./custom/audit.log");
        let input = "log_path = \"${SHROUD_TEST_SUBST_VAR}\"";
        let result = substitute_env_vars(input).unwrap();
        assert_eq!(result, "log_path = \"./custom/audit.log\"");
        std::env::remove_var("SHROUD_TEST_SUBST_VAR");
    }

    #[test]
    fn test_substitute_env_vars_missing() {
        std::env::remove_var("SHROUD_TEST_MISSING_VAR");
        let input = "log_path = \"${SHROUD_TEST_MISSING_VAR}\"";
        let err = substitute_env_vars(input).unwrap_err();
        assert!(err.to_string().contains("SHROUD_TEST_MISSING_VAR"));
    }

    #[test]
    fn test_comments_not_substituted() {
        std::env::remove_var("SHROUD_TEST_COMMENTED_VAR");
        let input = "# path = \"${SHROUD_TEST_COMMENTED_VAR}\"\n[audit]";
        assert_eq!(substitute_env_vars(input).unwrap(), input);
    }

    #[test]
    fn test_load_config_missing_file() {
        assert!(load_config("nonexistent-shroud.toml").is_err());
    }

    #[test]
    fn test_parse_env_reports_variable() {
        let err = parse_env::<bool>("SHROUD_AUDIT_ENABLED", "maybe").unwrap_err();
        assert!(err.to_string().contains("SHROUD_AUDIT_ENABLED"));
    }
}
