//! Configuration management for Shroud.
//!
//! Shroud uses TOML configuration files with support for:
//! - Environment variable substitution (`${VAR_NAME}`)
//! - `SHROUD_*` environment overrides
//! - Defaults for every section, so an empty file is valid
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use shroud::config::load_config;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_config("shroud.toml")?;
//! println!("Detector: {:?}", config.detection.detector);
//! println!("Default mode: {}", config.anonymization.default_mode);
//! # Ok(())
//! # }
//! ```
//!
//! # Example Configuration
//!
//! ```toml
//! [application]
//! log_level = "info"
//!
//! [detection]
//! detector = "ensemble"
//! default_language = "it"
//!
//! [ensemble]
//! members = ["statistical", "patterns"]
//! voting_strategy = "weighted"
//! min_confidence = 0.5
//!
//! [anonymization]
//! default_mode = "redact"
//!
//! [audit]
//! enabled = true
//! log_path = "${SHROUD_AUDIT_DIR}/anonymization.log"
//!
//! [[custom_patterns]]
//! name = "ORDER_ID"
//! pattern = 'ORD-\d{5}'
//! ```

pub mod loader;
pub mod schema;

pub use loader::{default_config, load_config, load_config_str};
pub use schema::{ApplicationConfig, LoggingConfig, ShroudConfig};
