//! PII detection and anonymization
//!
//! # Architecture
//!
//! The pipeline consists of:
//! - **Detection**: pattern matcher, statistical detector, neural NER detector
//!   and the composite fallback, all behind [`detector::PiiDetector`]
//! - **Ensemble**: overlap grouping, type consensus, voting and weighted
//!   confidence across detectors, optionally adapting weights from feedback
//! - **Anonymization**: redact, visual redact and reversible substitution
//! - **Audit**: append-only log with hashed values
//!
//! All offsets are character offsets into the request text.
//!
//! # Usage
//!
//! ```rust,no_run
//! use shroud::anonymization::AnonymizationEngine;
//! use shroud::config::load_config;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_config("shroud.toml")?;
//! let engine = AnonymizationEngine::from_config(&config)?;
//! let result = engine.anonymize("Mario Rossi, RSSMRA85M01H501Z", None, Some("it"))?;
//! println!("{}", result.anonymized_text);
//! # Ok(())
//! # }
//! ```

pub mod anonymizer;
pub mod audit;
pub mod config;
pub mod detector;
pub mod engine;
pub mod ensemble;
pub mod models;
pub mod report;
pub mod spans;
pub mod text;
pub mod validation;

// Re-export main types
pub use config::{AnonymizationConfig, AnonymizationMode};
pub use engine::AnonymizationEngine;
pub use models::{AnonymizationResult, Detection};
pub use report::DetectionReport;
