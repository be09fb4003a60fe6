// Shroud - Multi-detector PII detection and anonymization
// Copyright (c) 2025 Shroud Contributors
// Licensed under the MIT License

//! # Shroud - PII detection and anonymization
//!
//! Shroud finds personally identifiable information in free text and rewrites
//! it. Several independent detectors (pattern matcher, locale-aware
//! statistical detector, neural NER) can be combined by an ensemble that
//! groups overlapping spans, votes on the entity type and aggregates
//! confidence. Anonymization is length-preserving redaction, fixed-block
//! visual redaction or reversible substitution with fake values.
//!
//! ## Architecture
//!
//! - [`anonymization`] - Detectors, ensemble, strategies and the engine
//! - [`domain`] - Error and result types
//! - [`config`] - Configuration management
//! - [`logging`] - Structured logging
//! - [`cli`] - Command-line interface
//!
//! ## Quick Start
//!
//! ```rust
//! use shroud::anonymization::detector::{CustomPattern, PatternMatcher, PiiDetector};
//!
//! let mut matcher = PatternMatcher::new();
//! matcher.add_pattern(CustomPattern::new("EMAIL", r"[\w.]+@[\w.]+\.\w+", 0.95)?);
//!
//! let detections = matcher.detect("Contact john@test.com", "en")?;
//! assert_eq!(detections[0].text, "john@test.com");
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Ensembles
//!
//! ```rust
//! use shroud::anonymization::detector::{PatternMatcher, StatisticalDetector};
//! use shroud::anonymization::ensemble::{EnsembleDetector, VotingStrategy};
//!
//! let ensemble = EnsembleDetector::builder()
//!     .with_detector(Box::new(StatisticalDetector::new()?))
//!     .with_detector(Box::new(PatternMatcher::internal_identifiers()?))
//!     .with_voting_strategy(VotingStrategy::Any)
//!     .build()?;
//!
//! let results = ensemble.detect_detailed("Employee badge: EMP-1234567", "en");
//! assert!(results.iter().any(|r| r.entity_type == "EMPLOYEE_ID"));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Error Handling
//!
//! Library operations return [`domain::Result`], whose error type
//! [`domain::ShroudError`] carries a structured detail payload. Detector
//! failures are typed as [`domain::DetectorFailure`] and absorbed by the
//! ensemble and the fallback detector.

pub mod anonymization;
pub mod cli;
pub mod config;
pub mod domain;
pub mod logging;
