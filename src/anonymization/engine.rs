//! Main anonymization engine
//!
//! This module provides the [`AnonymizationEngine`] that orchestrates one
//! request: input validation, detection, threshold filtering, strategy
//! dispatch and audit logging.
//!
//! # Examples
//!
//! ```no_run
//! use shroud::anonymization::AnonymizationEngine;
//! use shroud::anonymization::config::AnonymizationMode;
//! use shroud::config::ShroudConfig;
//!
//! # fn example() -> shroud::domain::Result<()> {
//! let engine = AnonymizationEngine::from_config(&ShroudConfig::default())?;
//! let result = engine.anonymize(
//!     "Scrivere a mario.rossi@example.com",
//!     Some(AnonymizationMode::Redact),
//!     Some("it"),
//! )?;
//! println!("{}", result.anonymized_text);
//! # Ok(())
//! # }
//! ```

use crate::anonymization::{
    anonymizer::{
        Anonymizer, FakerLocale, SubstitutionStrategy, SuppressStrategy, VisualRedactStrategy,
    },
    audit::AuditLogger,
    config::{AnonymizationConfig, AnonymizationMode, DetectorKind, EnsembleMember},
    detector::{CompositeDetector, NeuralDetector, PatternMatcher, PiiDetector, StatisticalDetector},
    ensemble::{AdaptiveEnsemble, EnsembleDetector, FeedbackTracker},
    models::{AnonymizationResult, Detection},
    validation,
};
use crate::config::ShroudConfig;
use crate::domain::errors::ShroudError;
use crate::domain::Result;
use std::collections::BTreeMap;
use std::time::Instant;

/// Detector held by the engine
enum EngineDetector {
    Fixed(Box<dyn PiiDetector>),
    Adaptive(AdaptiveEnsemble),
}

impl EngineDetector {
    fn as_detector(&self) -> &dyn PiiDetector {
        match self {
            Self::Fixed(detector) => detector.as_ref(),
            Self::Adaptive(adaptive) => adaptive,
        }
    }
}

/// Main anonymization engine
///
/// Detection and strategy application are synchronous. The engine holds no
/// per-request state, so `&self` methods can be called from several threads
/// when the engine is shared behind an `Arc`; feedback for the adaptive
/// ensemble needs `&mut self`.
pub struct AnonymizationEngine {
    detector: EngineDetector,
    anonymization: AnonymizationConfig,
    faker_locales: BTreeMap<String, FakerLocale>,
    default_language: String,
    max_text_length: usize,
    confidence_threshold: f64,
    audit_logger: Option<AuditLogger>,
    substitution_seed: Option<u64>,
}

impl AnonymizationEngine {
    /// Create an engine from configuration
    ///
    /// Builds the detector selected by `detection.detector`:
    /// - `neural`: neural detector with per-call fallback to the statistical one
    /// - `statistical`: statistical detector only
    /// - `ensemble`: the `[ensemble]` members, adaptive when requested
    ///
    /// # Errors
    ///
    /// Returns a configuration error if validation fails, a pattern library
    /// does not compile, or the audit log directory cannot be created.
    pub fn from_config(config: &ShroudConfig) -> Result<Self> {
        config.validate().map_err(|e| {
            ShroudError::Configuration(format!("Configuration validation failed: {e}"))
        })?;

        let detector = match config.detection.detector {
            DetectorKind::Neural => {
                let neural = NeuralDetector::from_config(&config.detection.neural)
                    .map_err(configuration_error)?;
                EngineDetector::Fixed(Box::new(CompositeDetector::new(
                    Box::new(neural),
                    Box::new(statistical_detector(config)?),
                )))
            }
            DetectorKind::Statistical => {
                EngineDetector::Fixed(Box::new(statistical_detector(config)?))
            }
            DetectorKind::Ensemble => {
                let ensemble = build_ensemble(config)?;
                if config.ensemble.adaptive {
                    let tracker = FeedbackTracker::new(
                        config.ensemble.decay_policy,
                        config.ensemble.min_feedback,
                    );
                    EngineDetector::Adaptive(AdaptiveEnsemble::with_tracker(ensemble, tracker))
                } else {
                    EngineDetector::Fixed(Box::new(ensemble))
                }
            }
        };

        let mut engine = Self::assemble(detector, config)?;
        if config.audit.enabled {
            engine.audit_logger =
                Some(AuditLogger::from_config(&config.audit).map_err(configuration_error)?);
        }

        tracing::info!(
            detector = engine.detector_name(),
            default_mode = %engine.anonymization.default_mode,
            audit = config.audit.enabled,
            "Anonymization engine initialized"
        );

        Ok(engine)
    }

    /// Create an engine around an explicit detector
    ///
    /// Detection settings other than the detector kind still come from
    /// `config`.
    pub fn with_detector(detector: Box<dyn PiiDetector>, config: &ShroudConfig) -> Result<Self> {
        Self::assemble(EngineDetector::Fixed(detector), config)
    }

    /// Create an engine around an adaptive ensemble
    pub fn with_adaptive_ensemble(
        adaptive: AdaptiveEnsemble,
        config: &ShroudConfig,
    ) -> Result<Self> {
        Self::assemble(EngineDetector::Adaptive(adaptive), config)
    }

    fn assemble(detector: EngineDetector, config: &ShroudConfig) -> Result<Self> {
        let mut faker_locales = BTreeMap::new();
        for (language, locale) in &config.anonymization.faker_locales {
            faker_locales.insert(language.to_lowercase(), locale.parse::<FakerLocale>()?);
        }

        Ok(Self {
            detector,
            anonymization: config.anonymization.clone(),
            faker_locales,
            default_language: config.detection.default_language.clone(),
            max_text_length: config.detection.max_text_length,
            confidence_threshold: config.detection.confidence_threshold,
            audit_logger: None,
            substitution_seed: None,
        })
    }

    /// Use a fixed seed for substitute values
    pub fn with_substitution_seed(mut self, seed: u64) -> Self {
        self.substitution_seed = Some(seed);
        self
    }

    /// Name of the active detector
    pub fn detector_name(&self) -> &str {
        self.detector.as_detector().name()
    }

    /// Language used when a request names none
    pub fn default_language(&self) -> &str {
        &self.default_language
    }

    /// Validate `text` and run detection
    ///
    /// Detections below the configured confidence threshold are dropped.
    /// The result is ordered by start offset.
    ///
    /// # Errors
    ///
    /// Returns a validation error for empty or over-long text and a detection
    /// error when the detector fails without a fallback.
    pub fn detect(&self, text: &str, language: Option<&str>) -> Result<Vec<Detection>> {
        validation::validate_text_input(text, self.max_text_length)?;

        let language = language.unwrap_or(&self.default_language);
        let detector = self.detector.as_detector();
        let start = Instant::now();

        let mut detections: Vec<Detection> = detector
            .detect(text, language)?
            .into_iter()
            .filter(|d| d.confidence >= self.confidence_threshold)
            .collect();
        detections.sort_by(|a, b| a.start.cmp(&b.start).then(a.end.cmp(&b.end)));

        crate::log_detection_complete!(detector.name(), detections.len(), start.elapsed());
        Ok(detections)
    }

    /// Anonymize a single text
    ///
    /// `mode` and `language` default to the configured values.
    ///
    /// # Errors
    ///
    /// Returns an error if validation or detection fails, a strategy rejects a
    /// detection, or the audit log cannot be written.
    pub fn anonymize(
        &self,
        text: &str,
        mode: Option<AnonymizationMode>,
        language: Option<&str>,
    ) -> Result<AnonymizationResult> {
        let start = Instant::now();
        let mode = mode.unwrap_or(self.anonymization.default_mode);
        let language = language.unwrap_or(&self.default_language);

        let detections = self.detect(text, Some(language))?;

        let mut anonymizer = self.strategy(mode, language);
        let output = anonymizer.anonymize(text, &detections)?;

        let processing_time = start.elapsed().as_millis() as u64;
        let mut result = AnonymizationResult::new(
            output.text,
            text.to_string(),
            mode,
            detections,
            processing_time,
        );
        if let (Some(mapping), Some(reverse_key)) = (output.mapping, output.reverse_key) {
            result = result.with_mapping(mapping, reverse_key);
        }

        if let Some(ref logger) = self.audit_logger {
            logger
                .log_anonymization(&result)
                .map_err(|e| ShroudError::Io(format!("{e:#}")))?;
        }

        crate::log_anonymization_complete!(mode, result.detections_count, processing_time);
        Ok(result)
    }

    /// Anonymize a mode given by name
    ///
    /// # Errors
    ///
    /// Returns [`ShroudError::UnsupportedMode`] for an unknown mode name.
    pub fn anonymize_with_mode_name(
        &self,
        text: &str,
        mode: &str,
        language: Option<&str>,
    ) -> Result<AnonymizationResult> {
        let mode: AnonymizationMode = mode.parse()?;
        self.anonymize(text, Some(mode), language)
    }

    /// Anonymize up to [`validation::MAX_BATCH_SIZE`] texts
    ///
    /// The whole batch is validated before any text is processed.
    pub fn anonymize_batch(
        &self,
        texts: &[String],
        mode: Option<AnonymizationMode>,
        language: Option<&str>,
    ) -> Result<Vec<AnonymizationResult>> {
        validation::validate_batch(texts, self.max_text_length)?;
        texts
            .iter()
            .map(|text| self.anonymize(text, mode, language))
            .collect()
    }

    /// Report whether a detection was correct
    ///
    /// # Errors
    ///
    /// Returns a configuration error when the engine does not run an adaptive
    /// ensemble.
    pub fn report_feedback(&mut self, detection: &Detection, is_correct: bool) -> Result<()> {
        match &mut self.detector {
            EngineDetector::Adaptive(adaptive) => {
                adaptive.report_feedback(detection, is_correct);
                Ok(())
            }
            EngineDetector::Fixed(_) => Err(ShroudError::Configuration(
                "Feedback requires the adaptive ensemble (ensemble.adaptive = true)".to_string(),
            )),
        }
    }

    /// The adaptive ensemble, if the engine runs one
    pub fn adaptive_ensemble(&self) -> Option<&AdaptiveEnsemble> {
        match &self.detector {
            EngineDetector::Adaptive(adaptive) => Some(adaptive),
            EngineDetector::Fixed(_) => None,
        }
    }

    fn strategy(&self, mode: AnonymizationMode, language: &str) -> Box<dyn Anonymizer> {
        match mode {
            AnonymizationMode::Redact => Box::new(SuppressStrategy::with_fill(
                self.anonymization.redaction_character,
            )),
            AnonymizationMode::VisualRedact => Box::new(VisualRedactStrategy::with_block(
                self.anonymization.visual_block.clone(),
            )),
            AnonymizationMode::Substitute => {
                let locale = self.faker_locale(language);
                match self.substitution_seed {
                    Some(seed) => Box::new(SubstitutionStrategy::with_seed(locale, seed)),
                    None => Box::new(SubstitutionStrategy::new(locale)),
                }
            }
        }
    }

    fn faker_locale(&self, language: &str) -> FakerLocale {
        self.faker_locales
            .get(&language.to_lowercase())
            .copied()
            .unwrap_or_default()
    }
}

fn configuration_error(error: anyhow::Error) -> ShroudError {
    ShroudError::Configuration(format!("{error:#}"))
}

fn statistical_detector(config: &ShroudConfig) -> Result<StatisticalDetector> {
    Ok(StatisticalDetector::new()
        .map_err(configuration_error)?
        .with_language_map(config.detection.statistical.language_map.clone()))
}

/// Build the ensemble described by `[ensemble]` and `[[custom_patterns]]`
pub fn build_ensemble(config: &ShroudConfig) -> Result<EnsembleDetector> {
    let mut builder = EnsembleDetector::builder()
        .with_voting_strategy(config.ensemble.voting_strategy.clone())
        .with_min_confidence(config.ensemble.min_confidence)
        .with_min_votes(config.ensemble.min_votes)
        .with_weight_overrides(&config.ensemble.weights);

    for member in &config.ensemble.members {
        let detector: Box<dyn PiiDetector> = match member {
            EnsembleMember::Patterns => {
                let matcher = PatternMatcher::from_configs(&config.custom_patterns)?;
                if matcher.is_empty() {
                    tracing::warn!("Pattern matcher member has no custom patterns configured");
                }
                Box::new(matcher)
            }
            EnsembleMember::Statistical => Box::new(statistical_detector(config)?),
            EnsembleMember::Neural => Box::new(
                NeuralDetector::from_config(&config.detection.neural).map_err(configuration_error)?,
            ),
        };
        builder = builder.with_detector(detector);
    }

    builder.build()
}
