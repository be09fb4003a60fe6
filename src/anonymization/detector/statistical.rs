//! Statistical detector: external analyzer plus a locale pattern battery

use super::patterns::PatternRegistry;
use super::PiiDetector;
use crate::anonymization::models::Detection;
use crate::anonymization::spans::keep_highest_confidence;
use crate::anonymization::text::TextIndex;
use crate::domain::errors::DetectorFailure;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Confidence assigned to every locale pattern match
pub const LOCALE_PATTERN_CONFIDENCE: f64 = 0.9;

/// One entity reported by an analyzer, in character offsets
#[derive(Debug, Clone, PartialEq)]
pub struct AnalyzerResult {
    pub entity_type: String,
    pub start: usize,
    pub end: usize,
    pub score: f64,
}

/// Locale-aware entity recognition engine
pub trait EntityAnalyzer: Send + Sync {
    /// Whether the analyzer has a model for `locale`
    fn supports_locale(&self, locale: &str) -> bool;

    /// Analyze `text` in `locale`
    fn analyze(&self, text: &str, locale: &str) -> Result<Vec<AnalyzerResult>, DetectorFailure>;
}

/// Statistical PII detector
///
/// Delegates to an [`EntityAnalyzer`] when one is attached and the request
/// language maps to a locale it supports, then always runs the locale pattern
/// battery. Analyzer failures degrade to pattern-only detection.
#[derive(Clone)]
pub struct StatisticalDetector {
    analyzer: Option<Arc<dyn EntityAnalyzer>>,
    patterns: Arc<PatternRegistry>,
    language_map: BTreeMap<String, String>,
}

impl StatisticalDetector {
    /// Create a pattern-only detector with the embedded locale battery
    pub fn new() -> anyhow::Result<Self> {
        Ok(Self::with_registry(PatternRegistry::statistical_patterns()?))
    }

    /// Create a detector over a custom pattern registry
    pub fn with_registry(registry: PatternRegistry) -> Self {
        Self {
            analyzer: None,
            patterns: Arc::new(registry),
            language_map: BTreeMap::from([
                ("it".to_string(), "en".to_string()),
                ("en".to_string(), "en".to_string()),
            ]),
        }
    }

    /// Attach an external analyzer
    pub fn with_analyzer(mut self, analyzer: Arc<dyn EntityAnalyzer>) -> Self {
        self.analyzer = Some(analyzer);
        self
    }

    /// Replace the language to analyzer-locale map
    pub fn with_language_map(mut self, language_map: BTreeMap<String, String>) -> Self {
        self.language_map = language_map;
        self
    }

    /// Analyzer locale for a request language
    ///
    /// Unmapped languages are passed through unchanged.
    pub fn analyzer_locale<'a>(&'a self, language: &'a str) -> &'a str {
        self.language_map
            .get(language)
            .map(String::as_str)
            .unwrap_or(language)
    }

    fn analyzer_detections(&self, index: &TextIndex<'_>, language: &str) -> Vec<Detection> {
        let Some(analyzer) = &self.analyzer else {
            return Vec::new();
        };

        let locale = self.analyzer_locale(language);
        if !analyzer.supports_locale(locale) {
            tracing::debug!(language, locale, "Analyzer does not support locale, skipping");
            return Vec::new();
        }

        match analyzer.analyze(index.text(), locale) {
            Ok(results) => {
                let len = index.char_len();
                results
                    .into_iter()
                    .filter(|r| r.start < r.end && r.end <= len)
                    .map(|r| {
                        Detection::from_index(index, r.entity_type, r.start, r.end, r.score)
                            .with_source("analyzer")
                    })
                    .collect()
            }
            Err(failure) => {
                tracing::warn!(
                    error = %failure,
                    locale,
                    "Analyzer failed, continuing with locale patterns only"
                );
                Vec::new()
            }
        }
    }
}

impl PiiDetector for StatisticalDetector {
    fn name(&self) -> &str {
        "StatisticalDetector"
    }

    fn supported_languages(&self) -> Vec<String> {
        self.language_map.keys().cloned().collect()
    }

    fn detect(&self, text: &str, language: &str) -> Result<Vec<Detection>, DetectorFailure> {
        let index = TextIndex::new(text);

        let mut candidates = self.analyzer_detections(&index, language);
        candidates.extend(
            self.patterns
                .find_all(&index, Some(LOCALE_PATTERN_CONFIDENCE), "patterns"),
        );

        let raw = candidates.len();
        let detections = keep_highest_confidence(candidates, |d| d.confidence);

        tracing::debug!(
            language,
            raw,
            kept = detections.len(),
            "Statistical detection completed"
        );

        Ok(detections)
    }
}
