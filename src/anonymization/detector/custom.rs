//! User-defined pattern detector
//!
//! Detects arbitrary regex-matchable identifiers (compound codes, internal
//! IDs, contract numbers) that the built-in batteries know nothing about.

use super::PiiDetector;
use crate::anonymization::config::CustomPatternConfig;
use crate::anonymization::models::Detection;
use crate::anonymization::text::TextIndex;
use crate::domain::errors::{DetectorFailure, ShroudError};
use crate::domain::Result;
use serde_json::json;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

/// Match validator; a match is kept only when it returns true
pub type Validator = Arc<dyn Fn(&str) -> bool + Send + Sync>;

/// Compiled expression, standard engine first
#[derive(Debug, Clone)]
enum CompiledRegex {
    Standard(regex::Regex),
    Fancy(fancy_regex::Regex),
}

impl CompiledRegex {
    fn compile(pattern: &str, case_insensitive: bool) -> std::result::Result<Self, String> {
        let source = if case_insensitive {
            format!("(?i){pattern}")
        } else {
            pattern.to_string()
        };

        match regex::Regex::new(&source) {
            Ok(regex) => Ok(Self::Standard(regex)),
            // Look-around and back-references need the backtracking engine
            Err(standard_err) => fancy_regex::Regex::new(&source)
                .map(Self::Fancy)
                .map_err(|fancy_err| format!("{standard_err}; {fancy_err}")),
        }
    }

    /// Byte ranges of every match
    fn find_ranges(&self, text: &str) -> Vec<(usize, usize)> {
        match self {
            Self::Standard(regex) => regex.find_iter(text).map(|m| (m.start(), m.end())).collect(),
            Self::Fancy(regex) => regex
                .find_iter(text)
                .filter_map(|m| match m {
                    Ok(m) => Some((m.start(), m.end())),
                    Err(e) => {
                        tracing::warn!(error = %e, "Backtracking regex aborted");
                        None
                    }
                })
                .collect(),
        }
    }
}

/// A named user-defined pattern
#[derive(Clone)]
pub struct CustomPattern {
    name: String,
    pattern: String,
    confidence: f64,
    description: String,
    case_insensitive: bool,
    validator: Option<Validator>,
    compiled: CompiledRegex,
}

impl CustomPattern {
    /// Compile a case-insensitive pattern
    ///
    /// Fails when the name is empty, the confidence is outside `[0, 1]`, or
    /// neither regex engine accepts the expression.
    pub fn new(name: impl Into<String>, pattern: impl Into<String>, confidence: f64) -> Result<Self> {
        Self::build(name.into(), pattern.into(), confidence, String::new(), true, None)
    }

    /// Compile a pattern from configuration
    pub fn from_config(config: &CustomPatternConfig) -> Result<Self> {
        Self::build(
            config.name.clone(),
            config.pattern.clone(),
            config.confidence,
            config.description.clone(),
            config.case_insensitive,
            None,
        )
    }

    fn build(
        name: String,
        pattern: String,
        confidence: f64,
        description: String,
        case_insensitive: bool,
        validator: Option<Validator>,
    ) -> Result<Self> {
        if name.trim().is_empty() {
            return Err(ShroudError::validation("Pattern name cannot be empty"));
        }
        if !(0.0..=1.0).contains(&confidence) {
            return Err(ShroudError::validation_with(
                format!("Confidence must be between 0.0 and 1.0, got {confidence}"),
                json!({ "field": "confidence", "value": confidence }),
            ));
        }

        let compiled = CompiledRegex::compile(&pattern, case_insensitive).map_err(|e| {
            ShroudError::validation_with(
                format!("Invalid regex pattern '{pattern}': {e}"),
                json!({ "pattern": pattern, "name": name }),
            )
        })?;

        tracing::debug!(pattern = %name, "Custom pattern compiled");

        Ok(Self {
            name,
            pattern,
            confidence,
            description,
            case_insensitive,
            validator,
            compiled,
        })
    }

    /// Set the description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Recompile with explicit case sensitivity
    pub fn with_case_insensitive(self, case_insensitive: bool) -> Result<Self> {
        Self::build(
            self.name,
            self.pattern,
            self.confidence,
            self.description,
            case_insensitive,
            self.validator,
        )
    }

    /// Attach a match validator
    pub fn with_validator<F>(mut self, validator: F) -> Self
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        self.validator = Some(Arc::new(validator));
        self
    }

    /// Pattern name, used as the entity type
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Source expression
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Confidence assigned to matches
    pub fn confidence(&self) -> f64 {
        self.confidence
    }

    /// Human-readable description
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Whether matching ignores case
    pub fn is_case_insensitive(&self) -> bool {
        self.case_insensitive
    }

    /// Whether a match passes the validator
    ///
    /// A validator that panics rejects the match.
    pub fn is_valid_match(&self, matched: &str) -> bool {
        let Some(validator) = &self.validator else {
            return true;
        };

        match panic::catch_unwind(AssertUnwindSafe(|| validator(matched))) {
            Ok(valid) => valid,
            Err(_) => {
                tracing::warn!(pattern = %self.name, "Validation function panicked, discarding match");
                false
            }
        }
    }

    fn find(&self, index: &TextIndex<'_>) -> Vec<Detection> {
        self.compiled
            .find_ranges(index.text())
            .into_iter()
            .filter_map(|(byte_start, byte_end)| {
                let matched = &index.text()[byte_start..byte_end];
                if !self.is_valid_match(matched) {
                    tracing::debug!(pattern = %self.name, "Match failed validation");
                    return None;
                }
                let (start, end) = index.char_range(byte_start, byte_end);
                (start < end)
                    .then(|| Detection::new(self.name.clone(), start, end, matched, self.confidence))
            })
            .collect()
    }
}

impl fmt::Debug for CustomPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomPattern")
            .field("name", &self.name)
            .field("pattern", &self.pattern)
            .field("confidence", &self.confidence)
            .field("case_insensitive", &self.case_insensitive)
            .field("has_validator", &self.validator.is_some())
            .finish()
    }
}

/// Detector over an ordered set of user-defined patterns
#[derive(Debug, Clone, Default)]
pub struct PatternMatcher {
    patterns: Vec<CustomPattern>,
}

impl PatternMatcher {
    /// Create an empty matcher
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a matcher from a list of patterns
    pub fn with_patterns(patterns: impl IntoIterator<Item = CustomPattern>) -> Self {
        let mut matcher = Self::new();
        for pattern in patterns {
            matcher.add_pattern(pattern);
        }
        matcher
    }

    /// Create a matcher from configured patterns
    pub fn from_configs(configs: &[CustomPatternConfig]) -> Result<Self> {
        let patterns = configs
            .iter()
            .map(CustomPattern::from_config)
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::with_patterns(patterns))
    }

    /// Chemical compound identifiers
    pub fn compound_identifiers() -> Result<Self> {
        Ok(Self::with_patterns([
            CustomPattern::new("COMPOUND_ID", r"Compound-[A-Z]{3,5}-\d{3,6}", 0.95)?
                .with_description("Chemical compound identifier"),
            CustomPattern::new("CAS_NUMBER", r"\d{2,7}-\d{2}-\d", 0.90)?
                .with_description("CAS Registry Number"),
            CustomPattern::new("DRUG_CODE", r"DRG-[A-Z0-9]{4,8}", 0.95)?
                .with_description("Drug code identifier"),
        ]))
    }

    /// Internal company identifiers
    pub fn internal_identifiers() -> Result<Self> {
        Ok(Self::with_patterns([
            CustomPattern::new("EMPLOYEE_ID", r"EMP-\d{6,8}", 0.95)?
                .with_description("Employee ID"),
            CustomPattern::new("PROJECT_CODE", r"PRJ-[A-Z]{3,5}-\d{4}", 0.95)?
                .with_description("Project code"),
            CustomPattern::new("DOCUMENT_ID", r"DOC-\d{8,10}", 0.95)?
                .with_description("Document ID"),
            CustomPattern::new("CONTRACT_ID", r"CTR-[A-Z]{2}\d{6}", 0.95)?
                .with_description("Contract ID"),
        ]))
    }

    /// Add a pattern, replacing any pattern with the same name in place
    pub fn add_pattern(&mut self, pattern: CustomPattern) {
        match self.patterns.iter_mut().find(|p| p.name == pattern.name) {
            Some(existing) => {
                tracing::warn!(pattern = %pattern.name, "Overwriting existing pattern");
                *existing = pattern;
            }
            None => {
                tracing::info!(
                    pattern = %pattern.name,
                    confidence = pattern.confidence,
                    "Added custom pattern"
                );
                self.patterns.push(pattern);
            }
        }
    }

    /// Remove a pattern by name
    pub fn remove_pattern(&mut self, name: &str) -> bool {
        let before = self.patterns.len();
        self.patterns.retain(|p| p.name != name);
        let removed = self.patterns.len() != before;
        if removed {
            tracing::info!(pattern = %name, "Removed custom pattern");
        }
        removed
    }

    /// Get a pattern by name
    pub fn get_pattern(&self, name: &str) -> Option<&CustomPattern> {
        self.patterns.iter().find(|p| p.name == name)
    }

    /// Pattern names in insertion order
    pub fn list_patterns(&self) -> Vec<&str> {
        self.patterns.iter().map(|p| p.name.as_str()).collect()
    }

    /// Number of patterns
    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    /// Whether the matcher has no patterns
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

impl PiiDetector for PatternMatcher {
    fn name(&self) -> &str {
        "PatternMatcher"
    }

    fn supported_languages(&self) -> Vec<String> {
        vec!["*".to_string()]
    }

    fn detect(&self, text: &str, _language: &str) -> std::result::Result<Vec<Detection>, DetectorFailure> {
        if self.patterns.is_empty() {
            tracing::debug!("No custom patterns defined");
            return Ok(Vec::new());
        }

        let index = TextIndex::new(text);
        let detections: Vec<Detection> = self
            .patterns
            .iter()
            .flat_map(|pattern| pattern.find(&index))
            .collect();

        tracing::debug!(
            patterns = self.patterns.len(),
            detections = detections.len(),
            "Custom pattern detection completed"
        );

        Ok(detections)
    }
}
