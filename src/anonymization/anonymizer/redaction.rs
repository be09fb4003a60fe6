//! Suppression strategy

use super::{apply_replacements, AnonymizedText, Anonymizer};
use crate::anonymization::config::AnonymizationMode;
use crate::anonymization::models::Detection;
use crate::domain::Result;

/// Suppression strategy - overwrites each character of a span with a fill
/// character, preserving length
#[derive(Debug, Clone)]
pub struct SuppressStrategy {
    fill: char,
}

impl SuppressStrategy {
    /// Create a suppression strategy with the default block fill
    pub fn new() -> Self {
        Self::with_fill('█')
    }

    pub fn with_fill(fill: char) -> Self {
        Self { fill }
    }

    pub fn fill(&self) -> char {
        self.fill
    }
}

impl Anonymizer for SuppressStrategy {
    fn mode(&self) -> AnonymizationMode {
        AnonymizationMode::Redact
    }

    fn anonymize(&mut self, text: &str, detections: &[Detection]) -> Result<AnonymizedText> {
        let fill = self.fill;
        let redacted = apply_replacements(text, detections, |d, _| {
            std::iter::repeat(fill).take(d.len()).collect()
        })?;
        Ok(AnonymizedText::irreversible(redacted))
    }
}

impl Default for SuppressStrategy {
    fn default() -> Self {
        Self::new()
    }
}
