//! Detection data models

use crate::anonymization::spans::Span;
use crate::anonymization::text::TextIndex;
use serde::{Deserialize, Serialize};

/// Built-in entity type tags
///
/// Entity types are open-ended strings; custom patterns introduce their own
/// tags. These are the ones the built-in detectors and the substitution
/// generator know about.
pub mod entity_types {
    pub const PERSON: &str = "PERSON";
    pub const ORGANIZATION: &str = "ORGANIZATION";
    pub const LOCATION: &str = "LOCATION";
    pub const MISC: &str = "MISC";
    pub const EMAIL: &str = "EMAIL";
    pub const PHONE: &str = "PHONE";
    pub const TAX_ID: &str = "TAX_ID";
    pub const VAT_NUMBER: &str = "VAT_NUMBER";
    pub const POSTAL_CODE: &str = "POSTAL_CODE";
    pub const ADDRESS: &str = "ADDRESS";
    pub const DATE: &str = "DATE";
    pub const IBAN: &str = "IBAN";
    pub const CREDIT_CARD: &str = "CREDIT_CARD";
}

/// Detected PII span
///
/// Offsets are half-open character offsets into the text the detection was
/// produced from. `text` is cached at detection time so it survives later
/// rewrites of the source text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    /// Entity type tag (EMAIL, PERSON, or any custom tag)
    pub entity_type: String,
    /// Start offset (inclusive, characters)
    pub start: usize,
    /// End offset (exclusive, characters)
    pub end: usize,
    /// Confidence score (0.0 - 1.0)
    pub confidence: f64,
    /// Detected text
    pub text: String,
    /// Producing source within a detector (pattern library, model name)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    /// Detectors that agreed on this detection (ensemble output)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub detectors: Vec<String>,
    /// Number of agreeing votes (ensemble output)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub votes: Option<usize>,
}

impl Detection {
    /// Create a detection with explicit text
    pub fn new(
        entity_type: impl Into<String>,
        start: usize,
        end: usize,
        text: impl Into<String>,
        confidence: f64,
    ) -> Self {
        Self {
            entity_type: entity_type.into(),
            start,
            end,
            confidence: confidence.clamp(0.0, 1.0),
            text: text.into(),
            source: None,
            detectors: Vec::new(),
            votes: None,
        }
    }

    /// Create a detection whose text is sliced from the indexed source
    pub fn from_index(
        index: &TextIndex<'_>,
        entity_type: impl Into<String>,
        start: usize,
        end: usize,
        confidence: f64,
    ) -> Self {
        Self::new(entity_type, start, end, index.slice(start, end), confidence)
    }

    /// Set the producing source
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Set the contributing detectors
    pub fn with_detectors(mut self, detectors: Vec<String>) -> Self {
        self.votes = Some(detectors.len());
        self.detectors = detectors;
        self
    }

    /// Span length in characters
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    /// Whether the span is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether this detection overlaps another
    pub fn overlaps(&self, other: &Detection) -> bool {
        self.start < other.end && other.start < self.end
    }
}

impl Span for Detection {
    fn start(&self) -> usize {
        self.start
    }

    fn end(&self) -> usize {
        self.end
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_detection_clamps_confidence() {
        let detection = Detection::new(entity_types::EMAIL, 0, 4, "a@b.", 1.7);
        assert_eq!(detection.confidence, 1.0);
    }

    #[test]
    fn test_from_index_slices_characters() {
        let index = TextIndex::new("Né: Mario Rossi");
        let detection = Detection::from_index(&index, entity_types::PERSON, 4, 15, 0.9);
        assert_eq!(detection.text, "Mario Rossi");
    }

    #[test]
    fn test_json_shape() {
        let detection = Detection::new(entity_types::EMAIL, 8, 21, "john@test.com", 0.95);
        let value = serde_json::to_value(&detection).unwrap();
        assert_eq!(
            value,
            json!({
                "entity_type": "EMAIL",
                "start": 8,
                "end": 21,
                "confidence": 0.95,
                "text": "john@test.com"
            })
        );
    }

    #[test]
    fn test_ensemble_fields_serialized() {
        let detection = Detection::new(entity_types::EMAIL, 0, 5, "a@b.c", 0.9)
            .with_detectors(vec!["PatternMatcher".to_string(), "NeuralDetector".to_string()]);
        let value = serde_json::to_value(&detection).unwrap();
        assert_eq!(value["votes"], 2);
        assert_eq!(value["detectors"][1], "NeuralDetector");
    }

    #[test]
    fn test_overlaps() {
        let a = Detection::new("A", 0, 5, "aaaaa", 0.9);
        let b = Detection::new("B", 4, 8, "abbb", 0.9);
        let c = Detection::new("C", 5, 8, "bbb", 0.9);
        assert!(a.overlaps(&b));
        assert!(!a.overlaps(&c));
    }
}
