//! Anonymization strategy module
//!
//! Provides the three interchangeable strategies that rewrite text given a
//! final detection list. Every strategy validates the detections, then
//! replaces spans right to left so earlier offsets stay valid.

pub mod redaction;
pub mod substitution;
pub mod visual;

pub use redaction::SuppressStrategy;
pub use substitution::{FakerLocale, SubstitutionStrategy};
pub use visual::VisualRedactStrategy;

use crate::anonymization::config::AnonymizationMode;
use crate::anonymization::models::{Detection, SubstitutionMapping};
use crate::anonymization::validation::validate_detections;
use crate::domain::Result;

/// Output of one strategy application
#[derive(Debug, Clone, PartialEq)]
pub struct AnonymizedText {
    /// Rewritten text
    pub text: String,
    /// Original values by mapping key (reversible strategies only)
    pub mapping: Option<SubstitutionMapping>,
    /// Identifier of this mapping instance (reversible strategies only)
    pub reverse_key: Option<String>,
}

impl AnonymizedText {
    /// Irreversible output
    pub fn irreversible(text: String) -> Self {
        Self {
            text,
            mapping: None,
            reverse_key: None,
        }
    }
}

/// Trait for anonymization strategy implementations
pub trait Anonymizer: Send + Sync {
    /// Mode implemented by this strategy
    fn mode(&self) -> AnonymizationMode;

    /// Rewrite `text` over the given detections
    fn anonymize(&mut self, text: &str, detections: &[Detection]) -> Result<AnonymizedText>;
}

/// Replace detected spans right to left
///
/// `replacement` is called once per detection in descending start order with
/// its position in that order. Offsets are characters. Overlapping spans are
/// applied in turn against the partially rewritten text, clamped to its
/// current length.
pub fn apply_replacements<F>(text: &str, detections: &[Detection], mut replacement: F) -> Result<String>
where
    F: FnMut(&Detection, usize) -> String,
{
    validate_detections(text, detections)?;

    let mut ordered: Vec<&Detection> = detections.iter().collect();
    ordered.sort_by(|a, b| b.start.cmp(&a.start));

    let mut chars: Vec<char> = text.chars().collect();
    for (position, detection) in ordered.into_iter().enumerate() {
        let end = detection.end.min(chars.len());
        let start = detection.start.min(end);
        let value = replacement(detection, position);
        chars.splice(start..end, value.chars());
    }

    Ok(chars.into_iter().collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replacement_order_and_positions() {
        let text = "a@b.c and c@d.e";
        let detections = vec![
            Detection::new("EMAIL", 0, 5, "a@b.c", 0.9),
            Detection::new("EMAIL", 10, 15, "c@d.e", 0.9),
        ];
        let mut seen = Vec::new();
        let result = apply_replacements(text, &detections, |d, i| {
            seen.push((d.start, i));
            format!("<{i}>")
        })
        .unwrap();

        assert_eq!(result, "<1> and <0>");
        assert_eq!(seen, vec![(10, 0), (0, 1)]);
    }

    #[test]
    fn test_multibyte_spans() {
        let text = "Città: Roma";
        let detections = vec![Detection::new("LOCATION", 7, 11, "Roma", 0.9)];
        let result = apply_replacements(text, &detections, |_, _| "X".to_string()).unwrap();
        assert_eq!(result, "Città: X");
    }

    #[test]
    fn test_invalid_detection_rejected() {
        let detections = vec![Detection::new("EMAIL", 3, 30, "", 0.9)];
        assert!(apply_replacements("short", &detections, |_, _| String::new()).is_err());
    }

    #[test]
    fn test_no_detections_is_identity() {
        let result = apply_replacements("nothing", &[], |_, _| String::new()).unwrap();
        assert_eq!(result, "nothing");
    }
}
