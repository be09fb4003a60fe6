//! Visual redaction strategy

use super::{apply_replacements, AnonymizedText, Anonymizer};
use crate::anonymization::config::AnonymizationMode;
use crate::anonymization::models::Detection;
use crate::domain::Result;

/// Replaces each span with a fixed opaque block regardless of its length
///
/// Document adapters use the detection offsets of the same request to draw
/// overlays; the block in the text is only a marker.
#[derive(Debug, Clone)]
pub struct VisualRedactStrategy {
    block: String,
}

impl VisualRedactStrategy {
    pub fn new() -> Self {
        Self::with_block("██████")
    }

    pub fn with_block(block: impl Into<String>) -> Self {
        Self {
            block: block.into(),
        }
    }
}

impl Anonymizer for VisualRedactStrategy {
    fn mode(&self) -> AnonymizationMode {
        AnonymizationMode::VisualRedact
    }

    fn anonymize(&mut self, text: &str, detections: &[Detection]) -> Result<AnonymizedText> {
        let redacted = apply_replacements(text, detections, |_, _| self.block.clone())?;
        Ok(AnonymizedText::irreversible(redacted))
    }
}

impl Default for VisualRedactStrategy {
    fn default() -> Self {
        Self::new()
    }
}
