//! Primary detector with per-call fallback

use super::PiiDetector;
use crate::anonymization::models::Detection;
use crate::domain::errors::DetectorFailure;

/// Runs a primary detector and falls back to a secondary one when it fails
///
/// The engine pairs the neural detector with the statistical one so that a
/// missing model set degrades detection quality instead of failing requests.
pub struct CompositeDetector {
    primary: Box<dyn PiiDetector>,
    fallback: Box<dyn PiiDetector>,
}

impl CompositeDetector {
    pub fn new(primary: Box<dyn PiiDetector>, fallback: Box<dyn PiiDetector>) -> Self {
        Self { primary, fallback }
    }

    pub fn primary(&self) -> &dyn PiiDetector {
        self.primary.as_ref()
    }

    pub fn fallback(&self) -> &dyn PiiDetector {
        self.fallback.as_ref()
    }
}

impl PiiDetector for CompositeDetector {
    fn name(&self) -> &str {
        "CompositeDetector"
    }

    fn supported_languages(&self) -> Vec<String> {
        let mut languages = self.primary.supported_languages();
        for language in self.fallback.supported_languages() {
            if !languages.contains(&language) {
                languages.push(language);
            }
        }
        languages
    }

    fn detect(&self, text: &str, language: &str) -> Result<Vec<Detection>, DetectorFailure> {
        match self.primary.detect(text, language) {
            Ok(detections) => Ok(detections),
            Err(failure) => {
                crate::log_detector_failure!(self.primary.name(), failure);
                tracing::warn!(
                    fallback = self.fallback.name(),
                    "Falling back to secondary detector"
                );
                self.fallback.detect(text, language)
            }
        }
    }
}
