//! PII detection module
//!
//! Provides the trait-based detection interface and the built-in detectors:
//! user-defined patterns, a statistical analyzer with a locale pattern
//! battery, and neural sequence taggers with their own format battery.

pub mod composite;
pub mod custom;
pub mod neural;
pub mod patterns;
pub mod statistical;

pub use composite::CompositeDetector;
pub use custom::{CustomPattern, PatternMatcher, Validator};
pub use neural::{GazetteerLoader, ModelLoader, NeuralDetector, SequenceTagger, TaggedSpan};
pub use statistical::{AnalyzerResult, EntityAnalyzer, StatisticalDetector};

use crate::anonymization::models::Detection;
use crate::domain::errors::DetectorFailure;

/// Trait for PII detection implementations
///
/// Detectors are stateless per call: the same text and language always yield
/// the same detections. Offsets are character offsets into `text`.
pub trait PiiDetector: Send + Sync {
    /// Stable name used for weights, votes and logs
    fn name(&self) -> &str;

    /// Languages this detector has explicit support for
    fn supported_languages(&self) -> Vec<String>;

    /// Detect PII spans in `text`
    fn detect(&self, text: &str, language: &str) -> Result<Vec<Detection>, DetectorFailure>;
}

impl<T: PiiDetector + ?Sized> PiiDetector for Box<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn supported_languages(&self) -> Vec<String> {
        (**self).supported_languages()
    }

    fn detect(&self, text: &str, language: &str) -> Result<Vec<Detection>, DetectorFailure> {
        (**self).detect(text, language)
    }
}
