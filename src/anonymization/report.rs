//! Detection reporting
//!
//! Aggregates detections across one or more texts into counts, masked
//! samples and warnings, for console or JSON output.

use crate::anonymization::models::Detection;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Maximum number of samples kept in a report
pub const MAX_SAMPLES: usize = 20;

/// Detections below this confidence produce a warning
pub const LOW_CONFIDENCE_THRESHOLD: f64 = 0.7;

/// Detection statistics across analyzed texts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionReport {
    /// Total texts analyzed
    pub total_texts: usize,

    /// Total detections
    pub total_detections: usize,

    /// Detections by entity type
    pub detections_by_type: BTreeMap<String, usize>,

    /// Detections by contributing detector (or source when no detector list)
    pub detections_by_detector: BTreeMap<String, usize>,

    /// Masked detection samples
    pub samples: Vec<DetectionSample>,

    /// Warnings about likely false positives
    pub warnings: Vec<String>,

    /// Processing statistics
    pub stats: ProcessingStats,
}

/// One masked detection sample
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionSample {
    /// Masked value (first and last character kept)
    pub masked: String,

    pub entity_type: String,

    pub start: usize,

    pub end: usize,

    /// Confidence score (0.0-1.0)
    pub confidence: f64,
}

/// Processing statistics
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProcessingStats {
    /// Average processing time per text (ms)
    pub avg_processing_time_ms: u64,

    /// Total processing time (ms)
    pub total_processing_time_ms: u64,

    /// Texts with at least one detection
    pub texts_with_pii: usize,

    /// Texts without detections
    pub texts_without_pii: usize,
}

impl DetectionReport {
    /// Create a new empty report
    pub fn new() -> Self {
        Self {
            total_texts: 0,
            total_detections: 0,
            detections_by_type: BTreeMap::new(),
            detections_by_detector: BTreeMap::new(),
            samples: Vec::new(),
            warnings: Vec::new(),
            stats: ProcessingStats::default(),
        }
    }

    /// Add the detections of one text
    pub fn add_text(&mut self, detections: &[Detection], processing_time_ms: u64) {
        self.total_texts += 1;
        self.stats.total_processing_time_ms += processing_time_ms;

        if detections.is_empty() {
            self.stats.texts_without_pii += 1;
        } else {
            self.stats.texts_with_pii += 1;
            self.total_detections += detections.len();

            for detection in detections {
                *self
                    .detections_by_type
                    .entry(detection.entity_type.clone())
                    .or_insert(0) += 1;

                if detection.detectors.is_empty() {
                    let source = detection.source.as_deref().unwrap_or("unknown");
                    *self
                        .detections_by_detector
                        .entry(source.to_string())
                        .or_insert(0) += 1;
                } else {
                    for detector in &detection.detectors {
                        *self.detections_by_detector.entry(detector.clone()).or_insert(0) += 1;
                    }
                }

                if detection.confidence < LOW_CONFIDENCE_THRESHOLD {
                    self.add_warning(format!(
                        "Low confidence {} detection at {}..{} ({:.2})",
                        detection.entity_type, detection.start, detection.end, detection.confidence
                    ));
                }

                self.add_sample(detection);
            }
        }

        self.stats.avg_processing_time_ms =
            self.stats.total_processing_time_ms / self.total_texts as u64;
    }

    fn add_sample(&mut self, detection: &Detection) {
        if self.samples.len() >= MAX_SAMPLES {
            return;
        }

        self.samples.push(DetectionSample {
            masked: mask_value(&detection.text),
            entity_type: detection.entity_type.clone(),
            start: detection.start,
            end: detection.end,
            confidence: detection.confidence,
        });
    }

    /// Add a warning
    pub fn add_warning(&mut self, warning: String) {
        self.warnings.push(warning);
    }

    /// Format report for console output
    pub fn format_console(&self) -> String {
        let mut output = String::new();

        output.push('\n');
        output.push_str("═══════════════════════════════════════════════════════════════\n");
        output.push_str("                     PII DETECTION REPORT                      \n");
        output.push_str("═══════════════════════════════════════════════════════════════\n");
        output.push('\n');

        output.push_str("SUMMARY\n");
        output.push_str("───────────────────────────────────────────────────────────────\n");
        output.push_str(&format!("  Texts Analyzed:        {}\n", self.total_texts));
        output.push_str(&format!("  Texts with PII:        {}\n", self.stats.texts_with_pii));
        output.push_str(&format!(
            "  Texts without PII:     {}\n",
            self.stats.texts_without_pii
        ));
        output.push_str(&format!("  Total Detections:      {}\n", self.total_detections));
        output.push_str(&format!(
            "  Avg Processing Time:   {} ms\n",
            self.stats.avg_processing_time_ms
        ));
        output.push('\n');

        if !self.detections_by_type.is_empty() {
            output.push_str("DETECTIONS BY ENTITY TYPE\n");
            output.push_str("───────────────────────────────────────────────────────────────\n");

            let mut types: Vec<_> = self.detections_by_type.iter().collect();
            types.sort_by(|a, b| b.1.cmp(a.1));
            for (entity_type, count) in types {
                output.push_str(&format!("  {entity_type:30} {count:>5}\n"));
            }
            output.push('\n');
        }

        if !self.detections_by_detector.is_empty() {
            output.push_str("DETECTIONS BY DETECTOR\n");
            output.push_str("───────────────────────────────────────────────────────────────\n");
            for (detector, count) in &self.detections_by_detector {
                output.push_str(&format!("  {detector:30} {count:>5}\n"));
            }
            output.push('\n');
        }

        if !self.samples.is_empty() {
            output.push_str("SAMPLES\n");
            output.push_str("───────────────────────────────────────────────────────────────\n");
            for (i, sample) in self.samples.iter().take(10).enumerate() {
                output.push_str(&format!(
                    "  #{:<3} {:15} {:>6}..{:<6} {:>6.2}%  \"{}\"\n",
                    i + 1,
                    sample.entity_type,
                    sample.start,
                    sample.end,
                    sample.confidence * 100.0,
                    sample.masked
                ));
            }
            output.push('\n');
        }

        if !self.warnings.is_empty() {
            output.push_str("WARNINGS\n");
            output.push_str("───────────────────────────────────────────────────────────────\n");
            for warning in &self.warnings {
                output.push_str(&format!("  • {warning}\n"));
            }
            output.push('\n');
        }

        output.push_str("═══════════════════════════════════════════════════════════════\n");
        output
    }

    /// Format report as JSON
    pub fn format_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

impl Default for DetectionReport {
    fn default() -> Self {
        Self::new()
    }
}

/// Keep the first and last character, mask the rest
fn mask_value(value: &str) -> String {
    let chars: Vec<char> = value.chars().collect();
    match chars.len() {
        0 => String::new(),
        1 | 2 => "*".repeat(chars.len()),
        n => {
            let mut masked = String::with_capacity(n);
            masked.push(chars[0]);
            masked.push_str(&"*".repeat(n - 2));
            masked.push(chars[n - 1]);
            masked
        }
    }
}
