//! Anonymization result models

use crate::anonymization::config::AnonymizationMode;
use crate::anonymization::models::Detection;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// One reversible substitution
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingEntry {
    /// Entity type of the replaced value
    pub entity_type: String,
    /// Original value
    pub original: String,
    /// Fake value written into the text
    pub substitute: String,
}

/// Substitution mapping keyed `{ENTITY_TYPE}_{index}`
pub type SubstitutionMapping = BTreeMap<String, MappingEntry>;

/// Output of a single anonymization request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnonymizationResult {
    /// Anonymized text
    pub anonymized_text: String,
    /// Original text (never serialized)
    #[serde(skip_serializing, default)]
    pub original_text: String,
    /// Mode applied
    pub mode: AnonymizationMode,
    /// Final detections with original-text offsets
    pub detections: Vec<Detection>,
    /// Number of detections
    pub detections_count: usize,
    /// Substitution mapping (substitute mode only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mapping: Option<SubstitutionMapping>,
    /// Opaque identifier of this mapping instance (substitute mode only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reverse_key: Option<String>,
    /// Processing time in milliseconds
    pub processing_time_ms: u64,
    /// Timestamp of anonymization
    pub timestamp: DateTime<Utc>,
}

impl AnonymizationResult {
    /// Create a new result
    pub fn new(
        anonymized_text: String,
        original_text: String,
        mode: AnonymizationMode,
        detections: Vec<Detection>,
        processing_time_ms: u64,
    ) -> Self {
        Self {
            anonymized_text,
            original_text,
            mode,
            detections_count: detections.len(),
            detections,
            mapping: None,
            reverse_key: None,
            processing_time_ms,
            timestamp: Utc::now(),
        }
    }

    /// Attach the substitution mapping and its reverse key
    pub fn with_mapping(mut self, mapping: SubstitutionMapping, reverse_key: String) -> Self {
        self.mapping = Some(mapping);
        self.reverse_key = Some(reverse_key);
        self
    }

    /// Check if any PII was detected
    pub fn has_detections(&self) -> bool {
        !self.detections.is_empty()
    }

    /// Detection counts by entity type
    pub fn stats_by_entity_type(&self) -> HashMap<String, usize> {
        let mut stats = HashMap::new();
        for detection in &self.detections {
            *stats.entry(detection.entity_type.clone()).or_insert(0) += 1;
        }
        stats
    }
}
