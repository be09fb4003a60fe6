//! Request and detection validation
//!
//! Runs before any detector or strategy touches the text.

use crate::anonymization::models::Detection;
use crate::domain::errors::ShroudError;
use crate::domain::Result;
use serde_json::json;

/// Default maximum input length in characters
pub const DEFAULT_MAX_TEXT_LENGTH: usize = 10_000_000;

/// Maximum number of texts in one batch request
pub const MAX_BATCH_SIZE: usize = 100;

/// Reject empty, whitespace-only or over-long input
pub fn validate_text_input(text: &str, max_length: usize) -> Result<()> {
    if text.trim().is_empty() {
        return Err(ShroudError::empty_text());
    }

    let length = text.chars().count();
    if length > max_length {
        return Err(ShroudError::text_too_long(length, max_length));
    }

    Ok(())
}

/// Reject batches that are empty, too large or contain an invalid text
pub fn validate_batch(texts: &[String], max_length: usize) -> Result<()> {
    if texts.is_empty() || texts.len() > MAX_BATCH_SIZE {
        return Err(ShroudError::validation_with(
            format!("Batch must contain between 1 and {MAX_BATCH_SIZE} texts"),
            json!({ "batch_size": texts.len(), "max_batch_size": MAX_BATCH_SIZE }),
        ));
    }

    for (index, text) in texts.iter().enumerate() {
        if text.trim().is_empty() {
            return Err(ShroudError::validation_with(
                format!("Text at index {index} is empty"),
                json!({ "index": index }),
            ));
        }
        validate_text_input(text, max_length)?;
    }

    Ok(())
}

/// Reject a confidence value outside `[0, 1]`
pub fn validate_confidence(name: &str, value: f64) -> Result<()> {
    if !(0.0..=1.0).contains(&value) {
        return Err(ShroudError::validation_with(
            format!("{name} must be between 0.0 and 1.0, got {value}"),
            json!({ "field": name, "value": value }),
        ));
    }
    Ok(())
}

/// Reject detections whose span is empty, inverted or past the end of `text`
pub fn validate_detections(text: &str, detections: &[Detection]) -> Result<()> {
    let length = text.chars().count();

    for (index, detection) in detections.iter().enumerate() {
        if detection.start >= detection.end {
            return Err(ShroudError::invalid_detection(
                "end position must be greater than start position",
                json!({ "index": index, "start": detection.start, "end": detection.end }),
            ));
        }
        if detection.end > length {
            return Err(ShroudError::invalid_detection(
                "detection extends past the end of the text",
                json!({ "index": index, "end": detection.end, "text_length": length }),
            ));
        }
    }

    Ok(())
}
