//! Audit logger for anonymization operations

use crate::anonymization::config::AuditConfig;
use crate::anonymization::models::{AnonymizationResult, Detection};
use anyhow::{Context, Result};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;

/// Audit log entry
#[derive(Debug, Serialize)]
struct AuditLogEntry<'a> {
    timestamp: String,
    mode: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    reverse_key: Option<&'a str>,
    detections_count: usize,
    processing_time_ms: u64,
    detections: Vec<AuditDetection<'a>>,
}

/// Audit detection entry (with hashed PII)
#[derive(Debug, Serialize)]
struct AuditDetection<'a> {
    entity_type: &'a str,
    start: usize,
    end: usize,
    confidence: f64,
    #[serde(skip_serializing_if = "<[String]>::is_empty")]
    detectors: &'a [String],
    /// SHA-256 hash of original value (never log plaintext PII)
    value_hash: String,
}

/// Append-only audit log of anonymization requests
pub struct AuditLogger {
    log_path: PathBuf,
    json_format: bool,
    enabled: bool,
}

impl AuditLogger {
    /// Create a new audit logger
    pub fn new(log_path: PathBuf, json_format: bool, enabled: bool) -> Result<Self> {
        if enabled {
            if let Some(parent) = log_path.parent() {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create audit log directory: {}", parent.display())
                })?;
            }
        }

        Ok(Self {
            log_path,
            json_format,
            enabled,
        })
    }

    /// Create a logger from the `[audit]` section
    pub fn from_config(config: &AuditConfig) -> Result<Self> {
        Self::new(config.log_path.clone(), config.json_format, config.enabled)
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Log one anonymization result
    pub fn log_anonymization(&self, result: &AnonymizationResult) -> Result<()> {
        if !self.enabled {
            return Ok(());
        }

        let entry = AuditLogEntry {
            timestamp: result.timestamp.to_rfc3339(),
            mode: result.mode.as_str(),
            reverse_key: result.reverse_key.as_deref(),
            detections_count: result.detections_count,
            processing_time_ms: result.processing_time_ms,
            detections: result.detections.iter().map(audit_detection).collect(),
        };

        self.write_entry(&entry)
    }

    fn write_entry(&self, entry: &AuditLogEntry<'_>) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log_path)
            .with_context(|| format!("Failed to open audit log: {}", self.log_path.display()))?;

        if self.json_format {
            let json_line =
                serde_json::to_string(entry).context("Failed to serialize audit entry")?;
            writeln!(file, "{json_line}").context("Failed to write audit entry")?;
        } else {
            let types: Vec<&str> = entry.detections.iter().map(|d| d.entity_type).collect();
            writeln!(
                file,
                "[{}] Mode: {} | Detections: {} | Types: {} | Time: {}ms",
                entry.timestamp,
                entry.mode,
                entry.detections_count,
                types.join(","),
                entry.processing_time_ms
            )
            .context("Failed to write audit entry")?;
        }

        Ok(())
    }
}

fn audit_detection(detection: &Detection) -> AuditDetection<'_> {
    AuditDetection {
        entity_type: &detection.entity_type,
        start: detection.start,
        end: detection.end,
        confidence: detection.confidence,
        detectors: &detection.detectors,
        value_hash: hash_value(&detection.text),
    }
}

/// Hex SHA-256 of a detected value
pub fn hash_value(value: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(value.as_bytes());
    format!("{:x}", hasher.finalize())
}
