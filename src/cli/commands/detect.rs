//! Detect command implementation

use super::{exit_code_for, read_input, resolve_config};
use crate::anonymization::models::Detection;
use crate::anonymization::report::DetectionReport;
use crate::anonymization::AnonymizationEngine;
use clap::Args;
use serde::Serialize;
use std::time::Instant;

/// Arguments for the detect command
#[derive(Args, Debug)]
pub struct DetectArgs {
    /// Input file, or `-` for stdin
    #[arg(short, long, default_value = "-")]
    pub input: String,

    /// Language of the input text
    #[arg(short, long)]
    pub language: Option<String>,

    /// Print a human-readable report to stderr
    #[arg(long)]
    pub summary: bool,
}

#[derive(Debug, Serialize)]
struct DetectOutput<'a> {
    detector: &'a str,
    language: &'a str,
    detections: &'a [Detection],
    report: &'a DetectionReport,
}

impl DetectArgs {
    /// Execute the detect command
    pub fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        let engine = match resolve_config(config_path).and_then(|c| AnonymizationEngine::from_config(&c)) {
            Ok(engine) => engine,
            Err(e) => {
                eprintln!("❌ {e}");
                return Ok(exit_code_for(&e));
            }
        };

        let input = read_input(&self.input)?;
        let language = self
            .language
            .as_deref()
            .unwrap_or(engine.default_language())
            .to_string();

        let start = Instant::now();
        let detections = match engine.detect(&input, Some(&language)) {
            Ok(detections) => detections,
            Err(e) => {
                eprintln!("❌ {e}");
                return Ok(exit_code_for(&e));
            }
        };

        let mut report = DetectionReport::new();
        report.add_text(&detections, start.elapsed().as_millis() as u64);

        let output = DetectOutput {
            detector: engine.detector_name(),
            language: &language,
            detections: &detections,
            report: &report,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);

        if self.summary {
            eprintln!("{}", report.format_console());
        }

        Ok(0)
    }
}
