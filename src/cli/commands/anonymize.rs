//! Anonymize command implementation

use super::{exit_code_for, read_input, resolve_config};
use crate::anonymization::config::AnonymizationMode;
use crate::anonymization::models::AnonymizationResult;
use crate::anonymization::AnonymizationEngine;
use anyhow::Context;
use clap::Args;
use std::fs;

/// Arguments for the anonymize command
#[derive(Args, Debug)]
pub struct AnonymizeArgs {
    /// Input file, or `-` for stdin
    #[arg(short, long, default_value = "-")]
    pub input: String,

    /// Write anonymized output to this file instead of stdout
    #[arg(short, long)]
    pub output: Option<String>,

    /// Anonymization mode (redact, substitute, visual_redact)
    #[arg(short, long)]
    pub mode: Option<String>,

    /// Language of the input text
    #[arg(short, long)]
    pub language: Option<String>,

    /// Emit the full result (detections, mapping, reverse key) as JSON
    #[arg(long)]
    pub json: bool,

    /// Treat the input as a JSON array of texts
    #[arg(long)]
    pub batch: bool,

    /// Seed for substitute values
    #[arg(long)]
    pub seed: Option<u64>,
}

impl AnonymizeArgs {
    /// Execute the anonymize command
    pub fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        let config = match resolve_config(config_path) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("❌ {e}");
                return Ok(exit_code_for(&e));
            }
        };

        let mode = match self.mode.as_deref().map(str::parse::<AnonymizationMode>).transpose() {
            Ok(mode) => mode,
            Err(e) => {
                eprintln!("❌ {e}");
                return Ok(exit_code_for(&e));
            }
        };

        let mut engine = match AnonymizationEngine::from_config(&config) {
            Ok(engine) => engine,
            Err(e) => {
                eprintln!("❌ {e}");
                return Ok(exit_code_for(&e));
            }
        };
        if let Some(seed) = self.seed {
            engine = engine.with_substitution_seed(seed);
        }

        let input = read_input(&self.input)?;
        let language = self.language.as_deref();

        let results = if self.batch {
            let texts: Vec<String> =
                serde_json::from_str(&input).context("Batch input must be a JSON array of strings")?;
            engine.anonymize_batch(&texts, mode, language)
        } else {
            engine.anonymize(&input, mode, language).map(|r| vec![r])
        };

        let results = match results {
            Ok(results) => results,
            Err(e) => {
                tracing::error!(error = %e, "Anonymization failed");
                eprintln!("❌ {e}");
                return Ok(exit_code_for(&e));
            }
        };

        let rendered = self.render(&results)?;
        match &self.output {
            Some(path) => {
                fs::write(path, rendered).with_context(|| format!("Failed to write {path}"))?;
                let detections: usize = results.iter().map(|r| r.detections_count).sum();
                eprintln!("✅ Wrote {path} ({detections} detections)");
            }
            None => println!("{rendered}"),
        }

        Ok(0)
    }

    fn render(&self, results: &[AnonymizationResult]) -> anyhow::Result<String> {
        match (self.json, self.batch) {
            (true, true) => Ok(serde_json::to_string_pretty(results)?),
            (true, false) => Ok(serde_json::to_string_pretty(&results[0])?),
            (false, true) => {
                let texts: Vec<&str> = results.iter().map(|r| r.anonymized_text.as_str()).collect();
                Ok(serde_json::to_string_pretty(&texts)?)
            }
            (false, false) => Ok(results[0].anonymized_text.clone()),
        }
    }
}
