//! Detection and anonymization configuration

use crate::anonymization::ensemble::{DecayPolicy, VotingStrategy};
use crate::domain::errors::ShroudError;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Anonymization mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AnonymizationMode {
    /// Replace each character of a span with the redaction character
    #[default]
    Redact,
    /// Replace spans with fake values and return a reversible mapping
    Substitute,
    /// Replace spans with a fixed opaque block
    VisualRedact,
}

impl AnonymizationMode {
    /// All supported modes
    pub const ALL: [AnonymizationMode; 3] = [Self::Redact, Self::Substitute, Self::VisualRedact];

    /// Wire name of the mode
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Redact => "redact",
            Self::Substitute => "substitute",
            Self::VisualRedact => "visual_redact",
        }
    }

    /// Whether the mode yields a mapping that can restore originals
    pub fn is_reversible(&self) -> bool {
        matches!(self, Self::Substitute)
    }
}

impl fmt::Display for AnonymizationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AnonymizationMode {
    type Err = ShroudError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "redact" => Ok(Self::Redact),
            "substitute" => Ok(Self::Substitute),
            "visual_redact" => Ok(Self::VisualRedact),
            _ => Err(ShroudError::UnsupportedMode {
                mode: s.to_string(),
                available: Self::ALL.iter().map(|m| m.as_str().to_string()).collect(),
            }),
        }
    }
}

/// Which detector the engine runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DetectorKind {
    /// Neural NER with fallback to the statistical detector
    #[default]
    Neural,
    /// Statistical detector only
    Statistical,
    /// Multi-detector ensemble
    Ensemble,
}

impl FromStr for DetectorKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "neural" => Ok(Self::Neural),
            "statistical" => Ok(Self::Statistical),
            "ensemble" => Ok(Self::Ensemble),
            _ => Err(format!("Invalid detector kind: {s}")),
        }
    }
}

/// Detection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionConfig {
    /// Detector the engine runs
    #[serde(default)]
    pub detector: DetectorKind,

    /// Language used when a request does not name one
    #[serde(default = "default_language")]
    pub default_language: String,

    /// Maximum input length in characters
    #[serde(default = "default_max_text_length")]
    pub max_text_length: usize,

    /// Detections below this confidence are dropped by the engine
    #[serde(default)]
    pub confidence_threshold: f64,

    /// Statistical detector settings
    #[serde(default)]
    pub statistical: StatisticalConfig,

    /// Neural detector settings
    #[serde(default)]
    pub neural: NeuralConfig,
}

fn default_language() -> String {
    "it".to_string()
}

fn default_max_text_length() -> usize {
    10_000_000
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            detector: DetectorKind::default(),
            default_language: default_language(),
            max_text_length: default_max_text_length(),
            confidence_threshold: 0.0,
            statistical: StatisticalConfig::default(),
            neural: NeuralConfig::default(),
        }
    }
}

impl DetectionConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.confidence_threshold) {
            anyhow::bail!(
                "confidence_threshold must be between 0.0 and 1.0, got {}",
                self.confidence_threshold
            );
        }
        if self.max_text_length == 0 {
            anyhow::bail!("max_text_length must be greater than 0");
        }
        if self.default_language.trim().is_empty() {
            anyhow::bail!("default_language cannot be empty");
        }
        if self.detector == DetectorKind::Neural && self.neural.models.is_empty() {
            anyhow::bail!("neural detector selected but no models are configured");
        }
        Ok(())
    }
}

/// Statistical detector configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatisticalConfig {
    /// Request language to analyzer locale
    #[serde(default = "default_language_map")]
    pub language_map: BTreeMap<String, String>,
}

fn default_language_map() -> BTreeMap<String, String> {
    BTreeMap::from([
        ("it".to_string(), "en".to_string()),
        ("en".to_string(), "en".to_string()),
    ])
}

impl Default for StatisticalConfig {
    fn default() -> Self {
        Self {
            language_map: default_language_map(),
        }
    }
}

/// One configured NER model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelSpec {
    /// Model name handed to the loader
    pub name: String,
    /// Languages the model serves; empty means every language
    #[serde(default)]
    pub languages: Vec<String>,
}

impl ModelSpec {
    /// Multilingual model
    pub fn multilingual(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            languages: Vec::new(),
        }
    }

    /// Model restricted to the given languages
    pub fn for_languages(name: impl Into<String>, languages: &[&str]) -> Self {
        Self {
            name: name.into(),
            languages: languages.iter().map(|l| l.to_string()).collect(),
        }
    }

    /// Whether this model should run for `language`
    pub fn serves(&self, language: &str) -> bool {
        self.languages.is_empty() || self.languages.iter().any(|l| l == language)
    }
}

/// Neural detector configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NeuralConfig {
    /// Models to load, in run order
    #[serde(default = "default_models")]
    pub models: Vec<ModelSpec>,

    /// Directory the model loader reads from
    #[serde(default = "default_model_dir")]
    pub model_dir: PathBuf,
}

fn default_models() -> Vec<ModelSpec> {
    vec![
        ModelSpec::multilingual("ner-multi"),
        ModelSpec::for_languages("ner-english", &["en"]),
    ]
}

fn default_model_dir() -> PathBuf {
    PathBuf::from("./models")
}

impl Default for NeuralConfig {
    fn default() -> Self {
        Self {
            models: default_models(),
            model_dir: default_model_dir(),
        }
    }
}

/// Ensemble member selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnsembleMember {
    /// Custom pattern matcher
    Patterns,
    /// Statistical detector
    Statistical,
    /// Neural NER detector
    Neural,
}

/// Ensemble configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnsembleConfig {
    /// Detectors taking part in the vote
    #[serde(default = "default_members")]
    pub members: Vec<EnsembleMember>,

    /// Voting strategy
    #[serde(default)]
    pub voting_strategy: VotingStrategy,

    /// Minimum aggregated confidence for a group to survive
    #[serde(default = "default_min_confidence")]
    pub min_confidence: f64,

    /// Minimum number of agreeing votes for a group to survive
    #[serde(default = "default_min_votes")]
    pub min_votes: usize,

    /// Per-detector weight overrides, keyed by detector name
    #[serde(default)]
    pub weights: BTreeMap<String, f64>,

    /// Track feedback and adapt weights
    #[serde(default)]
    pub adaptive: bool,

    /// How feedback turns into accuracy for the adaptive ensemble
    #[serde(default)]
    pub decay_policy: DecayPolicy,

    /// Feedback events a detector needs before its weight adapts
    #[serde(default = "default_min_feedback")]
    pub min_feedback: u64,
}

fn default_members() -> Vec<EnsembleMember> {
    vec![EnsembleMember::Statistical, EnsembleMember::Patterns]
}

fn default_min_confidence() -> f64 {
    0.5
}

fn default_min_votes() -> usize {
    1
}

fn default_min_feedback() -> u64 {
    10
}

impl Default for EnsembleConfig {
    fn default() -> Self {
        Self {
            members: default_members(),
            voting_strategy: VotingStrategy::default(),
            min_confidence: default_min_confidence(),
            min_votes: default_min_votes(),
            weights: BTreeMap::new(),
            adaptive: false,
            decay_policy: DecayPolicy::default(),
            min_feedback: default_min_feedback(),
        }
    }
}

impl EnsembleConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.members.is_empty() {
            anyhow::bail!("ensemble requires at least one member detector");
        }
        if !(0.0..=1.0).contains(&self.min_confidence) {
            anyhow::bail!(
                "min_confidence must be between 0.0 and 1.0, got {}",
                self.min_confidence
            );
        }
        if self.min_votes == 0 {
            anyhow::bail!("min_votes must be at least 1");
        }
        for (name, weight) in &self.weights {
            if !weight.is_finite() || *weight <= 0.0 {
                anyhow::bail!("weight for detector '{name}' must be positive, got {weight}");
            }
        }
        if let DecayPolicy::ExponentialMovingAverage { alpha } = self.decay_policy {
            if !(alpha > 0.0 && alpha <= 1.0) {
                anyhow::bail!("decay alpha must be in (0.0, 1.0], got {alpha}");
            }
        }
        Ok(())
    }
}

/// User-defined pattern from configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomPatternConfig {
    /// Pattern name, used as entity type
    pub name: String,
    /// Regular expression
    pub pattern: String,
    /// Confidence assigned to matches
    #[serde(default = "default_pattern_confidence")]
    pub confidence: f64,
    /// Human-readable description
    #[serde(default)]
    pub description: String,
    /// Match case-insensitively
    #[serde(default = "default_true")]
    pub case_insensitive: bool,
}

fn default_pattern_confidence() -> f64 {
    0.9
}

fn default_true() -> bool {
    true
}

/// Anonymization strategy configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnonymizationConfig {
    /// Mode used when a request does not name one
    #[serde(default)]
    pub default_mode: AnonymizationMode,

    /// Fill character for redact mode
    #[serde(default = "default_redaction_character")]
    pub redaction_character: char,

    /// Block written over each span in visual_redact mode
    #[serde(default = "default_visual_block")]
    pub visual_block: String,

    /// Request language to fake-data locale
    #[serde(default = "default_faker_locales")]
    pub faker_locales: BTreeMap<String, String>,
}

fn default_redaction_character() -> char {
    '█'
}

fn default_visual_block() -> String {
    "██████".to_string()
}

fn default_faker_locales() -> BTreeMap<String, String> {
    BTreeMap::from([
        ("en".to_string(), "en".to_string()),
        ("fr".to_string(), "fr_fr".to_string()),
    ])
}

impl Default for AnonymizationConfig {
    fn default() -> Self {
        Self {
            default_mode: AnonymizationMode::default(),
            redaction_character: default_redaction_character(),
            visual_block: default_visual_block(),
            faker_locales: default_faker_locales(),
        }
    }
}

impl AnonymizationConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.redaction_character.is_whitespace() {
            anyhow::bail!("redaction_character cannot be whitespace");
        }
        if self.visual_block.is_empty() {
            anyhow::bail!("visual_block cannot be empty");
        }
        Ok(())
    }
}

/// Audit logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditConfig {
    /// Enable audit logging
    #[serde(default)]
    pub enabled: bool,

    /// Audit log file path
    #[serde(default = "default_audit_log_path")]
    pub log_path: PathBuf,

    /// Use JSON format for audit logs
    #[serde(default = "default_audit_json_format")]
    pub json_format: bool,
}

fn default_audit_log_path() -> PathBuf {
    PathBuf::from("./audit/anonymization.log")
}

fn default_audit_json_format() -> bool {
    true
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            log_path: default_audit_log_path(),
            json_format: default_audit_json_format(),
        }
    }
}

impl AuditConfig {
    /// Validate audit configuration
    pub fn validate(&self) -> Result<()> {
        if self.enabled && self.log_path.as_os_str().is_empty() {
            anyhow::bail!("audit log_path cannot be empty when auditing is enabled");
        }
        Ok(())
    }
}
