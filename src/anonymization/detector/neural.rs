//! Neural NER detector
//!
//! Runs one or more sequence-tagging models plus a structured-format pattern
//! battery, filters low-quality model spans, then reconciles overlapping
//! candidates with a small consensus vote across this detector's own sources.

use super::patterns::PatternRegistry;
use super::PiiDetector;
use crate::anonymization::config::{ModelSpec, NeuralConfig};
use crate::anonymization::models::{entity_types, Detection};
use crate::anonymization::spans::resolve_groups;
use crate::anonymization::text::TextIndex;
use crate::domain::errors::DetectorFailure;
use regex::Regex;
use serde::Deserialize;
use std::collections::{BTreeMap, HashSet};
use std::path::PathBuf;
use std::sync::{Arc, OnceLock};

/// Minimum confidence for any model span
const MODEL_CONFIDENCE_FLOOR: f64 = 0.7;

/// Minimum confidence for a lone detection in the consensus step
const SINGLETON_CONFIDENCE: f64 = 0.8;

/// Cap on boosted consensus confidence
const AGREEMENT_CAP: f64 = 0.98;

/// Boost applied when distinct sources agree
const AGREEMENT_BOOST: f64 = 1.1;

const PERSON_DENYLIST: &[&str] = &[
    "test", "email", "telefono", "solo", "nessun", "dato", "sensibile", "codice", "fiscale",
    "partita", "iva", "via", "corso", "piazza", "esempio", "sample", "demo", "fake", "dummy",
];

const ORGANIZATION_DENYLIST: &[&str] = &["test", "example", "sample", "demo"];

const LOCATION_DENYLIST: &[&str] = &["test", "example", "sample", "here", "there"];

/// One labelled span from a tagger, in character offsets
#[derive(Debug, Clone, PartialEq)]
pub struct TaggedSpan {
    /// Model-native label (PER, LOC, ...)
    pub label: String,
    pub start: usize,
    pub end: usize,
    pub score: f64,
}

/// A loaded sequence-tagging model
pub trait SequenceTagger: Send + Sync {
    /// Tag entity spans in `text`
    fn predict(&self, text: &str) -> Result<Vec<TaggedSpan>, DetectorFailure>;
}

/// Loads taggers by model name
pub trait ModelLoader: Send + Sync {
    fn load(&self, model: &str) -> Result<Box<dyn SequenceTagger>, DetectorFailure>;
}

/// Normalize a model-native label; unknown labels pass through
pub fn normalize_label(label: &str) -> String {
    match label {
        "PER" | "PERSON" => entity_types::PERSON.to_string(),
        "ORG" => entity_types::ORGANIZATION.to_string(),
        "LOC" | "GPE" => entity_types::LOCATION.to_string(),
        "MISC" => entity_types::MISC.to_string(),
        other => other.to_string(),
    }
}

fn contains_any(text: &str, words: &[&str]) -> bool {
    let lower = text.to_lowercase();
    words.iter().any(|w| lower.contains(w))
}

fn is_valid_person(text: &str, confidence: f64) -> bool {
    if contains_any(text, PERSON_DENYLIST) {
        return false;
    }

    let tokens: Vec<&str> = text.split_whitespace().collect();
    if tokens.len() < 2 {
        return confidence > 0.9;
    }
    if tokens.len() > 3 {
        return false;
    }

    let capitalized = tokens
        .iter()
        .all(|t| t.chars().next().is_some_and(char::is_uppercase));
    capitalized || confidence > 0.85
}

/// Quality filter for model-produced spans
pub fn is_valid_entity(text: &str, entity_type: &str, confidence: f64) -> bool {
    if confidence < MODEL_CONFIDENCE_FLOOR {
        return false;
    }

    match entity_type {
        entity_types::PERSON => is_valid_person(text, confidence),
        entity_types::ORGANIZATION => !contains_any(text, ORGANIZATION_DENYLIST),
        entity_types::LOCATION => !contains_any(text, LOCATION_DENYLIST),
        _ => true,
    }
}

/// Consensus over one overlap group of this detector's candidates
fn consensus(group: Vec<Detection>) -> Option<Detection> {
    if group.len() == 1 {
        return group
            .into_iter()
            .find(|d| d.confidence >= SINGLETON_CONFIDENCE);
    }

    // Most frequent type, first-seen on ties
    let mut counts: Vec<(&str, usize)> = Vec::new();
    for detection in &group {
        match counts.iter_mut().find(|(t, _)| *t == detection.entity_type) {
            Some((_, count)) => *count += 1,
            None => counts.push((detection.entity_type.as_str(), 1)),
        }
    }
    let (winner, votes) = counts
        .iter()
        .fold(None::<(&str, usize)>, |best, &(t, c)| match best {
            Some((_, bc)) if bc >= c => best,
            _ => Some((t, c)),
        })?;
    if votes < 2 {
        return None;
    }
    let winner = winner.to_string();

    let same_type: Vec<Detection> = group
        .into_iter()
        .filter(|d| d.entity_type == winner)
        .collect();

    let sources: HashSet<Option<&str>> = same_type.iter().map(|d| d.source.as_deref()).collect();
    let mut confidence =
        same_type.iter().map(|d| d.confidence).sum::<f64>() / same_type.len() as f64;
    if sources.len() >= 2 {
        confidence = (confidence * AGREEMENT_BOOST).min(AGREEMENT_CAP);
    }

    let mut best = same_type
        .into_iter()
        .reduce(|best, d| if d.confidence > best.confidence { d } else { best })?;
    best.confidence = confidence;
    Some(best)
}

struct LoadedModel {
    spec: ModelSpec,
    tagger: Box<dyn SequenceTagger>,
}

/// Neural NER PII detector
///
/// Models load on first use; the outcome, including failure, is kept for the
/// lifetime of the detector.
pub struct NeuralDetector {
    models: Vec<ModelSpec>,
    loader: Arc<dyn ModelLoader>,
    loaded: OnceLock<Result<Vec<LoadedModel>, DetectorFailure>>,
    patterns: Arc<PatternRegistry>,
}

impl NeuralDetector {
    /// Create a detector over the given models
    pub fn new(models: Vec<ModelSpec>, loader: Arc<dyn ModelLoader>) -> anyhow::Result<Self> {
        if models.is_empty() {
            anyhow::bail!("Neural detector requires at least one model");
        }

        Ok(Self {
            models,
            loader,
            loaded: OnceLock::new(),
            patterns: Arc::new(PatternRegistry::format_patterns()?),
        })
    }

    /// Create a detector backed by gazetteer models from configuration
    pub fn from_config(config: &NeuralConfig) -> anyhow::Result<Self> {
        Self::new(
            config.models.clone(),
            Arc::new(GazetteerLoader::new(&config.model_dir)),
        )
    }

    fn ensure_loaded(&self) -> Result<&[LoadedModel], DetectorFailure> {
        let outcome = self.loaded.get_or_init(|| {
            let mut loaded = Vec::new();
            for spec in &self.models {
                tracing::info!(model = %spec.name, "Loading NER model");
                match self.loader.load(&spec.name) {
                    Ok(tagger) => loaded.push(LoadedModel {
                        spec: spec.clone(),
                        tagger,
                    }),
                    Err(e) => tracing::warn!(model = %spec.name, error = %e, "Model failed to load"),
                }
            }

            if loaded.is_empty() {
                Err(DetectorFailure::NoModelsLoaded {
                    attempted: self.models.iter().map(|m| m.name.clone()).collect(),
                })
            } else {
                tracing::info!(models = loaded.len(), "Neural detector ready");
                Ok(loaded)
            }
        });

        match outcome {
            Ok(models) => Ok(models.as_slice()),
            Err(e) => Err(e.clone()),
        }
    }

    /// Names of successfully loaded models, loading them if needed
    pub fn loaded_models(&self) -> Result<Vec<String>, DetectorFailure> {
        Ok(self
            .ensure_loaded()?
            .iter()
            .map(|m| m.spec.name.clone())
            .collect())
    }

    fn model_detections(
        &self,
        models: &[LoadedModel],
        index: &TextIndex<'_>,
        language: &str,
    ) -> Vec<Detection> {
        let mut detections = Vec::new();
        let len = index.char_len();

        for model in models.iter().filter(|m| m.spec.serves(language)) {
            let spans = match model.tagger.predict(index.text()) {
                Ok(spans) => spans,
                Err(e) => {
                    tracing::error!(model = %model.spec.name, error = %e, "NER model failed");
                    continue;
                }
            };

            let source = format!("neural_{}", model.spec.name);
            for span in spans {
                if span.start >= span.end || span.end > len {
                    continue;
                }
                let entity_type = normalize_label(&span.label);
                let text = index.slice(span.start, span.end);
                if !is_valid_entity(text, &entity_type, span.score) {
                    tracing::debug!(
                        model = %model.spec.name,
                        entity_type = %entity_type,
                        "Rejected low-quality span"
                    );
                    continue;
                }
                detections.push(
                    Detection::new(entity_type, span.start, span.end, text, span.score)
                        .with_source(source.as_str()),
                );
            }
        }

        detections
    }
}

impl PiiDetector for NeuralDetector {
    fn name(&self) -> &str {
        "NeuralDetector"
    }

    fn supported_languages(&self) -> Vec<String> {
        if self.models.iter().any(|m| m.languages.is_empty()) {
            return vec!["*".to_string()];
        }
        let mut languages: Vec<String> = self
            .models
            .iter()
            .flat_map(|m| m.languages.iter().cloned())
            .collect();
        languages.sort();
        languages.dedup();
        languages
    }

    fn detect(&self, text: &str, language: &str) -> Result<Vec<Detection>, DetectorFailure> {
        let models = self.ensure_loaded()?;
        let index = TextIndex::new(text);

        let mut candidates = self.model_detections(models, &index, language);
        candidates.extend(self.patterns.find_all(&index, None, "patterns"));

        let raw = candidates.len();
        let detections = resolve_groups(candidates, consensus);

        tracing::debug!(
            language,
            raw,
            kept = detections.len(),
            "Neural detection completed"
        );

        Ok(detections)
    }
}

/// Gazetteer file: entity lists per model-native label
#[derive(Debug, Deserialize)]
struct GazetteerFile {
    #[serde(default = "default_gazetteer_confidence")]
    confidence: f64,
    #[serde(default)]
    labels: BTreeMap<String, Vec<String>>,
}

fn default_gazetteer_confidence() -> f64 {
    0.95
}

/// Tagger matching known entity strings on word boundaries
pub struct GazetteerTagger {
    entries: Vec<(String, Regex)>,
    confidence: f64,
}

impl GazetteerTagger {
    /// Build a tagger from label to entity lists
    pub fn new(
        labels: BTreeMap<String, Vec<String>>,
        confidence: f64,
    ) -> Result<Self, regex::Error> {
        let mut entries = Vec::new();
        for (label, mut names) in labels {
            names.retain(|n| !n.trim().is_empty());
            if names.is_empty() {
                continue;
            }
            // Longest alternatives first so "Mario Rossi" beats "Mario"
            names.sort_by_key(|n| std::cmp::Reverse(n.chars().count()));
            let alternation: Vec<String> = names.iter().map(|n| regex::escape(n)).collect();
            let regex = Regex::new(&format!(r"\b(?:{})\b", alternation.join("|")))?;
            entries.push((label, regex));
        }
        Ok(Self {
            entries,
            confidence: confidence.clamp(0.0, 1.0),
        })
    }
}

impl SequenceTagger for GazetteerTagger {
    fn predict(&self, text: &str) -> Result<Vec<TaggedSpan>, DetectorFailure> {
        let index = TextIndex::new(text);
        let mut spans = Vec::new();
        for (label, regex) in &self.entries {
            for matched in regex.find_iter(text) {
                let (start, end) = index.char_range(matched.start(), matched.end());
                spans.push(TaggedSpan {
                    label: label.clone(),
                    start,
                    end,
                    score: self.confidence,
                });
            }
        }
        Ok(spans)
    }
}

/// Loads `<model_dir>/<model>.toml` gazetteers as taggers
#[derive(Debug, Clone)]
pub struct GazetteerLoader {
    model_dir: PathBuf,
}

impl GazetteerLoader {
    pub fn new(model_dir: impl Into<PathBuf>) -> Self {
        Self {
            model_dir: model_dir.into(),
        }
    }
}

impl ModelLoader for GazetteerLoader {
    fn load(&self, model: &str) -> Result<Box<dyn SequenceTagger>, DetectorFailure> {
        let path = self.model_dir.join(format!("{model}.toml"));
        let failure = |reason: String| DetectorFailure::ModelLoading {
            model: model.to_string(),
            reason,
        };

        let content = std::fs::read_to_string(&path)
            .map_err(|e| failure(format!("{}: {e}", path.display())))?;
        let file: GazetteerFile = toml::from_str(&content).map_err(|e| failure(e.to_string()))?;
        let tagger =
            GazetteerTagger::new(file.labels, file.confidence).map_err(|e| failure(e.to_string()))?;

        Ok(Box::new(tagger))
    }
}
