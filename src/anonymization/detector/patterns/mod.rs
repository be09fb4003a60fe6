//! Pattern library for PII detection

use crate::anonymization::models::Detection;
use crate::anonymization::text::TextIndex;
use anyhow::{Context, Result};
use regex::{Regex, RegexBuilder};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;

/// Pattern definition from TOML
#[derive(Debug, Clone, Deserialize)]
pub struct PatternDefinition {
    /// Group name, unique within a library
    pub name: String,
    /// Regex patterns for this group
    pub patterns: Vec<String>,
    /// Confidence score (0.0 - 1.0)
    pub confidence: f64,
    /// Entity type emitted for matches
    pub category: String,
}

/// Compiled pattern with metadata
#[derive(Debug, Clone)]
pub struct CompiledPattern {
    /// Group name from the library
    pub name: String,
    /// Compiled regex
    pub regex: Regex,
    /// Entity type
    pub entity_type: String,
    /// Confidence score
    pub confidence: f64,
}

/// Pattern library container
#[derive(Debug, Deserialize)]
struct PatternLibrary {
    patterns: Vec<PatternDefinition>,
}

/// Compiled pattern library
///
/// Groups are compiled case-insensitively and kept in file order. Detectors
/// that dedup equal-confidence overlaps keep the earlier group, so the order
/// of `[[patterns]]` entries is a priority.
#[derive(Debug, Clone)]
pub struct PatternRegistry {
    patterns: Vec<CompiledPattern>,
}

impl PatternRegistry {
    /// Create a new pattern registry from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).with_context(|| {
            format!(
                "Failed to read pattern library: {}",
                path.as_ref().display()
            )
        })?;

        Self::from_toml(&content)
    }

    /// Create a pattern registry from TOML content
    pub fn from_toml(content: &str) -> Result<Self> {
        let library: PatternLibrary =
            toml::from_str(content).context("Failed to parse pattern library TOML")?;

        let mut patterns = Vec::new();
        let mut seen = HashSet::new();
        for def in library.patterns {
            let name = def.name.trim().to_string();
            if name.is_empty() {
                anyhow::bail!("Pattern group has an empty name");
            }
            if !seen.insert(name.clone()) {
                anyhow::bail!("Duplicate pattern group '{name}'");
            }
            if !(0.0..=1.0).contains(&def.confidence) {
                anyhow::bail!(
                    "Confidence for pattern '{name}' must be between 0.0 and 1.0, got {}",
                    def.confidence
                );
            }

            let entity_type = def.category.trim().to_uppercase();
            if entity_type.is_empty() {
                anyhow::bail!("Pattern '{name}' has an empty category");
            }

            for pattern_str in &def.patterns {
                let regex = RegexBuilder::new(pattern_str)
                    .case_insensitive(true)
                    .build()
                    .with_context(|| format!("Invalid regex in pattern '{name}': {pattern_str}"))?;

                patterns.push(CompiledPattern {
                    name: name.clone(),
                    regex,
                    entity_type: entity_type.clone(),
                    confidence: def.confidence,
                });
            }
        }

        Ok(Self { patterns })
    }

    /// Locale battery run by the statistical detector
    pub fn statistical_patterns() -> Result<Self> {
        Self::from_toml(include_str!("../../../../patterns/statistical_patterns.toml"))
    }

    /// Structured-format battery run alongside NER models
    pub fn format_patterns() -> Result<Self> {
        Self::from_toml(include_str!("../../../../patterns/neural_patterns.toml"))
    }

    /// Get all patterns
    pub fn all_patterns(&self) -> &[CompiledPattern] {
        &self.patterns
    }

    /// Get patterns emitting a specific entity type
    pub fn patterns_for_type<'a>(
        &'a self,
        entity_type: &'a str,
    ) -> impl Iterator<Item = &'a CompiledPattern> + 'a {
        self.patterns
            .iter()
            .filter(move |p| p.entity_type == entity_type)
    }

    /// Number of compiled patterns
    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    /// Whether the registry holds no patterns
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Run every pattern over the indexed text
    ///
    /// Emits one detection per match with character offsets. `confidence`
    /// overrides the per-group confidence when set.
    pub fn find_all(
        &self,
        index: &TextIndex<'_>,
        confidence: Option<f64>,
        source: &str,
    ) -> Vec<Detection> {
        let mut detections = Vec::new();
        for pattern in &self.patterns {
            for matched in pattern.regex.find_iter(index.text()) {
                let (start, end) = index.char_range(matched.start(), matched.end());
                if start >= end {
                    continue;
                }
                detections.push(
                    Detection::new(
                        pattern.entity_type.clone(),
                        start,
                        end,
                        matched.as_str(),
                        confidence.unwrap_or(pattern.confidence),
                    )
                    .with_source(source),
                );
            }
        }
        detections
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_embedded_libraries() {
        let statistical = PatternRegistry::statistical_patterns().unwrap();
        assert_eq!(statistical.len(), 8);

        let format = PatternRegistry::format_patterns().unwrap();
        assert_eq!(format.len(), 6);
        let names: Vec<&str> = format.all_patterns().iter().map(|p| p.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["email", "tax_id", "vat_number", "phone", "iban", "credit_card"]
        );
    }

    #[test]
    fn test_groups_keep_file_order() {
        let registry = PatternRegistry::statistical_patterns().unwrap();
        let names: Vec<&str> = registry.all_patterns().iter().map(|p| p.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "tax_id",
                "vat_number",
                "phone",
                "postal_code",
                "email",
                "person",
                "address",
                "date"
            ]
        );
    }

    #[test]
    fn test_tax_id_case_insensitive() {
        let registry = PatternRegistry::statistical_patterns().unwrap();
        let tax = registry.patterns_for_type("TAX_ID").next().unwrap();
        assert!(tax.regex.is_match("RSSMRA85M01H501Z"));
        assert!(tax.regex.is_match("rssmra85m01h501z"));
        assert!(!tax.regex.is_match("RSSMRA85"));
    }

    #[test]
    fn test_find_all_uses_char_offsets() {
        let registry = PatternRegistry::format_patterns().unwrap();
        let index = TextIndex::new("Città: mario@test.it");
        let detections = registry.find_all(&index, None, "patterns");
        let email = detections
            .iter()
            .find(|d| d.entity_type == "EMAIL")
            .unwrap();
        assert_eq!(email.start, 7);
        assert_eq!(email.end, 20);
        assert_eq!(email.confidence, 0.98);
        assert_eq!(email.source.as_deref(), Some("patterns"));
    }

    #[test]
    fn test_confidence_override() {
        let registry = PatternRegistry::format_patterns().unwrap();
        let index = TextIndex::new("IBAN IT60X0542811101000000123456");
        let detections = registry.find_all(&index, Some(0.5), "patterns");
        assert!(!detections.is_empty());
        assert!(detections.iter().all(|d| d.confidence == 0.5));
    }

    #[test]
    fn test_invalid_library_rejected() {
        let bad_regex = r#"
[[patterns]]
name = "broken"
category = "X"
confidence = 0.9
patterns = ['([a-z']
"#;
        assert!(PatternRegistry::from_toml(bad_regex).is_err());

        let bad_confidence = r#"
[[patterns]]
name = "x"
category = "X"
confidence = 1.5
patterns = ['x']
"#;
        assert!(PatternRegistry::from_toml(bad_confidence).is_err());

        let duplicate = r#"
[[patterns]]
name = "x"
category = "X"
confidence = 0.5
patterns = ['x']

[[patterns]]
name = "x"
category = "Y"
confidence = 0.5
patterns = ['y']
"#;
        assert!(PatternRegistry::from_toml(duplicate).is_err());
    }
}
