//! Multi-detector ensemble
//!
//! Runs every member detector on the same text, flattens their detections
//! into votes, groups votes whose spans transitively overlap and decides one
//! entity per group:
//!
//! 1. the entity type with the most votes wins, ties going to the type seen
//!    first in the group's `(start, end)` order;
//! 2. groups below `min_votes` are dropped;
//! 3. the voting strategy gates acceptance against the member count;
//! 4. confidence is aggregated (weighted mean for `weighted`, plain mean
//!    otherwise) and groups below `min_confidence` are dropped;
//! 5. the emitted span is the union of the winning votes and its text is
//!    re-sliced from the input.
//!
//! A member that fails contributes no votes for that call.

pub mod weights;

pub use weights::{
    AdaptiveEnsemble, DecayPolicy, FeedbackTracker, PerformanceStats, WeightTable,
};

use crate::anonymization::detector::PiiDetector;
use crate::anonymization::models::Detection;
use crate::anonymization::spans::{resolve_groups, Span};
use crate::anonymization::text::TextIndex;
use crate::domain::errors::{DetectorFailure, ShroudError};
use crate::domain::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::time::Instant;

/// Policy for how many members must agree on a group
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(from = "String", into = "String")]
pub enum VotingStrategy {
    /// Every member must vote for the winning type
    Unanimous,
    /// More than half of the members must vote for the winning type
    Majority,
    /// One vote is enough
    Any,
    /// Accept every group; confidence is weighted by detector
    #[default]
    Weighted,
    /// Unrecognized name; accepts every group and logs a warning
    Other(String),
}

impl VotingStrategy {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Unanimous => "unanimous",
            Self::Majority => "majority",
            Self::Any => "any",
            Self::Weighted => "weighted",
            Self::Other(name) => name,
        }
    }

    /// Whether `votes` agreeing votes pass among `detector_count` members
    pub fn accepts(&self, votes: usize, detector_count: usize) -> bool {
        match self {
            Self::Unanimous => votes == detector_count,
            Self::Majority => votes * 2 > detector_count,
            Self::Any => votes >= 1,
            Self::Weighted => true,
            Self::Other(name) => {
                tracing::warn!(strategy = %name, "Unknown voting strategy, accepting group");
                true
            }
        }
    }

    /// Aggregate confidence over the winning votes
    fn aggregate(&self, votes: &[&DetectionVote], weights: &WeightTable) -> f64 {
        if votes.is_empty() {
            return 0.0;
        }

        match self {
            Self::Weighted => {
                let (weighted_sum, total_weight) =
                    votes.iter().fold((0.0, 0.0), |(sum, total), vote| {
                        let weight = weights.get(&vote.detector_name);
                        (sum + vote.confidence * weight, total + weight)
                    });
                if total_weight > 0.0 {
                    weighted_sum / total_weight
                } else {
                    0.0
                }
            }
            _ => votes.iter().map(|v| v.confidence).sum::<f64>() / votes.len() as f64,
        }
    }
}

impl From<String> for VotingStrategy {
    fn from(name: String) -> Self {
        match name.trim().to_lowercase().as_str() {
            "unanimous" => Self::Unanimous,
            "majority" => Self::Majority,
            "any" => Self::Any,
            "weighted" => Self::Weighted,
            _ => Self::Other(name),
        }
    }
}

impl From<VotingStrategy> for String {
    fn from(strategy: VotingStrategy) -> Self {
        strategy.as_str().to_string()
    }
}

impl FromStr for VotingStrategy {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self::from(s.to_string()))
    }
}

impl fmt::Display for VotingStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One member's opinion before resolution
#[derive(Debug, Clone)]
pub(crate) struct DetectionVote {
    detector_name: String,
    entity_type: String,
    start: usize,
    end: usize,
    confidence: f64,
}

impl Span for DetectionVote {
    fn start(&self) -> usize {
        self.start
    }

    fn end(&self) -> usize {
        self.end
    }
}

/// Resolved outcome of one overlap group
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnsembleResult {
    pub text: String,
    pub entity_type: String,
    pub start: usize,
    pub end: usize,
    pub confidence: f64,
    pub votes: usize,
    pub detectors: Vec<String>,
}

impl From<EnsembleResult> for Detection {
    fn from(result: EnsembleResult) -> Self {
        Detection::new(
            result.entity_type,
            result.start,
            result.end,
            result.text,
            result.confidence,
        )
        .with_detectors(result.detectors)
    }
}

/// Detection count and weight for one member
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetectorStat {
    pub name: String,
    pub detections: usize,
    pub weight: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Per-member statistics for one text
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetectorStats {
    pub detectors: Vec<DetectorStat>,
    pub total_detections: usize,
}

/// Ensemble of PII detectors
pub struct EnsembleDetector {
    detectors: Vec<Box<dyn PiiDetector>>,
    weights: WeightTable,
    strategy: VotingStrategy,
    min_confidence: f64,
    min_votes: usize,
}

impl fmt::Debug for EnsembleDetector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnsembleDetector")
            .field("detectors", &self.detector_names())
            .field("weights", &self.weights)
            .field("strategy", &self.strategy)
            .field("min_confidence", &self.min_confidence)
            .field("min_votes", &self.min_votes)
            .finish()
    }
}

impl EnsembleDetector {
    /// Start building an ensemble
    pub fn builder() -> EnsembleBuilder {
        EnsembleBuilder::default()
    }

    pub fn detector_names(&self) -> Vec<&str> {
        self.detectors.iter().map(|d| d.name()).collect()
    }

    pub fn detector_count(&self) -> usize {
        self.detectors.len()
    }

    pub fn voting_strategy(&self) -> &VotingStrategy {
        &self.strategy
    }

    pub fn min_confidence(&self) -> f64 {
        self.min_confidence
    }

    pub fn min_votes(&self) -> usize {
        self.min_votes
    }

    pub fn weights(&self) -> &WeightTable {
        &self.weights
    }

    /// Set the weight used for `detector` in weighted aggregation
    pub fn set_detector_weight(&mut self, detector: &str, weight: f64) {
        self.weights.set(detector, weight);
        tracing::debug!(detector, weight, "Set detector weight");
    }

    pub(crate) fn replace_weights(&mut self, weights: WeightTable) {
        self.weights = weights;
    }

    /// Run each member and count its detections
    pub fn detector_stats(&self, text: &str, language: &str) -> DetectorStats {
        let mut detectors = Vec::with_capacity(self.detectors.len());
        let mut total_detections = 0;

        for detector in &self.detectors {
            let (detections, error) = match detector.detect(text, language) {
                Ok(found) => (found.len(), None),
                Err(failure) => {
                    crate::log_detector_failure!(detector.name(), failure);
                    (0, Some(failure.to_string()))
                }
            };
            total_detections += detections;
            detectors.push(DetectorStat {
                name: detector.name().to_string(),
                detections,
                weight: self.weights.get(detector.name()),
                error,
            });
        }

        DetectorStats {
            detectors,
            total_detections,
        }
    }

    fn collect_votes(&self, index: &TextIndex<'_>, language: &str) -> Vec<DetectionVote> {
        let len = index.char_len();
        let mut votes = Vec::new();

        for detector in &self.detectors {
            match detector.detect(index.text(), language) {
                Ok(detections) => {
                    votes.extend(
                        detections
                            .into_iter()
                            .filter(|d| d.start < d.end && d.end <= len)
                            .map(|d| DetectionVote {
                                detector_name: detector.name().to_string(),
                                entity_type: d.entity_type,
                                start: d.start,
                                end: d.end,
                                confidence: d.confidence,
                            }),
                    );
                }
                Err(failure) => {
                    crate::log_detector_failure!(detector.name(), failure);
                }
            }
        }

        votes
    }

    fn decide(&self, index: &TextIndex<'_>, group: Vec<DetectionVote>) -> Option<EnsembleResult> {
        // Vote counts per type in first-seen order
        let mut tally: Vec<(&str, usize)> = Vec::new();
        for vote in &group {
            match tally.iter_mut().find(|(t, _)| *t == vote.entity_type) {
                Some((_, count)) => *count += 1,
                None => tally.push((vote.entity_type.as_str(), 1)),
            }
        }

        let (winner, count) = tally
            .iter()
            .copied()
            .fold(None::<(&str, usize)>, |best, (t, c)| match best {
                Some((_, bc)) if bc >= c => best,
                _ => Some((t, c)),
            })?;

        if count < self.min_votes {
            return None;
        }
        if !self.strategy.accepts(count, self.detectors.len()) {
            return None;
        }

        let winning: Vec<&DetectionVote> =
            group.iter().filter(|v| v.entity_type == winner).collect();

        let confidence = self.strategy.aggregate(&winning, &self.weights);
        if confidence < self.min_confidence {
            return None;
        }

        let start = winning.iter().map(|v| v.start).min()?;
        let end = winning.iter().map(|v| v.end).max()?;

        Some(EnsembleResult {
            text: index.slice(start, end).to_string(),
            entity_type: winner.to_string(),
            start,
            end,
            confidence,
            votes: winning.len(),
            detectors: winning.iter().map(|v| v.detector_name.clone()).collect(),
        })
    }

    /// Resolve detections with full voting detail
    pub fn detect_detailed(&self, text: &str, language: &str) -> Vec<EnsembleResult> {
        let started = Instant::now();
        let index = TextIndex::new(text);

        let votes = self.collect_votes(&index, language);
        let total_votes = votes.len();
        let results = resolve_groups(votes, |group| self.decide(&index, group));

        tracing::debug!(
            total_votes,
            detectors = self.detectors.len(),
            strategy = %self.strategy,
            "Ensemble votes resolved"
        );
        crate::log_detection_complete!("EnsembleDetector", results.len(), started.elapsed());

        results
    }
}

impl PiiDetector for EnsembleDetector {
    fn name(&self) -> &str {
        "EnsembleDetector"
    }

    fn supported_languages(&self) -> Vec<String> {
        let mut languages: Vec<String> = Vec::new();
        for detector in &self.detectors {
            for language in detector.supported_languages() {
                if !languages.contains(&language) {
                    languages.push(language);
                }
            }
        }
        languages
    }

    fn detect(&self, text: &str, language: &str) -> std::result::Result<Vec<Detection>, DetectorFailure> {
        Ok(self
            .detect_detailed(text, language)
            .into_iter()
            .map(Detection::from)
            .collect())
    }
}

/// Builder for [`EnsembleDetector`]
pub struct EnsembleBuilder {
    detectors: Vec<Box<dyn PiiDetector>>,
    weights: WeightTable,
    strategy: VotingStrategy,
    min_confidence: f64,
    min_votes: usize,
}

impl Default for EnsembleBuilder {
    fn default() -> Self {
        Self {
            detectors: Vec::new(),
            weights: WeightTable::default(),
            strategy: VotingStrategy::default(),
            min_confidence: 0.5,
            min_votes: 1,
        }
    }
}

impl EnsembleBuilder {
    /// Add a member detector
    pub fn with_detector(mut self, detector: Box<dyn PiiDetector>) -> Self {
        self.detectors.push(detector);
        self
    }

    /// Add a member detector with an explicit weight
    pub fn with_weighted_detector(mut self, detector: Box<dyn PiiDetector>, weight: f64) -> Self {
        self.weights.set(detector.name(), weight);
        self.detectors.push(detector);
        self
    }

    pub fn with_weights(mut self, weights: WeightTable) -> Self {
        self.weights = weights;
        self
    }

    pub fn with_weight_overrides(mut self, overrides: &BTreeMap<String, f64>) -> Self {
        self.weights = self.weights.with_overrides(overrides);
        self
    }

    pub fn with_voting_strategy(mut self, strategy: VotingStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_min_confidence(mut self, min_confidence: f64) -> Self {
        self.min_confidence = min_confidence;
        self
    }

    pub fn with_min_votes(mut self, min_votes: usize) -> Self {
        self.min_votes = min_votes;
        self
    }

    /// Validate and build
    pub fn build(self) -> Result<EnsembleDetector> {
        if self.detectors.is_empty() {
            return Err(ShroudError::Configuration(
                "At least one detector must be configured for the ensemble".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.min_confidence) {
            return Err(ShroudError::Configuration(format!(
                "min_confidence must be between 0.0 and 1.0, got {}",
                self.min_confidence
            )));
        }
        if self.min_votes == 0 {
            return Err(ShroudError::Configuration(
                "min_votes must be at least 1".to_string(),
            ));
        }

        let ensemble = EnsembleDetector {
            detectors: self.detectors,
            weights: self.weights,
            strategy: self.strategy,
            min_confidence: self.min_confidence,
            min_votes: self.min_votes,
        };

        tracing::info!(
            detectors = ?ensemble.detector_names(),
            strategy = %ensemble.strategy,
            min_confidence = ensemble.min_confidence,
            min_votes = ensemble.min_votes,
            "Ensemble detector initialized"
        );

        Ok(ensemble)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed {
        name: &'static str,
        detections: Vec<Detection>,
    }

    impl PiiDetector for Fixed {
        fn name(&self) -> &str {
            self.name
        }

        fn supported_languages(&self) -> Vec<String> {
            vec!["*".to_string()]
        }

        fn detect(
            &self,
            _text: &str,
            _language: &str,
        ) -> std::result::Result<Vec<Detection>, DetectorFailure> {
            Ok(self.detections.clone())
        }
    }

    fn fixed(name: &'static str, detections: Vec<Detection>) -> Box<dyn PiiDetector> {
        Box::new(Fixed { name, detections })
    }

    #[test]
    fn test_strategy_parsing() {
        assert_eq!(VotingStrategy::from("Majority".to_string()), VotingStrategy::Majority);
        assert_eq!(
            "plurality".parse::<VotingStrategy>().unwrap(),
            VotingStrategy::Other("plurality".to_string())
        );
        let json = serde_json::to_string(&VotingStrategy::Unanimous).unwrap();
        assert_eq!(json, "\"unanimous\"");
    }

    #[test]
    fn test_strategy_acceptance() {
        assert!(VotingStrategy::Unanimous.accepts(3, 3));
        assert!(!VotingStrategy::Unanimous.accepts(2, 3));
        assert!(VotingStrategy::Majority.accepts(2, 3));
        assert!(!VotingStrategy::Majority.accepts(1, 2));
        assert!(VotingStrategy::Any.accepts(1, 5));
        assert!(VotingStrategy::Weighted.accepts(1, 5));
    }

    #[test]
    fn test_builder_validation() {
        assert!(EnsembleDetector::builder().build().is_err());
        assert!(EnsembleDetector::builder()
            .with_detector(fixed("A", vec![]))
            .with_min_votes(0)
            .build()
            .is_err());
        assert!(EnsembleDetector::builder()
            .with_detector(fixed("A", vec![]))
            .with_min_confidence(1.2)
            .build()
            .is_err());
    }

    #[test]
    fn test_tie_break_prefers_first_seen_type() {
        let text = "Mario Rossi";
        let ensemble = EnsembleDetector::builder()
            .with_detector(fixed("A", vec![Detection::new("PERSON", 0, 11, text, 0.9)]))
            .with_detector(fixed("B", vec![Detection::new("ORGANIZATION", 0, 11, text, 0.9)]))
            .with_voting_strategy(VotingStrategy::Any)
            .build()
            .unwrap();

        let results = ensemble.detect_detailed(text, "it");
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].entity_type, "PERSON");
        assert_eq!(results[0].votes, 1);
    }

    #[test]
    fn test_invalid_votes_are_ignored() {
        let ensemble = EnsembleDetector::builder()
            .with_detector(fixed(
                "A",
                vec![
                    Detection::new("EMAIL", 5, 3, "", 0.9),
                    Detection::new("EMAIL", 0, 99, "", 0.9),
                ],
            ))
            .build()
            .unwrap();
        assert!(ensemble.detect("short", "en").unwrap().is_empty());
    }

    #[test]
    fn test_detector_stats() {
        let ensemble = EnsembleDetector::builder()
            .with_detector(fixed("PatternMatcher", vec![Detection::new("X", 0, 1, "a", 0.9)]))
            .with_detector(fixed("Other", vec![]))
            .build()
            .unwrap();
        let stats = ensemble.detector_stats("a", "en");
        assert_eq!(stats.total_detections, 1);
        assert_eq!(stats.detectors[0].weight, 0.8);
        assert_eq!(stats.detectors[1].weight, 1.0);
    }
}
