//! Detector weights and feedback-driven adaptation

use super::EnsembleDetector;
use crate::anonymization::detector::PiiDetector;
use crate::anonymization::models::Detection;
use crate::domain::errors::DetectorFailure;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Weight used for detectors without an explicit entry
pub const DEFAULT_WEIGHT: f64 = 1.0;

/// Lowest weight feedback can assign
pub const MIN_ADAPTIVE_WEIGHT: f64 = 0.5;

/// Highest weight feedback can assign
pub const MAX_ADAPTIVE_WEIGHT: f64 = 2.0;

/// Per-detector weights used by weighted confidence aggregation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightTable {
    weights: BTreeMap<String, f64>,
}

impl Default for WeightTable {
    /// Built-in weights: learned models count more than fixed patterns
    fn default() -> Self {
        Self {
            weights: BTreeMap::from([
                ("PatternMatcher".to_string(), 0.8),
                ("StatisticalDetector".to_string(), 1.0),
                ("NeuralDetector".to_string(), 1.2),
            ]),
        }
    }
}

impl WeightTable {
    /// Table with no explicit entries
    pub fn empty() -> Self {
        Self {
            weights: BTreeMap::new(),
        }
    }

    /// Weight for `detector`, [`DEFAULT_WEIGHT`] when unknown
    pub fn get(&self, detector: &str) -> f64 {
        self.weights.get(detector).copied().unwrap_or(DEFAULT_WEIGHT)
    }

    pub fn set(&mut self, detector: impl Into<String>, weight: f64) {
        self.weights.insert(detector.into(), weight);
    }

    /// Apply overrides on top of this table
    pub fn with_overrides(mut self, overrides: &BTreeMap<String, f64>) -> Self {
        for (name, weight) in overrides {
            self.set(name.clone(), *weight);
        }
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.weights.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

/// How accumulated feedback turns into an accuracy estimate
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum DecayPolicy {
    /// Lifetime hit ratio
    #[default]
    Cumulative,
    /// Exponential moving average of outcomes, newest weighted by `alpha`
    ExponentialMovingAverage { alpha: f64 },
}

/// Feedback counters for one detector
#[derive(Debug, Clone, Copy, PartialEq, Default)]
struct FeedbackCounter {
    hits: u64,
    misses: u64,
    /// Running average under [`DecayPolicy::ExponentialMovingAverage`]
    average: Option<f64>,
}

impl FeedbackCounter {
    fn total(&self) -> u64 {
        self.hits + self.misses
    }
}

/// Per-detector performance snapshot
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PerformanceStats {
    pub hits: u64,
    pub misses: u64,
    pub total: u64,
    pub accuracy: f64,
    pub weight: f64,
}

/// Feedback state for the adaptive ensemble
#[derive(Debug, Clone, PartialEq)]
pub struct FeedbackTracker {
    policy: DecayPolicy,
    min_feedback: u64,
    counters: BTreeMap<String, FeedbackCounter>,
}

impl Default for FeedbackTracker {
    fn default() -> Self {
        Self::new(DecayPolicy::Cumulative, 10)
    }
}

impl FeedbackTracker {
    /// Create a tracker
    ///
    /// Weights adjust for a detector once its feedback count exceeds
    /// `min_feedback`. An EMA `alpha` is clamped to `(0, 1]`.
    pub fn new(policy: DecayPolicy, min_feedback: u64) -> Self {
        let policy = match policy {
            DecayPolicy::ExponentialMovingAverage { alpha } => {
                DecayPolicy::ExponentialMovingAverage {
                    alpha: alpha.clamp(f64::EPSILON, 1.0),
                }
            }
            other => other,
        };
        Self {
            policy,
            min_feedback,
            counters: BTreeMap::new(),
        }
    }

    pub fn policy(&self) -> DecayPolicy {
        self.policy
    }

    /// Record one outcome for `detector`
    pub fn record(&mut self, detector: &str, is_correct: bool) {
        let counter = self.counters.entry(detector.to_string()).or_default();
        if is_correct {
            counter.hits += 1;
        } else {
            counter.misses += 1;
        }

        if let DecayPolicy::ExponentialMovingAverage { alpha } = self.policy {
            let outcome = if is_correct { 1.0 } else { 0.0 };
            counter.average = Some(match counter.average {
                Some(previous) => alpha * outcome + (1.0 - alpha) * previous,
                None => outcome,
            });
        }
    }

    /// Accuracy estimate in `[0, 1]`, 0.0 without feedback
    pub fn accuracy(&self, detector: &str) -> f64 {
        let Some(counter) = self.counters.get(detector) else {
            return 0.0;
        };
        match self.policy {
            DecayPolicy::Cumulative if counter.total() > 0 => {
                counter.hits as f64 / counter.total() as f64
            }
            DecayPolicy::Cumulative => 0.0,
            DecayPolicy::ExponentialMovingAverage { .. } => counter.average.unwrap_or(0.0),
        }
    }

    /// Total feedback events for `detector`
    pub fn total(&self, detector: &str) -> u64 {
        self.counters.get(detector).map_or(0, FeedbackCounter::total)
    }

    /// Adapted weight for `detector`, if it has enough feedback
    pub fn weight_for(&self, detector: &str) -> Option<f64> {
        (self.total(detector) > self.min_feedback).then(|| {
            let weight = MIN_ADAPTIVE_WEIGHT
                + (MAX_ADAPTIVE_WEIGHT - MIN_ADAPTIVE_WEIGHT) * self.accuracy(detector);
            weight.clamp(MIN_ADAPTIVE_WEIGHT, MAX_ADAPTIVE_WEIGHT)
        })
    }

    /// Detectors with recorded feedback
    pub fn detectors(&self) -> impl Iterator<Item = &str> {
        self.counters.keys().map(String::as_str)
    }

    /// Forget all feedback
    pub fn reset(&mut self) {
        self.counters.clear();
    }

    fn snapshot(&self, detector: &str, weight: f64) -> PerformanceStats {
        let counter = self.counters.get(detector).copied().unwrap_or_default();
        PerformanceStats {
            hits: counter.hits,
            misses: counter.misses,
            total: counter.total(),
            accuracy: self.accuracy(detector),
            weight,
        }
    }
}

/// Ensemble whose weights follow reported detection quality
///
/// Feedback and detection must be serialized by the caller; `report_feedback`
/// takes `&mut self` so the borrow checker enforces it for a single owner.
pub struct AdaptiveEnsemble {
    ensemble: EnsembleDetector,
    tracker: FeedbackTracker,
    initial_weights: WeightTable,
}

impl AdaptiveEnsemble {
    /// Wrap an ensemble with a cumulative tracker
    pub fn new(ensemble: EnsembleDetector) -> Self {
        Self::with_tracker(ensemble, FeedbackTracker::default())
    }

    /// Wrap an ensemble with an explicit tracker
    pub fn with_tracker(ensemble: EnsembleDetector, tracker: FeedbackTracker) -> Self {
        let initial_weights = ensemble.weights().clone();
        let mut adaptive = Self {
            ensemble,
            tracker,
            initial_weights,
        };
        adaptive.adjust_weights();
        adaptive
    }

    pub fn ensemble(&self) -> &EnsembleDetector {
        &self.ensemble
    }

    pub fn tracker(&self) -> &FeedbackTracker {
        &self.tracker
    }

    /// Record whether `detection` was correct for each contributing detector
    pub fn report_feedback(&mut self, detection: &Detection, is_correct: bool) {
        let mut seen: Vec<&str> = Vec::new();
        for name in &detection.detectors {
            if !seen.contains(&name.as_str()) {
                seen.push(name);
                self.tracker.record(name, is_correct);
            }
        }
        self.adjust_weights();
    }

    fn adjust_weights(&mut self) {
        let updates: Vec<(String, f64, f64)> = self
            .tracker
            .detectors()
            .filter_map(|name| {
                self.tracker
                    .weight_for(name)
                    .map(|w| (name.to_string(), w, self.tracker.accuracy(name)))
            })
            .collect();

        for (name, weight, accuracy) in updates {
            if (self.ensemble.weights().get(&name) - weight).abs() > f64::EPSILON {
                tracing::info!(
                    detector = %name,
                    accuracy,
                    new_weight = weight,
                    total_feedback = self.tracker.total(&name),
                    "Adjusted detector weight"
                );
            }
            self.ensemble.set_detector_weight(&name, weight);
        }
    }

    /// Hits, misses, accuracy and current weight per detector with feedback
    pub fn performance_stats(&self) -> BTreeMap<String, PerformanceStats> {
        self.tracker
            .detectors()
            .map(|name| {
                (
                    name.to_string(),
                    self.tracker.snapshot(name, self.ensemble.weights().get(name)),
                )
            })
            .collect()
    }

    /// Forget all feedback and restore the weights the ensemble started with
    pub fn reset(&mut self) {
        self.tracker.reset();
        self.ensemble.replace_weights(self.initial_weights.clone());
        tracing::info!("Adaptive ensemble feedback reset");
    }
}

impl PiiDetector for AdaptiveEnsemble {
    fn name(&self) -> &str {
        "AdaptiveEnsembleDetector"
    }

    fn supported_languages(&self) -> Vec<String> {
        self.ensemble.supported_languages()
    }

    fn detect(&self, text: &str, language: &str) -> Result<Vec<Detection>, DetectorFailure> {
        self.ensemble.detect(text, language)
    }
}
