//! Integration tests for multi-detector ensemble resolution

use shroud::anonymization::detector::{CustomPattern, PatternMatcher, PiiDetector};
use shroud::anonymization::ensemble::{
    AdaptiveEnsemble, DecayPolicy, EnsembleDetector, FeedbackTracker, VotingStrategy, WeightTable,
};
use shroud::anonymization::Detection;
use shroud::domain::DetectorFailure;
use test_case::test_case;

/// Test double returning a fixed detection list
struct StubDetector {
    name: &'static str,
    detections: Vec<Detection>,
}

impl StubDetector {
    fn boxed(name: &'static str, detections: Vec<Detection>) -> Box<dyn PiiDetector> {
        Box::new(Self { name, detections })
    }
}

impl PiiDetector for StubDetector {
    fn name(&self) -> &str {
        self.name
    }

    fn supported_languages(&self) -> Vec<String> {
        vec!["*".to_string()]
    }

    fn detect(&self, _text: &str, _language: &str) -> Result<Vec<Detection>, DetectorFailure> {
        Ok(self.detections.clone())
    }
}

/// Test double that always fails
struct FailingDetector;

impl PiiDetector for FailingDetector {
    fn name(&self) -> &str {
        "FailingDetector"
    }

    fn supported_languages(&self) -> Vec<String> {
        vec!["*".to_string()]
    }

    fn detect(&self, _text: &str, _language: &str) -> Result<Vec<Detection>, DetectorFailure> {
        Err(DetectorFailure::Unavailable("backend offline".to_string()))
    }
}

const EMAIL_TEXT: &str = "Email: test@example.com";

fn email(start: usize, end: usize, confidence: f64) -> Detection {
    let text: String = EMAIL_TEXT.chars().skip(start).take(end - start).collect();
    Detection::new("EMAIL", start, end, text, confidence)
}

fn two_member_ensemble(strategy: VotingStrategy) -> EnsembleDetector {
    EnsembleDetector::builder()
        .with_weights(WeightTable::empty())
        .with_weighted_detector(StubDetector::boxed("A", vec![email(7, 23, 0.8)]), 1.0)
        .with_weighted_detector(StubDetector::boxed("B", vec![email(7, 23, 0.95)]), 1.2)
        .with_voting_strategy(strategy)
        .build()
        .unwrap()
}

#[test]
fn test_single_pattern_detector_finds_email() {
    let pattern = CustomPattern::new(
        "EMAIL",
        r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b",
        0.95,
    )
    .unwrap();
    let ensemble = EnsembleDetector::builder()
        .with_detector(Box::new(PatternMatcher::with_patterns([pattern])))
        .build()
        .unwrap();

    let detections = ensemble.detect("Contact john@test.com", "en").unwrap();

    assert_eq!(detections.len(), 1);
    assert_eq!(detections[0].entity_type, "EMAIL");
    assert_eq!(detections[0].text, "john@test.com");
    assert_eq!(detections[0].start, 8);
    assert_eq!(detections[0].end, 21);
    assert!((detections[0].confidence - 0.95).abs() < 1e-9);
}

#[test]
fn test_weighted_confidence_aggregation() {
    let ensemble = two_member_ensemble(VotingStrategy::Weighted);
    let results = ensemble.detect_detailed(EMAIL_TEXT, "en");

    assert_eq!(results.len(), 1);
    let expected = (0.8 * 1.0 + 0.95 * 1.2) / (1.0 + 1.2);
    assert!((results[0].confidence - expected).abs() < 1e-9);
    assert!((results[0].confidence - 0.882).abs() < 1e-3);
    assert_eq!(results[0].votes, 2);
    assert_eq!(results[0].detectors, vec!["A", "B"]);
}

#[test]
fn test_unweighted_strategies_use_plain_mean() {
    let ensemble = two_member_ensemble(VotingStrategy::Majority);
    let results = ensemble.detect_detailed(EMAIL_TEXT, "en");

    assert_eq!(results.len(), 1);
    assert!((results[0].confidence - 0.875).abs() < 1e-9);
}

#[test]
fn test_min_votes_discards_single_detector_span() {
    let ensemble = EnsembleDetector::builder()
        .with_detector(StubDetector::boxed("A", vec![email(7, 23, 0.9)]))
        .with_detector(StubDetector::boxed("B", Vec::new()))
        .with_min_votes(2)
        .build()
        .unwrap();

    assert!(ensemble.detect(EMAIL_TEXT, "en").unwrap().is_empty());
}

#[test]
fn test_min_confidence_discards_weak_group() {
    let ensemble = EnsembleDetector::builder()
        .with_detector(StubDetector::boxed("A", vec![email(7, 23, 0.4)]))
        .with_min_confidence(0.5)
        .build()
        .unwrap();

    assert!(ensemble.detect(EMAIL_TEXT, "en").unwrap().is_empty());
}

#[test]
fn test_failing_member_degrades_gracefully() {
    let ensemble = EnsembleDetector::builder()
        .with_detector(Box::new(FailingDetector))
        .with_detector(StubDetector::boxed("A", vec![email(7, 23, 0.9)]))
        .build()
        .unwrap();

    let detections = ensemble.detect(EMAIL_TEXT, "en").unwrap();
    assert_eq!(detections.len(), 1);
    assert_eq!(detections[0].detectors, vec!["A"]);

    let stats = ensemble.detector_stats(EMAIL_TEXT, "en");
    assert_eq!(stats.total_detections, 1);
    assert!(stats.detectors[0].error.is_some());
    assert!(stats.detectors[1].error.is_none());
}

#[test]
fn test_merged_text_matches_union_span() {
    // A sees "test@example", B sees "example.com"
    let ensemble = EnsembleDetector::builder()
        .with_detector(StubDetector::boxed("A", vec![email(7, 19, 0.9)]))
        .with_detector(StubDetector::boxed("B", vec![email(12, 23, 0.9)]))
        .build()
        .unwrap();

    let detections = ensemble.detect(EMAIL_TEXT, "en").unwrap();
    assert_eq!(detections.len(), 1);
    assert_eq!(detections[0].start, 7);
    assert_eq!(detections[0].end, 23);
    assert_eq!(detections[0].text, "test@example.com");
}

#[test]
fn test_type_tie_goes_to_first_seen() {
    let text = "Call 0612345678";
    let ensemble = EnsembleDetector::builder()
        .with_detector(StubDetector::boxed(
            "A",
            vec![Detection::new("PHONE", 5, 15, "0612345678", 0.9)],
        ))
        .with_detector(StubDetector::boxed(
            "B",
            vec![Detection::new("VAT_NUMBER", 6, 15, "612345678", 0.9)],
        ))
        .build()
        .unwrap();

    let detections = ensemble.detect(text, "en").unwrap();
    assert_eq!(detections.len(), 1);
    assert_eq!(detections[0].entity_type, "PHONE");
    // Only the winning type's votes shape the span
    assert_eq!((detections[0].start, detections[0].end), (5, 15));
}

#[test]
fn test_disjoint_spans_resolve_independently() {
    let text = "a@b.io and c@d.io";
    let ensemble = EnsembleDetector::builder()
        .with_detector(StubDetector::boxed(
            "A",
            vec![
                Detection::new("EMAIL", 0, 6, "a@b.io", 0.9),
                Detection::new("EMAIL", 11, 17, "c@d.io", 0.9),
            ],
        ))
        .build()
        .unwrap();

    let detections = ensemble.detect(text, "en").unwrap();
    assert_eq!(detections.len(), 2);
    assert_eq!(detections[0].text, "a@b.io");
    assert_eq!(detections[1].text, "c@d.io");
}

#[test_case(VotingStrategy::Unanimous, 1, 2 => false ; "unanimous needs every member")]
#[test_case(VotingStrategy::Unanimous, 2, 2 => true ; "unanimous all agree")]
#[test_case(VotingStrategy::Majority, 1, 2 => false ; "majority half is not enough")]
#[test_case(VotingStrategy::Majority, 2, 3 => true ; "majority two of three")]
#[test_case(VotingStrategy::Any, 1, 3 => true ; "any single vote")]
#[test_case(VotingStrategy::Weighted, 1, 3 => true ; "weighted accepts every group")]
#[test_case(VotingStrategy::Other("bogus".to_string()), 1, 3 => true ; "unknown strategy accepts")]
fn test_voting_strategy_acceptance(strategy: VotingStrategy, votes: usize, members: usize) -> bool {
    strategy.accepts(votes, members)
}

#[test_case("unanimous" => VotingStrategy::Unanimous ; "unanimous")]
#[test_case("MAJORITY" => VotingStrategy::Majority ; "uppercase majority")]
#[test_case(" any " => VotingStrategy::Any ; "padded any")]
#[test_case("weighted" => VotingStrategy::Weighted ; "weighted")]
#[test_case("plurality" => VotingStrategy::Other("plurality".to_string()) ; "unknown name kept")]
fn test_voting_strategy_parsing(name: &str) -> VotingStrategy {
    name.parse().unwrap()
}

#[test]
fn test_unanimous_rejects_partial_agreement() {
    let ensemble = EnsembleDetector::builder()
        .with_detector(StubDetector::boxed("A", vec![email(7, 23, 0.9)]))
        .with_detector(StubDetector::boxed("B", Vec::new()))
        .with_voting_strategy(VotingStrategy::Unanimous)
        .build()
        .unwrap();

    assert!(ensemble.detect(EMAIL_TEXT, "en").unwrap().is_empty());
}

#[test]
fn test_builder_rejects_invalid_settings() {
    assert!(EnsembleDetector::builder().build().is_err());
    assert!(EnsembleDetector::builder()
        .with_detector(StubDetector::boxed("A", Vec::new()))
        .with_min_votes(0)
        .build()
        .is_err());
    assert!(EnsembleDetector::builder()
        .with_detector(StubDetector::boxed("A", Vec::new()))
        .with_min_confidence(1.5)
        .build()
        .is_err());
}

#[test]
fn test_adaptive_weights_follow_feedback() {
    let ensemble = two_member_ensemble(VotingStrategy::Weighted);
    let mut adaptive =
        AdaptiveEnsemble::with_tracker(ensemble, FeedbackTracker::new(DecayPolicy::Cumulative, 2));

    let detection = email(7, 23, 0.9).with_detectors(vec!["A".to_string()]);
    for _ in 0..3 {
        adaptive.report_feedback(&detection, false);
    }

    // Three misses: accuracy 0, weight at the floor
    assert_eq!(adaptive.ensemble().weights().get("A"), 0.5);
    assert_eq!(adaptive.ensemble().weights().get("B"), 1.2);

    let stats = adaptive.performance_stats();
    assert_eq!(stats["A"].misses, 3);
    assert_eq!(stats["A"].accuracy, 0.0);
    assert!(!stats.contains_key("B"));

    let results = adaptive.ensemble().detect_detailed(EMAIL_TEXT, "en");
    let expected = (0.8 * 0.5 + 0.95 * 1.2) / (0.5 + 1.2);
    assert!((results[0].confidence - expected).abs() < 1e-9);

    adaptive.reset();
    assert_eq!(adaptive.ensemble().weights().get("A"), 1.0);
    assert!(adaptive.performance_stats().is_empty());
}

#[test]
fn test_adaptive_feedback_below_threshold_keeps_weights() {
    let ensemble = two_member_ensemble(VotingStrategy::Weighted);
    let mut adaptive = AdaptiveEnsemble::new(ensemble);

    let detection = email(7, 23, 0.9).with_detectors(vec!["B".to_string(), "B".to_string()]);
    for _ in 0..10 {
        adaptive.report_feedback(&detection, true);
    }

    // Duplicate names count once per report; ten events is not above the threshold
    assert_eq!(adaptive.tracker().total("B"), 10);
    assert_eq!(adaptive.ensemble().weights().get("B"), 1.2);

    adaptive.report_feedback(&detection, true);
    assert_eq!(adaptive.ensemble().weights().get("B"), 2.0);
}

#[test]
fn test_adaptive_ensemble_detects_like_inner_ensemble() {
    let adaptive = AdaptiveEnsemble::new(two_member_ensemble(VotingStrategy::Weighted));
    assert_eq!(adaptive.name(), "AdaptiveEnsembleDetector");

    let detections = adaptive.detect(EMAIL_TEXT, "en").unwrap();
    assert_eq!(detections.len(), 1);
    assert_eq!(detections[0].text, "test@example.com");
}
