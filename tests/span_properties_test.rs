//! Property tests for span resolution and anonymization invariants

use proptest::prelude::*;
use shroud::anonymization::anonymizer::{Anonymizer, SuppressStrategy};
use shroud::anonymization::detector::PiiDetector;
use shroud::anonymization::ensemble::{
    DecayPolicy, EnsembleDetector, FeedbackTracker, VotingStrategy,
};
use shroud::anonymization::spans::{group_overlapping, spans_overlap, Span};
use shroud::anonymization::Detection;
use shroud::domain::DetectorFailure;
use std::collections::BTreeSet;

const TEXT_LEN: usize = 40;
const ENTITY_TYPES: [&str; 3] = ["EMAIL", "PERSON", "PHONE"];

struct StubDetector {
    name: String,
    detections: Vec<Detection>,
}

impl PiiDetector for StubDetector {
    fn name(&self) -> &str {
        &self.name
    }

    fn supported_languages(&self) -> Vec<String> {
        vec!["*".to_string()]
    }

    fn detect(&self, _text: &str, _language: &str) -> Result<Vec<Detection>, DetectorFailure> {
        Ok(self.detections.clone())
    }
}

#[derive(Debug, Clone)]
struct Range(usize, usize);

impl Span for Range {
    fn start(&self) -> usize {
        self.0
    }

    fn end(&self) -> usize {
        self.1
    }
}

fn detection_strategy() -> impl Strategy<Value = Detection> {
    (0..TEXT_LEN - 1, 1..10usize, 0..ENTITY_TYPES.len(), 0.0..=1.0f64).prop_map(
        |(start, len, kind, confidence)| {
            let end = (start + len).min(TEXT_LEN);
            Detection::new(ENTITY_TYPES[kind], start, end, "", confidence)
        },
    )
}

fn member_strategy() -> impl Strategy<Value = Vec<Vec<Detection>>> {
    prop::collection::vec(prop::collection::vec(detection_strategy(), 0..6), 1..4)
}

fn build(members: &[Vec<Detection>], strategy: VotingStrategy) -> EnsembleDetector {
    let mut builder = EnsembleDetector::builder()
        .with_voting_strategy(strategy)
        .with_min_confidence(0.0);
    for (i, detections) in members.iter().enumerate() {
        builder = builder.with_detector(Box::new(StubDetector {
            name: format!("D{i}"),
            detections: detections.clone(),
        }));
    }
    builder.build().unwrap()
}

fn keys(detections: &[Detection]) -> BTreeSet<(usize, usize, String)> {
    detections
        .iter()
        .map(|d| (d.start, d.end, d.entity_type.clone()))
        .collect()
}

proptest! {
    #[test]
    fn groups_are_disjoint_and_cover_every_span(
        ranges in prop::collection::vec((0..50usize, 1..10usize), 0..20)
    ) {
        let items: Vec<Range> = ranges.iter().map(|&(s, l)| Range(s, s + l)).collect();
        let count = items.len();
        let groups = group_overlapping(items);

        prop_assert_eq!(groups.iter().map(Vec::len).sum::<usize>(), count);

        let bounds: Vec<(usize, usize)> = groups
            .iter()
            .map(|g| {
                let start = g.iter().map(|r| r.0).min().unwrap();
                let end = g.iter().map(|r| r.1).max().unwrap();
                (start, end)
            })
            .collect();
        for pair in bounds.windows(2) {
            prop_assert!(!spans_overlap(pair[0].0, pair[0].1, pair[1].0, pair[1].1));
            prop_assert!(pair[0].1 <= pair[1].0);
        }
    }

    #[test]
    fn ensemble_output_never_overlaps(
        text in "[a-z ]{40}",
        members in member_strategy()
    ) {
        let ensemble = build(&members, VotingStrategy::Weighted);
        let detections = ensemble.detect(&text, "en").unwrap();

        for pair in detections.windows(2) {
            prop_assert!(pair[0].end <= pair[1].start);
        }
        for detection in &detections {
            let slice: String = text
                .chars()
                .skip(detection.start)
                .take(detection.end - detection.start)
                .collect();
            prop_assert_eq!(&detection.text, &slice);
            prop_assert!((0.0..=1.0).contains(&detection.confidence));
        }
    }

    #[test]
    fn stricter_voting_yields_subset(
        text in "[a-z ]{40}",
        members in member_strategy()
    ) {
        let unanimous = keys(&build(&members, VotingStrategy::Unanimous).detect(&text, "en").unwrap());
        let majority = keys(&build(&members, VotingStrategy::Majority).detect(&text, "en").unwrap());
        let any = keys(&build(&members, VotingStrategy::Any).detect(&text, "en").unwrap());

        prop_assert!(unanimous.is_subset(&majority));
        prop_assert!(majority.is_subset(&any));
    }

    #[test]
    fn suppress_preserves_length_and_is_idempotent(
        text in "[a-zà-ö ]{40}",
        members in member_strategy()
    ) {
        let detections = build(&members, VotingStrategy::Any).detect(&text, "en").unwrap();

        let mut strategy = SuppressStrategy::new();
        let once = strategy.anonymize(&text, &detections).unwrap().text;
        let twice = strategy.anonymize(&once, &detections).unwrap().text;

        prop_assert_eq!(once.chars().count(), text.chars().count());
        prop_assert_eq!(&once, &twice);
    }

    #[test]
    fn adaptive_weights_stay_in_bounds(
        outcomes in prop::collection::vec(any::<bool>(), 0..40),
        alpha in 0.01..=1.0f64,
        use_ema in any::<bool>()
    ) {
        let policy = if use_ema {
            DecayPolicy::ExponentialMovingAverage { alpha }
        } else {
            DecayPolicy::Cumulative
        };
        let mut tracker = FeedbackTracker::new(policy, 0);
        for outcome in outcomes {
            tracker.record("D0", outcome);
            let weight = tracker.weight_for("D0").unwrap();
            prop_assert!((0.5..=2.0).contains(&weight));
            prop_assert!((0.0..=1.0).contains(&tracker.accuracy("D0")));
        }
    }
}
