//! Span grouping primitives
//!
//! Every layer that reconciles overlapping candidates (the statistical
//! detector's local dedup, the neural detector's per-model consensus and the
//! ensemble resolver) goes through this module. Callers differ only in the
//! decision they make per group.

/// Anything with a half-open `[start, end)` range
pub trait Span {
    /// Start offset (inclusive)
    fn start(&self) -> usize;

    /// End offset (exclusive)
    fn end(&self) -> usize;
}

/// Whether two half-open ranges overlap
pub fn spans_overlap(start1: usize, end1: usize, start2: usize, end2: usize) -> bool {
    !(end1 <= start2 || end2 <= start1)
}

/// Group spans into maximal transitive-overlap groups
///
/// Items are stably sorted by `(start, end)` and swept left to right. Each
/// item is compared against the running union `[min start, max end)` of the
/// current group, so a chain of overlapping spans collapses into one group
/// even when its first and last members are disjoint. Groups never overlap
/// each other.
pub fn group_overlapping<T: Span>(mut items: Vec<T>) -> Vec<Vec<T>> {
    items.sort_by_key(|item| (item.start(), item.end()));

    let mut groups = Vec::new();
    let mut iter = items.into_iter();
    let Some(first) = iter.next() else {
        return groups;
    };

    let mut group_start = first.start();
    let mut group_end = first.end();
    let mut current = vec![first];

    for item in iter {
        if spans_overlap(item.start(), item.end(), group_start, group_end) {
            group_start = group_start.min(item.start());
            group_end = group_end.max(item.end());
            current.push(item);
        } else {
            groups.push(std::mem::take(&mut current));
            group_start = item.start();
            group_end = item.end();
            current.push(item);
        }
    }

    groups.push(current);
    groups
}

/// Group overlapping spans and keep whatever `decide` returns for each group
pub fn resolve_groups<T, R, F>(items: Vec<T>, decide: F) -> Vec<R>
where
    T: Span,
    F: FnMut(Vec<T>) -> Option<R>,
{
    group_overlapping(items)
        .into_iter()
        .filter_map(decide)
        .collect()
}

/// Greedy overlap removal keeping the higher-confidence span
///
/// Items are stably sorted by start; each item is compared with the last kept
/// one and replaces it only when strictly more confident. This is the cheap
/// single-detector dedup; it is not transitive like [`group_overlapping`].
pub fn keep_highest_confidence<T, F>(mut items: Vec<T>, confidence: F) -> Vec<T>
where
    T: Span,
    F: Fn(&T) -> f64,
{
    items.sort_by_key(|item| item.start());

    let mut kept: Vec<T> = Vec::with_capacity(items.len());
    for item in items {
        match kept.last_mut() {
            Some(last) if item.start() < last.end() => {
                if confidence(&item) > confidence(last) {
                    *last = item;
                }
            }
            _ => kept.push(item),
        }
    }
    kept
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Range(usize, usize, f64);

    impl Span for Range {
        fn start(&self) -> usize {
            self.0
        }
        fn end(&self) -> usize {
            self.1
        }
    }

    #[test]
    fn test_spans_overlap() {
        assert!(spans_overlap(0, 5, 4, 8));
        assert!(!spans_overlap(0, 5, 5, 8));
        assert!(spans_overlap(2, 3, 0, 10));
    }

    #[test]
    fn test_group_empty() {
        let groups: Vec<Vec<Range>> = group_overlapping(Vec::new());
        assert!(groups.is_empty());
    }

    #[test]
    fn test_group_transitive_chain() {
        // [0,5) and [8,12) are disjoint but both overlap [4,9)
        let groups = group_overlapping(vec![
            Range(8, 12, 0.0),
            Range(0, 5, 0.0),
            Range(4, 9, 0.0),
            Range(20, 25, 0.0),
        ]);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].len(), 3);
        assert_eq!(groups[0][0], Range(0, 5, 0.0));
        assert_eq!(groups[1], vec![Range(20, 25, 0.0)]);
    }

    #[test]
    fn test_adjacent_spans_do_not_group() {
        let groups = group_overlapping(vec![Range(0, 5, 0.0), Range(5, 9, 0.0)]);
        assert_eq!(groups.len(), 2);
    }

    #[test]
    fn test_resolve_groups_filters() {
        let kept = resolve_groups(
            vec![Range(0, 5, 0.9), Range(2, 6, 0.1), Range(10, 12, 0.2)],
            |group| (group.len() > 1).then_some(group.len()),
        );
        assert_eq!(kept, vec![2]);
    }

    #[test]
    fn test_keep_highest_confidence() {
        let kept = keep_highest_confidence(
            vec![Range(0, 10, 0.6), Range(3, 8, 0.9), Range(12, 15, 0.5)],
            |r| r.2,
        );
        assert_eq!(kept, vec![Range(3, 8, 0.9), Range(12, 15, 0.5)]);
    }

    #[test]
    fn test_keep_highest_confidence_ties_keep_first() {
        let kept = keep_highest_confidence(vec![Range(0, 10, 0.9), Range(3, 8, 0.9)], |r| r.2);
        assert_eq!(kept, vec![Range(0, 10, 0.9)]);
    }
}
