// Availability tracker: which sources produced a usable signal this request.
//
// Downstream stages never assume full availability. Failures are carried as
// data (source id -> reason) so the caller can report a degraded-confidence
// result instead of an outright failure.

use crate::types::{Signal, SourceFailure, SourceId, SourceOutcome};
use std::collections::BTreeMap;

/// Partition of one request's normalization outcomes.
///
/// BTreeMaps keep source ordering stable so repeated evaluations of the same
/// inputs serialize identically.
#[derive(Debug, Clone, Default)]
pub struct Availability {
    /// Sources that produced a signal with a usable risk score
    pub available: BTreeMap<SourceId, Signal>,
    /// Sources that failed, timed out, or returned unparseable data
    pub failed: BTreeMap<SourceId, SourceFailure>,
}

impl Availability {
    /// No usable sources at all - the caller must short-circuit to the
    /// conservative fallback verdict rather than attempt arithmetic on an
    /// empty set.
    pub fn is_empty(&self) -> bool {
        self.available.is_empty()
    }

    pub fn available_count(&self) -> usize {
        self.available.len()
    }
}

/// Partition normalization outcomes into available signals and failures.
pub fn track(outcomes: BTreeMap<SourceId, SourceOutcome>) -> Availability {
    let mut availability = Availability::default();
    for (source_id, outcome) in outcomes {
        match outcome {
            Ok(signal) => {
                availability.available.insert(source_id, signal);
            }
            Err(failure) => {
                tracing::warn!(
                    source = %source_id,
                    error = %failure,
                    "source unavailable; excluded from fusion"
                );
                availability.failed.insert(source_id, failure);
            }
        }
    }
    availability
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partitions_successes_and_failures() {
        let outcomes = BTreeMap::from([
            (
                "visual_judge".to_string(),
                Ok(Signal::new("visual_judge", 80.0)),
            ),
            (
                "brand_matcher".to_string(),
                Err(SourceFailure::Timeout(30)),
            ),
            (
                "url_heuristics".to_string(),
                Ok(Signal::new("url_heuristics", 20.0)),
            ),
        ]);

        let availability = track(outcomes);
        assert_eq!(availability.available_count(), 2);
        assert_eq!(availability.failed.len(), 1);
        assert_eq!(
            availability.failed["brand_matcher"],
            SourceFailure::Timeout(30)
        );
        assert!(!availability.is_empty());
    }

    #[test]
    fn test_all_failed_is_empty() {
        let outcomes = BTreeMap::from([
            (
                "a".to_string(),
                Err(SourceFailure::Collaborator("connection refused".to_string())),
            ),
            ("b".to_string(), Err(SourceFailure::Timeout(5))),
        ]);

        let availability = track(outcomes);
        assert!(availability.is_empty());
        assert_eq!(availability.failed.len(), 2);
    }

    #[test]
    fn test_no_outcomes_is_empty() {
        let availability = track(BTreeMap::new());
        assert!(availability.is_empty());
        assert!(availability.failed.is_empty());
    }
}
