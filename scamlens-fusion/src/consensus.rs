// Consensus engine: blend available signals into one score and decision.
//
// Algorithm:
// 1. final_score = sum(weight[s] * risk[s]) over available sources.
// 2. Band the score via the domain's configurable thresholds.
// 3. Agreement adjustment, evaluated strictly in this order:
//    a. all voting sources agree on one band -> that band, consensus high
//    b. any worst-band vote (non-unanimous) -> worst band, score floored at
//       worst_floor, consensus medium - a high-risk minority is never
//       averaged away by majority-clean sources
//    c. two or more sources agree exactly (no worst vote present) -> the
//       most severe agreed band, score kept, consensus high
//    d. genuinely mixed votes -> middle band, score floored at mixed_floor,
//       consensus low
//    e. no votes at all -> band from score, consensus low
//
// Signals without a categorical decision still contribute to the weighted
// sum; they just don't vote.

use crate::types::{clamp_score, Band, ConsensusLevel, Signal, SourceId};
use crate::verdict::BandSet;
use crate::weights::WeightTable;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Tunable floors and brand-rule constants.
///
/// The numeric values are empirically tuned bands, not derived quantities;
/// deployments may move them without changing engine behavior beyond
/// "roughly this band".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FusionPolicy {
    /// Score floor when a worst-band minority forces the verdict
    pub worst_floor: f64,
    /// Score floor for genuinely mixed verdicts
    pub mixed_floor: f64,
    /// Risk floor for a brand-mismatch signal (brand seen, domain not owned
    /// by that brand)
    pub mismatch_floor: f64,
    /// Risk floor for a brand the registry does not know
    pub unknown_brand_floor: f64,
    /// Risk floor when a brand is seen but no serving domain is known
    /// (screenshot-only analysis)
    pub no_domain_floor: f64,
    /// How much the legitimacy override subtracts from the judge signal
    pub legitimacy_rebate: f64,
    /// Lowest risk the legitimacy override may leave in place (never zero -
    /// the override pushes toward the low end, not to certainty)
    pub legitimacy_min: f64,
    /// Minimum evidence confidence (0-100) for the legitimacy override to
    /// fire at all
    pub legitimacy_min_confidence: f64,
}

impl Default for FusionPolicy {
    fn default() -> Self {
        Self {
            worst_floor: 70.0,
            mixed_floor: 40.0,
            mismatch_floor: 80.0,
            unknown_brand_floor: 40.0,
            no_domain_floor: 30.0,
            legitimacy_rebate: 70.0,
            legitimacy_min: 5.0,
            legitimacy_min_confidence: 60.0,
        }
    }
}

/// Outcome of one consensus computation.
#[derive(Debug, Clone, PartialEq)]
pub struct Consensus {
    pub score: f64,
    pub band: Band,
    pub level: ConsensusLevel,
}

/// Blend the available signals into one score, band, and agreement level.
///
/// Callers guarantee `signals` is non-empty; the zero-availability
/// short-circuit happens before this stage.
pub fn fuse(
    signals: &BTreeMap<SourceId, Signal>,
    weights: &WeightTable,
    bands: &BandSet,
    policy: &FusionPolicy,
) -> Consensus {
    let blended: f64 = signals
        .iter()
        .map(|(id, signal)| weights.get(id).copied().unwrap_or(0.0) * signal.risk_score())
        .sum();
    let blended = clamp_score(blended);

    let votes: Vec<Band> = signals.values().filter_map(|s| s.decision).collect();
    let worst = bands.worst();
    let has_worst_vote = votes.contains(&worst);

    let consensus = if !votes.is_empty() && votes.iter().all(|b| *b == votes[0]) {
        Consensus {
            score: blended,
            band: votes[0],
            level: ConsensusLevel::High,
        }
    } else if has_worst_vote {
        Consensus {
            score: blended.max(policy.worst_floor),
            band: worst,
            level: ConsensusLevel::Medium,
        }
    } else if let Some(agreed) = most_severe_agreement(&votes) {
        Consensus {
            score: blended,
            band: agreed,
            level: ConsensusLevel::High,
        }
    } else if !votes.is_empty() {
        Consensus {
            score: blended.max(policy.mixed_floor),
            band: bands.middle(),
            level: ConsensusLevel::Low,
        }
    } else {
        Consensus {
            score: blended,
            band: bands.band_for_score(blended),
            level: ConsensusLevel::Low,
        }
    };

    tracing::debug!(
        blended,
        final_score = consensus.score,
        band = ?consensus.band,
        level = ?consensus.level,
        votes = votes.len(),
        "consensus computed"
    );
    consensus
}

/// The most severe band that two or more sources agree on exactly, if any.
fn most_severe_agreement(votes: &[Band]) -> Option<Band> {
    let mut counts: BTreeMap<Band, usize> = BTreeMap::new();
    for vote in votes {
        *counts.entry(*vote).or_insert(0) += 1;
    }
    counts
        .into_iter()
        .filter(|(_, count)| *count >= 2)
        .map(|(band, _)| band)
        .max()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bands() -> BandSet {
        BandSet::site_default()
    }

    fn signal(id: &str, risk: f64, band: Option<Band>) -> (SourceId, Signal) {
        let mut sig = Signal::new(id, risk);
        sig.decision = band;
        (id.to_string(), sig)
    }

    fn uniform(ids: &[&str]) -> WeightTable {
        let w = 1.0 / ids.len() as f64;
        ids.iter().map(|id| (id.to_string(), w)).collect()
    }

    #[test]
    fn test_unanimous_clean_is_high_consensus() {
        let bands = bands();
        let signals = BTreeMap::from([
            signal("a", 10.0, Some(bands.safe())),
            signal("b", 15.0, Some(bands.safe())),
        ]);

        let consensus = fuse(&signals, &uniform(&["a", "b"]), &bands, &FusionPolicy::default());
        assert_eq!(consensus.band, bands.safe());
        assert_eq!(consensus.level, ConsensusLevel::High);
        assert!((consensus.score - 12.5).abs() < 1e-9);
    }

    #[test]
    fn test_unanimous_worst_is_high_consensus() {
        let bands = bands();
        let signals = BTreeMap::from([
            signal("a", 85.0, Some(bands.worst())),
            signal("b", 92.0, Some(bands.worst())),
        ]);

        let consensus = fuse(&signals, &uniform(&["a", "b"]), &bands, &FusionPolicy::default());
        assert_eq!(consensus.band, bands.worst());
        assert_eq!(consensus.level, ConsensusLevel::High);
    }

    #[test]
    fn test_worst_minority_forces_worst_band_with_floor() {
        // The spec'd worked example: vision 80/clone at 0.6, heuristics
        // 20/clean at 0.4. Weighted average is 56, but the high-risk
        // minority must win and the score must be floored.
        let bands = bands();
        let signals = BTreeMap::from([
            signal("vision", 80.0, Some(bands.worst())),
            signal("heuristics", 20.0, Some(bands.safe())),
        ]);
        let weights = WeightTable::from([
            ("vision".to_string(), 0.6),
            ("heuristics".to_string(), 0.4),
        ]);

        let consensus = fuse(&signals, &weights, &bands, &FusionPolicy::default());
        assert_eq!(consensus.band, bands.worst());
        assert!(consensus.score >= 70.0);
        assert_eq!(consensus.level, ConsensusLevel::Medium);
    }

    #[test]
    fn test_worst_vote_with_already_high_score_keeps_score() {
        let bands = bands();
        let signals = BTreeMap::from([
            signal("a", 95.0, Some(bands.worst())),
            signal("b", 80.0, Some(bands.middle())),
        ]);

        let consensus = fuse(&signals, &uniform(&["a", "b"]), &bands, &FusionPolicy::default());
        assert_eq!(consensus.band, bands.worst());
        assert!((consensus.score - 87.5).abs() < 1e-9);
    }

    #[test]
    fn test_majority_agreement_without_worst_is_high() {
        let bands = bands();
        let signals = BTreeMap::from([
            signal("a", 10.0, Some(bands.safe())),
            signal("b", 12.0, Some(bands.safe())),
            signal("c", 45.0, Some(bands.middle())),
        ]);

        let consensus = fuse(
            &signals,
            &uniform(&["a", "b", "c"]),
            &bands,
            &FusionPolicy::default(),
        );
        assert_eq!(consensus.band, bands.safe());
        assert_eq!(consensus.level, ConsensusLevel::High);
    }

    #[test]
    fn test_majority_agreement_prefers_most_severe_agreed_band() {
        let bands = bands();
        let signals = BTreeMap::from([
            signal("a", 10.0, Some(bands.safe())),
            signal("b", 12.0, Some(bands.safe())),
            signal("c", 45.0, Some(bands.middle())),
            signal("d", 50.0, Some(bands.middle())),
        ]);

        let consensus = fuse(
            &signals,
            &uniform(&["a", "b", "c", "d"]),
            &bands,
            &FusionPolicy::default(),
        );
        assert_eq!(consensus.band, bands.middle());
        assert_eq!(consensus.level, ConsensusLevel::High);
    }

    #[test]
    fn test_two_way_disagreement_without_worst_is_mixed() {
        let bands = bands();
        let signals = BTreeMap::from([
            signal("a", 10.0, Some(bands.safe())),
            signal("b", 45.0, Some(bands.middle())),
        ]);

        let consensus = fuse(&signals, &uniform(&["a", "b"]), &bands, &FusionPolicy::default());
        assert_eq!(consensus.band, bands.middle());
        assert_eq!(consensus.level, ConsensusLevel::Low);
        assert!(consensus.score >= 40.0);
    }

    #[test]
    fn test_safety_bias_never_safe_with_worst_and_safe_votes() {
        let bands = bands();
        // Three clean votes against one worst vote: the worst vote still
        // dominates.
        let signals = BTreeMap::from([
            signal("a", 5.0, Some(bands.safe())),
            signal("b", 8.0, Some(bands.safe())),
            signal("c", 4.0, Some(bands.safe())),
            signal("d", 90.0, Some(bands.worst())),
        ]);

        let consensus = fuse(
            &signals,
            &uniform(&["a", "b", "c", "d"]),
            &bands,
            &FusionPolicy::default(),
        );
        assert_ne!(consensus.band, bands.safe());
        assert_eq!(consensus.band, bands.worst());
        assert!(consensus.score >= 70.0);
    }

    #[test]
    fn test_voteless_signals_band_from_score() {
        let bands = bands();
        let signals = BTreeMap::from([signal("a", 35.0, None), signal("b", 45.0, None)]);

        let consensus = fuse(&signals, &uniform(&["a", "b"]), &bands, &FusionPolicy::default());
        assert_eq!(consensus.band, bands.middle());
        assert_eq!(consensus.level, ConsensusLevel::Low);
        assert!((consensus.score - 40.0).abs() < 1e-9);
    }

    #[test]
    fn test_single_source_agrees_with_itself() {
        let bands = bands();
        let signals = BTreeMap::from([signal("a", 75.0, Some(bands.worst()))]);

        let consensus = fuse(&signals, &uniform(&["a"]), &bands, &FusionPolicy::default());
        assert_eq!(consensus.band, bands.worst());
        assert_eq!(consensus.level, ConsensusLevel::High);
    }

    #[test]
    fn test_zero_weight_source_contributes_nothing_to_score() {
        let bands = bands();
        let signals = BTreeMap::from([
            signal("a", 100.0, Some(bands.safe())),
            signal("b", 20.0, Some(bands.safe())),
        ]);
        let weights =
            WeightTable::from([("a".to_string(), 0.0), ("b".to_string(), 1.0)]);

        let consensus = fuse(&signals, &weights, &bands, &FusionPolicy::default());
        assert!((consensus.score - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_five_band_domain_middle_is_suspicious() {
        let bands = BandSet::phone_default();
        let signals = BTreeMap::from([
            signal("reputation:ipqs", 10.0, Some(Band(0))),
            signal("reputation:telesign", 55.0, Some(Band(2))),
        ]);

        let consensus = fuse(
            &signals,
            &uniform(&["reputation:ipqs", "reputation:telesign"]),
            &bands,
            &FusionPolicy::default(),
        );
        // Mixed, no worst vote: middle band of five is "suspicious"
        assert_eq!(consensus.band, Band(2));
        assert_eq!(consensus.level, ConsensusLevel::Low);
    }
}
