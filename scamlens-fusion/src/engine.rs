// Fusion engine: one parameterized entry point for every scoring call site.
//
// evaluate() is infallible by contract: whatever the collaborators did, the
// caller receives a well-formed FusionResult. Partial failure degrades the
// verdict; total failure and internal panics collapse to a fixed
// conservative fallback (middle band, score 50, consensus "error").

use crate::availability::{track, Availability};
use crate::brands::BrandRegistry;
use crate::consensus::{fuse, FusionPolicy};
use crate::types::{
    round1, ConsensusLevel, FusionResult, Signal, SourceId, SourceOutcome,
};
use crate::verdict::BandSet;
use crate::weights::{resolve, WeightBoost, WeightTable};
use std::collections::BTreeMap;
use std::panic::{catch_unwind, AssertUnwindSafe};

/// Which sources the brand rules act on in this domain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrandTargets {
    /// Source whose risk is derived from brand/domain mismatch
    pub mismatch_source: SourceId,
    /// The judge whose likelihood the legitimacy override rebates
    pub judge_source: SourceId,
}

/// Brand/domain evidence gathered by the caller for this request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BrandEvidence {
    /// Brand name reported by the detectors, if any
    pub detected_brand: Option<String>,
    /// Registered domain actually serving the page, if known
    pub registered_domain: Option<String>,
    /// Confidence of the brand detection (0-100)
    pub confidence: f64,
}

/// How the detected brand relates to the serving domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BrandDisposition {
    /// Brand resolved and the serving domain is on its verified list
    LegitimateMatch,
    /// Brand resolved but the serving domain is not on its verified list
    Mismatch,
    /// Detectors reported a brand the registry does not know
    UnknownBrand,
    /// Brand seen but no serving domain available (screenshot-only)
    NoDomain,
}

/// Parameterized fusion engine; one instance per domain (site, phone),
/// constructed at startup from read-only configuration and shared across
/// requests. Holds no mutable state.
#[derive(Debug, Clone)]
pub struct FusionEngine {
    bands: BandSet,
    base_weights: WeightTable,
    policy: FusionPolicy,
    registry: BrandRegistry,
    brand_targets: Option<BrandTargets>,
}

impl FusionEngine {
    pub fn new(bands: BandSet, base_weights: WeightTable, policy: FusionPolicy) -> Self {
        Self {
            bands,
            base_weights,
            policy,
            registry: BrandRegistry::default(),
            brand_targets: None,
        }
    }

    /// Enable the brand rules (legitimacy override, mismatch escalation)
    /// for this domain.
    pub fn with_brand_rules(mut self, registry: BrandRegistry, targets: BrandTargets) -> Self {
        self.registry = registry;
        self.brand_targets = Some(targets);
        self
    }

    pub fn bands(&self) -> &BandSet {
        &self.bands
    }

    pub fn policy(&self) -> &FusionPolicy {
        &self.policy
    }

    /// Fuse one request's normalization outcomes into a verdict.
    ///
    /// Never panics and never errors: all failure modes collapse to the
    /// conservative fallback result.
    pub fn evaluate(
        &self,
        outcomes: BTreeMap<SourceId, SourceOutcome>,
        boosts: &[WeightBoost],
        evidence: Option<&BrandEvidence>,
    ) -> FusionResult {
        let availability = track(outcomes);

        let mut errors: BTreeMap<SourceId, String> = availability
            .failed
            .iter()
            .map(|(id, failure)| (id.clone(), failure.to_string()))
            .collect();

        if availability.is_empty() {
            tracing::warn!("no usable sources; returning conservative fallback verdict");
            if errors.is_empty() {
                errors.insert("engine".to_string(), "no sources configured".to_string());
            }
            return self.conservative_result(errors);
        }

        let fused = catch_unwind(AssertUnwindSafe(|| {
            self.evaluate_available(&availability, boosts, evidence, errors.clone())
        }));

        match fused {
            Ok(result) => result,
            Err(panic) => {
                let reason = panic_message(panic);
                tracing::error!(error = %reason, "fusion arithmetic failed; returning fallback");
                errors.insert("fusion".to_string(), reason);
                self.conservative_result(errors)
            }
        }
    }

    fn evaluate_available(
        &self,
        availability: &Availability,
        boosts: &[WeightBoost],
        evidence: Option<&BrandEvidence>,
        errors: BTreeMap<SourceId, String>,
    ) -> FusionResult {
        let mut signals = availability.available.clone();

        if let Some(evidence) = evidence {
            self.apply_brand_rules(&mut signals, evidence);
        }

        let weights = resolve(&signals, &self.base_weights, boosts);
        let consensus = fuse(&signals, &weights, &self.bands, &self.policy);

        let breakdown: BTreeMap<SourceId, f64> = signals
            .iter()
            .map(|(id, signal)| {
                let weight = weights.get(id).copied().unwrap_or(0.0);
                (id.clone(), round1(weight * signal.risk_score()))
            })
            .collect();

        FusionResult {
            decision: self.bands.label(consensus.band).to_string(),
            score: round1(consensus.score),
            advice: self.bands.advice(consensus.band).to_string(),
            consensus: consensus.level,
            breakdown,
            errors,
        }
    }

    /// Apply the two explicit brand rules to the gathered signals.
    ///
    /// Both mutate signal risk before weighting, then re-derive the signal's
    /// categorical decision from its new risk so agreement checks see the
    /// adjusted picture.
    fn apply_brand_rules(&self, signals: &mut BTreeMap<SourceId, Signal>, evidence: &BrandEvidence) {
        let Some(targets) = &self.brand_targets else {
            return;
        };
        let Some(brand) = evidence.detected_brand.as_deref() else {
            return;
        };

        let disposition = match self.registry.resolve(brand) {
            Some(entry) => match evidence.registered_domain.as_deref() {
                Some(domain) if entry.owns_domain(domain) => BrandDisposition::LegitimateMatch,
                Some(_) => BrandDisposition::Mismatch,
                None => BrandDisposition::NoDomain,
            },
            None => BrandDisposition::UnknownBrand,
        };

        match disposition {
            BrandDisposition::LegitimateMatch => {
                // Legitimacy override: the page really is the brand it looks
                // like. Only high-confidence evidence may reduce risk, and
                // never below legitimacy_min.
                if evidence.confidence < self.policy.legitimacy_min_confidence {
                    tracing::debug!(
                        brand,
                        confidence = evidence.confidence,
                        "legitimate match below confidence gate; override not applied"
                    );
                    return;
                }
                tracing::info!(brand, "legitimacy override: verified brand-domain match");
                self.adjust(signals, &targets.judge_source, |risk, policy| {
                    (risk - policy.legitimacy_rebate).max(policy.legitimacy_min)
                });
                self.adjust(signals, &targets.mismatch_source, |_, policy| {
                    policy.legitimacy_min
                });
            }
            BrandDisposition::Mismatch => {
                // Mismatch escalation: brand evidence on a domain the brand
                // does not own.
                tracing::info!(
                    brand,
                    domain = evidence.registered_domain.as_deref().unwrap_or(""),
                    "mismatch escalation: brand served from unverified domain"
                );
                self.adjust(signals, &targets.mismatch_source, |risk, policy| {
                    risk.max(policy.mismatch_floor)
                });
                self.adjust(signals, &targets.judge_source, |risk, policy| {
                    risk.max(policy.worst_floor)
                });
            }
            BrandDisposition::UnknownBrand => {
                tracing::debug!(brand, "brand not in registry; moderate suspicion floor");
                self.adjust(signals, &targets.mismatch_source, |risk, policy| {
                    risk.max(policy.unknown_brand_floor)
                });
            }
            BrandDisposition::NoDomain => {
                tracing::debug!(brand, "brand seen without domain context; moderate floor");
                self.adjust(signals, &targets.mismatch_source, |risk, policy| {
                    risk.max(policy.no_domain_floor)
                });
            }
        }
    }

    fn adjust<F>(&self, signals: &mut BTreeMap<SourceId, Signal>, source: &SourceId, rule: F)
    where
        F: Fn(f64, &FusionPolicy) -> f64,
    {
        if let Some(signal) = signals.get_mut(source) {
            let before = signal.risk_score();
            signal.set_risk_score(rule(before, &self.policy));
            signal.decision = Some(self.bands.band_for_score(signal.risk_score()));
            if (signal.risk_score() - before).abs() > f64::EPSILON {
                tracing::debug!(
                    source = %source,
                    before,
                    after = signal.risk_score(),
                    "brand rule adjusted signal risk"
                );
            }
        }
    }

    /// The fixed conservative fallback: middle band, score 50, consensus
    /// "error".
    fn conservative_result(&self, errors: BTreeMap<SourceId, String>) -> FusionResult {
        let band = self.bands.middle();
        FusionResult {
            decision: self.bands.label(band).to_string(),
            score: 50.0,
            advice: self.bands.advice(band).to_string(),
            consensus: ConsensusLevel::Error,
            breakdown: BTreeMap::new(),
            errors,
        }
    }
}

fn panic_message(panic: Box<dyn std::any::Any + Send>) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
