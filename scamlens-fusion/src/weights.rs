// Weight resolver: per-source weights over the available sources only.
//
// Base weights come from deployment configuration; per-request boosts are
// additive deltas applied before renormalization. The resolved table always
// sums to 1.0 over the available sources, falling back to uniform weights
// when the configured mass over them is zero.

use crate::types::{Signal, SourceId};
use std::collections::BTreeMap;

/// Mapping from source id to nonnegative weight.
pub type WeightTable = BTreeMap<SourceId, f64>;

/// Additive per-request weight adjustment for one source.
#[derive(Debug, Clone, PartialEq)]
pub struct WeightBoost {
    pub source_id: SourceId,
    pub delta: f64,
    /// Short reason recorded in logs, e.g. "brand logos detected"
    pub reason: &'static str,
}

impl WeightBoost {
    pub fn new(source_id: impl Into<SourceId>, delta: f64, reason: &'static str) -> Self {
        Self {
            source_id: source_id.into(),
            delta,
            reason,
        }
    }
}

/// Resolve effective weights for this request.
///
/// 1. Restrict configured base weights to the available sources (a source
///    missing from the base table weighs 0).
/// 2. Apply additive boosts, clamping each weight at 0.
/// 3. Renormalize so the weights sum to exactly 1.0; if the total mass is
///    zero, fall back to uniform weights over the available sources.
pub fn resolve(
    available: &BTreeMap<SourceId, Signal>,
    base: &WeightTable,
    boosts: &[WeightBoost],
) -> WeightTable {
    if available.is_empty() {
        return WeightTable::new();
    }

    let mut weights: WeightTable = available
        .keys()
        .map(|id| (id.clone(), base.get(id).copied().unwrap_or(0.0).max(0.0)))
        .collect();

    for boost in boosts {
        if let Some(weight) = weights.get_mut(&boost.source_id) {
            tracing::debug!(
                source = %boost.source_id,
                delta = boost.delta,
                reason = boost.reason,
                "applying weight boost"
            );
            *weight = (*weight + boost.delta).max(0.0);
        }
    }

    let total: f64 = weights.values().sum();
    if total <= 0.0 {
        let uniform = 1.0 / available.len() as f64;
        for weight in weights.values_mut() {
            *weight = uniform;
        }
        return weights;
    }

    for weight in weights.values_mut() {
        *weight /= total;
    }
    weights
}
