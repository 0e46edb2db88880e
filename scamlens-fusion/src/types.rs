// Shared types and data contracts for the fusion pipeline.
//
// These types are the explicit synchronization points between the pipeline
// stages: collaborator clients produce raw JSON, the normalizer turns it into
// `Signal`s, the availability tracker partitions outcomes, and the consensus
// engine emits a `FusionResult`.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use thiserror::Error;

/// Stable identifier for a signal source.
///
/// Examples: "visual_judge", "brand_matcher", "ml_classifier",
/// "url_heuristics", "reputation:ipqs", "user_reports".
pub type SourceId = String;

/// Index into a domain's ordered decision band set (0 = safest band).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Band(pub usize);

/// How much the contributing sources agreed on the final verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsensusLevel {
    /// All sources agreed, or two or more agreed with no high-risk dissent
    High,
    /// A high-risk minority forced the verdict over dissenting sources
    Medium,
    /// Genuinely mixed signals
    Low,
    /// No usable sources, or the fusion arithmetic itself failed
    Error,
}

/// Why a source produced no usable signal
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SourceFailure {
    /// The collaborator call itself failed (network, HTTP status, transport)
    #[error("collaborator error: {0}")]
    Collaborator(String),

    /// The collaborator did not answer within its configured timeout
    #[error("timed out after {0}s")]
    Timeout(u64),

    /// The collaborator answered, but the response could not be interpreted
    #[error("unparseable response: {0}")]
    Malformed(String),
}

/// One collaborator's normalized contribution to a fusion call.
///
/// `risk_score` is kept private so it can never leave [0, 100]: every write
/// path clamps. Absence of a signal is expressed by `SourceOutcome::Err`,
/// never by a zero score - a missing source must not read as "confirmed
/// clean".
#[derive(Debug, Clone, PartialEq)]
pub struct Signal {
    pub source_id: SourceId,
    risk_score: f64,
    /// Categorical verdict used for agreement checks, when the provider
    /// family defines one.
    pub decision: Option<Band>,
    /// How much to trust this particular signal instance (0-100), not the
    /// source's general reliability.
    pub confidence: Option<f64>,
    /// Opaque provider payload preserved for audit output. Never used in
    /// scoring math.
    pub raw: Value,
}

impl Signal {
    /// Create a signal with the risk score clamped into [0, 100].
    pub fn new(source_id: impl Into<SourceId>, risk_score: f64) -> Self {
        Self {
            source_id: source_id.into(),
            risk_score: clamp_score(risk_score),
            decision: None,
            confidence: None,
            raw: Value::Null,
        }
    }

    pub fn with_decision(mut self, band: Band) -> Self {
        self.decision = Some(band);
        self
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = Some(clamp_score(confidence));
        self
    }

    pub fn with_raw(mut self, raw: Value) -> Self {
        self.raw = raw;
        self
    }

    /// Risk score in [0, 100], higher = more suspicious.
    pub fn risk_score(&self) -> f64 {
        self.risk_score
    }

    /// Replace the risk score, clamping into [0, 100].
    pub fn set_risk_score(&mut self, risk_score: f64) {
        self.risk_score = clamp_score(risk_score);
    }
}

/// Clamp a raw provider value into the canonical [0, 100] risk range.
pub fn clamp_score(value: f64) -> f64 {
    if value.is_nan() {
        return 0.0;
    }
    value.clamp(0.0, 100.0)
}

/// What normalization produced for one source: a usable signal or a recorded
/// failure.
pub type SourceOutcome = Result<Signal, SourceFailure>;

/// Output of one fusion call.
///
/// Created fresh per request, never mutated after construction, immediately
/// serialized to the caller. Field names are part of the wire contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FusionResult {
    /// Final decision band label (e.g. "clone", "suspicious", "clean")
    pub decision: String,
    /// Blended risk score 0-100, rounded to one decimal
    pub score: f64,
    /// Decision-banded human-readable guidance
    pub advice: String,
    /// Agreement level across contributing sources
    pub consensus: ConsensusLevel,
    /// Weighted contribution of each available source to `score`
    pub breakdown: BTreeMap<SourceId, f64>,
    /// Failure reason for each source that produced no signal
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub errors: BTreeMap<SourceId, String>,
}

/// Round to one decimal for wire output.
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
