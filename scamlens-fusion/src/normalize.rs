// Normalizer: provider-specific responses to canonical signals.
//
// Each provider family has its own deterministic mapping from raw response
// fields to a risk score in [0, 100], an optional categorical decision, and
// an optional confidence. Values outside documented ranges are clamped, not
// rejected. A malformed response yields a SourceFailure, never a zero-risk
// signal - absence must not be conflated with "confirmed clean".
//
// Pure functions of their input; no side effects.

use crate::types::{clamp_score, Signal, SourceFailure};
use crate::verdict::BandSet;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Provider family, selecting the normalization rule for a source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderFamily {
    /// LLM visual judge: 0-100 likelihood plus suspected brand and rationale
    VisualJudge,
    /// Computer-vision clone detector: phishing flag, 0-1 confidence, brand
    BrandMatcher,
    /// Trained classifier: binary label plus probability
    MlClassifier,
    /// Rule-based URL heuristics: already on the 0-100 scale
    UrlHeuristics,
    /// Third-party reputation API: fraud score plus boolean indicators
    Reputation,
    /// Community scam reports: raw report count
    UserReports,
}

/// Normalize one raw collaborator response into a canonical signal.
///
/// The band set supplies the domain's decision ladder so numeric families
/// can derive a categorical decision for agreement checks.
pub fn normalize(
    source_id: &str,
    family: ProviderFamily,
    raw: &Value,
    bands: &BandSet,
) -> Result<Signal, SourceFailure> {
    let signal = match family {
        ProviderFamily::VisualJudge => normalize_visual_judge(source_id, raw, bands)?,
        ProviderFamily::BrandMatcher => normalize_brand_matcher(source_id, raw, bands)?,
        ProviderFamily::MlClassifier => normalize_ml_classifier(source_id, raw, bands)?,
        ProviderFamily::UrlHeuristics => normalize_url_heuristics(source_id, raw, bands)?,
        ProviderFamily::Reputation => normalize_reputation(source_id, raw, bands)?,
        ProviderFamily::UserReports => normalize_user_reports(source_id, raw, bands)?,
    };

    tracing::debug!(
        source = source_id,
        risk = signal.risk_score(),
        decision = ?signal.decision,
        "normalized signal"
    );
    Ok(signal)
}

/// Visual judge: `likelihood` 0-100 becomes the risk score directly.
fn normalize_visual_judge(
    source_id: &str,
    raw: &Value,
    bands: &BandSet,
) -> Result<Signal, SourceFailure> {
    let likelihood = number_field(raw, "likelihood")
        .ok_or_else(|| SourceFailure::Malformed("missing likelihood".to_string()))?;

    let risk = clamp_score(likelihood);
    let mut signal = Signal::new(source_id, risk)
        .with_decision(bands.band_for_score(risk))
        .with_raw(raw.clone());
    if let Some(confidence) = number_field(raw, "confidence") {
        signal = signal.with_confidence(confidence);
    }
    Ok(signal)
}

/// Brand matcher: phishing flag + 0-1 confidence + recognized brand.
///
/// A positive detection lands in the 70-100 range, a recognized legitimate
/// brand in 0-40, and anything indeterminate at the 50 midpoint.
fn normalize_brand_matcher(
    source_id: &str,
    raw: &Value,
    bands: &BandSet,
) -> Result<Signal, SourceFailure> {
    let obj = raw
        .as_object()
        .ok_or_else(|| SourceFailure::Malformed("expected object".to_string()))?;
    if !obj.contains_key("is_phishing") && !obj.contains_key("confidence") {
        return Err(SourceFailure::Malformed(
            "missing is_phishing/confidence".to_string(),
        ));
    }

    let is_phishing = raw["is_phishing"].as_bool().unwrap_or(false);
    let confidence = number_field(raw, "confidence").unwrap_or(0.0).clamp(0.0, 1.0);
    let brand = brand_field(raw);

    let (risk, decision) = if is_phishing {
        ((confidence * 100.0).max(70.0), bands.worst())
    } else if brand.is_some() && confidence > 0.3 {
        ((confidence * 100.0).min(40.0), bands.safe())
    } else {
        (50.0, bands.middle())
    };

    Ok(Signal::new(source_id, risk)
        .with_decision(decision)
        .with_confidence(confidence * 100.0)
        .with_raw(raw.clone()))
}

/// ML classifier: binary label + probability of the positive (phishing)
/// class.
fn normalize_ml_classifier(
    source_id: &str,
    raw: &Value,
    bands: &BandSet,
) -> Result<Signal, SourceFailure> {
    let probability = number_field(raw, "probability")
        .ok_or_else(|| SourceFailure::Malformed("missing probability".to_string()))?
        .clamp(0.0, 1.0);

    let is_phishing = match raw.get("label").and_then(Value::as_str) {
        Some(label) => label.eq_ignore_ascii_case("phishing"),
        None => raw["is_phishing"]
            .as_bool()
            .ok_or_else(|| SourceFailure::Malformed("missing label".to_string()))?,
    };

    let risk = clamp_score(probability * 100.0);
    let decision = if is_phishing { bands.worst() } else { bands.safe() };

    Ok(Signal::new(source_id, risk)
        .with_decision(decision)
        .with_confidence(probability * 100.0)
        .with_raw(raw.clone()))
}

/// URL heuristics already speak the canonical scale; clamp and band.
fn normalize_url_heuristics(
    source_id: &str,
    raw: &Value,
    bands: &BandSet,
) -> Result<Signal, SourceFailure> {
    let risk = number_field(raw, "risk")
        .ok_or_else(|| SourceFailure::Malformed("missing risk".to_string()))?;
    let risk = clamp_score(risk);

    Ok(Signal::new(source_id, risk)
        .with_decision(bands.band_for_score(risk))
        .with_raw(raw.clone()))
}

/// Reputation API: fraud score plus boolean indicators, each adding a fixed
/// increment, clamped to 100.
fn normalize_reputation(
    source_id: &str,
    raw: &Value,
    bands: &BandSet,
) -> Result<Signal, SourceFailure> {
    let obj = raw
        .as_object()
        .ok_or_else(|| SourceFailure::Malformed("expected object".to_string()))?;

    const KNOWN_FIELDS: [&str; 9] = [
        "fraud_score",
        "recent_abuse",
        "spammer",
        "risky",
        "leaked",
        "active",
        "line_type",
        "risk_level",
        "blocked",
    ];
    if !KNOWN_FIELDS.iter().any(|f| obj.contains_key(*f)) {
        return Err(SourceFailure::Malformed(
            "no recognizable reputation fields".to_string(),
        ));
    }

    let mut risk = number_field(raw, "fraud_score").map(clamp_score).unwrap_or(0.0);

    if raw["recent_abuse"].as_bool() == Some(true) {
        risk += 20.0;
    }
    if raw["spammer"].as_bool() == Some(true) {
        risk += 25.0;
    }
    if raw["risky"].as_bool() == Some(true) {
        risk += 15.0;
    }
    if raw["leaked"].as_bool() == Some(true) {
        risk += 12.0;
    }
    if raw["active"].as_bool() == Some(false) {
        risk += 15.0;
    }
    if raw["blocked"].as_bool() == Some(true) {
        risk += 35.0;
    }

    match raw.get("risk_level").and_then(Value::as_str) {
        Some(level) if level.eq_ignore_ascii_case("high") => risk += 30.0,
        Some(level) if level.eq_ignore_ascii_case("medium") => risk += 15.0,
        _ => {}
    }

    if let Some(line_type) = raw.get("line_type").and_then(Value::as_str) {
        risk += match line_type.to_ascii_lowercase().as_str() {
            "voip" => 15.0,
            "premium" => 20.0,
            "tollfree" | "toll_free" => 12.0,
            "prepaid" => 8.0,
            _ => 0.0,
        };
    }

    let risk = clamp_score(risk);
    Ok(Signal::new(source_id, risk)
        .with_decision(bands.band_for_score(risk))
        .with_raw(raw.clone()))
}

/// Community reports: report count mapped to a banded risk ladder.
fn normalize_user_reports(
    source_id: &str,
    raw: &Value,
    bands: &BandSet,
) -> Result<Signal, SourceFailure> {
    let count = number_field(raw, "count")
        .ok_or_else(|| SourceFailure::Malformed("missing count".to_string()))?;
    let count = count.max(0.0) as u64;

    let risk = match count {
        0 => 0.0,
        1..=2 => 15.0,
        3..=9 => 35.0,
        10..=49 => 60.0,
        _ => 85.0,
    };

    Ok(Signal::new(source_id, risk)
        .with_decision(bands.band_for_score(risk))
        .with_raw(raw.clone()))
}

/// Numeric field access tolerant of providers that quote their numbers.
fn number_field(raw: &Value, key: &str) -> Option<f64> {
    match raw.get(key) {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

/// Detector brand field, tolerating the several names providers use for it.
///
/// Returns None for empty or "unknown" placeholders.
pub fn brand_field(raw: &Value) -> Option<String> {
    for key in ["matched_brand", "pred_target", "brand", "suspected_brand"] {
        if let Some(name) = raw.get(key).and_then(Value::as_str) {
            let trimmed = name.trim();
            if !trimmed.is_empty() && !trimmed.eq_ignore_ascii_case("unknown") {
                return Some(trimmed.to_string());
            }
        }
    }
    None
}
