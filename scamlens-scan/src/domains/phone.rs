// Phone-reputation domain.
//
// Collaborators: one client per configured reputation provider plus the
// community report store. Five-band verdict ladder; no brand rules.

use crate::collaborators::{
    Collaborator, CollaboratorSet, ReputationClient, ScanContext, UserReportsSource,
};
use chrono::{DateTime, Utc};
use scamlens_common::{AppConfig, Error, ReportStore, Result};
use scamlens_fusion::normalize::normalize;
use scamlens_fusion::{FusionEngine, FusionResult, SourceId, SourceOutcome};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Full phone-analysis response envelope.
#[derive(Debug, Clone, Serialize)]
pub struct PhoneAnalysis {
    pub number: String,
    #[serde(flatten)]
    pub result: FusionResult,
    /// Raw per-source responses preserved for audit
    pub signals: BTreeMap<SourceId, Value>,
    /// Community report count at analysis time
    pub reports: usize,
    pub analyzed_at: DateTime<Utc>,
}

pub struct PhoneAnalyzer {
    engine: FusionEngine,
    collaborators: CollaboratorSet,
}

impl PhoneAnalyzer {
    pub fn from_config(
        config: &AppConfig,
        http: &reqwest::Client,
        store: Arc<dyn ReportStore>,
    ) -> Self {
        let engine = FusionEngine::new(
            config.phone.band_set(),
            config.phone.weights.clone(),
            config.policy.clone(),
        );

        let mut collaborators: Vec<Arc<dyn Collaborator>> = config
            .providers
            .reputation
            .iter()
            .map(|(provider, endpoint)| {
                Arc::new(ReputationClient::new(provider, http.clone(), endpoint))
                    as Arc<dyn Collaborator>
            })
            .collect();
        collaborators.push(Arc::new(UserReportsSource::new(store)));

        Self {
            engine,
            collaborators: CollaboratorSet::new(collaborators),
        }
    }

    /// Analyze a normalized phone number.
    pub async fn analyze(&self, number: &str) -> PhoneAnalysis {
        let ctx = ScanContext {
            phone_number: Some(number.to_string()),
            ..Default::default()
        };

        let gathered = self.collaborators.gather(&ctx).await;

        let reports = gathered
            .get("user_reports")
            .and_then(|o| o.response.as_ref().ok())
            .and_then(|raw| raw.get("count"))
            .and_then(Value::as_u64)
            .unwrap_or(0) as usize;

        let signals: BTreeMap<SourceId, Value> = gathered
            .iter()
            .filter_map(|(id, outcome)| {
                outcome
                    .response
                    .as_ref()
                    .ok()
                    .map(|raw| (id.clone(), raw.clone()))
            })
            .collect();

        let bands = self.engine.bands().clone();
        let outcomes: BTreeMap<SourceId, SourceOutcome> = gathered
            .into_iter()
            .map(|(id, outcome)| {
                let normalized = match outcome.response {
                    Ok(raw) => normalize(&id, outcome.family, &raw, &bands),
                    Err(failure) => Err(failure),
                };
                (id, normalized)
            })
            .collect();

        let result = self.engine.evaluate(outcomes, &[], None);

        tracing::info!(
            number,
            decision = %result.decision,
            score = result.score,
            reports,
            "phone analysis complete"
        );

        PhoneAnalysis {
            number: number.to_string(),
            result,
            signals,
            reports,
            analyzed_at: Utc::now(),
        }
    }
}

/// Normalize a phone number to digits with an optional leading `+`.
///
/// Accepts common formatting (spaces, dashes, dots, parentheses); rejects
/// anything that does not leave 7-15 digits.
pub fn normalize_number(input: &str) -> Result<String> {
    let trimmed = input.trim();
    let (plus, rest) = match trimmed.strip_prefix('+') {
        Some(rest) => ("+", rest),
        None => ("", trimmed),
    };

    let digits: String = rest
        .chars()
        .filter(|c| !matches!(c, ' ' | '-' | '.' | '(' | ')'))
        .collect();

    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(Error::InvalidInput(format!(
            "not a phone number: {input:?}"
        )));
    }
    if !(7..=15).contains(&digits.len()) {
        return Err(Error::InvalidInput(format!(
            "phone number must have 7-15 digits, got {}",
            digits.len()
        )));
    }

    Ok(format!("{plus}{digits}"))
}
