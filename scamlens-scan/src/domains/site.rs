// Site clone-analysis domain.
//
// Collaborators: visual judge, brand matcher, ML classifier, URL
// heuristics. Brand rules are active: a verified brand-domain match fires
// the legitimacy override, an unverified one the mismatch escalation.

use crate::collaborators::{
    url_heuristics, BrandMatcherClient, Collaborator, CollaboratorSet, MlClassifierClient,
    RawOutcome, ScanContext, UrlHeuristics, VisualJudgeClient,
};
use chrono::{DateTime, Utc};
use scamlens_common::AppConfig;
use scamlens_fusion::normalize::{brand_field, normalize};
use scamlens_fusion::weights::WeightBoost;
use scamlens_fusion::{
    BrandEvidence, BrandRegistry, BrandTargets, FusionEngine, FusionResult, SourceId,
    SourceOutcome,
};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use url::Url;

/// Confidence assumed when a detector names a brand without qualifying it.
const UNQUALIFIED_BRAND_CONFIDENCE: f64 = 70.0;

/// Full site-analysis response envelope.
#[derive(Debug, Clone, Serialize)]
pub struct SiteAnalysis {
    pub url: Option<String>,
    #[serde(flatten)]
    pub result: FusionResult,
    /// Raw per-source responses preserved for audit
    pub signals: BTreeMap<SourceId, Value>,
    pub analyzed_at: DateTime<Utc>,
}

pub struct SiteAnalyzer {
    engine: FusionEngine,
    collaborators: CollaboratorSet,
    logo_boost: f64,
    text_boost: f64,
    text_boost_chars: usize,
    page_text_limit: usize,
}

impl SiteAnalyzer {
    pub fn from_config(config: &AppConfig, http: &reqwest::Client) -> Self {
        let engine = FusionEngine::new(
            config.site.band_set(),
            config.site.weights.clone(),
            config.policy.clone(),
        )
        .with_brand_rules(
            BrandRegistry::new(config.brands.clone()),
            BrandTargets {
                mismatch_source: "brand_matcher".to_string(),
                judge_source: "visual_judge".to_string(),
            },
        );

        let collaborators: Vec<Arc<dyn Collaborator>> = vec![
            Arc::new(VisualJudgeClient::new(
                http.clone(),
                &config.providers.visual_judge,
            )),
            Arc::new(BrandMatcherClient::new(
                http.clone(),
                &config.providers.brand_matcher,
            )),
            Arc::new(MlClassifierClient::new(
                http.clone(),
                &config.providers.ml_classifier,
            )),
            Arc::new(UrlHeuristics),
        ];

        Self {
            engine,
            collaborators: CollaboratorSet::new(collaborators),
            logo_boost: config.site.logo_boost,
            text_boost: config.site.text_boost,
            text_boost_chars: config.site.text_boost_chars,
            page_text_limit: config.limits.page_text_limit,
        }
    }

    /// Analyze a page by URL and/or screenshot.
    ///
    /// Infallible once input validation has passed: collaborator failures
    /// degrade the verdict instead of failing the request.
    pub async fn analyze(
        &self,
        url: Option<String>,
        screenshot_b64: Option<String>,
        page_text: Option<String>,
    ) -> SiteAnalysis {
        let registered_domain = url.as_deref().and_then(extract_registered_domain);
        let page_text = page_text.map(|t| truncate_chars(&t, self.page_text_limit));

        let ctx = ScanContext {
            url: url.clone(),
            registered_domain: registered_domain.clone(),
            screenshot_b64,
            page_text: page_text.clone(),
            phone_number: None,
        };

        let gathered = self.collaborators.gather(&ctx).await;
        let evidence = brand_evidence(&gathered, registered_domain.as_deref());
        let boosts = self.contextual_boosts(&gathered, page_text.as_deref());

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

        let result = self.engine.evaluate(outcomes, &boosts, evidence.as_ref());

        tracing::info!(
            url = url.as_deref().unwrap_or("<screenshot only>"),
            decision = %result.decision,
            score = result.score,
            consensus = ?result.consensus,
            "site analysis complete"
        );

        SiteAnalysis {
            url,
            result,
            signals,
            analyzed_at: Utc::now(),
        }
    }

    /// Per-request weight boosts from auxiliary evidence.
    fn contextual_boosts(
        &self,
        gathered: &BTreeMap<SourceId, RawOutcome>,
        page_text: Option<&str>,
    ) -> Vec<WeightBoost> {
        let mut boosts = Vec::new();

        let matcher_found_brand = gathered
            .get("brand_matcher")
            .and_then(|o| o.response.as_ref().ok())
            .and_then(brand_field)
            .is_some();
        if matcher_found_brand {
            boosts.push(WeightBoost::new(
                "brand_matcher",
                self.logo_boost,
                "brand logos detected",
            ));
        }

        if page_text.map(|t| t.chars().count() > self.text_boost_chars) == Some(true) {
            boosts.push(WeightBoost::new(
                "visual_judge",
                self.text_boost,
                "long extracted page text",
            ));
        }

        boosts
    }
}

/// Assemble brand evidence from the gathered detector responses.
///
/// The judge's suspected brand wins over the matcher's; confidence is the
/// strongest the detectors reported, on the 0-100 scale.
fn brand_evidence(
    gathered: &BTreeMap<SourceId, RawOutcome>,
    registered_domain: Option<&str>,
) -> Option<BrandEvidence> {
    let judge_raw = gathered
        .get("visual_judge")
        .and_then(|o| o.response.as_ref().ok());
    let matcher_raw = gathered
        .get("brand_matcher")
        .and_then(|o| o.response.as_ref().ok());

    let detected_brand = judge_raw
        .and_then(brand_field)
        .or_else(|| matcher_raw.and_then(brand_field))?;

    let judge_confidence = judge_raw
        .and_then(|raw| raw.get("confidence"))
        .and_then(Value::as_f64);
    let matcher_confidence = matcher_raw
        .and_then(|raw| raw.get("confidence"))
        .and_then(Value::as_f64)
        .map(|c| c * 100.0);

    let confidence = judge_confidence
        .into_iter()
        .chain(matcher_confidence)
        .fold(0.0_f64, f64::max);
    let confidence = if confidence > 0.0 {
        confidence
    } else {
        UNQUALIFIED_BRAND_CONFIDENCE
    };

    Some(BrandEvidence {
        detected_brand: Some(detected_brand),
        registered_domain: registered_domain.map(str::to_string),
        confidence,
    })
}

fn extract_registered_domain(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let host = parsed.host_str()?;
    Some(url_heuristics::registered_domain(host))
}

fn truncate_chars(text: &str, limit: usize) -> String {
    text.chars().take(limit).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use scamlens_fusion::ProviderFamily;
    use serde_json::json;

    fn raw_ok(family: ProviderFamily, value: Value) -> RawOutcome {
        RawOutcome {
            family,
            response: Ok(value),
        }
    }

    #[test]
    fn test_brand_evidence_prefers_judge_brand() {
        let gathered = BTreeMap::from([
            (
                "visual_judge".to_string(),
                raw_ok(
                    ProviderFamily::VisualJudge,
                    json!({"likelihood": 80, "suspected_brand": "PayPal", "confidence": 85}),
                ),
            ),
            (
                "brand_matcher".to_string(),
                raw_ok(
                    ProviderFamily::BrandMatcher,
                    json!({"is_phishing": true, "confidence": 0.6, "brand": "Amazon"}),
                ),
            ),
        ]);

        let evidence = brand_evidence(&gathered, Some("paypal.com")).unwrap();
        assert_eq!(evidence.detected_brand.as_deref(), Some("PayPal"));
        assert_eq!(evidence.registered_domain.as_deref(), Some("paypal.com"));
        assert_eq!(evidence.confidence, 85.0);
    }

    #[test]
    fn test_brand_evidence_falls_back_to_matcher() {
        let gathered = BTreeMap::from([(
            "brand_matcher".to_string(),
            raw_ok(
                ProviderFamily::BrandMatcher,
                json!({"is_phishing": false, "confidence": 0.9, "brand": "Amazon"}),
            ),
        )]);

        let evidence = brand_evidence(&gathered, None).unwrap();
        assert_eq!(evidence.detected_brand.as_deref(), Some("Amazon"));
        assert_eq!(evidence.confidence, 90.0);
    }

    #[test]
    fn test_no_brand_no_evidence() {
        let gathered = BTreeMap::from([(
            "visual_judge".to_string(),
            raw_ok(ProviderFamily::VisualJudge, json!({"likelihood": 20})),
        )]);
        assert!(brand_evidence(&gathered, Some("example.com")).is_none());
    }

    #[test]
    fn test_unqualified_brand_gets_default_confidence() {
        let gathered = BTreeMap::from([(
            "visual_judge".to_string(),
            raw_ok(
                ProviderFamily::VisualJudge,
                json!({"likelihood": 80, "suspected_brand": "PayPal"}),
            ),
        )]);

        let evidence = brand_evidence(&gathered, None).unwrap();
        assert_eq!(evidence.confidence, UNQUALIFIED_BRAND_CONFIDENCE);
    }

    #[test]
    fn test_extract_registered_domain() {
        assert_eq!(
            extract_registered_domain("https://login.amazon.co.uk/signin").as_deref(),
            Some("amazon.co.uk")
        );
        assert_eq!(extract_registered_domain("not a url"), None);
    }
}
