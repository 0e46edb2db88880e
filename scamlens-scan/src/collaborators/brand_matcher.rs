// Computer-vision brand matcher client.
//
// The matcher compares the page screenshot against known brand logos and
// reports whether the page impersonates a brand. Providers disagree on
// field names (result string vs boolean flag, three different brand keys),
// so the response is mapped to one canonical shape here; the scoring math
// happens later in the normalizer.

use super::{Collaborator, ScanContext};
use async_trait::async_trait;
use scamlens_common::config::ProviderEndpoint;
use scamlens_fusion::normalize::brand_field;
use scamlens_fusion::{ProviderFamily, SourceId};
use serde_json::{json, Value};
use std::time::Duration;

pub struct BrandMatcherClient {
    client: reqwest::Client,
    endpoint: String,
    timeout: Duration,
}

impl BrandMatcherClient {
    pub fn new(client: reqwest::Client, config: &ProviderEndpoint) -> Self {
        Self {
            client,
            endpoint: config.endpoint.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }
}

#[async_trait]
impl Collaborator for BrandMatcherClient {
    fn source_id(&self) -> SourceId {
        "brand_matcher".to_string()
    }

    fn family(&self) -> ProviderFamily {
        ProviderFamily::BrandMatcher
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn fetch(&self, ctx: &ScanContext) -> anyhow::Result<Value> {
        let screenshot = ctx
            .screenshot_b64
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("brand matching requires a screenshot"))?;

        let body = json!({
            "url": ctx.url,
            "image": screenshot,
        });

        let response = self.client.post(&self.endpoint).json(&body).send().await?;
        if !response.status().is_success() {
            anyhow::bail!("HTTP {}", response.status());
        }

        let raw: Value = response.json().await?;
        Ok(canonicalize(raw))
    }
}

/// Map a provider response onto the canonical matcher shape.
pub fn canonicalize(raw: Value) -> Value {
    let is_phishing = raw["is_phishing"].as_bool().unwrap_or_else(|| {
        raw.get("result")
            .and_then(Value::as_str)
            .map(|r| r.eq_ignore_ascii_case("phishing"))
            .unwrap_or(false)
    });

    let confidence = raw
        .get("confidence")
        .and_then(Value::as_f64)
        .unwrap_or(0.0)
        .clamp(0.0, 1.0);

    json!({
        "is_phishing": is_phishing,
        "confidence": confidence,
        "brand": brand_field(&raw),
        "correct_domain": raw.get("correct_domain").and_then(Value::as_str),
        "provider_response": raw,
    })
}
