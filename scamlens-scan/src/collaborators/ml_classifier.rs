// Trained phishing-URL classifier client.
//
// The classifier takes the URL alone and returns a binary label with the
// probability of the phishing class. The response is forwarded unchanged;
// the normalizer owns the score mapping.

use super::{Collaborator, ScanContext};
use async_trait::async_trait;
use scamlens_common::config::ProviderEndpoint;
use scamlens_fusion::{ProviderFamily, SourceId};
use serde_json::{json, Value};
use std::time::Duration;

pub struct MlClassifierClient {
    client: reqwest::Client,
    endpoint: String,
    timeout: Duration,
}

impl MlClassifierClient {
    pub fn new(client: reqwest::Client, config: &ProviderEndpoint) -> Self {
        Self {
            client,
            endpoint: config.endpoint.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }
}

#[async_trait]
impl Collaborator for MlClassifierClient {
    fn source_id(&self) -> SourceId {
        "ml_classifier".to_string()
    }

    fn family(&self) -> ProviderFamily {
        ProviderFamily::MlClassifier
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn fetch(&self, ctx: &ScanContext) -> anyhow::Result<Value> {
        let url = ctx
            .url
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("classifier requires a url"))?;

        let response = self
            .client
            .post(&self.endpoint)
            .json(&json!({ "url": url }))
            .send()
            .await?;
        if !response.status().is_success() {
            anyhow::bail!("HTTP {}", response.status());
        }

        Ok(response.json().await?)
    }
}
