// Phone-reputation provider clients.
//
// Each configured provider (IPQS, Telesign, ...) becomes its own
// collaborator with its own endpoint, timeout, and outbound rate limit.
// Responses are passed through raw; the reputation normalizer owns the
// fraud-score and flag mapping.

use super::{Collaborator, ScanContext};
use async_trait::async_trait;
use governor::{Quota, RateLimiter};
use scamlens_common::config::ProviderEndpoint;
use scamlens_fusion::{ProviderFamily, SourceId};
use serde_json::Value;
use std::num::NonZeroU32;
use std::time::Duration;

type DirectRateLimiter = RateLimiter<
    governor::state::direct::NotKeyed,
    governor::state::InMemoryState,
    governor::clock::DefaultClock,
>;

pub struct ReputationClient {
    provider: String,
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    timeout: Duration,
    /// Some providers meter requests; absent means unmetered
    rate_limiter: Option<DirectRateLimiter>,
}

impl ReputationClient {
    pub fn new(provider: &str, client: reqwest::Client, config: &ProviderEndpoint) -> Self {
        let rate_limiter = config
            .requests_per_second
            .and_then(NonZeroU32::new)
            .map(|rps| RateLimiter::direct(Quota::per_second(rps)));

        Self {
            provider: provider.to_string(),
            client,
            endpoint: config.endpoint.clone(),
            api_key: config.api_key.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
            rate_limiter,
        }
    }
}

#[async_trait]
impl Collaborator for ReputationClient {
    fn source_id(&self) -> SourceId {
        format!("reputation:{}", self.provider)
    }

    fn family(&self) -> ProviderFamily {
        ProviderFamily::Reputation
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn fetch(&self, ctx: &ScanContext) -> anyhow::Result<Value> {
        let number = ctx
            .phone_number
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("reputation lookup requires a phone number"))?;

        if let Some(limiter) = &self.rate_limiter {
            limiter.until_ready().await;
        }

        let mut request = self
            .client
            .get(&self.endpoint)
            .query(&[("number", number)]);
        if let Some(key) = &self.api_key {
            request = request.query(&[("key", key.as_str())]);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            anyhow::bail!("HTTP {}", response.status());
        }

        Ok(response.json().await?)
    }
}
