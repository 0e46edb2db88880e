//! Collaborator clients
//!
//! Each detector the fusion engine consumes is wrapped in a `Collaborator`:
//! an independent, failure-isolated async call with its own timeout. The
//! `CollaboratorSet` runs all of them concurrently; a failed or timed-out
//! collaborator becomes a recorded `SourceFailure` and never blocks the
//! others.
//!
//! Collaborators:
//! 1. **visual_judge** - LLM visual judge (likelihood 0-100, suspected brand)
//! 2. **brand_matcher** - CV clone detector (brand, confidence, phishing flag)
//! 3. **ml_classifier** - trained phishing-URL classifier (label, probability)
//! 4. **url_heuristics** - in-process rule-based URL analysis
//! 5. **reputation:\<provider\>** - phone reputation APIs
//! 6. **user_reports** - community report counts from the report store

pub mod brand_matcher;
pub mod ml_classifier;
pub mod reputation;
pub mod url_heuristics;
pub mod user_reports;
pub mod visual_judge;

pub use brand_matcher::BrandMatcherClient;
pub use ml_classifier::MlClassifierClient;
pub use reputation::ReputationClient;
pub use url_heuristics::UrlHeuristics;
pub use user_reports::UserReportsSource;
pub use visual_judge::VisualJudgeClient;

use async_trait::async_trait;
use futures::future::join_all;
use scamlens_fusion::{ProviderFamily, SourceFailure, SourceId};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

/// Per-request input shared by all collaborators. Each collaborator uses
/// the parts relevant to it and fails cleanly when they are absent.
#[derive(Debug, Clone, Default)]
pub struct ScanContext {
    pub url: Option<String>,
    pub registered_domain: Option<String>,
    /// Base64-encoded page screenshot, forwarded as-is
    pub screenshot_b64: Option<String>,
    pub page_text: Option<String>,
    pub phone_number: Option<String>,
}

/// One independent risk detector.
#[async_trait]
pub trait Collaborator: Send + Sync {
    /// Stable source id, e.g. "visual_judge" or "reputation:ipqs"
    fn source_id(&self) -> SourceId;

    /// Normalization family for this source's responses
    fn family(&self) -> ProviderFamily;

    /// Per-call timeout; exceeding it counts as a failure
    fn timeout(&self) -> Duration;

    /// Fetch this detector's raw response for the request.
    async fn fetch(&self, ctx: &ScanContext) -> anyhow::Result<Value>;
}

/// Raw result of one collaborator call, tagged with its family so the
/// caller can normalize it.
#[derive(Debug, Clone)]
pub struct RawOutcome {
    pub family: ProviderFamily,
    pub response: Result<Value, SourceFailure>,
}

/// Runs all collaborators concurrently with per-source error isolation.
pub struct CollaboratorSet {
    collaborators: Vec<Arc<dyn Collaborator>>,
}

impl CollaboratorSet {
    pub fn new(collaborators: Vec<Arc<dyn Collaborator>>) -> Self {
        Self { collaborators }
    }

    pub fn count(&self) -> usize {
        self.collaborators.len()
    }

    /// Call every collaborator concurrently and collect raw outcomes.
    ///
    /// Failures and timeouts are recorded per source; they never propagate
    /// and never corrupt results already gathered from other sources.
    pub async fn gather(&self, ctx: &ScanContext) -> BTreeMap<SourceId, RawOutcome> {
        let futures = self.collaborators.iter().map(|collaborator| {
            let collaborator = Arc::clone(collaborator);
            let ctx = ctx.clone();
            async move {
                let source_id = collaborator.source_id();
                let family = collaborator.family();
                let timeout = collaborator.timeout();

                let response =
                    match tokio::time::timeout(timeout, collaborator.fetch(&ctx)).await {
                        Ok(Ok(raw)) => {
                            tracing::debug!(source = %source_id, "collaborator responded");
                            Ok(raw)
                        }
                        Ok(Err(error)) => {
                            tracing::warn!(
                                source = %source_id,
                                error = %error,
                                "collaborator failed (isolated)"
                            );
                            Err(SourceFailure::Collaborator(error.to_string()))
                        }
                        Err(_) => {
                            tracing::warn!(
                                source = %source_id,
                                timeout_secs = timeout.as_secs(),
                                "collaborator timed out (isolated)"
                            );
                            Err(SourceFailure::Timeout(timeout.as_secs()))
                        }
                    };

                (source_id, RawOutcome { family, response })
            }
        });

        join_all(futures).await.into_iter().collect()
    }
}

// ============================================================================
// Mock collaborator for testing
// ============================================================================

#[cfg(test)]
pub mod mock {
    use super::*;

    /// Mock collaborator for testing the executor and domain profiles.
    pub struct MockCollaborator {
        pub id: &'static str,
        pub family: ProviderFamily,
        pub response: Result<Value, String>,
        pub delay: Option<Duration>,
        pub timeout: Duration,
    }

    impl MockCollaborator {
        pub fn ok(id: &'static str, family: ProviderFamily, response: Value) -> Self {
            Self {
                id,
                family,
                response: Ok(response),
                delay: None,
                timeout: Duration::from_secs(5),
            }
        }

        pub fn failing(id: &'static str, family: ProviderFamily, error: &str) -> Self {
            Self {
                id,
                family,
                response: Err(error.to_string()),
                delay: None,
                timeout: Duration::from_secs(5),
            }
        }

        pub fn hanging(id: &'static str, family: ProviderFamily) -> Self {
            Self {
                id,
                family,
                response: Ok(Value::Null),
                delay: Some(Duration::from_secs(60)),
                timeout: Duration::from_millis(50),
            }
        }
    }

    #[async_trait]
    impl Collaborator for MockCollaborator {
        fn source_id(&self) -> SourceId {
            self.id.to_string()
        }

        fn family(&self) -> ProviderFamily {
            self.family
        }

        fn timeout(&self) -> Duration {
            self.timeout
        }

        async fn fetch(&self, _ctx: &ScanContext) -> anyhow::Result<Value> {
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            match &self.response {
                Ok(value) => Ok(value.clone()),
                Err(error) => anyhow::bail!("{error}"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::mock::MockCollaborator;
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_gather_all_success() {
        let set = CollaboratorSet::new(vec![
            Arc::new(MockCollaborator::ok(
                "visual_judge",
                ProviderFamily::VisualJudge,
                json!({"likelihood": 40}),
            )),
            Arc::new(MockCollaborator::ok(
                "url_heuristics",
                ProviderFamily::UrlHeuristics,
                json!({"risk": 10}),
            )),
        ]);

        let outcomes = set.gather(&ScanContext::default()).await;
        assert_eq!(outcomes.len(), 2);
        assert!(outcomes["visual_judge"].response.is_ok());
        assert!(outcomes["url_heuristics"].response.is_ok());
    }

    #[tokio::test]
    async fn test_gather_partial_failure_is_isolated() {
        let set = CollaboratorSet::new(vec![
            Arc::new(MockCollaborator::ok(
                "visual_judge",
                ProviderFamily::VisualJudge,
                json!({"likelihood": 40}),
            )),
            Arc::new(MockCollaborator::failing(
                "brand_matcher",
                ProviderFamily::BrandMatcher,
                "connection refused",
            )),
        ]);

        let outcomes = set.gather(&ScanContext::default()).await;
        assert!(outcomes["visual_judge"].response.is_ok());
        match &outcomes["brand_matcher"].response {
            Err(SourceFailure::Collaborator(msg)) => {
                assert!(msg.contains("connection refused"))
            }
            other => panic!("expected collaborator failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_gather_timeout_becomes_failure() {
        let set = CollaboratorSet::new(vec![Arc::new(MockCollaborator::hanging(
            "slow",
            ProviderFamily::Reputation,
        ))]);

        let outcomes = set.gather(&ScanContext::default()).await;
        assert!(matches!(
            outcomes["slow"].response,
            Err(SourceFailure::Timeout(_))
        ));
    }
}
