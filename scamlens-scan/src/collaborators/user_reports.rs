// Community report source.
//
// Reads the report store for the request's phone number and exposes the
// count as a signal. In-process, so effectively instant; the timeout is
// nominal.

use super::{Collaborator, ScanContext};
use async_trait::async_trait;
use scamlens_common::ReportStore;
use scamlens_fusion::{ProviderFamily, SourceId};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

pub struct UserReportsSource {
    store: Arc<dyn ReportStore>,
}

impl UserReportsSource {
    pub fn new(store: Arc<dyn ReportStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Collaborator for UserReportsSource {
    fn source_id(&self) -> SourceId {
        "user_reports".to_string()
    }

    fn family(&self) -> ProviderFamily {
        ProviderFamily::UserReports
    }

    fn timeout(&self) -> Duration {
        Duration::from_secs(1)
    }

    async fn fetch(&self, ctx: &ScanContext) -> anyhow::Result<Value> {
        let number = ctx
            .phone_number
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("report lookup requires a phone number"))?;

        let count = self.store.count(number).await;
        Ok(json!({ "count": count }))
    }
}
