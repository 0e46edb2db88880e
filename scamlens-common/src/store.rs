//! Bounded in-memory report store
//!
//! Community scam reports live behind the `ReportStore` trait so a
//! persistent backend can be substituted without touching the fusion logic.
//! The reference implementation is a capacity-bounded in-memory map with
//! FIFO eviction.

use crate::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};
use tokio::sync::RwLock;
use uuid::Uuid;

/// One community report about a subject (phone number, URL, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScamReport {
    pub id: Uuid,
    /// What was reported, e.g. a normalized phone number
    pub subject: String,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Storage interface for community reports.
#[async_trait]
pub trait ReportStore: Send + Sync {
    /// Record one report and return it with its assigned id.
    async fn record(&self, subject: &str, comment: Option<String>) -> Result<ScamReport>;

    /// Number of reports currently held for a subject.
    async fn count(&self, subject: &str) -> usize;

    /// Most recent reports for a subject, newest first.
    async fn recent(&self, subject: &str, limit: usize) -> Vec<ScamReport>;
}

struct StoreInner {
    by_subject: BTreeMap<String, Vec<ScamReport>>,
    /// Insertion order across all subjects, for FIFO eviction
    order: VecDeque<(String, Uuid)>,
}

/// Capacity-bounded in-memory `ReportStore`.
///
/// When the global capacity is exceeded the oldest report (across all
/// subjects) is evicted.
pub struct MemoryReportStore {
    capacity: usize,
    inner: RwLock<StoreInner>,
}

impl MemoryReportStore {
    pub fn new(capacity: usize) -> Self {
        Self {
            // A zero capacity would evict every insert immediately
            capacity: capacity.max(1),
            inner: RwLock::new(StoreInner {
                by_subject: BTreeMap::new(),
                order: VecDeque::new(),
            }),
        }
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.order.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl ReportStore for MemoryReportStore {
    async fn record(&self, subject: &str, comment: Option<String>) -> Result<ScamReport> {
        let report = ScamReport {
            id: Uuid::new_v4(),
            subject: subject.to_string(),
            comment,
            created_at: Utc::now(),
        };

        let mut inner = self.inner.write().await;
        inner
            .by_subject
            .entry(report.subject.clone())
            .or_default()
            .push(report.clone());
        inner
            .order
            .push_back((report.subject.clone(), report.id));

        while inner.order.len() > self.capacity {
            if let Some((evicted_subject, evicted_id)) = inner.order.pop_front() {
                if let Some(reports) = inner.by_subject.get_mut(&evicted_subject) {
                    reports.retain(|r| r.id != evicted_id);
                    if reports.is_empty() {
                        inner.by_subject.remove(&evicted_subject);
                    }
                }
                tracing::debug!(subject = %evicted_subject, "evicted oldest report (store at capacity)");
            }
        }

        Ok(report)
    }

    async fn count(&self, subject: &str) -> usize {
        self.inner
            .read()
            .await
            .by_subject
            .get(subject)
            .map(Vec::len)
            .unwrap_or(0)
    }

    async fn recent(&self, subject: &str, limit: usize) -> Vec<ScamReport> {
        let inner = self.inner.read().await;
        match inner.by_subject.get(subject) {
            Some(reports) => reports.iter().rev().take(limit).cloned().collect(),
            None => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_record_and_count() {
        let store = MemoryReportStore::new(100);
        store.record("+15551234567", None).await.unwrap();
        store
            .record("+15551234567", Some("robocall".to_string()))
            .await
            .unwrap();
        store.record("+15559999999", None).await.unwrap();

        assert_eq!(store.count("+15551234567").await, 2);
        assert_eq!(store.count("+15559999999").await, 1);
        assert_eq!(store.count("+15550000000").await, 0);
        assert_eq!(store.len().await, 3);
    }

    #[tokio::test]
    async fn test_recent_newest_first() {
        let store = MemoryReportStore::new(100);
        store
            .record("+15551234567", Some("first".to_string()))
            .await
            .unwrap();
        store
            .record("+15551234567", Some("second".to_string()))
            .await
            .unwrap();

        let recent = store.recent("+15551234567", 10).await;
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].comment.as_deref(), Some("second"));
        assert_eq!(recent[1].comment.as_deref(), Some("first"));

        let limited = store.recent("+15551234567", 1).await;
        assert_eq!(limited.len(), 1);
        assert_eq!(limited[0].comment.as_deref(), Some("second"));
    }

    #[tokio::test]
    async fn test_fifo_eviction_at_capacity() {
        let store = MemoryReportStore::new(3);
        store.record("a", None).await.unwrap();
        store.record("b", None).await.unwrap();
        store.record("c", None).await.unwrap();
        store.record("d", None).await.unwrap();

        assert_eq!(store.len().await, 3);
        // Oldest subject "a" was evicted
        assert_eq!(store.count("a").await, 0);
        assert_eq!(store.count("d").await, 1);
    }

    #[tokio::test]
    async fn test_zero_capacity_clamps_to_one() {
        let store = MemoryReportStore::new(0);
        store.record("a", None).await.unwrap();
        assert_eq!(store.count("a").await, 1);
    }
}
