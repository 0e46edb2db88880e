//! scamlens-scan library interface
//!
//! Exposes the application state, router, and internals for integration
//! testing.

pub mod api;
pub mod collaborators;
pub mod domains;
pub mod error;

pub use crate::error::{ApiError, ApiResult};

use axum::Router;
use chrono::{DateTime, Utc};
use scamlens_common::{AppConfig, MemoryReportStore, ReportStore};
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Application state shared across handlers.
///
/// Configuration and analyzers are read-only after startup; the report
/// store is the only cross-request mutable state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub site: Arc<domains::SiteAnalyzer>,
    pub phone: Arc<domains::PhoneAnalyzer>,
    pub store: Arc<dyn ReportStore>,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
    /// Last degraded-analysis note for diagnostics
    pub last_error: Arc<RwLock<Option<String>>>,
}

impl AppState {
    pub fn new(config: AppConfig) -> Self {
        // One shared HTTP client; per-call timeouts are enforced by the
        // collaborator executor, not the client.
        let http = reqwest::Client::new();

        let store: Arc<dyn ReportStore> =
            Arc::new(MemoryReportStore::new(config.limits.report_store_capacity));
        let site = Arc::new(domains::SiteAnalyzer::from_config(&config, &http));
        let phone = Arc::new(domains::PhoneAnalyzer::from_config(
            &config,
            &http,
            Arc::clone(&store),
        ));

        Self {
            config: Arc::new(config),
            site,
            phone,
            store,
            startup_time: Utc::now(),
            last_error: Arc::new(RwLock::new(None)),
        }
    }

    /// Record a degraded analysis for the health endpoint.
    pub async fn note_degraded(&self, note: String) {
        *self.last_error.write().await = Some(note);
    }
}

/// Build the application router.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .merge(api::health_routes())
        .merge(api::analyze_routes())
        .merge(api::phone_routes())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
