//! Site clone-analysis endpoint

use axum::{extract::State, routing::post, Json, Router};
use base64::Engine;
use scamlens_fusion::ConsensusLevel;
use serde::Deserialize;

use crate::domains::SiteAnalysis;
use crate::{ApiError, ApiResult, AppState};

#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
    pub url: Option<String>,
    /// Base64-encoded page screenshot
    pub screenshot: Option<String>,
    /// Text extracted from the page, when the caller has it
    pub page_text: Option<String>,
}

/// POST /analyze
///
/// Always answers with a verdict once input validation passes; collaborator
/// failures are reported in the `errors` field of a degraded result, never
/// as an HTTP error.
pub async fn analyze(
    State(state): State<AppState>,
    Json(request): Json<AnalyzeRequest>,
) -> ApiResult<Json<SiteAnalysis>> {
    let url = request.url.filter(|u| !u.trim().is_empty());
    let screenshot = request.screenshot.filter(|s| !s.trim().is_empty());

    if url.is_none() && screenshot.is_none() {
        return Err(ApiError::BadRequest(
            "either url or screenshot is required".to_string(),
        ));
    }

    if let Some(encoded) = &screenshot {
        base64::engine::general_purpose::STANDARD
            .decode(encoded)
            .map_err(|_| ApiError::BadRequest("screenshot is not valid base64".to_string()))?;
    }

    let analysis = state.site.analyze(url, screenshot, request.page_text).await;

    if analysis.result.consensus == ConsensusLevel::Error {
        state
            .note_degraded(format!(
                "site analysis degraded: {} source error(s)",
                analysis.result.errors.len()
            ))
            .await;
    }

    Ok(Json(analysis))
}

/// Build site-analysis routes
pub fn analyze_routes() -> Router<AppState> {
    Router::new().route("/analyze", post(analyze))
}
