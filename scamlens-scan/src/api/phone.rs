//! Phone-reputation endpoints

use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::domains::phone::normalize_number;
use crate::domains::PhoneAnalysis;
use crate::{ApiError, ApiResult, AppState};
use scamlens_common::ScamReport;

#[derive(Debug, Deserialize)]
pub struct PhoneAnalyzeRequest {
    pub number: String,
}

#[derive(Debug, Deserialize)]
pub struct ReportRequest {
    pub number: String,
    pub comment: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ReportResponse {
    pub report: ScamReport,
    /// Total reports now on file for this number
    pub total: usize,
}

#[derive(Debug, Serialize)]
pub struct ReportsResponse {
    pub number: String,
    pub count: usize,
    pub recent: Vec<ScamReport>,
}

/// POST /phone/analyze
pub async fn analyze_phone(
    State(state): State<AppState>,
    Json(request): Json<PhoneAnalyzeRequest>,
) -> ApiResult<Json<PhoneAnalysis>> {
    let number =
        normalize_number(&request.number).map_err(|e| ApiError::BadRequest(e.to_string()))?;
    Ok(Json(state.phone.analyze(&number).await))
}

/// POST /phone/report
pub async fn submit_report(
    State(state): State<AppState>,
    Json(request): Json<ReportRequest>,
) -> ApiResult<Json<ReportResponse>> {
    let number =
        normalize_number(&request.number).map_err(|e| ApiError::BadRequest(e.to_string()))?;
    let comment = request
        .comment
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty());

    let report = state.store.record(&number, comment).await?;
    let total = state.store.count(&number).await;

    tracing::info!(number = %number, total, "community report recorded");
    Ok(Json(ReportResponse { report, total }))
}

/// GET /phone/reports/:number
pub async fn get_reports(
    State(state): State<AppState>,
    Path(number): Path<String>,
) -> ApiResult<Json<ReportsResponse>> {
    let number = normalize_number(&number).map_err(|e| ApiError::BadRequest(e.to_string()))?;
    let count = state.store.count(&number).await;
    let recent = state.store.recent(&number, 20).await;

    Ok(Json(ReportsResponse {
        number,
        count,
        recent,
    }))
}

/// Build phone routes
pub fn phone_routes() -> Router<AppState> {
    Router::new()
        .route("/phone/analyze", post(analyze_phone))
        .route("/phone/report", post(submit_report))
        .route("/phone/reports/:number", get(get_reports))
}
