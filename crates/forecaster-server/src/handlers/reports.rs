//! Forecast and report download handlers

use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::Response,
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{AppError, AppState};
use forecaster_core::{
    Classification, ReportFormat, ReportRenderer, ScoreBreakdown, MAX_SCORE,
};

/// Result of a forecast run
#[derive(Debug, Serialize)]
pub struct ForecastResponse {
    pub score: u32,
    pub max_score: u32,
    pub classification: Classification,
    pub headline: &'static str,
    pub breakdown: ScoreBreakdown,
}

/// Query parameters for report download
#[derive(Debug, Deserialize)]
pub struct ReportQuery {
    #[serde(default)]
    pub format: Option<String>,
}

/// POST /api/sessions/:id/forecast - Score the current workspace
pub async fn run_forecast(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Result<Json<ForecastResponse>, AppError> {
    let (result, _) = state
        .sessions
        .with_session(&session_id, |store| store.compute_forecast())
        .await
        .ok_or_else(AppError::session_not_found)??;

    info!(
        session_id = %session_id,
        score = result.score(),
        classification = %result.classification(),
        "Forecast computed"
    );

    Ok(Json(ForecastResponse {
        score: result.score(),
        max_score: MAX_SCORE,
        classification: result.classification(),
        headline: result.classification().headline(),
        breakdown: *result.breakdown(),
    }))
}

/// GET /api/sessions/:id/report?format=pdf|json - Download the report
///
/// The forecast is recomputed from the current workspace so the report
/// always matches what the session holds.
pub async fn download_report(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
    Query(params): Query<ReportQuery>,
) -> Result<Response<Body>, AppError> {
    let format: ReportFormat = match params.format.as_deref() {
        Some(s) => s.parse().map_err(|e: String| AppError::bad_request(&e))?,
        None => ReportFormat::default(),
    };

    let (_, document) = state
        .sessions
        .with_session(&session_id, |store| store.compute_forecast())
        .await
        .ok_or_else(AppError::session_not_found)??;

    // Render outside the session lock
    let bytes = ReportRenderer::default().render(&document, format)?;

    info!(
        session_id = %session_id,
        format = %format,
        bytes = bytes.len(),
        "Report downloaded"
    );

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, format.mime_type())
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", document.file_name(format)),
        )
        .body(Body::from(bytes))
        .map_err(|e| AppError::internal(&e.to_string()))
}
