use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};

use crate::application::MonitoringService;
use crate::domain::sample::UnknownColumn;
use crate::domain::MetricColumn;
use crate::ports::ChartError;

/// Error type that implements IntoResponse
#[derive(Debug)]
pub struct AppError(StatusCode, String);

impl AppError {
    fn no_data() -> Self {
        AppError(StatusCode::NOT_FOUND, "no metrics collected yet".to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        (self.0, self.1).into_response()
    }
}

impl From<ChartError> for AppError {
    fn from(err: ChartError) -> Self {
        match err {
            ChartError::NoData(_) => AppError::no_data(),
            other => AppError(StatusCode::INTERNAL_SERVER_ERROR, other.to_string()),
        }
    }
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub monitoring_service: Arc<MonitoringService>,
}

/// Handler for GET /api/health
pub async fn health_handler() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::OK,
        Json(serde_json::json!({
            "status": "healthy",
            "service": "hostsentry"
        })),
    )
}

/// Handler for GET /api/latest
pub async fn latest_handler(State(state): State<AppState>) -> Result<Response, AppError> {
    let sample = state
        .monitoring_service
        .latest()
        .await
        .ok_or_else(AppError::no_data)?;
    Ok(Json(sample).into_response())
}

/// Handler for GET /api/report
pub async fn report_handler(State(state): State<AppState>) -> Result<String, AppError> {
    state
        .monitoring_service
        .current_report()
        .await
        .ok_or_else(AppError::no_data)
}

/// Handler for GET /api/stats
pub async fn stats_handler(State(state): State<AppState>) -> Result<Response, AppError> {
    let stats = state
        .monitoring_service
        .statistics()
        .await
        .ok_or_else(AppError::no_data)?;
    Ok(Json(stats).into_response())
}

/// Handler for GET /api/status (live reading, not stored)
pub async fn status_handler(State(state): State<AppState>) -> Result<String, AppError> {
    state
        .monitoring_service
        .live_status()
        .await
        .map_err(|e| AppError(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
}

/// Handler for GET /api/chart/{column}
pub async fn chart_handler(
    State(state): State<AppState>,
    Path(column): Path<String>,
) -> Result<Response, AppError> {
    let column: MetricColumn = column
        .parse()
        .map_err(|e: UnknownColumn| AppError(StatusCode::BAD_REQUEST, e.to_string()))?;

    let chart = state.monitoring_service.chart(column).await?;
    Ok(([(header::CONTENT_TYPE, chart.mime_type)], chart.bytes).into_response())
}
