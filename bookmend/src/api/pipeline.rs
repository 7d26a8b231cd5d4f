//! Scan and queue-processing endpoints

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::error::{ApiError, ApiResult};
use crate::services::corrector::Corrector;
use crate::services::drain::{DrainError, DrainProgress};
use crate::services::processor::{self, BatchSummary};
use crate::services::scanner;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct ScanResponse {
    pub success: bool,
    pub scanned: i64,
    pub queued: i64,
}

/// POST /api/scan
///
/// Run one scan over the configured library paths.
pub async fn trigger_scan(State(state): State<AppState>) -> ApiResult<Json<ScanResponse>> {
    let settings = state.settings.current();
    let summary = scanner::scan_library(&state.db, &state.lock, &settings.library_paths).await?;

    Ok(Json(ScanResponse {
        success: true,
        scanned: summary.scanned,
        queued: summary.queued,
    }))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ProcessRequest {
    /// Drain the whole queue instead of one batch.
    pub all: bool,
    /// Cap the single batch below the configured size. Zero means no
    /// cap.
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct ProcessResponse {
    pub success: bool,
    pub processed: i64,
    pub fixed: i64,
}

/// POST /api/process
///
/// Process one batch, or with `all` the entire queue. The full drain
/// responds only when done; poll /api/process/status for live progress.
pub async fn process_batch(
    State(state): State<AppState>,
    body: Option<Json<ProcessRequest>>,
) -> ApiResult<Json<ProcessResponse>> {
    let request = body.map(|Json(request)| request).unwrap_or_default();

    let settings = state.settings.current();
    let corrector = Corrector::from_settings(&settings, state.limiter.clone());

    let summary: BatchSummary = if request.all {
        match state
            .drain
            .drain_all(
                &state.db,
                &state.lock,
                &corrector,
                settings.auto_fix,
                settings.batch_size,
            )
            .await
        {
            Ok(summary) => summary,
            Err(DrainError::AlreadyRunning) => {
                return Err(ApiError::Conflict("a drain is already running".to_string()))
            }
            Err(DrainError::Other(e)) => return Err(e.into()),
        }
    } else {
        let limit = request.limit.filter(|&l| l > 0);
        processor::process_queue(
            &state.db,
            &state.lock,
            &corrector,
            settings.auto_fix,
            settings.batch_size,
            limit,
        )
        .await?
    };

    Ok(Json(ProcessResponse {
        success: true,
        processed: summary.processed,
        fixed: summary.fixed,
    }))
}

/// GET /api/process/status
pub async fn process_status(State(state): State<AppState>) -> Json<DrainProgress> {
    Json(state.drain.snapshot().await)
}

/// Build scan/process routes
pub fn pipeline_routes() -> Router<AppState> {
    Router::new()
        .route("/api/scan", post(trigger_scan))
        .route("/api/process", post(process_batch))
        .route("/api/process/status", get(process_status))
}
