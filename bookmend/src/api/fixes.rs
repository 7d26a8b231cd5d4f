//! Fix application and queue removal endpoints

use axum::{
    extract::{Path, State},
    routing::{delete, post},
    Json, Router,
};
use serde::Serialize;

use crate::db::queue;
use crate::error::{ApiError, ApiResult};
use crate::services::processor::{self, FixOutcome};
use crate::AppState;

/// POST /api/fixes/:history_id/apply
///
/// Apply a staged fix. An inapplicable fix (unknown id, source folder
/// gone, rename failure) is a successful request whose outcome reports
/// failure, matching the queue dashboard's expectations.
pub async fn apply_fix(
    State(state): State<AppState>,
    Path(history_id): Path<i64>,
) -> ApiResult<Json<FixOutcome>> {
    let outcome = processor::apply_fix(&state.db, &state.lock, history_id).await?;
    Ok(Json(outcome))
}

#[derive(Debug, Serialize)]
pub struct RemoveResponse {
    pub success: bool,
}

/// DELETE /api/queue/:queue_id
///
/// Drop a queue entry and mark its book verified.
pub async fn remove_from_queue(
    State(state): State<AppState>,
    Path(queue_id): Path<i64>,
) -> ApiResult<Json<RemoveResponse>> {
    let _guard = state.lock.acquire().await;

    match queue::remove_and_verify(&state.db, queue_id).await? {
        Some(_) => Ok(Json(RemoveResponse { success: true })),
        None => Err(ApiError::NotFound(format!(
            "queue entry {} not found",
            queue_id
        ))),
    }
}

/// Build fix routes
pub fn fix_routes() -> Router<AppState> {
    Router::new()
        .route("/api/fixes/:history_id/apply", post(apply_fix))
        .route("/api/queue/:queue_id", delete(remove_from_queue))
}
