//! Background worker control endpoints

use axum::{extract::State, routing::post, Json, Router};
use serde::Serialize;

use crate::AppState;

#[derive(Debug, Serialize)]
pub struct WorkerResponse {
    pub success: bool,
}

/// POST /api/worker/start
///
/// Idempotent; starting a live worker is a no-op.
pub async fn start_worker(State(state): State<AppState>) -> Json<WorkerResponse> {
    state.worker.start(state.worker_context()).await;
    Json(WorkerResponse { success: true })
}

/// POST /api/worker/stop
///
/// Requests a stop; a cycle in flight finishes first.
pub async fn stop_worker(State(state): State<AppState>) -> Json<WorkerResponse> {
    state.worker.stop().await;
    Json(WorkerResponse { success: true })
}

/// Build worker control routes
pub fn worker_routes() -> Router<AppState> {
    Router::new()
        .route("/api/worker/start", post(start_worker))
        .route("/api/worker/stop", post(stop_worker))
}
