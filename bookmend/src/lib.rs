//! Bookmend library interface
//!
//! Exposes the application state, router and service modules for
//! integration testing.

pub mod api;
pub mod db;
pub mod error;
pub mod services;

pub use crate::error::{ApiError, ApiResult};

use axum::Router;
use bookmend_common::config::SettingsSource;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::services::corrector::RateLimiter;
use crate::services::drain::DrainController;
use crate::services::worker::{WorkerContext, WorkerHandle};
use crate::services::PipelineLock;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    /// Config file source, re-read on demand
    pub settings: SettingsSource,
    /// Serializes scans, batch processing, fix application and queue
    /// removal
    pub lock: PipelineLock,
    /// Full-queue drain state
    pub drain: DrainController,
    /// Process-wide AI request spacing
    pub limiter: Arc<RateLimiter>,
    /// Background worker handle
    pub worker: Arc<WorkerHandle>,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(db: SqlitePool, settings: SettingsSource) -> Self {
        Self {
            db,
            settings,
            lock: PipelineLock::new(),
            drain: DrainController::new(),
            limiter: Arc::new(RateLimiter::new()),
            worker: Arc::new(WorkerHandle::new()),
            startup_time: Utc::now(),
        }
    }

    /// Context for the background worker. It shares this state's
    /// pipeline lock, drain controller and rate limiter, so worker
    /// cycles and API requests coordinate through the same instances.
    pub fn worker_context(&self) -> WorkerContext {
        WorkerContext {
            pool: self.db.clone(),
            settings: self.settings.clone(),
            lock: self.lock.clone(),
            drain: self.drain.clone(),
            limiter: self.limiter.clone(),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::pipeline_routes())
        .merge(api::catalog_routes())
        .merge(api::fix_routes())
        .merge(api::worker_routes())
        .merge(api::health_routes())
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
