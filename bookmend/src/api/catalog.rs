//! Read-only listing endpoints: stats, queue and history

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::db::books::{self, BookStatus};
use crate::db::{history, queue, stats};
use crate::error::ApiResult;
use crate::services::drain::DrainProgress;
use crate::AppState;

const DAILY_STATS_DAYS: i64 = 7;
const HISTORY_PER_PAGE: i64 = 50;

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub total_books: i64,
    pub queue_size: i64,
    pub fixed: i64,
    pub pending_fixes: i64,
    pub verified: i64,
    pub worker_running: bool,
    pub processing: DrainProgress,
}

/// GET /api/stats
pub async fn get_stats(State(state): State<AppState>) -> ApiResult<Json<StatsResponse>> {
    Ok(Json(StatsResponse {
        total_books: books::count_books(&state.db).await?,
        queue_size: queue::queue_length(&state.db).await?,
        fixed: books::count_by_status(&state.db, BookStatus::Fixed).await?,
        pending_fixes: books::count_by_status(&state.db, BookStatus::PendingFix).await?,
        verified: books::count_by_status(&state.db, BookStatus::Verified).await?,
        worker_running: state.worker.is_running().await,
        processing: state.drain.snapshot().await,
    }))
}

#[derive(Debug, Serialize)]
pub struct DailyStatsResponse {
    pub days: Vec<stats::DailyStat>,
}

/// GET /api/stats/daily
pub async fn get_daily_stats(State(state): State<AppState>) -> ApiResult<Json<DailyStatsResponse>> {
    let days = stats::recent_days(&state.db, DAILY_STATS_DAYS).await?;
    Ok(Json(DailyStatsResponse { days }))
}

#[derive(Debug, Serialize)]
pub struct QueueEntry {
    pub id: i64,
    pub reason: Option<String>,
    pub added_at: DateTime<Utc>,
    pub book_id: i64,
    pub path: String,
    pub current_author: String,
    pub current_title: String,
}

#[derive(Debug, Serialize)]
pub struct QueueResponse {
    pub items: Vec<QueueEntry>,
    pub count: usize,
}

/// GET /api/queue
pub async fn get_queue(State(state): State<AppState>) -> ApiResult<Json<QueueResponse>> {
    let items: Vec<QueueEntry> = queue::list_queue(&state.db)
        .await?
        .into_iter()
        .map(|item| QueueEntry {
            id: item.queue_id,
            reason: item.reason,
            added_at: item.added_at,
            book_id: item.book_id,
            path: item.path,
            current_author: item.current_author,
            current_title: item.current_title,
        })
        .collect();
    let count = items.len();

    Ok(Json(QueueResponse { items, count }))
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    #[serde(default = "default_page")]
    pub page: i64,
}

fn default_page() -> i64 {
    1
}

#[derive(Debug, Serialize)]
pub struct HistoryEntry {
    pub id: i64,
    pub book_id: i64,
    pub old_author: String,
    pub old_title: String,
    pub new_author: String,
    pub new_title: String,
    pub old_path: String,
    pub new_path: String,
    pub fixed_at: DateTime<Utc>,
    /// The book's current status, so a staged fix shows as pending_fix
    /// until applied.
    pub status: String,
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub items: Vec<HistoryEntry>,
    pub page: i64,
    pub total_pages: i64,
    pub total: i64,
}

/// GET /api/history?page=N
pub async fn get_history(
    State(state): State<AppState>,
    Query(query): Query<HistoryQuery>,
) -> ApiResult<Json<HistoryResponse>> {
    let page = query.page.max(1);
    let offset = (page - 1) * HISTORY_PER_PAGE;

    let total = history::count_history(&state.db).await?;
    let rows = history::list_page(&state.db, HISTORY_PER_PAGE, offset).await?;

    let items: Vec<HistoryEntry> = rows
        .into_iter()
        .map(|row| HistoryEntry {
            id: row.record.id,
            book_id: row.record.book_id,
            old_author: row.record.old_author,
            old_title: row.record.old_title,
            new_author: row.record.new_author,
            new_title: row.record.new_title,
            old_path: row.record.old_path,
            new_path: row.record.new_path,
            fixed_at: row.record.fixed_at,
            status: row.book_status.as_str().to_string(),
        })
        .collect();

    let total_pages = (total + HISTORY_PER_PAGE - 1) / HISTORY_PER_PAGE;

    Ok(Json(HistoryResponse {
        items,
        page,
        total_pages,
        total,
    }))
}

/// Build listing routes
pub fn catalog_routes() -> Router<AppState> {
    Router::new()
        .route("/api/stats", get(get_stats))
        .route("/api/stats/daily", get(get_daily_stats))
        .route("/api/queue", get(get_queue))
        .route("/api/history", get(get_history))
}
