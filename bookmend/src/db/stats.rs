//! Daily statistics counters
//!
//! Purely observational. Callers log bump failures at warn level and
//! keep going; stats must never stall the pipeline.

use anyhow::Result;
use serde::Serialize;
use sqlx::{Row, SqlitePool};

/// Additive counter bump for one calendar day.
#[derive(Debug, Clone, Copy, Default)]
pub struct StatsDelta {
    pub scanned: i64,
    pub queued: i64,
    pub fixed: i64,
    pub api_calls: i64,
}

/// One row of the daily stats table.
#[derive(Debug, Clone, Serialize)]
pub struct DailyStat {
    pub date: String,
    pub scanned: i64,
    pub queued: i64,
    pub fixed: i64,
    pub api_calls: i64,
}

/// Add the delta to the given day's counters, creating the row if
/// needed. Each column adds its own delta, so concurrent bumps of
/// different counters never clobber each other.
pub async fn bump(pool: &SqlitePool, date: &str, delta: StatsDelta) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO stats (date, scanned, queued, fixed, api_calls)
        VALUES (?, ?, ?, ?, ?)
        ON CONFLICT(date) DO UPDATE SET
            scanned = scanned + excluded.scanned,
            queued = queued + excluded.queued,
            fixed = fixed + excluded.fixed,
            api_calls = api_calls + excluded.api_calls
        "#,
    )
    .bind(date)
    .bind(delta.scanned)
    .bind(delta.queued)
    .bind(delta.fixed)
    .bind(delta.api_calls)
    .execute(pool)
    .await?;

    Ok(())
}

/// Most recent days, newest first.
pub async fn recent_days(pool: &SqlitePool, limit: i64) -> Result<Vec<DailyStat>> {
    let rows = sqlx::query(
        r#"
        SELECT date, scanned, queued, fixed, api_calls
        FROM stats
        ORDER BY date DESC
        LIMIT ?
        "#,
    )
    .bind(limit)
    .fetch_all(pool)
    .await?;

    let stats = rows
        .iter()
        .map(|row| DailyStat {
            date: row.get("date"),
            scanned: row.get("scanned"),
            queued: row.get("queued"),
            fixed: row.get("fixed"),
            api_calls: row.get("api_calls"),
        })
        .collect();

    Ok(stats)
}
