//! Fix queue operations
//!
//! Live work items awaiting AI evaluation. Every read joins the books
//! table because a queue entry is meaningless without its folder names.

use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, Sqlite, SqlitePool, Transaction};

/// A queued book joined with its catalog row.
#[derive(Debug, Clone)]
pub struct QueueItem {
    pub queue_id: i64,
    pub book_id: i64,
    pub priority: i64,
    pub reason: Option<String>,
    pub added_at: DateTime<Utc>,
    pub path: String,
    pub current_author: String,
    pub current_title: String,
}

fn item_from_row(row: &SqliteRow) -> Result<QueueItem> {
    let added_raw: String = row.get("added_at");

    Ok(QueueItem {
        queue_id: row.get("queue_id"),
        book_id: row.get("book_id"),
        priority: row.get("priority"),
        reason: row.get("reason"),
        added_at: bookmend_common::time::from_db(&added_raw)?,
        path: row.get("path"),
        current_author: row.get("current_author"),
        current_title: row.get("current_title"),
    })
}

/// Queue a book for evaluation. Returns false when the book already has
/// a live entry; the existing entry and its reason are kept.
pub async fn enqueue(pool: &SqlitePool, book_id: i64, reason: &str) -> Result<bool> {
    let result = sqlx::query(
        r#"
        INSERT INTO queue (book_id, reason, added_at)
        VALUES (?, ?, CURRENT_TIMESTAMP)
        ON CONFLICT(book_id) DO NOTHING
        "#,
    )
    .bind(book_id)
    .bind(reason)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Whether a book currently has a live queue entry.
pub async fn has_live_entry(pool: &SqlitePool, book_id: i64) -> Result<bool> {
    let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM queue WHERE book_id = ?)")
        .bind(book_id)
        .fetch_one(pool)
        .await?;
    Ok(exists)
}

/// Pull the next batch: priority ascending, then enqueue time, then id
/// as the final tie-break so repeated pulls are deterministic.
pub async fn next_batch(pool: &SqlitePool, limit: i64) -> Result<Vec<QueueItem>> {
    let rows = sqlx::query(
        r#"
        SELECT q.id AS queue_id, q.book_id, q.priority, q.reason, q.added_at,
               b.path, b.current_author, b.current_title
        FROM queue q
        JOIN books b ON q.book_id = b.id
        ORDER BY q.priority, q.added_at, q.id
        LIMIT ?
        "#,
    )
    .bind(limit)
    .fetch_all(pool)
    .await?;

    rows.iter().map(item_from_row).collect()
}

/// All live entries in pull order.
pub async fn list_queue(pool: &SqlitePool) -> Result<Vec<QueueItem>> {
    let rows = sqlx::query(
        r#"
        SELECT q.id AS queue_id, q.book_id, q.priority, q.reason, q.added_at,
               b.path, b.current_author, b.current_title
        FROM queue q
        JOIN books b ON q.book_id = b.id
        ORDER BY q.priority, q.added_at, q.id
        "#,
    )
    .fetch_all(pool)
    .await?;

    rows.iter().map(item_from_row).collect()
}

/// Count live entries.
pub async fn queue_length(pool: &SqlitePool) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM queue")
        .fetch_one(pool)
        .await?;
    Ok(count)
}

/// Delete one entry inside a larger transaction.
pub async fn delete_entry_tx(tx: &mut Transaction<'_, Sqlite>, queue_id: i64) -> Result<()> {
    sqlx::query("DELETE FROM queue WHERE id = ?")
        .bind(queue_id)
        .execute(&mut **tx)
        .await?;

    Ok(())
}

/// Delete a book's live entry, if any, inside a larger transaction.
/// Used when a fix re-points the book's path and any queued evaluation
/// of the old path becomes stale.
pub async fn delete_for_book_tx(tx: &mut Transaction<'_, Sqlite>, book_id: i64) -> Result<()> {
    sqlx::query("DELETE FROM queue WHERE book_id = ?")
        .bind(book_id)
        .execute(&mut **tx)
        .await?;

    Ok(())
}

/// Remove an entry by id and mark its book verified, as one unit.
/// Returns the book id, or None when no such entry exists.
pub async fn remove_and_verify(pool: &SqlitePool, queue_id: i64) -> Result<Option<i64>> {
    let mut tx = pool.begin().await?;

    let book_id: Option<i64> = sqlx::query_scalar("SELECT book_id FROM queue WHERE id = ?")
        .bind(queue_id)
        .fetch_optional(&mut *tx)
        .await?;

    let Some(book_id) = book_id else {
        return Ok(None);
    };

    sqlx::query("DELETE FROM queue WHERE id = ?")
        .bind(queue_id)
        .execute(&mut *tx)
        .await?;
    sqlx::query("UPDATE books SET status = 'verified', updated_at = CURRENT_TIMESTAMP WHERE id = ?")
        .bind(book_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(Some(book_id))
}
