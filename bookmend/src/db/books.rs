//! Book catalog operations
//!
//! One row per scanned library folder. Rows are never deleted; a rename
//! re-points the existing row at its new path.

use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, Sqlite, SqlitePool, Transaction};

/// Lifecycle state of a catalogued folder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookStatus {
    /// Discovered, not yet evaluated
    Pending,
    /// Evaluated, nothing to correct
    Verified,
    /// Correction proposed, awaiting operator approval
    PendingFix,
    /// Correction applied to the filesystem
    Fixed,
    /// Rename failed, needs operator follow-up
    Error,
}

impl BookStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookStatus::Pending => "pending",
            BookStatus::Verified => "verified",
            BookStatus::PendingFix => "pending_fix",
            BookStatus::Fixed => "fixed",
            BookStatus::Error => "error",
        }
    }

    pub fn parse(raw: &str) -> Result<Self> {
        match raw {
            "pending" => Ok(BookStatus::Pending),
            "verified" => Ok(BookStatus::Verified),
            "pending_fix" => Ok(BookStatus::PendingFix),
            "fixed" => Ok(BookStatus::Fixed),
            "error" => Ok(BookStatus::Error),
            other => anyhow::bail!("unknown book status: {}", other),
        }
    }
}

/// Catalog record for one library folder.
#[derive(Debug, Clone)]
pub struct Book {
    pub id: i64,
    pub path: String,
    pub current_author: String,
    pub current_title: String,
    pub status: BookStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn book_from_row(row: &SqliteRow) -> Result<Book> {
    let status_raw: String = row.get("status");
    let created_raw: String = row.get("created_at");
    let updated_raw: String = row.get("updated_at");

    Ok(Book {
        id: row.get("id"),
        path: row.get("path"),
        current_author: row.get("current_author"),
        current_title: row.get("current_title"),
        status: BookStatus::parse(&status_raw)?,
        created_at: bookmend_common::time::from_db(&created_raw)?,
        updated_at: bookmend_common::time::from_db(&updated_raw)?,
    })
}

/// Register a newly discovered folder, or return the existing row's id.
/// Returns (id, newly_created).
///
/// Overlapping scans can race the insert; the conflict resolves to
/// "return existing" rather than an error.
pub async fn create_if_missing(
    pool: &SqlitePool,
    path: &str,
    author: &str,
    title: &str,
) -> Result<(i64, bool)> {
    let result = sqlx::query(
        r#"
        INSERT INTO books (path, current_author, current_title, status, created_at, updated_at)
        VALUES (?, ?, ?, 'pending', CURRENT_TIMESTAMP, CURRENT_TIMESTAMP)
        ON CONFLICT(path) DO NOTHING
        "#,
    )
    .bind(path)
    .bind(author)
    .bind(title)
    .execute(pool)
    .await?;

    if result.rows_affected() > 0 {
        return Ok((result.last_insert_rowid(), true));
    }

    let id: i64 = sqlx::query_scalar("SELECT id FROM books WHERE path = ?")
        .bind(path)
        .fetch_one(pool)
        .await?;

    Ok((id, false))
}

/// Load a book by its on-disk path.
pub async fn find_by_path(pool: &SqlitePool, path: &str) -> Result<Option<Book>> {
    let row = sqlx::query(
        r#"
        SELECT id, path, current_author, current_title, status, created_at, updated_at
        FROM books
        WHERE path = ?
        "#,
    )
    .bind(path)
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(book_from_row).transpose()
}

/// Load a book by id.
pub async fn get_book(pool: &SqlitePool, id: i64) -> Result<Option<Book>> {
    let row = sqlx::query(
        r#"
        SELECT id, path, current_author, current_title, status, created_at, updated_at
        FROM books
        WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(book_from_row).transpose()
}

/// Set a book's status.
pub async fn set_status(pool: &SqlitePool, id: i64, status: BookStatus) -> Result<()> {
    sqlx::query("UPDATE books SET status = ?, updated_at = CURRENT_TIMESTAMP WHERE id = ?")
        .bind(status.as_str())
        .bind(id)
        .execute(pool)
        .await?;

    Ok(())
}

/// Transaction variant of [`set_status`], for status changes that must
/// land together with a queue deletion.
pub async fn set_status_tx(
    tx: &mut Transaction<'_, Sqlite>,
    id: i64,
    status: BookStatus,
) -> Result<()> {
    sqlx::query("UPDATE books SET status = ?, updated_at = CURRENT_TIMESTAMP WHERE id = ?")
        .bind(status.as_str())
        .bind(id)
        .execute(&mut **tx)
        .await?;

    Ok(())
}

/// Re-point a book after a rename. Path, author, title and status move
/// in one statement so the row can never half-agree with the disk.
pub async fn update_after_fix(
    tx: &mut Transaction<'_, Sqlite>,
    id: i64,
    new_path: &str,
    new_author: &str,
    new_title: &str,
    status: BookStatus,
) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE books
        SET path = ?, current_author = ?, current_title = ?, status = ?,
            updated_at = CURRENT_TIMESTAMP
        WHERE id = ?
        "#,
    )
    .bind(new_path)
    .bind(new_author)
    .bind(new_title)
    .bind(status.as_str())
    .bind(id)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

/// Count all catalogued books.
pub async fn count_books(pool: &SqlitePool) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM books")
        .fetch_one(pool)
        .await?;
    Ok(count)
}

/// Count books in one status.
pub async fn count_by_status(pool: &SqlitePool, status: BookStatus) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM books WHERE status = ?")
        .bind(status.as_str())
        .fetch_one(pool)
        .await?;
    Ok(count)
}
