//! Database initialization
//!
//! Creates the catalog database on first run and brings the schema up
//! idempotently on every start.

use crate::Result;
use sqlx::{SqlitePool, sqlite::SqlitePoolOptions};
use std::path::Path;
use tracing::info;

/// Initialize database connection and create tables if needed.
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(&db_url)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    configure_pragmas(&pool).await?;
    create_schema(&pool).await?;

    Ok(pool)
}

/// Initialize an in-memory database with the full schema. Test use only,
/// but lives here so integration tests across crates share one definition.
pub async fn init_memory_database() -> Result<SqlitePool> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await?;

    configure_pragmas(&pool).await?;
    create_schema(&pool).await?;

    Ok(pool)
}

async fn configure_pragmas(pool: &SqlitePool) -> Result<()> {
    // Enable foreign keys
    sqlx::query("PRAGMA foreign_keys = ON")
        .execute(pool)
        .await?;

    // WAL keeps readers unblocked while the pipeline writes
    sqlx::query("PRAGMA journal_mode = WAL")
        .execute(pool)
        .await?;

    sqlx::query("PRAGMA busy_timeout = 5000")
        .execute(pool)
        .await?;

    Ok(())
}

/// Run all table creations (idempotent, safe to call multiple times).
pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    create_books_table(pool).await?;
    create_queue_table(pool).await?;
    create_history_table(pool).await?;
    create_stats_table(pool).await?;

    Ok(())
}

/// Create the books table
///
/// One row per discovered library folder; `path` is the dedup key and
/// rows are never deleted, only re-pointed when a folder is renamed.
pub async fn create_books_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS books (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            path TEXT NOT NULL UNIQUE,
            current_author TEXT NOT NULL,
            current_title TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'pending'
                CHECK (status IN ('pending', 'verified', 'pending_fix', 'fixed', 'error')),
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_books_status ON books(status)")
        .execute(pool)
        .await?;

    Ok(())
}

/// Create the queue table
///
/// Live work items awaiting AI evaluation. UNIQUE(book_id) backs the
/// one-live-entry-per-book rule even under overlapping scans.
pub async fn create_queue_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS queue (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            book_id INTEGER NOT NULL UNIQUE REFERENCES books(id) ON DELETE CASCADE,
            priority INTEGER NOT NULL DEFAULT 5,
            reason TEXT,
            added_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_queue_order ON queue(priority, added_at)")
        .execute(pool)
        .await?;

    Ok(())
}

/// Create the history table
///
/// Write-once audit log of proposed corrections; in manual mode a row
/// doubles as the pending fix that apply_fix later acts on.
pub async fn create_history_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS history (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            book_id INTEGER NOT NULL REFERENCES books(id) ON DELETE CASCADE,
            old_author TEXT NOT NULL,
            old_title TEXT NOT NULL,
            new_author TEXT NOT NULL,
            new_title TEXT NOT NULL,
            old_path TEXT NOT NULL,
            new_path TEXT NOT NULL,
            fixed_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_history_book ON history(book_id)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_history_fixed_at ON history(fixed_at)")
        .execute(pool)
        .await?;

    Ok(())
}

/// Create the stats table
///
/// One row per local calendar day, counters bumped additively.
pub async fn create_stats_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS stats (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            date TEXT NOT NULL UNIQUE,
            scanned INTEGER NOT NULL DEFAULT 0,
            queued INTEGER NOT NULL DEFAULT 0,
            fixed INTEGER NOT NULL DEFAULT 0,
            api_calls INTEGER NOT NULL DEFAULT 0,
            CHECK (scanned >= 0),
            CHECK (queued >= 0),
            CHECK (fixed >= 0),
            CHECK (api_calls >= 0)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}
