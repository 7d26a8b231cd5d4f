//! Unit tests for database initialization
//!
//! The catalog database is created automatically on first run; schema
//! creation is idempotent so reopening an existing database is safe.

use bookmend_common::db::{init_database, init_memory_database};
use tempfile::TempDir;

#[tokio::test]
async fn test_database_creation_when_missing() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("data").join("bookmend.db");

    assert!(!db_path.exists());

    let result = init_database(&db_path).await;
    assert!(result.is_ok(), "Database initialization failed: {:?}", result.err());

    // Parent directory and database file were created
    assert!(db_path.exists(), "Database file was not created");
}

#[tokio::test]
async fn test_database_opens_existing() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("bookmend.db");

    let pool1 = init_database(&db_path).await;
    assert!(pool1.is_ok());
    pool1.unwrap().close().await;

    let pool2 = init_database(&db_path).await;
    assert!(pool2.is_ok(), "Failed to open existing database: {:?}", pool2.err());
}

#[tokio::test]
async fn test_all_tables_created() {
    let pool = init_memory_database().await.unwrap();

    for table in ["books", "queue", "history", "stats"] {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?",
        )
        .bind(table)
        .fetch_one(&pool)
        .await
        .unwrap();

        assert_eq!(count, 1, "table {} missing", table);
    }
}

#[tokio::test]
async fn test_books_path_unique() {
    let pool = init_memory_database().await.unwrap();

    sqlx::query("INSERT INTO books (path, current_author, current_title) VALUES (?, ?, ?)")
        .bind("/lib/A/B")
        .bind("A")
        .bind("B")
        .execute(&pool)
        .await
        .unwrap();

    let dup = sqlx::query("INSERT INTO books (path, current_author, current_title) VALUES (?, ?, ?)")
        .bind("/lib/A/B")
        .bind("A2")
        .bind("B2")
        .execute(&pool)
        .await;

    assert!(dup.is_err(), "duplicate path should violate UNIQUE");
}

#[tokio::test]
async fn test_books_status_checked() {
    let pool = init_memory_database().await.unwrap();

    let bad = sqlx::query(
        "INSERT INTO books (path, current_author, current_title, status) VALUES (?, ?, ?, ?)",
    )
    .bind("/lib/A/B")
    .bind("A")
    .bind("B")
    .bind("bogus")
    .execute(&pool)
    .await;

    assert!(bad.is_err(), "unknown status should violate CHECK");
}

#[tokio::test]
async fn test_queue_one_entry_per_book() {
    let pool = init_memory_database().await.unwrap();

    sqlx::query("INSERT INTO books (path, current_author, current_title) VALUES (?, ?, ?)")
        .bind("/lib/A/B")
        .bind("A")
        .bind("B")
        .execute(&pool)
        .await
        .unwrap();

    sqlx::query("INSERT INTO queue (book_id, reason) VALUES (1, 'first')")
        .execute(&pool)
        .await
        .unwrap();

    let second = sqlx::query("INSERT INTO queue (book_id, reason) VALUES (1, 'second')")
        .execute(&pool)
        .await;

    assert!(second.is_err(), "second live entry should violate UNIQUE(book_id)");
}

#[tokio::test]
async fn test_queue_rows_cascade_with_book() {
    let pool = init_memory_database().await.unwrap();

    sqlx::query("INSERT INTO books (path, current_author, current_title) VALUES (?, ?, ?)")
        .bind("/lib/A/B")
        .bind("A")
        .bind("B")
        .execute(&pool)
        .await
        .unwrap();
    sqlx::query("INSERT INTO queue (book_id, reason) VALUES (1, 'r')")
        .execute(&pool)
        .await
        .unwrap();

    sqlx::query("DELETE FROM books WHERE id = 1")
        .execute(&pool)
        .await
        .unwrap();

    let left: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM queue")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(left, 0);
}

#[tokio::test]
async fn test_stats_date_unique() {
    let pool = init_memory_database().await.unwrap();

    sqlx::query("INSERT INTO stats (date, scanned) VALUES ('2025-01-01', 1)")
        .execute(&pool)
        .await
        .unwrap();

    let dup = sqlx::query("INSERT INTO stats (date, scanned) VALUES ('2025-01-01', 2)")
        .execute(&pool)
        .await;

    assert!(dup.is_err());
}
