//! Correction history operations
//!
//! Write-once audit log. In manual mode a history row doubles as the
//! pending fix that an operator later applies.

use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, Sqlite, SqlitePool, Transaction};

use crate::db::books::BookStatus;

/// One recorded correction.
#[derive(Debug, Clone)]
pub struct HistoryRecord {
    pub id: i64,
    pub book_id: i64,
    pub old_author: String,
    pub old_title: String,
    pub new_author: String,
    pub new_title: String,
    pub old_path: String,
    pub new_path: String,
    pub fixed_at: DateTime<Utc>,
}

/// A correction about to be recorded.
#[derive(Debug, Clone)]
pub struct Correction {
    pub book_id: i64,
    pub old_author: String,
    pub old_title: String,
    pub new_author: String,
    pub new_title: String,
    pub old_path: String,
    pub new_path: String,
}

/// History row joined with its book's current status, for operator review.
#[derive(Debug, Clone)]
pub struct HistoryPageRow {
    pub record: HistoryRecord,
    pub book_status: BookStatus,
}

fn record_from_row(row: &SqliteRow) -> Result<HistoryRecord> {
    let fixed_raw: String = row.get("fixed_at");

    Ok(HistoryRecord {
        id: row.get("id"),
        book_id: row.get("book_id"),
        old_author: row.get("old_author"),
        old_title: row.get("old_title"),
        new_author: row.get("new_author"),
        new_title: row.get("new_title"),
        old_path: row.get("old_path"),
        new_path: row.get("new_path"),
        fixed_at: bookmend_common::time::from_db(&fixed_raw)?,
    })
}

/// Record a correction inside a larger transaction. Returns the new
/// history id.
pub async fn record_correction_tx(
    tx: &mut Transaction<'_, Sqlite>,
    correction: &Correction,
) -> Result<i64> {
    let result = sqlx::query(
        r#"
        INSERT INTO history (book_id, old_author, old_title, new_author, new_title,
                             old_path, new_path, fixed_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, CURRENT_TIMESTAMP)
        "#,
    )
    .bind(correction.book_id)
    .bind(&correction.old_author)
    .bind(&correction.old_title)
    .bind(&correction.new_author)
    .bind(&correction.new_title)
    .bind(&correction.old_path)
    .bind(&correction.new_path)
    .execute(&mut **tx)
    .await?;

    Ok(result.last_insert_rowid())
}

/// Load one record by id.
pub async fn get_record(pool: &SqlitePool, id: i64) -> Result<Option<HistoryRecord>> {
    let row = sqlx::query(
        r#"
        SELECT id, book_id, old_author, old_title, new_author, new_title,
               old_path, new_path, fixed_at
        FROM history
        WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(record_from_row).transpose()
}

/// Count all history rows.
pub async fn count_history(pool: &SqlitePool) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM history")
        .fetch_one(pool)
        .await?;
    Ok(count)
}

/// One page of history, newest first, joined with book status.
pub async fn list_page(
    pool: &SqlitePool,
    limit: i64,
    offset: i64,
) -> Result<Vec<HistoryPageRow>> {
    let rows = sqlx::query(
        r#"
        SELECT h.id, h.book_id, h.old_author, h.old_title, h.new_author, h.new_title,
               h.old_path, h.new_path, h.fixed_at, b.status
        FROM history h
        JOIN books b ON h.book_id = b.id
        ORDER BY h.fixed_at DESC, h.id DESC
        LIMIT ? OFFSET ?
        "#,
    )
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    let mut items = Vec::with_capacity(rows.len());
    for row in &rows {
        let status_raw: String = row.get("status");
        items.push(HistoryPageRow {
            record: record_from_row(row)?,
            book_status: BookStatus::parse(&status_raw)?,
        });
    }

    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::books;

    async fn test_pool() -> SqlitePool {
        bookmend_common::db::init_memory_database()
            .await
            .expect("Failed to create in-memory database")
    }

    fn sample_correction(book_id: i64, n: u32) -> Correction {
        Correction {
            book_id,
            old_author: format!("Old Author {}", n),
            old_title: format!("Old Title {}", n),
            new_author: format!("New Author {}", n),
            new_title: format!("New Title {}", n),
            old_path: format!("/lib/Old Author {0}/Old Title {0}", n),
            new_path: format!("/lib/New Author {0}/New Title {0}", n),
        }
    }

    #[tokio::test]
    async fn test_record_and_get() {
        let pool = test_pool().await;
        let (book_id, _) = books::create_if_missing(&pool, "/lib/A/T", "A", "T").await.unwrap();

        let mut tx = pool.begin().await.unwrap();
        let id = record_correction_tx(&mut tx, &sample_correction(book_id, 1))
            .await
            .unwrap();
        tx.commit().await.unwrap();

        let record = get_record(&pool, id).await.unwrap().expect("record missing");
        assert_eq!(record.book_id, book_id);
        assert_eq!(record.new_author, "New Author 1");
        assert_eq!(record.old_path, "/lib/Old Author 1/Old Title 1");

        assert!(get_record(&pool, 9999).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_page_newest_first() {
        let pool = test_pool().await;
        let (book_id, _) = books::create_if_missing(&pool, "/lib/A/T", "A", "T").await.unwrap();

        let mut tx = pool.begin().await.unwrap();
        for n in 1..=3 {
            record_correction_tx(&mut tx, &sample_correction(book_id, n)).await.unwrap();
        }
        tx.commit().await.unwrap();

        assert_eq!(count_history(&pool).await.unwrap(), 3);

        let page = list_page(&pool, 2, 0).await.unwrap();
        assert_eq!(page.len(), 2);
        // Same-timestamp rows fall back to id descending
        assert_eq!(page[0].record.new_author, "New Author 3");
        assert_eq!(page[1].record.new_author, "New Author 2");

        let rest = list_page(&pool, 2, 2).await.unwrap();
        assert_eq!(rest.len(), 1);
        assert_eq!(rest[0].record.new_author, "New Author 1");
    }
}
