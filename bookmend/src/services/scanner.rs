//! Library folder scanner
//!
//! Walks each configured library root exactly two levels deep
//! (author/title), registers unknown folders as books and queues the
//! ones whose names the classifier flags as suspicious.

use crate::db::books::{self, BookStatus};
use crate::db::{queue, stats};
use crate::services::{classifier, PipelineLock};
use bookmend_common::time;
use serde::Serialize;
use sqlx::SqlitePool;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use walkdir::WalkDir;

/// Counts for one scan pass.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct ScanSummary {
    /// Folders seen for the first time.
    pub scanned: i64,
    /// Queue entries created.
    pub queued: i64,
}

/// Scan every configured library root.
///
/// Rescans are idempotent: known books keep their row, books already
/// verified or fixed are skipped entirely, and a still-suspicious book
/// with a live queue entry is not queued twice.
pub async fn scan_library(
    pool: &SqlitePool,
    lock: &PipelineLock,
    library_paths: &[PathBuf],
) -> anyhow::Result<ScanSummary> {
    let _guard = lock.acquire().await;

    let mut summary = ScanSummary::default();

    for root in library_paths {
        if !root.is_dir() {
            warn!("Library path missing, skipping: {}", root.display());
            continue;
        }

        for author_dir in list_subdirectories(root) {
            let author = dir_name(&author_dir);
            for title_dir in list_subdirectories(&author_dir) {
                let title = dir_name(&title_dir);
                scan_entry(pool, &title_dir, &author, &title, &mut summary).await?;
            }
        }
    }

    let delta = stats::StatsDelta {
        scanned: summary.scanned,
        queued: summary.queued,
        ..Default::default()
    };
    if let Err(e) = stats::bump(pool, &time::today(), delta).await {
        warn!("Could not record scan statistics: {}", e);
    }

    info!(
        "Scan complete: {} new books, {} added to queue",
        summary.scanned, summary.queued
    );

    Ok(summary)
}

async fn scan_entry(
    pool: &SqlitePool,
    title_dir: &Path,
    author: &str,
    title: &str,
    summary: &mut ScanSummary,
) -> anyhow::Result<()> {
    let path = title_dir.to_string_lossy();

    let book_id = match books::find_by_path(pool, &path).await? {
        Some(book) => {
            if matches!(book.status, BookStatus::Verified | BookStatus::Fixed) {
                return Ok(());
            }
            book.id
        }
        None => {
            let (id, newly_created) = books::create_if_missing(pool, &path, author, title).await?;
            if newly_created {
                summary.scanned += 1;
            }
            id
        }
    };

    if let Some(reason) = classifier::classify(author, title) {
        if queue::enqueue(pool, book_id, reason).await? {
            summary.queued += 1;
        }
    }

    Ok(())
}

/// Immediate subdirectories of `dir`, sorted by name. Plain files and
/// unreadable entries are skipped.
fn list_subdirectories(dir: &Path) -> Vec<PathBuf> {
    let walker = WalkDir::new(dir)
        .follow_links(false)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name();

    let mut dirs = Vec::new();
    for entry in walker {
        match entry {
            Ok(entry) => {
                if entry.file_type().is_dir() {
                    dirs.push(entry.path().to_path_buf());
                }
            }
            Err(e) => {
                warn!("Error accessing entry: {}", e);
            }
        }
    }
    dirs
}

fn dir_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}
