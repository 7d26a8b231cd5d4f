//! Queue batch processor and fix application
//!
//! Pulls a batch from the head of the correction queue, asks the AI
//! gateway for suggestions, then reconciles each answered item: rename
//! immediately in auto mode, or stage the correction in history for
//! operator approval. Items the response did not cover keep their
//! queue entry for a later round.

use crate::db::books::{self, BookStatus};
use crate::db::history::{self, Correction};
use crate::db::queue::{self, QueueItem};
use crate::db::stats;
use crate::services::corrector::{CorrectionResponse, CorrectionSuggestion, Corrector};
use crate::services::{renamer, PipelineLock};
use bookmend_common::time;
use serde::Serialize;
use sqlx::SqlitePool;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

/// Counts for one processed batch.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct BatchSummary {
    /// Items reconciled (verified, staged, fixed or errored).
    pub processed: i64,
    /// Corrections applied or staged.
    pub fixed: i64,
}

/// Result of applying one staged fix.
#[derive(Debug, Clone, Serialize)]
pub struct FixOutcome {
    pub success: bool,
    pub message: String,
}

impl FixOutcome {
    fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

/// Process one batch from the queue head.
///
/// `limit` caps the batch below the configured size; the AI request
/// never carries more than `batch_size` items either way. A failed or
/// unparseable AI response leaves every entry queued and reports zero
/// progress.
pub async fn process_queue(
    pool: &SqlitePool,
    lock: &PipelineLock,
    corrector: &Corrector,
    auto_fix: bool,
    batch_size: usize,
    limit: Option<usize>,
) -> anyhow::Result<BatchSummary> {
    let _guard = lock.acquire().await;

    let effective = limit.map_or(batch_size, |l| l.min(batch_size));
    let batch = queue::next_batch(pool, effective as i64).await?;
    if batch.is_empty() {
        info!("Queue empty, nothing to process");
        return Ok(BatchSummary::default());
    }

    let messy_names: Vec<String> = batch
        .iter()
        .map(|item| format!("{} - {}", item.current_author, item.current_title))
        .collect();
    info!("Processing batch of {} items", batch.len());

    let response = corrector.request_corrections(&messy_names).await;

    let delta = stats::StatsDelta {
        api_calls: 1,
        ..Default::default()
    };
    if let Err(e) = stats::bump(pool, &time::today(), delta).await {
        warn!("Could not record API call statistic: {}", e);
    }

    let slots = match response {
        CorrectionResponse::Suggestions(slots) => slots,
        CorrectionResponse::Failed(reason) => {
            warn!("Correction request failed, batch left queued: {}", reason);
            return Ok(BatchSummary::default());
        }
    };

    let mut summary = BatchSummary::default();
    for (item, slot) in batch.iter().zip(slots) {
        let Some(suggestion) = slot else {
            warn!("No suggestion for {}, leaving queued", item.path);
            continue;
        };

        match reconcile_entry(pool, item, &suggestion, auto_fix).await {
            Ok(changed) => {
                summary.processed += 1;
                if changed {
                    summary.fixed += 1;
                }
            }
            Err(e) => error!("Could not reconcile {}: {}", item.path, e),
        }
    }

    if summary.fixed > 0 {
        let delta = stats::StatsDelta {
            fixed: summary.fixed,
            ..Default::default()
        };
        if let Err(e) = stats::bump(pool, &time::today(), delta).await {
            warn!("Could not record fix statistics: {}", e);
        }
    }

    info!(
        "Batch complete: {} processed, {} fixed",
        summary.processed, summary.fixed
    );

    Ok(summary)
}

/// Settle one queue entry against its suggestion. Returns whether a
/// correction was applied or staged.
async fn reconcile_entry(
    pool: &SqlitePool,
    item: &QueueItem,
    suggestion: &CorrectionSuggestion,
    auto_fix: bool,
) -> anyhow::Result<bool> {
    let new_author = suggestion.author_trimmed();
    let new_title = suggestion.title_trimmed();

    if new_author.is_empty() || new_title.is_empty() {
        info!(
            "Verified OK (empty result): {}/{}",
            item.current_author, item.current_title
        );
        verify_and_dequeue(pool, item).await?;
        return Ok(false);
    }

    if new_author == item.current_author && new_title == item.current_title {
        info!(
            "Verified OK: {}/{}",
            item.current_author, item.current_title
        );
        verify_and_dequeue(pool, item).await?;
        return Ok(false);
    }

    let old_path = PathBuf::from(&item.path);
    let new_path = corrected_book_path(&old_path, new_author, new_title)?;

    let correction = Correction {
        book_id: item.book_id,
        old_author: item.current_author.clone(),
        old_title: item.current_title.clone(),
        new_author: new_author.to_string(),
        new_title: new_title.to_string(),
        old_path: item.path.clone(),
        new_path: new_path.to_string_lossy().into_owned(),
    };

    if auto_fix {
        match renamer::move_book_folder(&old_path, &new_path) {
            Ok(()) => {
                let mut tx = pool.begin().await?;
                history::record_correction_tx(&mut tx, &correction).await?;
                books::update_after_fix(
                    &mut tx,
                    item.book_id,
                    &correction.new_path,
                    new_author,
                    new_title,
                    BookStatus::Fixed,
                )
                .await?;
                queue::delete_entry_tx(&mut tx, item.queue_id).await?;
                tx.commit().await?;

                info!(
                    "Fixed: {}/{} -> {}/{}",
                    item.current_author, item.current_title, new_author, new_title
                );
                Ok(true)
            }
            Err(e) => {
                error!("Error fixing {}: {}", item.path, e);
                // The suggestion still lands in history so the operator
                // can retry it once the folder is movable again.
                let mut tx = pool.begin().await?;
                history::record_correction_tx(&mut tx, &correction).await?;
                books::set_status_tx(&mut tx, item.book_id, BookStatus::Error).await?;
                queue::delete_entry_tx(&mut tx, item.queue_id).await?;
                tx.commit().await?;
                Ok(false)
            }
        }
    } else {
        let mut tx = pool.begin().await?;
        history::record_correction_tx(&mut tx, &correction).await?;
        books::set_status_tx(&mut tx, item.book_id, BookStatus::PendingFix).await?;
        queue::delete_entry_tx(&mut tx, item.queue_id).await?;
        tx.commit().await?;

        info!(
            "Staged fix: {}/{} -> {}/{}",
            item.current_author, item.current_title, new_author, new_title
        );
        Ok(true)
    }
}

async fn verify_and_dequeue(pool: &SqlitePool, item: &QueueItem) -> anyhow::Result<()> {
    let mut tx = pool.begin().await?;
    books::set_status_tx(&mut tx, item.book_id, BookStatus::Verified).await?;
    queue::delete_entry_tx(&mut tx, item.queue_id).await?;
    tx.commit().await?;
    Ok(())
}

/// Corrected location under the same library root: the root is two
/// levels above the book folder.
fn corrected_book_path(
    old_path: &Path,
    new_author: &str,
    new_title: &str,
) -> anyhow::Result<PathBuf> {
    let root = old_path
        .parent()
        .and_then(|author_dir| author_dir.parent())
        .ok_or_else(|| {
            anyhow::anyhow!("book path too shallow to relocate: {}", old_path.display())
        })?;
    Ok(root.join(new_author).join(new_title))
}

/// Apply a staged fix from history.
///
/// Failures are reported in the outcome message rather than as errors;
/// the book keeps its current status so the fix can be retried.
pub async fn apply_fix(
    pool: &SqlitePool,
    lock: &PipelineLock,
    history_id: i64,
) -> anyhow::Result<FixOutcome> {
    let _guard = lock.acquire().await;

    let Some(record) = history::get_record(pool, history_id).await? else {
        return Ok(FixOutcome::failure("Fix not found"));
    };

    let old_path = PathBuf::from(&record.old_path);
    if !old_path.exists() {
        return Ok(FixOutcome::failure("Source folder no longer exists"));
    }

    let new_path = PathBuf::from(&record.new_path);
    if let Err(e) = renamer::move_book_folder(&old_path, &new_path) {
        error!("Error applying fix {}: {}", history_id, e);
        return Ok(FixOutcome::failure(e.to_string()));
    }

    let mut tx = pool.begin().await?;
    books::update_after_fix(
        &mut tx,
        record.book_id,
        &record.new_path,
        &record.new_author,
        &record.new_title,
        BookStatus::Fixed,
    )
    .await?;
    queue::delete_for_book_tx(&mut tx, record.book_id).await?;
    tx.commit().await?;

    info!("Fix applied: {} -> {}", record.old_path, record.new_path);
    Ok(FixOutcome {
        success: true,
        message: "Fix applied successfully".to_string(),
    })
}
