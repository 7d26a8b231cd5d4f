//! Full-queue drain with live progress
//!
//! Repeats batch processing until the queue is empty, publishing
//! progress that the status endpoint snapshots. Only one drain runs at
//! a time; a batch that makes no progress while items remain stops the
//! drain instead of spinning against a failing AI service.

use crate::db::queue;
use crate::services::corrector::Corrector;
use crate::services::processor::{self, BatchSummary};
use crate::services::PipelineLock;
use serde::Serialize;
use sqlx::SqlitePool;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{info, warn};

const BATCH_PAUSE: Duration = Duration::from_secs(2);

/// Live drain state, reset at the start of each run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DrainProgress {
    pub active: bool,
    pub processed: i64,
    pub total: i64,
    pub errors: Vec<String>,
}

#[derive(Debug, Error)]
pub enum DrainError {
    #[error("a drain is already running")]
    AlreadyRunning,

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Owns the progress state and the single-drain guarantee.
#[derive(Debug, Clone)]
pub struct DrainController {
    progress: Arc<RwLock<DrainProgress>>,
    pause_between_batches: Duration,
}

impl DrainController {
    pub fn new() -> Self {
        Self {
            progress: Arc::new(RwLock::new(DrainProgress::default())),
            pause_between_batches: BATCH_PAUSE,
        }
    }

    /// Controller with a custom inter-batch pause, for tests.
    pub fn with_pause(pause: Duration) -> Self {
        Self {
            progress: Arc::new(RwLock::new(DrainProgress::default())),
            pause_between_batches: pause,
        }
    }

    /// Current progress, cheap to call while a drain runs.
    pub async fn snapshot(&self) -> DrainProgress {
        self.progress.read().await.clone()
    }

    /// Process the whole queue in batches.
    pub async fn drain_all(
        &self,
        pool: &SqlitePool,
        lock: &PipelineLock,
        corrector: &Corrector,
        auto_fix: bool,
        batch_size: usize,
    ) -> Result<BatchSummary, DrainError> {
        let total = queue::queue_length(pool).await.map_err(DrainError::Other)?;
        if total == 0 {
            info!("Queue is empty, nothing to process");
            return Ok(BatchSummary::default());
        }

        {
            let mut progress = self.progress.write().await;
            if progress.active {
                return Err(DrainError::AlreadyRunning);
            }
            *progress = DrainProgress {
                active: true,
                processed: 0,
                total,
                errors: Vec::new(),
            };
        }
        info!("Starting full drain: {} items in queue", total);

        let result = self
            .run_batches(pool, lock, corrector, auto_fix, batch_size)
            .await;

        self.progress.write().await.active = false;

        let summary = result?;
        info!(
            "Drain complete: {} processed, {} fixed",
            summary.processed, summary.fixed
        );
        Ok(summary)
    }

    async fn run_batches(
        &self,
        pool: &SqlitePool,
        lock: &PipelineLock,
        corrector: &Corrector,
        auto_fix: bool,
        batch_size: usize,
    ) -> Result<BatchSummary, DrainError> {
        let mut summary = BatchSummary::default();
        let mut batch_num = 0u32;

        loop {
            batch_num += 1;
            let batch =
                processor::process_queue(pool, lock, corrector, auto_fix, batch_size, None)
                    .await?;

            if batch.processed == 0 {
                let remaining = queue::queue_length(pool).await.map_err(DrainError::Other)?;
                if remaining == 0 {
                    info!("Queue is now empty");
                } else {
                    warn!(
                        "No items processed but {} remain, stopping drain",
                        remaining
                    );
                    self.progress.write().await.errors.push(format!(
                        "Batch {}: No items processed, {} remain",
                        batch_num, remaining
                    ));
                }
                break;
            }

            summary.processed += batch.processed;
            summary.fixed += batch.fixed;
            self.progress.write().await.processed = summary.processed;

            if !self.pause_between_batches.is_zero() {
                tokio::time::sleep(self.pause_between_batches).await;
            }
        }

        Ok(summary)
    }
}

impl Default for DrainController {
    fn default() -> Self {
        Self::new()
    }
}
