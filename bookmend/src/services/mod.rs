//! Service modules for the library repair pipeline
//!
//! Scanning, classification, AI correction, queue processing, fix
//! application, queue draining and the background worker.

use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard};

pub mod classifier;
pub mod corrector;
pub mod drain;
pub mod processor;
pub mod renamer;
pub mod scanner;
pub mod worker;

pub use corrector::{
    CompletionBackend, CorrectionResponse, CorrectionSuggestion, Corrector, RateLimiter,
};
pub use drain::{DrainController, DrainError, DrainProgress};
pub use processor::{BatchSummary, FixOutcome};
pub use scanner::ScanSummary;
pub use worker::{WorkerContext, WorkerHandle};

/// Serializes the mutating pipeline stages. Scans, batch processing,
/// fix application and queue removal each hold this for their full
/// duration, so a scan never interleaves with a rename and two drains
/// cannot double-process one queue entry.
#[derive(Debug, Clone, Default)]
pub struct PipelineLock {
    inner: Arc<Mutex<()>>,
}

impl PipelineLock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Blocks until the pipeline is free. The guard must be held for
    /// the whole mutating operation.
    pub async fn acquire(&self) -> MutexGuard<'_, ()> {
        self.inner.lock().await
    }
}
