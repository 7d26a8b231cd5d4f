//! Background worker
//!
//! Periodically rescans the library and, when auto-fix is on, drains
//! the queue. Settings are re-read at the top of every cycle so config
//! edits take effect without a restart. Stop requests cancel the
//! inter-cycle sleep instead of waiting it out.

use crate::services::corrector::{Corrector, RateLimiter};
use crate::services::drain::{DrainController, DrainError};
use crate::services::{scanner, PipelineLock};
use bookmend_common::config::{Settings, SettingsSource};
use sqlx::SqlitePool;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Everything one worker cycle needs. Cheap to clone into the task.
#[derive(Clone)]
pub struct WorkerContext {
    pub pool: SqlitePool,
    pub settings: SettingsSource,
    pub lock: PipelineLock,
    pub drain: DrainController,
    pub limiter: Arc<RateLimiter>,
}

struct RunningWorker {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

/// Start/stop handle for the background worker task.
#[derive(Default)]
pub struct WorkerHandle {
    inner: Mutex<Option<RunningWorker>>,
}

impl WorkerHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn the worker loop. A second start while one is live is a
    /// no-op.
    pub async fn start(&self, ctx: WorkerContext) {
        let mut inner = self.inner.lock().await;
        if let Some(running) = inner.as_ref() {
            if !running.handle.is_finished() {
                info!("Worker already running");
                return;
            }
        }

        let token = CancellationToken::new();
        let worker_token = token.clone();
        let handle = tokio::spawn(async move {
            worker_loop(ctx, worker_token).await;
        });

        *inner = Some(RunningWorker { token, handle });
        info!("Background worker started");
    }

    /// Request the worker to stop. Returns without waiting; a cycle in
    /// flight finishes first.
    pub async fn stop(&self) {
        let inner = self.inner.lock().await;
        if let Some(running) = inner.as_ref() {
            running.token.cancel();
            info!("Background worker stop requested");
        }
    }

    pub async fn is_running(&self) -> bool {
        self.inner
            .lock()
            .await
            .as_ref()
            .is_some_and(|running| !running.handle.is_finished())
    }

    /// Stop the worker and wait for its task to exit.
    pub async fn shutdown(&self) {
        let running = self.inner.lock().await.take();
        if let Some(running) = running {
            running.token.cancel();
            if let Err(e) = running.handle.await {
                warn!("Worker task ended abnormally: {}", e);
            }
        }
    }
}

async fn worker_loop(ctx: WorkerContext, token: CancellationToken) {
    info!("Background worker loop running");

    loop {
        if token.is_cancelled() {
            break;
        }

        let settings = ctx.settings.current();
        if settings.enabled {
            if let Err(e) = run_cycle(&ctx, &settings).await {
                error!("Worker error: {:#}", e);
            }
        }

        let interval = settings.scan_interval();
        debug!("Worker sleeping for {:?}", interval);
        tokio::select! {
            _ = token.cancelled() => break,
            _ = tokio::time::sleep(interval) => {}
        }
    }

    info!("Background worker stopped");
}

async fn run_cycle(ctx: &WorkerContext, settings: &Settings) -> anyhow::Result<()> {
    debug!("Worker: starting scan cycle");
    scanner::scan_library(&ctx.pool, &ctx.lock, &settings.library_paths).await?;

    if settings.auto_fix {
        debug!("Worker: auto-fix enabled, draining queue");
        let corrector = Corrector::from_settings(settings, ctx.limiter.clone());
        match ctx
            .drain
            .drain_all(&ctx.pool, &ctx.lock, &corrector, true, settings.batch_size)
            .await
        {
            Ok(_) => {}
            Err(DrainError::AlreadyRunning) => {
                info!("Drain already running, skipping this cycle");
            }
            Err(DrainError::Other(e)) => return Err(e),
        }
    }

    Ok(())
}
