//! Background worker lifecycle tests

mod helpers;

use bookmend::db::{books, queue};
use bookmend::services::corrector::RateLimiter;
use bookmend::services::drain::DrainController;
use bookmend::services::worker::{WorkerContext, WorkerHandle};
use bookmend::services::PipelineLock;
use bookmend_common::config::SettingsSource;
use helpers::{make_book_dirs, test_pool};
use sqlx::SqlitePool;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

fn worker_context(pool: SqlitePool, config_path: PathBuf) -> WorkerContext {
    WorkerContext {
        pool,
        settings: SettingsSource::new(config_path),
        lock: PipelineLock::new(),
        drain: DrainController::new(),
        limiter: Arc::new(RateLimiter::new()),
    }
}

fn write_config(dir: &Path, body: &str) -> PathBuf {
    let path = dir.join("config.toml");
    fs::write(&path, body).unwrap();
    path
}

#[tokio::test]
async fn test_worker_start_stop_lifecycle() {
    let pool = test_pool().await;
    let temp = TempDir::new().unwrap();
    // No config file: defaults apply, and with no library paths a cycle
    // is a quick no-op before the long sleep.
    let ctx = worker_context(pool, temp.path().join("config.toml"));

    let handle = WorkerHandle::new();
    assert!(!handle.is_running().await);

    handle.start(ctx.clone()).await;
    assert!(handle.is_running().await);

    // Second start while live is a no-op
    handle.start(ctx).await;
    assert!(handle.is_running().await);

    handle.shutdown().await;
    assert!(!handle.is_running().await);
}

#[tokio::test]
async fn test_worker_restarts_after_shutdown() {
    let pool = test_pool().await;
    let temp = TempDir::new().unwrap();
    let ctx = worker_context(pool, temp.path().join("config.toml"));

    let handle = WorkerHandle::new();
    handle.start(ctx.clone()).await;
    handle.shutdown().await;
    assert!(!handle.is_running().await);

    handle.start(ctx).await;
    assert!(handle.is_running().await);
    handle.shutdown().await;
}

#[tokio::test]
async fn test_stop_request_ends_the_sleeping_worker() {
    let pool = test_pool().await;
    let temp = TempDir::new().unwrap();
    let ctx = worker_context(pool, temp.path().join("config.toml"));

    let handle = WorkerHandle::new();
    handle.start(ctx).await;
    handle.stop().await;

    // Cancellation interrupts the inter-cycle sleep, so the task winds
    // down promptly instead of waiting out the scan interval.
    let mut stopped = false;
    for _ in 0..100 {
        if !handle.is_running().await {
            stopped = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(stopped, "worker should stop shortly after a stop request");
}

#[tokio::test]
async fn test_worker_cycle_scans_the_library() {
    let pool = test_pool().await;
    let temp = TempDir::new().unwrap();
    let library = TempDir::new().unwrap();
    make_book_dirs(library.path(), "Cormac McCarthy", "Stella Maris");
    make_book_dirs(library.path(), "The Hobbit", "JRR Tolkien");

    let config_path = write_config(
        temp.path(),
        &format!(
            "library_paths = [{:?}]\nenabled = true\nauto_fix = false\n",
            library.path()
        ),
    );
    let ctx = worker_context(pool.clone(), config_path);

    let handle = WorkerHandle::new();
    handle.start(ctx).await;

    let mut scanned = false;
    for _ in 0..100 {
        if books::count_books(&pool).await.unwrap() == 2 {
            scanned = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    handle.shutdown().await;

    assert!(scanned, "worker cycle should register both books");
    assert_eq!(queue::queue_length(&pool).await.unwrap(), 1);
}

#[tokio::test]
async fn test_disabled_worker_skips_the_cycle() {
    let pool = test_pool().await;
    let temp = TempDir::new().unwrap();
    let library = TempDir::new().unwrap();
    make_book_dirs(library.path(), "The Hobbit", "JRR Tolkien");

    let config_path = write_config(
        temp.path(),
        &format!(
            "library_paths = [{:?}]\nenabled = false\n",
            library.path()
        ),
    );
    let ctx = worker_context(pool.clone(), config_path);

    let handle = WorkerHandle::new();
    handle.start(ctx).await;
    tokio::time::sleep(Duration::from_millis(150)).await;
    handle.shutdown().await;

    assert_eq!(books::count_books(&pool).await.unwrap(), 0);
}
