//! Test helper utilities
//!
//! Shared fixtures for bookmend integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use bookmend::db::{books, queue};
use bookmend::services::corrector::{CompletionBackend, Corrector, RateLimiter};
use bookmend::AppState;
use bookmend_common::config::SettingsSource;
use serde_json::json;
use sqlx::SqlitePool;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

/// In-memory catalog database with the full schema.
pub async fn test_pool() -> SqlitePool {
    bookmend_common::db::init_memory_database().await.unwrap()
}

/// Application state backed by an in-memory database. The settings file
/// does not exist, so defaults apply.
pub async fn test_state() -> (TempDir, AppState) {
    let temp = TempDir::new().unwrap();
    let pool = test_pool().await;
    let settings = SettingsSource::new(temp.path().join("config.toml"));
    (temp, AppState::new(pool, settings))
}

/// Create `root/author/title` on disk with one content file inside.
pub fn make_book_dirs(root: &Path, author: &str, title: &str) -> PathBuf {
    let dir = root.join(author).join(title);
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("book.epub"), "content").unwrap();
    dir
}

/// Register a book folder and give it a live queue entry.
pub async fn seed_queued_book(pool: &SqlitePool, root: &Path, author: &str, title: &str) -> i64 {
    let dir = make_book_dirs(root, author, title);
    let (book_id, _) = books::create_if_missing(pool, &dir.to_string_lossy(), author, title)
        .await
        .unwrap();
    queue::enqueue(pool, book_id, "test seed").await.unwrap();
    book_id
}

/// Corrector wired to the given backend with rate limiting disabled.
pub fn test_corrector(backend: Arc<dyn CompletionBackend>) -> Corrector {
    Corrector::with_backend(backend, Arc::new(RateLimiter::new()), Duration::ZERO)
}

/// Completion backend answering from a canned messy-name map. Names
/// absent from the map are left out of the response, like a model that
/// dropped them. Labels are echoed from the prompt, so the response
/// covers the right slots regardless of emission order.
pub struct ScriptedBackend {
    corrections: HashMap<String, (String, String)>,
    reversed: bool,
    fenced: bool,
    calls: AtomicUsize,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self {
            corrections: HashMap::new(),
            reversed: false,
            fenced: false,
            calls: AtomicUsize::new(0),
        }
    }

    /// Answer `messy` ("Author - Title" as prompted) with this correction.
    pub fn with_correction(mut self, messy: &str, author: &str, title: &str) -> Self {
        self.corrections
            .insert(messy.to_string(), (author.to_string(), title.to_string()));
        self
    }

    /// Emit suggestions in reverse prompt order.
    pub fn reversed(mut self) -> Self {
        self.reversed = true;
        self
    }

    /// Wrap the JSON in a markdown code fence.
    pub fn fenced(mut self) -> Self {
        self.fenced = true;
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Default for ScriptedBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CompletionBackend for ScriptedBackend {
    async fn complete(&self, prompt: &str) -> anyhow::Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let mut objects = Vec::new();
        for line in prompt.lines() {
            let Some(rest) = line.strip_prefix("ITEM_") else {
                continue;
            };
            let Some((n, messy)) = rest.split_once(": ") else {
                continue;
            };
            if let Some((author, title)) = self.corrections.get(messy) {
                objects.push(json!({
                    "item": format!("ITEM_{}", n),
                    "author": author,
                    "title": title,
                }));
            }
        }
        if self.reversed {
            objects.reverse();
        }

        let body = serde_json::Value::Array(objects).to_string();
        Ok(if self.fenced {
            format!("```json\n{}\n```", body)
        } else {
            body
        })
    }
}

/// Backend whose every request fails, like a dead AI service.
pub struct FailingBackend;

#[async_trait]
impl CompletionBackend for FailingBackend {
    async fn complete(&self, _prompt: &str) -> anyhow::Result<String> {
        anyhow::bail!("service unavailable")
    }
}
