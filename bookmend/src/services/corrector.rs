//! AI correction gateway
//!
//! Batches messy folder names into one prompt, sends it to an
//! OpenAI-compatible chat endpoint, and re-associates the parsed
//! suggestions with their request slots via the ITEM_N labels. Any
//! transport or parse failure degrades to a tagged `Failed` outcome,
//! never a crash.

use async_trait::async_trait;
use bookmend_common::config::Settings;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, warn};

const USER_AGENT: &str = concat!("bookmend/", env!("CARGO_PKG_VERSION"));
const REFERER: &str = "https://bookmend.dev";
const APP_TITLE: &str = "Bookmend";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(90);

/// One parsed correction from the AI response. Fields the model omits
/// or nulls deserialize to their defaults; only author and title are
/// consumed downstream, the rest is accepted for forward compatibility
/// with richer prompts.
#[derive(Debug, Clone, Deserialize)]
pub struct CorrectionSuggestion {
    #[serde(default)]
    pub item: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub series: serde_json::Value,
    #[serde(default)]
    pub series_num: serde_json::Value,
    #[serde(default)]
    pub year: serde_json::Value,
}

impl CorrectionSuggestion {
    /// Trimmed author, empty when the field was null or absent.
    pub fn author_trimmed(&self) -> &str {
        self.author.as_deref().unwrap_or("").trim()
    }

    /// Trimmed title, empty when the field was null or absent.
    pub fn title_trimmed(&self) -> &str {
        self.title.as_deref().unwrap_or("").trim()
    }
}

/// Gateway outcome. `Failed` carries the reason so callers cannot
/// mistake a dead service for "no corrections needed".
#[derive(Debug)]
pub enum CorrectionResponse {
    /// Per-request slots in request order; None means the response did
    /// not cover that item.
    Suggestions(Vec<Option<CorrectionSuggestion>>),
    Failed(String),
}

/// Chat-completion transport. The production implementation talks to an
/// OpenAI-compatible endpoint; tests substitute scripted backends.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    /// Send one prompt, return the raw completion text.
    async fn complete(&self, prompt: &str) -> anyhow::Result<String>;
}

/// Spaces outbound AI requests. Shared process-wide so ad-hoc requests
/// and the background worker draw from one budget.
#[derive(Debug, Default)]
pub struct RateLimiter {
    last_request: Mutex<Option<Instant>>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait until at least `min_interval` has passed since the previous
    /// request, then claim the slot.
    pub async fn wait(&self, min_interval: Duration) {
        let mut last = self.last_request.lock().await;

        if let Some(last_time) = *last {
            let elapsed = last_time.elapsed();
            if elapsed < min_interval {
                let wait_time = min_interval - elapsed;
                debug!("AI rate limiting: waiting {:?}", wait_time);
                tokio::time::sleep(wait_time).await;
            }
        }

        *last = Some(Instant::now());
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    #[serde(default)]
    message: Option<ChatResponseMessage>,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    #[serde(default)]
    content: String,
}

/// Production transport for OpenRouter and compatible hosts.
pub struct OpenRouterBackend {
    http_client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl OpenRouterBackend {
    pub fn new(api_key: String, model: String, base_url: String) -> anyhow::Result<Self> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            http_client,
            api_key,
            model,
            base_url,
        })
    }
}

#[async_trait]
impl CompletionBackend for OpenRouterBackend {
    async fn complete(&self, prompt: &str) -> anyhow::Result<String> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature: 0.1,
        };

        let response = self
            .http_client
            .post(&self.base_url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("HTTP-Referer", REFERER)
            .header("X-Title", APP_TITLE)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("completion endpoint returned {}", status);
        }

        let body: ChatResponse = response.json().await?;
        let text = body
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message)
            .map(|message| message.content)
            .unwrap_or_default();

        if text.is_empty() {
            anyhow::bail!("completion response contained no text");
        }

        Ok(text)
    }
}

/// The correction gateway: prompt building, rate limiting, transport,
/// response parsing and label matching.
pub struct Corrector {
    backend: Option<Arc<dyn CompletionBackend>>,
    limiter: Arc<RateLimiter>,
    min_interval: Duration,
}

impl Corrector {
    /// Corrector for the current settings. Without an API key every
    /// request reports `Failed`, same as an unreachable service.
    pub fn from_settings(settings: &Settings, limiter: Arc<RateLimiter>) -> Self {
        let backend = match settings.api_key.as_deref() {
            Some(key) => match OpenRouterBackend::new(
                key.to_string(),
                settings.model.clone(),
                settings.api_base_url.clone(),
            ) {
                Ok(backend) => Some(Arc::new(backend) as Arc<dyn CompletionBackend>),
                Err(e) => {
                    warn!("Could not build completion client: {}", e);
                    None
                }
            },
            None => None,
        };

        Self {
            backend,
            limiter,
            min_interval: settings.min_request_interval(),
        }
    }

    /// Corrector with an explicit transport.
    pub fn with_backend(
        backend: Arc<dyn CompletionBackend>,
        limiter: Arc<RateLimiter>,
        min_interval: Duration,
    ) -> Self {
        Self {
            backend: Some(backend),
            limiter,
            min_interval,
        }
    }

    /// One batched request. The returned slots align with `messy_names`.
    pub async fn request_corrections(&self, messy_names: &[String]) -> CorrectionResponse {
        let Some(backend) = self.backend.as_ref() else {
            return CorrectionResponse::Failed("no API key configured".to_string());
        };

        if messy_names.is_empty() {
            return CorrectionResponse::Suggestions(Vec::new());
        }

        let prompt = build_prompt(messy_names);

        self.limiter.wait(self.min_interval).await;

        let text = match backend.complete(&prompt).await {
            Ok(text) => text,
            Err(e) => {
                warn!("Completion request failed: {}", e);
                return CorrectionResponse::Failed(e.to_string());
            }
        };

        match parse_suggestions(&text) {
            Ok(suggestions) => {
                CorrectionResponse::Suggestions(match_by_label(suggestions, messy_names.len()))
            }
            Err(e) => {
                warn!("Unparseable completion response: {}", e);
                CorrectionResponse::Failed(format!("unparseable response: {}", e))
            }
        }
    }
}

/// Build the batch prompt, one `ITEM_N:` line per name.
pub fn build_prompt(messy_names: &[String]) -> String {
    let items: Vec<String> = messy_names
        .iter()
        .enumerate()
        .map(|(i, name)| format!("ITEM_{}: {}", i + 1, name))
        .collect();
    let names_list = items.join("\n");

    format!(
        r#"Parse these book filenames. Extract author and title.

{names_list}

RULES:
- Author names are people (e.g. "Adrian Tchaikovsky", "Dean Koontz", "Cormac McCarthy")
- Titles are book names (e.g. "Service Model", "The Funhouse", "Stella Maris")
- IMPORTANT: Keep series info in the title! "Book 2", "Book 6", "Part 1" etc MUST stay in the title
  - "Trailer Park Elves, Book 2" -> title should be "Trailer Park Elves, Book 2" NOT just "Trailer Park Elves"
  - "The Expanse 3" -> title should include the "3"
- Remove junk: [bitsearch.to], version numbers [r1.1], quality [64k], format suffixes (EPUB, MP3)
- "Author - Title" format: first part is usually author
- "Title by Author" format: author comes after "by"
- Years like 1999 go in year field, not author
- For "LastName, FirstName" format, author is "FirstName LastName"
- Keep ALL co-authors (e.g. "Michael Dalton, Adam Lance" stays as-is)

Return JSON array. Each object MUST have "item" matching the ITEM_N label:
[
  {{"item": "ITEM_1", "author": "Author Name", "title": "Book Title", "series": null, "series_num": null, "year": null}}
]

Return ONLY the JSON array, nothing else."#
    )
}

/// Strip an optional fenced code block around the JSON body.
fn strip_code_fences(text: &str) -> &str {
    let mut text = text.trim();
    if let Some(rest) = text.strip_prefix("```json") {
        text = rest;
    } else if let Some(rest) = text.strip_prefix("```") {
        text = rest;
    }
    if let Some(rest) = text.strip_suffix("```") {
        text = rest;
    }
    text.trim()
}

fn parse_suggestions(text: &str) -> anyhow::Result<Vec<CorrectionSuggestion>> {
    let suggestions = serde_json::from_str(strip_code_fences(text))?;
    Ok(suggestions)
}

/// Re-associate suggestions with their request slots via the ITEM_N
/// label. A slot the response never covered stays None; its queue entry
/// survives for a later round. The response order is irrelevant.
fn match_by_label(
    suggestions: Vec<CorrectionSuggestion>,
    expected: usize,
) -> Vec<Option<CorrectionSuggestion>> {
    let mut slots: Vec<Option<CorrectionSuggestion>> = vec![None; expected];

    for suggestion in suggestions {
        let Some(index) = suggestion.item.as_deref().and_then(parse_item_label) else {
            warn!("Discarding suggestion without a usable item label");
            continue;
        };
        if index >= expected {
            warn!("Discarding suggestion for out-of-range label ITEM_{}", index + 1);
            continue;
        }
        if slots[index].is_some() {
            warn!("Duplicate suggestion for ITEM_{}, keeping the first", index + 1);
            continue;
        }
        slots[index] = Some(suggestion);
    }

    slots
}

fn parse_item_label(label: &str) -> Option<usize> {
    let n: usize = label.trim().strip_prefix("ITEM_")?.parse().ok()?;
    n.checked_sub(1)
}
