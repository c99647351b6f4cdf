//! LLM interaction: one chat-completion call per page.
//!
//! The processor only sees the [`LlmClient`] trait, so tests can script
//! responses without a network. [`OpenAiCompatibleClient`] is the production
//! implementation and works with any endpoint that speaks the OpenAI
//! `/chat/completions` dialect (OpenAI, DeepSeek, Moonshot, vLLM, Ollama, …).
//!
//! No retries happen here: a failed call is returned as an [`LlmError`] and
//! the processor's error strategy decides what happens next.

use crate::config::NotesConfig;
use crate::output::TokenUsage;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use thiserror::Error;
use tiktoken_rs::CoreBPE;
use tracing::{debug, warn};

/// Sampling parameters for one call.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionOptions {
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl CompletionOptions {
    /// Build options from the run configuration.
    pub fn from_config(config: &NotesConfig) -> Self {
        Self {
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        }
    }
}

/// Generated text plus the endpoint's token accounting.
#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    pub content: String,
    pub usage: TokenUsage,
}

/// Client-level failure of a single call.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LlmError {
    /// Connection, TLS or protocol failure.
    #[error("request failed: {0}")]
    Transport(String),

    /// No response within the client timeout.
    #[error("request timed out after {secs}s")]
    Timeout { secs: u64 },

    /// HTTP 401 / 403.
    #[error("HTTP {status}: {body}")]
    Unauthorized { status: u16, body: String },

    /// HTTP 429.
    #[error("HTTP 429: rate limited")]
    RateLimited { retry_after_secs: Option<u64> },

    /// Any other non-success status.
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// 2xx response that did not contain a usable message.
    #[error("malformed response: {0}")]
    MalformedResponse(String),
}

/// Something that can turn a prompt into a completion.
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(
        &self,
        prompt: &str,
        options: &CompletionOptions,
    ) -> Result<Completion, LlmError>;
}

// ── OpenAI-compatible HTTP client ────────────────────────────────────────

/// [`LlmClient`] for OpenAI-compatible `/chat/completions` endpoints.
pub struct OpenAiCompatibleClient {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
    timeout_secs: u64,
}

impl OpenAiCompatibleClient {
    /// Create a client from the run configuration.
    pub fn new(config: &NotesConfig) -> Result<Self, LlmError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.api_timeout_secs))
            .build()
            .map_err(|e| LlmError::Transport(e.to_string()))?;
        Ok(Self {
            http,
            endpoint: chat_completions_url(&config.api_base),
            api_key: config.api_key.clone(),
            timeout_secs: config.api_timeout_secs,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn classify(&self, e: reqwest::Error) -> LlmError {
        if e.is_timeout() {
            LlmError::Timeout {
                secs: self.timeout_secs,
            }
        } else {
            LlmError::Transport(e.to_string())
        }
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<ChatUsage>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize, Default)]
struct ChatUsage {
    #[serde(default)]
    prompt_tokens: u64,
    #[serde(default)]
    completion_tokens: u64,
    #[serde(default)]
    total_tokens: Option<u64>,
}

impl From<ChatUsage> for TokenUsage {
    fn from(u: ChatUsage) -> Self {
        TokenUsage {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: u.completion_tokens,
            total_tokens: u
                .total_tokens
                .unwrap_or(u.prompt_tokens + u.completion_tokens),
        }
    }
}

#[async_trait]
impl LlmClient for OpenAiCompatibleClient {
    async fn complete(
        &self,
        prompt: &str,
        options: &CompletionOptions,
    ) -> Result<Completion, LlmError> {
        let body = ChatRequest {
            model: &options.model,
            messages: [ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature: options.temperature,
            max_tokens: options.max_tokens,
        };

        debug!(
            "POST {} (model {}, ~{} input tokens)",
            self.endpoint,
            options.model,
            estimate_tokens(prompt)
        );
        let start = Instant::now();

        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = response.status();
        debug!("HTTP {} in {:.2}s", status.as_u16(), start.elapsed().as_secs_f64());

        if !status.is_success() {
            let retry_after_secs = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<u64>().ok());
            let body = response.text().await.unwrap_or_default();
            let status = status.as_u16();
            warn!("LLM endpoint returned HTTP {}: {}", status, truncate(&body, 200));
            return Err(match status {
                401 | 403 => LlmError::Unauthorized { status, body },
                429 => LlmError::RateLimited { retry_after_secs },
                _ => LlmError::Status { status, body },
            });
        }

        let parsed: ChatResponse = response.json().await.map_err(|e| {
            if e.is_timeout() {
                self.classify(e)
            } else {
                LlmError::MalformedResponse(e.to_string())
            }
        })?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| LlmError::MalformedResponse("no message content in choices".into()))?;

        let usage: TokenUsage = parsed.usage.unwrap_or_default().into();
        debug!(
            "usage: {} prompt + {} completion = {} tokens",
            usage.prompt_tokens, usage.completion_tokens, usage.total_tokens
        );

        Ok(Completion { content, usage })
    }
}

/// `{api_base}/chat/completions`, tolerating a trailing slash on the base.
pub fn chat_completions_url(api_base: &str) -> String {
    format!("{}/chat/completions", api_base.trim_end_matches('/'))
}

// ── Token estimation ─────────────────────────────────────────────────────

static TOKENIZER: Lazy<Option<CoreBPE>> = Lazy::new(|| match tiktoken_rs::cl100k_base() {
    Ok(bpe) => Some(bpe),
    Err(e) => {
        warn!("cl100k_base tokenizer unavailable, falling back to chars/4: {}", e);
        None
    }
});

/// Approximate token count of `text` with the `cl100k_base` encoding.
///
/// Falls back to `chars / 4` when the tokenizer cannot be loaded.
pub fn estimate_tokens(text: &str) -> usize {
    match TOKENIZER.as_ref() {
        Some(bpe) => bpe.encode_with_special_tokens(text).len(),
        None => text.chars().count() / 4,
    }
}

fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() > max_chars {
        format!("{}…", s.chars().take(max_chars).collect::<String>())
    } else {
        s.to_string()
    }
}
