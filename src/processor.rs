//! The page processor: one LLM call per page, in order, under an error
//! strategy.
//!
//! ## Per-page step
//!
//! ```text
//! page ──▶ prompt ──▶ LlmClient::complete ──▶ parse_sections ──▶ AnalysisResult
//!                            │ error                 │ error
//!                            └──────────┬────────────┘
//!                                       ▼
//!                         PageError ──▶ skip | abort
//! ```
//!
//! Pages are processed strictly sequentially; the only await point is the
//! LLM call. There are no retries: the first failure of a page is final and
//! the [`ErrorStrategy`] decides whether the run continues.
//!
//! [`RunStatistics`] is a local value owned by [`PageProcessor::process`],
//! updated after each page and returned inside [`ProcessOutput`].

use crate::config::{ErrorStrategy, NotesConfig};
use crate::error::PageError;
use crate::output::{AnalysisResult, Page, ProcessOutput, RunStatistics, SkippedPage};
use crate::pipeline::llm::{estimate_tokens, CompletionOptions, LlmClient, LlmError};
use crate::pipeline::parse::{parse_sections, ParseError};
use crate::progress::{NoopProgressCallback, ProgressCallback};
use crate::prompts::build_prompt;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Drives the LLM over a sequence of pages.
pub struct PageProcessor {
    client: Arc<dyn LlmClient>,
    config: NotesConfig,
    progress: ProgressCallback,
}

impl PageProcessor {
    pub fn new(client: Arc<dyn LlmClient>, config: NotesConfig) -> Self {
        Self {
            client,
            config,
            progress: Arc::new(NoopProgressCallback),
        }
    }

    /// Attach a progress callback.
    pub fn with_progress(mut self, progress: ProgressCallback) -> Self {
        self.progress = progress;
        self
    }

    pub fn config(&self) -> &NotesConfig {
        &self.config
    }

    /// Analyse `pages` in order.
    ///
    /// Under [`ErrorStrategy::Skip`] every page ends up either in
    /// `results` or in `skipped`. Under [`ErrorStrategy::Abort`] the first
    /// failure is stored in `aborted` and later pages are never sent.
    pub async fn process(
        &self,
        pages: &[Page],
        topic: &str,
        strategy: ErrorStrategy,
    ) -> ProcessOutput {
        let start = Instant::now();
        let total = pages.len();
        let mut stats = RunStatistics::new(total);
        let mut results = Vec::with_capacity(total);
        let mut skipped = Vec::new();
        let mut aborted = None;

        info!(
            "Processing {} pages (model {}, topic '{}', strategy {})",
            total, self.config.model, topic, strategy
        );
        self.progress.on_run_start(total);

        for page in pages {
            self.progress.on_page_start(page.index, total);

            match self.analyse_page(page, topic).await {
                Ok(result) => {
                    stats.record_success(result.usage, result.cost);
                    stats.set_elapsed(start.elapsed());
                    info!(
                        "Page {}/{}: {} tokens ({:.4}) | total {} tokens, {:.4}",
                        page.index,
                        total,
                        result.usage.total_tokens,
                        result.cost,
                        stats.total_tokens,
                        stats.total_cost
                    );
                    results.push(result);
                    self.progress.on_page_complete(page.index, total, &stats);
                }
                Err(page_error) => {
                    stats.set_elapsed(start.elapsed());
                    match strategy {
                        ErrorStrategy::Skip => {
                            stats.record_skip(page.index);
                            warn!("Skipping page {}/{}: {}", page.index, total, page_error);
                            self.progress
                                .on_page_skipped(page.index, total, &page_error, &stats);
                            skipped.push(SkippedPage {
                                page_index: page.index,
                                error: page_error,
                            });
                        }
                        ErrorStrategy::Abort => {
                            error!(
                                "Aborting at page {}/{}: {} ({} pages kept)",
                                page.index,
                                total,
                                page_error,
                                results.len()
                            );
                            self.progress
                                .on_run_aborted(page.index, &page_error, &stats);
                            aborted = Some(page_error);
                            break;
                        }
                    }
                }
            }
        }

        stats.set_elapsed(start.elapsed());
        if aborted.is_none() {
            info!(
                "Run complete: {}/{} pages, {} skipped, {} tokens, cost {:.4}, {:.1}s",
                stats.processed_pages,
                total,
                stats.skipped_pages(),
                stats.total_tokens,
                stats.total_cost,
                stats.elapsed_secs()
            );
            self.progress.on_run_complete(&stats);
        }

        ProcessOutput {
            results,
            skipped,
            stats,
            aborted,
        }
    }

    /// One page: prompt, call, parse. Never retries.
    async fn analyse_page(&self, page: &Page, topic: &str) -> Result<AnalysisResult, PageError> {
        let prompt = build_prompt(&page.text, topic);
        self.check_context_window(page.index, &prompt);

        let options = CompletionOptions::from_config(&self.config);
        let start = Instant::now();
        let completion = self
            .client
            .complete(&prompt, &options)
            .await
            .map_err(|e| llm_page_error(page.index, e))?;
        let duration_ms = start.elapsed().as_millis() as u64;

        let sections =
            parse_sections(&completion.content).map_err(|e| parse_page_error(page.index, e))?;

        let cost = self.config.cost_of(completion.usage.total_tokens);
        debug!(
            "Page {}: {} prompt + {} completion tokens, cost {:.6}, {}ms",
            page.index,
            completion.usage.prompt_tokens,
            completion.usage.completion_tokens,
            cost,
            duration_ms
        );

        Ok(AnalysisResult {
            page_index: page.index,
            original_text: page.text.clone(),
            sections,
            usage: completion.usage,
            cost,
            duration_ms,
            success: true,
        })
    }

    fn check_context_window(&self, page: usize, prompt: &str) {
        let prompt_tokens = estimate_tokens(prompt);
        if exceeds_context_window(prompt_tokens, &self.config) {
            warn!(
                "Page {}: ~{} prompt tokens + {} max_tokens exceeds context_window {}",
                page, prompt_tokens, self.config.max_tokens, self.config.context_window
            );
        }
    }
}

/// True when `prompt_tokens` plus the completion budget cannot fit the
/// model's context window.
fn exceeds_context_window(prompt_tokens: usize, config: &NotesConfig) -> bool {
    prompt_tokens + config.max_tokens as usize > config.context_window as usize
}

fn llm_page_error(page: usize, e: LlmError) -> PageError {
    match e {
        LlmError::Timeout { secs } => PageError::Timeout { page, secs },
        LlmError::Unauthorized { .. } => PageError::AuthFailed {
            page,
            detail: e.to_string(),
        },
        LlmError::RateLimited { retry_after_secs } => PageError::RateLimited {
            page,
            retry_after_secs,
        },
        LlmError::Transport(_) | LlmError::Status { .. } | LlmError::MalformedResponse(_) => {
            PageError::LlmFailed {
                page,
                detail: e.to_string(),
            }
        }
    }
}

fn parse_page_error(page: usize, e: ParseError) -> PageError {
    PageError::ParseFailed {
        page,
        detail: e.to_string(),
    }
}
