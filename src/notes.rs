//! Whole-run entry points: input file in, report (and stats) out.
//!
//! [`generate_notes`] chains the stages the CLI runs:
//!
//! ```text
//! load_pages ──▶ PageProcessor::process ──▶ write_report ──▶ write_stats?
//! ```
//!
//! The report is written even when the `abort` strategy stops the run, so
//! pages already paid for are never lost. Callers decide what an abort
//! means for them via [`NotesOutput::into_result`].

use crate::config::{ErrorStrategy, NotesConfig};
use crate::error::NotesError;
use crate::output::{Page, ProcessOutput};
use crate::pipeline::input;
use crate::pipeline::llm::{LlmClient, OpenAiCompatibleClient};
use crate::processor::PageProcessor;
use crate::progress::ProgressCallback;
use crate::prompts::DEFAULT_TOPIC;
use crate::report;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

/// Per-run options that are not part of the config file.
#[derive(Clone)]
pub struct NotesOptions {
    /// Topic embedded in every prompt. Default: `技术综述`.
    pub topic: String,
    /// Page failure policy. Default: skip.
    pub error_strategy: ErrorStrategy,
    /// Report path. Default: `<input stem>_notes.md` beside the input.
    pub output_path: Option<PathBuf>,
    /// Where to write the statistics JSON, if anywhere.
    pub stats_path: Option<PathBuf>,
    /// Progress events sink.
    pub progress: Option<ProgressCallback>,
}

impl Default for NotesOptions {
    fn default() -> Self {
        Self {
            topic: DEFAULT_TOPIC.to_string(),
            error_strategy: ErrorStrategy::default(),
            output_path: None,
            stats_path: None,
            progress: None,
        }
    }
}

impl std::fmt::Debug for NotesOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotesOptions")
            .field("topic", &self.topic)
            .field("error_strategy", &self.error_strategy)
            .field("output_path", &self.output_path)
            .field("stats_path", &self.stats_path)
            .field("progress", &self.progress.as_ref().map(|_| "<dyn NotesProgressCallback>"))
            .finish()
    }
}

/// What a finished (or aborted) run produced.
#[derive(Debug)]
pub struct NotesOutput {
    /// Pages that were loaded from the input.
    pub pages: Vec<Page>,
    /// Processor results and statistics.
    pub output: ProcessOutput,
    /// Where the Markdown report was written.
    pub report_path: PathBuf,
    /// Where the statistics JSON was written, if requested.
    pub stats_path: Option<PathBuf>,
}

impl NotesOutput {
    /// `Err(NotesError::Aborted)` if the run was stopped by `abort`.
    pub fn into_result(self) -> Result<Self, NotesError> {
        if let Some(ref source) = self.output.aborted {
            return Err(NotesError::Aborted {
                page: source.page(),
                source: source.clone(),
            });
        }
        Ok(self)
    }
}

/// Generate notes for `input` using the OpenAI-compatible endpoint from
/// `config`.
///
/// # Errors
/// Only setup and I/O failures are returned as `Err`; an aborted run is
/// `Ok` with `output.aborted` set (see [`NotesOutput::into_result`]).
pub async fn generate_notes(
    input: impl AsRef<Path>,
    config: &NotesConfig,
    options: &NotesOptions,
) -> Result<NotesOutput, NotesError> {
    config.validate()?;
    let client = OpenAiCompatibleClient::new(config)
        .map_err(|e| NotesError::Internal(format!("HTTP client: {e}")))?;
    generate_notes_with_client(input, Arc::new(client), config, options).await
}

/// Same as [`generate_notes`] with a caller-supplied [`LlmClient`].
pub async fn generate_notes_with_client(
    input: impl AsRef<Path>,
    client: Arc<dyn LlmClient>,
    config: &NotesConfig,
    options: &NotesOptions,
) -> Result<NotesOutput, NotesError> {
    let input = input.as_ref();
    info!("Reading {}", input.display());
    let pages = input::load_pages(input)?;
    info!("Found {} pages", pages.len());

    let mut processor = PageProcessor::new(client, config.clone());
    if let Some(ref cb) = options.progress {
        processor = processor.with_progress(Arc::clone(cb));
    }
    let output = processor
        .process(&pages, &options.topic, options.error_strategy)
        .await;

    let report_path = options
        .output_path
        .clone()
        .unwrap_or_else(|| report::default_report_path(input));
    report::write_report(&report_path, &output.results)?;
    info!(
        "Report written to {} ({} pages)",
        report_path.display(),
        output.results.len()
    );

    if let Some(ref stats_path) = options.stats_path {
        let aborted_at = output.aborted.as_ref().map(|e| e.page());
        report::write_stats(stats_path, &output.stats, aborted_at)?;
        info!("Statistics written to {}", stats_path.display());
    }

    Ok(NotesOutput {
        pages,
        output,
        report_path,
        stats_path: options.stats_path.clone(),
    })
}

/// Load the config at `config_path`, then run [`generate_notes`].
///
/// Config problems are reported before the input is even opened.
pub async fn generate_notes_from_config_file(
    input: impl AsRef<Path>,
    config_path: impl AsRef<Path>,
    options: &NotesOptions,
) -> Result<NotesOutput, NotesError> {
    let config = NotesConfig::load(config_path)?;
    generate_notes(input, &config, options).await
}
