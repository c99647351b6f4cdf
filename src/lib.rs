//! # edgequake-notes
//!
//! Turn a PDF (or its already-extracted text) into structured study notes,
//! one LLM call per page.
//!
//! Each page is sent to an OpenAI-compatible chat endpoint with a prompt
//! asking for five fixed sections (concepts, challenges, solution,
//! advantages, best practices). The answers are assembled into a single
//! Markdown report next to the original text, while token usage and cost
//! are tracked for the whole run.
//!
//! ## Pipeline Overview
//!
//! ```text
//! input.pdf / input.txt
//!  │
//!  ├─ 1. Extract  PDF → page-marked text ("### Page N")     (pdf-extract)
//!  ├─ 2. Split    text → Vec<Page>, blank pages dropped
//!  ├─ 3. Process  one chat-completion per page, in order    (reqwest)
//!  │              skip | abort on page failure
//!  ├─ 4. Parse    response → five sections
//!  └─ 5. Report   <stem>_notes.md + optional stats JSON
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_notes::{generate_notes, NotesConfig, NotesOptions};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = NotesConfig::load("config.json")?;
//!     let output = generate_notes("paper.txt", &config, &NotesOptions::default())
//!         .await?
//!         .into_result()?;
//!     eprintln!(
//!         "{} pages, {} tokens, cost {:.4}",
//!         output.output.stats.processed_pages,
//!         output.output.stats.total_tokens,
//!         output.output.stats.total_cost
//!     );
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `generate_notes` and `extract_pdf` binaries (clap + indicatif + anyhow + tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! edgequake-notes = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod notes;
pub mod output;
pub mod pipeline;
pub mod processor;
pub mod progress;
pub mod prompts;
pub mod report;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ErrorStrategy, LogLevel, NotesConfig, NotesConfigBuilder};
pub use error::{NotesError, PageError};
pub use notes::{
    generate_notes, generate_notes_from_config_file, generate_notes_with_client, NotesOptions,
    NotesOutput,
};
pub use output::{
    AnalysisResult, AnalysisSections, Page, ProcessOutput, RunStatistics, SkippedPage, TokenUsage,
};
pub use pipeline::extract::{extract_pages, extract_to_file, ExtractedPage};
pub use pipeline::llm::{Completion, CompletionOptions, LlmClient, LlmError, OpenAiCompatibleClient};
pub use processor::PageProcessor;
pub use progress::{NoopProgressCallback, NotesProgressCallback, ProgressCallback};
pub use report::{render_report, write_report, write_stats, StatsFile};
