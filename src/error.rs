//! Error types for the edgequake-notes library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`NotesError`] — **Fatal**: the run cannot proceed at all (missing
//!   config, unreadable input, no pages) or was stopped by the `abort`
//!   strategy. Returned as `Err(NotesError)` from the top-level functions.
//!
//! * [`PageError`] — **Non-fatal**: a single page failed (API error,
//!   timeout, unparseable response). Under the `skip` strategy it is stored
//!   in [`crate::output::SkippedPage`]; under `abort` it ends the run and is
//!   carried by [`NotesError::Aborted`].

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the edgequake-notes library.
#[derive(Debug, Error)]
pub enum NotesError {
    // ── Config errors ─────────────────────────────────────────────────────
    /// Config file was not found at the given path.
    #[error("Config file not found: '{path}'\nPass --config <PATH> or create config.json.")]
    ConfigNotFound { path: PathBuf },

    /// Config file exists but could not be read or parsed.
    #[error("Failed to load config '{path}': {detail}")]
    ConfigUnreadable { path: PathBuf, detail: String },

    /// Config parsed but a value is missing or out of range.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("Input file not found: '{path}'\nCheck the path exists and is readable.")]
    InputNotFound { path: PathBuf },

    /// Input file exists but reading it failed.
    #[error("Failed to read input '{path}': {source}")]
    InputReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file was read but is not a PDF.
    #[error("File is not a valid PDF: '{path}'\nFirst bytes: {magic:?}")]
    NotAPdf { path: PathBuf, magic: [u8; 4] },

    /// The PDF library could not extract text.
    #[error("Text extraction failed for '{path}': {detail}")]
    ExtractionFailed { path: PathBuf, detail: String },

    /// The input contained no non-blank pages.
    #[error("No pages found in '{path}'\nExpected '### Page N' headers as written by extract_pdf.")]
    NoPages { path: PathBuf },

    // ── Run errors ────────────────────────────────────────────────────────
    /// The `abort` strategy stopped the run at the first failing page.
    ///
    /// Pages before `page` completed and were kept.
    #[error("Stopped at page {page} (error strategy 'abort'): {source}")]
    Aborted {
        page: usize,
        #[source]
        source: PageError,
    },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write an output file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Could not serialise the statistics file.
    #[error("Failed to serialise statistics: {0}")]
    StatsSerialisation(#[from] serde_json::Error),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal error for a single page.
#[derive(Debug, Clone, PartialEq, Error, serde::Serialize, serde::Deserialize)]
pub enum PageError {
    /// LLM call failed (transport error or unexpected HTTP status).
    #[error("Page {page}: LLM call failed: {detail}")]
    LlmFailed { page: usize, detail: String },

    /// LLM call timed out.
    #[error("Page {page}: LLM call timed out after {secs}s")]
    Timeout { page: usize, secs: u64 },

    /// The endpoint rejected the credentials (401/403).
    #[error("Page {page}: authentication failed: {detail}")]
    AuthFailed { page: usize, detail: String },

    /// The endpoint returned HTTP 429.
    #[error("Page {page}: rate limit exceeded{}", retry_hint(*retry_after_secs))]
    RateLimited {
        page: usize,
        retry_after_secs: Option<u64>,
    },

    /// The response did not follow the five-heading structure.
    #[error("Page {page}: could not parse response: {detail}")]
    ParseFailed { page: usize, detail: String },
}

impl PageError {
    /// 1-indexed page number the error belongs to.
    pub fn page(&self) -> usize {
        match self {
            PageError::LlmFailed { page, .. }
            | PageError::Timeout { page, .. }
            | PageError::AuthFailed { page, .. }
            | PageError::RateLimited { page, .. }
            | PageError::ParseFailed { page, .. } => *page,
        }
    }
}

fn retry_hint(retry_after_secs: Option<u64>) -> String {
    match retry_after_secs {
        Some(secs) => format!(" (retry after {secs}s)"),
        None => String::new(),
    }
}
