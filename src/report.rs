//! Report writer: Markdown notes and the optional statistics JSON.
//!
//! ## Report layout
//!
//! ```text
//! # Page N
//!
//! ## 原文
//! <page text>
//!
//! ## 内容解读
//! ### 概念解释
//! …
//! ### 最佳实践
//! …
//! ```
//!
//! Only completed pages appear; skipped pages are listed in the statistics
//! file instead. Files are written atomically (temp file in the target
//! directory, then rename) so an interrupted run never leaves a half-written
//! report behind.

use crate::error::NotesError;
use crate::output::{AnalysisResult, RunStatistics};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::io::Write as _;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::debug;

/// Original-text subsection heading.
pub const HEADING_ORIGINAL: &str = "原文";
/// Interpretation subsection heading.
pub const HEADING_INTERPRETATION: &str = "内容解读";

/// Render the Markdown report for the completed pages.
pub fn render_report(results: &[AnalysisResult]) -> String {
    let mut out = String::new();
    for result in results {
        render_page(&mut out, result);
    }
    out
}

fn render_page(out: &mut String, result: &AnalysisResult) {
    let _ = writeln!(out, "# Page {}\n", result.page_index);
    let _ = writeln!(out, "## {HEADING_ORIGINAL}\n");
    let _ = writeln!(out, "{}\n", result.original_text.trim());
    let _ = writeln!(out, "## {HEADING_INTERPRETATION}\n");
    for (heading, body) in result.sections.iter() {
        let _ = writeln!(out, "### {heading}\n");
        let _ = writeln!(out, "{}\n", body.trim());
    }
}

/// `dir/name.txt` → `dir/name_notes.md`.
pub fn default_report_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    input.with_file_name(format!("{stem}_notes.md"))
}

/// Render and write the report to `path`.
pub fn write_report(path: &Path, results: &[AnalysisResult]) -> Result<(), NotesError> {
    write_atomic(path, &render_report(results))?;
    debug!("Wrote {} page sections to {}", results.len(), path.display());
    Ok(())
}

/// Statistics file contents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatsFile {
    pub total_pages: usize,
    pub processed_pages: usize,
    pub skipped_pages: usize,
    pub skipped_page_indices: Vec<usize>,
    pub api_calls: usize,
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
    pub total_cost: f64,
    pub elapsed_secs: f64,
    /// Set when the run was stopped by the `abort` strategy.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aborted_at_page: Option<usize>,
}

impl StatsFile {
    pub fn new(stats: &RunStatistics, aborted_at_page: Option<usize>) -> Self {
        Self {
            total_pages: stats.total_pages,
            processed_pages: stats.processed_pages,
            skipped_pages: stats.skipped_pages(),
            skipped_page_indices: stats.skipped_page_indices.clone(),
            api_calls: stats.api_calls,
            prompt_tokens: stats.prompt_tokens,
            completion_tokens: stats.completion_tokens,
            total_tokens: stats.total_tokens,
            total_cost: stats.total_cost,
            elapsed_secs: stats.elapsed_secs(),
            aborted_at_page,
        }
    }
}

/// Write the statistics JSON (pretty-printed, UTF-8) to `path`.
pub fn write_stats(
    path: &Path,
    stats: &RunStatistics,
    aborted_at_page: Option<usize>,
) -> Result<(), NotesError> {
    let json = serde_json::to_string_pretty(&StatsFile::new(stats, aborted_at_page))?;
    write_atomic(path, &json)
}

/// Write `contents` to `path` via a temp file in the same directory.
pub fn write_atomic(path: &Path, contents: &str) -> Result<(), NotesError> {
    let write_failed = |source: std::io::Error| NotesError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };

    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&dir).map_err(write_failed)?;

    let mut tmp = NamedTempFile::new_in(&dir).map_err(write_failed)?;
    tmp.write_all(contents.as_bytes()).map_err(write_failed)?;
    tmp.flush().map_err(write_failed)?;
    tmp.persist(path).map_err(|e| write_failed(e.error))?;
    Ok(())
}
