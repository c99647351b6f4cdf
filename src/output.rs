//! Result types produced by a run.
//!
//! [`RunStatistics`] is a plain value: the processor owns one, updates it
//! after every page and hands it back in [`ProcessOutput`]. Nothing here is
//! global, so tests can assert on the numbers directly.

use crate::error::{NotesError, PageError};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// One unit of extracted document text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    /// 1-indexed position in the input.
    pub index: usize,
    /// Extracted text, trimmed.
    pub text: String,
}

impl Page {
    pub fn new(index: usize, text: impl Into<String>) -> Self {
        Self {
            index,
            text: text.into(),
        }
    }
}

/// The five report sections parsed out of one LLM response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisSections {
    /// 概念解释
    pub concepts: String,
    /// 技术挑战
    pub challenges: String,
    /// 解决方案
    pub solution: String,
    /// 方案优势
    pub advantages: String,
    /// 最佳实践
    pub best_practices: String,
}

impl AnalysisSections {
    /// Sections paired with their headings, in report order.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &str)> {
        crate::prompts::SECTION_HEADINGS.into_iter().zip([
            self.concepts.as_str(),
            self.challenges.as_str(),
            self.solution.as_str(),
            self.advantages.as_str(),
            self.best_practices.as_str(),
        ])
    }
}

/// Token counts reported by the endpoint for one call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
}

/// Result for a single successfully analysed page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    /// 1-indexed page number.
    pub page_index: usize,
    /// The page text the analysis was generated from.
    pub original_text: String,
    /// Parsed report sections.
    pub sections: AnalysisSections,
    /// Token counts for this page's call.
    pub usage: TokenUsage,
    /// Estimated cost of this page's call.
    pub cost: f64,
    /// Wall-clock time for the call, in milliseconds.
    pub duration_ms: u64,
    /// Always `true` for results in [`ProcessOutput::results`]; failures are
    /// recorded as [`SkippedPage`] instead.
    pub success: bool,
}

/// A page that failed under the `skip` strategy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedPage {
    pub page_index: usize,
    pub error: PageError,
}

/// Running totals for one run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunStatistics {
    /// Pages in the input.
    pub total_pages: usize,
    /// Pages that produced an [`AnalysisResult`].
    pub processed_pages: usize,
    /// Indices of pages that failed and were skipped. The page that stops
    /// an `abort` run is not listed here.
    pub skipped_page_indices: Vec<usize>,
    /// Successful API calls.
    pub api_calls: usize,
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
    /// Sum of per-page costs.
    pub total_cost: f64,
    /// Wall-clock time of the run so far, in milliseconds.
    pub elapsed_ms: u64,
}

impl RunStatistics {
    /// Fresh statistics for a run over `total_pages` pages.
    pub fn new(total_pages: usize) -> Self {
        Self {
            total_pages,
            ..Default::default()
        }
    }

    /// Fold a successful page into the totals.
    pub fn record_success(&mut self, usage: TokenUsage, cost: f64) {
        self.processed_pages += 1;
        self.api_calls += 1;
        self.prompt_tokens += usage.prompt_tokens;
        self.completion_tokens += usage.completion_tokens;
        self.total_tokens += usage.total_tokens;
        self.total_cost += cost;
    }

    /// Record a page that failed and was skipped.
    pub fn record_skip(&mut self, page_index: usize) {
        self.skipped_page_indices.push(page_index);
    }

    pub fn skipped_pages(&self) -> usize {
        self.skipped_page_indices.len()
    }

    /// Pages that have been attempted, successfully or not.
    pub fn attempted_pages(&self) -> usize {
        self.processed_pages + self.skipped_pages()
    }

    pub fn set_elapsed(&mut self, elapsed: Duration) {
        self.elapsed_ms = elapsed.as_millis() as u64;
    }

    pub fn elapsed_secs(&self) -> f64 {
        self.elapsed_ms as f64 / 1000.0
    }
}

/// Everything a processor run produces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessOutput {
    /// Completed pages, in page order.
    pub results: Vec<AnalysisResult>,
    /// Pages skipped under the `skip` strategy, in page order.
    pub skipped: Vec<SkippedPage>,
    /// Final statistics.
    pub stats: RunStatistics,
    /// The failure that stopped an `abort` run, if any.
    pub aborted: Option<PageError>,
}

impl ProcessOutput {
    pub fn is_aborted(&self) -> bool {
        self.aborted.is_some()
    }

    /// Turn an aborted run into [`NotesError::Aborted`].
    ///
    /// Callers that write partial results should do so before calling this.
    pub fn into_result(self) -> Result<Self, NotesError> {
        match self.aborted {
            Some(source) => Err(NotesError::Aborted {
                page: source.page(),
                source,
            }),
            None => Ok(self),
        }
    }
}
