//! Progress-callback trait for per-page events.
//!
//! Pass an [`Arc<dyn NotesProgressCallback>`] to
//! [`crate::processor::PageProcessor::with_progress`] to receive events as
//! each page finishes. Every event carries a snapshot of the running
//! [`RunStatistics`], so a terminal bar can show calls, tokens and cost
//! without keeping its own counters.
//!
//! Events are observational: nothing a callback does can change the run.
//!
//! # Example
//!
//! ```rust
//! use edgequake_notes::{NotesProgressCallback, RunStatistics};
//!
//! struct PrintCost;
//!
//! impl NotesProgressCallback for PrintCost {
//!     fn on_page_complete(&self, page: usize, total: usize, stats: &RunStatistics) {
//!         eprintln!("{page}/{total}: {:.4} so far", stats.total_cost);
//!     }
//! }
//! ```

use crate::error::PageError;
use crate::output::RunStatistics;
use std::sync::Arc;

/// Called by the processor as it works through the pages.
///
/// All methods default to no-ops so implementations override only what they
/// need. Pages are processed one at a time, so events never overlap.
pub trait NotesProgressCallback: Send + Sync {
    /// Called once before the first page.
    fn on_run_start(&self, total_pages: usize) {
        let _ = total_pages;
    }

    /// Called just before the LLM request for a page is sent.
    fn on_page_start(&self, page: usize, total_pages: usize) {
        let _ = (page, total_pages);
    }

    /// Called after a page was analysed and folded into `stats`.
    fn on_page_complete(&self, page: usize, total_pages: usize, stats: &RunStatistics) {
        let _ = (page, total_pages, stats);
    }

    /// Called when a page failed and the run continues (`skip`).
    fn on_page_skipped(
        &self,
        page: usize,
        total_pages: usize,
        error: &PageError,
        stats: &RunStatistics,
    ) {
        let _ = (page, total_pages, error, stats);
    }

    /// Called when a page failed and the run stops (`abort`).
    fn on_run_aborted(&self, page: usize, error: &PageError, stats: &RunStatistics) {
        let _ = (page, error, stats);
    }

    /// Called once after the last page, unless the run aborted.
    fn on_run_complete(&self, stats: &RunStatistics) {
        let _ = stats;
    }
}

/// A no-op implementation, used when no callback is configured.
pub struct NoopProgressCallback;

impl NotesProgressCallback for NoopProgressCallback {}

/// Convenience alias for the shared callback handle.
pub type ProgressCallback = Arc<dyn NotesProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct TrackingCallback {
        completes: AtomicUsize,
        skips: AtomicUsize,
        last_tokens: AtomicUsize,
    }

    impl NotesProgressCallback for TrackingCallback {
        fn on_page_complete(&self, _page: usize, _total: usize, stats: &RunStatistics) {
            self.completes.fetch_add(1, Ordering::SeqCst);
            self.last_tokens
                .store(stats.total_tokens as usize, Ordering::SeqCst);
        }

        fn on_page_skipped(
            &self,
            _page: usize,
            _total: usize,
            _error: &PageError,
            _stats: &RunStatistics,
        ) {
            self.skips.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        let stats = RunStatistics::new(2);
        let err = PageError::Timeout { page: 2, secs: 60 };
        cb.on_run_start(2);
        cb.on_page_start(1, 2);
        cb.on_page_complete(1, 2, &stats);
        cb.on_page_skipped(2, 2, &err, &stats);
        cb.on_run_aborted(2, &err, &stats);
        cb.on_run_complete(&stats);
    }

    #[test]
    fn tracking_callback_sees_running_totals() {
        let tracker = TrackingCallback::default();
        let mut stats = RunStatistics::new(2);
        stats.total_tokens = 120;
        tracker.on_page_complete(1, 2, &stats);
        tracker.on_page_skipped(
            2,
            2,
            &PageError::LlmFailed {
                page: 2,
                detail: "HTTP 500".into(),
            },
            &stats,
        );
        assert_eq!(tracker.completes.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.skips.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.last_tokens.load(Ordering::SeqCst), 120);
    }

    #[test]
    fn arc_dyn_callback_works() {
        let cb: ProgressCallback = Arc::new(NoopProgressCallback);
        cb.on_run_start(10);
        cb.on_page_start(1, 10);
    }
}
