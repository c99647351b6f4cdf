//! CLI binary for edgequake-notes.
//!
//! A thin shim over the library crate: loads the JSON config, maps CLI
//! flags to `NotesOptions`, runs the pages and prints a run summary.

use anyhow::{Context, Result};
use clap::Parser;
use edgequake_notes::prompts::DEFAULT_TOPIC;
use edgequake_notes::{
    generate_notes, ErrorStrategy, LogLevel, NotesConfig, NotesOptions, NotesProgressCallback,
    PageError, ProgressCallback, RunStatistics,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

/// Terminal progress: a bar with the page counter and a running
/// `calls | tokens | cost` message, plus one log line per page.
struct CliProgressCallback {
    bar: ProgressBar,
    /// Start of the page currently in flight.
    page_started: Mutex<Option<Instant>>,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);
        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Reading input…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            page_started: Mutex::new(None),
        })
    }

    fn activate_bar(&self, total: usize) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:36.green/238}] {pos:>3}/{len} pages  \
             {msg}  ⏱ {elapsed_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        self.bar.set_length(total as u64);
        self.bar.set_style(progress_style);
        self.bar.set_prefix("Analysing");
        self.bar.set_message(totals_message(&RunStatistics::new(total)));
    }

    fn page_secs(&self) -> f64 {
        self.page_started
            .lock()
            .ok()
            .and_then(|mut started| started.take())
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }

    /// Remove the bar from the terminal, e.g. before a setup error is printed.
    fn clear(&self) {
        if !self.bar.is_finished() {
            self.bar.finish_and_clear();
        }
    }
}

fn totals_message(stats: &RunStatistics) -> String {
    format!(
        "{} calls | {} tokens | {:.4}",
        stats.api_calls, stats.total_tokens, stats.total_cost
    )
}

fn short(error: &PageError) -> String {
    let msg = error.to_string();
    if msg.chars().count() > 80 {
        format!("{}\u{2026}", msg.chars().take(79).collect::<String>())
    } else {
        msg
    }
}

impl NotesProgressCallback for CliProgressCallback {
    fn on_run_start(&self, total_pages: usize) {
        self.activate_bar(total_pages);
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Analysing {total_pages} pages…"))
        ));
    }

    fn on_page_start(&self, _page: usize, _total: usize) {
        if let Ok(mut started) = self.page_started.lock() {
            *started = Some(Instant::now());
        }
    }

    fn on_page_complete(&self, page: usize, total: usize, stats: &RunStatistics) {
        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {}",
            green("✓"),
            page,
            total,
            dim(&format!("{:.1}s", self.page_secs())),
        ));
        self.bar.set_message(totals_message(stats));
        self.bar.inc(1);
    }

    fn on_page_skipped(&self, page: usize, total: usize, error: &PageError, stats: &RunStatistics) {
        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {}  {}",
            yellow("↷"),
            page,
            total,
            red(&short(error)),
            dim(&format!("{:.1}s", self.page_secs())),
        ));
        self.bar.set_message(totals_message(stats));
        self.bar.inc(1);
    }

    fn on_run_aborted(&self, page: usize, error: &PageError, _stats: &RunStatistics) {
        self.bar.println(format!(
            "  {} Page {:>3}  {}",
            red("✗"),
            page,
            red(&short(error)),
        ));
        self.clear();
    }

    fn on_run_complete(&self, _stats: &RunStatistics) {
        self.clear();
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Notes for an extracted text file (writes paper_notes.md)
  generate_notes paper.txt

  # Straight from a PDF, custom topic
  generate_notes paper.pdf --topic "分布式系统"

  # Stop at the first failed page and keep the statistics
  generate_notes paper.txt --error-strategy abort --save-stats stats.json

  # Two-step flow
  extract_pdf paper.pdf paper.txt
  generate_notes paper.txt -o notes/paper.md

CONFIG FILE (config.json):
  {
    "api_base": "https://api.deepseek.com/v1",
    "api_key": "sk-...",
    "model": "deepseek-chat",
    "max_tokens": 4096,
    "context_window": 32768,
    "temperature": 0.7,
    "price_per_1m_tokens": 2.0,
    "log_level": "info"
  }

  api_base, api_key and model are required. Any OpenAI-compatible
  /chat/completions endpoint works (OpenAI, DeepSeek, vLLM, Ollama, …).

INPUT FORMAT:
  Text input is split on lines of the form ### Page N (the format
  extract_pdf writes). Text without markers is treated as one page.

EXIT STATUS:
  0  run completed (pages may have been skipped with --error-strategy skip)
  1  config or input error, or a page failed with --error-strategy abort

ENVIRONMENT VARIABLES:
  RUST_LOG   Override the log filter (e.g. RUST_LOG=edgequake_notes=debug)
"#;

/// Generate per-page analytical notes from a PDF or extracted text.
#[derive(Parser, Debug)]
#[command(
    name = "generate_notes",
    version,
    about = "Generate per-page analytical notes from a PDF or extracted text using an LLM",
    long_about = "Send each page of a document to an OpenAI-compatible LLM and collect the \
answers into a Markdown report: the original page text followed by concept explanations, \
technical challenges, the solution, its advantages and best practices. Token usage and \
cost are tracked for the whole run.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Page-marked text file (from extract_pdf) or a PDF.
    input: PathBuf,

    /// JSON config with api_base, api_key, model and pricing.
    #[arg(long, env = "NOTES_CONFIG", default_value = "config.json")]
    config: PathBuf,

    /// Topic the prompt frames each page with.
    #[arg(long, default_value = DEFAULT_TOPIC)]
    topic: String,

    /// What to do when a page fails: skip it, or abort the run.
    #[arg(long, value_enum, default_value = "skip")]
    error_strategy: ErrorStrategyArg,

    /// Log level; overrides `log_level` from the config file.
    #[arg(long, value_enum)]
    log_level: Option<LogLevelArg>,

    /// Also write run statistics as JSON to this path.
    #[arg(long)]
    save_stats: Option<PathBuf>,

    /// Report path. Default: <input stem>_notes.md beside the input.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Disable the progress bar.
    #[arg(long, env = "NOTES_NO_PROGRESS")]
    no_progress: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum ErrorStrategyArg {
    Skip,
    Abort,
}

impl From<ErrorStrategyArg> for ErrorStrategy {
    fn from(v: ErrorStrategyArg) -> Self {
        match v {
            ErrorStrategyArg::Skip => ErrorStrategy::Skip,
            ErrorStrategyArg::Abort => ErrorStrategy::Abort,
        }
    }
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum LogLevelArg {
    Debug,
    Info,
}

impl From<LogLevelArg> for LogLevel {
    fn from(v: LogLevelArg) -> Self {
        match v {
            LogLevelArg::Debug => LogLevel::Debug,
            LogLevelArg::Info => LogLevel::Info,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Config ───────────────────────────────────────────────────────────
    // Loaded before anything else: a bad config must stop the run before
    // the first request.
    let config = NotesConfig::load(&cli.config)
        .with_context(|| format!("Failed to load config {}", cli.config.display()))?;

    // ── Logging setup ────────────────────────────────────────────────────
    let level = cli.log_level.map(LogLevel::from).unwrap_or(config.log_level);
    let show_progress = !cli.no_progress;
    let filter = match level {
        LogLevel::Debug => "debug",
        // The bar carries page milestones; keep warnings visible.
        LogLevel::Info if show_progress => "warn",
        LogLevel::Info => "info",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    tracing::debug!("Config: {:?}", config);

    // ── Run ──────────────────────────────────────────────────────────────
    let cli_progress = show_progress.then(CliProgressCallback::new);
    let progress: Option<ProgressCallback> = cli_progress
        .clone()
        .map(|cb| cb as Arc<dyn NotesProgressCallback>);

    let options = NotesOptions {
        topic: cli.topic.clone(),
        error_strategy: cli.error_strategy.into(),
        output_path: cli.output.clone(),
        stats_path: cli.save_stats.clone(),
        progress,
    };

    let notes = generate_notes(&cli.input, &config, &options)
        .await
        .inspect_err(|_| {
            if let Some(ref cb) = cli_progress {
                cb.clear();
            }
        })
        .with_context(|| format!("Failed to generate notes for {}", cli.input.display()))?;

    // ── Summary ──────────────────────────────────────────────────────────
    let stats = &notes.output.stats;
    let skipped = stats.skipped_pages();
    let mark = if notes.output.is_aborted() {
        red("✘")
    } else if skipped > 0 {
        cyan("⚠")
    } else {
        green("✔")
    };
    eprintln!(
        "{}  {}/{} pages  ({} skipped)  {:.1}s  →  {}",
        mark,
        stats.processed_pages,
        stats.total_pages,
        skipped,
        stats.elapsed_secs(),
        bold(&notes.report_path.display().to_string()),
    );
    eprintln!(
        "   {} calls  /  {} prompt + {} completion = {} tokens  /  cost {}",
        dim(&stats.api_calls.to_string()),
        dim(&stats.prompt_tokens.to_string()),
        dim(&stats.completion_tokens.to_string()),
        dim(&stats.total_tokens.to_string()),
        dim(&format!("{:.4}", stats.total_cost)),
    );
    if !stats.skipped_page_indices.is_empty() {
        let list: Vec<String> = stats
            .skipped_page_indices
            .iter()
            .map(|p| p.to_string())
            .collect();
        eprintln!("   skipped pages: {}", list.join(", "));
    }
    if let Some(ref path) = notes.stats_path {
        eprintln!("   statistics → {}", path.display());
    }

    notes.into_result().context("Run aborted")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn help_text_parses() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
        assert!(AFTER_HELP.contains("### Page N"));
    }

    #[test]
    fn clear_finishes_a_bar_that_never_started_a_run() {
        let cb = CliProgressCallback::new();
        assert!(!cb.bar.is_finished());
        cb.clear();
        assert!(cb.bar.is_finished());
        // Clearing twice, as an abort followed by the error path would, is fine.
        cb.clear();
    }

    #[test]
    fn completed_run_leaves_no_bar_behind() {
        let cb = CliProgressCallback::new();
        cb.on_run_start(1);
        cb.on_page_start(1, 1);
        cb.on_page_complete(1, 1, &RunStatistics::new(1));
        cb.on_run_complete(&RunStatistics::new(1));
        assert!(cb.bar.is_finished());
    }
}
