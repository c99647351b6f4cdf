//! CLI binary: extract a PDF into the page-marked text `generate_notes` reads.

use anyhow::{Context, Result};
use clap::Parser;
use edgequake_notes::extract_to_file;
use edgequake_notes::pipeline::extract::default_text_path;
use std::io;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Extract the text of every page of a PDF, one `### Page N` block per page.
#[derive(Parser, Debug)]
#[command(
    name = "extract_pdf",
    version,
    about = "Extract PDF text into page-marked plain text",
    arg_required_else_help = true
)]
struct Cli {
    /// PDF to extract.
    input: PathBuf,

    /// Output text file. Default: the input path with a .txt extension.
    output: Option<PathBuf>,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let output = cli
        .output
        .clone()
        .unwrap_or_else(|| default_text_path(&cli.input));

    let pages = extract_to_file(&cli.input, &output)
        .with_context(|| format!("Failed to extract {}", cli.input.display()))?;

    eprintln!("Extracted {} pages → {}", pages, output.display());
    Ok(())
}
