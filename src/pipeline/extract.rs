//! PDF text extraction.
//!
//! Uses [`pdf_extract`] to pull one string per page. `pdf_extract` can panic
//! on malformed input rather than returning an error, so the call is wrapped
//! in [`std::panic::catch_unwind`] and a panic becomes
//! [`NotesError::ExtractionFailed`].
//!
//! Extracted pages are cleaned (whitespace collapsed, wrapped lines merged
//! into paragraphs) and serialised with `### Page N` headers, the format
//! [`crate::pipeline::input::split_pages`] reads back.

use crate::error::NotesError;
use std::fmt::Write as _;
use std::io::Read;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use tracing::{debug, info};

/// Text of one PDF page after cleaning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedPage {
    /// 1-indexed page number in the PDF.
    pub page_num: usize,
    pub text: String,
}

/// Extract and clean every page of the PDF at `path`.
///
/// Pages with no text (scans, blank separators) are kept with empty text so
/// `page_num` stays aligned with the PDF; [`format_pages`] drops them.
pub fn extract_pages(path: &Path) -> Result<Vec<ExtractedPage>, NotesError> {
    let bytes = read_pdf(path)?;
    let raw_pages = panic::catch_unwind(AssertUnwindSafe(|| {
        pdf_extract::extract_text_from_mem_by_pages(&bytes)
    }));

    let raw_pages = match raw_pages {
        Ok(Ok(pages)) => pages,
        Ok(Err(e)) => {
            return Err(NotesError::ExtractionFailed {
                path: path.to_path_buf(),
                detail: e.to_string(),
            })
        }
        Err(_) => {
            return Err(NotesError::ExtractionFailed {
                path: path.to_path_buf(),
                detail: "PDF parser panicked (malformed document)".into(),
            })
        }
    };

    info!("Extracted {} pages from {}", raw_pages.len(), path.display());
    Ok(raw_pages
        .iter()
        .enumerate()
        .map(|(i, raw)| ExtractedPage {
            page_num: i + 1,
            text: clean_page_text(raw),
        })
        .collect())
}

/// Serialise pages as `### Page N` blocks, skipping empty pages.
pub fn format_pages(pages: &[ExtractedPage]) -> String {
    let mut out = String::new();
    for page in pages.iter().filter(|p| !p.text.trim().is_empty()) {
        if !out.is_empty() {
            out.push_str("\n\n");
        }
        let _ = write!(out, "### Page {}\n\n{}", page.page_num, page.text);
    }
    out
}

/// Extract `pdf_path` and write the page-marked text to `output_path`.
///
/// Returns the number of non-empty pages written.
pub fn extract_to_file(pdf_path: &Path, output_path: &Path) -> Result<usize, NotesError> {
    let pages = extract_pages(pdf_path)?;
    let written = pages.iter().filter(|p| !p.text.trim().is_empty()).count();
    crate::report::write_atomic(output_path, &format_pages(&pages))?;
    debug!("Wrote {} pages to {}", written, output_path.display());
    Ok(written)
}

/// Default `.txt` path beside the PDF: `dir/name.pdf` → `dir/name.txt`.
pub fn default_text_path(pdf_path: &Path) -> std::path::PathBuf {
    pdf_path.with_extension("txt")
}

/// Normalise one page of raw extracted text.
///
/// Lines are trimmed, blank lines dropped and runs of spaces collapsed.
/// Consecutive lines are merged into one paragraph; a line that starts with
/// a bullet or a `1.`–`3.` enumerator starts its own paragraph. Paragraphs
/// are separated by one blank line.
pub fn clean_page_text(raw: &str) -> String {
    let mut paragraphs: Vec<String> = Vec::new();
    let mut current: Vec<String> = Vec::new();

    for line in raw.lines() {
        let line = line.split_whitespace().collect::<Vec<_>>().join(" ");
        if line.is_empty() {
            continue;
        }
        if starts_list_item(&line) {
            if !current.is_empty() {
                paragraphs.push(current.join(" "));
                current.clear();
            }
            paragraphs.push(line);
        } else {
            current.push(line);
        }
    }
    if !current.is_empty() {
        paragraphs.push(current.join(" "));
    }

    paragraphs.join("\n\n")
}

fn starts_list_item(line: &str) -> bool {
    ["•", "-", "*", "1.", "2.", "3."]
        .iter()
        .any(|prefix| line.starts_with(prefix))
}

fn read_pdf(path: &Path) -> Result<Vec<u8>, NotesError> {
    if !path.exists() {
        return Err(NotesError::InputNotFound {
            path: path.to_path_buf(),
        });
    }
    let mut bytes = Vec::new();
    std::fs::File::open(path)
        .and_then(|mut f| f.read_to_end(&mut bytes))
        .map_err(|source| NotesError::InputReadFailed {
            path: path.to_path_buf(),
            source,
        })?;

    if bytes.len() < 4 || &bytes[..4] != b"%PDF" {
        let mut magic = [0u8; 4];
        let n = bytes.len().min(4);
        magic[..n].copy_from_slice(&bytes[..n]);
        return Err(NotesError::NotAPdf {
            path: path.to_path_buf(),
            magic,
        });
    }
    Ok(bytes)
}
