//! Input resolution: turn a user-supplied path into ordered [`Page`]s.
//!
//! Two input kinds are accepted:
//!
//! * a text file in the page-marked format written by `extract_pdf`
//!   (`### Page N` header, blank line, page text), and
//! * a PDF, detected by its `.pdf` extension or `%PDF` magic bytes, which is
//!   extracted in-process first via [`crate::pipeline::extract`].

use crate::error::NotesError;
use crate::output::Page;
use crate::pipeline::extract;
use once_cell::sync::Lazy;
use regex::Regex;
use std::io::Read;
use std::path::Path;
use tracing::{debug, info};

static RE_PAGE_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^[ \t]*###[ \t]+Page[ \t]+\d+[ \t]*$").unwrap());

/// Split page-marked text into ordered pages.
///
/// Blank pages are dropped and the survivors are numbered 1..N in input
/// order. Text with no markers at all is one page (or none if blank).
pub fn split_pages(text: &str) -> Vec<Page> {
    let text = text.replace("\r\n", "\n");
    let markers: Vec<_> = RE_PAGE_MARKER.find_iter(&text).collect();

    let chunks: Vec<&str> = if markers.is_empty() {
        vec![text.as_str()]
    } else {
        markers
            .iter()
            .enumerate()
            .map(|(i, m)| {
                let end = markers.get(i + 1).map_or(text.len(), |next| next.start());
                &text[m.end()..end]
            })
            .collect()
    };

    chunks
        .into_iter()
        .map(str::trim)
        .filter(|chunk| !chunk.is_empty())
        .enumerate()
        .map(|(i, chunk)| Page::new(i + 1, chunk))
        .collect()
}

/// Read `path` and return its pages.
///
/// # Errors
/// - [`NotesError::InputNotFound`] / [`NotesError::InputReadFailed`]
/// - [`NotesError::ExtractionFailed`] for unreadable PDFs
/// - [`NotesError::NoPages`] when nothing non-blank remains
pub fn load_pages(path: &Path) -> Result<Vec<Page>, NotesError> {
    if !path.exists() {
        return Err(NotesError::InputNotFound {
            path: path.to_path_buf(),
        });
    }

    let pages = if looks_like_pdf(path)? {
        info!("Extracting text from PDF {}", path.display());
        let extracted = extract::extract_pages(path)?;
        split_pages(&extract::format_pages(&extracted))
    } else {
        let text =
            std::fs::read_to_string(path).map_err(|source| NotesError::InputReadFailed {
                path: path.to_path_buf(),
                source,
            })?;
        split_pages(&text)
    };

    if pages.is_empty() {
        return Err(NotesError::NoPages {
            path: path.to_path_buf(),
        });
    }
    debug!("Loaded {} pages from {}", pages.len(), path.display());
    Ok(pages)
}

/// A `.pdf` extension or the `%PDF` signature routes the input through
/// extraction, which rejects a `.pdf` without the signature.
fn looks_like_pdf(path: &Path) -> Result<bool, NotesError> {
    let has_pdf_ext = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));
    if has_pdf_ext {
        return Ok(true);
    }
    let mut f = std::fs::File::open(path).map_err(|source| NotesError::InputReadFailed {
        path: path.to_path_buf(),
        source,
    })?;
    let mut magic = [0u8; 4];
    Ok(f.read_exact(&mut magic).is_ok() && &magic == b"%PDF")
}
