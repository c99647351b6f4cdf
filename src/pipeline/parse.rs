//! Response parsing: map raw LLM text onto the five report sections.
//!
//! Pure and network-free. Models are inconsistent about heading levels
//! (`##` vs `###`), bold wrappers (`### **概念解释**`) and trailing colons,
//! so each heading is matched loosely; the heading *text* is not negotiable.

use crate::output::AnalysisSections;
use crate::pipeline::postprocess;
use crate::prompts::SECTION_HEADINGS;
use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

/// Why a response could not be split into sections.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// The response was empty or whitespace.
    #[error("response is empty")]
    Empty,

    /// A required heading never appeared.
    #[error("missing section heading '{0}'")]
    MissingSection(&'static str),
}

static RE_SECTION_HEADING: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?m)^[ \t]*#{1,6}[ \t]*(?:\*\*)?[ \t]*(?:\d+[.、][ \t]*)?(概念解释|技术挑战|解决方案|方案优势|最佳实践)[ \t]*(?:\*\*)?[ \t]*[:：]?[ \t]*$",
    )
    .unwrap()
});

/// Split a raw response into [`AnalysisSections`].
///
/// Headings may appear in any order; when one appears twice the first
/// occurrence wins. Text before the first heading is discarded.
pub fn parse_sections(raw: &str) -> Result<AnalysisSections, ParseError> {
    let text = postprocess::normalise(raw);
    if text.trim().is_empty() {
        return Err(ParseError::Empty);
    }

    let headings: Vec<(usize, usize, &str)> = RE_SECTION_HEADING
        .captures_iter(&text)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let name = caps.get(1)?;
            Some((whole.start(), whole.end(), name.as_str()))
        })
        .collect();

    let mut bodies: [Option<String>; 5] = Default::default();
    for (i, (_, end, name)) in headings.iter().enumerate() {
        let Some(slot) = SECTION_HEADINGS.iter().position(|h| h == name) else {
            continue;
        };
        if bodies[slot].is_some() {
            continue;
        }
        let next_start = headings.get(i + 1).map_or(text.len(), |(s, _, _)| *s);
        bodies[slot] = Some(postprocess::clean_section(&text[*end..next_start]));
    }

    let mut take = |slot: usize| {
        bodies[slot]
            .take()
            .ok_or(ParseError::MissingSection(SECTION_HEADINGS[slot]))
    };

    Ok(AnalysisSections {
        concepts: take(0)?,
        challenges: take(1)?,
        solution: take(2)?,
        advantages: take(3)?,
        best_practices: take(4)?,
    })
}
