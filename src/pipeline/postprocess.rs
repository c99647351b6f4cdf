//! Deterministic cleanup of LLM output before and after section parsing.
//!
//! [`normalise`] runs on the whole response so the heading matcher sees
//! clean input. [`clean_section`] runs on each parsed section body so it can
//! be nested under the report's own headings without breaking the outline.
//!
//! Rule order matters: fences are stripped before line endings are
//! normalised, and blank lines are collapsed last.

use once_cell::sync::Lazy;
use regex::Regex;

/// Report heading depth that section bodies must stay below (`### 概念解释`).
const SECTION_HEADING_LEVEL: usize = 3;

/// Prepare a raw response for section parsing.
///
/// 1. Normalise line endings (CRLF → LF)
/// 2. Strip an outer ```` ```markdown ```` fence
/// 3. Strip invisible Unicode (zero-width spaces, BOM, soft hyphens)
/// 4. Trim trailing whitespace per line
pub fn normalise(input: &str) -> String {
    let s = normalise_line_endings(input);
    let s = strip_markdown_fences(&s);
    let s = remove_invisible_chars(&s);
    trim_trailing_whitespace(&s)
}

/// Tidy one section body for embedding in the report.
///
/// Headings inside the body are pushed below the section heading level so a
/// stray `# Summary` from the model cannot start a new page in the outline.
pub fn clean_section(body: &str) -> String {
    let s = demote_headings(body);
    let s = collapse_blank_lines(&s);
    s.trim().to_string()
}

// ── Rule: Strip outer markdown fences ────────────────────────────────────────

static RE_OUTER_FENCES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```(?:markdown|md)?\n(.*)\n```\s*$").unwrap());

fn strip_markdown_fences(input: &str) -> String {
    if let Some(caps) = RE_OUTER_FENCES.captures(input.trim()) {
        caps[1].to_string()
    } else {
        input.to_string()
    }
}

// ── Rule: Normalise line endings ─────────────────────────────────────────────

fn normalise_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

// ── Rule: Trim trailing whitespace per line ──────────────────────────────────

fn trim_trailing_whitespace(input: &str) -> String {
    input
        .lines()
        .map(|line| line.trim_end())
        .collect::<Vec<_>>()
        .join("\n")
}

// ── Rule: Remove invisible Unicode characters ────────────────────────────────

fn remove_invisible_chars(input: &str) -> String {
    input.replace(
        [
            '\u{200B}', '\u{FEFF}', '\u{00AD}', '\u{200C}', '\u{200D}', '\u{2060}',
        ],
        "",
    )
}

// ── Rule: Collapse excessive blank lines ─────────────────────────────────────

static RE_BLANK_LINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());

fn collapse_blank_lines(input: &str) -> String {
    RE_BLANK_LINES.replace_all(input, "\n\n").to_string()
}

// ── Rule: Demote nested headings ─────────────────────────────────────────────

static RE_HEADING: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^(#{1,6})([ \t]+)").unwrap());

fn demote_headings(input: &str) -> String {
    let mut in_fence = false;
    input
        .lines()
        .map(|line| {
            if line.trim_start().starts_with("```") {
                in_fence = !in_fence;
                return line.to_string();
            }
            if in_fence {
                return line.to_string();
            }
            RE_HEADING
                .replace(line, |caps: &regex::Captures<'_>| {
                    let level = caps[1].len().max(SECTION_HEADING_LEVEL + 1).min(6);
                    format!("{}{}", "#".repeat(level), &caps[2])
                })
                .to_string()
        })
        .collect::<Vec<_>>()
        .join("\n")
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_fences() {
        let input = "```markdown\n### 概念解释\nWorld\n```";
        assert_eq!(strip_markdown_fences(input), "### 概念解释\nWorld");
    }

    #[test]
    fn test_strip_fences_no_lang() {
        let input = "```\n# Hello\nWorld\n```";
        assert_eq!(strip_markdown_fences(input), "# Hello\nWorld");
    }

    #[test]
    fn test_no_fences_passthrough() {
        let input = "# Hello\nWorld";
        assert_eq!(strip_markdown_fences(input), "# Hello\nWorld");
    }

    #[test]
    fn test_normalise_handles_crlf_fenced_output() {
        let input = "```markdown\r\n### 概念解释\r\nA  \r\n```";
        assert_eq!(normalise(input), "### 概念解释\nA");
    }

    #[test]
    fn test_remove_invisible() {
        let input = "hello\u{200B}world\u{FEFF}foo\u{00AD}bar";
        assert_eq!(remove_invisible_chars(input), "helloworldfoobar");
    }

    #[test]
    fn test_collapse_blank_lines() {
        assert_eq!(collapse_blank_lines("a\n\n\n\n\nb"), "a\n\nb");
    }

    #[test]
    fn test_demote_headings_below_section_level() {
        let input = "# Top\n## Mid\n##### Deep\nplain # not a heading";
        assert_eq!(
            demote_headings(input),
            "#### Top\n#### Mid\n##### Deep\nplain # not a heading"
        );
    }

    #[test]
    fn test_demote_skips_code_fences() {
        let input = "```bash\n# comment\n```\n# Heading";
        assert_eq!(demote_headings(input), "```bash\n# comment\n```\n#### Heading");
    }

    #[test]
    fn test_clean_section_trims() {
        assert_eq!(clean_section("\n\nbody\n\n\n\nmore\n"), "body\n\nmore");
    }
}
