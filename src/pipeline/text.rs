//! Page-1 text for the placeholder thumbnail.
//!
//! Extractors are tried in order like rasterizers. Raw extractor output is
//! normalised before layout:
//!
//! 1. Re-join words hyphenated across a line break (`inno-\nvation`)
//! 2. Drop control characters (`pdftotext` emits form feeds between pages)
//! 3. Collapse all whitespace runs to one space and trim
//! 4. Keep at most `char_limit` characters

use crate::backend::TextExtractor;
use crate::error::{Degradation, TextError};
use crate::pipeline::render::FIRST_PAGE;
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, warn};

static RE_HYPHEN_BREAK: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\w)-\s*\n\s*(\w)").unwrap());

static RE_CONTROL: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\x00-\x08\x0B-\x1F\x7F]").unwrap());

static RE_WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Clean raw extractor output into a single line of at most `char_limit` chars.
pub fn normalize_text(raw: &str, char_limit: usize) -> String {
    let joined = RE_HYPHEN_BREAK.replace_all(raw, "$1$2");
    let printable = RE_CONTROL.replace_all(&joined, " ");
    let collapsed = RE_WHITESPACE.replace_all(&printable, " ");
    truncate_chars(collapsed.trim(), char_limit)
        .trim_end()
        .to_string()
}

/// First `max_chars` characters of `s`, never splitting a code point.
pub fn truncate_chars(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// Run extractors in order; the first non-empty text wins.
///
/// Empty text from every extractor is a valid (text-less) page. Only when no
/// extractor succeeded at all is a [`Degradation::TextExtractionFailed`]
/// returned alongside the empty string.
pub fn extract_page_text(
    extractors: &[Arc<dyn TextExtractor>],
    pdf_path: &Path,
    char_limit: usize,
) -> (String, Option<Degradation>) {
    let mut any_ok = false;
    let mut last_error: Option<(String, TextError)> = None;

    for extractor in extractors {
        let name = extractor.name();
        match extractor.extract_text(pdf_path, FIRST_PAGE) {
            Ok(raw) => {
                any_ok = true;
                let text = normalize_text(&raw, char_limit);
                if !text.is_empty() {
                    debug!("Extracted {} chars with {}", text.chars().count(), name);
                    return (text, None);
                }
                debug!("{name} returned no text");
            }
            Err(TextError::Unavailable(detail)) => {
                debug!("Text extractor {name} unavailable: {detail}");
                last_error = Some((name, TextError::Unavailable(detail)));
            }
            Err(error) => {
                warn!("Text extractor {name} failed: {error}");
                last_error = Some((name, error));
            }
        }
    }

    if any_ok {
        return (String::new(), None);
    }
    let detail = match last_error {
        Some((name, error)) => format!("{name}: {error}"),
        None => "no text extractor configured".to_string(),
    };
    (String::new(), Some(Degradation::TextExtractionFailed { detail }))
}
