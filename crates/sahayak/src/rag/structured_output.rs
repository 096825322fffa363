//! JSON array extraction from free-form model output
//!
//! Constrained generations ask the model for a bare JSON array, but the
//! response routinely arrives wrapped in prose, markdown fences, or both.
//! This module bounds the array substring and validates it, so callers can
//! deserialize without guessing at the framing.

use std::sync::LazyLock;

use serde_json::Value;
use thiserror::Error;

// Greedy first-[ to last-] span, the lenient fallback when the balanced
// scan cannot close an array.
static ARRAY_SPAN_RE: LazyLock<regex::Regex> = LazyLock::new(|| {
    regex::Regex::new(r"\[[\s\S]*\]").expect("array span regex is valid")
});

/// Why no usable JSON array came out of a response.
#[derive(Debug, Error, PartialEq)]
pub enum ExtractError {
    /// The text contains no array span at all.
    #[error("no JSON array found in model output")]
    NoArray,
    /// An array span was found but its contents are not valid JSON.
    #[error("extracted array is not valid JSON: {0}")]
    Malformed(String),
}

/// Extract the first complete JSON array substring from `text`.
///
/// The primary pass is a balanced-bracket scan that tracks string literals
/// and escapes, so a `]` inside card text does not terminate the span early
/// and a second array later in the response is ignored. When the scan cannot
/// close an array (unbalanced quoting in the surrounding prose can hide the
/// real brackets), a greedy first-`[`-to-last-`]` regex span is tried
/// instead. Whichever span wins is validated as JSON before being returned.
///
/// Extraction is idempotent: feeding a returned substring back in yields the
/// same substring.
pub fn extract_json_array(text: &str) -> Result<String, ExtractError> {
    if let Some(candidate) = scan_balanced_array(text) {
        return validate(candidate);
    }

    match ARRAY_SPAN_RE.find(text) {
        Some(m) => validate(m.as_str()),
        None => Err(ExtractError::NoArray),
    }
}

/// Candidates always start with `[`, so a successful parse is an array.
fn validate(candidate: &str) -> Result<String, ExtractError> {
    match serde_json::from_str::<Value>(candidate) {
        Ok(_) => Ok(candidate.to_string()),
        Err(e) => Err(ExtractError::Malformed(e.to_string())),
    }
}

/// Scan for the first `[...]` span with balanced brackets, honoring string
/// literals and backslash escapes. Stray `]` before any opener is ignored.
fn scan_balanced_array(text: &str) -> Option<&str> {
    let mut depth: usize = 0;
    let mut start = None;
    let mut in_string = false;
    let mut escape_next = false;

    for (i, ch) in text.char_indices() {
        if escape_next {
            escape_next = false;
            continue;
        }

        match ch {
            '\\' if in_string => escape_next = true,
            '"' => in_string = !in_string,
            '[' if !in_string => {
                if depth == 0 {
                    start = Some(i);
                }
                depth += 1;
            }
            ']' if !in_string && depth > 0 => {
                depth -= 1;
                if depth == 0 {
                    if let Some(s) = start {
                        return Some(&text[s..i + 1]);
                    }
                }
            }
            _ => {}
        }
    }

    None
}
