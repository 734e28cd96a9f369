//! Locate JSON values embedded in scraped HTML.
//!
//! The pages inline their state as JavaScript object literals. We find a
//! marker (`"events":`), then copy characters from the following opening
//! bracket until the bracket depth returns to zero.
//!
//! Depth counting ignores string literals. A bracket inside a quoted value
//! unbalances the scan and the result fails to decode downstream; that is
//! accepted rather than worked around.

use crate::error::ScrapeError;
use regex::Regex;

/// Which occurrence of the marker to start from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Occurrence {
    First,
    Last,
}

/// Page bytes as one line: newlines removed, invalid UTF-8 replaced.
pub fn flatten(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes)
        .chars()
        .filter(|c| *c != '\n' && *c != '\r')
        .collect()
}

/// Return the `{...}` value that follows `marker`.
pub fn extract_object<'a>(
    blob: &'a str,
    marker: &str,
    occurrence: Occurrence,
) -> Result<&'a str, ScrapeError> {
    let idx = match occurrence {
        Occurrence::First => blob.find(marker),
        Occurrence::Last => blob.rfind(marker),
    }
    .ok_or_else(|| ScrapeError::MarkerNotFound(marker.to_string()))?;

    balanced(&blob[idx + marker.len()..], '{', '}')
}

/// Return the `[...]` value opened by the last match of `pattern`.
///
/// `pattern` must match up to and including the opening `[`.
pub fn extract_last_array<'a>(blob: &'a str, pattern: &Regex) -> Result<&'a str, ScrapeError> {
    let open = pattern
        .find_iter(blob)
        .last()
        .ok_or_else(|| ScrapeError::MarkerNotFound(pattern.as_str().to_string()))?;

    balanced(&blob[open.end() - 1..], '[', ']')
}

/// Scan `rest` (leading whitespace allowed) from its opening bracket until
/// depth returns to zero and return the bracketed slice.
pub fn balanced(rest: &str, open: char, close: char) -> Result<&str, ScrapeError> {
    let rest = rest.trim_start();
    let first = rest.chars().next();
    if first != Some(open) {
        return Err(ScrapeError::UnexpectedStart {
            expected: open,
            found: first,
        });
    }

    let mut depth = 0usize;
    for (i, c) in rest.char_indices() {
        if c == open {
            depth += 1;
        } else if c == close {
            depth -= 1;
            if depth == 0 {
                return Ok(&rest[..i + c.len_utf8()]);
            }
        }
    }

    Err(ScrapeError::Unbalanced(open))
}
