#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! Reading submission text the way every comparison expects it.

use std::path::Path;

use anyhow::{Context, Result};
use chardetng::EncodingDetector;
use encoding_rs::Encoding;
use similar::{ChangeTag, TextDiff};

/// Decodes `bytes` as UTF-8, falling back to a detected encoding when they
/// are not valid UTF-8.
pub fn decode(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(_) => {
            let mut detector = EncodingDetector::new();
            detector.feed(bytes, true);
            let encoding: &'static Encoding = detector.guess(None, true);
            let (text, _, had_errors) = encoding.decode(bytes);
            if had_errors {
                tracing::debug!("lossy decode using {}", encoding.name());
            }
            text.into_owned()
        }
    }
}

/// Reads `path`, decodes it and folds it to lower case.
pub fn read_normalized(path: &Path) -> Result<String> {
    let bytes = std::fs::read(path).with_context(|| format!("Could not read {}", path.display()))?;
    Ok(decode(&bytes).to_lowercase())
}

/// Drops every whitespace character.
pub fn strip_whitespace(text: &str) -> String {
    text.chars().filter(|c| !c.is_whitespace()).collect()
}

/// Compares two files after normalization, ignoring all whitespace.
pub fn same_ignoring_whitespace(expected: &Path, actual: &Path) -> Result<bool> {
    let expected = read_normalized(expected)?;
    let actual = read_normalized(actual)?;
    Ok(strip_whitespace(&expected) == strip_whitespace(&actual))
}

/// Describes the first line where `actual` departs from `expected`, if any.
pub fn first_difference(expected: &str, actual: &str) -> Option<String> {
    let diff = TextDiff::from_lines(expected, actual);
    let mut line = 1;
    for change in diff.iter_all_changes() {
        match change.tag() {
            ChangeTag::Equal => line += 1,
            ChangeTag::Delete => {
                return Some(format!(
                    "line {line}: expected `{}`",
                    change.value().trim_end()
                ));
            }
            ChangeTag::Insert => {
                return Some(format!("line {line}: found `{}`", change.value().trim_end()));
            }
        }
    }
    None
}
