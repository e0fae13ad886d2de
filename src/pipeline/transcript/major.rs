//! Declared major extraction over raw (non-normalized) transcript text.
//!
//! Raw text keeps the original casing and line breaks, which both the display
//! value and the line-bounded patterns rely on.

use std::sync::LazyLock;

use regex::Regex;

use crate::config;

/// `Major - Computing Science CMPT 01`, captured to end of line.
static MAJOR_LINE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bMajor\s*-\s*([^\n\r]+)").expect("valid regex"));

/// Trailing program-code fragment after the major name (`CMPT`, `MAJ 01`, `DCMPT1`).
/// Case-sensitive so words like "Mathematics" are left alone.
static TRAILING_CODE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\s*\b(?:CMPT|STAT|MATH|BUS|APSC|DCMPT|MAJ|MIN)[A-Z0-9]*(?:\s*[0-9]+)?\s*$")
        .expect("valid regex")
});

/// `BSC Computing Science` up to a requirement marker, status marker or line break.
static BSC_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bBSC\s+([A-Za-z\s]+?)(?:\s+WQB|\s+Active|\n)").expect("valid regex")
});

/// Bare program statement with no explicit major text.
static PROGRAM_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)Program:\s*Bachelor of Science\s*(?:\n|Active)").expect("valid regex")
});

/// Extract the declared major, or `None` when no pattern matches.
pub fn extract_major(raw: &str) -> Option<String> {
    extract_major_with_default(raw, config::DEFAULT_PROGRAM_MAJOR)
}

/// Same as [`extract_major`], reporting `program_default` when only a
/// "Bachelor of Science" program statement is present. That default is a
/// fixed heuristic for the institution's naming convention, not an inference.
pub fn extract_major_with_default(raw: &str, program_default: &str) -> Option<String> {
    if let Some(caps) = MAJOR_LINE_RE.captures(raw) {
        let stripped = TRAILING_CODE_RE.replace(&caps[1], "");
        let major = stripped.trim();
        if !major.is_empty() {
            return Some(major.to_string());
        }
    }

    if let Some(caps) = BSC_RE.captures(raw) {
        let major = caps[1].trim();
        if !major.is_empty() {
            return Some(major.to_string());
        }
    }

    if PROGRAM_RE.is_match(raw) {
        return Some(program_default.to_string());
    }

    None
}
