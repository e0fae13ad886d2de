//! Transcript extraction core.
//!
//! Turns the flattened text of an academic transcript into a declared major,
//! a completed-credit total and the set of completed course codes.
//!
//! ```text
//! raw ─► normalize ─► CourseExtractor (graded → transfer → bare code) ─► CompletedCourseSet
//! raw ─► extract_major / extract_total_credits ─┐
//!                                               ├─► TranscriptResolver ─► ParsedTranscript
//!        header snippet ─► TranscriptFallback ──┘   (major + credits only)
//! ```
//!
//! The extractors are pure and never fail. The only failure-shaped path is the
//! optional fallback collaborator, whose errors are downgraded to "no data".

pub mod types;
pub mod observe;
pub mod settings;
pub mod normalize;
pub mod courses;
pub mod major;
pub mod credits;
pub mod sanitize;
pub mod fallback;
pub mod resolve;

pub use types::*;
pub use observe::*;
pub use settings::*;
pub use normalize::normalize;
pub use courses::{extract_completed_courses, CourseExtractor, CourseTier};
pub use major::{extract_major, extract_major_with_default};
pub use credits::extract_total_credits;
pub use sanitize::{header_snippet, sanitize_snippet};
pub use fallback::*;
pub use resolve::{resolve, TranscriptResolver};

use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TranscriptError {
    #[error("Invalid course code: {0}")]
    InvalidCourseCode(String),

    #[error("Invalid noise marker pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    #[error("Fallback collaborator unavailable: {0}")]
    FallbackUnavailable(String),

    #[error("Fallback timed out after {0:?}")]
    FallbackTimeout(Duration),

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("Malformed fallback response: {0}")]
    MalformedResponse(String),

    #[error("JSON parsing error: {0}")]
    JsonParsing(String),

    #[error("Settings error: {0}")]
    Settings(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
