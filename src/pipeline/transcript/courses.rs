//! Completed-course extraction over normalized transcript text.
//!
//! Three tiers run in fixed order, each only adding codes the earlier tiers
//! did not already produce:
//! 1. graded: code, optional units/term group, then a letter grade or `CR`
//! 2. transfer: code, units, grade, then a `TR-C`/`TR-T` marker
//! 3. bare code: accepted only when a real grade or transfer marker sits in
//!    the surrounding window and no administrative noise marker does
//!
//! A department outside the whitelist is dropped whatever tier matched it.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use super::normalize::normalize;
use super::observe::{BareCodeRejection, ExtractionEvent, ExtractionObserver, TracingObserver};
use super::settings::{ContextWindow, DepartmentWhitelist, ExtractionSettings};
use super::types::{CompletedCourseSet, CourseCode};
use super::TranscriptError;

/// `225`, `105W`, or the transfer form `X12`.
const COURSE_NUM: &str = r"(?:[0-9]{3}[A-Z]?|[A-Z][0-9]{2})";

// The regex crate has no lookahead. The trailing groups below consume the
// single character a lookahead would have tested; it is never a letter, so
// a following course code still starts on its own word boundary.

/// Grade must be followed by whitespace, end of text or a digit, so a grade
/// letter cannot swallow the next department when text runs together.
static GRADED_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"\b([A-Z]{{3,4}})[- ]?({COURSE_NUM})(?:\s*[0-9.]+)?(?:\s*[0-9]+)?\s*(?:[A-F]\s*[+-]?|CR)(?:\s|$|[0-9])"
    ))
    .expect("valid regex")
});

static TRANSFER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"\b([A-Z]{{3,4}})[- ]?({COURSE_NUM})\s*[0-9.]+\s*(?:[A-F]\s*[+-]?|CR|TR)\s+TR-[CT]"
    ))
    .expect("valid regex")
});

static BARE_CODE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"\b([A-Z]{{3,4}})[- ]?({COURSE_NUM})\b")).expect("valid regex")
});

/// A grade followed by a numeric token (`B+ 9.99`), a `CR`, or a transfer marker.
static REAL_GRADE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:[A-F]\s*[+-]?|CR)\s+[0-9.]|\bTR-[CT]\b").expect("valid regex")
});

static DEFAULT_EXTRACTOR: LazyLock<CourseExtractor> = LazyLock::new(CourseExtractor::default);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CourseTier {
    Graded,
    Transfer,
    BareCode,
}

impl CourseTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            CourseTier::Graded => "graded",
            CourseTier::Transfer => "transfer",
            CourseTier::BareCode => "bare_code",
        }
    }
}

/// Course extractor with an injected whitelist and bare-code heuristics.
#[derive(Debug, Clone)]
pub struct CourseExtractor {
    whitelist: DepartmentWhitelist,
    window: ContextWindow,
    noise: Option<Regex>,
    exclude_code_from_grade_window: bool,
}

impl CourseExtractor {
    /// Noise markers are case-insensitive regex sources; an empty list disables
    /// the noise guard.
    pub fn new(
        whitelist: DepartmentWhitelist,
        window: ContextWindow,
        noise_markers: &[String],
    ) -> Result<Self, TranscriptError> {
        let noise = if noise_markers.is_empty() {
            None
        } else {
            let alternation = noise_markers
                .iter()
                .map(|m| format!("(?:{m})"))
                .collect::<Vec<_>>()
                .join("|");
            Some(Regex::new(&format!("(?i){alternation}"))?)
        };

        Ok(Self {
            whitelist,
            window,
            noise,
            exclude_code_from_grade_window: false,
        })
    }

    pub fn from_settings(settings: &ExtractionSettings) -> Result<Self, TranscriptError> {
        Ok(Self::new(
            settings.departments.clone(),
            settings.context_window,
            &settings.noise_markers,
        )?
        .with_code_excluded_from_grade_window(settings.exclude_code_from_grade_window))
    }

    /// When set, a bare code's own text does not count as a nearby grade, so
    /// `PSYC 100` cannot pass the check through its own `C 1`.
    pub fn with_code_excluded_from_grade_window(mut self, exclude: bool) -> Self {
        self.exclude_code_from_grade_window = exclude;
        self
    }

    pub fn whitelist(&self) -> &DepartmentWhitelist {
        &self.whitelist
    }

    pub fn extract(&self, raw: &str) -> CompletedCourseSet {
        self.extract_observed(raw, &TracingObserver)
    }

    pub fn extract_observed(
        &self,
        raw: &str,
        observer: &dyn ExtractionObserver,
    ) -> CompletedCourseSet {
        let text = normalize(raw);
        observer.on_event(&ExtractionEvent::Normalized {
            raw_len: raw.len(),
            normalized_len: text.len(),
        });

        let mut seen = CompletedCourseSet::new();

        self.run_tier(CourseTier::Graded, &GRADED_RE, &text, &mut seen, observer, |_, _| true);
        self.run_tier(CourseTier::Transfer, &TRANSFER_RE, &text, &mut seen, observer, |_, _| true);
        self.run_tier(
            CourseTier::BareCode,
            &BARE_CODE_RE,
            &text,
            &mut seen,
            observer,
            |code, (start, end)| match self.check_bare_context(&text, start, end) {
                Ok(()) => true,
                Err(reason) => {
                    observer.on_event(&ExtractionEvent::BareCodeRejected {
                        code: code.to_string(),
                        reason,
                    });
                    false
                }
            },
        );

        seen
    }

    /// Scan one tier, adding accepted codes not already in `seen`.
    fn run_tier<F>(
        &self,
        tier: CourseTier,
        re: &Regex,
        text: &str,
        seen: &mut CompletedCourseSet,
        observer: &dyn ExtractionObserver,
        mut accept: F,
    ) where
        F: FnMut(&CourseCode, (usize, usize)) -> bool,
    {
        let mut added = Vec::new();

        for caps in re.captures_iter(text) {
            let (Some(dept), Some(num)) = (caps.get(1), caps.get(2)) else {
                continue;
            };

            if !self.whitelist.contains(dept.as_str()) {
                observer.on_event(&ExtractionEvent::DepartmentRejected {
                    tier,
                    department: dept.as_str().to_string(),
                });
                continue;
            }

            let Ok(code) = CourseCode::new(dept.as_str(), num.as_str()) else {
                continue;
            };
            if seen.contains(&code) {
                continue;
            }

            if accept(&code, (dept.start(), num.end())) {
                added.push(code.to_string());
                seen.insert(code);
            }
        }

        observer.on_event(&ExtractionEvent::TierCompleted { tier, added });
    }

    /// The window around a bare match must hold a real grade and no noise marker.
    fn check_bare_context(
        &self,
        text: &str,
        start: usize,
        end: usize,
    ) -> Result<(), BareCodeRejection> {
        let (from, to) = context_bounds(text, start, end, self.window);

        if self.noise.as_ref().is_some_and(|re| re.is_match(&text[from..to])) {
            return Err(BareCodeRejection::NoiseMarker);
        }
        let grade_nearby = if self.exclude_code_from_grade_window {
            REAL_GRADE_RE.is_match(&text[from..start]) || REAL_GRADE_RE.is_match(&text[end..to])
        } else {
            REAL_GRADE_RE.is_match(&text[from..to])
        };
        if !grade_nearby {
            return Err(BareCodeRejection::NoGradeNearby);
        }
        Ok(())
    }
}

impl Default for CourseExtractor {
    fn default() -> Self {
        Self::from_settings(&ExtractionSettings::default())
            .expect("default noise markers are valid regex")
    }
}

/// Byte bounds `window.before` chars before `start` through `window.after`
/// chars after `end`, clamped to the text and to char boundaries.
fn context_bounds(text: &str, start: usize, end: usize, window: ContextWindow) -> (usize, usize) {
    let from = text[..start]
        .char_indices()
        .rev()
        .take(window.before)
        .last()
        .map_or(start, |(i, _)| i);
    let to = text[end..]
        .char_indices()
        .nth(window.after)
        .map_or(text.len(), |(i, _)| end + i);
    (from, to)
}

/// Extract completed course codes with the default whitelist and heuristics.
pub fn extract_completed_courses(raw: &str) -> CompletedCourseSet {
    DEFAULT_EXTRACTOR.extract(raw)
}
