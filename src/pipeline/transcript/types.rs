use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::TranscriptError;

/// A course identifier such as `CMPT 225`, `ENGL 105W` or the transfer form `CHEM X12`.
///
/// The department is stored uppercased, so equality is case-insensitive on the
/// department and exact on the number. Ordering follows the canonical string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "CourseCodeRecord", into = "CourseCodeRecord")]
pub struct CourseCode {
    department: String,
    number: String,
}

impl CourseCode {
    /// Build a course code, validating the department and number shapes.
    pub fn new(department: &str, number: &str) -> Result<Self, TranscriptError> {
        let department = department.trim().to_ascii_uppercase();
        let number = number.trim();

        if !is_department_token(&department) || !is_course_number(number) {
            return Err(TranscriptError::InvalidCourseCode(format!(
                "{department} {number}"
            )));
        }

        Ok(Self {
            department,
            number: number.to_string(),
        })
    }

    pub fn department(&self) -> &str {
        &self.department
    }

    pub fn number(&self) -> &str {
        &self.number
    }

    /// Canonical `"<DEPT> <NUMBER>"` rendering.
    pub fn canonical(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for CourseCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.department, self.number)
    }
}

impl FromStr for CourseCode {
    type Err = TranscriptError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (department, number) = s
            .trim()
            .split_once(' ')
            .ok_or_else(|| TranscriptError::InvalidCourseCode(s.to_string()))?;
        Self::new(department, number)
    }
}

/// Department: 3–4 ASCII letters.
fn is_department_token(s: &str) -> bool {
    (3..=4).contains(&s.len()) && s.bytes().all(|b| b.is_ascii_uppercase())
}

/// Number: `225`, `105W` or the transfer form `X12`.
fn is_course_number(s: &str) -> bool {
    let b = s.as_bytes();
    match b.len() {
        3 => {
            b.iter().all(u8::is_ascii_digit)
                || (b[0].is_ascii_uppercase() && b[1].is_ascii_digit() && b[2].is_ascii_digit())
        }
        4 => b[..3].iter().all(u8::is_ascii_digit) && b[3].is_ascii_uppercase(),
        _ => false,
    }
}

/// Wire shape of a course code: `{"code": "CMPT 225"}`.
#[derive(Serialize, Deserialize)]
struct CourseCodeRecord {
    code: String,
}

impl From<CourseCode> for CourseCodeRecord {
    fn from(code: CourseCode) -> Self {
        Self {
            code: code.to_string(),
        }
    }
}

impl TryFrom<CourseCodeRecord> for CourseCode {
    type Error = TranscriptError;

    fn try_from(record: CourseCodeRecord) -> Result<Self, Self::Error> {
        record.code.parse()
    }
}

/// Deduplicated set of completed courses, enumerated in canonical-string order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CompletedCourseSet(BTreeSet<CourseCode>);

impl CompletedCourseSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a code. Returns `false` when it was already present.
    pub fn insert(&mut self, code: CourseCode) -> bool {
        self.0.insert(code)
    }

    pub fn contains(&self, code: &CourseCode) -> bool {
        self.0.contains(code)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CourseCode> {
        self.0.iter()
    }

    /// Canonical strings in presentation order.
    pub fn codes(&self) -> Vec<String> {
        self.0.iter().map(CourseCode::to_string).collect()
    }
}

impl FromIterator<CourseCode> for CompletedCourseSet {
    fn from_iter<I: IntoIterator<Item = CourseCode>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a CompletedCourseSet {
    type Item = &'a CourseCode;
    type IntoIter = std::collections::btree_set::Iter<'a, CourseCode>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Values a fallback collaborator may supply for fields the local patterns missed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FallbackFields {
    pub major: Option<String>,
    pub total_credits: Option<f64>,
}

/// Final extraction result for one transcript. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "ParsedTranscriptRecord")]
pub struct ParsedTranscript {
    #[serde(rename = "student_major")]
    major: String,
    completed_courses: CompletedCourseSet,
    total_credits_completed: f64,
}

impl ParsedTranscript {
    /// A negative or non-finite credit total is stored as zero.
    pub fn new(major: String, completed_courses: CompletedCourseSet, total_credits: f64) -> Self {
        let total_credits_completed = if total_credits.is_finite() && total_credits >= 0.0 {
            total_credits
        } else {
            0.0
        };

        Self {
            major,
            completed_courses,
            total_credits_completed,
        }
    }

    pub fn major(&self) -> &str {
        &self.major
    }

    pub fn completed_courses(&self) -> &CompletedCourseSet {
        &self.completed_courses
    }

    pub fn total_credits_completed(&self) -> f64 {
        self.total_credits_completed
    }
}

/// Incoming payload; goes through `ParsedTranscript::new` so the credit
/// clamp holds for deserialized values too.
#[derive(Deserialize)]
struct ParsedTranscriptRecord {
    student_major: String,
    completed_courses: CompletedCourseSet,
    total_credits_completed: f64,
}

impl From<ParsedTranscriptRecord> for ParsedTranscript {
    fn from(record: ParsedTranscriptRecord) -> Self {
        Self::new(
            record.student_major,
            record.completed_courses,
            record.total_credits_completed,
        )
    }
}
