//! Tunable extraction settings.
//!
//! Defaults reproduce the tuned heuristics; a JSON settings file may override
//! any subset of fields when retuning against a corpus of real transcripts.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::TranscriptError;
use crate::config;

/// Department codes accepted when no whitelist is configured.
const DEFAULT_DEPARTMENTS: &[&str] = &[
    "ARCH", "BISC", "BUS", "CA", "CHEM", "CMNS", "CMPT", "EDUC", "ENGL", "ENSC", "FAL", "FAN",
    "GEOG", "HUM", "IAT", "MACM", "MATH", "PHIL", "PHYS", "POL", "PSYC", "STAT",
];

/// Administrative markers that produce false department-letter matches
/// (prerequisite sets, student-group labels). Case-insensitive regex sources.
const DEFAULT_NOISE_MARKERS: &[&str] = &[
    r"CF\s+PREQ",
    r"PREQ\s+SET",
    r"STUDENT\s+GROUP",
    r"CS[0-9]+\s+-",
];

/// Closed set of accepted department codes, stored uppercased.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct DepartmentWhitelist(BTreeSet<String>);

impl DepartmentWhitelist {
    pub fn new<I, S>(departments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self(
            departments
                .into_iter()
                .map(|d| d.as_ref().trim().to_ascii_uppercase())
                .filter(|d| !d.is_empty())
                .collect(),
        )
    }

    pub fn contains(&self, department: &str) -> bool {
        self.0.contains(&department.to_ascii_uppercase())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Default for DepartmentWhitelist {
    fn default() -> Self {
        Self::new(DEFAULT_DEPARTMENTS)
    }
}

impl From<Vec<String>> for DepartmentWhitelist {
    fn from(departments: Vec<String>) -> Self {
        Self::new(departments)
    }
}

impl From<DepartmentWhitelist> for Vec<String> {
    fn from(whitelist: DepartmentWhitelist) -> Self {
        whitelist.0.into_iter().collect()
    }
}

/// Characters inspected around a bare course code, in normalized text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextWindow {
    pub before: usize,
    pub after: usize,
}

impl Default for ContextWindow {
    fn default() -> Self {
        Self {
            before: 30,
            after: 50,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionSettings {
    pub departments: DepartmentWhitelist,
    pub context_window: ContextWindow,
    pub noise_markers: Vec<String>,
    /// Reported when only a "Bachelor of Science" program statement is found.
    pub program_default_major: String,
    /// Leave a bare code's own text out of the grade check.
    pub exclude_code_from_grade_window: bool,
}

impl Default for ExtractionSettings {
    fn default() -> Self {
        Self {
            departments: DepartmentWhitelist::default(),
            context_window: ContextWindow::default(),
            noise_markers: DEFAULT_NOISE_MARKERS.iter().map(|s| s.to_string()).collect(),
            program_default_major: config::DEFAULT_PROGRAM_MAJOR.to_string(),
            exclude_code_from_grade_window: false,
        }
    }
}

impl ExtractionSettings {
    pub fn from_json(json: &str) -> Result<Self, TranscriptError> {
        serde_json::from_str(json).map_err(|e| TranscriptError::Settings(e.to_string()))
    }
}
