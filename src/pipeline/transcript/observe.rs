//! Extraction-stage events and the observer hook that receives them.
//!
//! The extractors report what each stage found through an `ExtractionObserver`
//! instead of writing to a log directly. `TracingObserver` is the default and
//! forwards everything to `tracing` at debug level.

use serde::Serialize;

use super::courses::CourseTier;

/// Where a resolved field value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldSource {
    /// Local pattern match over the raw text.
    Local,
    /// Supplied by the fallback collaborator.
    Fallback,
    /// Neither found it; the sentinel was substituted.
    Default,
}

/// Why a bare course-code occurrence was not accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BareCodeRejection {
    NoiseMarker,
    NoGradeNearby,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ExtractionEvent {
    Normalized {
        raw_len: usize,
        normalized_len: usize,
    },
    DepartmentRejected {
        tier: CourseTier,
        department: String,
    },
    TierCompleted {
        tier: CourseTier,
        added: Vec<String>,
    },
    BareCodeRejected {
        code: String,
        reason: BareCodeRejection,
    },
    MajorResolved {
        source: FieldSource,
    },
    CreditsResolved {
        source: FieldSource,
    },
    FallbackInvoked {
        snippet_chars: usize,
    },
    FallbackFailed {
        error: String,
    },
}

pub trait ExtractionObserver: Send + Sync {
    fn on_event(&self, event: &ExtractionEvent);
}

/// Forwards events to `tracing::debug!`. Never logs transcript text.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl ExtractionObserver for TracingObserver {
    fn on_event(&self, event: &ExtractionEvent) {
        match event {
            ExtractionEvent::Normalized {
                raw_len,
                normalized_len,
            } => tracing::debug!(raw_len, normalized_len, "Transcript text normalized"),
            ExtractionEvent::DepartmentRejected { tier, department } => {
                tracing::debug!(tier = tier.as_str(), %department, "Department not whitelisted")
            }
            ExtractionEvent::TierCompleted { tier, added } => tracing::debug!(
                tier = tier.as_str(),
                added = added.len(),
                codes = ?added,
                "Course tier completed"
            ),
            ExtractionEvent::BareCodeRejected { code, reason } => {
                tracing::debug!(%code, ?reason, "Bare course code rejected")
            }
            ExtractionEvent::MajorResolved { source } => {
                tracing::debug!(?source, "Major resolved")
            }
            ExtractionEvent::CreditsResolved { source } => {
                tracing::debug!(?source, "Credit total resolved")
            }
            ExtractionEvent::FallbackInvoked { snippet_chars } => {
                tracing::debug!(snippet_chars, "Invoking fallback for major/credits")
            }
            ExtractionEvent::FallbackFailed { error } => {
                tracing::debug!(%error, "Fallback produced no data")
            }
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl ExtractionObserver for NoopObserver {
    fn on_event(&self, _event: &ExtractionEvent) {}
}
