//! Resolution policy: local extraction first, fallback only for missing
//! major or credit total, sentinels for whatever is still missing.

use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Arc, LazyLock};
use std::time::Duration;

use super::courses::CourseExtractor;
use super::credits::extract_total_credits;
use super::fallback::TranscriptFallback;
use super::major::extract_major_with_default;
use super::observe::{ExtractionEvent, ExtractionObserver, FieldSource, TracingObserver};
use super::sanitize::header_snippet;
use super::settings::ExtractionSettings;
use super::types::{CompletedCourseSet, FallbackFields, ParsedTranscript};
use super::TranscriptError;
use crate::config;

static DEFAULT_RESOLVER: LazyLock<TranscriptResolver> = LazyLock::new(TranscriptResolver::new);

/// Resolve one transcript with default settings and an optional fallback.
/// No timeout is applied to the fallback; use `TranscriptResolver` for that.
pub fn resolve(raw: &str, fallback: Option<&dyn TranscriptFallback>) -> ParsedTranscript {
    DEFAULT_RESOLVER.resolve_inner(raw, fallback.map(|f| move |s: &str| f.infer_fields(s)))
}

/// Combines the course, major and credit extractors with an optional
/// fallback collaborator. Holds no mutable state; share it freely.
pub struct TranscriptResolver {
    courses: CourseExtractor,
    program_default_major: String,
    fallback: Option<Arc<dyn TranscriptFallback>>,
    fallback_timeout: Option<Duration>,
    snippet_chars: usize,
    observer: Arc<dyn ExtractionObserver>,
}

impl Default for TranscriptResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl TranscriptResolver {
    pub fn new() -> Self {
        Self {
            courses: CourseExtractor::default(),
            program_default_major: config::DEFAULT_PROGRAM_MAJOR.to_string(),
            fallback: None,
            fallback_timeout: Some(config::DEFAULT_FALLBACK_TIMEOUT),
            snippet_chars: config::FALLBACK_SNIPPET_CHARS,
            observer: Arc::new(TracingObserver),
        }
    }

    pub fn from_settings(settings: &ExtractionSettings) -> Result<Self, TranscriptError> {
        Ok(Self {
            courses: CourseExtractor::from_settings(settings)?,
            program_default_major: settings.program_default_major.clone(),
            ..Self::new()
        })
    }

    pub fn with_fallback(mut self, fallback: Arc<dyn TranscriptFallback>) -> Self {
        self.fallback = Some(fallback);
        self
    }

    /// `None` waits for the fallback indefinitely.
    pub fn with_fallback_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.fallback_timeout = timeout;
        self
    }

    pub fn with_snippet_chars(mut self, snippet_chars: usize) -> Self {
        self.snippet_chars = snippet_chars;
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn ExtractionObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn resolve(&self, raw: &str) -> ParsedTranscript {
        let fallback = self
            .fallback
            .as_ref()
            .map(|f| move |snippet: &str| self.invoke_fallback(f, snippet));
        self.resolve_inner(raw, fallback)
    }

    /// Resolve many transcripts concurrently on the blocking pool.
    /// Results come back in input order.
    pub async fn resolve_many(self: Arc<Self>, documents: Vec<String>) -> Vec<ParsedTranscript> {
        let handles: Vec<_> = documents
            .into_iter()
            .map(|doc| {
                let resolver = Arc::clone(&self);
                tokio::task::spawn_blocking(move || resolver.resolve(&doc))
            })
            .collect();

        let mut results = Vec::with_capacity(handles.len());
        for handle in handles {
            match handle.await {
                Ok(parsed) => results.push(parsed),
                Err(e) => {
                    tracing::warn!(error = %e, "Transcript resolution task failed");
                    results.push(ParsedTranscript::new(
                        config::UNKNOWN_MAJOR.to_string(),
                        CompletedCourseSet::new(),
                        0.0,
                    ));
                }
            }
        }
        results
    }

    fn resolve_inner<F>(&self, raw: &str, fallback: Option<F>) -> ParsedTranscript
    where
        F: FnOnce(&str) -> Result<FallbackFields, TranscriptError>,
    {
        let observer = self.observer.as_ref();

        // Courses always come from the full text, never from the fallback.
        let courses = self.courses.extract_observed(raw, observer);

        let mut major = extract_major_with_default(raw, &self.program_default_major)
            .map(|m| (m, FieldSource::Local));
        let mut credits = extract_total_credits(raw).map(|c| (c, FieldSource::Local));

        if major.is_none() || credits.is_none() {
            if let Some(fallback) = fallback {
                let snippet = header_snippet(raw, self.snippet_chars);
                observer.on_event(&ExtractionEvent::FallbackInvoked {
                    snippet_chars: snippet.chars().count(),
                });

                match fallback(snippet) {
                    Ok(fields) => {
                        if major.is_none() {
                            major = fields
                                .major
                                .map(|m| m.trim().to_string())
                                .filter(|m| !m.is_empty())
                                .map(|m| (m, FieldSource::Fallback));
                        }
                        if credits.is_none() {
                            credits = fields
                                .total_credits
                                .filter(|c| c.is_finite() && *c >= 0.0)
                                .map(|c| (c, FieldSource::Fallback));
                        }
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "Transcript fallback failed, keeping local results");
                        observer.on_event(&ExtractionEvent::FallbackFailed {
                            error: e.to_string(),
                        });
                    }
                }
            }
        }

        let (major, major_source) =
            major.unwrap_or_else(|| (config::UNKNOWN_MAJOR.to_string(), FieldSource::Default));
        let (credits, credits_source) = credits.unwrap_or((0.0, FieldSource::Default));

        observer.on_event(&ExtractionEvent::MajorResolved {
            source: major_source,
        });
        observer.on_event(&ExtractionEvent::CreditsResolved {
            source: credits_source,
        });
        tracing::info!(
            courses = courses.len(),
            ?major_source,
            ?credits_source,
            "Transcript resolved"
        );

        ParsedTranscript::new(major, courses, credits)
    }

    /// Single, non-retried call. With a timeout configured the call runs on a
    /// worker thread; an expired or crashed worker counts as no data. A worker
    /// that outlives its timeout is detached: it keeps running until the
    /// fallback returns, and its result is dropped. Catching a panic relies on
    /// the unwinding panic strategy.
    fn invoke_fallback(
        &self,
        fallback: &Arc<dyn TranscriptFallback>,
        snippet: &str,
    ) -> Result<FallbackFields, TranscriptError> {
        let Some(timeout) = self.fallback_timeout else {
            return fallback.infer_fields(snippet);
        };

        let (tx, rx) = mpsc::channel();
        let worker = Arc::clone(fallback);
        let snippet = snippet.to_string();
        std::thread::Builder::new()
            .name("transcript-fallback".into())
            .spawn(move || {
                // Receiver may be gone after a timeout.
                let _ = tx.send(worker.infer_fields(&snippet));
            })?;

        match rx.recv_timeout(timeout) {
            Ok(result) => result,
            Err(RecvTimeoutError::Timeout) => Err(TranscriptError::FallbackTimeout(timeout)),
            Err(RecvTimeoutError::Disconnected) => Err(TranscriptError::FallbackUnavailable(
                "fallback worker exited without a result".into(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Instant;

    use super::*;
    use crate::pipeline::transcript::observe::ExtractionEvent;

    const SAMPLE_TRANSCRIPT: &str = "\
SIMON FRASER UNIVERSITY
Advising Transcript
Program: Bachelor of Science      Active in Program
Plan
Major - Computing Science CMPT 01
Transfer Credits
CHEMX120.0 A TR-C
MATH 100 3.00 TR TR-T
Term: 1227
CMPT 120 3.00 A- 11.01
MACM 101 3.00 B+ 9.99
STAT 270 3.00 C 6.00
ENGL 105W 3.00 B 9.00
Term: 1231
CMPT 225 3.00 0.00
STUDENT GROUP CF PREQ CMPT 225
Total Units: 18.00
Passed: 18.00 15.00 18.00
";

    /// Fallback returning fixed fields, counting calls and recording snippets.
    struct StaticFallback {
        fields: Result<FallbackFields, String>,
        calls: AtomicUsize,
        last_snippet: Mutex<Option<String>>,
    }

    impl StaticFallback {
        fn ok(major: Option<&str>, credits: Option<f64>) -> Self {
            Self {
                fields: Ok(FallbackFields {
                    major: major.map(str::to_string),
                    total_credits: credits,
                }),
                calls: AtomicUsize::new(0),
                last_snippet: Mutex::new(None),
            }
        }

        fn unavailable() -> Self {
            Self {
                fields: Err("service down".into()),
                calls: AtomicUsize::new(0),
                last_snippet: Mutex::new(None),
            }
        }
    }

    impl TranscriptFallback for StaticFallback {
        fn infer_fields(&self, snippet: &str) -> Result<FallbackFields, TranscriptError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last_snippet.lock().unwrap() = Some(snippet.to_string());
            self.fields
                .clone()
                .map_err(TranscriptError::FallbackUnavailable)
        }
    }

    #[derive(Default)]
    struct RecordingObserver {
        events: Mutex<Vec<ExtractionEvent>>,
    }

    impl ExtractionObserver for RecordingObserver {
        fn on_event(&self, event: &ExtractionEvent) {
            self.events.lock().unwrap().push(event.clone());
        }
    }

    #[test]
    fn sample_transcript_resolves_locally() {
        let parsed = resolve(SAMPLE_TRANSCRIPT, None);

        assert_eq!(parsed.major(), "Computing Science");
        assert_eq!(parsed.total_credits_completed(), 18.0);
        assert_eq!(
            parsed.completed_courses().codes(),
            vec!["CHEM X12", "CMPT 120", "ENGL 105W", "MACM 101", "MATH 100", "STAT 270"]
        );
    }

    #[test]
    fn fallback_not_called_when_local_fields_present() {
        let fallback = StaticFallback::ok(Some("History"), Some(1.0));
        let parsed = resolve(SAMPLE_TRANSCRIPT, Some(&fallback));

        assert_eq!(fallback.calls.load(Ordering::SeqCst), 0);
        assert_eq!(parsed.major(), "Computing Science");
    }

    #[test]
    fn sentinels_when_nothing_found_and_no_fallback() {
        let parsed = resolve("CMPT 225 3.0 B+ STAT 270 3.0 A-", None);

        assert_eq!(parsed.major(), "Unknown");
        assert_eq!(parsed.total_credits_completed(), 0.0);
        assert_eq!(parsed.completed_courses().codes(), vec!["CMPT 225", "STAT 270"]);
    }

    #[test]
    fn sentinels_when_fallback_unavailable() {
        let fallback = StaticFallback::unavailable();
        let parsed = resolve("PSYC 100 3.0 CR", Some(&fallback));

        assert_eq!(fallback.calls.load(Ordering::SeqCst), 1);
        assert_eq!(parsed.major(), "Unknown");
        assert_eq!(parsed.total_credits_completed(), 0.0);
        assert_eq!(parsed.completed_courses().codes(), vec!["PSYC 100"]);
    }

    #[test]
    fn fallback_fills_only_missing_fields() {
        let fallback = StaticFallback::ok(Some("History"), Some(33.0));
        let parsed = resolve("Major - Statistics STAT\nCMPT 120 3 A", Some(&fallback));

        assert_eq!(fallback.calls.load(Ordering::SeqCst), 1);
        assert_eq!(parsed.major(), "Statistics", "Local major must win");
        assert_eq!(parsed.total_credits_completed(), 33.0);
    }

    #[test]
    fn blank_or_negative_fallback_values_ignored() {
        let fallback = StaticFallback::ok(Some("   "), Some(-5.0));
        let parsed = resolve("nothing useful", Some(&fallback));

        assert_eq!(parsed.major(), "Unknown");
        assert_eq!(parsed.total_credits_completed(), 0.0);
    }

    #[test]
    fn fallback_snippet_is_bounded_prefix() {
        let fallback = Arc::new(StaticFallback::ok(Some("Physics"), Some(12.0)));
        let resolver = TranscriptResolver::new()
            .with_fallback(fallback.clone())
            .with_snippet_chars(40);

        let raw = format!("Header line\n{}\nCMPT 225 3.00 A", "x".repeat(5000));
        let parsed = resolver.resolve(&raw);

        let snippet = fallback.last_snippet.lock().unwrap().clone().unwrap();
        assert_eq!(snippet.chars().count(), 40);
        assert!(raw.starts_with(&snippet));
        assert_eq!(parsed.major(), "Physics");
        // Course evidence beyond the snippet is still found.
        assert_eq!(parsed.completed_courses().codes(), vec!["CMPT 225"]);
    }

    #[test]
    fn default_snippet_budget() {
        let fallback = Arc::new(StaticFallback::ok(None, None));
        let resolver = TranscriptResolver::new().with_fallback(fallback.clone());

        resolver.resolve(&"é".repeat(config::FALLBACK_SNIPPET_CHARS + 100));

        let snippet = fallback.last_snippet.lock().unwrap().clone().unwrap();
        assert_eq!(snippet.chars().count(), config::FALLBACK_SNIPPET_CHARS);
    }

    #[test]
    fn slow_fallback_times_out_to_sentinels() {
        let slow = |_: &str| -> Result<FallbackFields, TranscriptError> {
            std::thread::sleep(Duration::from_millis(500));
            Ok(FallbackFields {
                major: Some("Too Late".into()),
                total_credits: Some(99.0),
            })
        };
        let observer = Arc::new(RecordingObserver::default());
        let resolver = TranscriptResolver::new()
            .with_fallback(Arc::new(slow))
            .with_fallback_timeout(Some(Duration::from_millis(50)))
            .with_observer(observer.clone());

        let started = Instant::now();
        let parsed = resolver.resolve("STAT 270 3.0 A-");

        assert!(started.elapsed() < Duration::from_millis(450));
        assert_eq!(parsed.major(), "Unknown");
        assert_eq!(parsed.total_credits_completed(), 0.0);
        assert!(observer
            .events
            .lock()
            .unwrap()
            .iter()
            .any(|e| matches!(e, ExtractionEvent::FallbackFailed { error } if error.contains("timed out"))));
    }

    #[test]
    fn panicking_fallback_counts_as_no_data() {
        let broken = |_: &str| -> Result<FallbackFields, TranscriptError> {
            panic!("fallback crashed");
        };
        let resolver = TranscriptResolver::new()
            .with_fallback(Arc::new(broken))
            .with_fallback_timeout(Some(Duration::from_secs(5)));

        let parsed = resolver.resolve("Total Units: 12");
        assert_eq!(parsed.major(), "Unknown");
        assert_eq!(parsed.total_credits_completed(), 12.0);
    }

    #[test]
    fn timed_out_worker_finishes_detached() {
        let finished = Arc::new(AtomicUsize::new(0));
        let done = Arc::clone(&finished);
        let slow = move |_: &str| -> Result<FallbackFields, TranscriptError> {
            std::thread::sleep(Duration::from_millis(200));
            done.fetch_add(1, Ordering::SeqCst);
            Ok(FallbackFields::default())
        };
        let resolver = TranscriptResolver::new()
            .with_fallback(Arc::new(slow))
            .with_fallback_timeout(Some(Duration::from_millis(20)));

        let parsed = resolver.resolve("nothing useful");
        assert_eq!(parsed.major(), "Unknown");
        assert_eq!(finished.load(Ordering::SeqCst), 0);

        let deadline = Instant::now() + Duration::from_secs(5);
        while finished.load(Ordering::SeqCst) == 0 && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(10));
        }
        assert_eq!(finished.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn observer_sees_field_sources() {
        let observer = Arc::new(RecordingObserver::default());
        let resolver = TranscriptResolver::new()
            .with_fallback(Arc::new(StaticFallback::ok(Some("Physics"), None)))
            .with_fallback_timeout(None)
            .with_observer(observer.clone());

        resolver.resolve("Total Units: 30.00");

        let events = observer.events.lock().unwrap();
        assert!(events.contains(&ExtractionEvent::MajorResolved {
            source: FieldSource::Fallback
        }));
        assert!(events.contains(&ExtractionEvent::CreditsResolved {
            source: FieldSource::Local
        }));
        assert!(events
            .iter()
            .any(|e| matches!(e, ExtractionEvent::FallbackInvoked { .. })));
    }

    #[test]
    fn settings_flow_into_resolver() {
        let settings = ExtractionSettings {
            program_default_major: "General Science".into(),
            ..ExtractionSettings::default()
        };
        let resolver = TranscriptResolver::from_settings(&settings).unwrap();

        let parsed = resolver.resolve("Program: Bachelor of Science\nActive");
        assert_eq!(parsed.major(), "General Science");
    }

    #[test]
    fn empty_input_yields_sentinels() {
        let parsed = resolve("", None);
        assert_eq!(parsed.major(), "Unknown");
        assert_eq!(parsed.total_credits_completed(), 0.0);
        assert!(parsed.completed_courses().is_empty());
    }

    #[tokio::test]
    async fn resolve_many_preserves_input_order() {
        let resolver = Arc::new(TranscriptResolver::new());
        let docs = vec![
            "Major - Statistics\nSTAT 270 3.0 A".to_string(),
            String::new(),
            SAMPLE_TRANSCRIPT.to_string(),
        ];

        let results = resolver.resolve_many(docs).await;

        assert_eq!(results.len(), 3);
        assert_eq!(results[0].major(), "Statistics");
        assert_eq!(results[1].major(), "Unknown");
        assert_eq!(results[2].completed_courses().len(), 6);
        assert_eq!(results[2].total_credits_completed(), 18.0);
    }
}
