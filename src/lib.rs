pub mod config;
pub mod pipeline;

pub use pipeline::transcript::{
    extract_completed_courses, extract_major, extract_total_credits, normalize, resolve,
    CompletedCourseSet, CourseCode, FallbackFields, ParsedTranscript, TranscriptError,
    TranscriptFallback, TranscriptResolver,
};

use std::io::Read;
use std::path::Path;

use tracing_subscriber::EnvFilter;

/// Install the `tracing` subscriber. Output goes to stderr so stdout stays
/// clean for the JSON payload.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .with_writer(std::io::stderr)
        .init();
}

/// Driver for the binary: read a transcript (file argument or stdin), resolve
/// it locally and print the JSON payload.
pub fn run() -> Result<(), TranscriptError> {
    init_tracing();

    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);

    let settings = config::load_settings()?;
    let resolver = TranscriptResolver::from_settings(&settings)?;

    let raw = match std::env::args_os().nth(1) {
        Some(path) => read_transcript(Path::new(&path))?,
        None => {
            let mut bytes = Vec::new();
            std::io::stdin().read_to_end(&mut bytes)?;
            String::from_utf8_lossy(&bytes).into_owned()
        }
    };

    let parsed = resolver.resolve(&raw);
    let json = serde_json::to_string_pretty(&parsed)
        .map_err(|e| TranscriptError::JsonParsing(e.to_string()))?;
    println!("{json}");

    Ok(())
}

/// Read flattened transcript text. Invalid UTF-8 from PDF extraction is
/// replaced rather than rejected.
pub fn read_transcript(path: &Path) -> Result<String, TranscriptError> {
    let bytes = std::fs::read(path)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_transcript_tolerates_invalid_utf8() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("transcript.txt");
        std::fs::write(&path, b"Advising \xff Transcript\nCMPT 225 3.00 B+\nTotal Units: 3.00").unwrap();

        let raw = read_transcript(&path).unwrap();
        let parsed = resolve(&raw, None);
        assert_eq!(parsed.completed_courses().codes(), vec!["CMPT 225"]);
        assert_eq!(parsed.total_credits_completed(), 3.0);
    }

    #[test]
    fn read_transcript_missing_file() {
        let err = read_transcript(Path::new("/nonexistent/transcript.txt")).unwrap_err();
        assert!(matches!(err, TranscriptError::Io(_)));
    }
}
