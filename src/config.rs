use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::pipeline::transcript::{ExtractionSettings, TranscriptError};

/// Application-level constants
pub const APP_NAME: &str = "transcript-core";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Characters of transcript header handed to the fallback collaborator.
/// Major/program and credit summaries sit near the top of the document.
pub const FALLBACK_SNIPPET_CHARS: usize = 2500;

/// Major reported when neither local patterns nor the fallback found one.
pub const UNKNOWN_MAJOR: &str = "Unknown";

/// Major reported for a bare "Bachelor of Science" program statement.
pub const DEFAULT_PROGRAM_MAJOR: &str = "Computing Science";

pub const DEFAULT_FALLBACK_TIMEOUT: Duration = Duration::from_secs(30);

/// Env var naming a JSON file of `ExtractionSettings` overrides.
pub const SETTINGS_ENV: &str = "TRANSCRIPT_SETTINGS";

/// Debug builds log extraction stages by default.
pub fn is_dev() -> bool {
    cfg!(debug_assertions)
}

/// Log filter used when `RUST_LOG` is not set.
pub fn default_log_filter() -> &'static str {
    if is_dev() {
        "transcript_core=debug"
    } else {
        "transcript_core=info"
    }
}

/// Path of the settings file, if `TRANSCRIPT_SETTINGS` is set.
pub fn settings_path() -> Option<PathBuf> {
    std::env::var_os(SETTINGS_ENV).map(PathBuf::from)
}

/// Load settings from `TRANSCRIPT_SETTINGS`, or defaults when unset.
pub fn load_settings() -> Result<ExtractionSettings, TranscriptError> {
    match settings_path() {
        Some(path) => load_settings_from(&path),
        None => Ok(ExtractionSettings::default()),
    }
}

pub fn load_settings_from(path: &Path) -> Result<ExtractionSettings, TranscriptError> {
    let json = std::fs::read_to_string(path)?;
    let settings = ExtractionSettings::from_json(&json)?;
    tracing::info!(path = %path.display(), "Loaded extraction settings");
    Ok(settings)
}
