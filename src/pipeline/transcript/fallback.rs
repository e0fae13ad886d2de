//! Fallback collaborator seam for the major and credit-total fields.
//!
//! The resolver only sees `TranscriptFallback`: an opaque
//! `snippet -> {major?, total_credits?}` function. `LlmFallback` adapts any
//! `LlmClient` to it by building the prompt and parsing the JSON reply; the
//! transport behind `LlmClient` belongs to the caller.

use serde::Deserialize;

use super::sanitize::sanitize_snippet;
use super::types::FallbackFields;
use super::TranscriptError;

pub const MAJOR_CREDITS_SYSTEM_PROMPT: &str = "\
You read the header of a university transcript. Return JSON with exactly two fields:
- student_major (string, the declared major or program, e.g. \"Computing Science\")
- total_credits_completed (number, from \"Total Units\" or the last \"Passed\" figure)
Use null for a field you cannot find. Return ONLY the JSON object.
Example: {\"student_major\":\"Computing Science\",\"total_credits_completed\":92}";

/// Supplies major and credit total for a transcript header snippet.
pub trait TranscriptFallback: Send + Sync {
    fn infer_fields(&self, snippet: &str) -> Result<FallbackFields, TranscriptError>;
}

impl<F> TranscriptFallback for F
where
    F: Fn(&str) -> Result<FallbackFields, TranscriptError> + Send + Sync,
{
    fn infer_fields(&self, snippet: &str) -> Result<FallbackFields, TranscriptError> {
        self(snippet)
    }
}

/// Text-completion service behind the LLM fallback.
pub trait LlmClient: Send + Sync {
    fn generate(&self, model: &str, prompt: &str, system: &str) -> Result<String, TranscriptError>;
}

pub struct LlmFallback<C> {
    client: C,
    model_name: String,
}

impl<C: LlmClient> LlmFallback<C> {
    pub fn new(client: C, model_name: &str) -> Self {
        Self {
            client,
            model_name: model_name.to_string(),
        }
    }
}

impl<C: LlmClient> TranscriptFallback for LlmFallback<C> {
    fn infer_fields(&self, snippet: &str) -> Result<FallbackFields, TranscriptError> {
        let prompt = build_fallback_prompt(snippet);
        let response = self
            .client
            .generate(&self.model_name, &prompt, MAJOR_CREDITS_SYSTEM_PROMPT)?;
        parse_fallback_response(&response)
    }
}

pub fn build_fallback_prompt(snippet: &str) -> String {
    format!("Transcript:\n{}", sanitize_snippet(snippet))
}

/// Parse the model reply. Fields other than major and credit total (a course
/// list, say) are ignored; course extraction never trusts the model.
pub fn parse_fallback_response(response: &str) -> Result<FallbackFields, TranscriptError> {
    #[derive(Deserialize)]
    struct RawFallback {
        #[serde(default)]
        student_major: Option<String>,
        #[serde(default)]
        total_credits_completed: Option<serde_json::Value>,
    }

    let json_str = extract_json_block(response)?;
    let raw: RawFallback =
        serde_json::from_str(json_str).map_err(|e| TranscriptError::JsonParsing(e.to_string()))?;

    let major = raw
        .student_major
        .map(|m| m.trim().to_string())
        .filter(|m| !m.is_empty());
    let total_credits = raw
        .total_credits_completed
        .and_then(|v| v.as_f64())
        .filter(|c| c.is_finite() && *c >= 0.0);

    Ok(FallbackFields {
        major,
        total_credits,
    })
}

/// Locate the JSON object in a reply that may wrap it in code fences or prose.
fn extract_json_block(response: &str) -> Result<&str, TranscriptError> {
    let trimmed = response.trim();

    if let Some(start) = trimmed.find("```json") {
        let after_fence = &trimmed[start + 7..];
        if let Some(end) = after_fence.find("```") {
            return Ok(after_fence[..end].trim());
        }
    }

    if let (Some(start), Some(end)) = (trimmed.find('{'), trimmed.rfind('}')) {
        if start < end {
            return Ok(&trimmed[start..=end]);
        }
    }

    Err(TranscriptError::MalformedResponse(
        "No JSON object found in fallback response".to_string(),
    ))
}
