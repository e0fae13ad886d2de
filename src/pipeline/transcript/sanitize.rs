// Prepare the header snippet handed to a fallback collaborator.
// Bounds it to a character budget and strips invisible formatting characters
// that PDF extraction leaves behind and that can steer a language model.

/// First `max_chars` characters of `raw`, never splitting a UTF-8 sequence.
pub fn header_snippet(raw: &str, max_chars: usize) -> &str {
    match raw.char_indices().nth(max_chars) {
        Some((idx, _)) => &raw[..idx],
        None => raw,
    }
}

/// Remove zero-width, bidi-control and other invisible characters.
/// Keeps space, newline, tab and carriage return so line structure survives.
pub fn sanitize_snippet(snippet: &str) -> String {
    snippet
        .chars()
        .filter(|c| {
            if matches!(*c, ' ' | '\n' | '\t' | '\r') {
                return true;
            }
            if matches!(
                *c,
                '\u{00AD}'  // Soft hyphen
                | '\u{200B}'..='\u{200F}' // Zero-width space/joiners, LTR/RTL marks
                | '\u{202A}'..='\u{202E}' // Bidi embeddings and overrides
                | '\u{2060}'..='\u{2064}' // Word joiner, invisible operators
                | '\u{FEFF}' // BOM
            ) {
                return false;
            }
            !c.is_control()
        })
        .collect()
}
