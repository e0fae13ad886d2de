/// Canonicalize raw transcript text for course-code matching.
///
/// Uppercases everything and collapses every whitespace run (non-breaking
/// spaces included) to a single ASCII space, trimming both ends. Total and
/// idempotent.
pub fn normalize(raw: &str) -> String {
    let upper = raw.to_uppercase();
    let mut out = String::with_capacity(upper.len());

    // char::is_whitespace covers U+00A0 and the other Unicode space separators.
    for word in upper.split_whitespace() {
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(word);
    }

    out
}
