use std::sync::LazyLock;

use regex::Regex;

static TOTAL_UNITS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)Total\s+Units:\s*([0-9]+(?:\.[0-9]+)?)").expect("valid regex"));

/// `Passed: <attempted> <graded> <completed>`. The third figure is the total.
static PASSED_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)Passed:\s*[0-9.]+\s+[0-9.]+\s+([0-9]+(?:\.[0-9]+)?)").expect("valid regex")
});

/// Extract the total completed credit units from raw transcript text.
/// The first figure that parses wins; "Total Units" outranks "Passed".
pub fn extract_total_credits(raw: &str) -> Option<f64> {
    [&TOTAL_UNITS_RE, &PASSED_RE].into_iter().find_map(|re| {
        re.captures_iter(raw)
            .find_map(|caps| caps[1].parse::<f64>().ok())
    })
}
