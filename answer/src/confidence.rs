use regex_lite::Regex;
use std::sync::LazyLock;

/// Patterns a model uses to state its own confidence on a 1-10 scale
const CONFIDENCE_PATTERNS: [&str; 3] = [
    r"(?i)confidence:\s*(\d+(?:\.\d+)?)\s*/?\s*10",
    r"(?i)confidence score:\s*(\d+(?:\.\d+)?)\s*/?\s*10",
    r"(?i)(\d+(?:\.\d+)?)\s*/\s*10\s*confidence",
];

static CONFIDENCE_REGEXES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    CONFIDENCE_PATTERNS
        .iter()
        .filter_map(|pattern| Regex::new(pattern).ok())
        .collect()
});

static CONFIDENCE_LINE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?i)CONFIDENCE:\s*\d+").ok());

/// Extract the self-reported confidence from raw model output.
///
/// Returns the first match of the known patterns, clamped to `[1, 10]`, or
/// `None` when the output states no parsable confidence.
pub fn parse_self_reported_confidence(output: &str) -> Option<f32> {
    CONFIDENCE_REGEXES.iter().find_map(|regex| {
        let captures = regex.captures(output)?;
        let value: f32 = captures.get(1)?.as_str().parse().ok()?;
        Some(value.clamp(1.0, 10.0))
    })
}

/// Remove confidence lines and surrounding blank lines from model output.
///
/// Falls back to the raw (trimmed) output if nothing is left.
pub fn clean_answer(output: &str) -> String {
    let is_confidence_line = |line: &str| {
        CONFIDENCE_LINE
            .as_ref()
            .is_some_and(|regex| regex.is_match(line))
    };

    let lines: Vec<&str> = output
        .lines()
        .filter(|line| !is_confidence_line(line))
        .collect();

    let start = lines.iter().position(|line| !line.trim().is_empty());
    let end = lines.iter().rposition(|line| !line.trim().is_empty());

    let cleaned = match (start, end) {
        (Some(start), Some(end)) => lines[start..=end].join("\n").trim().to_string(),
        _ => String::new(),
    };

    if cleaned.is_empty() {
        output.trim().to_string()
    } else {
        cleaned
    }
}
