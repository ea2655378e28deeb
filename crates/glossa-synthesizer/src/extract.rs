//! Recovering SQL and assumptions from model output

use regex::Regex;
use std::sync::OnceLock;

/// Words that mark a sentence as stating an assumption
const ASSUMPTION_KEYWORDS: &[&str] = &[
    "assum",
    "presum",
    "interpreted as",
    "by default",
    "defaults to",
    "treated as",
    "is taken to",
    "likely",
];

fn compiled(cell: &'static OnceLock<Option<Regex>>, pattern: &str) -> Option<&'static Regex> {
    cell.get_or_init(|| Regex::new(pattern).ok()).as_ref()
}

fn fence_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    compiled(&RE, r"(?s)```[ \t]*([A-Za-z0-9_+.-]*)[^\n]*\n(.*?)```")
}

fn assumptions_header_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    compiled(
        &RE,
        r"(?im)^[ \t]*(?:#{1,6}[ \t]*)?(?:\*\*)?[ \t]*(?:key[ \t]+)?assumptions?\b[^\n]*$",
    )
}

fn list_item_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    compiled(&RE, r"^[ \t]*(?:[-*•]|\d+[.)])[ \t]+(.+)$")
}

/// Extract SQL text from an oracle response
///
/// Prefers a fenced block tagged with `dialect` (case-insensitive), then one tagged
/// `sql`, then any fenced block, then the whole response. The result is trimmed, and
/// extracting from an extraction returns it unchanged.
///
/// ```
/// use glossa_synthesizer::extract::extract_sql;
///
/// let response = "Here it is:\n```postgresql\nSELECT * FROM orders\n```";
/// assert_eq!(extract_sql(response, "PostgreSQL"), "SELECT * FROM orders");
/// ```
pub fn extract_sql(response: &str, dialect: &str) -> String {
    let blocks: Vec<(String, &str)> = fence_regex()
        .map(|re| {
            re.captures_iter(response)
                .filter_map(|caps| {
                    let tag = caps.get(1).map(|m| m.as_str().to_lowercase()).unwrap_or_default();
                    let body = caps.get(2)?.as_str();
                    Some((tag, body))
                })
                .collect()
        })
        .unwrap_or_default();

    let dialect = dialect.trim().to_lowercase();
    let chosen = blocks
        .iter()
        .find(|(tag, _)| !dialect.is_empty() && *tag == dialect)
        .or_else(|| blocks.iter().find(|(tag, _)| tag == "sql"))
        .or_else(|| blocks.first())
        .map(|(_, body)| *body)
        .unwrap_or(response);

    chosen.trim().to_string()
}

/// Extract assumptions from an explanation
///
/// Looks for an "Assumptions" section header and collects the list items (or lines)
/// below it. Without such a section, falls back to sentences containing
/// assumption-indicating words.
pub fn extract_assumptions(explanation: &str) -> Vec<String> {
    let structured = assumptions_section(explanation);
    if !structured.is_empty() {
        return structured;
    }

    explanation
        .split(['.', '!', '?', '\n'])
        .map(str::trim)
        .filter(|sentence| {
            let lower = sentence.to_lowercase();
            !sentence.is_empty() && ASSUMPTION_KEYWORDS.iter().any(|k| lower.contains(k))
        })
        .map(|sentence| format!("{}.", sentence.trim_start_matches(['-', '*', '•', ' '])))
        .collect()
}

fn assumptions_section(explanation: &str) -> Vec<String> {
    let Some(header) = assumptions_header_regex().and_then(|re| re.find(explanation)) else {
        return Vec::new();
    };

    let mut items = Vec::new();
    for line in explanation[header.end()..].lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            if items.is_empty() {
                continue;
            }
            break;
        }
        // next section
        if trimmed.starts_with('#') || (trimmed.starts_with("**") && trimmed.ends_with("**")) {
            break;
        }
        let item = list_item_regex()
            .and_then(|re| re.captures(line))
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str())
            .unwrap_or(trimmed);
        let item = item.trim();
        if !item.is_empty() {
            items.push(item.to_string());
        }
    }
    items
}
