//! JSON recovery from free-form model output
//!
//! Language models wrap JSON in prose or markdown fences. These helpers locate the
//! first balanced `{...}` span and decode it, turning every failure into the
//! sentinel object `{"error": ..., "raw_response": ...}` instead of an error.

use glossa_domain::traits::ORACLE_ERROR_PREFIX;
use serde_json::{json, Value};

/// Prefix of oracle transport failures, re-exported for oracle implementations
pub const ERROR_PREFIX: &str = ORACLE_ERROR_PREFIX;

/// Find the first balanced `{...}` span in `text`
///
/// Braces inside JSON string literals (including escaped quotes) are ignored. When
/// the span opened by the first `{` never closes, later `{` positions are tried.
pub fn extract_json_object(text: &str) -> Option<&str> {
    let bytes = text.as_bytes();
    let mut start = 0;
    while let Some(offset) = text[start..].find('{') {
        let open = start + offset;
        if let Some(close) = balanced_end(bytes, open) {
            return Some(&text[open..=close]);
        }
        start = open + 1;
    }
    None
}

/// Index of the `}` closing the object opened at `open`
fn balanced_end(bytes: &[u8], open: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, &b) in bytes.iter().enumerate().skip(open) {
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

/// Build the sentinel error object
pub fn error_object(error: impl Into<String>, raw_response: impl Into<String>) -> Value {
    json!({
        "error": error.into(),
        "raw_response": raw_response.into(),
    })
}

/// Decode the structured result of a generation call
///
/// Error-prefixed text becomes a sentinel carrying the transport error; otherwise the
/// first balanced object span is decoded.
pub fn structured_from_text(text: &str) -> Value {
    if let Some(reason) = text.strip_prefix(ERROR_PREFIX) {
        return error_object(reason.trim(), text);
    }

    let Some(span) = extract_json_object(text) else {
        return error_object("no JSON object found in response", text);
    };

    match serde_json::from_str::<Value>(span) {
        Ok(value) => value,
        Err(e) => error_object(format!("invalid JSON: {}", e), text),
    }
}

/// Whether a structured result is the sentinel error object
pub fn is_error_response(value: &Value) -> bool {
    glossa_domain::traits::is_oracle_error_object(value)
}
