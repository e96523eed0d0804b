//! Cleanup of model output before JSON decoding
//!
//! Models regularly ignore "JSON only" and prepend a sentence or wrap the
//! payload in a Markdown code fence. Both wrappers are removed here.

use crate::MalformedResponse;
use serde_json::{Map, Value};

/// Leading phrases dropped from model output, matched case-insensitively
pub const BOILERPLATE_PREFIXES: [&str; 8] = [
    "here is the json object",
    "here's the json object",
    "here is the json",
    "here's the json",
    "here is the extracted",
    "here are the event details",
    "sure",
    "certainly",
];

const FENCE: &str = "```";

/// Strips boilerplate prefixes and surrounding code fences
///
/// A boilerplate prefix removes the rest of its line; if a `{` or a fence
/// starts on that same line, the cut stops there instead. A fenced block
/// ends at its closing fence and trailing remarks are dropped.
///
/// ```
/// use linkcal::extract::sanitize_response;
///
/// let raw = "Here is the JSON object:\n```json\n{\"title\": \"x\"}\n```";
/// assert_eq!(sanitize_response(raw), "{\"title\": \"x\"}");
/// ```
pub fn sanitize_response(raw: &str) -> String {
    let mut text = strip_boilerplate(raw.trim()).trim();

    if let Some(rest) = text.strip_prefix(FENCE) {
        let body = strip_language_tag(rest);
        // Anything after the closing fence is commentary
        text = match body.find(FENCE) {
            Some(end) => &body[..end],
            None => body,
        }
        .trim();
    } else if let Some(rest) = text.strip_suffix(FENCE) {
        text = rest.trim();
    }

    text.to_string()
}

/// Sanitizes and decodes model output into a JSON object
pub fn parse_response(raw: &str) -> Result<Map<String, Value>, MalformedResponse> {
    let cleaned = sanitize_response(raw);

    let malformed = |message: String| MalformedResponse {
        message,
        raw_response: raw.to_string(),
        cleaned_response: cleaned.clone(),
    };

    match serde_json::from_str::<Value>(&cleaned) {
        Ok(Value::Object(object)) => Ok(object),
        Ok(other) => Err(malformed(format!(
            "expected a JSON object, got {}",
            json_kind(&other)
        ))),
        Err(e) => Err(malformed(e.to_string())),
    }
}

/// Short name of a JSON value's type, for diagnostics
pub fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn strip_boilerplate(text: &str) -> &str {
    let Some(prefix) = BOILERPLATE_PREFIXES
        .iter()
        .find(|p| text.get(..p.len()).map_or(false, |head| head.eq_ignore_ascii_case(p)))
    else {
        return text;
    };

    let rest = &text[prefix.len()..];
    let line_end = rest.find('\n').unwrap_or(rest.len());
    let line = &rest[..line_end];

    let payload_start = [line.find('{'), line.find(FENCE)]
        .into_iter()
        .flatten()
        .min();

    match payload_start {
        Some(idx) => &rest[idx..],
        None => &rest[line_end..],
    }
}

/// Drops an optional language tag (e.g. `json`) right after an opening fence
fn strip_language_tag(text: &str) -> &str {
    let line_end = text.find('\n').unwrap_or(text.len());
    let tag = text[..line_end].trim();
    if tag.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_') {
        &text[line_end..]
    } else {
        text
    }
}
